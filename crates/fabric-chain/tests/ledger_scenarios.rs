//! End-to-end ledger scenarios against a file-backed store.

use chrono::{TimeZone, Utc};
use ed25519_dalek::SigningKey;
use fabric_chain::{
    assemble_block, attach, digest_bytes, digest_pair, file_record, sign_block, AcceptancePolicy,
    Block, ChainBuilderExt, ChainConfig, ChainError, DefectKind, Hash256, JsonlLedger, KeyDirectory,
    KeyProvider, LedgerStore, Policy, PubkeyRegistry, Verifier, WarningKind,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

fn flip_bit(hash: Hash256, byte: usize) -> Hash256 {
    let mut bytes = hash.0;
    bytes[byte] ^= 0x01;
    Hash256(bytes)
}

struct Workspace {
    dir: TempDir,
    config: ChainConfig,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = ChainConfig::from_root(dir.path());
        Self { dir, config }
    }

    fn file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn ledger(&self) -> JsonlLedger {
        JsonlLedger::new(&self.config.ledger_path)
    }
}

#[test]
fn test_sequential_appends_verify_in_basic_mode() {
    let ws = Workspace::new();
    let a = ws.file("a.txt", b"alpha");
    let b = ws.file("b.txt", b"beta");
    let mut ledger = ws.ledger();

    for i in 0..5 {
        let note = format!("batch {i}");
        ledger
            .append_signed("alice", &key(1), &note, &[&a, &b])
            .unwrap();
    }

    let report = Verifier::default().verify_store(&ledger).unwrap();
    assert!(report.accepted(), "{:?}", report.defects);
    assert_eq!(report.blocks_checked, 5);
}

#[test]
fn test_missing_ledger_differs_from_empty_ledger() {
    let ws = Workspace::new();
    let ledger = ws.ledger();
    assert!(matches!(
        Verifier::default().verify_store(&ledger),
        Err(ChainError::MissingLedger(_))
    ));

    fs::create_dir_all(ws.config.ledger_path.parent().unwrap()).unwrap();
    fs::write(&ws.config.ledger_path, "").unwrap();
    let report = Verifier::default().verify_store(&ledger).unwrap();
    assert!(report.accepted());
    assert_eq!(report.blocks_checked, 0);
}

#[test]
fn test_three_file_merkle_scenario() {
    let ws = Workspace::new();
    let a = ws.file("a", &[1u8; 10]);
    let b = ws.file("b", &[2u8; 20]);
    let c = ws.file("c", &[3u8; 5]);

    let block = ws
        .ledger()
        .append_signed("alice", &key(1), "", &[&a, &b, &c])
        .unwrap();

    let d1 = digest_bytes(&[1u8; 10]);
    let d2 = digest_bytes(&[2u8; 20]);
    let d3 = digest_bytes(&[3u8; 5]);
    assert_eq!(
        block.merkle_root,
        digest_pair(&digest_pair(&d1, &d2), &digest_pair(&d3, &d3))
    );
    assert_eq!(block.files[1].bytes, 20);
}

#[test]
fn test_prev_hash_skipping_a_block_is_single_defect() {
    let ws = Workspace::new();
    let a = ws.file("a", b"a");
    let mut ledger = ws.ledger();
    let b0 = ledger.append_signed("alice", &key(1), "", &[&a]).unwrap();
    ledger.append_signed("alice", &key(1), "", &[&a]).unwrap();

    // Block 2 links to block 0 but is otherwise well formed and signed.
    let mut b2 = assemble_block(
        2,
        Some(b0.block_hash),
        Utc.with_ymd_and_hms(2025, 5, 5, 5, 5, 5).unwrap(),
        vec![file_record(&a).unwrap()],
        "",
    )
    .unwrap();
    let sig = sign_block(&b2, &key(1), "alice");
    attach(&mut b2, sig);
    ledger.append(&b2).unwrap();

    let report = Verifier::default().verify_store(&ledger).unwrap();
    assert_eq!(report.defects.len(), 1, "{:?}", report.defects);
    assert_eq!(report.defects[0].index, 2);
    assert!(matches!(
        report.defects[0].kind,
        DefectKind::PrevHashMismatch { .. }
    ));
}

fn tamper_and_verify(mutate: impl Fn(&mut Block)) -> Vec<DefectKind> {
    let ws = Workspace::new();
    let a = ws.file("a", b"a");
    let b = ws.file("b", b"b");
    let mut ledger = ws.ledger();
    ledger.append_signed("alice", &key(1), "n", &[&a, &b]).unwrap();
    ledger.append_signed("alice", &key(1), "n", &[&a]).unwrap();

    let mut blocks = ledger.load_all().unwrap();
    mutate(&mut blocks[0]);
    ledger.rewrite(blocks).unwrap();

    let report = Verifier::default().verify_store(&ledger).unwrap();
    assert!(report.defects.iter().all(|d| d.index == 0));
    report.defects.into_iter().map(|d| d.kind).collect()
}

fn has_block_hash_mismatch(kinds: &[DefectKind]) -> bool {
    kinds
        .iter()
        .any(|k| matches!(k, DefectKind::BlockHashMismatch { .. }))
}

#[test]
fn test_tamper_file_digest() {
    let kinds = tamper_and_verify(|b| b.files[1].sha256 = flip_bit(b.files[1].sha256, 31));
    assert!(has_block_hash_mismatch(&kinds));
}

#[test]
fn test_tamper_prev_hash() {
    let kinds = tamper_and_verify(|b| b.prev_hash = Some(digest_bytes(b"forged")));
    assert!(has_block_hash_mismatch(&kinds));
}

#[test]
fn test_tamper_merkle_root() {
    let kinds = tamper_and_verify(|b| b.merkle_root = flip_bit(b.merkle_root, 3));
    assert!(has_block_hash_mismatch(&kinds));
}

#[test]
fn test_tamper_notes() {
    let kinds = tamper_and_verify(|b| b.notes.push('!'));
    assert_eq!(kinds.len(), 1);
    assert!(has_block_hash_mismatch(&kinds));
}

#[test]
fn test_co_sign_threshold_round_trip() {
    let ws = Workspace::new();
    let a = ws.file("a", b"a");
    let mut ledger = ws.ledger();
    ledger.append_signed("alice", &key(1), "", &[&a]).unwrap();

    let threshold = Verifier::new(AcceptancePolicy::Threshold(Policy::new(["alice", "bob"], 2)));
    assert!(!threshold.verify_store(&ledger).unwrap().accepted());

    ledger.co_sign_block("bob", &key(2), None).unwrap();
    assert!(threshold.verify_store(&ledger).unwrap().accepted());

    let mut blocks = ledger.load_all().unwrap();
    blocks[0].signatures.retain(|s| s.signer != "alice");
    ledger.rewrite(blocks).unwrap();
    let report = threshold.verify_store(&ledger).unwrap();
    assert!(matches!(
        report.defects[..],
        [fabric_chain::Defect {
            kind: DefectKind::ThresholdNotMet { valid: 1, required: 2 },
            ..
        }]
    ));
}

#[test]
fn test_outside_signer_cannot_veto_threshold_block() {
    let ws = Workspace::new();
    let a = ws.file("a", b"a");
    let mut ledger = ws.ledger();
    ledger.append_signed("alice", &key(1), "", &[&a]).unwrap();

    let mut blocks = ledger.load_all().unwrap();
    let mut junk = sign_block(&blocks[0], &key(9), "mallory");
    junk.signature[10] ^= 0x40;
    attach(&mut blocks[0], junk);
    ledger.rewrite(blocks).unwrap();

    let threshold = Verifier::new(AcceptancePolicy::Threshold(Policy::new(["alice"], 1)));
    let report = threshold.verify_store(&ledger).unwrap();
    assert!(report.accepted(), "{:?}", report.defects);
    assert!(report.warnings.iter().any(|w| w.kind
        == WarningKind::SignerNotAllowed {
            signer: "mallory".into()
        }));

    let basic = Verifier::default().verify_store(&ledger).unwrap();
    assert!(basic
        .defects
        .iter()
        .any(|d| matches!(&d.kind, DefectKind::BadSignature { signer, .. } if signer == "mallory")));
}

#[test]
fn test_co_sign_twice_keeps_one_signature_per_signer() {
    let ws = Workspace::new();
    let a = ws.file("a", b"a");
    let mut ledger = ws.ledger();
    ledger.append_signed("alice", &key(1), "", &[&a]).unwrap();
    ledger.co_sign_block("bob", &key(2), Some(0)).unwrap();
    ledger.co_sign_block("bob", &key(3), Some(0)).unwrap();

    let block = ledger.get(0).unwrap().unwrap();
    assert_eq!(block.signers().collect::<Vec<_>>(), vec!["alice", "bob"]);
    assert!(Verifier::default().verify_store(&ledger).unwrap().accepted());
}

#[test]
fn test_keys_and_registry_from_config_layout() {
    let ws = Workspace::new();
    let a = ws.file("a", b"a");
    fs::create_dir_all(&ws.config.keys_dir).unwrap();
    let keys = KeyDirectory::new(&ws.config.keys_dir);
    fs::write(
        keys.key_path("alice"),
        fabric_chain::b64_fixed::encode(&[1u8; 32]),
    )
    .unwrap();

    let mut registry = PubkeyRegistry::new();
    registry.register("alice", key(2).verifying_key().to_bytes());
    registry.save(&ws.config.pubkeys_path).unwrap();

    let mut ledger = ws.ledger();
    let signing = keys.signing_key("alice").unwrap();
    ledger.append_signed("alice", &signing, "", &[&a]).unwrap();

    let registry = PubkeyRegistry::load(&ws.config.pubkeys_path).unwrap();
    let report = Verifier::default()
        .with_registry(registry)
        .verify_store(&ledger)
        .unwrap();
    assert!(report.accepted());
    assert_eq!(
        report.warnings[0].kind,
        WarningKind::RegistryMismatch {
            signer: "alice".into()
        }
    );
}

#[test]
fn test_malformed_line_is_input_error() {
    let ws = Workspace::new();
    let a = ws.file("a", b"a");
    let mut ledger = ws.ledger();
    ledger.append_signed("alice", &key(1), "", &[&a]).unwrap();

    let mut text = fs::read_to_string(&ws.config.ledger_path).unwrap();
    text = text.replace("\"sig_b64\":\"", "\"sig_b64\":\"AAAA");
    fs::write(&ws.config.ledger_path, text).unwrap();

    assert!(matches!(
        Verifier::default().verify_store(&ledger),
        Err(ChainError::MalformedLine { line: 1, .. })
    ));
}
