//! Property tests for Merkle folding and block hashing.

use chrono::{TimeZone, Utc};
use fabric_chain::{
    assemble_block, canonical_string, compute_block_hash, digest_bytes, merkle_root, Block,
    FileRecord, Hash256,
};
use proptest::prelude::*;

fn arb_hash() -> impl Strategy<Value = Hash256> {
    any::<[u8; 32]>().prop_map(Hash256)
}

fn arb_record() -> impl Strategy<Value = FileRecord> {
    ("[a-z0-9/._ é]{1,24}", any::<u64>(), arb_hash()).prop_map(|(path, bytes, sha256)| {
        FileRecord {
            path,
            bytes,
            sha256,
        }
    })
}

proptest! {
    #[test]
    fn merkle_root_is_deterministic(leaves in prop::collection::vec(arb_hash(), 1..40)) {
        prop_assert_eq!(merkle_root(&leaves), merkle_root(&leaves.clone()));
    }

    #[test]
    fn merkle_root_depends_on_order(
        leaves in prop::collection::vec(arb_hash(), 2..20),
    ) {
        prop_assume!(leaves[0] != leaves[1]);
        let mut swapped = leaves.clone();
        swapped.swap(0, 1);
        prop_assert_ne!(merkle_root(&leaves), merkle_root(&swapped));
    }

    #[test]
    fn block_hash_survives_persistence(
        index in 0u64..1_000_000,
        prev in prop::option::of(arb_hash()),
        secs in 0i64..4_000_000_000,
        files in prop::collection::vec(arb_record(), 1..6),
        notes in "\\PC{0,40}",
    ) {
        let timestamp = Utc.timestamp_opt(secs, 0).unwrap();
        let block = assemble_block(index, prev, timestamp, files, &notes).unwrap();

        let line = canonical_string(&block).unwrap();
        let reloaded: Block = serde_json::from_str(&line).unwrap();
        prop_assert_eq!(&reloaded, &block);
        prop_assert_eq!(compute_block_hash(&reloaded).unwrap(), block.block_hash);
    }
}

#[test]
fn merkle_root_of_nothing_is_empty_digest() {
    assert_eq!(merkle_root(&[]), digest_bytes(&[]));
}
