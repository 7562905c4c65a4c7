//! Append-only block storage, one canonical JSON record per line.
//!
//! Stores assume a single writer. Two processes appending or co-signing at
//! the same time can lose an update: the later full rewrite wins.

use crate::canonical::canonical_string;
use crate::error::{ChainError, Result};
use crate::types::Block;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Ordered block storage.
pub trait LedgerStore {
    /// Every block, in stored order. A store that was never created is an
    /// error ([`ChainError::MissingLedger`]); an empty store is not.
    fn load_all(&self) -> Result<Vec<Block>>;

    /// Append one block, creating the store if needed.
    fn append(&mut self, block: &Block) -> Result<()>;

    /// Replace the whole contents with `blocks`, sorted by index.
    fn rewrite(&mut self, blocks: Vec<Block>) -> Result<()>;

    /// The last block, or `None` if the store is empty or absent.
    fn tail(&self) -> Result<Option<Block>> {
        match self.load_all() {
            Ok(mut blocks) => Ok(blocks.pop()),
            Err(ChainError::MissingLedger(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// The block whose `index` field equals `index`.
    fn get(&self, index: u64) -> Result<Option<Block>> {
        Ok(self.load_all()?.into_iter().find(|b| b.index == index))
    }

    /// Substitute the block at `index` and rewrite the store.
    fn replace(&mut self, index: u64, block: Block) -> Result<()> {
        let mut blocks = self.load_all()?;
        let slot = blocks
            .iter_mut()
            .find(|b| b.index == index)
            .ok_or(ChainError::BlockNotFound(index))?;
        *slot = block;
        self.rewrite(blocks)?;
        info!(index, "replaced block");
        Ok(())
    }
}

/// Newline-delimited JSON ledger file.
#[derive(Debug, Clone)]
pub struct JsonlLedger {
    path: PathBuf,
}

impl JsonlLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| ChainError::io(parent, err))?;
            }
        }
        Ok(())
    }
}

/// Parse ledger text, skipping blank lines. Line numbers are 1-based.
pub fn parse_ledger(text: &str) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let block = serde_json::from_str(line)
            .map_err(|source| ChainError::MalformedLine { line: i + 1, source })?;
        blocks.push(block);
    }
    Ok(blocks)
}

/// Render blocks as ledger text, one canonical record per line.
pub fn render_ledger(blocks: &[Block]) -> Result<String> {
    let mut out = String::new();
    for block in blocks {
        out.push_str(&canonical_string(block)?);
        out.push('\n');
    }
    Ok(out)
}

impl LedgerStore for JsonlLedger {
    fn load_all(&self) -> Result<Vec<Block>> {
        let text = fs::read_to_string(&self.path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ChainError::MissingLedger(self.path.clone()),
            _ => ChainError::io(&self.path, err),
        })?;
        parse_ledger(&text)
    }

    fn append(&mut self, block: &Block) -> Result<()> {
        self.ensure_parent()?;
        let mut line = canonical_string(block)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| ChainError::io(&self.path, err))?;
        file.write_all(line.as_bytes())
            .map_err(|err| ChainError::io(&self.path, err))?;
        info!(index = block.index, hash = %block.block_hash, path = %self.path.display(), "appended block");
        Ok(())
    }

    fn rewrite(&mut self, mut blocks: Vec<Block>) -> Result<()> {
        self.ensure_parent()?;
        blocks.sort_by_key(|b| b.index);
        let text = render_ledger(&blocks)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, text).map_err(|err| ChainError::io(&tmp, err))?;
        fs::rename(&tmp, &self.path).map_err(|err| ChainError::io(&self.path, err))?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    blocks: Option<Vec<Block>>,
}

impl MemoryLedger {
    /// A store that exists but holds no blocks.
    pub fn new() -> Self {
        Self {
            blocks: Some(Vec::new()),
        }
    }

    /// A store that was never created.
    pub fn absent() -> Self {
        Self { blocks: None }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Some(blocks),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        self.blocks.as_deref().unwrap_or_default()
    }

    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        self.blocks.get_or_insert_with(Vec::new)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryLedger {
    fn load_all(&self) -> Result<Vec<Block>> {
        self.blocks
            .clone()
            .ok_or_else(|| ChainError::MissingLedger(PathBuf::from("<memory>")))
    }

    fn append(&mut self, block: &Block) -> Result<()> {
        self.blocks_mut().push(block.clone());
        Ok(())
    }

    fn rewrite(&mut self, mut blocks: Vec<Block>) -> Result<()> {
        blocks.sort_by_key(|b| b.index);
        self.blocks = Some(blocks);
        Ok(())
    }
}
