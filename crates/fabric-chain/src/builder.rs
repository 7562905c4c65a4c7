//! Creating and co-signing blocks on a ledger store.

use crate::block::build_block;
use crate::error::{ChainError, Result};
use crate::signature::{attach, co_sign, sign_block};
use crate::store::LedgerStore;
use crate::types::Block;
use ed25519_dalek::SigningKey;
use std::path::Path;
use tracing::info;

/// Ledger-level operations built on any [`LedgerStore`].
pub trait ChainBuilderExt {
    /// Build a block over `paths` linked to the current tail, sign it as
    /// `signer`, and append it.
    ///
    /// Nothing is written unless every file was digested and signing
    /// succeeded.
    fn append_signed<P: AsRef<Path>>(
        &mut self,
        signer: &str,
        key: &SigningKey,
        note: &str,
        paths: &[P],
    ) -> Result<Block>;

    /// Add or replace `signer`'s signature on the block at `index` (latest
    /// block when `None`) and rewrite the store.
    fn co_sign_block(
        &mut self,
        signer: &str,
        key: &SigningKey,
        index: Option<u64>,
    ) -> Result<Block>;
}

impl<S: LedgerStore + ?Sized> ChainBuilderExt for S {
    fn append_signed<P: AsRef<Path>>(
        &mut self,
        signer: &str,
        key: &SigningKey,
        note: &str,
        paths: &[P],
    ) -> Result<Block> {
        let prev = self.tail()?;
        let mut block = build_block(note, paths, prev.as_ref())?;
        let signature = sign_block(&block, key, signer);
        attach(&mut block, signature);
        self.append(&block)?;
        info!(
            index = block.index,
            signer,
            files = block.files.len(),
            "built new block"
        );
        Ok(block)
    }

    fn co_sign_block(
        &mut self,
        signer: &str,
        key: &SigningKey,
        index: Option<u64>,
    ) -> Result<Block> {
        let blocks = self.load_all()?;
        let target = match index {
            Some(index) => blocks
                .into_iter()
                .find(|b| b.index == index)
                .ok_or(ChainError::BlockNotFound(index))?,
            None => blocks.into_iter().last().ok_or(ChainError::EmptyLedger)?,
        };
        let index = target.index;
        let updated = co_sign(target, signer, key);
        self.replace(index, updated.clone())?;
        Ok(updated)
    }
}
