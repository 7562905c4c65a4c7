//! Fabric ledger CLI components.
//!
//! The command handlers are exposed as a library so they can be driven
//! from tests without spawning the binary.

pub mod commands;
