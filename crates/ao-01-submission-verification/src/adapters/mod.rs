//! # Adapters Module
//!
//! Infrastructure adapters implementing the ports.

pub mod clock;
pub mod fs_store;
pub mod oracle;
pub mod replay_ledger;
