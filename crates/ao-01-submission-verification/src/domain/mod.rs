//! # Domain Layer
//!
//! Pure verification logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod canonical;
pub mod consistency;
pub mod entities;
pub mod errors;
pub mod naming;
pub mod project_key;
pub mod recovery;
pub mod replay;
