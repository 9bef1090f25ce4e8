//! Vault lifecycle: the `keygen`, `lock` and `unlock` state transitions.
//!
//! This module provides:
//! - `Vault`, the on-disk names derived from a vault name, and its
//!   `VaultState` (`state`)
//! - `Engine`, which sequences identity, archive, encryption and
//!   shredding for each transition (`engine`)

pub mod engine;
pub mod state;

pub use engine::{Engine, LockReport, UnlockReport};
pub use state::{Vault, VaultState};
