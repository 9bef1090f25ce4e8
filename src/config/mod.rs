//! Configuration for vaultlock.

pub mod settings;

pub use settings::Settings;
