pub mod archive;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod identity;
pub mod shred;
pub mod vault;
