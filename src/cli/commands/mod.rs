//! One module per action.

pub mod keygen;
pub mod lock;
pub mod unlock;
