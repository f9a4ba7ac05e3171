//! Bindings to the L1 core contract observed by the bridge watcher.

pub mod abi;

mod constants;
pub use constants::*;
