//! ABI of the core contract, restricted to the items the bridge watcher consumes.

/// Events emitted by the core contract.
pub mod logs;
