use alloy_primitives::Log;
use alloy_sol_types::{sol, SolEvent};

sol! {
    /// Emitted by the core contract each time a new L2 state is anchored on L1.
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    event LogStateUpdate(uint256 globalRoot, int256 blockNumber, uint256 blockHash);
}

/// Tries to decode the provided log into the type T.
pub fn try_decode_log<T: SolEvent>(log: &Log) -> Option<Log<T>> {
    T::decode_log(log).ok()
}
