use crate::DecodeLogError;
use std::fmt::{Display, Formatter};

use alloy_primitives::{B256, I256, U256};
use alloy_rpc_types_eth::Log;
use bridge_l1::abi::logs::{try_decode_log, LogStateUpdate};

/// Information about an L1 block.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlockInfo {
    /// The block number.
    pub number: u64,
    /// The block hash.
    pub hash: B256,
}

impl BlockInfo {
    /// Returns a new instance of [`BlockInfo`].
    pub const fn new(number: u64, hash: B256) -> Self {
        Self { number, hash }
    }
}

impl Display for BlockInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockInfo {{ number: {}, hash: {} }}", self.number, self.hash)
    }
}

/// A new L2 state anchored on L1 by the core contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateAnchorEvent {
    /// The L1 block the event was included in.
    pub block_info: BlockInfo,
    /// The hash of the L1 transaction which emitted the event.
    pub transaction_hash: B256,
    /// The index of the log in the L1 block, if provided by the endpoint.
    pub log_index: Option<u64>,
    /// The committed global state root of the L2.
    pub global_root: U256,
    /// The L2 block number the state root was committed for.
    pub l2_block_number: I256,
    /// The L2 block hash the state root was committed for.
    pub l2_block_hash: U256,
}

impl Display for StateAnchorEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StateAnchor {{ block_info: {}, l2_block_number: {}, global_root: {:#x} }}",
            self.block_info, self.l2_block_number, self.global_root
        )
    }
}

impl TryFrom<&Log> for StateAnchorEvent {
    type Error = DecodeLogError;

    fn try_from(log: &Log) -> Result<Self, Self::Error> {
        let decoded =
            try_decode_log::<LogStateUpdate>(&log.inner).ok_or(DecodeLogError::UnexpectedEvent)?;
        let number = log.block_number.ok_or(DecodeLogError::MissingBlockNumber)?;
        let hash = log.block_hash.ok_or(DecodeLogError::MissingBlockHash)?;
        let transaction_hash =
            log.transaction_hash.ok_or(DecodeLogError::MissingTransactionHash)?;

        Ok(Self {
            block_info: BlockInfo { number, hash },
            transaction_hash,
            log_index: log.log_index,
            global_root: decoded.data.globalRoot,
            l2_block_number: decoded.data.blockNumber,
            l2_block_hash: decoded.data.blockHash,
        })
    }
}
