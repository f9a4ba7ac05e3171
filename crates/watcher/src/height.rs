use crate::{L1ClientError, NotFoundError};
use std::fmt::{Display, Formatter};

use alloy_eips::BlockNumberOrTag;
use alloy_json_rpc::RpcError;
use alloy_transport::TransportErrorKind;

/// The query a [`BlockHeight`] was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeightKind {
    /// The current tip of the L1. Can move backwards on a reorg.
    Latest,
    /// The latest block finalized by Ethereum consensus. Non-decreasing under normal operation.
    Finalized,
}

impl HeightKind {
    /// Returns the block tag the height is queried with.
    pub const fn block_tag(self) -> BlockNumberOrTag {
        match self {
            Self::Latest => BlockNumberOrTag::Latest,
            Self::Finalized => BlockNumberOrTag::Finalized,
        }
    }
}

/// An L1 block number, tagged with the query that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHeight {
    /// The block number.
    pub number: u64,
    /// Whether the height is the latest or the finalized one.
    pub kind: HeightKind,
}

impl BlockHeight {
    /// Returns a [`BlockHeight`] for the L1 tip.
    pub const fn latest(number: u64) -> Self {
        Self { number, kind: HeightKind::Latest }
    }

    /// Returns a [`BlockHeight`] for the L1 finalized block.
    pub const fn finalized(number: u64) -> Self {
        Self { number, kind: HeightKind::Finalized }
    }

    /// Returns true if the height was produced by the finalized query.
    pub const fn is_finalized(&self) -> bool {
        matches!(self.kind, HeightKind::Finalized)
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            HeightKind::Latest => write!(f, "Latest({})", self.number),
            HeightKind::Finalized => write!(f, "Finalized({})", self.number),
        }
    }
}

impl From<BlockHeight> for u64 {
    fn from(value: BlockHeight) -> Self {
        value.number
    }
}

/// The error code geth replies with while no block has been finalized.
const FINALIZED_NOT_FOUND_CODE: i64 = -39001;

/// Resolves the outcome of a finalized header query into a [`BlockHeight`].
///
/// An absent block, either as a `null` response or as geth's "finalized block not found" error,
/// means the L1 has no finalized block yet and maps to [`NotFoundError::FinalizedBlock`].
/// Every other failure is returned as [`L1ClientError::Rpc`] for `call`.
pub(crate) fn resolve_finalized(
    call: &'static str,
    response: Result<Option<u64>, RpcError<TransportErrorKind>>,
) -> Result<BlockHeight, L1ClientError> {
    match response {
        Ok(Some(number)) => Ok(BlockHeight::finalized(number)),
        Ok(None) | Err(RpcError::NullResp) => Err(NotFoundError::FinalizedBlock.into()),
        Err(RpcError::ErrorResp(payload))
            if payload.code == FINALIZED_NOT_FOUND_CODE ||
                payload.message.contains("finalized block not found") =>
        {
            Err(NotFoundError::FinalizedBlock.into())
        }
        Err(err) => Err(L1ClientError::rpc(call, err)),
    }
}
