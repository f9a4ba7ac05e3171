use alloy_json_rpc::RpcError;
use alloy_primitives::B256;
use alloy_transport::TransportErrorKind;
use std::time::Duration;

/// A [`Result`] that uses [`L1ClientError`] as the error type.
pub type L1ClientResult<T> = Result<T, L1ClientError>;

/// An error that occurred while constructing the [`crate::L1Client`]. A client is never returned
/// alongside this error.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The endpoint could not be parsed as a URL.
    #[error("invalid L1 endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The endpoint uses a scheme the HTTP transport cannot dial.
    #[error("unsupported L1 endpoint scheme {0}, expected http or https")]
    UnsupportedScheme(String),
    /// One of the provider headers is not a valid HTTP header value.
    #[error("invalid provider header value for {name}")]
    InvalidHeader {
        /// The name of the offending header.
        name: &'static str,
        /// The underlying parsing error.
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    /// Construction did not complete within the allotted time.
    #[error("timed out connecting to the L1 endpoint after {0:?}")]
    Timeout(Duration),
    /// A Provider error at the RPC level during construction.
    #[error("execution provider rpc error: {0:?}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// No contract is deployed at the configured address on the endpoint's chain.
    #[error("no core contract deployed at {0}, check that the L1 endpoint matches the L2 chain")]
    MissingContract(alloy_primitives::Address),
}

/// An error returned by a query on the [`crate::L1Client`].
#[derive(Debug, thiserror::Error)]
pub enum L1ClientError {
    /// A Provider error at the RPC level, tagged with the call that failed.
    #[error("{call} failed: {source:?}")]
    Rpc {
        /// The logical name of the failing call.
        call: &'static str,
        /// The transport or protocol failure.
        #[source]
        source: RpcError<TransportErrorKind>,
    },
    /// The requested item is not available yet.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// The operation was cancelled through its cancellation scope before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl L1ClientError {
    pub(crate) const fn rpc(call: &'static str, source: RpcError<TransportErrorKind>) -> Self {
        Self::Rpc { call, source }
    }

    /// Returns true if the error signals an expected transient absence rather than a fault.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// An item requested from the L1 does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NotFoundError {
    /// The endpoint has not produced a finalized block yet.
    #[error("finalized block not found")]
    FinalizedBlock,
    /// The transaction is unknown or not yet mined.
    #[error("receipt for transaction {0} not found")]
    Receipt(B256),
}

/// A terminal error surfaced on the [`crate::L1Subscription`] handle. Delivery stops once it is
/// emitted.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// Polling the installed filter failed.
    #[error("log subscription rpc error: {0:?}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The owning client was closed.
    #[error("l1 client closed")]
    ConnectionClosed,
}

/// An error that occurred while converting a log into a [`crate::StateAnchorEvent`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeLogError {
    /// The log does not decode as the expected event.
    #[error("log does not decode as LogStateUpdate")]
    UnexpectedEvent,
    /// The log is missing a block number.
    #[error("missing block number for log")]
    MissingBlockNumber,
    /// The log is missing a block hash.
    #[error("missing block hash for log")]
    MissingBlockHash,
    /// The log is missing a transaction hash.
    #[error("unknown transaction hash for log")]
    MissingTransactionHash,
}
