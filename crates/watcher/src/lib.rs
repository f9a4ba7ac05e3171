//! L1 client for the bridge watcher.
//!
//! Gives the L2 node a narrow view of the L1: the latest and finalized heights, transaction
//! receipts and a live subscription to the `LogStateUpdate` events of the core contract. Every
//! outbound call is reported to an injected [`L1CallListener`].

mod client;
pub use client::L1Client;

mod config;
pub use config::{L1ClientArgs, L1ClientConfig};

mod constants;
pub use constants::{
    calls, state_update_filter, CONNECTION_TIMEOUT, DEFAULT_ORIGIN, DEFAULT_POLL_INTERVAL,
    DEFAULT_REFERER, DEFAULT_USER_AGENT, LAST_STATE_UPDATE_LOOKBACK, UNSUBSCRIBE_GRACE_PERIOD,
};

mod error;
pub use error::{
    ConnectionError, DecodeLogError, L1ClientError, L1ClientResult, NotFoundError,
    SubscriptionError,
};

mod event;
pub use event::{BlockInfo, StateAnchorEvent};

mod height;
pub use height::{BlockHeight, HeightKind};

mod listener;
pub use listener::{L1CallListener, MetricsListener, NoopListener};

mod metrics;

mod subscription;
pub use subscription::{L1Subscription, SubscriptionState};

pub mod transport;
pub use transport::{ProviderHeaders, ProviderHeadersLayer};

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;
