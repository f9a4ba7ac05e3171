use std::time::Duration;

use alloy_primitives::Address;
use alloy_rpc_types_eth::Filter;
use alloy_sol_types::SolEvent;
use bridge_l1::abi::logs::LogStateUpdate;

/// The overall bound on [`crate::L1Client::connect`].
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// The interval at which a subscription polls its installed filter.
#[cfg(any(test, feature = "test-utils"))]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// The interval at which a subscription polls its installed filter.
#[cfg(not(any(test, feature = "test-utils")))]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(12);

/// How long [`crate::L1Subscription::unsubscribe`] waits for the delivery task before aborting it.
pub const UNSUBSCRIBE_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// The amount of blocks scanned backwards from the tip by
/// [`crate::L1Client::last_state_update`]. Roughly a day of L1 blocks.
pub const LAST_STATE_UPDATE_LOOKBACK: u64 = 6000;

/// The `Origin` header sent to the L1 endpoint by default.
pub const DEFAULT_ORIGIN: &str = "https://app.uniswap.org";

/// The `Referer` header sent to the L1 endpoint by default.
pub const DEFAULT_REFERER: &str = "https://app.uniswap.org/";

/// The `User-Agent` header sent to the L1 endpoint by default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

/// The logical call names reported to the [`crate::L1CallListener`].
pub mod calls {
    /// `eth_chainId`.
    pub const CHAIN_ID: &str = "eth_chainId";
    /// `eth_blockNumber`.
    pub const BLOCK_NUMBER: &str = "eth_blockNumber";
    /// `eth_getBlockByNumber`.
    pub const GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";
    /// `eth_getTransactionReceipt`.
    pub const GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
    /// `eth_getCode`.
    pub const GET_CODE: &str = "eth_getCode";
    /// `eth_getLogs`.
    pub const GET_LOGS: &str = "eth_getLogs";
    /// `eth_newFilter`.
    pub const NEW_FILTER: &str = "eth_newFilter";
    /// `eth_getFilterChanges`.
    pub const GET_FILTER_CHANGES: &str = "eth_getFilterChanges";
    /// `eth_uninstallFilter`.
    pub const UNINSTALL_FILTER: &str = "eth_uninstallFilter";
}

/// Returns the [`Filter`] matching `LogStateUpdate` events emitted by the core contract.
pub fn state_update_filter(core_contract: Address) -> Filter {
    Filter::new().address(core_contract).event_signature(LogStateUpdate::SIGNATURE_HASH)
}
