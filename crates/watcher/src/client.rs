use crate::{
    constants::{
        calls, state_update_filter, CONNECTION_TIMEOUT, DEFAULT_POLL_INTERVAL,
        UNSUBSCRIBE_GRACE_PERIOD,
    },
    height::resolve_finalized,
    listener::observe_call,
    subscription::uninstall_filter,
    transport::http_provider,
    BlockHeight, ConnectionError, HeightKind, L1CallListener, L1ClientConfig, L1ClientError,
    L1ClientResult, L1Subscription, NoopListener, NotFoundError, StateAnchorEvent,
    LAST_STATE_UPDATE_LOOKBACK,
};
use std::{future::IntoFuture, pin::pin, sync::Arc, time::Duration};

use alloy_primitives::{Address, B256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{Filter, TransactionReceipt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// The client the L2 node uses to observe the L1: chain progress, receipts and the state anchor
/// events of the core contract.
///
/// Queries take `&self` and may run concurrently. Each one is a single round trip reported to the
/// [`L1CallListener`]. Per call deadlines are left to the caller: wrapping a query in
/// [`tokio::time::timeout`] and dropping it cancels the request.
#[derive(Debug)]
pub struct L1Client<P> {
    /// The L1 execution node provider.
    provider: P,
    /// The address of the core contract.
    core_contract: Address,
    /// The `LogStateUpdate` filter bound to the core contract.
    filter: Filter,
    /// The hook notified after each call.
    listener: Arc<dyn L1CallListener>,
    /// The interval at which subscriptions poll their filter.
    poll_interval: Duration,
    /// Cancelled on [`L1Client::close`], terminating the live subscriptions.
    shutdown: CancellationToken,
}

impl L1Client<RootProvider> {
    /// Connects to the L1 endpoint described by the config, over the header injecting HTTP
    /// transport.
    ///
    /// Fails if the endpoint cannot be used or, when contract verification is enabled, if no
    /// contract is deployed at the core contract address. The whole construction is bounded by
    /// [`CONNECTION_TIMEOUT`].
    pub async fn connect(config: L1ClientConfig) -> Result<Self, ConnectionError> {
        Self::connect_within(config, CONNECTION_TIMEOUT).await
    }

    pub(crate) async fn connect_within(
        config: L1ClientConfig,
        timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        tracing::info!(
            target: "bridge::watcher",
            url = %config.url,
            core_contract = %config.core_contract,
            "connecting to L1 endpoint"
        );

        let url = Url::parse(&config.url)?;
        let provider = http_provider(url, &config.headers)?;
        let client =
            Self::new(provider, config.core_contract).with_poll_interval(config.poll_interval);

        if config.verify_contract {
            tokio::time::timeout(timeout, client.verify_core_contract())
                .await
                .map_err(|_| ConnectionError::Timeout(timeout))??;
        }

        Ok(client)
    }
}

impl<P> L1Client<P>
where
    P: Provider,
{
    /// Returns a new [`L1Client`] over the provided provider, bound to the core contract.
    pub fn new(provider: P, core_contract: Address) -> Self {
        Self {
            provider,
            core_contract,
            filter: state_update_filter(core_contract),
            listener: Arc::new(NoopListener),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown: CancellationToken::new(),
        }
    }

    /// Sets the [`L1CallListener`] notified after each call.
    pub fn with_listener(mut self, listener: Arc<dyn L1CallListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Sets the interval at which subscriptions poll their filter.
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns the address of the core contract the client is bound to.
    pub const fn core_contract(&self) -> Address {
        self.core_contract
    }

    /// Returns a reference to the underlying provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the chain id of the L1.
    pub async fn chain_id(&self) -> L1ClientResult<u64> {
        self.observe(calls::CHAIN_ID, self.provider.get_chain_id())
            .await
            .map_err(|err| L1ClientError::rpc(calls::CHAIN_ID, err))
    }

    /// Returns the height of the L1 tip. The value can move backwards on a reorg and should not
    /// be cached across anchoring decisions.
    pub async fn latest_height(&self) -> L1ClientResult<BlockHeight> {
        let number = self
            .observe(calls::BLOCK_NUMBER, self.provider.get_block_number())
            .await
            .map_err(|err| L1ClientError::rpc(calls::BLOCK_NUMBER, err))?;
        Ok(BlockHeight::latest(number))
    }

    /// Returns the height of the latest block finalized by Ethereum consensus.
    ///
    /// Returns [`NotFoundError::FinalizedBlock`] while the L1 has no finalized block, which
    /// callers should treat as finality not being available yet.
    pub async fn finalized_height(&self) -> L1ClientResult<BlockHeight> {
        let tag = HeightKind::Finalized.block_tag();
        let response = self
            .observe(calls::GET_BLOCK_BY_NUMBER, self.provider.get_block_by_number(tag))
            .await
            .map(|block| block.map(|block| block.header.number));

        let height = resolve_finalized(calls::GET_BLOCK_BY_NUMBER, response);
        if let Err(L1ClientError::NotFound(_)) = &height {
            tracing::debug!(target: "bridge::watcher", "finalized block not available yet");
        }
        height
    }

    /// Returns the receipt of the transaction.
    ///
    /// A transaction which is unknown or not yet mined yields [`NotFoundError::Receipt`].
    pub async fn transaction_receipt(&self, hash: B256) -> L1ClientResult<TransactionReceipt> {
        self.observe(calls::GET_TRANSACTION_RECEIPT, self.provider.get_transaction_receipt(hash))
            .await
            .map_err(|err| L1ClientError::rpc(calls::GET_TRANSACTION_RECEIPT, err))?
            .ok_or_else(|| NotFoundError::Receipt(hash).into())
    }

    /// Returns the most recent state anchor event emitted in the last
    /// [`LAST_STATE_UPDATE_LOOKBACK`] blocks, if any.
    pub async fn last_state_update(&self) -> L1ClientResult<Option<StateAnchorEvent>> {
        let latest = self.latest_height().await?;
        let filter = self
            .filter
            .clone()
            .from_block(latest.number.saturating_sub(LAST_STATE_UPDATE_LOOKBACK))
            .to_block(latest.number);

        let logs = self
            .observe(calls::GET_LOGS, self.provider.get_logs(&filter))
            .await
            .map_err(|err| L1ClientError::rpc(calls::GET_LOGS, err))?;

        Ok(logs.iter().rev().find_map(|log| {
            StateAnchorEvent::try_from(log)
                .inspect_err(|err| {
                    tracing::warn!(target: "bridge::watcher", ?err, ?log, "skipping undecodable log")
                })
                .ok()
        }))
    }

    /// Checks a contract is deployed at the core contract address.
    async fn verify_core_contract(&self) -> Result<(), ConnectionError> {
        let code =
            self.observe(calls::GET_CODE, self.provider.get_code_at(self.core_contract)).await?;
        if code.is_empty() {
            return Err(ConnectionError::MissingContract(self.core_contract));
        }
        Ok(())
    }

    async fn observe<F: IntoFuture>(&self, call: &'static str, request: F) -> F::Output {
        observe_call(&*self.listener, call, request).await
    }

    /// Releases the client. Live subscriptions terminate with
    /// [`crate::SubscriptionError::ConnectionClosed`].
    pub fn close(self) {
        tracing::info!(target: "bridge::watcher", core_contract = %self.core_contract, "closing L1 client");
        self.shutdown.cancel();
    }
}

impl<P> L1Client<P>
where
    P: Provider + Clone + 'static,
{
    /// Subscribes to the `LogStateUpdate` events of the core contract emitted from now on.
    ///
    /// Decoded events are sent to `sink` in the order the endpoint returns them. The `scope`
    /// governs both the installation of the filter and the delivery: cancelling it ends the
    /// subscription. Failures after installation are reported on the returned handle and end
    /// delivery; the subscription is never re-established.
    #[tracing::instrument(
        target = "bridge::watcher",
        skip_all,
        fields(core_contract = %self.core_contract)
    )]
    pub async fn watch_log_state_update(
        &self,
        scope: &CancellationToken,
        sink: mpsc::Sender<StateAnchorEvent>,
    ) -> L1ClientResult<L1Subscription> {
        let cancel = scope.child_token();
        if cancel.is_cancelled() {
            return Err(L1ClientError::Cancelled)
        }

        let mut install =
            pin!(self.observe(calls::NEW_FILTER, self.provider.new_filter(&self.filter)));
        let installed = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = &mut install => Some(res),
        };

        // The request may already have reached the endpoint: let it land and remove the filter.
        let Some(installed) = installed else {
            if let Ok(Ok(filter_id)) = tokio::time::timeout(UNSUBSCRIBE_GRACE_PERIOD, install).await
            {
                uninstall_filter(&self.provider, &*self.listener, filter_id).await;
            }
            return Err(L1ClientError::Cancelled)
        };
        let filter_id = installed.map_err(|err| L1ClientError::rpc(calls::NEW_FILTER, err))?;
        tracing::debug!(target: "bridge::watcher", %filter_id, "installed LogStateUpdate filter");

        Ok(L1Subscription::spawn(
            self.provider.clone(),
            filter_id,
            sink,
            self.listener.clone(),
            self.poll_interval,
            cancel,
            self.shutdown.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{block, mock_client, state_update_log, RecordingListener},
        ProviderHeaders, DEFAULT_ORIGIN, DEFAULT_USER_AGENT,
    };

    use alloy_primitives::{Bytes, U64};
    use alloy_transport::mock::Asserter;
    use bridge_l1::MAINNET_CORE_CONTRACT_ADDRESS;
    use httpmock::prelude::*;

    fn rpc_result(id: u64, result: &str) -> String {
        format!(r#"{{"jsonrpc":"2.0","id":{id},"result":{result}}}"#)
    }

    fn endpoint_config(server: &MockServer) -> L1ClientConfig {
        L1ClientConfig::new(server.base_url(), MAINNET_CORE_CONTRACT_ADDRESS)
            .with_contract_verification(true)
    }

    #[tokio::test]
    async fn test_connect_should_reject_invalid_url() {
        let config = L1ClientConfig::new("not a url", MAINNET_CORE_CONTRACT_ADDRESS);

        let err = L1Client::connect(config).await.unwrap_err();

        assert!(matches!(err, ConnectionError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_connect_should_reject_websocket_endpoint() {
        let config = L1ClientConfig::new("ws://localhost:8546", MAINNET_CORE_CONTRACT_ADDRESS);

        let err = L1Client::connect(config).await.unwrap_err();

        assert!(matches!(err, ConnectionError::UnsupportedScheme(scheme) if scheme == "ws"));
    }

    #[tokio::test]
    async fn test_connect_should_verify_core_contract_with_provider_headers() -> eyre::Result<()> {
        let server = MockServer::start_async().await;
        let get_code = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("origin", DEFAULT_ORIGIN)
                    .header("user-agent", DEFAULT_USER_AGENT)
                    .body_contains("eth_getCode");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(rpc_result(0, r#""0x6080""#));
            })
            .await;

        let client = L1Client::connect(endpoint_config(&server)).await?;

        get_code.assert_async().await;
        assert_eq!(client.core_contract(), MAINNET_CORE_CONTRACT_ADDRESS);

        Ok(())
    }

    #[tokio::test]
    async fn test_connect_should_reject_endpoint_without_core_contract() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_getCode");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(rpc_result(0, r#""0x""#));
            })
            .await;

        let err = L1Client::connect(endpoint_config(&server)).await.unwrap_err();

        assert!(matches!(
            err,
            ConnectionError::MissingContract(address) if address == MAINNET_CORE_CONTRACT_ADDRESS
        ));
    }

    #[tokio::test]
    async fn test_connect_should_time_out_on_unresponsive_endpoint() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_getCode");
                then.status(200)
                    .header("content-type", "application/json")
                    .delay(Duration::from_secs(2))
                    .body(rpc_result(0, r#""0x6080""#));
            })
            .await;
        let timeout = Duration::from_millis(50);

        let err = L1Client::connect_within(endpoint_config(&server), timeout).await.unwrap_err();

        assert!(matches!(err, ConnectionError::Timeout(elapsed) if elapsed == timeout));
    }

    #[tokio::test]
    async fn test_should_uninstall_filter_installed_after_cancellation() -> eyre::Result<()> {
        let server = MockServer::start_async().await;
        let new_filter = server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_newFilter");
                then.status(200)
                    .header("content-type", "application/json")
                    .delay(Duration::from_millis(200))
                    .body(rpc_result(0, r#""0x2a""#));
            })
            .await;
        let uninstall = server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_uninstallFilter");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(rpc_result(1, "true"));
            })
            .await;

        let listener = Arc::new(RecordingListener::default());
        let provider = http_provider(server.base_url().parse()?, &ProviderHeaders::default())?;
        let client =
            L1Client::new(provider, MAINNET_CORE_CONTRACT_ADDRESS).with_listener(listener.clone());

        let scope = CancellationToken::new();
        let canceller = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let (tx, _rx) = mpsc::channel(1);
        let err = client.watch_log_state_update(&scope, tx).await.unwrap_err();

        assert!(matches!(err, L1ClientError::Cancelled));
        new_filter.assert_async().await;
        uninstall.assert_async().await;
        assert_eq!(listener.calls(), vec![calls::NEW_FILTER, calls::UNINSTALL_FILTER]);

        Ok(())
    }

    #[tokio::test]
    async fn test_should_return_chain_id() -> eyre::Result<()> {
        let asserter = Asserter::new();
        asserter.push_success(&U64::from(11155111));
        let (client, listener) = mock_client(&asserter);

        assert_eq!(client.chain_id().await?, 11155111);
        assert_eq!(listener.calls(), vec![calls::CHAIN_ID]);

        Ok(())
    }

    #[tokio::test]
    async fn test_should_report_failed_calls() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("upstream unavailable");
        let (client, listener) = mock_client(&asserter);

        let err = client.latest_height().await.unwrap_err();

        assert!(matches!(err, L1ClientError::Rpc { call: calls::BLOCK_NUMBER, .. }));
        assert_eq!(listener.calls(), vec![calls::BLOCK_NUMBER]);
    }

    #[tokio::test]
    async fn test_should_return_finalized_height() -> eyre::Result<()> {
        let asserter = Asserter::new();
        asserter.push_success(&block(100));
        let (client, listener) = mock_client(&asserter);

        let height = client.finalized_height().await?;

        assert_eq!(height, BlockHeight::finalized(100));
        assert_eq!(listener.calls(), vec![calls::GET_BLOCK_BY_NUMBER]);

        Ok(())
    }

    #[tokio::test]
    async fn test_should_return_not_found_for_missing_receipt() {
        let asserter = Asserter::new();
        asserter.push_success(&Option::<TransactionReceipt>::None);
        let (client, listener) = mock_client(&asserter);
        let hash = B256::repeat_byte(0x11);

        let err = client.transaction_receipt(hash).await.unwrap_err();

        assert!(matches!(err, L1ClientError::NotFound(NotFoundError::Receipt(h)) if h == hash));
        assert_eq!(listener.calls(), vec![calls::GET_TRANSACTION_RECEIPT]);
    }

    #[tokio::test]
    async fn test_should_return_rpc_error_for_failed_receipt() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("header not found");
        let (client, _) = mock_client(&asserter);

        let err = client.transaction_receipt(B256::ZERO).await.unwrap_err();

        assert!(matches!(err, L1ClientError::Rpc { call: calls::GET_TRANSACTION_RECEIPT, .. }));
    }

    #[tokio::test]
    async fn test_should_return_last_state_update() -> eyre::Result<()> {
        let asserter = Asserter::new();
        let (client, listener) = mock_client(&asserter);
        let logs = vec![
            state_update_log(client.core_contract(), 7_990, 41),
            state_update_log(client.core_contract(), 7_995, 42),
        ];
        asserter.push_success(&U64::from(8_000));
        asserter.push_success(&logs);

        let event = client.last_state_update().await?.expect("state update");

        assert_eq!(event.block_info.number, 7_995);
        assert_eq!(listener.calls(), vec![calls::BLOCK_NUMBER, calls::GET_LOGS]);

        Ok(())
    }

    #[tokio::test]
    async fn test_should_reject_missing_core_contract() {
        let asserter = Asserter::new();
        asserter.push_success(&Bytes::new());
        let (client, _) = mock_client(&asserter);

        let err = client.verify_core_contract().await.unwrap_err();

        assert!(matches!(err, ConnectionError::MissingContract(address) if address == client.core_contract()));
    }

    #[tokio::test]
    async fn test_should_not_install_filter_in_cancelled_scope() {
        let asserter = Asserter::new();
        let (client, listener) = mock_client(&asserter);
        let (tx, _rx) = mpsc::channel(1);
        let scope = CancellationToken::new();
        scope.cancel();

        let err = client.watch_log_state_update(&scope, tx).await.unwrap_err();

        assert!(matches!(err, L1ClientError::Cancelled));
        assert!(listener.calls().is_empty());
    }
}
