use crate::{random, L1CallListener, L1Client};
use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256, I256, U256};
use alloy_provider::RootProvider;
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{Block, Header, Log};
use alloy_sol_types::SolEvent;
use alloy_transport::mock::Asserter;
use bridge_l1::{abi::logs::LogStateUpdate, MAINNET_CORE_CONTRACT_ADDRESS};
use parking_lot::Mutex;

/// Test utils for arbitrary.
pub mod arbitrary;

/// A [`L1CallListener`] recording every observation it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    observations: Mutex<Vec<(&'static str, Duration)>>,
}

impl RecordingListener {
    /// Returns the recorded call names, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.observations.lock().iter().map(|(call, _)| *call).collect()
    }

    /// Returns the recorded observations, in order.
    pub fn observations(&self) -> Vec<(&'static str, Duration)> {
        self.observations.lock().clone()
    }
}

impl L1CallListener for RecordingListener {
    fn on_l1_call(&self, call: &'static str, duration: Duration) {
        self.observations.lock().push((call, duration));
    }
}

/// Returns a [`L1Client`] bound to the mainnet core contract, answering from the asserter, along
/// with the listener it reports to.
pub fn mock_client(asserter: &Asserter) -> (L1Client<RootProvider>, Arc<RecordingListener>) {
    let listener = Arc::new(RecordingListener::default());
    let provider = RootProvider::new(RpcClient::mocked(asserter.clone()));
    let client = L1Client::new(provider, MAINNET_CORE_CONTRACT_ADDRESS)
        .with_listener(listener.clone());
    (client, listener)
}

/// Returns an RPC block at the provided number with a random hash.
pub fn block(number: u64) -> Block {
    Block {
        header: Header {
            hash: random!(B256),
            inner: alloy_consensus::Header { number, ..Default::default() },
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Returns a `LogStateUpdate` log emitted by `address` in L1 block `l1_block`, anchoring L2 block
/// `l2_block`.
pub fn state_update_log(address: Address, l1_block: u64, l2_block: i64) -> Log {
    let event = LogStateUpdate {
        globalRoot: U256::from_be_bytes(random!(B256).0),
        blockNumber: I256::try_from(l2_block).unwrap(),
        blockHash: U256::from_be_bytes(random!(B256).0),
    };

    Log {
        inner: alloy_primitives::Log { address, data: event.encode_log_data() },
        block_hash: Some(random!(B256)),
        block_number: Some(l1_block),
        transaction_hash: Some(random!(B256)),
        log_index: Some(0),
        ..Default::default()
    }
}

/// Installs a tracing subscriber writing to the test output.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
