use crate::{
    constants::{DEFAULT_ORIGIN, DEFAULT_POLL_INTERVAL, DEFAULT_REFERER, DEFAULT_USER_AGENT},
    ConnectionError, ProviderHeaders,
};
use std::time::Duration;

use alloy_primitives::Address;
use bridge_l1::MAINNET_CORE_CONTRACT_ADDRESS;

/// The configuration of the [`crate::L1Client`].
#[derive(Debug, Clone)]
pub struct L1ClientConfig {
    /// The URL of the L1 execution endpoint.
    pub url: String,
    /// The address of the core contract.
    pub core_contract: Address,
    /// The headers injected into every outbound request.
    pub headers: ProviderHeaders,
    /// The interval at which subscriptions poll their filter.
    pub poll_interval: Duration,
    /// Whether construction requires code to be deployed at the core contract address.
    pub verify_contract: bool,
}

impl L1ClientConfig {
    /// Returns a new config for the endpoint and core contract, with the default headers and
    /// poll interval.
    pub fn new(url: impl Into<String>, core_contract: Address) -> Self {
        Self {
            url: url.into(),
            core_contract,
            headers: ProviderHeaders::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            verify_contract: false,
        }
    }

    /// Sets the provider headers.
    pub fn with_headers(mut self, headers: ProviderHeaders) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the subscription poll interval.
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Requires code at the core contract address on construction.
    pub const fn with_contract_verification(mut self, verify_contract: bool) -> Self {
        self.verify_contract = verify_contract;
        self
    }
}

/// The command line arguments for the L1 client.
#[derive(Debug, Clone, clap::Args)]
pub struct L1ClientArgs {
    /// The URL for the L1 RPC.
    #[arg(long = "l1.url", id = "l1_url", value_name = "L1_URL")]
    pub url: String,
    /// The address of the core contract.
    #[arg(long = "l1.core-contract", id = "l1_core_contract", value_name = "L1_CORE_CONTRACT", default_value_t = MAINNET_CORE_CONTRACT_ADDRESS)]
    pub core_contract: Address,
    /// The subscription poll interval (milliseconds).
    #[arg(long = "l1.poll-interval", id = "l1_poll_interval", value_name = "L1_POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,
    /// Whether to check the core contract is deployed on connection.
    #[arg(long = "l1.verify-contract", default_value_t = false)]
    pub verify_contract: bool,
    /// The `Origin` header sent to the L1 RPC.
    #[arg(long = "l1.origin", id = "l1_origin", value_name = "L1_ORIGIN", default_value = DEFAULT_ORIGIN)]
    pub origin: String,
    /// The `Referer` header sent to the L1 RPC.
    #[arg(long = "l1.referer", id = "l1_referer", value_name = "L1_REFERER", default_value = DEFAULT_REFERER)]
    pub referer: String,
    /// The `User-Agent` header sent to the L1 RPC.
    #[arg(long = "l1.user-agent", id = "l1_user_agent", value_name = "L1_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl TryFrom<L1ClientArgs> for L1ClientConfig {
    type Error = ConnectionError;

    fn try_from(args: L1ClientArgs) -> Result<Self, Self::Error> {
        let headers = ProviderHeaders::new(&args.origin, &args.referer, &args.user_agent)?;
        Ok(Self::new(args.url, args.core_contract)
            .with_headers(headers)
            .with_poll_interval(Duration::from_millis(args.poll_interval))
            .with_contract_verification(args.verify_contract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_l1::SEPOLIA_CORE_CONTRACT_ADDRESS;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        l1: L1ClientArgs,
    }

    #[test]
    fn test_should_parse_default_args() -> eyre::Result<()> {
        let cli = Cli::try_parse_from(["bridge", "--l1.url", "https://eth.example.org"])?;

        let config = L1ClientConfig::try_from(cli.l1)?;

        assert_eq!(config.url, "https://eth.example.org");
        assert_eq!(config.core_contract, MAINNET_CORE_CONTRACT_ADDRESS);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(!config.verify_contract);
        assert_eq!(config.headers, ProviderHeaders::default());

        Ok(())
    }

    #[test]
    fn test_should_parse_overrides() -> eyre::Result<()> {
        let core_contract = SEPOLIA_CORE_CONTRACT_ADDRESS.to_string();
        let cli = Cli::try_parse_from([
            "bridge",
            "--l1.url",
            "http://localhost:8545",
            "--l1.core-contract",
            core_contract.as_str(),
            "--l1.poll-interval",
            "500",
            "--l1.verify-contract",
            "--l1.user-agent",
            "bridge/0.1",
        ])?;

        let config = L1ClientConfig::try_from(cli.l1)?;

        assert_eq!(config.core_contract, SEPOLIA_CORE_CONTRACT_ADDRESS);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert!(config.verify_contract);
        assert_eq!(config.headers.to_header_map()[http::header::USER_AGENT], "bridge/0.1");

        Ok(())
    }

    #[test]
    fn test_should_reject_zero_poll_interval() {
        let res = Cli::try_parse_from([
            "bridge",
            "--l1.url",
            "http://localhost:8545",
            "--l1.poll-interval",
            "0",
        ]);

        assert!(res.is_err());
    }
}
