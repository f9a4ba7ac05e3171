use alloy_primitives::{address, Address};

/// The address of the core contract on Ethereum mainnet.
pub const MAINNET_CORE_CONTRACT_ADDRESS: Address =
    address!("0xc662c410C0ECf747543f5bA90660f6ABeBD9C8c4");

/// The address of the core contract on Sepolia.
pub const SEPOLIA_CORE_CONTRACT_ADDRESS: Address =
    address!("0xE2Bb56ee936fd6433DC0F6e7e3b8365C906AA057");

