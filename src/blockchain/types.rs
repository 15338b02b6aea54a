// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger network types and constants.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash};
use serde::{Deserialize, Serialize};

/// Whether a network is a test network (faucet funding allowed) or production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Testnet,
    Mainnet,
}

impl NetworkKind {
    pub fn is_test(self) -> bool {
        matches!(self, NetworkKind::Testnet)
    }
}

/// Ledger network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Test or production network
    pub kind: NetworkKind,
    /// EIP-155 chain ID
    pub chain_id: u64,
    /// Default RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

impl NetworkConfig {
    /// Explorer link for a transaction hash.
    pub fn explorer_tx_url(&self, hash: &TxHash) -> String {
        format!("{}/tx/{}", self.explorer_url, hash)
    }
}

/// Avalanche C-Chain Mainnet configuration.
pub const AVAX_MAINNET: NetworkConfig = NetworkConfig {
    name: "Avalanche C-Chain",
    kind: NetworkKind::Mainnet,
    chain_id: 43114,
    rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    explorer_url: "https://snowtrace.io",
};

/// Avalanche Fuji Testnet configuration.
pub const AVAX_FUJI: NetworkConfig = NetworkConfig {
    name: "Avalanche Fuji Testnet",
    kind: NetworkKind::Testnet,
    chain_id: 43113,
    rpc_url: "https://api.avax-test.network/ext/bc/C/rpc",
    explorer_url: "https://testnet.snowtrace.io",
};

/// Resolve the network selector (`testnet` by default).
pub fn parse_network(raw: Option<&str>) -> Result<NetworkConfig, String> {
    let value = raw.unwrap_or("testnet").trim().to_ascii_lowercase();
    match value.as_str() {
        "testnet" | "fuji" => Ok(AVAX_FUJI),
        "mainnet" => Ok(AVAX_MAINNET),
        other => Err(format!(
            "Unsupported network `{other}`. Expected `testnet` or `mainnet`."
        )),
    }
}

/// Seconds a built transaction stays valid for submission.
pub const TX_VALIDITY_WINDOW: Duration = Duration::from_secs(30);

/// Default interval between confirmation polls.
pub const DEFAULT_CONFIRM_INTERVAL: Duration = Duration::from_millis(1500);

/// Default number of confirmation polls before giving up.
pub const DEFAULT_CONFIRM_ATTEMPTS: u32 = 20;

/// Whether a contract call mutates state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Simulate only and return the simulated value.
    Read,
    /// Simulate, sign, submit and wait for confirmation.
    Write,
}

/// Status of a submitted transaction as reported by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainStatus {
    Pending,
    Success,
    Failed,
}

/// A single call against one of the known contracts.
#[derive(Debug, Clone)]
pub struct ContractCall {
    /// Contract address
    pub contract: Address,
    /// Function name, for logs and error messages
    pub function: &'static str,
    /// ABI-encoded call data
    pub calldata: Bytes,
}

/// Confirmed write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    /// Transaction hash
    pub hash: TxHash,
    /// Always [`ChainStatus::Success`]; failures are errors
    pub status: ChainStatus,
}

impl TxResult {
    /// `0x`-prefixed hex hash, as persisted in chain annotations.
    pub fn hash_hex(&self) -> String {
        self.hash.to_string()
    }
}

/// Outcome of [`TxPipeline::invoke`](super::pipeline::TxPipeline::invoke).
#[derive(Debug, Clone)]
pub enum TxOutcome {
    /// Return data of a READ simulation
    Simulated(Bytes),
    /// Confirmed WRITE transaction
    Confirmed(TxResult),
}

/// Result of simulating an unsigned transaction.
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    /// Return data of the call
    pub return_data: Bytes,
    /// Gas the call consumed during simulation
    pub gas_used: u64,
}

/// EIP-1559 fee parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParams {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}
