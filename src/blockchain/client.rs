// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger RPC endpoint.
//!
//! [`LedgerRpc`] is the narrow surface the transaction pipeline needs from a
//! node: account nonce, simulation, fee quote, raw submission and status
//! lookup. [`AlloyRpc`] implements it over JSON-RPC with alloy.

use std::future::IntoFuture;
use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    network::Ethereum,
    primitives::{Address, Bytes, TxHash},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use tokio::time::timeout;

use super::types::{ChainStatus, FeeParams, NetworkConfig, Simulation};

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Standard priority fee (1.5 gwei).
const DEFAULT_PRIORITY_FEE: u128 = 1_500_000_000;

/// Base fee assumed when the latest block does not report one (25 gwei).
const FALLBACK_BASE_FEE: u128 = 25_000_000_000;

/// Per-request timeout for RPC calls.
const RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors from the RPC endpoint.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    Transport(String),

    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    #[error("{0}")]
    Reverted(String),
}

/// Operations consumed from a ledger node.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Next nonce for `address`, including pending transactions.
    async fn account_nonce(&self, address: Address) -> Result<u64, RpcError>;

    /// Dry-run an unsigned transaction.
    async fn simulate(&self, tx: &TransactionRequest) -> Result<Simulation, RpcError>;

    /// Current EIP-1559 fee quote.
    async fn fee_params(&self) -> Result<FeeParams, RpcError>;

    /// Broadcast a signed, EIP-2718 encoded transaction.
    async fn submit(&self, raw_tx: Bytes) -> Result<TxHash, RpcError>;

    /// Look up the status of a submitted transaction.
    async fn transaction_status(&self, hash: TxHash) -> Result<ChainStatus, RpcError>;
}

/// JSON-RPC implementation of [`LedgerRpc`].
pub struct AlloyRpc {
    provider: HttpProvider,
    rpc_url: String,
}

impl AlloyRpc {
    /// Connect to `rpc_url`. No request is made until the first call.
    pub fn connect(rpc_url: &str) -> Result<Self, RpcError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| RpcError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
        })
    }

    /// Connect to the default endpoint of `network`.
    pub fn for_network(network: &NetworkConfig) -> Result<Self, RpcError> {
        Self::connect(network.rpc_url)
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

async fn with_timeout<F, T, E>(fut: F) -> Result<T, RpcError>
where
    F: IntoFuture<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match timeout(RPC_TIMEOUT, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RpcError::Transport(e.to_string())),
        Err(_) => Err(RpcError::Timeout(RPC_TIMEOUT.as_secs())),
    }
}

#[async_trait]
impl LedgerRpc for AlloyRpc {
    async fn account_nonce(&self, address: Address) -> Result<u64, RpcError> {
        with_timeout(self.provider.get_transaction_count(address).pending()).await
    }

    async fn simulate(&self, tx: &TransactionRequest) -> Result<Simulation, RpcError> {
        let return_data = with_timeout(self.provider.call(tx.clone()))
            .await
            .map_err(into_revert)?;
        let gas_used = with_timeout(self.provider.estimate_gas(tx.clone()))
            .await
            .map_err(into_revert)?;

        Ok(Simulation {
            return_data,
            gas_used,
        })
    }

    async fn fee_params(&self) -> Result<FeeParams, RpcError> {
        let block = with_timeout(self.provider.get_block_by_number(BlockNumberOrTag::Latest))
            .await?
            .ok_or_else(|| RpcError::Transport("No latest block".to_string()))?;

        let base_fee = block
            .header
            .base_fee_per_gas
            .map(u128::from)
            .unwrap_or(FALLBACK_BASE_FEE);

        // Max fee = 2 * base_fee + priority_fee (allows for base fee increase)
        let max_fee = base_fee
            .saturating_mul(2)
            .saturating_add(DEFAULT_PRIORITY_FEE);

        Ok(FeeParams {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: DEFAULT_PRIORITY_FEE,
        })
    }

    async fn submit(&self, raw_tx: Bytes) -> Result<TxHash, RpcError> {
        let pending = with_timeout(self.provider.send_raw_transaction(&raw_tx)).await?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_status(&self, hash: TxHash) -> Result<ChainStatus, RpcError> {
        let receipt = with_timeout(self.provider.get_transaction_receipt(hash)).await?;

        Ok(match receipt {
            None => ChainStatus::Pending,
            Some(r) if r.status() => ChainStatus::Success,
            Some(_) => ChainStatus::Failed,
        })
    }
}

fn into_revert(e: RpcError) -> RpcError {
    match e {
        RpcError::Transport(msg) if msg.contains("revert") => RpcError::Reverted(msg),
        other => other,
    }
}
