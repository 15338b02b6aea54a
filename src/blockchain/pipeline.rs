// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contract-call pipeline.
//!
//! Every contract invocation goes through the same stages:
//!
//! 1. load the signer's account nonce
//! 2. build the unsigned call (the 30 s validity window starts here)
//! 3. simulate; a READ returns the simulated value and stops
//! 4. assemble gas and fees, sign, submit
//! 5. poll until the network reports SUCCESS or FAILED, or the attempt
//!    budget runs out
//!
//! A hash is only handed back inside a [`TxResult`] once the transaction
//! reached SUCCESS. Nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use alloy::{
    network::TransactionBuilder,
    primitives::{Bytes, TxHash},
    rpc::types::TransactionRequest,
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::client::LedgerRpc;
use super::confirm::{ConfirmationPoll, ConfirmationPolicy, PollStep};
use super::signing::LedgerSigner;
use super::types::{
    ChainStatus, ContractCall, NetworkConfig, TxMode, TxOutcome, TxResult, TX_VALIDITY_WINDOW,
};
use crate::custody::CryptoError;

/// Gas headroom over the simulated amount, in percent.
const GAS_HEADROOM_PERCENT: u64 = 20;

/// Errors from contract calls.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Key custody error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Simulation failed: {0}")]
    Simulation(String),

    #[error("Submission rejected: {0}")]
    Submission(String),

    #[error("Transaction {hash} failed on chain")]
    ChainFailure { hash: TxHash },

    #[error("Transaction {hash} not confirmed after {attempts} status checks")]
    ConfirmationTimeout { hash: TxHash, attempts: u32 },
}

impl TxError {
    /// Whether the error is missing or invalid local configuration rather
    /// than a network or chain outcome.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TxError::NotConfigured(_) | TxError::Configuration(_) | TxError::Crypto(_)
        )
    }
}

/// Executes contract calls against one network.
pub struct TxPipeline {
    rpc: Arc<dyn LedgerRpc>,
    network: NetworkConfig,
    policy: ConfirmationPolicy,
}

impl TxPipeline {
    pub fn new(rpc: Arc<dyn LedgerRpc>, network: NetworkConfig, policy: ConfirmationPolicy) -> Self {
        Self {
            rpc,
            network,
            policy,
        }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    /// Run `call` signed by `signer`.
    pub async fn invoke(
        &self,
        call: &ContractCall,
        signer: &dyn LedgerSigner,
        mode: TxMode,
    ) -> Result<TxOutcome, TxError> {
        let from = signer.address()?;

        let nonce = self.rpc.account_nonce(from).await.map_err(|e| {
            TxError::Simulation(format!("failed to load account {from}: {e}"))
        })?;

        let built_at = Instant::now();
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(call.contract)
            .with_input(call.calldata.clone())
            .with_nonce(nonce)
            .with_chain_id(self.network.chain_id);

        let simulation = self
            .rpc
            .simulate(&tx)
            .await
            .map_err(|e| TxError::Simulation(format!("{}: {e}", call.function)))?;

        if mode == TxMode::Read {
            debug!(function = call.function, contract = %call.contract, "Simulated read call");
            return Ok(TxOutcome::Simulated(simulation.return_data));
        }

        let fees = self
            .rpc
            .fee_params()
            .await
            .map_err(|e| TxError::Simulation(format!("fee quote failed: {e}")))?;

        let tx = tx
            .with_gas_limit(with_headroom(simulation.gas_used))
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        let raw = signer.sign(tx).await?;

        if built_at.elapsed() > TX_VALIDITY_WINDOW {
            return Err(TxError::Submission(format!(
                "{} was built more than {}s ago and is no longer valid",
                call.function,
                TX_VALIDITY_WINDOW.as_secs()
            )));
        }

        let hash = self
            .rpc
            .submit(raw)
            .await
            .map_err(|e| TxError::Submission(format!("{}: {e}", call.function)))?;

        info!(
            function = call.function,
            contract = %call.contract,
            tx_hash = %hash,
            nonce,
            "Transaction submitted"
        );

        let result = self.confirm(hash, call.function).await?;
        Ok(TxOutcome::Confirmed(result))
    }

    /// Simulate `call` and return its return data.
    pub async fn read(
        &self,
        call: &ContractCall,
        signer: &dyn LedgerSigner,
    ) -> Result<Bytes, TxError> {
        match self.invoke(call, signer, TxMode::Read).await? {
            TxOutcome::Simulated(data) => Ok(data),
            TxOutcome::Confirmed(result) => Err(TxError::Simulation(format!(
                "read call {} unexpectedly produced transaction {}",
                call.function, result.hash
            ))),
        }
    }

    /// Submit `call` and wait for confirmation.
    pub async fn write(
        &self,
        call: &ContractCall,
        signer: &dyn LedgerSigner,
    ) -> Result<TxResult, TxError> {
        match self.invoke(call, signer, TxMode::Write).await? {
            TxOutcome::Confirmed(result) => Ok(result),
            TxOutcome::Simulated(_) => Err(TxError::Submission(format!(
                "write call {} was not submitted",
                call.function
            ))),
        }
    }

    async fn confirm(&self, hash: TxHash, function: &str) -> Result<TxResult, TxError> {
        let mut poll = ConfirmationPoll::new(&self.policy);

        loop {
            sleep(self.policy.interval).await;

            let status = match self.rpc.transaction_status(hash).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(tx_hash = %hash, function, error = %e, "Status check failed, treating as pending");
                    ChainStatus::Pending
                }
            };

            match poll.advance(status) {
                PollStep::Wait => continue,
                PollStep::Confirmed => {
                    info!(
                        tx_hash = %hash,
                        function,
                        attempts = poll.attempts(),
                        explorer = %self.network.explorer_tx_url(&hash),
                        "Transaction confirmed"
                    );
                    return Ok(TxResult {
                        hash,
                        status: ChainStatus::Success,
                    });
                }
                PollStep::Failed => {
                    warn!(tx_hash = %hash, function, "Transaction failed on chain");
                    return Err(TxError::ChainFailure { hash });
                }
                PollStep::TimedOut => {
                    warn!(
                        tx_hash = %hash,
                        function,
                        attempts = poll.attempts(),
                        "Transaction confirmation timed out"
                    );
                    return Err(TxError::ConfirmationTimeout {
                        hash,
                        attempts: poll.attempts(),
                    });
                }
            }
        }
    }
}

fn with_headroom(gas_used: u64) -> u64 {
    gas_used.saturating_add(gas_used.saturating_mul(GAS_HEADROOM_PERCENT) / 100)
}
