// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles shared by the unit tests.
//!
//! [`MockLedger`] is an in-process [`LedgerRpc`] that decodes the contract
//! calls it receives, keeps credit balances in memory and replays scripted
//! failures and status sequences per contract function.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::{
    consensus::{Transaction, TxEnvelope},
    eips::eip2718::Decodable2718,
    primitives::{Address, Bytes, TxHash},
    rpc::types::TransactionRequest,
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use tempfile::TempDir;

use crate::blockchain::contracts::{IBadgeIssuer, ICreditToken, IRedemptionRecorder};
use crate::blockchain::{
    AdminSigner, ChainStatus, ConfirmationPolicy, ContractContext, FeeParams, LedgerContracts,
    LedgerRpc, RpcError, Simulation, TxPipeline, AVAX_FUJI,
};
use crate::config::{ContractAddresses, LedgerConfig};
use crate::models::{Activity, NewActivity, NewReward, Reward, Role, User};
use crate::state::LedgerServices;
use crate::storage::{LedgerDb, Repository};

/// Custody key used by tests.
pub const TEST_ENCRYPTION_KEY: &str =
    "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// Well-known development key (never funded on a real network).
pub const TEST_ADMIN_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CREDIT_TOKEN_ADDRESS: &str = "0x00000000000000000000000000000000000000c0";
pub const BADGE_ISSUER_ADDRESS: &str = "0x00000000000000000000000000000000000000c1";
pub const REDEMPTION_RECORDER_ADDRESS: &str = "0x00000000000000000000000000000000000000c2";

/// Status checks allowed per transaction in tests.
pub const TEST_CONFIRM_ATTEMPTS: u32 = 5;

enum DecodedCall {
    Balance(Address),
    Mint(Address, i128),
    Clawback(Address, i128),
    IssueBadge,
    RecordRedemption,
    Unknown,
}

impl DecodedCall {
    fn decode(input: &[u8]) -> Self {
        if input.len() < 4 {
            return Self::Unknown;
        }
        let (selector, args) = input.split_at(4);

        if selector == ICreditToken::balanceCall::SELECTOR {
            ICreditToken::balanceCall::abi_decode_raw(args)
                .map(|c| Self::Balance(c.account))
                .unwrap_or(Self::Unknown)
        } else if selector == ICreditToken::mintCall::SELECTOR {
            ICreditToken::mintCall::abi_decode_raw(args)
                .map(|c| Self::Mint(c.to, c.amount))
                .unwrap_or(Self::Unknown)
        } else if selector == ICreditToken::clawbackCall::SELECTOR {
            ICreditToken::clawbackCall::abi_decode_raw(args)
                .map(|c| Self::Clawback(c.from, c.amount))
                .unwrap_or(Self::Unknown)
        } else if selector == IBadgeIssuer::issueBadgeCall::SELECTOR {
            Self::IssueBadge
        } else if selector == IRedemptionRecorder::recordRedemptionCall::SELECTOR {
            Self::RecordRedemption
        } else {
            Self::Unknown
        }
    }

    fn function(&self) -> &'static str {
        match self {
            Self::Balance(_) => "balance",
            Self::Mint(..) => "mint",
            Self::Clawback(..) => "clawback",
            Self::IssueBadge => "issueBadge",
            Self::RecordRedemption => "recordRedemption",
            Self::Unknown => "unknown",
        }
    }
}

struct InFlight {
    call: DecodedCall,
    script: Vec<ChainStatus>,
    polled: usize,
    /// Final status once the transaction executed.
    executed: Option<ChainStatus>,
}

#[derive(Default)]
struct MockState {
    balances: HashMap<Address, i128>,
    simulation_failures: HashMap<String, String>,
    submission_failures: HashMap<String, String>,
    status_scripts: HashMap<String, Vec<ChainStatus>>,
    failing_status_checks: u32,
    in_flight: HashMap<TxHash, InFlight>,
    submissions: Vec<&'static str>,
    simulations: usize,
    status_checks: usize,
    nonce: u64,
}

/// Scripted in-memory ledger.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<MockState>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn set_balance(&self, account: Address, amount: i128) {
        self.state().balances.insert(account, amount);
    }

    pub fn balance(&self, account: Address) -> i128 {
        self.state().balances.get(&account).copied().unwrap_or(0)
    }

    pub fn balance_of(&self, account: &str) -> i128 {
        self.balance(account.parse().unwrap())
    }

    /// Make every simulation of `function` revert with `reason`.
    pub fn fail_simulation(&self, function: &str, reason: &str) {
        self.state()
            .simulation_failures
            .insert(function.to_string(), reason.to_string());
    }

    /// Make every submission of `function` be rejected with `reason`.
    pub fn fail_submission(&self, function: &str, reason: &str) {
        self.state()
            .submission_failures
            .insert(function.to_string(), reason.to_string());
    }

    /// Statuses reported for each transaction of `function`, in order.
    /// The last entry repeats. Unscripted functions succeed on first check.
    pub fn script_status(&self, function: &str, statuses: Vec<ChainStatus>) {
        self.state()
            .status_scripts
            .insert(function.to_string(), statuses);
    }

    /// Make the next `count` status checks fail at the transport level.
    pub fn fail_status_checks(&self, count: u32) {
        self.state().failing_status_checks = count;
    }

    /// Functions submitted so far, in order.
    pub fn submissions(&self) -> Vec<&'static str> {
        self.state().submissions.clone()
    }

    pub fn submission_count(&self, function: &str) -> usize {
        self.state()
            .submissions
            .iter()
            .filter(|f| **f == function)
            .count()
    }

    pub fn simulations(&self) -> usize {
        self.state().simulations
    }

    pub fn status_checks(&self) -> usize {
        self.state().status_checks
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn account_nonce(&self, _address: Address) -> Result<u64, RpcError> {
        Ok(self.state().nonce)
    }

    async fn simulate(&self, tx: &TransactionRequest) -> Result<Simulation, RpcError> {
        let mut state = self.state();
        state.simulations += 1;

        let input = tx.input.input().cloned().unwrap_or_default();
        let call = DecodedCall::decode(&input);

        if let Some(reason) = state.simulation_failures.get(call.function()) {
            return Err(RpcError::Reverted(reason.clone()));
        }

        let return_data = match call {
            DecodedCall::Balance(account) => {
                let balance = state.balances.get(&account).copied().unwrap_or(0);
                Bytes::from(balance.abi_encode())
            }
            DecodedCall::Clawback(account, amount) => {
                let balance = state.balances.get(&account).copied().unwrap_or(0);
                if balance < amount {
                    return Err(RpcError::Reverted(
                        "execution reverted: insufficient balance".to_string(),
                    ));
                }
                Bytes::new()
            }
            _ => Bytes::new(),
        };

        Ok(Simulation {
            return_data,
            gas_used: 50_000,
        })
    }

    async fn fee_params(&self) -> Result<FeeParams, RpcError> {
        Ok(FeeParams {
            max_fee_per_gas: 51_500_000_000,
            max_priority_fee_per_gas: 1_500_000_000,
        })
    }

    async fn submit(&self, raw_tx: Bytes) -> Result<TxHash, RpcError> {
        let envelope = TxEnvelope::decode_2718(&mut raw_tx.as_ref())
            .map_err(|e| RpcError::Transport(format!("undecodable transaction: {e}")))?;
        let call = DecodedCall::decode(envelope.input());
        let function = call.function();

        let mut state = self.state();
        if let Some(reason) = state.submission_failures.get(function) {
            return Err(RpcError::Transport(reason.clone()));
        }
        if envelope.nonce() < state.nonce {
            return Err(RpcError::Transport(format!(
                "nonce too low: next nonce {}, tx nonce {}",
                state.nonce,
                envelope.nonce()
            )));
        }

        let hash = *envelope.tx_hash();
        let script = state
            .status_scripts
            .get(function)
            .cloned()
            .unwrap_or_else(|| vec![ChainStatus::Success]);

        state.nonce += 1;
        state.submissions.push(function);
        state.in_flight.insert(
            hash,
            InFlight {
                call,
                script,
                polled: 0,
                executed: None,
            },
        );
        Ok(hash)
    }

    async fn transaction_status(&self, hash: TxHash) -> Result<ChainStatus, RpcError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.status_checks += 1;

        if state.failing_status_checks > 0 {
            state.failing_status_checks -= 1;
            return Err(RpcError::Transport("connection reset".to_string()));
        }

        let flight = state
            .in_flight
            .get_mut(&hash)
            .ok_or_else(|| RpcError::Transport(format!("unknown transaction {hash}")))?;

        if let Some(status) = flight.executed {
            return Ok(status);
        }

        let index = flight.polled.min(flight.script.len().saturating_sub(1));
        let mut status = flight
            .script
            .get(index)
            .copied()
            .unwrap_or(ChainStatus::Success);
        flight.polled += 1;

        // Effects apply when the transaction executes; a clawback that finds
        // too little balance at that point reverts.
        if status == ChainStatus::Success {
            match flight.call {
                DecodedCall::Mint(account, amount) => {
                    *state.balances.entry(account).or_insert(0) += amount;
                }
                DecodedCall::Clawback(account, amount) => {
                    let balance = state.balances.entry(account).or_insert(0);
                    if *balance < amount {
                        status = ChainStatus::Failed;
                    } else {
                        *balance -= amount;
                    }
                }
                _ => {}
            }
        }
        if status != ChainStatus::Pending {
            flight.executed = Some(status);
        }

        Ok(status)
    }
}

pub fn test_policy() -> ConfirmationPolicy {
    ConfirmationPolicy {
        interval: Duration::ZERO,
        max_attempts: TEST_CONFIRM_ATTEMPTS,
    }
}

pub fn test_pipeline(ledger: &Arc<MockLedger>) -> TxPipeline {
    TxPipeline::new(ledger.clone(), AVAX_FUJI, test_policy())
}

pub fn test_context(ledger: &Arc<MockLedger>) -> ContractContext {
    ContractContext {
        pipeline: Arc::new(test_pipeline(ledger)),
        admin: Arc::new(AdminSigner::from_config(Some(TEST_ADMIN_KEY))),
    }
}

pub fn test_addresses() -> ContractAddresses {
    ContractAddresses {
        credit_token: Some(CREDIT_TOKEN_ADDRESS.to_string()),
        badge_issuer: Some(BADGE_ISSUER_ADDRESS.to_string()),
        redemption_recorder: Some(REDEMPTION_RECORDER_ADDRESS.to_string()),
    }
}

pub fn test_contracts(ledger: &Arc<MockLedger>) -> LedgerContracts {
    LedgerContracts::new(test_context(ledger), &test_addresses())
}

pub fn test_ledger_config(contracts: ContractAddresses) -> LedgerConfig {
    LedgerConfig {
        network: AVAX_FUJI,
        rpc_url: AVAX_FUJI.rpc_url.to_string(),
        faucet_url: None,
        contracts,
        admin_secret_key: Some(TEST_ADMIN_KEY.to_string()),
        encryption_key: TEST_ENCRYPTION_KEY.to_string(),
        confirmation: test_policy(),
    }
}

/// Services wired to a [`MockLedger`] and a temporary database.
pub struct Harness {
    pub ledger: Arc<MockLedger>,
    pub repo: Arc<LedgerDb>,
    pub services: LedgerServices,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_contracts(test_addresses())
    }

    pub fn with_contracts(contracts: ContractAddresses) -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(LedgerDb::open_in(dir.path()).unwrap());
        let ledger = MockLedger::new();
        let services =
            LedgerServices::new(&test_ledger_config(contracts), ledger.clone(), repo.clone());
        Self {
            ledger,
            repo,
            services,
            _dir: dir,
        }
    }

    pub async fn student(&self, email: &str, balance: i128) -> User {
        let user = self
            .services
            .register_user(email, Role::Student)
            .await
            .unwrap();
        self.ledger.set_balance(user.account.public_key.parse().unwrap(), balance);
        user
    }

    pub async fn reviewer(&self) -> User {
        self.services
            .register_user("reviewer@campus.edu", Role::Reviewer)
            .await
            .unwrap()
    }

    pub async fn activity(&self, points: u64) -> Activity {
        self.repo
            .create_activity(NewActivity {
                title: "Beach cleanup".to_string(),
                description: "Two hours collecting litter".to_string(),
                points_reward: points,
                badge_image_url: Some("https://img.campus.edu/badges/cleanup.png".to_string()),
                deadline: None,
                max_submissions: None,
            })
            .await
            .unwrap()
    }

    pub async fn reward(&self, cost: u64, stock: Option<u64>) -> Reward {
        self.repo
            .create_reward(NewReward {
                name: "Coffee voucher".to_string(),
                description: "One coffee at the campus cafe".to_string(),
                points_cost: cost,
                stock,
            })
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::LedgerSigner;
    use alloy::network::TransactionBuilder;

    async fn signed_clawback(from: Address, amount: i128, nonce: u64) -> Bytes {
        let calldata = ICreditToken::clawbackCall { from, amount }.abi_encode();
        let tx = TransactionRequest::default()
            .with_to(CREDIT_TOKEN_ADDRESS.parse().unwrap())
            .with_input(calldata)
            .with_nonce(nonce)
            .with_chain_id(AVAX_FUJI.chain_id)
            .with_gas_limit(60_000)
            .with_max_fee_per_gas(51_500_000_000)
            .with_max_priority_fee_per_gas(1_500_000_000);
        AdminSigner::from_config(Some(TEST_ADMIN_KEY))
            .sign(tx)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn clawback_reverts_when_balance_is_short_at_execution() {
        let ledger = MockLedger::new();
        let student = Address::repeat_byte(0x42);
        ledger.set_balance(student, 40);

        let hash = ledger
            .submit(signed_clawback(student, 30, 0).await)
            .await
            .unwrap();
        ledger.set_balance(student, 10);

        assert_eq!(
            ledger.transaction_status(hash).await.unwrap(),
            ChainStatus::Failed
        );
        assert_eq!(
            ledger.transaction_status(hash).await.unwrap(),
            ChainStatus::Failed
        );
        assert_eq!(ledger.balance(student), 10);
    }

    #[tokio::test]
    async fn reused_nonce_is_rejected() {
        let ledger = MockLedger::new();
        let student = Address::repeat_byte(0x42);
        ledger.set_balance(student, 100);

        ledger
            .submit(signed_clawback(student, 30, 0).await)
            .await
            .unwrap();
        let err = ledger
            .submit(signed_clawback(student, 20, 0).await)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("nonce too low"));
        assert_eq!(ledger.submission_count("clawback"), 1);
    }
}
