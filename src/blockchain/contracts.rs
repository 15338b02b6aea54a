// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credit Token, Badge Issuer and Redemption Recorder contracts.
//!
//! Each adapter binds one contract address and signs its privileged calls
//! with the [`AdminSigner`]. An adapter whose address is not configured
//! returns [`TxError::NotConfigured`]; callers decide whether that is fatal.

use std::str::FromStr;
use std::sync::Arc;

use alloy::{
    primitives::{Address, B256},
    sol,
    sol_types::SolCall,
};
use sha2::{Digest, Sha256};

use super::pipeline::{TxError, TxPipeline};
use super::signing::AdminSigner;
use super::types::{ContractCall, TxResult};
use crate::config::ContractAddresses;

sol! {
    interface ICreditToken {
        function balance(address account) external view returns (int128);
        function mint(address to, int128 amount) external;
        function clawback(address from, int128 amount) external;
    }

    interface IBadgeIssuer {
        function issueBadge(
            address student,
            uint64 activityId,
            string title,
            string imageUri,
            int128 pointsAwarded,
            bytes32 descriptionHash
        ) external;
    }

    interface IRedemptionRecorder {
        function recordRedemption(address student, string rewardName, int128 pointsSpent) external;
    }
}

/// Parse a `0x`-prefixed ledger address.
pub fn parse_address(raw: &str) -> Result<Address, TxError> {
    Address::from_str(raw.trim()).map_err(|e| TxError::InvalidAddress(format!("{raw}: {e}")))
}

/// SHA-256 of a submission description, as passed to `issueBadge`.
pub fn description_hash(description: &str) -> B256 {
    B256::from_slice(&Sha256::digest(description.as_bytes()))
}

/// Configured address of one contract.
#[derive(Debug, Clone)]
struct ContractRef {
    name: &'static str,
    address: Option<String>,
}

impl ContractRef {
    fn resolve(&self) -> Result<Address, TxError> {
        let raw = self
            .address
            .as_deref()
            .ok_or_else(|| TxError::NotConfigured(self.name.to_string()))?;
        Address::from_str(raw.trim()).map_err(|e| {
            TxError::Configuration(format!("{} address `{raw}` is invalid: {e}", self.name))
        })
    }

    fn call<C: SolCall>(&self, function: &'static str, call: C) -> Result<ContractCall, TxError> {
        Ok(ContractCall {
            contract: self.resolve()?,
            function,
            calldata: call.abi_encode().into(),
        })
    }
}

/// Shared handles every adapter needs.
#[derive(Clone)]
pub struct ContractContext {
    pub pipeline: Arc<TxPipeline>,
    pub admin: Arc<AdminSigner>,
}

/// Credit Token contract: balances, minting and clawback.
#[derive(Clone)]
pub struct CreditToken {
    ctx: ContractContext,
    contract: ContractRef,
}

impl CreditToken {
    pub fn new(ctx: ContractContext, address: Option<String>) -> Self {
        Self {
            ctx,
            contract: ContractRef {
                name: "Credit Token contract",
                address,
            },
        }
    }

    pub fn is_configured(&self) -> bool {
        self.contract.address.is_some()
    }

    /// Read the credit balance of `account`.
    pub async fn balance(&self, account: &str) -> Result<i128, TxError> {
        let call = self.contract.call(
            "balance",
            ICreditToken::balanceCall {
                account: parse_address(account)?,
            },
        )?;

        let data = self.ctx.pipeline.read(&call, self.ctx.admin.as_ref()).await?;
        ICreditToken::balanceCall::abi_decode_returns(&data)
            .map_err(|e| TxError::Simulation(format!("balance returned malformed data: {e}")))
    }

    /// Credit `amount` points to `account`.
    pub async fn mint(&self, account: &str, amount: i128) -> Result<TxResult, TxError> {
        let call = self.contract.call(
            "mint",
            ICreditToken::mintCall {
                to: parse_address(account)?,
                amount,
            },
        )?;
        self.ctx.pipeline.write(&call, self.ctx.admin.as_ref()).await
    }

    /// Debit `amount` points from `account`.
    pub async fn clawback(&self, account: &str, amount: i128) -> Result<TxResult, TxError> {
        let call = self.contract.call(
            "clawback",
            ICreditToken::clawbackCall {
                from: parse_address(account)?,
                amount,
            },
        )?;
        self.ctx.pipeline.write(&call, self.ctx.admin.as_ref()).await
    }
}

/// Badge details passed to [`BadgeIssuer::issue_badge`].
#[derive(Debug, Clone)]
pub struct BadgeRequest<'a> {
    pub student: &'a str,
    pub activity_id: u64,
    pub title: &'a str,
    pub image_uri: &'a str,
    pub points_awarded: i128,
    pub description: &'a str,
}

/// Badge Issuer contract.
#[derive(Clone)]
pub struct BadgeIssuer {
    ctx: ContractContext,
    contract: ContractRef,
}

impl BadgeIssuer {
    pub fn new(ctx: ContractContext, address: Option<String>) -> Self {
        Self {
            ctx,
            contract: ContractRef {
                name: "Badge Issuer contract",
                address,
            },
        }
    }

    pub fn is_configured(&self) -> bool {
        self.contract.address.is_some()
    }

    pub async fn issue_badge(&self, badge: &BadgeRequest<'_>) -> Result<TxResult, TxError> {
        let call = self.contract.call(
            "issueBadge",
            IBadgeIssuer::issueBadgeCall {
                student: parse_address(badge.student)?,
                activityId: badge.activity_id,
                title: badge.title.to_string(),
                imageUri: badge.image_uri.to_string(),
                pointsAwarded: badge.points_awarded,
                descriptionHash: description_hash(badge.description),
            },
        )?;
        self.ctx.pipeline.write(&call, self.ctx.admin.as_ref()).await
    }
}

/// Redemption Recorder contract.
#[derive(Clone)]
pub struct RedemptionRecorder {
    ctx: ContractContext,
    contract: ContractRef,
}

impl RedemptionRecorder {
    pub fn new(ctx: ContractContext, address: Option<String>) -> Self {
        Self {
            ctx,
            contract: ContractRef {
                name: "Redemption Recorder contract",
                address,
            },
        }
    }

    pub fn is_configured(&self) -> bool {
        self.contract.address.is_some()
    }

    pub async fn record_redemption(
        &self,
        student: &str,
        reward_name: &str,
        points_spent: i128,
    ) -> Result<TxResult, TxError> {
        let call = self.contract.call(
            "recordRedemption",
            IRedemptionRecorder::recordRedemptionCall {
                student: parse_address(student)?,
                rewardName: reward_name.to_string(),
                pointsSpent: points_spent,
            },
        )?;
        self.ctx.pipeline.write(&call, self.ctx.admin.as_ref()).await
    }
}

/// The three contract adapters sharing one pipeline and admin signer.
#[derive(Clone)]
pub struct LedgerContracts {
    pub token: CreditToken,
    pub badges: BadgeIssuer,
    pub recorder: RedemptionRecorder,
}

impl LedgerContracts {
    pub fn new(ctx: ContractContext, addresses: &ContractAddresses) -> Self {
        Self {
            token: CreditToken::new(ctx.clone(), addresses.credit_token.clone()),
            badges: BadgeIssuer::new(ctx.clone(), addresses.badge_issuer.clone()),
            recorder: RedemptionRecorder::new(ctx, addresses.redemption_recorder.clone()),
        }
    }
}
