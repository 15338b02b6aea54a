// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reward redemptions.
//!
//! The on-chain debit is the precondition of a redemption: no row is
//! written unless the clawback was confirmed. Limited stock is reserved
//! before the debit and handed back if the debit fails.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::{non_blank, ChainEffect, Outcome};
use crate::blockchain::{LedgerContracts, TxResult};
use crate::error::WorkflowError;
use crate::models::{NewRedemption, Redemption, RedemptionStatus};
use crate::storage::{RedemptionFilter, Repository, StockReservation};

/// Result of a successful redemption request.
#[derive(Debug, Clone)]
pub struct RedemptionOutcome {
    pub redemption: Redemption,
    pub debit: TxResult,
    pub record: ChainEffect,
    pub message: String,
}

#[derive(Clone)]
pub struct RedemptionWorkflow {
    repo: Arc<dyn Repository>,
    contracts: LedgerContracts,
}

impl RedemptionWorkflow {
    pub fn new(repo: Arc<dyn Repository>, contracts: LedgerContracts) -> Self {
        Self { repo, contracts }
    }

    /// Redeem a reward for a student.
    pub async fn create(
        &self,
        student_id: u64,
        reward_id: u64,
    ) -> Result<RedemptionOutcome, WorkflowError> {
        let reward = self
            .repo
            .find_reward(reward_id)
            .await?
            .filter(|r| r.is_active())
            .ok_or_else(|| WorkflowError::not_found("Reward not found or inactive"))?;

        if reward.stock == Some(0) {
            return Err(WorkflowError::OutOfStock(reward.name));
        }

        let student = self
            .repo
            .find_user(student_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Student not found"))?;
        let address = student.account.public_key.as_str();

        let cost = reward.points_cost;
        let required = i128::from(cost);

        let balance = self
            .contracts
            .token
            .balance(address)
            .await
            .map_err(|e| WorkflowError::unavailable("Could not read the balance", e))?;

        if balance < required {
            return Err(WorkflowError::InsufficientBalance { balance, required });
        }

        let reservation = self.repo.reserve_stock(reward.id).await?;
        if reservation == StockReservation::Exhausted {
            return Err(WorkflowError::OutOfStock(reward.name));
        }

        let debit = match self.contracts.token.clawback(address, required).await {
            Ok(tx) => tx,
            Err(e) => {
                warn!(student_id, reward_id, error = %e, "Redemption debit failed");
                if let StockReservation::Reserved { .. } = reservation {
                    if let Err(release) = self.repo.release_stock(reward.id).await {
                        error!(reward_id, error = %release, "Failed to release reserved stock");
                    }
                }
                return Err(WorkflowError::unavailable(
                    "Could not process the redemption, try again later",
                    e,
                ));
            }
        };

        let record = if self.contracts.recorder.is_configured() {
            ChainEffect::settle(
                "recordRedemption",
                self.contracts
                    .recorder
                    .record_redemption(address, &reward.name, required)
                    .await,
            )
        } else {
            ChainEffect::Skipped
        };

        let redemption = match self
            .repo
            .create_redemption(NewRedemption {
                student_id,
                reward_id: reward.id,
                points_spent: cost,
                debit_tx_hash: debit.hash_hex(),
                record_tx_hash: record.tx_hash(),
            })
            .await
        {
            Ok(redemption) => redemption,
            Err(e) => {
                error!(
                    student_id,
                    reward_id,
                    debit_tx = %debit.hash_hex(),
                    error = %e,
                    "Redemption not recorded after confirmed debit"
                );
                return Err(e.into());
            }
        };

        let mut message = format!(
            "Redemption registered. {cost} credits debited (tx: {}).",
            debit.hash_hex()
        );
        if let Some(hash) = record.tx_hash() {
            message.push_str(&format!(" Redemption recorded on-chain (tx: {hash})."));
        }
        message.push_str(" An administrator will process your reward.");

        info!(
            redemption_id = redemption.id,
            student_id,
            reward_id,
            points_spent = cost,
            debit_tx = %redemption.debit_tx_hash,
            "Reward redeemed"
        );

        Ok(RedemptionOutcome {
            redemption,
            debit,
            record,
            message,
        })
    }

    /// Mark a pending redemption as delivered. Off-chain only.
    pub async fn complete(
        &self,
        id: u64,
        notes: Option<&str>,
    ) -> Result<Outcome<Redemption>, WorkflowError> {
        let redemption = self
            .repo
            .find_redemption(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("Redemption {id} not found")))?;

        if redemption.status != RedemptionStatus::Pending {
            return Err(WorkflowError::invalid_state(format!(
                "Redemption {id} is not pending"
            )));
        }

        let redemption = self
            .repo
            .complete_redemption(id, non_blank(notes), Utc::now())
            .await?;

        info!(redemption_id = id, "Reward delivered");
        Ok(Outcome {
            record: redemption,
            message: "Reward marked as delivered".to_string(),
        })
    }

    pub async fn list(&self, filter: RedemptionFilter) -> Result<Vec<Redemption>, WorkflowError> {
        Ok(self.repo.list_redemptions(filter).await?)
    }
}
