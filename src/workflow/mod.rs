// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reward workflows.
//!
//! Each workflow turns one event (approve, reject, redeem, complete) into
//! the contract calls it needs, merges their outcome into the off-chain
//! record and persists it. Per call site a chain effect is either:
//!
//! - **best effort**: failure is logged and reported as a [`ChainEffect`],
//!   the off-chain transition still happens (mint, badge, recording)
//! - **precondition**: failure aborts before anything is written
//!   (the redemption debit)

pub mod accounts;
pub mod redemptions;
pub mod submissions;

use tracing::warn;

use crate::blockchain::{TxError, TxResult};

pub use accounts::AccountDirectory;
pub use redemptions::{RedemptionOutcome, RedemptionWorkflow};
pub use submissions::{ApprovalOutcome, SubmissionReview};

/// What happened on the ledger for one best-effort call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEffect {
    /// Confirmed on chain.
    Confirmed(TxResult),
    /// Attempted and failed; the reason is kept for the caller.
    Failed(String),
    /// Not attempted because the contract is not configured.
    Skipped,
}

impl ChainEffect {
    /// Fold a best-effort call result, logging failures.
    pub(crate) fn settle(action: &str, result: Result<TxResult, TxError>) -> Self {
        match result {
            Ok(tx) => Self::Confirmed(tx),
            Err(TxError::NotConfigured(what)) => {
                warn!(action, "{what} is not configured; skipping");
                Self::Skipped
            }
            Err(e) => {
                warn!(action, error = %e, "Best-effort ledger call failed");
                Self::Failed(e.to_string())
            }
        }
    }

    /// `0x` hash of a confirmed effect.
    pub fn tx_hash(&self) -> Option<String> {
        match self {
            Self::Confirmed(tx) => Some(tx.hash_hex()),
            _ => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// A local state change plus a human-readable summary.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub record: T,
    pub message: String,
}

/// Trimmed text, or `None` if blank.
pub(crate) fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
