// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Store
//!
//! Persistence of the off-chain ledger behind the [`Repository`] trait.
//!
//! Every method is individually atomic. There are no multi-call
//! transactions; the state transitions that must not race
//! ([`Repository::reserve_stock`], [`Repository::record_review`],
//! [`Repository::complete_redemption`]) are compare-and-swap updates that
//! re-check their precondition inside a single write transaction.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   ledger.redb       # users, catalog, submissions, redemptions
//! ```

pub mod ledger_db;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Activity, NewActivity, NewRedemption, NewReward, NewSubmission, NewUser, ProofSubmission,
    Redemption, RedemptionStatus, ReviewDecision, Reward, RewardUpdate, SubmissionStatus, User,
};

pub use ledger_db::LedgerDb;

/// File name of the ledger database inside the data directory.
pub const LEDGER_DB_FILE: &str = "ledger.redb";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of reserving one unit of a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockReservation {
    /// The reward has no stock limit.
    Unlimited,
    /// One unit was taken; `remaining` units are left.
    Reserved { remaining: u64 },
    /// No unit was available; nothing changed.
    Exhausted,
}

/// Filter for listing submissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionFilter {
    pub student_id: Option<u64>,
    pub status: Option<SubmissionStatus>,
}

/// Filter for listing redemptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedemptionFilter {
    pub student_id: Option<u64>,
    pub status: Option<RedemptionStatus>,
}

/// Off-chain ledger persistence.
#[async_trait]
pub trait Repository: Send + Sync {
    // Users

    /// Insert a user. Fails with [`StoreError::Conflict`] if the email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: u64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    // Catalog

    async fn create_activity(&self, activity: NewActivity) -> StoreResult<Activity>;
    async fn find_activity(&self, id: u64) -> StoreResult<Option<Activity>>;

    async fn create_reward(&self, reward: NewReward) -> StoreResult<Reward>;
    async fn find_reward(&self, id: u64) -> StoreResult<Option<Reward>>;
    async fn update_reward(&self, id: u64, update: RewardUpdate) -> StoreResult<Reward>;

    /// Take one unit of a limited reward if any is left.
    async fn reserve_stock(&self, reward_id: u64) -> StoreResult<StockReservation>;

    /// Return a unit taken by [`Repository::reserve_stock`].
    async fn release_stock(&self, reward_id: u64) -> StoreResult<()>;

    // Submissions

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<ProofSubmission>;
    async fn find_submission(&self, id: u64) -> StoreResult<Option<ProofSubmission>>;
    async fn list_submissions(&self, filter: SubmissionFilter)
        -> StoreResult<Vec<ProofSubmission>>;
    async fn count_submissions(&self, student_id: u64, activity_id: u64) -> StoreResult<u64>;

    /// Apply a decision to a PENDING submission.
    ///
    /// Fails with [`StoreError::Conflict`] if the submission is no longer
    /// PENDING.
    async fn record_review(&self, id: u64, decision: ReviewDecision)
        -> StoreResult<ProofSubmission>;

    // Redemptions

    async fn create_redemption(&self, redemption: NewRedemption) -> StoreResult<Redemption>;
    async fn find_redemption(&self, id: u64) -> StoreResult<Option<Redemption>>;
    async fn list_redemptions(&self, filter: RedemptionFilter) -> StoreResult<Vec<Redemption>>;

    /// Mark a PENDING redemption as COMPLETED.
    ///
    /// Fails with [`StoreError::Conflict`] if it is no longer PENDING.
    async fn complete_redemption(
        &self,
        id: u64,
        notes: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<Redemption>;
}
