// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`, `activities`, `rewards`, `submissions`, `redemptions`:
//!   id → serialized record (JSON bytes)
//! - `user_emails`: lowercase email → user id
//! - `counters`: table name → last assigned id
//!
//! redb allows one write transaction at a time, so every read-check-write
//! below is serialized against all other writers.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, TableHandle, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use super::{
    RedemptionFilter, Repository, StockReservation, StoreError, StoreResult, SubmissionFilter,
    LEDGER_DB_FILE,
};
use crate::models::{
    Activity, CatalogStatus, NewActivity, NewRedemption, NewReward, NewSubmission, NewUser,
    ProofSubmission, Redemption, RedemptionStatus, ReviewDecision, Reward, RewardUpdate,
    SubmissionStatus, User,
};

// =============================================================================
// Table Definitions
// =============================================================================

type RecordTable = TableDefinition<'static, u64, &'static [u8]>;

const USERS: RecordTable = TableDefinition::new("users");
const ACTIVITIES: RecordTable = TableDefinition::new("activities");
const REWARDS: RecordTable = TableDefinition::new("rewards");
const SUBMISSIONS: RecordTable = TableDefinition::new("submissions");
const REDEMPTIONS: RecordTable = TableDefinition::new("redemptions");

/// Unique index: lowercase email → user id.
const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

/// Id sequences: table name → last assigned id.
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

// =============================================================================
// Record Helpers
// =============================================================================

fn next_id(txn: &WriteTransaction, table: RecordTable) -> StoreResult<u64> {
    let mut counters = txn.open_table(COUNTERS)?;
    let name = table.name();
    let next = counters.get(name)?.map(|v| v.value()).unwrap_or(0) + 1;
    counters.insert(name, next)?;
    Ok(next)
}

fn put<T: Serialize>(
    txn: &WriteTransaction,
    table: RecordTable,
    id: u64,
    record: &T,
) -> StoreResult<()> {
    let json = serde_json::to_vec(record)?;
    let mut t = txn.open_table(table)?;
    t.insert(id, json.as_slice())?;
    Ok(())
}

fn load<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: RecordTable,
    id: u64,
) -> StoreResult<Option<T>> {
    let t = txn.open_table(table)?;
    let record = match t.get(id)? {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };
    Ok(record)
}

fn load_existing<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: RecordTable,
    id: u64,
) -> StoreResult<T> {
    load(txn, table, id)?.ok_or_else(|| StoreError::NotFound(format!("{} {id}", table.name())))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// LedgerDb
// =============================================================================

/// Embedded ACID ledger database.
pub struct LedgerDb {
    db: Database,
}

impl LedgerDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(ACTIVITIES)?;
            let _ = write_txn.open_table(REWARDS)?;
            let _ = write_txn.open_table(SUBMISSIONS)?;
            let _ = write_txn.open_table(REDEMPTIONS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(COUNTERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Open the ledger database inside `data_dir`.
    pub fn open_in(data_dir: &Path) -> StoreResult<Self> {
        Self::open(&data_dir.join(LEDGER_DB_FILE))
    }

    fn get<T: DeserializeOwned>(&self, table: RecordTable, id: u64) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(table)?;
        match t.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        mut keep: impl FnMut(&T) -> bool,
    ) -> StoreResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let t = read_txn.open_table(table)?;
        let mut out = Vec::new();
        for entry in t.iter()? {
            let (_, value) = entry?;
            let record: T = serde_json::from_slice(value.value())?;
            if keep(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Insert a new record built from its freshly assigned id.
    fn insert_new<T: Serialize>(
        &self,
        table: RecordTable,
        build: impl FnOnce(u64) -> T,
    ) -> StoreResult<T> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let id = next_id(&write_txn, table)?;
            let record = build(id);
            put(&write_txn, table, id, &record)?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let email = normalize_email(&user.email);

        let write_txn = self.db.begin_write()?;
        let record = {
            {
                let emails = write_txn.open_table(USER_EMAILS)?;
                if emails.get(email.as_str())?.is_some() {
                    return Err(StoreError::Conflict(format!(
                        "email {email} is already registered"
                    )));
                }
            }

            let id = next_id(&write_txn, USERS)?;
            let record = User {
                id,
                email: email.clone(),
                role: user.role,
                account: user.account,
                created_at: Utc::now(),
            };
            put(&write_txn, USERS, id, &record)?;

            let mut emails = write_txn.open_table(USER_EMAILS)?;
            emails.insert(email.as_str(), id)?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    pub fn get_user(&self, id: u64) -> StoreResult<Option<User>> {
        self.get(USERS, id)
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;
        let id = emails.get(normalize_email(email).as_str())?.map(|v| v.value());
        match id {
            Some(id) => self.get_user(id),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub fn insert_activity(&self, activity: NewActivity) -> StoreResult<Activity> {
        self.insert_new(ACTIVITIES, |id| Activity {
            id,
            title: activity.title,
            description: activity.description,
            points_reward: activity.points_reward,
            badge_image_url: activity.badge_image_url,
            deadline: activity.deadline,
            max_submissions: activity.max_submissions,
            status: CatalogStatus::Active,
            created_at: Utc::now(),
        })
    }

    pub fn get_activity(&self, id: u64) -> StoreResult<Option<Activity>> {
        self.get(ACTIVITIES, id)
    }

    pub fn insert_reward(&self, reward: NewReward) -> StoreResult<Reward> {
        self.insert_new(REWARDS, |id| Reward {
            id,
            name: reward.name,
            description: reward.description,
            points_cost: reward.points_cost,
            stock: reward.stock,
            status: CatalogStatus::Active,
            created_at: Utc::now(),
        })
    }

    pub fn get_reward(&self, id: u64) -> StoreResult<Option<Reward>> {
        self.get(REWARDS, id)
    }

    pub fn apply_reward_update(&self, id: u64, update: RewardUpdate) -> StoreResult<Reward> {
        let write_txn = self.db.begin_write()?;
        let reward = {
            let mut reward: Reward = load_existing(&write_txn, REWARDS, id)?;
            if let Some(name) = update.name {
                reward.name = name;
            }
            if let Some(description) = update.description {
                reward.description = description;
            }
            if let Some(points_cost) = update.points_cost {
                reward.points_cost = points_cost;
            }
            if let Some(stock) = update.stock {
                reward.stock = stock;
            }
            if let Some(status) = update.status {
                reward.status = status;
            }
            put(&write_txn, REWARDS, id, &reward)?;
            reward
        };
        write_txn.commit()?;
        Ok(reward)
    }

    pub fn take_stock(&self, reward_id: u64) -> StoreResult<StockReservation> {
        let write_txn = self.db.begin_write()?;
        let reservation = {
            let mut reward: Reward = load_existing(&write_txn, REWARDS, reward_id)?;
            match reward.stock {
                None => StockReservation::Unlimited,
                Some(0) => StockReservation::Exhausted,
                Some(n) => {
                    reward.stock = Some(n - 1);
                    put(&write_txn, REWARDS, reward_id, &reward)?;
                    StockReservation::Reserved { remaining: n - 1 }
                }
            }
        };
        match reservation {
            StockReservation::Reserved { .. } => write_txn.commit()?,
            _ => write_txn.abort()?,
        }
        Ok(reservation)
    }

    pub fn return_stock(&self, reward_id: u64) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut reward: Reward = load_existing(&write_txn, REWARDS, reward_id)?;
            if let Some(n) = reward.stock {
                reward.stock = Some(n.saturating_add(1));
                put(&write_txn, REWARDS, reward_id, &reward)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Submissions
    // =========================================================================

    pub fn insert_submission(&self, submission: NewSubmission) -> StoreResult<ProofSubmission> {
        self.insert_new(SUBMISSIONS, |id| ProofSubmission {
            id,
            student_id: submission.student_id,
            activity_id: submission.activity_id,
            description: submission.description,
            proof_url: submission.proof_url,
            status: SubmissionStatus::Pending,
            reviewer_id: None,
            reviewer_notes: None,
            mint_tx_hash: None,
            badge_tx_hash: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        })
    }

    pub fn get_submission(&self, id: u64) -> StoreResult<Option<ProofSubmission>> {
        self.get(SUBMISSIONS, id)
    }

    pub fn submissions_matching(
        &self,
        filter: SubmissionFilter,
    ) -> StoreResult<Vec<ProofSubmission>> {
        self.scan(SUBMISSIONS, |s: &ProofSubmission| {
            filter.student_id.is_none_or(|id| s.student_id == id)
                && filter.status.is_none_or(|status| s.status == status)
        })
    }

    pub fn apply_review(&self, id: u64, decision: ReviewDecision) -> StoreResult<ProofSubmission> {
        let write_txn = self.db.begin_write()?;
        let submission = {
            let mut submission: ProofSubmission = load_existing(&write_txn, SUBMISSIONS, id)?;
            if submission.status != SubmissionStatus::Pending {
                return Err(StoreError::Conflict(format!(
                    "submission {id} is already {:?}",
                    submission.status
                )));
            }
            submission.status = decision.status;
            submission.reviewer_id = Some(decision.reviewer_id);
            submission.reviewer_notes = decision.reviewer_notes;
            submission.mint_tx_hash = decision.mint_tx_hash;
            submission.badge_tx_hash = decision.badge_tx_hash;
            submission.reviewed_at = Some(decision.reviewed_at);
            put(&write_txn, SUBMISSIONS, id, &submission)?;
            submission
        };
        write_txn.commit()?;
        Ok(submission)
    }

    // =========================================================================
    // Redemptions
    // =========================================================================

    pub fn insert_redemption(&self, redemption: NewRedemption) -> StoreResult<Redemption> {
        self.insert_new(REDEMPTIONS, |id| Redemption {
            id,
            student_id: redemption.student_id,
            reward_id: redemption.reward_id,
            points_spent: redemption.points_spent,
            status: RedemptionStatus::Pending,
            debit_tx_hash: redemption.debit_tx_hash,
            record_tx_hash: redemption.record_tx_hash,
            notes: None,
            redeemed_at: Utc::now(),
            completed_at: None,
        })
    }

    pub fn get_redemption(&self, id: u64) -> StoreResult<Option<Redemption>> {
        self.get(REDEMPTIONS, id)
    }

    pub fn redemptions_matching(&self, filter: RedemptionFilter) -> StoreResult<Vec<Redemption>> {
        self.scan(REDEMPTIONS, |r: &Redemption| {
            filter.student_id.is_none_or(|id| r.student_id == id)
                && filter.status.is_none_or(|status| r.status == status)
        })
    }

    pub fn apply_completion(
        &self,
        id: u64,
        notes: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<Redemption> {
        let write_txn = self.db.begin_write()?;
        let redemption = {
            let mut redemption: Redemption = load_existing(&write_txn, REDEMPTIONS, id)?;
            if redemption.status != RedemptionStatus::Pending {
                return Err(StoreError::Conflict(format!(
                    "redemption {id} is already {:?}",
                    redemption.status
                )));
            }
            redemption.status = RedemptionStatus::Completed;
            redemption.notes = notes;
            redemption.completed_at = Some(completed_at);
            put(&write_txn, REDEMPTIONS, id, &redemption)?;
            redemption
        };
        write_txn.commit()?;
        Ok(redemption)
    }
}

#[async_trait]
impl Repository for LedgerDb {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.insert_user(user)
    }

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        self.get_user(id)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.get_user_by_email(email)
    }

    async fn create_activity(&self, activity: NewActivity) -> StoreResult<Activity> {
        self.insert_activity(activity)
    }

    async fn find_activity(&self, id: u64) -> StoreResult<Option<Activity>> {
        self.get_activity(id)
    }

    async fn create_reward(&self, reward: NewReward) -> StoreResult<Reward> {
        self.insert_reward(reward)
    }

    async fn find_reward(&self, id: u64) -> StoreResult<Option<Reward>> {
        self.get_reward(id)
    }

    async fn update_reward(&self, id: u64, update: RewardUpdate) -> StoreResult<Reward> {
        self.apply_reward_update(id, update)
    }

    async fn reserve_stock(&self, reward_id: u64) -> StoreResult<StockReservation> {
        self.take_stock(reward_id)
    }

    async fn release_stock(&self, reward_id: u64) -> StoreResult<()> {
        self.return_stock(reward_id)
    }

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<ProofSubmission> {
        self.insert_submission(submission)
    }

    async fn find_submission(&self, id: u64) -> StoreResult<Option<ProofSubmission>> {
        self.get_submission(id)
    }

    async fn list_submissions(
        &self,
        filter: SubmissionFilter,
    ) -> StoreResult<Vec<ProofSubmission>> {
        self.submissions_matching(filter)
    }

    async fn count_submissions(&self, student_id: u64, activity_id: u64) -> StoreResult<u64> {
        let matching = self.scan(SUBMISSIONS, |s: &ProofSubmission| {
            s.student_id == student_id && s.activity_id == activity_id
        })?;
        Ok(matching.len() as u64)
    }

    async fn record_review(
        &self,
        id: u64,
        decision: ReviewDecision,
    ) -> StoreResult<ProofSubmission> {
        self.apply_review(id, decision)
    }

    async fn create_redemption(&self, redemption: NewRedemption) -> StoreResult<Redemption> {
        self.insert_redemption(redemption)
    }

    async fn find_redemption(&self, id: u64) -> StoreResult<Option<Redemption>> {
        self.get_redemption(id)
    }

    async fn list_redemptions(&self, filter: RedemptionFilter) -> StoreResult<Vec<Redemption>> {
        self.redemptions_matching(filter)
    }

    async fn complete_redemption(
        &self,
        id: u64,
        notes: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<Redemption> {
        self.apply_completion(id, notes, completed_at)
    }
}
