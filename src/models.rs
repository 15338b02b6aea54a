// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Data Models
//!
//! Off-chain records kept in the ledger store. The off-chain status of a
//! record is authoritative; the optional `*_tx_hash` fields annotate which
//! chain effects were confirmed.
//!
//! ## Model Categories
//!
//! - **Users**: role plus the custodial account created with the user
//! - **Catalog**: activities that earn points, rewards that cost points
//! - **Submissions**: proof of an activity awaiting review
//! - **Redemptions**: a reward bought with points, debited on chain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Users
// =============================================================================

/// User role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Reviewer,
    Student,
}

/// Ledger account held in custody for a user.
///
/// Created once with the user and never regenerated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustodialAccount {
    /// `0x`-prefixed ledger address.
    pub public_key: String,
    /// Base64 `nonce || tag || ciphertext` of the private key.
    pub encrypted_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub role: Role,
    pub account: CustodialAccount,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub role: Role,
    pub account: CustodialAccount,
}

// =============================================================================
// Catalog
// =============================================================================

/// Whether an activity or reward is offered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub points_reward: u64,
    pub badge_image_url: Option<String>,
    /// Submissions are refused after this instant.
    pub deadline: Option<DateTime<Utc>>,
    /// Per-student submission cap.
    pub max_submissions: Option<u32>,
    pub status: CatalogStatus,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn is_active(&self) -> bool {
        self.status == CatalogStatus::Active
    }
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub title: String,
    pub description: String,
    pub points_reward: u64,
    pub badge_image_url: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub max_submissions: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reward {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub points_cost: u64,
    /// Remaining units; `None` means unlimited.
    pub stock: Option<u64>,
    pub status: CatalogStatus,
    pub created_at: DateTime<Utc>,
}

impl Reward {
    pub fn is_active(&self) -> bool {
        self.status == CatalogStatus::Active
    }
}

#[derive(Debug, Clone)]
pub struct NewReward {
    pub name: String,
    pub description: String,
    pub points_cost: u64,
    pub stock: Option<u64>,
}

/// Fields of a reward that may change after creation.
#[derive(Debug, Clone, Default)]
pub struct RewardUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub points_cost: Option<u64>,
    pub stock: Option<Option<u64>>,
    pub status: Option<CatalogStatus>,
}

// =============================================================================
// Submissions
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Proof that a student completed an activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofSubmission {
    pub id: u64,
    pub student_id: u64,
    pub activity_id: u64,
    pub description: String,
    pub proof_url: Option<String>,
    pub status: SubmissionStatus,
    pub reviewer_id: Option<u64>,
    pub reviewer_notes: Option<String>,
    /// Set only when the point mint was confirmed.
    pub mint_tx_hash: Option<String>,
    /// Set only when the badge issuance was confirmed.
    pub badge_tx_hash: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub student_id: u64,
    pub activity_id: u64,
    pub description: String,
    pub proof_url: Option<String>,
}

/// A review decision applied to a pending submission.
#[derive(Debug, Clone)]
pub struct ReviewDecision {
    pub status: SubmissionStatus,
    pub reviewer_id: u64,
    pub reviewer_notes: Option<String>,
    pub mint_tx_hash: Option<String>,
    pub badge_tx_hash: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

// =============================================================================
// Redemptions
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionStatus {
    Pending,
    Completed,
    Cancelled,
}

/// A reward bought with points.
///
/// Exists only after the on-chain debit was confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Redemption {
    pub id: u64,
    pub student_id: u64,
    pub reward_id: u64,
    /// Cost at redemption time; later price changes do not apply.
    pub points_spent: u64,
    pub status: RedemptionStatus,
    pub debit_tx_hash: String,
    pub record_tx_hash: Option<String>,
    pub notes: Option<String>,
    pub redeemed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewRedemption {
    pub student_id: u64,
    pub reward_id: u64,
    pub points_spent: u64,
    pub debit_tx_hash: String,
    pub record_tx_hash: Option<String>,
}
