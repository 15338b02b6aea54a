// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Proof submissions and their review: `PENDING → APPROVED | REJECTED`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{error, info};

use super::{non_blank, ChainEffect, Outcome};
use crate::blockchain::{BadgeRequest, LedgerContracts};
use crate::error::WorkflowError;
use crate::models::{NewSubmission, ProofSubmission, ReviewDecision, SubmissionStatus};
use crate::storage::{Repository, SubmissionFilter};

/// Result of approving a submission.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub submission: ProofSubmission,
    pub mint: ChainEffect,
    pub badge: ChainEffect,
    pub message: String,
}

/// Ids of submissions with a decision in progress.
type Claims = Arc<Mutex<HashSet<u64>>>;

/// Exclusive right to decide one submission. Released on drop.
struct ReviewClaim {
    claims: Claims,
    id: u64,
}

impl ReviewClaim {
    fn acquire(claims: &Claims, id: u64) -> Result<Self, WorkflowError> {
        let fresh = claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        if !fresh {
            return Err(WorkflowError::invalid_state(format!(
                "Submission {id} is already being reviewed"
            )));
        }
        Ok(Self {
            claims: claims.clone(),
            id,
        })
    }
}

impl Drop for ReviewClaim {
    fn drop(&mut self) {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Submission intake and review.
///
/// A decision claims its submission before any ledger call, so of two
/// concurrent decisions on one submission only the first reaches the chain.
#[derive(Clone)]
pub struct SubmissionReview {
    repo: Arc<dyn Repository>,
    contracts: LedgerContracts,
    claims: Claims,
}

impl SubmissionReview {
    pub fn new(repo: Arc<dyn Repository>, contracts: LedgerContracts) -> Self {
        Self {
            repo,
            contracts,
            claims: Claims::default(),
        }
    }

    /// Record a student's proof for an active activity.
    pub async fn submit(
        &self,
        student_id: u64,
        activity_id: u64,
        description: &str,
        proof_url: Option<String>,
    ) -> Result<ProofSubmission, WorkflowError> {
        let description = non_blank(Some(description))
            .ok_or_else(|| WorkflowError::validation("A description of the activity is required"))?;

        let activity = self
            .repo
            .find_activity(activity_id)
            .await?
            .filter(|a| a.is_active())
            .ok_or_else(|| WorkflowError::not_found("Activity not found or inactive"))?;

        if activity.deadline.is_some_and(|deadline| deadline < Utc::now()) {
            return Err(WorkflowError::validation("The activity deadline has passed"));
        }

        if let Some(max) = activity.max_submissions {
            let count = self.repo.count_submissions(student_id, activity_id).await?;
            if count >= u64::from(max) {
                return Err(WorkflowError::validation(format!(
                    "You already reached the maximum of {max} submission(s) for this activity"
                )));
            }
        }

        let submission = self
            .repo
            .create_submission(NewSubmission {
                student_id,
                activity_id,
                description,
                proof_url: non_blank(proof_url.as_deref()),
            })
            .await?;

        info!(submission_id = submission.id, student_id, activity_id, "Proof submitted");
        Ok(submission)
    }

    pub async fn list(
        &self,
        filter: SubmissionFilter,
    ) -> Result<Vec<ProofSubmission>, WorkflowError> {
        Ok(self.repo.list_submissions(filter).await?)
    }

    async fn pending(&self, id: u64) -> Result<ProofSubmission, WorkflowError> {
        let submission = self
            .repo
            .find_submission(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("Submission {id} not found")))?;

        match submission.status {
            SubmissionStatus::Pending => Ok(submission),
            SubmissionStatus::Approved => Err(WorkflowError::invalid_state(format!(
                "Submission {id} was already approved"
            ))),
            SubmissionStatus::Rejected => Err(WorkflowError::invalid_state(format!(
                "Submission {id} was already rejected"
            ))),
        }
    }

    /// Approve a pending submission.
    ///
    /// Mints the activity points and, when the Badge Issuer is configured,
    /// issues a badge. Both are best effort and independent of each other;
    /// the submission is approved once both were attempted, annotated with
    /// whichever hashes were confirmed.
    pub async fn approve(
        &self,
        id: u64,
        reviewer_id: u64,
        notes: Option<&str>,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        let _claim = ReviewClaim::acquire(&self.claims, id)?;
        let submission = self.pending(id).await?;

        let activity = self
            .repo
            .find_activity(submission.activity_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Activity for this submission not found"))?;

        let student = self
            .repo
            .find_user(submission.student_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Student not found"))?;

        let address = student.account.public_key.as_str();
        let points = i128::from(activity.points_reward);

        let mint = ChainEffect::settle(
            "mint",
            self.contracts.token.mint(address, points).await,
        );

        let badge = if self.contracts.badges.is_configured() {
            let request = BadgeRequest {
                student: address,
                activity_id: activity.id,
                title: &activity.title,
                image_uri: activity.badge_image_url.as_deref().unwrap_or_default(),
                points_awarded: points,
                description: &submission.description,
            };
            ChainEffect::settle("issueBadge", self.contracts.badges.issue_badge(&request).await)
        } else {
            ChainEffect::Skipped
        };

        let decision = ReviewDecision {
            status: SubmissionStatus::Approved,
            reviewer_id,
            reviewer_notes: non_blank(notes),
            mint_tx_hash: mint.tx_hash(),
            badge_tx_hash: badge.tx_hash(),
            reviewed_at: Utc::now(),
        };

        let submission = match self.repo.record_review(id, decision).await {
            Ok(submission) => submission,
            Err(e) => {
                error!(
                    submission_id = id,
                    mint_tx = ?mint.tx_hash(),
                    badge_tx = ?badge.tx_hash(),
                    error = %e,
                    "Approval not recorded after ledger calls"
                );
                return Err(e.into());
            }
        };

        let message = approval_message(activity.points_reward, &mint, &badge);
        info!(
            submission_id = id,
            reviewer_id,
            mint_tx = ?submission.mint_tx_hash,
            badge_tx = ?submission.badge_tx_hash,
            "Submission approved"
        );

        Ok(ApprovalOutcome {
            submission,
            mint,
            badge,
            message,
        })
    }

    /// Reject a pending submission. Notes are required; nothing touches the
    /// ledger.
    pub async fn reject(
        &self,
        id: u64,
        reviewer_id: u64,
        notes: &str,
    ) -> Result<Outcome<ProofSubmission>, WorkflowError> {
        let notes = non_blank(Some(notes))
            .ok_or_else(|| WorkflowError::validation("Rejection notes are required"))?;

        let _claim = ReviewClaim::acquire(&self.claims, id)?;
        self.pending(id).await?;

        let submission = self
            .repo
            .record_review(
                id,
                ReviewDecision {
                    status: SubmissionStatus::Rejected,
                    reviewer_id,
                    reviewer_notes: Some(notes),
                    mint_tx_hash: None,
                    badge_tx_hash: None,
                    reviewed_at: Utc::now(),
                },
            )
            .await?;

        info!(submission_id = id, reviewer_id, "Submission rejected");
        Ok(Outcome {
            record: submission,
            message: "Submission rejected".to_string(),
        })
    }
}

fn approval_message(points: u64, mint: &ChainEffect, badge: &ChainEffect) -> String {
    let mint_part = match mint {
        ChainEffect::Confirmed(tx) => format!("{points} points minted (tx: {})", tx.hash_hex()),
        ChainEffect::Failed(reason) => format!("Point mint failed: {reason}"),
        ChainEffect::Skipped => {
            "Credit Token contract not configured; points were not minted".to_string()
        }
    };
    let badge_part = match badge {
        ChainEffect::Confirmed(tx) => format!(" Badge issued on-chain (tx: {}).", tx.hash_hex()),
        ChainEffect::Failed(reason) => format!(" Badge issuance failed: {reason}"),
        ChainEffect::Skipped => " Badge Issuer contract not configured.".to_string(),
    };
    format!("Submission approved. {mint_part}.{badge_part}")
}
