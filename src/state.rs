// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use alloy::primitives::Address;
use zeroize::Zeroizing;

use crate::blockchain::{
    AdminSigner, ContractContext, LedgerContracts, LedgerRpc, TxError, TxPipeline,
};
use crate::config::LedgerConfig;
use crate::custody::{AccountProvisioner, CryptoError, KeyCustody};
use crate::error::WorkflowError;
use crate::models::{CustodialAccount, ProofSubmission, Redemption, Role, User};
use crate::storage::Repository;
use crate::workflow::{
    AccountDirectory, ApprovalOutcome, Outcome, RedemptionOutcome, RedemptionWorkflow,
    SubmissionReview,
};

/// Everything the reward workflows need, wired once at startup.
///
/// Cheap to clone; every component shares the same pipeline, admin signer
/// and repository.
#[derive(Clone)]
pub struct LedgerServices {
    pub repo: Arc<dyn Repository>,
    pub custody: KeyCustody,
    pub contracts: LedgerContracts,
    pub accounts: AccountDirectory,
    pub submissions: SubmissionReview,
    pub redemptions: RedemptionWorkflow,
    provisioner: AccountProvisioner,
}

impl LedgerServices {
    pub fn new(config: &LedgerConfig, rpc: Arc<dyn LedgerRpc>, repo: Arc<dyn Repository>) -> Self {
        let pipeline = Arc::new(TxPipeline::new(
            rpc,
            config.network.clone(),
            config.confirmation,
        ));
        let admin = Arc::new(AdminSigner::from_config(config.admin_secret_key.as_deref()));
        let contracts = LedgerContracts::new(ContractContext { pipeline, admin }, &config.contracts);

        let custody = KeyCustody::new(config.encryption_key.clone());
        let provisioner = AccountProvisioner::new(
            custody.clone(),
            config.network.kind,
            config.faucet_url.clone(),
        );

        Self {
            accounts: AccountDirectory::new(
                repo.clone(),
                provisioner.clone(),
                contracts.token.clone(),
            ),
            submissions: SubmissionReview::new(repo.clone(), contracts.clone()),
            redemptions: RedemptionWorkflow::new(repo.clone(), contracts.clone()),
            repo,
            custody,
            contracts,
            provisioner,
        }
    }

    // =========================================================================
    // Custody
    // =========================================================================

    pub async fn provision_account(&self) -> Result<CustodialAccount, CryptoError> {
        self.provisioner.provision().await
    }

    pub fn encrypt_secret(&self, secret: &[u8]) -> Result<String, CryptoError> {
        self.custody.encrypt_secret(secret)
    }

    pub fn decrypt_secret(&self, blob: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.custody.decrypt_secret(blob)
    }

    // =========================================================================
    // Balances
    // =========================================================================

    /// Credit balance of any address.
    pub async fn balance(&self, address: &Address) -> Result<i128, TxError> {
        self.contracts.token.balance(&address.to_checksum(None)).await
    }

    pub async fn balance_of(&self, user_id: u64) -> Result<i128, WorkflowError> {
        self.accounts.balance_of(user_id).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn register_user(&self, email: &str, role: Role) -> Result<User, WorkflowError> {
        self.accounts.register(email, role).await
    }

    pub async fn ensure_bootstrap_admin(&self, email: &str) -> Result<User, WorkflowError> {
        self.accounts.ensure_bootstrap_admin(email).await
    }

    // =========================================================================
    // Workflows
    // =========================================================================

    pub async fn submit_proof(
        &self,
        student_id: u64,
        activity_id: u64,
        description: &str,
        proof_url: Option<String>,
    ) -> Result<ProofSubmission, WorkflowError> {
        self.submissions
            .submit(student_id, activity_id, description, proof_url)
            .await
    }

    pub async fn approve_submission(
        &self,
        id: u64,
        reviewer_id: u64,
        notes: Option<&str>,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        self.submissions.approve(id, reviewer_id, notes).await
    }

    pub async fn reject_submission(
        &self,
        id: u64,
        reviewer_id: u64,
        notes: &str,
    ) -> Result<Outcome<ProofSubmission>, WorkflowError> {
        self.submissions.reject(id, reviewer_id, notes).await
    }

    pub async fn create_redemption(
        &self,
        student_id: u64,
        reward_id: u64,
    ) -> Result<RedemptionOutcome, WorkflowError> {
        self.redemptions.create(student_id, reward_id).await
    }

    pub async fn complete_redemption(
        &self,
        id: u64,
        notes: Option<&str>,
    ) -> Result<Outcome<Redemption>, WorkflowError> {
        self.redemptions.complete(id, notes).await
    }
}
