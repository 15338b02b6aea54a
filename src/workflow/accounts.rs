// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tracing::{info, warn};

use crate::blockchain::contracts::CreditToken;
use crate::custody::AccountProvisioner;
use crate::error::WorkflowError;
use crate::models::{NewUser, Role, User};
use crate::storage::Repository;

/// Users and their custodial accounts.
#[derive(Clone)]
pub struct AccountDirectory {
    repo: Arc<dyn Repository>,
    provisioner: AccountProvisioner,
    token: CreditToken,
}

impl AccountDirectory {
    pub fn new(
        repo: Arc<dyn Repository>,
        provisioner: AccountProvisioner,
        token: CreditToken,
    ) -> Self {
        Self {
            repo,
            provisioner,
            token,
        }
    }

    /// Create a user with a freshly provisioned custodial account.
    pub async fn register(&self, email: &str, role: Role) -> Result<User, WorkflowError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(WorkflowError::validation("A valid email address is required"));
        }

        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(WorkflowError::invalid_state(format!(
                "A user with email {email} already exists"
            )));
        }

        let account = self.provisioner.provision().await?;
        let user = self
            .repo
            .create_user(NewUser {
                email,
                role,
                account,
            })
            .await?;

        info!(
            user_id = user.id,
            role = ?user.role,
            address = %user.account.public_key,
            "User registered"
        );
        Ok(user)
    }

    /// Make sure the configured administrator exists. Safe to call on every
    /// start.
    pub async fn ensure_bootstrap_admin(&self, email: &str) -> Result<User, WorkflowError> {
        let normalized = email.trim().to_lowercase();
        if let Some(existing) = self.repo.find_user_by_email(&normalized).await? {
            if existing.role != Role::Admin {
                warn!(
                    user_id = existing.id,
                    role = ?existing.role,
                    "Bootstrap admin email belongs to a non-admin user"
                );
            }
            return Ok(existing);
        }
        self.register(&normalized, Role::Admin).await
    }

    pub async fn find(&self, user_id: u64) -> Result<User, WorkflowError> {
        self.repo
            .find_user(user_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("User {user_id} not found")))
    }

    /// On-chain credit balance of a user.
    pub async fn balance_of(&self, user_id: u64) -> Result<i128, WorkflowError> {
        let user = self.find(user_id).await?;
        self.token
            .balance(&user.account.public_key)
            .await
            .map_err(|e| WorkflowError::unavailable("Could not read the balance", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::TxError;
    use crate::config::ContractAddresses;
    use crate::testing::Harness;

    #[tokio::test]
    async fn register_normalizes_email_and_provisions_account() {
        let h = Harness::new();
        let user = h
            .services
            .register_user("  Ana@Campus.EDU ", Role::Student)
            .await
            .unwrap();

        assert_eq!(user.email, "ana@campus.edu");
        assert!(user.account.public_key.starts_with("0x"));
        assert_eq!(user.account.public_key.len(), 42);

        let secret = h
            .services
            .decrypt_secret(&user.account.encrypted_secret)
            .unwrap();
        assert_eq!(secret.len(), 32);
    }

    #[tokio::test]
    async fn duplicate_and_invalid_emails_are_refused() {
        let h = Harness::new();
        h.student("leo@campus.edu", 0).await;

        let dup = h
            .services
            .register_user("LEO@campus.edu", Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(dup, WorkflowError::InvalidState(_)));

        let bad = h
            .services
            .register_user("not-an-email", Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(bad, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn bootstrap_admin_is_idempotent() {
        let h = Harness::new();
        let first = h
            .services
            .ensure_bootstrap_admin("admin@campus.edu")
            .await
            .unwrap();
        let second = h
            .services
            .ensure_bootstrap_admin("ADMIN@campus.edu")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.role, Role::Admin);
    }

    #[tokio::test]
    async fn balance_reads_the_token_contract() {
        let h = Harness::new();
        let student = h.student("mia@campus.edu", 75).await;

        assert_eq!(h.services.balance_of(student.id).await.unwrap(), 75);
        assert!(h.ledger.submissions().is_empty());

        let missing = h.services.balance_of(999).await.unwrap_err();
        assert!(matches!(missing, WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn balance_without_token_is_unavailable() {
        let h = Harness::with_contracts(ContractAddresses::default());
        let student = h.student("mia@campus.edu", 75).await;

        let err = h.services.balance_of(student.id).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::ServiceUnavailable {
                source: TxError::NotConfigured(_),
                ..
            }
        ));
    }
}
