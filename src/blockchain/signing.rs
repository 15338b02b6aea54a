// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction signing identities.
//!
//! Every privileged contract call (mint, clawback, badge issuance,
//! redemption recording) is signed by the single [`AdminSigner`], whatever
//! account the call affects. That key is the single point of failure of the
//! custody model and is kept behind the [`LedgerSigner`] capability so the
//! pipeline never touches raw key material.
//!
//! [`CustodialSigner`] signs on behalf of a user: it decrypts the stored
//! secret immediately before signing and drops the plaintext when the call
//! returns. None of the reward workflows use it today. It is public for
//! callers that send a transaction from a student's own account through
//! [`TxPipeline::invoke`](super::TxPipeline::invoke).

use std::str::FromStr;

use alloy::{
    eips::eip2718::Encodable2718,
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use super::pipeline::TxError;
use crate::custody::KeyCustody;
use crate::models::CustodialAccount;

/// A key able to sign transactions for one ledger address.
#[async_trait]
pub trait LedgerSigner: Send + Sync {
    /// Ledger address of the signing key.
    fn address(&self) -> Result<Address, TxError>;

    /// Sign a fully assembled transaction and return its EIP-2718 encoding.
    async fn sign(&self, tx: TransactionRequest) -> Result<Bytes, TxError>;
}

/// Create a signer from a private key (hex string, optional 0x prefix).
pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, String> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim()).map_err(|e| e.to_string())?;
    PrivateKeySigner::from_slice(&key_bytes).map_err(|e| e.to_string())
}

async fn sign_with(signer: PrivateKeySigner, tx: TransactionRequest) -> Result<Bytes, TxError> {
    let wallet = EthereumWallet::from(signer);
    let envelope = <TransactionRequest as TransactionBuilder<Ethereum>>::build(tx, &wallet)
        .await
        .map_err(|e| TxError::Submission(format!("failed to sign transaction: {e}")))?;
    Ok(Bytes::from(envelope.encoded_2718()))
}

/// Administrator signing key loaded from configuration.
///
/// A missing or malformed key does not fail construction; it surfaces as
/// [`TxError::Configuration`] on the call paths that need the key.
#[derive(Clone)]
pub struct AdminSigner {
    signer: Result<PrivateKeySigner, String>,
}

impl AdminSigner {
    pub fn from_config(secret_hex: Option<&str>) -> Self {
        let signer = match secret_hex {
            None => Err("LEDGER_ADMIN_SECRET_KEY is not configured".to_string()),
            Some(hex) => create_signer(hex)
                .map_err(|e| format!("LEDGER_ADMIN_SECRET_KEY is invalid: {e}")),
        };
        Self { signer }
    }

    pub fn is_configured(&self) -> bool {
        self.signer.is_ok()
    }

    fn signer(&self) -> Result<&PrivateKeySigner, TxError> {
        self.signer
            .as_ref()
            .map_err(|msg| TxError::Configuration(msg.clone()))
    }
}

#[async_trait]
impl LedgerSigner for AdminSigner {
    fn address(&self) -> Result<Address, TxError> {
        Ok(self.signer()?.address())
    }

    async fn sign(&self, tx: TransactionRequest) -> Result<Bytes, TxError> {
        let signer = self.signer()?.clone();
        sign_with(signer, tx).await
    }
}

impl std::fmt::Debug for AdminSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSigner")
            .field("address", &self.signer.as_ref().ok().map(|s| s.address()))
            .finish()
    }
}

/// Signs with a user's custodial key, decrypting it only for the call.
pub struct CustodialSigner {
    custody: KeyCustody,
    account: CustodialAccount,
}

impl CustodialSigner {
    pub fn new(custody: KeyCustody, account: CustodialAccount) -> Self {
        Self { custody, account }
    }
}

#[async_trait]
impl LedgerSigner for CustodialSigner {
    fn address(&self) -> Result<Address, TxError> {
        Address::from_str(&self.account.public_key)
            .map_err(|e| TxError::InvalidAddress(format!("{}: {e}", self.account.public_key)))
    }

    async fn sign(&self, tx: TransactionRequest) -> Result<Bytes, TxError> {
        let signer = {
            let secret = self.custody.decrypt_secret(&self.account.encrypted_secret)?;
            PrivateKeySigner::from_slice(&secret)
                .map_err(|e| TxError::Configuration(format!("stored key is invalid: {e}")))?
        };

        if signer.address() != self.address()? {
            return Err(TxError::Configuration(format!(
                "stored key does not match account {}",
                self.account.public_key
            )));
        }

        sign_with(signer, tx).await
    }
}
