// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial account provisioning.

use std::time::Duration;

use alloy::primitives::keccak256;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::rand_core::OsRng;
use reqwest::Client;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::cipher::{CryptoError, KeyCustody};
use crate::blockchain::NetworkKind;
use crate::models::CustodialAccount;

/// Timeout for the faucet funding request.
const FAUCET_TIMEOUT: Duration = Duration::from_secs(15);

/// Creates custodial accounts: a fresh keypair with the secret half
/// encrypted at rest.
#[derive(Clone)]
pub struct AccountProvisioner {
    custody: KeyCustody,
    network: NetworkKind,
    faucet_url: Option<String>,
    http: Client,
}

impl AccountProvisioner {
    pub fn new(custody: KeyCustody, network: NetworkKind, faucet_url: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(FAUCET_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build faucet HTTP client; using defaults");
                Client::new()
            });

        Self {
            custody,
            network,
            faucet_url,
            http,
        }
    }

    /// Provisioner that never contacts a faucet.
    pub fn offline(custody: KeyCustody) -> Self {
        Self::new(custody, NetworkKind::Mainnet, None)
    }

    /// Generate and encrypt a new account.
    ///
    /// On a test network the new address is funded from the faucet when one
    /// is configured. Funding is best effort: a failure is logged and the
    /// account is still returned.
    pub async fn provision(&self) -> Result<CustodialAccount, CryptoError> {
        let (public_key, secret) = generate_keypair();
        let encrypted_secret = self.custody.encrypt_secret(secret.as_slice())?;

        if self.network.is_test() {
            self.request_funding(&public_key).await;
        }

        Ok(CustodialAccount {
            public_key,
            encrypted_secret,
        })
    }

    async fn request_funding(&self, address: &str) {
        let Some(faucet_url) = self.faucet_url.as_deref() else {
            info!(address, "No faucet configured; new account is unfunded");
            return;
        };

        let response = self
            .http
            .get(faucet_url)
            .query(&[("addr", address)])
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!(address, "Faucet funded new account");
            }
            Ok(resp) => {
                warn!(address, status = %resp.status(), "Faucet refused to fund new account");
            }
            Err(e) => {
                warn!(address, error = %e, "Faucet request failed; new account is unfunded");
            }
        }
    }
}

impl std::fmt::Debug for AccountProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountProvisioner")
            .field("network", &self.network)
            .field("faucet_url", &self.faucet_url)
            .finish_non_exhaustive()
    }
}

/// Random secp256k1 keypair as (`0x` address, raw 32-byte secret).
fn generate_keypair() -> (String, Zeroizing<Vec<u8>>) {
    let signing_key = SigningKey::random(&mut OsRng);
    let secret = Zeroizing::new(signing_key.to_bytes().to_vec());

    let public_key_uncompressed = signing_key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&public_key_uncompressed.as_bytes()[1..]);
    let address = format!("0x{}", alloy::hex::encode(&hash[12..]));

    (address, secret)
}
