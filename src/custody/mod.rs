// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial key management.
//!
//! - [`cipher`]: AES-256-GCM encryption of signing keys at rest
//! - [`provisioner`]: keypair generation and testnet funding

pub mod cipher;
pub mod provisioner;

pub use cipher::{CryptoError, KeyCustody};
pub use provisioner::AccountProvisioner;
