// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger network integration for Avalanche C-Chain.
//!
//! This module provides:
//! - The RPC surface and its alloy implementation
//! - Admin and custodial transaction signing
//! - The simulate / sign / submit / confirm pipeline
//! - Credit Token, Badge Issuer and Redemption Recorder adapters

pub mod client;
pub mod confirm;
pub mod contracts;
pub mod pipeline;
pub mod signing;
pub mod types;

pub use client::{AlloyRpc, LedgerRpc, RpcError};
pub use confirm::ConfirmationPolicy;
pub use contracts::{BadgeRequest, ContractContext, LedgerContracts};
pub use pipeline::{TxError, TxPipeline};
pub use signing::{AdminSigner, CustodialSigner, LedgerSigner};
pub use types::*;
