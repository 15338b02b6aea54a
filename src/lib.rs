// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Campus Credits - custodial ledger service for student rewards
//!
//! Students earn credits for approved activity proofs and spend them on
//! rewards. Every student holds a custodial account on an Avalanche
//! C-Chain network; credits live in a token contract, while submissions,
//! redemptions and the catalog live in an embedded store. The workflows
//! keep the two ledgers consistent.
//!
//! ## Modules
//!
//! - `blockchain` - RPC client, transaction pipeline and contract adapters
//! - `config` - Environment configuration
//! - `custody` - Secret encryption and account provisioning
//! - `storage` - Off-chain ledger store (redb)
//! - `workflow` - Approval, rejection and redemption workflows
//! - `state` - Service wiring

pub mod blockchain;
pub mod config;
pub mod custody;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod workflow;

#[cfg(test)]
pub mod testing;
