// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::blockchain::TxError;
use crate::custody::CryptoError;
use crate::storage::StoreError;

/// Errors returned by the reward workflows.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error("Insufficient balance: you have {balance} credits, {required} required")]
    InsufficientBalance { balance: i128, required: i128 },

    #[error("{0} is out of stock")]
    OutOfStock(String),

    #[error("{message}")]
    ServiceUnavailable {
        message: String,
        #[source]
        source: TxError,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] TxError),

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Account provisioning failed: {0}")]
    Provisioning(#[from] CryptoError),
}

impl WorkflowError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unavailable(message: impl Into<String>, source: TxError) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
            source,
        }
    }

    /// Stable machine-readable code for callers mapping errors to responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Validation(_) => "VALIDATION",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::OutOfStock(_) => "OUT_OF_STOCK",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            Self::Ledger(_) => "LEDGER_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
            Self::Provisioning(_) => "PROVISIONING_FAILED",
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Conflict(msg) => Self::InvalidState(msg),
            other => Self::Store(other),
        }
    }
}
