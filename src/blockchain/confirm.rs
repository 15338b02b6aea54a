// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Poll-confirm state for a submitted transaction.
//!
//! [`ConfirmationPoll`] only counts attempts and interprets statuses; the
//! async driver in [`pipeline`](super::pipeline) sleeps and queries the node.

use std::time::Duration;

use super::types::{ChainStatus, DEFAULT_CONFIRM_ATTEMPTS, DEFAULT_CONFIRM_INTERVAL};

/// Interval and attempt budget of the confirmation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CONFIRM_INTERVAL,
            max_attempts: DEFAULT_CONFIRM_ATTEMPTS,
        }
    }
}

impl ConfirmationPolicy {
    /// Upper bound on time spent waiting for one transaction.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// What the driver should do after a status observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Confirmed,
    Failed,
    Wait,
    TimedOut,
}

/// Progress of one confirmation loop.
#[derive(Debug, Clone)]
pub struct ConfirmationPoll {
    attempts: u32,
    max_attempts: u32,
    last_status: ChainStatus,
}

impl ConfirmationPoll {
    pub fn new(policy: &ConfirmationPolicy) -> Self {
        Self {
            attempts: 0,
            max_attempts: policy.max_attempts.max(1),
            last_status: ChainStatus::Pending,
        }
    }

    /// Record one observed status and decide the next step.
    pub fn advance(&mut self, status: ChainStatus) -> PollStep {
        self.attempts += 1;
        self.last_status = status;

        match status {
            ChainStatus::Success => PollStep::Confirmed,
            ChainStatus::Failed => PollStep::Failed,
            ChainStatus::Pending if self.attempts >= self.max_attempts => PollStep::TimedOut,
            ChainStatus::Pending => PollStep::Wait,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_status(&self) -> ChainStatus {
        self.last_status
    }
}
