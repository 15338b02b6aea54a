// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into an
//! immutable [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the ledger database | `/data` |
//! | `LEDGER_NETWORK` | `testnet` or `mainnet` | `testnet` |
//! | `LEDGER_RPC_URL` | RPC endpoint override | Network default |
//! | `LEDGER_FAUCET_URL` | Faucet funding new testnet accounts | Optional |
//! | `CREDIT_TOKEN_CONTRACT` | Credit Token contract address | Optional |
//! | `BADGE_ISSUER_CONTRACT` | Badge Issuer contract address | Optional |
//! | `REDEMPTION_RECORDER_CONTRACT` | Redemption Recorder contract address | Optional |
//! | `LEDGER_ADMIN_SECRET_KEY` | Admin signing key (64 hex) | Optional |
//! | `ENCRYPTION_KEY` | Custody key for user secrets (64 hex) | Required |
//! | `LEDGER_CONFIRM_INTERVAL_MS` | Delay between status checks | `1500` |
//! | `LEDGER_CONFIRM_MAX_ATTEMPTS` | Status checks before giving up | `20` |
//! | `BOOTSTRAP_ADMIN_EMAIL` | Administrator created at startup | `admin@campus.local` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::blockchain::{parse_network, ConfirmationPolicy, NetworkConfig};
use crate::custody::cipher::parse_hex_key;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "/data";

pub const LEDGER_NETWORK_ENV: &str = "LEDGER_NETWORK";
pub const LEDGER_RPC_URL_ENV: &str = "LEDGER_RPC_URL";
pub const LEDGER_FAUCET_URL_ENV: &str = "LEDGER_FAUCET_URL";

pub const CREDIT_TOKEN_CONTRACT_ENV: &str = "CREDIT_TOKEN_CONTRACT";
pub const BADGE_ISSUER_CONTRACT_ENV: &str = "BADGE_ISSUER_CONTRACT";
pub const REDEMPTION_RECORDER_CONTRACT_ENV: &str = "REDEMPTION_RECORDER_CONTRACT";

/// Secret key signing every privileged contract call.
pub const LEDGER_ADMIN_SECRET_KEY_ENV: &str = "LEDGER_ADMIN_SECRET_KEY";

/// Key encrypting custodial secrets at rest. Losing it makes every stored
/// account unusable.
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";

pub const LEDGER_CONFIRM_INTERVAL_MS_ENV: &str = "LEDGER_CONFIRM_INTERVAL_MS";
pub const LEDGER_CONFIRM_MAX_ATTEMPTS_ENV: &str = "LEDGER_CONFIRM_MAX_ATTEMPTS";

pub const BOOTSTRAP_ADMIN_EMAIL_ENV: &str = "BOOTSTRAP_ADMIN_EMAIL";
pub const DEFAULT_BOOTSTRAP_ADMIN_EMAIL: &str = "admin@campus.local";

/// `json` for structured output, anything else for human-readable logs.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Addresses of the three contracts. Each is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractAddresses {
    pub credit_token: Option<String>,
    pub badge_issuer: Option<String>,
    pub redemption_recorder: Option<String>,
}

/// Ledger network, contracts and key material.
#[derive(Clone)]
pub struct LedgerConfig {
    pub network: NetworkConfig,
    pub rpc_url: String,
    pub faucet_url: Option<String>,
    pub contracts: ContractAddresses,
    pub admin_secret_key: Option<String>,
    pub encryption_key: String,
    pub confirmation: ConfirmationPolicy,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("network", &self.network.name)
            .field("rpc_url", &self.rpc_url)
            .field("faucet_url", &self.faucet_url)
            .field("contracts", &self.contracts)
            .field("admin_secret_key", &self.admin_secret_key.as_ref().map(|_| "<redacted>"))
            .field("encryption_key", &"<redacted>")
            .field("confirmation", &self.confirmation)
            .finish()
    }
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub ledger: LedgerConfig,
    pub bootstrap_admin_email: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup` (variable name → raw value).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let network = parse_network(env.optional(LEDGER_NETWORK_ENV).as_deref()).map_err(
            |reason| ConfigError::Invalid {
                name: LEDGER_NETWORK_ENV.to_string(),
                reason,
            },
        )?;

        let confirmation = ConfirmationPolicy {
            interval: Duration::from_millis(env.parsed_or(
                LEDGER_CONFIRM_INTERVAL_MS_ENV,
                ConfirmationPolicy::default().interval.as_millis() as u64,
            )?),
            max_attempts: env.parsed_or(
                LEDGER_CONFIRM_MAX_ATTEMPTS_ENV,
                ConfirmationPolicy::default().max_attempts,
            )?,
        };
        if confirmation.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: LEDGER_CONFIRM_MAX_ATTEMPTS_ENV.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let ledger = LedgerConfig {
            rpc_url: env.or_default(LEDGER_RPC_URL_ENV, network.rpc_url),
            network,
            faucet_url: env.optional(LEDGER_FAUCET_URL_ENV),
            contracts: ContractAddresses {
                credit_token: env.optional(CREDIT_TOKEN_CONTRACT_ENV),
                badge_issuer: env.optional(BADGE_ISSUER_CONTRACT_ENV),
                redemption_recorder: env.optional(REDEMPTION_RECORDER_CONTRACT_ENV),
            },
            admin_secret_key: env.optional(LEDGER_ADMIN_SECRET_KEY_ENV),
            encryption_key: env.required(ENCRYPTION_KEY_ENV)?,
            confirmation,
        };

        Ok(Self {
            data_dir: PathBuf::from(env.or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
            ledger,
            bootstrap_admin_email: env
                .or_default(BOOTSTRAP_ADMIN_EMAIL_ENV, DEFAULT_BOOTSTRAP_ADMIN_EMAIL),
            log_format: LogFormat::parse(env.optional(LOG_FORMAT_ENV).as_deref()),
        })
    }

    /// Summary of the configuration, safe to log.
    pub fn health_report(&self) -> HealthReport {
        let ledger = &self.ledger;
        HealthReport {
            network: ledger.network.name,
            chain_id: ledger.network.chain_id,
            rpc_url: ledger.rpc_url.clone(),
            data_dir: self.data_dir.display().to_string(),
            faucet: component(ledger.network.kind.is_test() && ledger.faucet_url.is_some()),
            credit_token: component(ledger.contracts.credit_token.is_some()),
            badge_issuer: component(ledger.contracts.badge_issuer.is_some()),
            redemption_recorder: component(ledger.contracts.redemption_recorder.is_some()),
            admin_key: component(ledger.admin_secret_key.is_some()),
            encryption_key: if parse_hex_key(&ledger.encryption_key).is_ok() {
                "ok"
            } else {
                "invalid"
            },
            confirm_interval_ms: ledger.confirmation.interval.as_millis() as u64,
            confirm_max_attempts: ledger.confirmation.max_attempts,
        }
    }
}

/// Configuration summary without secrets.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthReport {
    pub network: &'static str,
    pub chain_id: u64,
    pub rpc_url: String,
    pub data_dir: String,
    pub faucet: &'static str,
    pub credit_token: &'static str,
    pub badge_issuer: &'static str,
    pub redemption_recorder: &'static str,
    pub admin_key: &'static str,
    pub encryption_key: &'static str,
    pub confirm_interval_ms: u64,
    pub confirm_max_attempts: u32,
}

impl HealthReport {
    /// Whether chain writes can be attempted at all.
    pub fn is_ready(&self) -> bool {
        self.credit_token == "configured"
            && self.admin_key == "configured"
            && self.encryption_key == "ok"
    }
}

fn component(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "not configured"
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{AVAX_FUJI, AVAX_MAINNET};
    use crate::testing::{TEST_ADMIN_KEY, TEST_ENCRYPTION_KEY};
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_with_only_encryption_key() {
        let config = load(&[(ENCRYPTION_KEY_ENV, TEST_ENCRYPTION_KEY)]).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.ledger.network, AVAX_FUJI);
        assert_eq!(config.ledger.rpc_url, AVAX_FUJI.rpc_url);
        assert_eq!(config.ledger.confirmation, ConfirmationPolicy::default());
        assert_eq!(config.ledger.contracts, ContractAddresses::default());
        assert_eq!(config.bootstrap_admin_email, "admin@campus.local");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn encryption_key_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::Missing(name)) if name == ENCRYPTION_KEY_ENV
        ));
        assert!(matches!(
            load(&[(ENCRYPTION_KEY_ENV, "   ")]),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn malformed_encryption_key_loads_but_reports_invalid() {
        let config = load(&[(ENCRYPTION_KEY_ENV, "abc")]).unwrap();
        assert_eq!(config.health_report().encryption_key, "invalid");
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            (ENCRYPTION_KEY_ENV, TEST_ENCRYPTION_KEY),
            (LEDGER_NETWORK_ENV, "mainnet"),
            (LEDGER_RPC_URL_ENV, "http://localhost:9650/ext/bc/C/rpc"),
            (CREDIT_TOKEN_CONTRACT_ENV, " 0x00000000000000000000000000000000000000c0 "),
            (LEDGER_CONFIRM_INTERVAL_MS_ENV, "250"),
            (LEDGER_CONFIRM_MAX_ATTEMPTS_ENV, "8"),
            (LOG_FORMAT_ENV, "JSON"),
        ])
        .unwrap();

        assert_eq!(config.ledger.network, AVAX_MAINNET);
        assert_eq!(config.ledger.rpc_url, "http://localhost:9650/ext/bc/C/rpc");
        assert_eq!(
            config.ledger.contracts.credit_token.as_deref(),
            Some("0x00000000000000000000000000000000000000c0")
        );
        assert_eq!(config.ledger.confirmation.interval, Duration::from_millis(250));
        assert_eq!(config.ledger.confirmation.max_attempts, 8);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_numbers_and_networks_are_rejected() {
        assert!(matches!(
            load(&[
                (ENCRYPTION_KEY_ENV, TEST_ENCRYPTION_KEY),
                (LEDGER_CONFIRM_MAX_ATTEMPTS_ENV, "many"),
            ]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            load(&[
                (ENCRYPTION_KEY_ENV, TEST_ENCRYPTION_KEY),
                (LEDGER_CONFIRM_MAX_ATTEMPTS_ENV, "0"),
            ]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            load(&[
                (ENCRYPTION_KEY_ENV, TEST_ENCRYPTION_KEY),
                (LEDGER_NETWORK_ENV, "devnet"),
            ]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn health_report_hides_secrets() {
        let config = load(&[
            (ENCRYPTION_KEY_ENV, TEST_ENCRYPTION_KEY),
            (LEDGER_ADMIN_SECRET_KEY_ENV, TEST_ADMIN_KEY),
            (CREDIT_TOKEN_CONTRACT_ENV, "0x00000000000000000000000000000000000000c0"),
        ])
        .unwrap();

        let report = config.health_report();
        assert!(report.is_ready());
        assert_eq!(report.badge_issuer, "not configured");

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains(TEST_ADMIN_KEY));
        assert!(!json.contains(TEST_ENCRYPTION_KEY));

        let debug = format!("{:?}", config);
        assert!(!debug.contains(TEST_ADMIN_KEY));
        assert!(!debug.contains(TEST_ENCRYPTION_KEY));
    }
}
