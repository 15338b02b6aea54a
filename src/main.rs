// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use campus_credits::blockchain::AlloyRpc;
use campus_credits::config::{AppConfig, LogFormat};
use campus_credits::state::LedgerServices;
use campus_credits::storage::LedgerDb;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    let report = config.health_report();
    info!(
        network = report.network,
        chain_id = report.chain_id,
        rpc_url = %report.rpc_url,
        data_dir = %report.data_dir,
        "Configuration loaded"
    );

    let repo = Arc::new(LedgerDb::open_in(&config.data_dir)?);
    let rpc = Arc::new(AlloyRpc::connect(&config.ledger.rpc_url)?);
    let services = LedgerServices::new(&config.ledger, rpc, repo);

    let admin = services
        .ensure_bootstrap_admin(&config.bootstrap_admin_email)
        .await?;
    info!(
        user_id = admin.id,
        address = %admin.account.public_key,
        "Bootstrap administrator ready"
    );

    if report.is_ready() {
        info!(report = ?report, "Ledger services ready");
    } else {
        warn!(report = ?report, "Ledger services started with missing components");
    }

    Ok(())
}
