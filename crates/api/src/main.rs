//! Casebridge server binary.
//!
//! Serves the callback receiver and attachment endpoints, and runs the
//! cron-driven reconciliation scheduler when enabled.

use std::sync::Arc;

use casebridge_api::{logging, server, AppContext};
use casebridge_domain::{BridgeError, Config, Result};
use casebridge_infra::{DispatchScheduler, DispatchSchedulerConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    logging::init();

    let config = match casebridge_infra::config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(config).await {
        error!(error = %err, "fatal error");
        std::process::exit(1);
    }

    info!("casebridge stopped");
}

async fn run(config: Config) -> Result<()> {
    let ctx = Arc::new(AppContext::new(config.clone())?);

    let mut scheduler = if config.scheduler.enabled {
        let scheduler_config = DispatchSchedulerConfig {
            cron_expression: config.scheduler.cron_expression.clone(),
            item_limit: config.scheduler.item_limit,
            ..Default::default()
        };
        let mut scheduler =
            DispatchScheduler::new(scheduler_config, ctx.dispatch.clone(), ctx.tokens.clone());
        scheduler
            .start()
            .await
            .map_err(|err| BridgeError::Internal(format!("scheduler start failed: {err}")))?;
        Some(scheduler)
    } else {
        info!("reconciliation scheduler disabled");
        None
    };

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    };
    server::serve(ctx, shutdown).await?;

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(err) = scheduler.stop().await {
            error!(error = %err, "scheduler stop failed");
        }
    }

    Ok(())
}
