use super::summary;
use anyhow::{Context, Result};
use genesis_application::SyncContext;
use genesis_core::UserId;
use genesis_core::config::GenesisConfig;

/// Loads every store for `user` against the configured backend.
pub async fn run(config: &GenesisConfig, user: &str) -> Result<()> {
    let gateways = genesis_infrastructure::connect(&config.gateway).context("Failed to set up the backend")?;
    let ctx = SyncContext::new(gateways, config);
    let user = UserId::new(user);

    let report = ctx
        .orchestrator
        .on_identity(Some(user.clone()))
        .await
        .context("Sign-in was superseded")?;
    summary::print(&ctx);

    for failure in report.failures() {
        if let Err(e) = &failure.result {
            tracing::warn!(store = failure.store, error = %e, "[Status] store failed to load");
        }
    }

    ctx.orchestrator.on_identity(None).await;
    report.into_result().with_context(|| format!("Loading data for {user} failed"))
}
