use bridge_health::{config, BridgeHealthPipeline, Severity, Status};
use chrono::Utc;
use futures_util::{pin_mut, StreamExt};
use serde_json::json;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn exit_code(severity: Severity) -> ExitCode {
    match severity {
        Severity::Healthy => ExitCode::SUCCESS,
        Severity::Warning => ExitCode::from(1),
        Severity::Danger => ExitCode::from(2),
        Severity::Unknown | Severity::Checking => ExitCode::from(3),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr) // stdout carries only the JSON report
        .with_target(false)
        .init();

    info!("Bridge health check starting...");

    let cfg = config::load()?;
    info!("  L1 RPC: {}", cfg.l1_rpc_url);
    info!("  L2 RPC: {}", cfg.l2_rpc_url);
    info!("  L1 proxy: {}", cfg.l1_proxy);
    info!("  L1 bridge: {}", cfg.l1_bridge);
    info!("  L2 bridge: {}", cfg.l2_bridge);
    info!(
        "  Lookback: {} L1 blocks, {} L2 blocks",
        cfg.l1_lookback_blocks, cfg.l2_lookback_blocks
    );

    let pipeline = BridgeHealthPipeline::from_config(cfg)?;

    let started = Instant::now();
    let mut latest = Status::unknown();
    let statuses = pipeline.run();
    pin_mut!(statuses);

    while let Some(status) = statuses.next().await {
        match status.severity {
            Severity::Checking => info!("{}", status.text.as_deref().unwrap_or_default()),
            Severity::Healthy => info!("✅ {}", status.text.as_deref().unwrap_or_default()),
            _ => warn!(
                "[{}] {}",
                status.severity,
                status.text.as_deref().unwrap_or_default()
            ),
        }
        latest = status;
    }

    let report = json!({
        "status": latest,
        "verdict": latest.severity.is_verdict(),
        "checked_at": Utc::now(),
        "elapsed_ms": started.elapsed().as_millis() as u64,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(exit_code(latest.severity))
}
