mod cli;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use tracing::{info, warn};

use murphy_api::HttpStatusServer;
use murphy_core::{AbortReason, Orchestrator};
use murphy_exec::LocalCluster;
use murphy_observe::logger_init;
use murphy_prometheus::PrometheusMetrics;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger_init(&cli.logger_config()).context("logger init")?;
    info!("logger initialized");

    let code = run(cli).await?;
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let metrics = PrometheusMetrics::new().context("metrics registration")?;

    let cluster = LocalCluster::new(cli.cluster_config()).context("local cluster")?;
    let (manager, agent) = cluster.clients();

    let status =
        HttpStatusServer::new(cli.status_config()).with_routes(metrics_router(metrics.clone()));

    let orchestrator = Orchestrator::new(
        cli.orchestrator_config(),
        manager,
        agent,
        Arc::new(status),
    )?
    .with_metrics(Arc::new(metrics));

    let abort = orchestrator.abort_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; aborting run");
            abort.trigger(AbortReason::Interrupted);
        }
    });

    let outcome = orchestrator.run().await;
    info!(
        status = %outcome.status,
        completed = outcome.counters.completed,
        failed = outcome.counters.failed,
        diagnostics = %outcome.message,
        "run finished"
    );
    Ok(outcome.exit_code)
}

fn metrics_router(metrics: PrometheusMetrics) -> Router {
    Router::new()
        .route("/metrics", get(serve_metrics))
        .with_state(metrics)
}

/// GET /metrics
async fn serve_metrics(State(metrics): State<PrometheusMetrics>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, metrics.content_type())], body).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}
