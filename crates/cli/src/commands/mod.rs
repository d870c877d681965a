pub mod analyze;
pub mod hover;
pub mod measure;

use analysis::config::read_analysis_config;
use analysis::{AnalysisConfig, AnalysisCoordinator, EngineHandle};
use anyhow::{Context, Result};
use event_bus::EventBus;
use protocol_client::{ProtocolClient, Transport};
use std::path::Path;
use std::sync::Arc;
use tokio::process::Child;
use tracing::info;

use crate::cli::ServerArgs;

/// A started coordinator and the server process backing it. Dropping it
/// kills the server.
pub struct ServerConnection {
    pub coordinator: AnalysisCoordinator,
    _server_process: Child,
}

fn load_config(path: Option<&Path>) -> AnalysisConfig {
    match path {
        Some(path) => read_analysis_config(path),
        None => AnalysisConfig::default(),
    }
}

pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Spawns the type server and opens `source` as the analysed document.
pub async fn connect(args: &ServerArgs, source: &str) -> Result<ServerConnection> {
    let config = load_config(args.config.as_deref());
    let (transport, server_process) = Transport::spawn_process(&args.server, &args.server_args)
        .with_context(|| format!("Failed to start type server `{}`", args.server))?;

    let client = Arc::new(ProtocolClient::with_request_timeout(
        transport,
        config.request_timeout(),
    ));
    let engine = EngineHandle::new(client, Arc::new(EventBus::new()), config)?;
    let coordinator = AnalysisCoordinator::new(engine, None);

    let summary = coordinator.start(source).await?;
    info!(
        "Initial scan: {} lines, {} resolved, {} unknown",
        summary.scanned_lines, summary.resolved, summary.unknown
    );

    Ok(ServerConnection {
        coordinator,
        _server_process: server_process,
    })
}
