//! `oxtutor serve` — Start the tutoring server.

use oxtutor_config::AppConfig;
use tracing::info;

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load()?;
    config.validate()?;

    if let Some(port) = port {
        config.server.port = port;
    }

    info!(model = %config.model, "Starting oxtutor server");
    oxtutor_gateway::start(config).await
}
