use insight_board::{app, config::Config};

/// Main entry point for the dashboard web application.
///
/// Reads all settings from the environment, wires up logging, and serves
/// the dashboard until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env();
    app::run(config).await
}
