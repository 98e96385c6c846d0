/// Block Index Mock Server
///
/// A lightweight stand-in for the earliest-block index, fee and rate
/// services, serving a JSON fixture. Designed for local development.

use anyhow::{Context, Result};
use index_mock::{run_server, Fixture, MockState};
use std::env;
use std::sync::Arc;

#[derive(Debug)]
struct Config {
    // Fixture
    fixture_path: Option<String>,

    // Server
    server_host: String,
    server_port: u16,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let fixture_path = env::var("FIXTURE_PATH").ok();

        let server_host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        Ok(Self {
            fixture_path,
            server_host,
            server_port,
        })
    }
}

fn load_fixture(path: Option<&str>) -> Result<Fixture> {
    let Some(path) = path else {
        log::info!("No FIXTURE_PATH set, serving an empty fixture");
        return Ok(Fixture::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid fixture {}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting Index Mock Server...");

    // Load configuration
    let config = Config::from_env()
        .context("Failed to load configuration")?;

    log::info!("Server will listen on {}:{}", config.server_host, config.server_port);

    let fixture = load_fixture(config.fixture_path.as_deref())?;
    let state = Arc::new(MockState::new(fixture));

    // Run server
    run_server(state, config.server_host, config.server_port)
        .await
        .context("Server error")?;

    Ok(())
}
