//! subburn host process
//!
//! Reads JSON requests from stdin, one per line, and writes replies and job
//! events to stdout. Logs go to stderr.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subburn::config::{AppConfig, LoggingConfig};
use subburn::config_file::ConfigFile;
use subburn::state::AppState;
use subburn::{Result, Service};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "subburn";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let first = args.next();

    // `subburn --init-config [path]` writes the defaults and exits
    if first.as_deref() == Some("--init-config") {
        let path = args.next().unwrap_or_else(|| "subburn.toml".to_string());
        if let Err(e) = subburn::config_file::generate_default_config(&path) {
            eprintln!("failed to write {}: {}", path, e);
            std::process::exit(1);
        }
        eprintln!("wrote default configuration to {}", path);
        return Ok(());
    }

    // Load configuration
    let config_path = first.unwrap_or_else(|| "subburn.toml".to_string());
    let (config, load_error) = if std::path::Path::new(&config_path).exists() {
        match ConfigFile::from_file(&config_path) {
            Ok(cf) => (cf.into_app_config(), None),
            Err(e) => (AppConfig::default(), Some(e.to_string())),
        }
    } else {
        (AppConfig::default(), None)
    };

    init_logging(&config.logging);
    if let Some(e) = load_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    tracing::info!("FFmpeg version: {}", subburn::ffmpeg_version_info());
    tracing::debug!("Configuration loaded: {:?}", config);

    let service = Service::new(&config)?;
    subburn::install_log_filter();

    let state = Arc::new(AppState::new(service, config));
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::select! {
        served = subburn::host::serve(state.clone(), stdin, tokio::io::stdout()) => {
            served?;
            tracing::info!("input closed, exiting");
        }
        _ = tokio::signal::ctrl_c() => {
            state.shutdown();
            if let Some((job_id, _)) = state.service.controller().active_job() {
                tracing::info!(job_id = %job_id, "interrupted, cancelling running export");
                state.service.controller().cancel(job_id);
                // Give the export a moment to remove its partial output.
                let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
                while state.service.controller().active_job().is_some()
                    && tokio::time::Instant::now() < deadline
                {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                }
            }
        }
    }
    Ok(())
}

/// Initialize logging with tracing. Stdout carries the protocol, so logs
/// always go to stderr.
fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("subburn={},ffmpeg=warn", config.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "subburn");
    }
}
