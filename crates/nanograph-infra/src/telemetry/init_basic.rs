use nanograph_core::TelemetryConfig;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter`. Returns an error when a
/// global subscriber is already installed.
pub fn init_telemetry(
    config: &TelemetryConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = select_filter(rust_log.as_deref(), config)?;
    let installed = filter.to_string();

    tracing_subscriber::registry()
        .with(filter)
        .with(config.json.then(|| fmt::layer().json()))
        .with((!config.json).then(fmt::layer))
        .try_init()?;

    tracing::info!(filter = %installed, json = config.json, "Tracing initialized");
    Ok(())
}

/// Valid `RUST_LOG` directives win; otherwise the configured filter is used.
fn select_filter(
    rust_log: Option<&str>,
    config: &TelemetryConfig,
) -> Result<EnvFilter, ParseError> {
    match rust_log.and_then(|directives| EnvFilter::try_new(directives).ok()) {
        Some(filter) => Ok(filter),
        None => EnvFilter::try_new(&config.filter),
    }
}

pub async fn shutdown_telemetry() {
    tracing::debug!("Telemetry shutdown");
}
