//! Tracing subscriber setup for binaries.
//!
//! Logs go to stderr so that stdout stays reserved for JSON output. The
//! filter comes from `RUST_LOG` and defaults to `qeats_search=info,qeats_storage=info,warn`.

use qeats_core::{ConfigError, QeatsResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "qeats_search=info,qeats_storage=info,warn";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Read `QEATS_LOG_FORMAT` (`json` or `compact`).
    pub fn from_env() -> Self {
        match std::env::var("QEATS_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(format: LogFormat) -> QeatsResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
        }))
        .try_init()
        .map_err(|e| {
            ConfigError::InvalidValue {
                field: "tracing".to_string(),
                value: format!("{:?}", format),
                reason: e.to_string(),
            }
            .into()
        })
}
