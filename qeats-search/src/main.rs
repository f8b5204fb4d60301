//! QEats discovery command-line entry point.
//!
//! ```text
//! qeats-discover <dataset.json> <lat> <lng> [HH:MM:SS] [query] [--concurrent]
//! ```
//!
//! Without a query, lists restaurants close by. With one, runs the
//! multi-criteria search. Prints the response as JSON on stdout.
//!
//! Environment:
//! - `QEATS_CONFIG`: path to a TOML configuration file
//! - `QEATS_CACHE_DIR`: use an LMDB cache in this directory instead of memory
//! - `QEATS_LOG_FORMAT`, `RUST_LOG`: logging
//! - `QEATS_*` overrides documented on `DiscoveryConfig::with_env_overrides`

use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveTime;
use qeats_core::{
    ConfigError, DiscoveryConfig, GetRestaurantsRequest, GetRestaurantsResponse, QeatsResult,
    ValidationError,
};
use qeats_search::{init_tracing, LogFormat, RestaurantService};
use qeats_storage::{CacheBackend, InMemoryCacheBackend, InMemoryStore, LmdbCacheBackend};

const LMDB_MAP_SIZE_MB: usize = 256;

struct Invocation {
    dataset: String,
    request: GetRestaurantsRequest,
    time: NaiveTime,
    concurrent: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing(LogFormat::from_env()) {
        eprintln!("{}", e);
    }

    let response = match run().await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "discovery failed");
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&response) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> QeatsResult<GetRestaurantsResponse> {
    let invocation = parse_args(std::env::args().skip(1).collect())?;
    let config = load_config()?;
    let store = Arc::new(InMemoryStore::load_json(&invocation.dataset)?);

    match std::env::var("QEATS_CACHE_DIR") {
        Ok(dir) => {
            tracing::info!(dir = %dir, "using LMDB cache");
            let backend = Arc::new(LmdbCacheBackend::new(&dir, LMDB_MAP_SIZE_MB)?);
            execute(store, backend, &config, &invocation).await
        }
        Err(_) => {
            let backend = Arc::new(InMemoryCacheBackend::new());
            execute(store, backend, &config, &invocation).await
        }
    }
}

async fn execute<C: CacheBackend>(
    store: Arc<InMemoryStore>,
    backend: Arc<C>,
    config: &DiscoveryConfig,
    invocation: &Invocation,
) -> QeatsResult<GetRestaurantsResponse> {
    let service = RestaurantService::new(store, backend, config)?;
    let request = &invocation.request;
    let time = invocation.time;

    if request.search_for.is_none() {
        service.find_restaurants_close_by(request, time).await
    } else if invocation.concurrent {
        service
            .find_restaurants_by_search_query_mt(request, time)
            .await
    } else {
        service.find_restaurants_by_search_query(request, time).await
    }
}

fn load_config() -> QeatsResult<DiscoveryConfig> {
    let config = match std::env::var("QEATS_CONFIG") {
        Ok(path) => {
            let source = std::fs::read_to_string(&path).map_err(|e| ConfigError::Parse {
                reason: format!("{}: {}", path, e),
            })?;
            DiscoveryConfig::from_toml_str(&source)?
        }
        Err(_) => DiscoveryConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn parse_args(args: Vec<String>) -> QeatsResult<Invocation> {
    let concurrent = args.iter().any(|a| a == "--concurrent");
    let mut positional = args.into_iter().filter(|a| !a.starts_with("--"));

    let dataset = positional.next().ok_or_else(|| missing("dataset"))?;
    let latitude = parse_number("latitude", positional.next())?;
    let longitude = parse_number("longitude", positional.next())?;
    let time = match positional.next() {
        Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M:%S").map_err(|e| {
            ValidationError::InvalidValue {
                field: "time".to_string(),
                reason: format!("{}: {}", raw, e),
            }
        })?,
        None => chrono::Local::now().time(),
    };

    let mut request = GetRestaurantsRequest::new(latitude, longitude);
    if let Some(query) = positional.next() {
        request = request.with_search_for(query);
    }

    Ok(Invocation {
        dataset,
        request,
        time,
        concurrent,
    })
}

fn parse_number(field: &str, raw: Option<String>) -> QeatsResult<f64> {
    let raw = raw.ok_or_else(|| missing(field))?;
    raw.parse().map_err(|_| {
        ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} is not a number", raw),
        }
        .into()
    })
}

fn missing(field: &str) -> ValidationError {
    ValidationError::RequiredFieldMissing {
        field: field.to_string(),
    }
}
