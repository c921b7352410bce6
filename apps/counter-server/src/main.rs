//! counter-server: web front end for the persistent counter.
//!
//! Serves the server-rendered counter pages and a small JSON API:
//! - `/` index page linking to `/counter`.
//! - `/counter` shows the configured counter with `-`, `Reset` and `+` buttons.
//! - `/api/counters/:name` and `/api/counters/:name/:action` for any named counter.
//! - Storage: SQLite file (default, `sqlite` feature) or in-memory.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p counter-server
//!
//! # throwaway in-memory counters with JSON logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p counter-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod action;
mod api;
mod config;
mod pages;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use domain::adapters::memory_repo::InMemoryDb;
use domain::store::CounterStore;
use domain::{CounterDatabase, CounterName, SystemClock};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Shared per-process state: one database handle for the whole process.
struct AppState<D> {
    db: Arc<D>,
    store: CounterStore<SystemClock>,
    page_counter: CounterName,
}

impl<D> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            store: self.store.clone(),
            page_counter: self.page_counter.clone(),
        }
    }
}

impl<D: CounterDatabase> AppState<D> {
    fn new(db: D, page_counter: CounterName) -> Self {
        Self {
            db: Arc::new(db),
            store: CounterStore::new(SystemClock),
            page_counter,
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_ephemeral();

    let app = match build_app_from_config(&cfg) {
        Ok(app) => app,
        Err(e) => {
            error!(err = %e, db_path = %cfg.db_path.display(), "failed to open counter database");
            std::process::exit(1);
        }
    };

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let app = app
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(cors_layer(&cfg));

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, counter = %cfg.counter_name, "counter-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// CORS - origin already validated in Config::from_env()
fn cors_layer(cfg: &config::Config) -> CorsLayer {
    if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    }
}

// Construct the database named by config and wire it into the router.
fn build_app_from_config(cfg: &config::Config) -> Result<Router, domain::CoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => {
            let db = sqlite_adapter::SqliteDb::open_file(&cfg.db_path)?;
            info!(db_path = %cfg.db_path.display(), "using sqlite storage");
            Ok(router(AppState::new(db, cfg.counter_name.clone())))
        }
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => {
            tracing::warn!("built without the `sqlite` feature; falling back to in-memory storage");
            Ok(router(AppState::new(InMemoryDb::new(), cfg.counter_name.clone())))
        }
        config::StorageProvider::Memory => {
            Ok(router(AppState::new(InMemoryDb::new(), cfg.counter_name.clone())))
        }
    }
}

fn router<D: CounterDatabase + 'static>(state: AppState<D>) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/counter", get(pages::counter_page::<D>))
        .route("/counter/:action", post(pages::counter_action::<D>))
        .route("/api/counters/:name", get(api::get_counter::<D>))
        .route("/api/counters/:name/:action", post(api::apply_action::<D>))
        .route("/healthz", get(api::healthz))
        .with_state(state)
}
