//! chain-api demo server.
//!
//! Serves a handful of routes built from handler chains:
//!
//! ```text
//! GET    /ping                  → {"ok":true}
//! GET    /items?page=N          → paginated listing with X-Pagination-Next
//! GET    /items/:id             → item or 404
//! POST   /items                 → validated create (422 on bad input)
//! GET    /admin/stats           → 401 without a bearer token
//! OPTIONS /items, /items/:id    → CORS preflight
//! ```

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use chain_api::config::{load_config, ServerConfig};
use chain_api::http::error::{codes, StatusError, ValidationError};
use chain_api::http::middleware::{allow_all_cors, cors_preflight, log_requests};
use chain_api::http::values::Key;
use chain_api::http::{handler, HttpServer, Pagination};
use chain_api::lifecycle::{shutdown_signal, Shutdown};
use chain_api::observability::{logging, metrics};
use chain_api::{HandlerError, Router, RouterError};

const ADMIN_TOKEN: Key<String> = Key::new("admin_token");
const PAGE_SIZE: i64 = 10;

#[derive(Parser, Debug)]
#[command(name = "chain-api", version, about = "Handler-chain HTTP dispatch demo server")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Serialize)]
struct Item {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct NewItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    quantity: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_filter)?;
    tracing::info!("chain-api v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        date_format = %config.params.date_format,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = build_router(&config)?;
    for (method, path, handlers) in router.routes() {
        tracing::debug!(method = %method, path = %path, handlers, "Serving route");
    }

    let server = HttpServer::new(config, router);
    let listener = server.bind().await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown_signal(shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(config: &ServerConfig) -> Result<Router, RouterError> {
    let root = Router::new(config);
    root.use_middleware(log_requests());
    root.use_middleware(allow_all_cors());
    root.use_middleware(cors_preflight(
        [
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ],
        [axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION],
    ));

    root.get(
        "/ping",
        [handler(|ctx| {
            Box::pin(async move {
                ctx.set_result(serde_json::json!({ "ok": true }));
                Ok(())
            })
        })],
    )?;

    root.get(
        "/items",
        [handler(|ctx| {
            Box::pin(async move {
                let page = ctx.params().get_int64("page").max(1);
                let items: Vec<Item> = (0..PAGE_SIZE)
                    .map(|i| {
                        let id = (page - 1) * PAGE_SIZE + i + 1;
                        Item {
                            id,
                            name: format!("item-{id}"),
                        }
                    })
                    .collect();

                let next = format!("http://localhost/items?page={}", page + 1);
                let next = url::Url::parse(&next).map_err(HandlerError::other)?;
                ctx.set_pagination(Pagination::new(next));
                ctx.set_result(items);
                Ok(())
            })
        })],
    )?;

    root.get(
        "/items/:id",
        [handler(|ctx| {
            Box::pin(async move {
                let id = ctx.params().get_int64("id");
                if id <= 0 {
                    return Err(StatusError::NOT_FOUND.into());
                }
                ctx.set_result(Item {
                    id,
                    name: format!("item-{id}"),
                });
                Ok(())
            })
        })],
    )?;

    root.post(
        "/items",
        [handler(|ctx| {
            Box::pin(async move {
                let new_item: NewItem = ctx.parse_body().await?;

                let mut verr = ValidationError::new();
                if new_item.name.is_empty() {
                    verr.add_error("name", codes::REQUIRED);
                }
                if new_item.quantity < 1 {
                    verr.add_error_detailed(
                        "quantity",
                        codes::VALUE_TOO_LOW,
                        Some(serde_json::json!({ "min": 1 })),
                        "quantity must be at least 1",
                    );
                }
                verr.into_result()?;

                ctx.set_result(Item {
                    id: 1,
                    name: new_item.name,
                });
                Ok(())
            })
        })],
    )?;

    // Preflight is answered entirely by middleware
    root.options("/items", Vec::new())?;
    root.options("/items/:id", Vec::new())?;

    let admin = root.sub_router("/admin");
    admin.use_middleware(handler(|ctx| {
        Box::pin(async move {
            let token = ctx
                .request()
                .headers()
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(ToString::to_string);

            match token {
                Some(token) if !token.is_empty() => {
                    ctx.values_mut().set(ADMIN_TOKEN, token);
                    Ok(())
                }
                _ => Err(StatusError::UNAUTHORIZED.into()),
            }
        })
    }));
    admin.get(
        "/stats",
        [handler(|ctx| {
            Box::pin(async move {
                let token_len = ctx.values().get_string(ADMIN_TOKEN).len();
                let request_id = ctx.scope().request_id().to_string();
                ctx.set_result(serde_json::json!({
                    "request_id": request_id,
                    "token_length": token_len,
                }));
                Ok(())
            })
        })],
    )?;

    Ok(root)
}
