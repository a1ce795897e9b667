//! rpc-mux demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net::Listener ──▶ http::HttpServer ──▶ routing::Mux
//!                                                              │
//!                          ┌───────────────────────────────────┤
//!                          ▼                                   ▼
//!                 middleware::ServeDir           mount_path (StripPrefix)
//!                 (GET, public/)                   ├─ AuthContext (x-user)
//!                                                  ├─ RemoteFunctions (POST)
//!                                                  └─ GET /functions
//! ```
//!
//! Usage: `rpc-mux [config.toml]`. Without a path the defaults apply.

use std::path::PathBuf;

use axum::http::StatusCode;
use tower::BoxError;

use rpc_mux::config::{load_config, ServerConfig};
use rpc_mux::http::{Request, Response};
use rpc_mux::lifecycle::{spawn_signal_handler, Shutdown};
use rpc_mux::middleware::{AuthContext, ServeDir};
use rpc_mux::net::Listener;
use rpc_mux::observability::{logging, metrics};
use rpc_mux::routing::{handler_fn, Mux};
use rpc_mux::rpc::{Call, RemoteFunctionTable, RemoteFunctions};
use rpc_mux::wire::value::format_number;
use rpc_mux::wire::Value;
use rpc_mux::HttpServer;

/// Caller identity taken from the `x-user` header.
#[derive(Debug, Clone)]
struct User(String);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => load_config(&path)?,
        None => ServerConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!("rpc-mux v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        mount_path = %config.rpc.mount_path,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mux = build_mux(&config)?;
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    spawn_signal_handler(shutdown.clone());

    HttpServer::new(config, mux).run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_mux(config: &ServerConfig) -> Result<Mux, Box<dyn std::error::Error>> {
    let mount_path = config.rpc.mount_path.as_str();
    let functions = RemoteFunctions::new(demo_functions());
    let names: Vec<String> = functions.table().names().into_iter().map(str::to_string).collect();

    let api = Mux::new()
        .handle(
            mount_path,
            AuthContext::new(|req: &Request| req.header("x-user").map(|name| User(name.to_string()))),
        )
        .handle(mount_path, functions)
        .handle_func(
            "GET /functions",
            handler_fn(move |_: &mut Request, res: &mut Response| {
                let body = serde_json::to_vec(&names).unwrap_or_default();
                res.status(StatusCode::OK).set_header("content-type", "application/json");
                let _ = res.end(body);
            }),
        )?;

    let mut mux = Mux::new();
    if config.static_files.enabled {
        tracing::info!(root = %config.static_files.root, "Serving static files");
        mux = mux.handle("/", ServeDir::new(&config.static_files.root));
    }
    Ok(mux.handle(mount_path, api.strip_prefix(mount_path)))
}

fn demo_functions() -> RemoteFunctionTable {
    RemoteFunctionTable::new()
        .register_fn("greetings", |call: Call| async move {
            let body = call.arg(0);
            tracing::info!(user = ?call.extension::<User>(), body = ?body, file = ?call.arg(1), "greetings");
            let age = body.get("age").map(display).unwrap_or_default();
            let name = body.get("name").map(display).unwrap_or_default();
            Ok::<_, BoxError>(Value::object([
                ("message", Value::from(format!("Hello from server \"{age} {name}\""))),
                ("date", Value::now()),
            ]))
        })
        .register_fn("console_log", |call: Call| async move {
            tracing::info!(body = ?call.arg(0), "console_log");
            Ok::<_, BoxError>(Value::Null)
        })
        .register_fn("add_numbers", |call: Call| async move {
            let a = call.arg(0).as_f64().ok_or("first argument must be a number")?;
            let b = call.arg(1).as_f64().ok_or("second argument must be a number")?;
            Ok::<_, BoxError>(Value::from(a + b))
        })
        .register_fn("upload_file", |call: Call| async move {
            let blob = call.arg(0).as_blob().ok_or("expected a file")?;
            tracing::info!(
                user = ?call.extension::<User>(),
                filename = %blob.filename,
                size = blob.data.len(),
                "Uploaded file"
            );
            Ok::<_, BoxError>(Value::from("Upload Sucessful!"))
        })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => "undefined".to_string(),
    }
}
