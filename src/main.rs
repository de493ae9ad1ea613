use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use clap::Parser;
use std::env;
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::config::{load_config, Config, DEV_SECRET_KEY};

// --- Modules ---
pub mod config;
pub mod error;
pub mod formats;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod ytdlp;

/// Content-Security-Policy allow-list: self plus the analytics, font and
/// thumbnail origins the pages actually reference.
const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    script-src 'self' https://www.googletagmanager.com 'unsafe-inline'; \
    style-src 'self' 'unsafe-inline' https://fonts.googleapis.com https://cdnjs.cloudflare.com; \
    font-src 'self' https://fonts.gstatic.com https://cdnjs.cloudflare.com; \
    img-src 'self' data: https://i.ytimg.com; \
    object-src 'none'; frame-ancestors 'none'; base-uri 'self';";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

// --- Command-Line Argument Parsing ---
#[derive(Parser, Debug)]
#[command(author, version, about = "A web front-end for downloading videos via yt-dlp.", long_about = None)]
struct Cli {
    /// Address to bind (overrides the HOST environment variable).
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (overrides the PORT environment variable).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    let config = load_config().await?;

    if config.proxy_url.is_some() {
        tracing::info!("Proxy is configured. All engine requests will be routed through it.");
    } else {
        tracing::info!("No proxy server is configured. Using direct connection.");
    }
    if config.secret_key == DEV_SECRET_KEY {
        tracing::warn!("SECRET_KEY is the development default; set it for deployments.");
    }

    // The process keeps serving pages even if this fails; downloads will
    // surface their own errors until the operator fixes the filesystem.
    if let Err(e) = tokio::fs::create_dir_all(config.download_dir()).await {
        tracing::error!("FATAL: Could not create download folder. Error: {}", e);
    }

    let state = AppState { config: Arc::new(config) };

    let host = cli
        .host
        .or_else(|| env::var("HOST").ok())
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = cli
        .port
        .or_else(|| env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(8080);
    let addr = format!("{}:{}", host, port);

    let app = Router::new()
        .route("/", get(handlers::index).post(handlers::fetch_info))
        .route("/download", post(handlers::download))
        .route("/terms", get(handlers::terms))
        .route("/privacy", get(handlers::privacy))
        .route("/about", get(handlers::about))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .with_state(state);

    tracing::info!("Starting server, listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
