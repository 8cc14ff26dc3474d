use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use solterra_server::{
    cli::{Cli, Commands},
    config::{ServerConfig, SupabaseConfig},
    handlers,
    state::AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solterra_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::CheckConfig) => {
            return match ServerConfig::from_env() {
                Ok(config) => {
                    println!("Configuration OK");
                    println!("  Backend URL: {}", config.supabase.url);
                    println!("  Backend configured: {}", SupabaseConfig::is_configured());
                    println!("  Bind address: {}", config.bind_address());
                    println!("  Admin user: {}", config.admin_username);
                    println!("  CORS origins: {:?}", config.cors_origins);
                    println!("  Max upload size: {} bytes", config.max_upload_body_bytes);
                    println!("  Static dir: {:?}", config.static_dir);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Configuration error: {e}");
                    std::process::exit(1);
                }
            };
        }
        Some(Commands::Serve) | None => {
            // Continue to run server
        }
    }

    // Server mode
    let config = ServerConfig::from_env()?;
    info!("🚀 Starting Solterra Server v{}", VERSION);
    info!("   Port: {}", config.port);
    info!("   Bind address: {}", config.bind_addr);
    info!("   Backend URL: {}", config.supabase.url);
    info!("   CORS origins: {:?}", config.cors_origins);
    info!("   Max upload size: {} bytes", config.max_upload_body_bytes);
    info!("   Static dir: {:?}", config.static_dir);

    let state = Arc::new(AppState::new(config)?);

    // Spawn background task to drop aged-out login failures
    {
        let limiter = state.login_limiter.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(120));
            loop {
                interval.tick().await;
                let cleaned = limiter.prune_stale();
                if cleaned > 0 {
                    info!("Cleaned up {} rate limiter entries", cleaned);
                }
            }
        });
    }

    // CORS configuration - configurable via CORS_ORIGINS env var
    let cors = if state.config.cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .allow_credentials(true)
    };

    // Serve the built frontend alongside the API when a static dir is set,
    // falling back to index.html for client-side routes
    let app = handlers::with_spa_fallback(
        handlers::router(state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(cors),
        state.config.static_dir.as_deref(),
    );

    let addr: SocketAddr = state.config.bind_address().parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🎧 Listening on http://{}", addr);
    info!("   Health endpoint: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
