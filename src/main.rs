//! Heavy Horizon - equipment rental and sales website

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heavy_horizon::{
    api::{self, AppState},
    backend::{create_backend, DEFAULT_ADMIN_EMAIL},
    config::{BackendDriver, Config},
    theme::ThemeEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heavy_horizon=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Heavy Horizon...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let backend = create_backend(&config.backend)?;
    match config.backend.driver {
        BackendDriver::Http => tracing::info!("Backend API: {}", config.backend.base_url),
        BackendDriver::Memory => tracing::warn!(
            "Using the in-memory backend with sample data; admin login is {}",
            DEFAULT_ADMIN_EMAIL
        ),
    }

    let theme_engine = ThemeEngine::new(&config.theme.path)?;
    match theme_engine.override_path() {
        Some(path) => tracing::info!("Template overrides: {:?}", path),
        None => tracing::info!("Using embedded templates"),
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, backend, theme_engine);
    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
