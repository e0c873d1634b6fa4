//! HTTP front end: query parameters in, encoded random image out.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use params::Profile;
use render::QualityPreset;
use settings::ServerSettings;
use tracing::info;

pub struct AppState {
    pub profile: Profile,
    pub quality: QualityPreset,
}

impl AppState {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            quality: QualityPreset::default(),
        }
    }

    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            profile: settings.profile.profile(),
            quality: QualityPreset {
                jpeg_quality: settings.quality.jpeg,
                png_compression: settings.quality.png,
                webp_quality: settings.quality.webp,
            },
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::image_endpoint))
        .route("/image", get(handlers::image_endpoint))
        .route("/image/data-uri", get(handlers::data_uri_endpoint))
        .route("/health", get(handlers::health_endpoint))
        .with_state(state)
        .layer(middleware::from_fn(handlers::logging_middleware))
}

/// Bind and serve until the process is stopped.
pub async fn serve(settings: &ServerSettings) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_settings(settings));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.bind_address, settings.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(profile = %settings.profile, "Starting server on http://{}", addr);
    info!("Image endpoint: http://{}/image?width=200&height=200&type=png", addr);
    info!("Data URI endpoint: http://{}/image/data-uri", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    Ok(())
}
