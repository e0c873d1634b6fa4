use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use params::{Configuration, ImageFormat};
use render::{EncodeError, PixelBuffer};
use tracing::{error, info};

use crate::AppState;

/// Synthesize on the blocking pool with a per-call RNG.
async fn synthesize(config: Configuration) -> Option<PixelBuffer> {
    let res = tokio::task::spawn_blocking(move || {
        render::synthesize(&config, &mut rand::thread_rng())
    })
    .await;

    match res {
        Ok(buffer) => Some(buffer),
        Err(e) => {
            error!(error = %e, "pixel synthesis task failed");
            None
        }
    }
}

pub(crate) async fn image_endpoint(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<HashMap<String, String>>,
) -> Response {
    let config = params::normalize(&raw, &state.profile);
    let quality = state.quality;

    let body = match synthesize(config).await {
        Some(buffer) => tokio::task::spawn_blocking(move || {
            render::encode_or_empty(&buffer, config.format, &quality)
        })
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "image encoding task failed");
            Vec::new()
        }),
        None => Vec::new(),
    };

    image_response(config.format, body)
}

/// An empty body means encoding failed; the content type is announced anyway.
fn image_response(format: ImageFormat, body: Vec<u8>) -> Response {
    let status = if body.is_empty() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    (status, [(header::CONTENT_TYPE, format.mime_type())], body).into_response()
}

pub(crate) async fn data_uri_endpoint(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<HashMap<String, String>>,
) -> Response {
    let config = params::normalize(&raw, &state.profile);
    let quality = state.quality;

    let Some(buffer) = synthesize(config).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let res = tokio::task::spawn_blocking(move || {
        render::data_uri(&buffer, config.format, &quality)
    })
    .await;

    match res {
        Ok(encoded) => data_uri_response(config.format, encoded),
        Err(e) => {
            error!(error = %e, "data URI encoding task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn data_uri_response(format: ImageFormat, encoded: Result<String, EncodeError>) -> Response {
    match encoded {
        Ok(uri) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            uri,
        )
            .into_response(),
        Err(e) => {
            error!(%format, error = %e, "data URI encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(crate) async fn health_endpoint() -> &'static str {
    "ok"
}

pub(crate) async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    info!(
        "{} {} {} - {:.1}ms",
        method,
        uri,
        response.status().as_u16(),
        elapsed.as_secs_f64() * 1000.0
    );

    response
}
