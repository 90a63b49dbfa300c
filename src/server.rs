use crate::config::{AnalysisConfig, Config};
use crate::error::AnalysisError;
use crate::pipeline::{analyze_image, AnalysisResult};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub analysis: AnalysisConfig,
    pub upload_dir: PathBuf,
}

/// Build the application router: the upload page, its static assets, a
/// health probe, and the analysis endpoint.
pub fn build_router(config: &Config) -> Router {
    let state = AppState {
        analysis: config.analysis.clone(),
        upload_dir: PathBuf::from(&config.upload_dir),
    };

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .nest_service("/static", ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn health_handler() -> &'static str {
    "OK"
}

/// `POST /analyze` — one multipart field named `file` carrying the image.
async fn analyze_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, AnalysisError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AnalysisError::Multipart(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("").to_string();
        if filename.is_empty() {
            return Err(AnalysisError::EmptyFilename);
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AnalysisError::Multipart(e.to_string()))?;
        upload = Some((filename, data.to_vec()));
        break;
    }

    let Some((filename, data)) = upload else {
        return Err(AnalysisError::MissingFile);
    };

    tracing::info!("analyzing upload '{}' ({} bytes)", filename, data.len());
    persist_upload(&state.upload_dir, &filename, &data).await;

    // The pipeline is pure CPU work; keep it off the runtime workers
    let cfg = state.analysis.clone();
    let result = tokio::task::spawn_blocking(move || analyze_image(&data, &cfg))
        .await
        .map_err(|e| AnalysisError::Internal(format!("analysis task failed: {}", e)))??;

    tracing::info!(
        "analysis done: seagrass {:.2}%, white {:.2}%, carbon {:.2} g",
        result.seagrass_pct,
        result.white_pct,
        result.blue_carbon_g
    );
    Ok(Json(result))
}

/// Keep a copy of the upload on disk under a sanitized, uniquified name.
/// The response never depends on the stored copy, so failures only warn.
async fn persist_upload(dir: &PathBuf, filename: &str, data: &[u8]) {
    let name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(filename));
    let path = dir.join(name);
    if let Err(e) = tokio::fs::write(&path, data).await {
        tracing::warn!("failed to persist upload to {:?}: {}", path, e);
    }
}

/// Strip anything that could escape the upload directory or confuse a
/// filesystem: path separators go away, odd characters become underscores.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim_matches('.');
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
