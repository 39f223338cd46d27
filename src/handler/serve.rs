use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::chat::{ChatClient, Credentials, RotatingCredentials};
use crate::document::process_document_blocking;
use crate::error::AppError;
use crate::flashcard::Flashcard;
use crate::pipeline::{ChunkFailure, Pipeline};
use crate::store::SetStore;
use crate::Config;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub store: Arc<SetStore>,
    pub credentials: Arc<RotatingCredentials>,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let credentials = Arc::new(RotatingCredentials::new(config.api_key_env.clone()));
        if credentials.api_key().is_none() {
            warn!("{} is not set; completion requests will fail until a key is provided", credentials.var());
        }
        let client = ChatClient::new(
            &config.chat_url,
            credentials.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let store = SetStore::open(&config.sets_dir)
            .with_context(|| format!("Cannot open set directory {}", config.sets_dir.display()))?;

        Ok(Self {
            pipeline: Pipeline::from_config(Arc::new(client), config),
            store: Arc::new(store),
            credentials,
        })
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/api/upload", post(upload))
        .route("/api/flashcards", post(flashcards_from_text))
        .route("/api/sets", get(list_sets))
        .route("/api/sets/{name}", get(get_set))
        .route("/api/summarize", post(summarize))
        .route("/api/ask", post(ask))
        .route("/api/key", post(update_key))
        .route("/api/key/status", get(key_status))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: &str, max_upload_bytes: usize) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {}", addr))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state, max_upload_bytes))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

#[derive(Serialize, Debug)]
pub struct GenerateResponse {
    success: bool,
    name: String,
    flashcards: Vec<Flashcard>,
    chunk_count: usize,
    failed_chunks: Vec<ChunkFailure>,
}

#[derive(Deserialize)]
pub struct TextRequest {
    text: String,
    name: Option<String>,
}

#[derive(Deserialize)]
pub struct KeyRequest {
    api_key: String,
}

#[derive(Deserialize)]
pub struct AskRequest {
    question: String,
    context: Option<String>,
}

async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<GenerateResponse>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut set_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("set_name") | Some("name") => {
                set_name = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| AppError::Input("No file provided".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::Input(format!("Uploaded file {} is empty", filename)));
    }
    info!("upload {} ({} bytes)", filename, bytes.len());

    let name = set_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| default_set_name(Some(&filename)));
    let text = process_document_blocking(filename, bytes).await?;
    generate_and_save(&state, &name, &text).await.map(Json)
}

async fn flashcards_from_text(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Input("No text provided".to_string()));
    }
    let name = request
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| default_set_name(None));
    generate_and_save(&state, &name, &request.text).await.map(Json)
}

async fn generate_and_save(state: &AppState, name: &str, text: &str) -> Result<GenerateResponse, AppError> {
    let generation = state.pipeline.generate_flashcards(text).await?;
    if generation.all_failed() {
        let first = generation.failures.first().map(|f| f.error.as_str()).unwrap_or_default();
        return Err(AppError::Upstream(format!(
            "All {} chunks failed, first error: {}",
            generation.chunk_count, first
        )));
    }

    let name = state.store.save(name, &generation.flashcards).await?;
    Ok(GenerateResponse {
        success: true,
        name,
        flashcards: generation.flashcards,
        chunk_count: generation.chunk_count,
        failed_chunks: generation.failures,
    })
}

async fn list_sets(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let sets = state.store.list().await?;
    Ok(Json(json!({ "sets": sets })))
}

async fn get_set(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Value>, AppError> {
    let flashcards = state.store.load(&name).await?;
    Ok(Json(json!({ "name": crate::store::sanitize_name(&name), "flashcards": flashcards })))
}

async fn summarize(State(state): State<AppState>, Json(request): Json<TextRequest>) -> Result<Json<Value>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Input("No text provided".to_string()));
    }
    let summary = state.pipeline.summarize(&request.text).await?;
    Ok(Json(json!({ "success": true, "summary": summary })))
}

async fn ask(State(state): State<AppState>, Json(request): Json<AskRequest>) -> Result<Json<Value>, AppError> {
    if request.question.trim().is_empty() {
        return Err(AppError::Input("No question provided".to_string()));
    }
    let answer = state.pipeline.answer(&request.question, request.context.as_deref()).await?;
    Ok(Json(json!({ "success": true, "answer": answer })))
}

async fn key_status(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.pipeline.verify_credentials().await?;
    Ok(Json(json!({ "valid": true })))
}

/// Check a new API key with a live request and use it from then on if it works.
async fn update_key(State(state): State<AppState>, Json(request): Json<KeyRequest>) -> Result<Json<Value>, AppError> {
    let key = request.api_key.trim();
    if key.is_empty() {
        return Err(AppError::Input("No API key provided".to_string()));
    }
    state.pipeline.verify_key(key).await?;
    state.credentials.rotate(key);
    info!("API key updated");
    Ok(Json(json!({ "success": true, "valid": true })))
}

fn multipart_error(err: MultipartError) -> AppError {
    let message = format!("Invalid upload: {}", err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::TooLarge(message)
    } else {
        AppError::Input(message)
    }
}

/// Set name from the uploaded file's stem, or a timestamped fallback.
pub fn default_set_name(filename: Option<&str>) -> String {
    filename
        .and_then(|f| std::path::Path::new(f).file_stem())
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("flashcards-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S")))
}
