//! JSON HTTP surface over libraries, documents, and search.
//!
//! Routes map 1:1 onto the registry and library operations; this module's
//! only job is request/response shaping, status codes, and CORS. All
//! meaningful work happens in `vectorshelf-core`.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use vectorshelf_core::{
    CoreError, Document, DocumentProcessor, IndexParams, IndexType, LibraryRegistry, Metadata,
};

use crate::config::Config;
use crate::documents::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<LibraryRegistry>,
    pub documents: Arc<DocumentStore>,
    pub processor: Arc<DocumentProcessor>,
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let cors = if config.cors.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors
            .allowed_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/libraries", post(create_library).get(list_libraries))
        .route(
            "/libraries/{id}",
            get(get_library).patch(update_library).delete(delete_library),
        )
        .route(
            "/libraries/{id}/documents",
            post(create_document).get(list_documents),
        )
        .route(
            "/libraries/{id}/documents/{document_id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/libraries/{id}/search", post(search_library))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { .. } => not_found(err.to_string()),
            CoreError::AlreadyExists { .. } => AppError {
                status: StatusCode::CONFLICT,
                code: "already_exists",
                message: err.to_string(),
            },
            CoreError::DimensionMismatch { .. } | CoreError::DegenerateVector => AppError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "invalid_vector",
                message: err.to_string(),
            },
            CoreError::InvalidParameter(_) => bad_request(err.to_string()),
            CoreError::EmbeddingProviderError(_) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "embedding_provider_error",
                message: err.to_string(),
            },
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Libraries ============

#[derive(Deserialize)]
struct CreateLibraryRequest {
    name: String,
    #[serde(default = "default_index_type")]
    index_type: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_username")]
    username: String,
}

fn default_index_type() -> String {
    "naive".to_string()
}

fn default_username() -> String {
    "anonymous".to_string()
}

#[derive(Serialize)]
struct LibraryResponse {
    id: Uuid,
    name: String,
    index_type: String,
    chunk_count: usize,
    username: String,
    tags: Vec<String>,
}

async fn create_library(
    State(state): State<AppState>,
    Json(req): Json<CreateLibraryRequest>,
) -> Result<Json<LibraryResponse>, AppError> {
    let index_type = IndexType::from_str(&req.index_type)
        .map_err(|e| AppError::from(CoreError::InvalidParameter(e)))?;
    let params = IndexParams::defaults(index_type);
    let metadata = Metadata::new(req.username, req.tags);
    let library = state.registry.create(req.name, params, metadata);
    let snapshot = library.snapshot().await;
    Ok(Json(LibraryResponse {
        id: snapshot.id,
        name: snapshot.name,
        index_type: snapshot.index_type.as_str().to_string(),
        chunk_count: snapshot.chunk_count,
        username: snapshot.metadata.username,
        tags: snapshot.metadata.tags,
    }))
}

async fn list_libraries(State(state): State<AppState>) -> Json<Vec<LibraryResponse>> {
    let snapshots = state.registry.list().await;
    Json(
        snapshots
            .into_iter()
            .map(|s| LibraryResponse {
                id: s.id,
                name: s.name,
                index_type: s.index_type.as_str().to_string(),
                chunk_count: s.chunk_count,
                username: s.metadata.username,
                tags: s.metadata.tags,
            })
            .collect(),
    )
}

async fn get_library(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LibraryResponse>, AppError> {
    let library = state.registry.get(id)?;
    let s = library.snapshot().await;
    Ok(Json(LibraryResponse {
        id: s.id,
        name: s.name,
        index_type: s.index_type.as_str().to_string(),
        chunk_count: s.chunk_count,
        username: s.metadata.username,
        tags: s.metadata.tags,
    }))
}

#[derive(Deserialize)]
struct UpdateLibraryRequest {
    tags: Option<Vec<String>>,
    username: Option<String>,
}

async fn update_library(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLibraryRequest>,
) -> Result<StatusCode, AppError> {
    state
        .registry
        .update_metadata(id, req.tags, req.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_library(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.registry.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Documents ============

#[derive(Deserialize)]
struct CreateDocumentRequest {
    text: String,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_username")]
    username: String,
}

fn default_chunk_size() -> usize {
    500
}

#[derive(Serialize)]
struct DocumentResponse {
    id: Uuid,
    library_id: Uuid,
    text: String,
    chunk_size: usize,
    chunk_ids: Vec<Uuid>,
}

async fn create_document(
    State(state): State<AppState>,
    Path(library_id): Path<Uuid>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let library = state.registry.get(library_id)?;
    let document_id = Uuid::new_v4();

    let chunk_ids = state
        .processor
        .process(&library, document_id, &req.text, req.chunk_size, &req.username)
        .await?;

    let document = Document {
        id: document_id,
        library_id,
        text: req.text.clone(),
        chunk_size: req.chunk_size,
        metadata: Metadata::new(req.username, vec![]),
    };
    state.documents.put(document);

    Ok(Json(DocumentResponse {
        id: document_id,
        library_id,
        text: req.text,
        chunk_size: req.chunk_size,
        chunk_ids,
    }))
}

async fn list_documents(
    State(state): State<AppState>,
    Path(library_id): Path<Uuid>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    state.registry.get(library_id)?;
    let documents = state.documents.list_for_library(library_id);
    Ok(Json(
        documents
            .into_iter()
            .map(|d| DocumentResponse {
                id: d.id,
                library_id: d.library_id,
                text: d.text,
                chunk_size: d.chunk_size,
                chunk_ids: Vec::new(),
            })
            .collect(),
    ))
}

async fn get_document(
    State(state): State<AppState>,
    Path((library_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state
        .documents
        .get(document_id)
        .filter(|d| d.library_id == library_id)
        .ok_or_else(|| not_found(format!("document {document_id} not found")))?;

    Ok(Json(DocumentResponse {
        id: document.id,
        library_id: document.library_id,
        text: document.text,
        chunk_size: document.chunk_size,
        chunk_ids: Vec::new(),
    }))
}

#[derive(Deserialize)]
struct UpdateDocumentRequest {
    text: String,
    #[serde(default = "default_username")]
    username: String,
}

async fn update_document(
    State(state): State<AppState>,
    Path((library_id, document_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let library = state.registry.get(library_id)?;
    let existing = state
        .documents
        .get(document_id)
        .filter(|d| d.library_id == library_id)
        .ok_or_else(|| not_found(format!("document {document_id} not found")))?;

    let chunk_ids = state
        .processor
        .process(
            &library,
            document_id,
            &req.text,
            existing.chunk_size,
            &req.username,
        )
        .await?;

    let document = Document {
        id: document_id,
        library_id,
        text: req.text.clone(),
        chunk_size: existing.chunk_size,
        metadata: existing.metadata,
    };
    state.documents.put(document);

    Ok(Json(DocumentResponse {
        id: document_id,
        library_id,
        text: req.text,
        chunk_size: existing.chunk_size,
        chunk_ids,
    }))
}

async fn delete_document(
    State(state): State<AppState>,
    Path((library_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let library = state.registry.get(library_id)?;
    library.remove_document(document_id).await?;
    state.documents.delete(document_id);
    Ok(StatusCode::NO_CONTENT)
}

// ============ Search ============

#[derive(Deserialize)]
struct SearchRequest {
    query_text: String,
    k: usize,
    #[serde(default)]
    min_similarity: f32,
}

#[derive(Serialize)]
struct SearchResultItem {
    chunk: ChunkResponse,
    similarity_score: f32,
}

#[derive(Serialize)]
struct ChunkResponse {
    id: Uuid,
    document_id: Uuid,
    text: String,
    metadata: MetadataResponse,
}

#[derive(Serialize)]
struct MetadataResponse {
    creation_time: chrono::DateTime<chrono::Utc>,
    last_update: chrono::DateTime<chrono::Utc>,
    username: String,
    tags: Vec<String>,
}

impl From<vectorshelf_core::Metadata> for MetadataResponse {
    fn from(m: vectorshelf_core::Metadata) -> Self {
        Self {
            creation_time: m.creation_time,
            last_update: m.last_update,
            username: m.username,
            tags: m.tags,
        }
    }
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResultItem>,
    total_chunks_searched: usize,
    query_time_ms: f64,
}

async fn search_library(
    State(state): State<AppState>,
    Path(library_id): Path<Uuid>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query_text.trim().is_empty() {
        return Err(bad_request("query_text must not be empty"));
    }
    let library = state.registry.get(library_id)?;

    let query_vector = state
        .processor
        .embed_query(&req.query_text)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    let outcome = library.search(&query_vector, req.k, req.min_similarity).await?;

    Ok(Json(SearchResponse {
        results: outcome
            .results
            .into_iter()
            .map(|(chunk, similarity)| SearchResultItem {
                chunk: ChunkResponse {
                    id: chunk.id,
                    document_id: chunk.document_id,
                    text: chunk.text,
                    metadata: chunk.metadata.into(),
                },
                similarity_score: similarity,
            })
            .collect(),
        total_chunks_searched: outcome.total_chunks_searched,
        query_time_ms: outcome.query_time_ms,
    }))
}
