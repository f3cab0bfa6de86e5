//! HTTP Handlers
//!
//! Thin adapters from HTTP requests to [`KvStore`] operations. All routing,
//! lifecycle and error decisions happen in the store; this layer only binds
//! JSON and maps outcomes to status codes:
//!
//! | Outcome                    | Status |
//! |----------------------------|--------|
//! | success                    | 200    |
//! | validation / bad JSON      | 400    |
//! | not found / nothing live   | 404    |
//! | encode/decode/storage      | 500    |

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{
    ErrorResponse, ItemResponse, ItemsResponse, MessageResponse, PutRequest, StatsResponse,
};
use crate::error::KvError;
use crate::store::KvStore;

/// GET /
pub async fn handle_index() -> Json<MessageResponse> {
    Json(MessageResponse::new(
        "Hello, Welcome to the ShardKV API Index Page",
    ))
}

/// GET /kv/all
pub async fn handle_get_all(Extension(store): Extension<Arc<KvStore>>) -> Response {
    info!("Fetching all entries from every shard");

    match store.scan_all().await {
        Ok(items) if items.is_empty() => {
            warn!("No live entries found");
            (
                StatusCode::NOT_FOUND,
                Json(ItemsResponse {
                    message: "No records found".to_string(),
                    items,
                }),
            )
                .into_response()
        }
        Ok(items) => (
            StatusCode::OK,
            Json(ItemsResponse {
                message: "Successfully fetched all records from all shards".to_string(),
                items,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /kv/:key
pub async fn handle_get(
    Extension(store): Extension<Arc<KvStore>>,
    Path(key): Path<String>,
) -> Response {
    match store.get(&key).await {
        Ok(item) => (StatusCode::OK, Json(ItemResponse { item })).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /kv
pub async fn handle_put(
    Extension(store): Extension<Arc<KvStore>>,
    payload: Result<Json<PutRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Payload validation failed");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!(
                    "Invalid json payload: {}",
                    rejection.body_text()
                ))),
            )
                .into_response();
        }
    };

    match store.put(&req.key, &req.value).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse::new("Operation successful")),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /kv/:key
pub async fn handle_delete(
    Extension(store): Extension<Arc<KvStore>>,
    Path(key): Path<String>,
) -> Response {
    match store.delete(&key).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse::new("Successfully deleted given key")),
        )
            .into_response(),
        Err(KvError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Given key does not exist")),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /stats
pub async fn handle_stats(Extension(store): Extension<Arc<KvStore>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        version: crate::VERSION,
        shards: store.tables().len(),
        ttl_secs: store.policy().ttl().num_seconds(),
        ops: store.stats(),
    })
}

/// Maps a store error to its HTTP response.
///
/// Internal failures were already logged with shard and key by the store, so
/// the client only gets a generic message.
fn error_response(err: &KvError) -> Response {
    let (status, message) = match err {
        KvError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        KvError::NotFound => (StatusCode::NOT_FOUND, "Key not found".to_string()),
        KvError::Encoding { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode value".to_string(),
        ),
        KvError::Decoding { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to decode value".to_string(),
        ),
        KvError::Storage { .. } | KvError::ScanFailed { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error".to_string(),
        ),
        KvError::Config(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server misconfigured".to_string(),
        ),
    };

    (status, Json(ErrorResponse::new(message))).into_response()
}
