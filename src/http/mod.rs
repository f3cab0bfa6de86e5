//! HTTP Boundary Module
//!
//! Exposes the store over a small JSON API built on axum.
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome message
//! - `GET /kv/all` - Every live entry (404 with an empty list if none)
//! - `GET /kv/{key}` - One live entry
//! - `POST /kv` - Write `{"key": ..., "value": {...}}`
//! - `DELETE /kv/{key}` - Soft-delete a live entry
//! - `GET /stats` - Operation counters
//!
//! ## Example
//!
//! ```ignore
//! use shardkv::http::router;
//! use std::sync::Arc;
//!
//! let app = router(Arc::clone(&store));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod handlers;
pub mod types;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::store::KvStore;
use handlers::{
    handle_delete, handle_get, handle_get_all, handle_index, handle_put, handle_stats,
};
use types::{ENDPOINT_ALL, ENDPOINT_INDEX, ENDPOINT_KEY, ENDPOINT_PUT, ENDPOINT_STATS};

/// Builds the HTTP router around a shared store.
pub fn router(store: Arc<KvStore>) -> Router {
    Router::new()
        .route(ENDPOINT_INDEX, get(handle_index))
        .route(ENDPOINT_ALL, get(handle_get_all))
        .route(ENDPOINT_KEY, get(handle_get).delete(handle_delete))
        .route(ENDPOINT_PUT, post(handle_put))
        .route(ENDPOINT_STATS, get(handle_stats))
        .layer(Extension(store))
}
