use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rollcall_sheets::{Mirror, SheetsError};
use rollcall_store::{RecordStore, StoreError};
use rollcall_types::{MessageResponse, INVALID_JSON, MIRROR_FAILED, USER_NOT_FOUND};
use thiserror::Error;
use tokio::sync::broadcast;

mod session;
mod users;

pub use session::{handle_describe_session, handle_shutdown};
pub use users::{handle_add_user, handle_delete_user, handle_get_user, handle_list_users, handle_update_user};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: Arc<dyn RecordStore>,
    pub mirror: Option<Arc<dyn Mirror>>,
    pub bind: String,
    pub shutdown_tx: broadcast::Sender<()>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Body rejected before the store was touched.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The record is already stored; only the sheet copy is missing.
    #[error("mirror failed: {0}")]
    MirrorFailure(#[from] SheetsError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Store(StoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, USER_NOT_FOUND),
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, INVALID_JSON),
            ApiError::MirrorFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, MIRROR_FAILED),
        };
        (status, Json(MessageResponse::new(message))).into_response()
    }
}
