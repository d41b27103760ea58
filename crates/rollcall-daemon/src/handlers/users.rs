use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rollcall_types::{MessageResponse, UserRecord, USER_DELETED};
use tracing::{error, info, warn};

use super::{ApiError, HandlerContext};

pub async fn handle_list_users(State(ctx): State<HandlerContext>) -> Json<Vec<UserRecord>> {
    Json(ctx.store.list())
}

pub async fn handle_get_user(
    State(ctx): State<HandlerContext>,
    Path(name): Path<String>,
) -> Result<Json<UserRecord>, ApiError> {
    Ok(Json(ctx.store.find_by_name(&name)?))
}

/// Stores the record, then mirrors it. A mirror failure is reported as a
/// server error but the stored record stays.
pub async fn handle_add_user(
    State(ctx): State<HandlerContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    let record = parse_record(&body)?;

    ctx.store.insert(record.clone());
    info!("Added user {}", record.name);

    if let Some(mirror) = &ctx.mirror {
        if let Err(e) = mirror.append(&record).await {
            error!("Failed to mirror user {} to sheets: {}", record.name, e);
            return Err(e.into());
        }
    }

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn handle_update_user(
    State(ctx): State<HandlerContext>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<UserRecord>, ApiError> {
    ctx.store.find_index_by_name(&name)?;
    let record = parse_record(&body)?;

    let updated = ctx.store.replace(&name, record)?;
    info!("Updated user {}", name);
    Ok(Json(updated))
}

pub async fn handle_delete_user(
    State(ctx): State<HandlerContext>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    ctx.store.remove(&name)?;
    info!("Deleted user {}", name);
    Ok(Json(MessageResponse::new(USER_DELETED)))
}

/// The body is decoded as JSON regardless of the request's Content-Type.
fn parse_record(body: &[u8]) -> Result<UserRecord, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected request body: {}", e);
        ApiError::InvalidInput(e.to_string())
    })
}
