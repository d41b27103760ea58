use axum::extract::State;
use axum::Json;
use rollcall_types::{DescribeSessionResult, ShutdownResult};
use tracing::info;

use super::HandlerContext;

pub async fn handle_describe_session(
    State(ctx): State<HandlerContext>,
) -> Json<DescribeSessionResult> {
    Json(DescribeSessionResult {
        daemon_pid: std::process::id(),
        bind: ctx.bind.clone(),
        records: ctx.store.len(),
        mirror_enabled: ctx.mirror.is_some(),
    })
}

pub async fn handle_shutdown(State(ctx): State<HandlerContext>) -> Json<ShutdownResult> {
    info!("Shutdown requested");
    let _ = ctx.shutdown_tx.send(());
    Json(ShutdownResult {
        status: "shutting_down".to_string(),
    })
}
