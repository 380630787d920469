use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use repairdesk_core::TicketMutation;
use std::sync::Arc;
use tracing::debug;

pub(crate) fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", post(receive_mutation))
}

/// 报修单写入成功后由业务侧调用；通知在后台发送，响应不等待结果
async fn receive_mutation(
    State(state): State<Arc<AppState>>,
    Json(mutation): Json<TicketMutation>,
) -> impl IntoResponse {
    debug!(
        ticket_id = mutation.after.id,
        created = mutation.before.is_none(),
        "ticket mutation received"
    );
    drop(state.notifier.submit(mutation));
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "accepted" })),
    )
}
