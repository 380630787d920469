use crate::state::AppState;
use axum::Router;
use std::sync::Arc;

mod repair_requests;
mod settings;

pub(crate) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/settings", settings::router())
        .nest("/repair-requests", repair_requests::router())
}
