use axum::{Router, routing::get};

use super::handlers::{get_history, get_snapshot};
use crate::state::AppState;

pub fn history_routes() -> Router<AppState> {
    Router::new().route("/:population", get(get_history))
}

pub fn snapshot_routes() -> Router<AppState> {
    Router::new().route("/:population/:date", get(get_snapshot))
}
