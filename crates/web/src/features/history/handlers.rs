use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use storage::{
    Database,
    dto::snapshot::{HistoryEntry, SnapshotResponse},
    models::Population,
};

use crate::error::WebError;

use super::services;

#[utoipa::path(
    get,
    path = "/api/history/{population}",
    params(
        ("population" = Population, Path, description = "men or women")
    ),
    responses(
        (status = 200, description = "Top 5 of every weekly snapshot, newest first", body = Vec<HistoryEntry>),
        (status = 400, description = "Unknown population")
    ),
    tag = "history"
)]
pub async fn get_history(
    State(db): State<Database>,
    Path(population): Path<Population>,
) -> Result<Response, WebError> {
    let history = services::history(db.pool(), population).await?;

    Ok(Json(history).into_response())
}

#[utoipa::path(
    get,
    path = "/api/snapshots/{population}/{date}",
    params(
        ("population" = Population, Path, description = "men or women"),
        ("date" = String, Path, description = "Snapshot date (a Sunday), YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Stored top 100 for that date", body = SnapshotResponse),
        (status = 404, description = "No snapshot for that date")
    ),
    tag = "history"
)]
pub async fn get_snapshot(
    State(db): State<Database>,
    Path((population, date)): Path<(Population, NaiveDate)>,
) -> Result<Response, WebError> {
    let snapshot = services::snapshot(db.pool(), population, date).await?;

    Ok(Json(snapshot).into_response())
}
