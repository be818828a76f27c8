use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use storage::{Database, dto::competitor::CompetitorDetailResponse};

use crate::error::WebError;

use super::services;

#[utoipa::path(
    get,
    path = "/api/competitors/{id}",
    params(
        ("id" = i64, Path, description = "Competitor id")
    ),
    responses(
        (status = 200, description = "Competitor with rating history", body = CompetitorDetailResponse),
        (status = 404, description = "Competitor not found")
    ),
    tag = "competitors"
)]
pub async fn get_competitor(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let detail = services::competitor_detail(db.pool(), id).await?;

    Ok(Json(detail).into_response())
}
