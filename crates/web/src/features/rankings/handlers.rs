use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use chrono::Local;
use storage::{
    Database,
    dto::ranking::{RankingEntry, RankingQuery},
    models::Population,
};
use validator::Validate;

use crate::error::WebError;
use crate::state::UncertaintyGrowth;

use super::services;

#[utoipa::path(
    get,
    path = "/api/rankings/{population}",
    params(
        ("population" = Population, Path, description = "men or women"),
        RankingQuery
    ),
    responses(
        (status = 200, description = "Current leaderboard, strongest first", body = Vec<RankingEntry>),
        (status = 400, description = "Unknown population or invalid limit")
    ),
    tag = "rankings"
)]
pub async fn get_ranking(
    State(db): State<Database>,
    State(growth): State<UncertaintyGrowth>,
    Path(population): Path<Population>,
    Query(query): Query<RankingQuery>,
) -> Result<Response, WebError> {
    query.validate()?;

    let entries = services::live_ranking(
        db.pool(),
        population,
        Local::now().date_naive(),
        growth.get(population),
        query.limit,
    )
    .await?;

    Ok(Json(entries).into_response())
}
