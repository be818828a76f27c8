use std::time::Duration;

use anyhow::Context;
use axum::{Json, Router, routing::get};
use storage::Database;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

mod config;
mod error;
mod features;
mod state;

use config::Config;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::rankings::handlers::get_ranking,
        features::competitors::handlers::get_competitor,
        features::history::handlers::get_history,
        features::history::handlers::get_snapshot,
    ),
    components(
        schemas(
            storage::dto::ranking::RankingEntry,
            storage::dto::competitor::CompetitorProfile,
            storage::dto::competitor::CompetitorDetailResponse,
            storage::dto::competitor::RatingPoint,
            storage::dto::snapshot::SnapshotEntry,
            storage::dto::snapshot::SnapshotResponse,
            storage::dto::snapshot::HistoryEntry,
            storage::models::Population,
        )
    ),
    tags(
        (name = "rankings", description = "Live leaderboards"),
        (name = "competitors", description = "Competitor profiles and rating history"),
        (name = "history", description = "Weekly historical snapshots"),
    )
)]
struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .nest("/api/rankings", features::rankings::routes::routes())
        .nest("/api/competitors", features::competitors::routes::routes())
        .nest("/api/history", features::history::routes::history_routes())
        .nest("/api/snapshots", features::history::routes::snapshot_routes())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting rankings API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Connecting to database at: {}", config.database_url);
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "OpenAPI document available at http://{}/api-docs/openapi.json",
        bind_address
    );

    let state = AppState {
        db,
        growth: config.growth,
    };
    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chrono::{Local, NaiveDate};
    use serde_json::Value;
    use storage::models::{Competitor, HistoricalRank, Population, RatingSample};
    use storage::repository::competitor::CompetitorRepository;
    use storage::repository::rating::RatingRepository;
    use storage::repository::snapshot::SnapshotRepository;
    use storage::services::ranking::day_index;
    use tower::ServiceExt;

    use crate::state::UncertaintyGrowth;

    fn competitor(competitor_id: i64, name: &str, gender: &str) -> Competitor {
        Competitor {
            competitor_id,
            name: name.to_string(),
            gender: gender.to_string(),
            birth_year: Some(2000),
            association: "Sweden".to_string(),
            association_code: "SWE".to_string(),
        }
    }

    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    async fn seeded_app() -> Router {
        let db = Database::in_memory().await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        CompetitorRepository::new(db.pool())
            .insert_all(
                &[
                    competitor(1, "MOREGARD Truls", "M"),
                    competitor(2, "KARLSSON Kristian", "M"),
                    competitor(3, "KALLBERG Christina", "W"),
                ],
                &mut tx,
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let today = day_index(Local::now().date_naive());
        RatingRepository::new(db.pool())
            .replace(
                Population::Men,
                &[
                    RatingSample { competitor_id: 1, day: today - 10, rating: 310.0, error: 70.0 },
                    RatingSample { competitor_id: 2, day: today - 3, rating: 355.5, error: 65.0 },
                ],
            )
            .await
            .unwrap();

        SnapshotRepository::new(db.pool())
            .append(
                Population::Men,
                sunday(),
                &[HistoricalRank {
                    eval_date: sunday(),
                    rank: 1,
                    competitor_id: 2,
                    rating: 350.0,
                    error: 66.0,
                }],
            )
            .await
            .unwrap();

        app(AppState {
            db,
            growth: UncertaintyGrowth::default(),
        })
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_ranking_is_ordered_and_limited() {
        let (status, body) = get(seeded_app().await, "/api/rankings/men").await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(body[0]["rank"], 1);
        assert_eq!(body[0]["name_zh"], "KARLSSON Kristian");
        assert_eq!(body[0]["association"], "SWE");

        let (_, body) = get(seeded_app().await, "/api/rankings/men?limit=1").await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = get(seeded_app().await, "/api/rankings/women").await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ranking_rejects_bad_input() {
        let (status, _) = get(seeded_app().await, "/api/rankings/men?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(seeded_app().await, "/api/rankings/mixed").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_competitor_detail() {
        let (status, body) = get(seeded_app().await, "/api/competitors/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["competitor"]["name"], "MOREGARD Truls");
        assert_eq!(body["population"], "men");
        assert_eq!(body["ratings"].as_array().unwrap().len(), 1);
        assert_eq!(body["ratings"][0]["rating"], 310.0);

        let (status, _) = get(seeded_app().await, "/api/competitors/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_history_and_snapshots() {
        let (status, body) = get(seeded_app().await, "/api/history/men").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["eval_date"], "2025-03-09");
        assert_eq!(body[0]["leaders"][0]["name"], "KARLSSON Kristian");

        let (status, body) = get(seeded_app().await, "/api/snapshots/men/2025-03-09").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"][0]["id"], 2);

        let (status, _) = get(seeded_app().await, "/api/snapshots/men/2025-03-02").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let (status, body) = get(seeded_app().await, "/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/rankings/{population}"].is_object());
    }
}
