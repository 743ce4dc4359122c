use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use wastegate_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub database: ComponentStatus,
    pub detail: String,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

/// Liveness plus a database round trip. Degraded means the process is up but
/// the store is unreachable, so orchestrators should stop routing to it.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, detail) = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
    {
        Ok(_) => (ComponentStatus::Ready, "database query succeeded".to_string()),
        Err(error) => (ComponentStatus::Degraded, format!("database query failed: {error}")),
    };

    let payload = HealthResponse {
        status: database,
        database,
        detail,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = match payload.status {
        ComponentStatus::Ready => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(payload))
}
