//! JSON API routes for the mutation-review workflow.
//!
//! Endpoints:
//! - `POST   /api/mutations`                        — submit a create/update/delete intent
//! - `GET    /api/waste-records`                    — list records visible to the caller
//! - `GET    /api/review-requests`                  — list review requests visible to the caller
//! - `POST   /api/review-requests/{id}/decision`    — approve or reject a pending request
//! - `POST   /api/branches`                         — create a branch (elevated only)
//! - `PUT    /api/branches/{id}`                    — rename a branch (elevated only)
//! - `DELETE /api/branches/{id}`                    — delete an empty branch (elevated only)
//!
//! Callers identify themselves with the `x-actor-id` header; the session
//! layer that would normally populate it sits in front of this service.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use wastegate_core::audit::TracingAuditSink;
use wastegate_core::domain::actor::Actor;
use wastegate_core::domain::branch::{Branch, BranchId};
use wastegate_core::domain::review::{
    ReviewAction, ReviewFilter, ReviewRequest, ReviewRequestId, ReviewStatus,
};
use wastegate_core::domain::waste::{
    ReasonCode, WasteRecord, WasteRecordDraft, WasteRecordFilter, WasteRecordId, WasteRecordPatch,
};
use wastegate_core::scope::BranchScope;
use wastegate_core::ActorId;
use wastegate_db::repositories::{
    ActorRepository, ReviewRequestRepository, SqlActorRepository, SqlReviewRequestRepository,
    SqlWasteRecordRepository, WasteRecordRepository,
};
use wastegate_db::{
    ApprovalProcessor, BranchAdmin, DbPool, Decision, MutationGateway, MutationIntent,
    MutationOutcome, WorkflowError,
};

use crate::health;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    gateway: Arc<MutationGateway>,
    processor: Arc<ApprovalProcessor>,
    branches: Arc<BranchAdmin>,
    actors: Arc<SqlActorRepository>,
    records: Arc<SqlWasteRecordRepository>,
    reviews: Arc<SqlReviewRequestRepository>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> Self {
        let audit = Arc::new(TracingAuditSink);
        Self {
            gateway: Arc::new(MutationGateway::new(db_pool.clone(), audit.clone())),
            processor: Arc::new(ApprovalProcessor::new(db_pool.clone(), audit)),
            branches: Arc::new(BranchAdmin::new(db_pool.clone())),
            actors: Arc::new(SqlActorRepository::new(db_pool.clone())),
            records: Arc::new(SqlWasteRecordRepository::new(db_pool.clone())),
            reviews: Arc::new(SqlReviewRequestRepository::new(db_pool.clone())),
            db_pool,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let health = health::router(state.db_pool.clone());
    Router::new()
        .route("/api/mutations", post(submit_mutation))
        .route("/api/waste-records", get(list_waste_records))
        .route("/api/review-requests", get(list_review_requests))
        .route("/api/review-requests/{id}/decision", post(decide_review))
        .route("/api/branches", post(create_branch))
        .route("/api/branches/{id}", put(rename_branch).delete(delete_branch))
        .with_state(state)
        .merge(health)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitMutationRequest {
    pub action: ReviewAction,
    pub target_id: Option<String>,
    pub draft: Option<WasteRecordDraft>,
    pub patch: Option<WasteRecordPatch>,
    pub justification: Option<String>,
}

impl SubmitMutationRequest {
    fn into_intent(self) -> Result<MutationIntent, ApiError> {
        let missing = |field: &str| {
            ApiError::from(WorkflowError::Validation(format!(
                "`{field}` is required for this action"
            )))
        };
        match self.action {
            ReviewAction::Create => {
                let draft = self.draft.ok_or_else(|| missing("draft"))?;
                Ok(MutationIntent::Create { draft })
            }
            ReviewAction::Update => Ok(MutationIntent::Update {
                target: WasteRecordId(self.target_id.ok_or_else(|| missing("target_id"))?),
                patch: self.patch.ok_or_else(|| missing("patch"))?,
                justification: self.justification.ok_or_else(|| missing("justification"))?,
            }),
            ReviewAction::Delete => Ok(MutationIntent::Delete {
                target: WasteRecordId(self.target_id.ok_or_else(|| missing("target_id"))?),
                justification: self.justification.ok_or_else(|| missing("justification"))?,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitMutationResponse {
    pub applied_directly: bool,
    pub record: Option<WasteRecord>,
    pub review_request: Option<ReviewRequest>,
}

#[derive(Debug, Deserialize)]
pub struct WasteRecordQuery {
    pub branch_id: Option<String>,
    pub reason_code: Option<ReasonCode>,
    pub occurred_from: Option<NaiveDate>,
    pub occurred_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequestQuery {
    pub branch_id: Option<String>,
    pub status: Option<ReviewStatus>,
    pub action: Option<ReviewAction>,
    pub requested_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub decision: DecisionKind,
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct DecideResponse {
    pub request: ReviewRequest,
    pub record: Option<WasteRecord>,
}

#[derive(Debug, Deserialize)]
pub struct BranchPayload {
    pub name: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(String),
    Workflow(WorkflowError),
}

impl From<WorkflowError> for ApiError {
    fn from(value: WorkflowError) -> Self {
        Self::Workflow(value)
    }
}

impl From<wastegate_db::repositories::RepositoryError> for ApiError {
    fn from(value: wastegate_db::repositories::RepositoryError) -> Self {
        Self::Workflow(WorkflowError::Storage(value))
    }
}

impl From<wastegate_core::DomainError> for ApiError {
    fn from(value: wastegate_core::DomainError) -> Self {
        Self::Workflow(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthenticated(message) => (StatusCode::UNAUTHORIZED, message),
            Self::Workflow(error) => {
                let status = match &error {
                    WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
                    WorkflowError::Authorization(_) => StatusCode::FORBIDDEN,
                    WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
                    WorkflowError::Conflict(_) => StatusCode::CONFLICT,
                    WorkflowError::InvalidState(_) => StatusCode::CONFLICT,
                    WorkflowError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                if status == StatusCode::SERVICE_UNAVAILABLE {
                    warn!(event_name = "api.storage_failure", error = %error, "request failed");
                }
                (status, error.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn require_actor(state: &AppState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    let actor_id = headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated("missing x-actor-id header".to_string()))?;

    state
        .actors
        .find_by_id(&ActorId(actor_id.to_string()))
        .await?
        .ok_or_else(|| ApiError::Unauthenticated(format!("unknown actor `{actor_id}`")))
}

async fn submit_mutation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitMutationRequest>,
) -> Result<(StatusCode, Json<SubmitMutationResponse>), ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let intent = payload.into_intent()?;

    let (status, body) = match state.gateway.submit(&actor, intent).await? {
        MutationOutcome::Applied { record } => (
            StatusCode::OK,
            SubmitMutationResponse { applied_directly: true, record, review_request: None },
        ),
        MutationOutcome::Staged { request } => (
            StatusCode::ACCEPTED,
            SubmitMutationResponse {
                applied_directly: false,
                record: None,
                review_request: Some(request),
            },
        ),
    };
    Ok((status, Json(body)))
}

async fn list_waste_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WasteRecordQuery>,
) -> Result<Json<Vec<WasteRecord>>, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let requested = query.branch_id.map(BranchId);
    let scope = BranchScope::resolve(&actor, requested.as_ref())?;

    let filter = WasteRecordFilter {
        reason_code: query.reason_code,
        occurred_from: query.occurred_from,
        occurred_to: query.occurred_to,
    };
    let records = state.records.list(&scope, &filter).await?;
    Ok(Json(records))
}

async fn list_review_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReviewRequestQuery>,
) -> Result<Json<Vec<ReviewRequest>>, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let requested = query.branch_id.map(BranchId);
    let scope = BranchScope::resolve(&actor, requested.as_ref())?;

    let filter = ReviewFilter {
        status: query.status,
        action: query.action,
        requested_by: query.requested_by.map(ActorId),
    };
    let requests = state.reviews.list(&scope, &filter).await?;
    Ok(Json(requests))
}

async fn decide_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<DecideRequest>,
) -> Result<Json<DecideResponse>, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let decision = match payload.decision {
        DecisionKind::Approve => Decision::Approve,
        DecisionKind::Reject => Decision::Reject,
    };

    let outcome = state
        .processor
        .decide(&actor, &ReviewRequestId(id), decision, &payload.notes)
        .await?;
    Ok(Json(DecideResponse { request: outcome.request, record: outcome.record }))
}

async fn create_branch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BranchPayload>,
) -> Result<(StatusCode, Json<Branch>), ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let branch = state.branches.create(&actor, &payload.name, &payload.location).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

async fn rename_branch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<BranchPayload>,
) -> Result<Json<Branch>, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    let branch = state
        .branches
        .rename(&actor, &BranchId(id), &payload.name, &payload.location)
        .await?;
    Ok(Json(branch))
}

async fn delete_branch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = require_actor(&state, &headers).await?;
    state.branches.delete(&actor, &BranchId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
