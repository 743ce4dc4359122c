use chrono::{DateTime, Utc};
use thiserror::Error;

use wastegate_core::domain::review::ReviewRequest;
use wastegate_core::domain::waste::{WasteRecord, WasteRecordId};
use wastegate_core::errors::DomainError;
use wastegate_core::snapshot::WasteSnapshot;

use crate::repositories::codec::{
    reason_as_str, row_to_waste_record, snapshot_to_json, status_as_str, unit_as_str,
    WASTE_COLUMNS,
};
use crate::repositories::RepositoryError;

pub mod approval;
pub mod branches;
pub mod gateway;

pub use approval::{ApprovalProcessor, Decision, DecisionOutcome};
pub use branches::BranchAdmin;
pub use gateway::{MutationGateway, MutationIntent, MutationOutcome};

/// The caller-facing failure taxonomy. Nothing here is retried automatically;
/// on `Conflict` the caller re-fetches current state and resubmits.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("storage failure: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<DomainError> for WorkflowError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(message) => Self::Validation(message),
            DomainError::Authorization(message) => Self::Authorization(message),
            DomainError::InvalidReviewTransition { from, to } => Self::InvalidState(format!(
                "review request cannot move from {from:?} to {to:?}"
            )),
        }
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(value: sqlx::Error) -> Self {
        Self::Storage(RepositoryError::Database(value))
    }
}

pub(crate) fn record_from_snapshot(
    id: WasteRecordId,
    snapshot: &WasteSnapshot,
    now: DateTime<Utc>,
) -> WasteRecord {
    WasteRecord {
        id,
        branch_id: snapshot.branch_id.clone(),
        item_name: snapshot.item_name.clone(),
        quantity: snapshot.quantity,
        unit: snapshot.unit,
        value: snapshot.value,
        reason_code: snapshot.reason_code,
        photo_ref: snapshot.photo_ref.clone(),
        occurred_on: snapshot.occurred_on,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn apply_snapshot(record: &mut WasteRecord, snapshot: &WasteSnapshot, now: DateTime<Utc>) {
    record.branch_id = snapshot.branch_id.clone();
    record.item_name = snapshot.item_name.clone();
    record.quantity = snapshot.quantity;
    record.unit = snapshot.unit;
    record.value = snapshot.value;
    record.reason_code = snapshot.reason_code;
    record.photo_ref = snapshot.photo_ref.clone();
    record.occurred_on = snapshot.occurred_on;
    record.updated_at = now;
}

pub(crate) async fn fetch_waste_record(
    conn: &mut sqlx::SqliteConnection,
    id: &WasteRecordId,
) -> Result<Option<WasteRecord>, WorkflowError> {
    let sql = format!("SELECT {WASTE_COLUMNS} FROM waste_record WHERE id = ?");
    let row = sqlx::query(&sql).bind(&id.0).fetch_optional(conn).await?;

    match row {
        Some(ref r) => Ok(Some(row_to_waste_record(r)?)),
        None => Ok(None),
    }
}

pub(crate) async fn upsert_waste_record(
    conn: &mut sqlx::SqliteConnection,
    record: &WasteRecord,
) -> Result<(), WorkflowError> {
    sqlx::query(
        "INSERT INTO waste_record (id, branch_id, item_name, quantity, unit, value,
                                   reason_code, photo_ref, occurred_on, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             branch_id = excluded.branch_id,
             item_name = excluded.item_name,
             quantity = excluded.quantity,
             unit = excluded.unit,
             value = excluded.value,
             reason_code = excluded.reason_code,
             photo_ref = excluded.photo_ref,
             occurred_on = excluded.occurred_on,
             updated_at = excluded.updated_at",
    )
    .bind(&record.id.0)
    .bind(&record.branch_id.0)
    .bind(&record.item_name)
    .bind(record.quantity.to_string())
    .bind(unit_as_str(record.unit))
    .bind(record.value.to_string())
    .bind(reason_as_str(record.reason_code))
    .bind(&record.photo_ref)
    .bind(record.occurred_on.to_string())
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_waste_record(
    conn: &mut sqlx::SqliteConnection,
    id: &WasteRecordId,
) -> Result<bool, WorkflowError> {
    let result = sqlx::query("DELETE FROM waste_record WHERE id = ?")
        .bind(&id.0)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn insert_review_request(
    conn: &mut sqlx::SqliteConnection,
    request: &ReviewRequest,
) -> Result<(), sqlx::Error> {
    let original = request
        .original_snapshot
        .as_ref()
        .map(snapshot_to_json)
        .transpose()
        .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;
    let proposed = request
        .proposed_snapshot
        .as_ref()
        .map(snapshot_to_json)
        .transpose()
        .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;

    sqlx::query(
        "INSERT INTO review_request (id, target_record_id, action, status, branch_id,
                                     original_snapshot, proposed_snapshot, justification,
                                     requested_by, decided_by, decision_notes,
                                     created_at, updated_at, decided_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&request.id.0)
    .bind(request.target_record_id.as_ref().map(|id| id.0.as_str()))
    .bind(crate::repositories::codec::action_as_str(request.action))
    .bind(status_as_str(request.status))
    .bind(&request.branch_id.0)
    .bind(&original)
    .bind(&proposed)
    .bind(&request.justification)
    .bind(&request.requested_by.0)
    .bind(request.decided_by.as_ref().map(|id| id.0.as_str()))
    .bind(&request.decision_notes)
    .bind(request.created_at.to_rfc3339())
    .bind(request.updated_at.to_rfc3339())
    .bind(request.decided_at.map(|dt| dt.to_rfc3339()))
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn update_review_decision(
    conn: &mut sqlx::SqliteConnection,
    request: &ReviewRequest,
) -> Result<(), WorkflowError> {
    sqlx::query(
        "UPDATE review_request SET
             target_record_id = ?,
             status = ?,
             decided_by = ?,
             decision_notes = ?,
             updated_at = ?,
             decided_at = ?
         WHERE id = ?",
    )
    .bind(request.target_record_id.as_ref().map(|id| id.0.as_str()))
    .bind(status_as_str(request.status))
    .bind(request.decided_by.as_ref().map(|id| id.0.as_str()))
    .bind(&request.decision_notes)
    .bind(request.updated_at.to_rfc3339())
    .bind(request.decided_at.map(|dt| dt.to_rfc3339()))
    .bind(&request.id.0)
    .execute(conn)
    .await?;

    Ok(())
}
