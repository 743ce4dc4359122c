use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use wastegate_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use wastegate_core::domain::actor::Actor;
use wastegate_core::domain::review::{ReviewAction, ReviewRequest, ReviewRequestId, ReviewStatus};
use wastegate_core::domain::waste::{WasteRecord, WasteRecordId};
use wastegate_core::snapshot::WasteSnapshot;

use super::{
    apply_snapshot, delete_waste_record, fetch_waste_record, record_from_snapshot,
    update_review_decision, upsert_waste_record, WorkflowError,
};
use crate::repositories::codec::{row_to_review_request, status_as_str, REVIEW_COLUMNS};
use crate::DbPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Clone, Debug)]
pub struct DecisionOutcome {
    pub request: ReviewRequest,
    /// Present after an approved CREATE or UPDATE; absent for DELETE and for
    /// every rejection.
    pub record: Option<WasteRecord>,
}

/// Decides pending review requests. Approval re-validates the original
/// snapshot against the live record and applies the staged mutation in the
/// same transaction as the ledger update; any failure leaves both untouched.
pub struct ApprovalProcessor {
    pool: DbPool,
    audit: Arc<dyn AuditSink>,
}

impl ApprovalProcessor {
    pub fn new(pool: DbPool, audit: Arc<dyn AuditSink>) -> Self {
        Self { pool, audit }
    }

    pub async fn decide(
        &self,
        actor: &Actor,
        request_id: &ReviewRequestId,
        decision: Decision,
        notes: &str,
    ) -> Result<DecisionOutcome, WorkflowError> {
        actor.require_elevated("deciding review requests")?;
        if notes.trim().is_empty() {
            return Err(WorkflowError::Validation("decision notes must not be empty".to_string()));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {REVIEW_COLUMNS} FROM review_request WHERE id = ?");
        let row = sqlx::query(&sql).bind(&request_id.0).fetch_optional(&mut *tx).await?;
        let mut request = match row {
            Some(ref r) => row_to_review_request(r)?,
            None => {
                return Err(WorkflowError::NotFound {
                    entity: "review request",
                    id: request_id.0.clone(),
                })
            }
        };

        // Terminal requests must fail before any staged mutation runs, so the
        // caller sees "already decided" rather than a spurious conflict.
        if request.status != ReviewStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "review request `{}` was already decided ({})",
                request.id.0,
                status_as_str(request.status)
            )));
        }

        let outcome = match decision {
            Decision::Reject => {
                request.reject(actor.id.clone(), notes, now)?;
                update_review_decision(&mut tx, &request).await?;
                tx.commit().await?;
                DecisionOutcome { request, record: None }
            }
            Decision::Approve => {
                let record = self.apply_staged(&mut tx, &mut request).await?;
                request.approve(actor.id.clone(), notes, now)?;
                update_review_decision(&mut tx, &request).await?;
                tx.commit().await?;
                DecisionOutcome { request, record }
            }
        };

        let event_type = match decision {
            Decision::Approve => "review.approved",
            Decision::Reject => "review.rejected",
        };
        tracing::info!(
            event_name = event_type,
            actor = %actor.username,
            review_request_id = %outcome.request.id.0,
            action = ?outcome.request.action,
            "review request decided"
        );
        self.audit.emit(
            AuditEvent::new(
                outcome.request.target_record_id.clone(),
                Some(outcome.request.id.clone()),
                event_type,
                AuditCategory::Review,
                actor.username.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("notes", notes),
        );

        Ok(outcome)
    }

    /// Applies the staged mutation inside the caller's transaction. For
    /// UPDATE/DELETE the live record must still equal the original snapshot;
    /// otherwise the request is left pending and the caller sees `Conflict`.
    async fn apply_staged(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        request: &mut ReviewRequest,
    ) -> Result<Option<WasteRecord>, WorkflowError> {
        let now = Utc::now();

        match request.action {
            ReviewAction::Create => {
                let proposed = request.proposed_snapshot.as_ref().ok_or_else(|| {
                    WorkflowError::InvalidState(
                        "create request carries no proposed snapshot".to_string(),
                    )
                })?;
                let record = record_from_snapshot(
                    WasteRecordId(Uuid::new_v4().to_string()),
                    proposed,
                    now,
                );
                upsert_waste_record(tx, &record).await?;
                request.target_record_id = Some(record.id.clone());
                Ok(Some(record))
            }
            ReviewAction::Update => {
                let target = request.target_record_id.clone().ok_or_else(|| {
                    WorkflowError::InvalidState("update request has no target".to_string())
                })?;
                let mut live = self.load_unchanged(tx, request, &target).await?;
                let proposed = request.proposed_snapshot.as_ref().ok_or_else(|| {
                    WorkflowError::InvalidState(
                        "update request carries no proposed snapshot".to_string(),
                    )
                })?;
                apply_snapshot(&mut live, proposed, now);
                upsert_waste_record(tx, &live).await?;
                Ok(Some(live))
            }
            ReviewAction::Delete => {
                let target = request.target_record_id.clone().ok_or_else(|| {
                    WorkflowError::InvalidState("delete request has no target".to_string())
                })?;
                let live = self.load_unchanged(tx, request, &target).await?;
                delete_waste_record(tx, &live.id).await?;
                Ok(None)
            }
        }
    }

    async fn load_unchanged(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        request: &ReviewRequest,
        target: &WasteRecordId,
    ) -> Result<WasteRecord, WorkflowError> {
        let original = request.original_snapshot.as_ref().ok_or_else(|| {
            WorkflowError::InvalidState("request carries no original snapshot".to_string())
        })?;

        let live = fetch_waste_record(tx, target).await?.ok_or_else(|| {
            WorkflowError::Conflict(format!(
                "record `{}` no longer exists; the request remains pending",
                target.0
            ))
        })?;

        let current = WasteSnapshot::of(&live);
        let changed = original.diff(&current);
        if !changed.is_empty() {
            return Err(WorkflowError::Conflict(format!(
                "record `{}` changed since the request was staged ({}); \
                 the request remains pending",
                target.0,
                changed.join(", ")
            )));
        }

        Ok(live)
    }
}
