use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use wastegate_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use wastegate_core::domain::actor::Actor;
use wastegate_core::domain::review::{ReviewAction, ReviewRequest, ReviewRequestId, ReviewStatus};
use wastegate_core::domain::waste::{
    WasteRecord, WasteRecordDraft, WasteRecordId, WasteRecordPatch,
};
use wastegate_core::scope::ensure_record_in_actor_branch;
use wastegate_core::snapshot::WasteSnapshot;

use super::{
    apply_snapshot, delete_waste_record, fetch_waste_record, insert_review_request,
    record_from_snapshot, upsert_waste_record, WorkflowError,
};
use crate::DbPool;

/// A create/update/delete intent as submitted by a caller.
#[derive(Clone, Debug)]
pub enum MutationIntent {
    Create { draft: WasteRecordDraft },
    Update { target: WasteRecordId, patch: WasteRecordPatch, justification: String },
    Delete { target: WasteRecordId, justification: String },
}

impl MutationIntent {
    fn action(&self) -> ReviewAction {
        match self {
            Self::Create { .. } => ReviewAction::Create,
            Self::Update { .. } => ReviewAction::Update,
            Self::Delete { .. } => ReviewAction::Delete,
        }
    }
}

#[derive(Clone, Debug)]
pub enum MutationOutcome {
    /// Elevated caller; the mutation hit the store immediately. `record` is
    /// absent for deletes.
    Applied { record: Option<WasteRecord> },
    /// Scoped caller; a pending review request was staged instead.
    Staged { request: ReviewRequest },
}

/// Single entry point for all waste-record mutations. Role-based branching
/// between "apply directly" and "stage for review" lives here and nowhere
/// else.
pub struct MutationGateway {
    pool: DbPool,
    audit: Arc<dyn AuditSink>,
}

impl MutationGateway {
    pub fn new(pool: DbPool, audit: Arc<dyn AuditSink>) -> Self {
        Self { pool, audit }
    }

    pub async fn submit(
        &self,
        actor: &Actor,
        intent: MutationIntent,
    ) -> Result<MutationOutcome, WorkflowError> {
        actor.validate()?;
        validate_intent(&intent)?;

        let action = intent.action();
        let outcome = if actor.is_elevated() {
            self.apply_directly(actor, intent).await?
        } else {
            self.stage_for_review(actor, intent).await?
        };

        match &outcome {
            MutationOutcome::Applied { record } => {
                tracing::info!(
                    event_name = "gateway.applied_directly",
                    actor = %actor.username,
                    action = ?action,
                    "elevated mutation applied"
                );
                self.audit.emit(AuditEvent::new(
                    record.as_ref().map(|r| r.id.clone()),
                    None,
                    "gateway.applied_directly",
                    AuditCategory::Gateway,
                    actor.username.clone(),
                    AuditOutcome::Success,
                ));
            }
            MutationOutcome::Staged { request } => {
                tracing::info!(
                    event_name = "gateway.review_staged",
                    actor = %actor.username,
                    action = ?action,
                    review_request_id = %request.id.0,
                    "mutation staged for review"
                );
                self.audit.emit(
                    AuditEvent::new(
                        request.target_record_id.clone(),
                        Some(request.id.clone()),
                        "gateway.review_staged",
                        AuditCategory::Gateway,
                        actor.username.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("branch", request.branch_id.0.clone()),
                );
            }
        }

        Ok(outcome)
    }

    async fn apply_directly(
        &self,
        _actor: &Actor,
        intent: MutationIntent,
    ) -> Result<MutationOutcome, WorkflowError> {
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;

        match intent {
            MutationIntent::Create { draft } => {
                let record = record_from_snapshot(
                    WasteRecordId(Uuid::new_v4().to_string()),
                    &WasteSnapshot::from_draft(&draft),
                    now,
                );
                upsert_waste_record(&mut conn, &record).await?;
                Ok(MutationOutcome::Applied { record: Some(record) })
            }
            MutationIntent::Update { target, patch, .. } => {
                let mut record = fetch_waste_record(&mut conn, &target)
                    .await?
                    .ok_or_else(|| WorkflowError::NotFound {
                        entity: "waste record",
                        id: target.0.clone(),
                    })?;
                let merged = WasteSnapshot::of(&record).merged(&patch);
                apply_snapshot(&mut record, &merged, now);
                upsert_waste_record(&mut conn, &record).await?;
                Ok(MutationOutcome::Applied { record: Some(record) })
            }
            MutationIntent::Delete { target, .. } => {
                let removed = delete_waste_record(&mut conn, &target).await?;
                if !removed {
                    return Err(WorkflowError::NotFound {
                        entity: "waste record",
                        id: target.0,
                    });
                }
                Ok(MutationOutcome::Applied { record: None })
            }
        }
    }

    async fn stage_for_review(
        &self,
        actor: &Actor,
        intent: MutationIntent,
    ) -> Result<MutationOutcome, WorkflowError> {
        let now = Utc::now();
        let action = intent.action();
        let mut tx = self.pool.begin().await?;

        let (target_record_id, branch_id, original, proposed, justification) = match intent {
            MutationIntent::Create { draft } => {
                if actor.branch_id.as_ref() != Some(&draft.branch_id) {
                    return Err(WorkflowError::Authorization(format!(
                        "`{}` cannot create records for branch `{}`",
                        actor.username, draft.branch_id.0
                    )));
                }
                let proposed = WasteSnapshot::from_draft(&draft);
                (None, draft.branch_id, None, Some(proposed), None)
            }
            MutationIntent::Update { target, patch, justification } => {
                let record = fetch_waste_record(&mut tx, &target).await?.ok_or_else(|| {
                    WorkflowError::NotFound { entity: "waste record", id: target.0.clone() }
                })?;
                ensure_record_in_actor_branch(actor, &record)?;
                let original = WasteSnapshot::of(&record);
                let proposed = original.merged(&patch);
                (
                    Some(target),
                    record.branch_id,
                    Some(original),
                    Some(proposed),
                    Some(justification),
                )
            }
            MutationIntent::Delete { target, justification } => {
                let record = fetch_waste_record(&mut tx, &target).await?.ok_or_else(|| {
                    WorkflowError::NotFound { entity: "waste record", id: target.0.clone() }
                })?;
                ensure_record_in_actor_branch(actor, &record)?;
                let original = WasteSnapshot::of(&record);
                (Some(target), record.branch_id, Some(original), None, Some(justification))
            }
        };

        let request = ReviewRequest {
            id: ReviewRequestId(Uuid::new_v4().to_string()),
            target_record_id,
            action,
            status: ReviewStatus::Pending,
            branch_id,
            original_snapshot: original,
            proposed_snapshot: proposed,
            justification,
            requested_by: actor.id.clone(),
            decided_by: None,
            decision_notes: None,
            created_at: now,
            updated_at: now,
            decided_at: None,
        };

        // The partial unique index is the arbiter for concurrent submissions;
        // a losing insert surfaces as a unique violation.
        match insert_review_request(&mut tx, &request).await {
            Ok(()) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(WorkflowError::Conflict(
                    "a change for this record is already awaiting approval".to_string(),
                ));
            }
            Err(error) => return Err(error.into()),
        }

        tx.commit().await?;
        Ok(MutationOutcome::Staged { request })
    }
}

fn validate_intent(intent: &MutationIntent) -> Result<(), WorkflowError> {
    match intent {
        MutationIntent::Create { draft } => draft.validate()?,
        MutationIntent::Update { patch, justification, .. } => {
            patch.validate()?;
            require_justification(justification)?;
        }
        MutationIntent::Delete { justification, .. } => require_justification(justification)?,
    }
    Ok(())
}

fn require_justification(justification: &str) -> Result<(), WorkflowError> {
    if justification.trim().is_empty() {
        return Err(WorkflowError::Validation("justification must not be empty".to_string()));
    }
    Ok(())
}
