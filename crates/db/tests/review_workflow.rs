use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use wastegate_core::audit::InMemoryAuditSink;
use wastegate_core::domain::actor::Actor;
use wastegate_core::domain::branch::BranchId;
use wastegate_core::domain::review::{ReviewAction, ReviewFilter, ReviewStatus};
use wastegate_core::domain::waste::{
    ReasonCode, Unit, WasteRecordDraft, WasteRecordId, WasteRecordPatch,
};
use wastegate_core::scope::BranchScope;

use wastegate_db::repositories::{
    ReviewRequestRepository, SqlReviewRequestRepository, SqlWasteRecordRepository,
    WasteRecordRepository,
};
use wastegate_db::{
    connect_with_settings, fixtures, migrations, ApprovalProcessor, BranchAdmin, Decision,
    MutationGateway, MutationIntent, MutationOutcome, WorkflowError,
};

struct Harness {
    pool: sqlx::SqlitePool,
    gateway: MutationGateway,
    processor: ApprovalProcessor,
    audit: InMemoryAuditSink,
    admin: Actor,
    ops_b1: Actor,
    ops_b2: Actor,
}

async fn harness() -> Harness {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    let dataset = fixtures::seed(&pool).await.expect("seed");

    let audit = InMemoryAuditSink::default();
    Harness {
        gateway: MutationGateway::new(pool.clone(), Arc::new(audit.clone())),
        processor: ApprovalProcessor::new(pool.clone(), Arc::new(audit.clone())),
        pool,
        audit,
        admin: dataset.admin,
        ops_b1: dataset.operators[0].clone(),
        ops_b2: dataset.operators[1].clone(),
    }
}

fn rice_draft(branch: &str) -> WasteRecordDraft {
    WasteRecordDraft {
        branch_id: BranchId(branch.to_string()),
        item_name: "Rice".to_string(),
        quantity: Decimal::new(5, 0),
        unit: Unit::Kg,
        value: Decimal::new(1200, 0),
        reason_code: ReasonCode::Spoilage,
        photo_ref: None,
        occurred_on: NaiveDate::from_ymd_opt(2026, 8, 20).expect("date"),
    }
}

fn staged(outcome: MutationOutcome) -> wastegate_core::domain::review::ReviewRequest {
    match outcome {
        MutationOutcome::Staged { request } => request,
        MutationOutcome::Applied { .. } => panic!("expected a staged review request"),
    }
}

#[tokio::test]
async fn scoped_create_is_staged_as_pending_review() {
    let h = harness().await;

    let outcome = h
        .gateway
        .submit(&h.ops_b1, MutationIntent::Create { draft: rice_draft("B1") })
        .await
        .expect("submit");

    let request = staged(outcome);
    assert_eq!(request.status, ReviewStatus::Pending);
    assert_eq!(request.action, ReviewAction::Create);
    assert!(request.target_record_id.is_none());
    assert_eq!(request.requested_by, h.ops_b1.id);

    // Nothing was written to the record store.
    let records = SqlWasteRecordRepository::new(h.pool.clone())
        .list(&BranchScope::All, &Default::default())
        .await
        .expect("list");
    assert_eq!(records.len(), 2, "only the seed records exist");
}

#[tokio::test]
async fn approving_a_create_materializes_the_proposed_record() {
    let h = harness().await;

    let request = staged(
        h.gateway
            .submit(&h.ops_b1, MutationIntent::Create { draft: rice_draft("B1") })
            .await
            .expect("submit"),
    );

    let outcome = h
        .processor
        .decide(&h.admin, &request.id, Decision::Approve, "ok")
        .await
        .expect("approve");

    assert_eq!(outcome.request.status, ReviewStatus::Approved);
    assert_eq!(outcome.request.decision_notes.as_deref(), Some("ok"));

    let record = outcome.record.expect("created record");
    assert_eq!(record.item_name, "Rice");
    assert_eq!(record.quantity, Decimal::new(5, 0));
    assert_eq!(record.value, Decimal::new(1200, 0));
    assert_eq!(record.branch_id.0, "B1");
    assert_eq!(outcome.request.target_record_id, Some(record.id.clone()));

    let stored = SqlWasteRecordRepository::new(h.pool.clone())
        .find_by_id(&record.id)
        .await
        .expect("find")
        .expect("persisted");
    assert_eq!(stored.item_name, "Rice");
}

#[tokio::test]
async fn delete_with_blank_justification_is_rejected() {
    let h = harness().await;

    let error = h
        .gateway
        .submit(
            &h.ops_b1,
            MutationIntent::Delete {
                target: WasteRecordId("WR-SEED-1".to_string()),
                justification: "   ".to_string(),
            },
        )
        .await
        .expect_err("blank justification");

    assert!(matches!(error, WorkflowError::Validation(_)));
}

#[tokio::test]
async fn second_pending_submission_for_same_target_conflicts() {
    let h = harness().await;
    let patch = WasteRecordPatch { quantity: Some(Decimal::new(1, 0)), ..Default::default() };

    h.gateway
        .submit(
            &h.ops_b1,
            MutationIntent::Update {
                target: WasteRecordId("WR-SEED-1".to_string()),
                patch: patch.clone(),
                justification: "counted again".to_string(),
            },
        )
        .await
        .expect("first submission");

    let error = h
        .gateway
        .submit(
            &h.ops_b1,
            MutationIntent::Update {
                target: WasteRecordId("WR-SEED-1".to_string()),
                patch,
                justification: "counted a third time".to_string(),
            },
        )
        .await
        .expect_err("second submission");

    assert!(matches!(error, WorkflowError::Conflict(_)));
    assert!(error.to_string().contains("awaiting approval"));
}

#[tokio::test]
async fn rejecting_leaves_the_record_untouched() {
    let h = harness().await;

    let request = staged(
        h.gateway
            .submit(
                &h.ops_b1,
                MutationIntent::Delete {
                    target: WasteRecordId("WR-SEED-1".to_string()),
                    justification: "logged by mistake".to_string(),
                },
            )
            .await
            .expect("submit"),
    );

    let outcome = h
        .processor
        .decide(&h.admin, &request.id, Decision::Reject, "denied")
        .await
        .expect("reject");

    assert_eq!(outcome.request.status, ReviewStatus::Rejected);
    assert!(outcome.record.is_none());

    let still_there = SqlWasteRecordRepository::new(h.pool.clone())
        .find_by_id(&WasteRecordId("WR-SEED-1".to_string()))
        .await
        .expect("find");
    assert!(still_there.is_some());
}

#[tokio::test]
async fn update_approval_changes_only_patched_fields() {
    let h = harness().await;

    let request = staged(
        h.gateway
            .submit(
                &h.ops_b1,
                MutationIntent::Update {
                    target: WasteRecordId("WR-SEED-1".to_string()),
                    patch: WasteRecordPatch {
                        quantity: Some(Decimal::new(28, 1)),
                        ..Default::default()
                    },
                    justification: "scale was recalibrated".to_string(),
                },
            )
            .await
            .expect("submit"),
    );

    let outcome = h
        .processor
        .decide(&h.admin, &request.id, Decision::Approve, "ok")
        .await
        .expect("approve");

    let record = outcome.record.expect("updated record");
    assert_eq!(record.quantity, Decimal::new(28, 1));
    assert_eq!(record.item_name, "Salmon fillet");
    assert_eq!(record.value, Decimal::new(4800, 0));
    assert_eq!(record.reason_code, ReasonCode::Spoilage);
}

#[tokio::test]
async fn direct_modification_stales_a_pending_update() {
    let h = harness().await;
    let target = WasteRecordId("WR-SEED-1".to_string());

    let request = staged(
        h.gateway
            .submit(
                &h.ops_b1,
                MutationIntent::Update {
                    target: target.clone(),
                    patch: WasteRecordPatch {
                        value: Some(Decimal::new(100, 0)),
                        ..Default::default()
                    },
                    justification: "wrong price used".to_string(),
                },
            )
            .await
            .expect("stage update"),
    );

    // An elevated direct write lands while the request is pending.
    h.gateway
        .submit(
            &h.admin,
            MutationIntent::Update {
                target: target.clone(),
                patch: WasteRecordPatch {
                    item_name: Some("Salmon fillet (trim)".to_string()),
                    ..Default::default()
                },
                justification: "direct correction".to_string(),
            },
        )
        .await
        .expect("direct update");

    let error = h
        .processor
        .decide(&h.admin, &request.id, Decision::Approve, "ok")
        .await
        .expect_err("stale snapshot");
    assert!(matches!(error, WorkflowError::Conflict(_)));
    assert!(error.to_string().contains("item_name"));

    // The request stays pending and the direct change survives.
    let reloaded = SqlReviewRequestRepository::new(h.pool.clone())
        .find_by_id(&request.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(reloaded.status, ReviewStatus::Pending);

    let record = SqlWasteRecordRepository::new(h.pool.clone())
        .find_by_id(&target)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(record.item_name, "Salmon fillet (trim)");
    assert_eq!(record.value, Decimal::new(4800, 0));
}

#[tokio::test]
async fn deciding_twice_is_invalid_state_with_no_side_effect() {
    let h = harness().await;

    let request = staged(
        h.gateway
            .submit(&h.ops_b1, MutationIntent::Create { draft: rice_draft("B1") })
            .await
            .expect("submit"),
    );

    h.processor.decide(&h.admin, &request.id, Decision::Approve, "ok").await.expect("approve");

    let error = h
        .processor
        .decide(&h.admin, &request.id, Decision::Reject, "second thoughts")
        .await
        .expect_err("already decided");
    assert!(matches!(error, WorkflowError::InvalidState(_)));

    let reloaded = SqlReviewRequestRepository::new(h.pool.clone())
        .find_by_id(&request.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(reloaded.status, ReviewStatus::Approved);
    assert_eq!(reloaded.decision_notes.as_deref(), Some("ok"));
}

#[tokio::test]
async fn redeciding_an_approved_update_is_invalid_state_not_conflict() {
    let h = harness().await;
    let target = WasteRecordId("WR-SEED-1".to_string());

    let request = staged(
        h.gateway
            .submit(
                &h.ops_b1,
                MutationIntent::Update {
                    target: target.clone(),
                    patch: WasteRecordPatch {
                        quantity: Some(Decimal::new(41, 1)),
                        ..Default::default()
                    },
                    justification: "recount after service".to_string(),
                },
            )
            .await
            .expect("stage update"),
    );

    h.processor.decide(&h.admin, &request.id, Decision::Approve, "ok").await.expect("approve");

    // The first approval changed the record, so a naive re-approval would
    // trip the snapshot comparison; it must fail as already-decided instead.
    let error = h
        .processor
        .decide(&h.admin, &request.id, Decision::Approve, "ok again")
        .await
        .expect_err("second approval");
    assert!(matches!(error, WorkflowError::InvalidState(_)), "got: {error}");

    let record = SqlWasteRecordRepository::new(h.pool.clone())
        .find_by_id(&target)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(record.quantity, Decimal::new(41, 1));
}

#[tokio::test]
async fn redeciding_a_rejected_delete_is_invalid_state() {
    let h = harness().await;
    let target = WasteRecordId("WR-SEED-2".to_string());

    let request = staged(
        h.gateway
            .submit(
                &h.ops_b2,
                MutationIntent::Delete {
                    target: target.clone(),
                    justification: "logged twice".to_string(),
                },
            )
            .await
            .expect("stage delete"),
    );

    h.processor.decide(&h.admin, &request.id, Decision::Reject, "keep it").await.expect("reject");

    let error = h
        .processor
        .decide(&h.admin, &request.id, Decision::Approve, "on reflection")
        .await
        .expect_err("deciding a rejected request");
    assert!(matches!(error, WorkflowError::InvalidState(_)), "got: {error}");

    // The rejected delete must never reach the record store.
    let still_there = SqlWasteRecordRepository::new(h.pool.clone())
        .find_by_id(&target)
        .await
        .expect("find");
    assert!(still_there.is_some());
}

#[tokio::test]
async fn elevated_submission_applies_directly_without_a_review() {
    let h = harness().await;

    let outcome = h
        .gateway
        .submit(&h.admin, MutationIntent::Create { draft: rice_draft("B2") })
        .await
        .expect("submit");

    let record = match outcome {
        MutationOutcome::Applied { record } => record.expect("created record"),
        MutationOutcome::Staged { .. } => panic!("elevated submissions must not stage"),
    };
    assert_eq!(record.branch_id.0, "B2");

    let requests = SqlReviewRequestRepository::new(h.pool.clone())
        .list(&BranchScope::All, &ReviewFilter::default())
        .await
        .expect("list");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn approved_delete_removes_the_record() {
    let h = harness().await;
    let target = WasteRecordId("WR-SEED-2".to_string());

    let request = staged(
        h.gateway
            .submit(
                &h.ops_b2,
                MutationIntent::Delete {
                    target: target.clone(),
                    justification: "double-logged".to_string(),
                },
            )
            .await
            .expect("submit"),
    );

    let outcome = h
        .processor
        .decide(&h.admin, &request.id, Decision::Approve, "confirmed duplicate")
        .await
        .expect("approve");
    assert!(outcome.record.is_none());

    let gone = SqlWasteRecordRepository::new(h.pool.clone())
        .find_by_id(&target)
        .await
        .expect("find");
    assert!(gone.is_none());
}

#[tokio::test]
async fn scoped_actor_cannot_touch_foreign_branch_records() {
    let h = harness().await;

    let error = h
        .gateway
        .submit(
            &h.ops_b2,
            MutationIntent::Update {
                target: WasteRecordId("WR-SEED-1".to_string()),
                patch: WasteRecordPatch {
                    quantity: Some(Decimal::new(1, 0)),
                    ..Default::default()
                },
                justification: "not my branch".to_string(),
            },
        )
        .await
        .expect_err("foreign branch");
    assert!(matches!(error, WorkflowError::Authorization(_)));

    let error = h
        .gateway
        .submit(&h.ops_b2, MutationIntent::Create { draft: rice_draft("B1") })
        .await
        .expect_err("foreign branch create");
    assert!(matches!(error, WorkflowError::Authorization(_)));
}

#[tokio::test]
async fn scoped_actor_cannot_decide() {
    let h = harness().await;

    let request = staged(
        h.gateway
            .submit(&h.ops_b1, MutationIntent::Create { draft: rice_draft("B1") })
            .await
            .expect("submit"),
    );

    let error = h
        .processor
        .decide(&h.ops_b1, &request.id, Decision::Approve, "self-approval")
        .await
        .expect_err("scoped decision");
    assert!(matches!(error, WorkflowError::Authorization(_)));
}

#[tokio::test]
async fn blank_decision_notes_are_rejected() {
    let h = harness().await;

    let request = staged(
        h.gateway
            .submit(&h.ops_b1, MutationIntent::Create { draft: rice_draft("B1") })
            .await
            .expect("submit"),
    );

    let error = h
        .processor
        .decide(&h.admin, &request.id, Decision::Approve, "")
        .await
        .expect_err("blank notes");
    assert!(matches!(error, WorkflowError::Validation(_)));
}

#[tokio::test]
async fn rejection_frees_the_pending_slot() {
    let h = harness().await;
    let target = WasteRecordId("WR-SEED-1".to_string());
    let patch = WasteRecordPatch { quantity: Some(Decimal::new(1, 0)), ..Default::default() };

    let request = staged(
        h.gateway
            .submit(
                &h.ops_b1,
                MutationIntent::Update {
                    target: target.clone(),
                    patch: patch.clone(),
                    justification: "first attempt".to_string(),
                },
            )
            .await
            .expect("submit"),
    );

    h.processor.decide(&h.admin, &request.id, Decision::Reject, "not enough detail").await
        .expect("reject");

    h.gateway
        .submit(
            &h.ops_b1,
            MutationIntent::Update {
                target,
                patch,
                justification: "second attempt with stocktake sheet".to_string(),
            },
        )
        .await
        .expect("resubmission after rejection");
}

#[tokio::test]
async fn unknown_targets_and_requests_are_not_found() {
    let h = harness().await;

    let error = h
        .gateway
        .submit(
            &h.ops_b1,
            MutationIntent::Delete {
                target: WasteRecordId("WR-MISSING".to_string()),
                justification: "cleanup".to_string(),
            },
        )
        .await
        .expect_err("unknown record");
    assert!(matches!(error, WorkflowError::NotFound { .. }));

    let error = h
        .processor
        .decide(
            &h.admin,
            &wastegate_core::domain::review::ReviewRequestId("RR-MISSING".to_string()),
            Decision::Approve,
            "ok",
        )
        .await
        .expect_err("unknown request");
    assert!(matches!(error, WorkflowError::NotFound { .. }));
}

#[tokio::test]
async fn audit_trail_covers_staging_and_decisions() {
    let h = harness().await;

    let request = staged(
        h.gateway
            .submit(&h.ops_b1, MutationIntent::Create { draft: rice_draft("B1") })
            .await
            .expect("submit"),
    );
    h.processor.decide(&h.admin, &request.id, Decision::Approve, "ok").await.expect("approve");

    let events: Vec<String> =
        h.audit.events().into_iter().map(|event| event.event_type).collect();
    assert_eq!(events, vec!["gateway.review_staged", "review.approved"]);
}

#[tokio::test]
async fn branch_deletion_is_blocked_while_actors_are_assigned() {
    let h = harness().await;
    let admin_ops = BranchAdmin::new(h.pool.clone());

    let result = admin_ops.delete(&h.ops_b1, &BranchId("B1".to_string())).await;
    assert!(matches!(result, Err(WorkflowError::Authorization(_))));

    let result = admin_ops.delete(&h.admin, &BranchId("B1".to_string())).await;
    assert!(matches!(result, Err(WorkflowError::Conflict(_))));

    let fresh = admin_ops.create(&h.admin, "Pop-up", "Harborfront 1").await.expect("create");
    admin_ops.delete(&h.admin, &fresh.id).await.expect("delete unassigned branch");
}

#[tokio::test]
async fn branch_rename_returns_the_persisted_row() {
    let h = harness().await;
    let admin_ops = BranchAdmin::new(h.pool.clone());

    let result = admin_ops
        .rename(&h.ops_b1, &BranchId("B1".to_string()), "Downtown East", "Main St 12")
        .await;
    assert!(matches!(result, Err(WorkflowError::Authorization(_))));

    let renamed = admin_ops
        .rename(&h.admin, &BranchId("B1".to_string()), "Downtown East", "Main St 12")
        .await
        .expect("rename");
    assert_eq!(renamed.name, "Downtown East");
    assert_eq!(renamed.location, "Main St 12");

    let result = admin_ops
        .rename(&h.admin, &BranchId("B-MISSING".to_string()), "Nowhere", "Nowhere")
        .await;
    assert!(matches!(
        result,
        Err(WorkflowError::NotFound { entity: "branch", .. })
    ));
}
