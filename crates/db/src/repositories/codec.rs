//! Shared row mapping between the SQL repositories and the workflow services.
//! Timestamps are RFC3339 TEXT, decimals and dates plain TEXT, snapshots JSON.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use wastegate_core::domain::actor::{Actor, ActorId, ActorRole};
use wastegate_core::domain::branch::{Branch, BranchId};
use wastegate_core::domain::review::{ReviewAction, ReviewRequest, ReviewRequestId, ReviewStatus};
use wastegate_core::domain::waste::{ReasonCode, Unit, WasteRecord, WasteRecordId};
use wastegate_core::snapshot::WasteSnapshot;

use super::RepositoryError;

pub(crate) fn unit_as_str(unit: Unit) -> &'static str {
    match unit {
        Unit::Kg => "kg",
        Unit::G => "g",
        Unit::L => "l",
        Unit::Ml => "ml",
        Unit::Pcs => "pcs",
    }
}

pub(crate) fn parse_unit(s: &str) -> Result<Unit, RepositoryError> {
    match s {
        "kg" => Ok(Unit::Kg),
        "g" => Ok(Unit::G),
        "l" => Ok(Unit::L),
        "ml" => Ok(Unit::Ml),
        "pcs" => Ok(Unit::Pcs),
        other => Err(RepositoryError::Decode(format!("unknown unit `{other}`"))),
    }
}

pub(crate) fn reason_as_str(reason: ReasonCode) -> &'static str {
    match reason {
        ReasonCode::Spoilage => "spoilage",
        ReasonCode::Overproduction => "overproduction",
        ReasonCode::PlateWaste => "plate_waste",
        ReasonCode::BuffetLeftover => "buffet_leftover",
    }
}

pub(crate) fn parse_reason(s: &str) -> Result<ReasonCode, RepositoryError> {
    match s {
        "spoilage" => Ok(ReasonCode::Spoilage),
        "overproduction" => Ok(ReasonCode::Overproduction),
        "plate_waste" => Ok(ReasonCode::PlateWaste),
        "buffet_leftover" => Ok(ReasonCode::BuffetLeftover),
        other => Err(RepositoryError::Decode(format!("unknown reason code `{other}`"))),
    }
}

pub(crate) fn action_as_str(action: ReviewAction) -> &'static str {
    match action {
        ReviewAction::Create => "create",
        ReviewAction::Update => "update",
        ReviewAction::Delete => "delete",
    }
}

pub(crate) fn parse_action(s: &str) -> Result<ReviewAction, RepositoryError> {
    match s {
        "create" => Ok(ReviewAction::Create),
        "update" => Ok(ReviewAction::Update),
        "delete" => Ok(ReviewAction::Delete),
        other => Err(RepositoryError::Decode(format!("unknown review action `{other}`"))),
    }
}

pub(crate) fn status_as_str(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Pending => "pending",
        ReviewStatus::Approved => "approved",
        ReviewStatus::Rejected => "rejected",
    }
}

pub(crate) fn parse_status(s: &str) -> Result<ReviewStatus, RepositoryError> {
    match s {
        "pending" => Ok(ReviewStatus::Pending),
        "approved" => Ok(ReviewStatus::Approved),
        "rejected" => Ok(ReviewStatus::Rejected),
        other => Err(RepositoryError::Decode(format!("unknown review status `{other}`"))),
    }
}

pub(crate) fn role_as_str(role: ActorRole) -> &'static str {
    match role {
        ActorRole::Elevated => "elevated",
        ActorRole::Scoped => "scoped",
    }
}

pub(crate) fn parse_role(s: &str) -> Result<ActorRole, RepositoryError> {
    match s {
        "elevated" => Ok(ActorRole::Elevated),
        "scoped" => Ok(ActorRole::Scoped),
        other => Err(RepositoryError::Decode(format!("unknown actor role `{other}`"))),
    }
}

pub(crate) fn parse_decimal(s: &str, column: &str) -> Result<Decimal, RepositoryError> {
    s.parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("bad decimal in {column}: {e}")))
}

pub(crate) fn parse_date(s: &str, column: &str) -> Result<NaiveDate, RepositoryError> {
    s.parse::<NaiveDate>().map_err(|e| RepositoryError::Decode(format!("bad date in {column}: {e}")))
}

pub(crate) fn parse_timestamp(s: &str, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp in {column}: {e}")))
}

pub(crate) fn snapshot_to_json(snapshot: &WasteSnapshot) -> Result<String, RepositoryError> {
    serde_json::to_string(snapshot)
        .map_err(|e| RepositoryError::Decode(format!("snapshot encode failed: {e}")))
}

pub(crate) fn snapshot_from_json(raw: &str) -> Result<WasteSnapshot, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("snapshot decode failed: {e}")))
}

fn get_text(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn get_opt_text(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Option<String>, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn row_to_branch(row: &sqlx::sqlite::SqliteRow) -> Result<Branch, RepositoryError> {
    Ok(Branch {
        id: BranchId(get_text(row, "id")?),
        name: get_text(row, "name")?,
        location: get_text(row, "location")?,
        created_at: parse_timestamp(&get_text(row, "created_at")?, "created_at")?,
        updated_at: parse_timestamp(&get_text(row, "updated_at")?, "updated_at")?,
    })
}

pub(crate) fn row_to_actor(row: &sqlx::sqlite::SqliteRow) -> Result<Actor, RepositoryError> {
    Ok(Actor {
        id: ActorId(get_text(row, "id")?),
        username: get_text(row, "username")?,
        role: parse_role(&get_text(row, "role")?)?,
        branch_id: get_opt_text(row, "branch_id")?.map(BranchId),
    })
}

pub(crate) fn row_to_waste_record(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<WasteRecord, RepositoryError> {
    Ok(WasteRecord {
        id: WasteRecordId(get_text(row, "id")?),
        branch_id: BranchId(get_text(row, "branch_id")?),
        item_name: get_text(row, "item_name")?,
        quantity: parse_decimal(&get_text(row, "quantity")?, "quantity")?,
        unit: parse_unit(&get_text(row, "unit")?)?,
        value: parse_decimal(&get_text(row, "value")?, "value")?,
        reason_code: parse_reason(&get_text(row, "reason_code")?)?,
        photo_ref: get_opt_text(row, "photo_ref")?,
        occurred_on: parse_date(&get_text(row, "occurred_on")?, "occurred_on")?,
        created_at: parse_timestamp(&get_text(row, "created_at")?, "created_at")?,
        updated_at: parse_timestamp(&get_text(row, "updated_at")?, "updated_at")?,
    })
}

pub(crate) fn row_to_review_request(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ReviewRequest, RepositoryError> {
    let original_snapshot =
        get_opt_text(row, "original_snapshot")?.map(|raw| snapshot_from_json(&raw)).transpose()?;
    let proposed_snapshot =
        get_opt_text(row, "proposed_snapshot")?.map(|raw| snapshot_from_json(&raw)).transpose()?;

    Ok(ReviewRequest {
        id: ReviewRequestId(get_text(row, "id")?),
        target_record_id: get_opt_text(row, "target_record_id")?.map(WasteRecordId),
        action: parse_action(&get_text(row, "action")?)?,
        status: parse_status(&get_text(row, "status")?)?,
        branch_id: BranchId(get_text(row, "branch_id")?),
        original_snapshot,
        proposed_snapshot,
        justification: get_opt_text(row, "justification")?,
        requested_by: ActorId(get_text(row, "requested_by")?),
        decided_by: get_opt_text(row, "decided_by")?.map(ActorId),
        decision_notes: get_opt_text(row, "decision_notes")?,
        created_at: parse_timestamp(&get_text(row, "created_at")?, "created_at")?,
        updated_at: parse_timestamp(&get_text(row, "updated_at")?, "updated_at")?,
        decided_at: get_opt_text(row, "decided_at")?
            .map(|s| parse_timestamp(&s, "decided_at"))
            .transpose()?,
    })
}

pub(crate) const REVIEW_COLUMNS: &str = "id, target_record_id, action, status, branch_id, \
     original_snapshot, proposed_snapshot, justification, requested_by, decided_by, \
     decision_notes, created_at, updated_at, decided_at";

pub(crate) const WASTE_COLUMNS: &str = "id, branch_id, item_name, quantity, unit, value, \
     reason_code, photo_ref, occurred_on, created_at, updated_at";
