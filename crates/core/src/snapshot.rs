use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::branch::BranchId;
use crate::domain::waste::{ReasonCode, Unit, WasteRecord, WasteRecordDraft, WasteRecordPatch};

/// Immutable capture of a waste record's business fields at a point in time.
///
/// Timestamps and the row id are deliberately excluded: snapshot equality is
/// the conflict check at approval time and must compare only the fields an
/// operator can change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WasteSnapshot {
    pub branch_id: BranchId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub value: Decimal,
    pub reason_code: ReasonCode,
    pub photo_ref: Option<String>,
    pub occurred_on: NaiveDate,
}

impl WasteSnapshot {
    pub fn of(record: &WasteRecord) -> Self {
        Self {
            branch_id: record.branch_id.clone(),
            item_name: record.item_name.clone(),
            quantity: record.quantity,
            unit: record.unit,
            value: record.value,
            reason_code: record.reason_code,
            photo_ref: record.photo_ref.clone(),
            occurred_on: record.occurred_on,
        }
    }

    pub fn from_draft(draft: &WasteRecordDraft) -> Self {
        Self {
            branch_id: draft.branch_id.clone(),
            item_name: draft.item_name.clone(),
            quantity: draft.quantity,
            unit: draft.unit,
            value: draft.value,
            reason_code: draft.reason_code,
            photo_ref: draft.photo_ref.clone(),
            occurred_on: draft.occurred_on,
        }
    }

    /// The state the record would have after applying `patch`.
    pub fn merged(&self, patch: &WasteRecordPatch) -> Self {
        Self {
            branch_id: self.branch_id.clone(),
            item_name: patch.item_name.clone().unwrap_or_else(|| self.item_name.clone()),
            quantity: patch.quantity.unwrap_or(self.quantity),
            unit: patch.unit.unwrap_or(self.unit),
            value: patch.value.unwrap_or(self.value),
            reason_code: patch.reason_code.unwrap_or(self.reason_code),
            photo_ref: patch.photo_ref.clone().unwrap_or_else(|| self.photo_ref.clone()),
            occurred_on: patch.occurred_on.unwrap_or(self.occurred_on),
        }
    }

    /// Names of fields whose values differ, for conflict messages.
    pub fn diff(&self, other: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.branch_id != other.branch_id {
            changed.push("branch_id");
        }
        if self.item_name != other.item_name {
            changed.push("item_name");
        }
        if self.quantity != other.quantity {
            changed.push("quantity");
        }
        if self.unit != other.unit {
            changed.push("unit");
        }
        if self.value != other.value {
            changed.push("value");
        }
        if self.reason_code != other.reason_code {
            changed.push("reason_code");
        }
        if self.photo_ref != other.photo_ref {
            changed.push("photo_ref");
        }
        if self.occurred_on != other.occurred_on {
            changed.push("occurred_on");
        }
        changed
    }
}
