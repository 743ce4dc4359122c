use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::branch::BranchId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WasteRecordId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Kg,
    G,
    L,
    Ml,
    Pcs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Spoilage,
    Overproduction,
    PlateWaste,
    BuffetLeftover,
}

/// One logged instance of discarded inventory, owned by its branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WasteRecord {
    pub id: WasteRecordId,
    pub branch_id: BranchId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub value: Decimal,
    pub reason_code: ReasonCode,
    pub photo_ref: Option<String>,
    pub occurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full payload for a CREATE intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WasteRecordDraft {
    pub branch_id: BranchId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub value: Decimal,
    pub reason_code: ReasonCode,
    pub photo_ref: Option<String>,
    pub occurred_on: NaiveDate,
}

impl WasteRecordDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.item_name.trim().is_empty() {
            return Err(DomainError::validation("item name must not be empty"));
        }
        if self.quantity < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity must not be negative (got {})",
                self.quantity
            )));
        }
        if self.value < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "value must not be negative (got {})",
                self.value
            )));
        }
        Ok(())
    }
}

/// Partial payload for an UPDATE intent; absent fields keep their current value.
/// `photo_ref` is tri-state: absent keeps the photo, `null` clears it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WasteRecordPatch {
    pub item_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<Unit>,
    pub value: Option<Decimal>,
    pub reason_code: Option<ReasonCode>,
    #[serde(default, deserialize_with = "photo_ref_patch", skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<Option<String>>,
    pub occurred_on: Option<NaiveDate>,
}

// Plain serde would fold an explicit `null` into field absence; wrapping the
// inner option keeps the two cases apart.
fn photo_ref_patch<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl WasteRecordPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::validation("update payload contains no fields"));
        }
        if let Some(item_name) = &self.item_name {
            if item_name.trim().is_empty() {
                return Err(DomainError::validation("item name must not be empty"));
            }
        }
        if let Some(quantity) = self.quantity {
            if quantity < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "quantity must not be negative (got {quantity})"
                )));
            }
        }
        if let Some(value) = self.value {
            if value < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "value must not be negative (got {value})"
                )));
            }
        }
        Ok(())
    }
}

/// Listing filter; branch narrowing is handled separately by the scope filter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WasteRecordFilter {
    pub reason_code: Option<ReasonCode>,
    pub occurred_from: Option<NaiveDate>,
    pub occurred_to: Option<NaiveDate>,
}
