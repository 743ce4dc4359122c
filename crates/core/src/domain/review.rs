use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::ActorId;
use crate::domain::branch::BranchId;
use crate::domain::waste::WasteRecordId;
use crate::errors::DomainError;
use crate::snapshot::WasteSnapshot;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewRequestId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Create,
    Update,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }
}

/// A staged, not-yet-applied mutation awaiting an elevated actor's decision.
/// Terminal rows are never deleted; they are the audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: ReviewRequestId,
    /// Absent until a CREATE is approved and the new record id is bound.
    pub target_record_id: Option<WasteRecordId>,
    pub action: ReviewAction,
    pub status: ReviewStatus,
    /// Branch of the affected record; for CREATE, the draft's branch.
    pub branch_id: BranchId,
    pub original_snapshot: Option<WasteSnapshot>,
    pub proposed_snapshot: Option<WasteSnapshot>,
    pub justification: Option<String>,
    pub requested_by: ActorId,
    pub decided_by: Option<ActorId>,
    pub decision_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl ReviewRequest {
    fn transition(&mut self, next: ReviewStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidReviewTransition { from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }

    fn record_decision(
        &mut self,
        next: ReviewStatus,
        decided_by: ActorId,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if notes.trim().is_empty() {
            return Err(DomainError::validation("decision notes must not be empty"));
        }
        self.transition(next)?;
        self.decided_by = Some(decided_by);
        self.decision_notes = Some(notes.to_string());
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn approve(
        &mut self,
        decided_by: ActorId,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.record_decision(ReviewStatus::Approved, decided_by, notes, now)
    }

    pub fn reject(
        &mut self,
        decided_by: ActorId,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.record_decision(ReviewStatus::Rejected, decided_by, notes, now)
    }
}

/// Listing filter; branch narrowing is handled separately by the scope filter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
    pub action: Option<ReviewAction>,
    pub requested_by: Option<ActorId>,
}
