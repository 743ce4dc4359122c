use std::collections::HashMap;

use tokio::sync::RwLock;

use wastegate_core::domain::review::{ReviewFilter, ReviewRequest, ReviewRequestId, ReviewStatus};
use wastegate_core::domain::waste::{WasteRecord, WasteRecordFilter, WasteRecordId};
use wastegate_core::scope::BranchScope;

use super::{RepositoryError, ReviewRequestRepository, WasteRecordRepository};

#[derive(Default)]
pub struct InMemoryWasteRecordRepository {
    records: RwLock<HashMap<String, WasteRecord>>,
}

#[async_trait::async_trait]
impl WasteRecordRepository for InMemoryWasteRecordRepository {
    async fn find_by_id(
        &self,
        id: &WasteRecordId,
    ) -> Result<Option<WasteRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&id.0).cloned())
    }

    async fn save(&self, record: WasteRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(record.id.0.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &WasteRecordId) -> Result<bool, RepositoryError> {
        let mut records = self.records.write().await;
        Ok(records.remove(&id.0).is_some())
    }

    async fn list(
        &self,
        scope: &BranchScope,
        filter: &WasteRecordFilter,
    ) -> Result<Vec<WasteRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut matched: Vec<WasteRecord> = records
            .values()
            .filter(|record| scope.permits_record(record))
            .filter(|record| {
                filter.reason_code.map_or(true, |reason| record.reason_code == reason)
                    && filter.occurred_from.map_or(true, |from| record.occurred_on >= from)
                    && filter.occurred_to.map_or(true, |to| record.occurred_on <= to)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.occurred_on.cmp(&a.occurred_on));
        Ok(matched)
    }
}

#[derive(Default)]
pub struct InMemoryReviewRequestRepository {
    requests: RwLock<HashMap<String, ReviewRequest>>,
}

#[async_trait::async_trait]
impl ReviewRequestRepository for InMemoryReviewRequestRepository {
    async fn find_by_id(
        &self,
        id: &ReviewRequestId,
    ) -> Result<Option<ReviewRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn save(&self, request: ReviewRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        // Mirrors the partial unique index the SQL store relies on.
        if request.status == ReviewStatus::Pending {
            if let Some(target) = &request.target_record_id {
                let duplicate = requests.values().any(|existing| {
                    existing.id != request.id
                        && existing.status == ReviewStatus::Pending
                        && existing.target_record_id.as_ref() == Some(target)
                });
                if duplicate {
                    return Err(RepositoryError::Decode(format!(
                        "UNIQUE constraint violated: pending request exists for `{}`",
                        target.0
                    )));
                }
            }
        }
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn find_pending_for_target(
        &self,
        target: &WasteRecordId,
    ) -> Result<Option<ReviewRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .find(|request| {
                request.status == ReviewStatus::Pending
                    && request.target_record_id.as_ref() == Some(target)
            })
            .cloned())
    }

    async fn list(
        &self,
        scope: &BranchScope,
        filter: &ReviewFilter,
    ) -> Result<Vec<ReviewRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matched: Vec<ReviewRequest> = requests
            .values()
            .filter(|request| scope.permits_review(request))
            .filter(|request| {
                filter.status.map_or(true, |status| request.status == status)
                    && filter.action.map_or(true, |action| request.action == action)
                    && filter
                        .requested_by
                        .as_ref()
                        .map_or(true, |requester| &request.requested_by == requester)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use wastegate_core::domain::actor::ActorId;
    use wastegate_core::domain::branch::BranchId;
    use wastegate_core::domain::review::{
        ReviewAction, ReviewFilter, ReviewRequest, ReviewRequestId, ReviewStatus,
    };
    use wastegate_core::domain::waste::{
        ReasonCode, Unit, WasteRecord, WasteRecordFilter, WasteRecordId,
    };
    use wastegate_core::scope::BranchScope;

    use crate::repositories::{
        InMemoryReviewRequestRepository, InMemoryWasteRecordRepository, ReviewRequestRepository,
        WasteRecordRepository,
    };

    fn record(id: &str, branch: &str) -> WasteRecord {
        let now = Utc::now();
        WasteRecord {
            id: WasteRecordId(id.to_string()),
            branch_id: BranchId(branch.to_string()),
            item_name: "Rice".to_string(),
            quantity: Decimal::new(5, 0),
            unit: Unit::Kg,
            value: Decimal::new(1200, 0),
            reason_code: ReasonCode::Spoilage,
            photo_ref: None,
            occurred_on: NaiveDate::from_ymd_opt(2026, 8, 20).expect("date"),
            created_at: now,
            updated_at: now,
        }
    }

    fn request(id: &str, target: Option<&str>) -> ReviewRequest {
        let now = Utc::now();
        ReviewRequest {
            id: ReviewRequestId(id.to_string()),
            target_record_id: target.map(|t| WasteRecordId(t.to_string())),
            action: ReviewAction::Update,
            status: ReviewStatus::Pending,
            branch_id: BranchId("B1".to_string()),
            original_snapshot: None,
            proposed_snapshot: None,
            justification: Some("fix".to_string()),
            requested_by: ActorId("U-1".to_string()),
            decided_by: None,
            decision_notes: None,
            created_at: now,
            updated_at: now,
            decided_at: None,
        }
    }

    #[tokio::test]
    async fn waste_repo_round_trip_and_scoped_list() {
        let repo = InMemoryWasteRecordRepository::default();
        repo.save(record("WR-1", "B1")).await.expect("save");
        repo.save(record("WR-2", "B2")).await.expect("save");

        let found = repo.find_by_id(&WasteRecordId("WR-1".to_string())).await.expect("find");
        assert!(found.is_some());

        let scoped = repo
            .list(&BranchScope::Only(BranchId("B2".to_string())), &WasteRecordFilter::default())
            .await
            .expect("list");
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id.0, "WR-2");
    }

    #[tokio::test]
    async fn review_repo_enforces_single_pending_per_target() {
        let repo = InMemoryReviewRequestRepository::default();
        repo.save(request("RR-1", Some("WR-1"))).await.expect("first");

        let error = repo.save(request("RR-2", Some("WR-1"))).await.expect_err("duplicate");
        assert!(error.to_string().contains("UNIQUE"));

        // A decided request frees the slot.
        let mut decided = request("RR-1", Some("WR-1"));
        decided.status = ReviewStatus::Approved;
        repo.save(decided).await.expect("decide");
        repo.save(request("RR-2", Some("WR-1"))).await.expect("new pending");
    }

    #[tokio::test]
    async fn review_repo_filters_by_status() {
        let repo = InMemoryReviewRequestRepository::default();
        repo.save(request("RR-1", Some("WR-1"))).await.expect("save");
        let mut decided = request("RR-2", Some("WR-2"));
        decided.status = ReviewStatus::Rejected;
        repo.save(decided).await.expect("save");

        let pending = repo
            .list(
                &BranchScope::All,
                &ReviewFilter { status: Some(ReviewStatus::Pending), ..Default::default() },
            )
            .await
            .expect("list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.0, "RR-1");
    }
}
