use wastegate_core::domain::review::{ReviewFilter, ReviewRequest, ReviewRequestId};
use wastegate_core::domain::waste::WasteRecordId;
use wastegate_core::scope::BranchScope;

use super::codec::{
    action_as_str, row_to_review_request, snapshot_to_json, status_as_str, REVIEW_COLUMNS,
};
use super::{RepositoryError, ReviewRequestRepository};
use crate::DbPool;

pub struct SqlReviewRequestRepository {
    pool: DbPool,
}

impl SqlReviewRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReviewRequestRepository for SqlReviewRequestRepository {
    async fn find_by_id(
        &self,
        id: &ReviewRequestId,
    ) -> Result<Option<ReviewRequest>, RepositoryError> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM review_request WHERE id = ?");
        let row = sqlx::query(&sql).bind(&id.0).fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => Ok(Some(row_to_review_request(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request: ReviewRequest) -> Result<(), RepositoryError> {
        let original = request.original_snapshot.as_ref().map(snapshot_to_json).transpose()?;
        let proposed = request.proposed_snapshot.as_ref().map(snapshot_to_json).transpose()?;

        sqlx::query(
            "INSERT INTO review_request (id, target_record_id, action, status, branch_id,
                                         original_snapshot, proposed_snapshot, justification,
                                         requested_by, decided_by, decision_notes,
                                         created_at, updated_at, decided_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 target_record_id = excluded.target_record_id,
                 status = excluded.status,
                 decided_by = excluded.decided_by,
                 decision_notes = excluded.decision_notes,
                 updated_at = excluded.updated_at,
                 decided_at = excluded.decided_at",
        )
        .bind(&request.id.0)
        .bind(request.target_record_id.as_ref().map(|id| id.0.as_str()))
        .bind(action_as_str(request.action))
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
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_pending_for_target(
        &self,
        target: &WasteRecordId,
    ) -> Result<Option<ReviewRequest>, RepositoryError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM review_request
             WHERE target_record_id = ? AND status = 'pending'"
        );
        let row = sqlx::query(&sql).bind(&target.0).fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => Ok(Some(row_to_review_request(r)?)),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        scope: &BranchScope,
        filter: &ReviewFilter,
    ) -> Result<Vec<ReviewRequest>, RepositoryError> {
        let mut sql = format!("SELECT {REVIEW_COLUMNS} FROM review_request WHERE 1 = 1");
        if matches!(scope, BranchScope::Only(_)) {
            sql.push_str(" AND branch_id = ?");
        }
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.action.is_some() {
            sql.push_str(" AND action = ?");
        }
        if filter.requested_by.is_some() {
            sql.push_str(" AND requested_by = ?");
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut query = sqlx::query(&sql);
        if let BranchScope::Only(branch) = scope {
            query = query.bind(branch.0.clone());
        }
        if let Some(status) = filter.status {
            query = query.bind(status_as_str(status));
        }
        if let Some(action) = filter.action {
            query = query.bind(action_as_str(action));
        }
        if let Some(requested_by) = &filter.requested_by {
            query = query.bind(requested_by.0.clone());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_review_request).collect::<Result<Vec<_>, _>>()
    }
}
