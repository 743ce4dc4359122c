use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use wastegate_core::domain::actor::Actor;
use wastegate_core::domain::branch::{Branch, BranchId};

use super::WorkflowError;
use crate::repositories::codec::row_to_branch;
use crate::DbPool;

/// Elevated-only branch administration. Deletion is blocked while actors
/// remain assigned to the branch.
pub struct BranchAdmin {
    pool: DbPool,
}

impl BranchAdmin {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        name: &str,
        location: &str,
    ) -> Result<Branch, WorkflowError> {
        actor.require_elevated("creating branches")?;
        if name.trim().is_empty() {
            return Err(WorkflowError::Validation("branch name must not be empty".to_string()));
        }

        let now = Utc::now();
        let branch = Branch {
            id: BranchId(Uuid::new_v4().to_string()),
            name: name.to_string(),
            location: location.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query("INSERT INTO branch (id, name, location, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
            .bind(&branch.id.0)
            .bind(&branch.name)
            .bind(&branch.location)
            .bind(branch.created_at.to_rfc3339())
            .bind(branch.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(branch)
    }

    pub async fn rename(
        &self,
        actor: &Actor,
        id: &BranchId,
        name: &str,
        location: &str,
    ) -> Result<Branch, WorkflowError> {
        actor.require_elevated("editing branches")?;
        if name.trim().is_empty() {
            return Err(WorkflowError::Validation("branch name must not be empty".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE branch SET name = ?, location = ?, updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(location)
        .bind(now.to_rfc3339())
        .bind(&id.0)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::NotFound { entity: "branch", id: id.0.clone() });
        }

        let row = sqlx::query(
            "SELECT id, name, location, created_at, updated_at FROM branch WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_one(&mut *tx)
        .await?;
        let branch = row_to_branch(&row)?;

        tx.commit().await?;
        Ok(branch)
    }

    pub async fn delete(&self, actor: &Actor, id: &BranchId) -> Result<(), WorkflowError> {
        actor.require_elevated("deleting branches")?;

        let mut tx = self.pool.begin().await?;

        let assigned = sqlx::query("SELECT COUNT(*) AS count FROM actor WHERE branch_id = ?")
            .bind(&id.0)
            .fetch_one(&mut *tx)
            .await?
            .get::<i64, _>("count");
        if assigned > 0 {
            return Err(WorkflowError::Conflict(format!(
                "branch `{}` still has {assigned} assigned actor(s)",
                id.0
            )));
        }

        let result =
            sqlx::query("DELETE FROM branch WHERE id = ?").bind(&id.0).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(WorkflowError::NotFound { entity: "branch", id: id.0.clone() });
        }

        tx.commit().await?;
        Ok(())
    }
}
