use wastegate_core::domain::branch::{Branch, BranchId};

use super::codec::row_to_branch;
use super::{BranchRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBranchRepository {
    pool: DbPool,
}

impl SqlBranchRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BranchRepository for SqlBranchRepository {
    async fn find_by_id(&self, id: &BranchId) -> Result<Option<Branch>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, location, created_at, updated_at FROM branch WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_branch(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, branch: Branch) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO branch (id, name, location, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 location = excluded.location,
                 updated_at = excluded.updated_at",
        )
        .bind(&branch.id.0)
        .bind(&branch.name)
        .bind(&branch.location)
        .bind(branch.created_at.to_rfc3339())
        .bind(branch.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Branch>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, name, location, created_at, updated_at FROM branch ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_branch).collect::<Result<Vec<_>, _>>()
    }
}
