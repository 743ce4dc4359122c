use wastegate_core::domain::waste::{WasteRecord, WasteRecordFilter, WasteRecordId};
use wastegate_core::scope::BranchScope;

use super::codec::{reason_as_str, row_to_waste_record, unit_as_str, WASTE_COLUMNS};
use super::{RepositoryError, WasteRecordRepository};
use crate::DbPool;

pub struct SqlWasteRecordRepository {
    pool: DbPool,
}

impl SqlWasteRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl WasteRecordRepository for SqlWasteRecordRepository {
    async fn find_by_id(
        &self,
        id: &WasteRecordId,
    ) -> Result<Option<WasteRecord>, RepositoryError> {
        let sql = format!("SELECT {WASTE_COLUMNS} FROM waste_record WHERE id = ?");
        let row = sqlx::query(&sql).bind(&id.0).fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => Ok(Some(row_to_waste_record(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: WasteRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO waste_record (id, branch_id, item_name, quantity, unit, value,
                                       reason_code, photo_ref, occurred_on, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 branch_id = excluded.branch_id,
                 item_name = excluded.item_name,
                 quantity = excluded.quantity,
                 unit = excluded.unit,
                 value = excluded.value,
                 reason_code = excluded.reason_code,
                 photo_ref = excluded.photo_ref,
                 occurred_on = excluded.occurred_on,
                 updated_at = excluded.updated_at",
        )
        .bind(&record.id.0)
        .bind(&record.branch_id.0)
        .bind(&record.item_name)
        .bind(record.quantity.to_string())
        .bind(unit_as_str(record.unit))
        .bind(record.value.to_string())
        .bind(reason_as_str(record.reason_code))
        .bind(&record.photo_ref)
        .bind(record.occurred_on.to_string())
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &WasteRecordId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM waste_record WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        scope: &BranchScope,
        filter: &WasteRecordFilter,
    ) -> Result<Vec<WasteRecord>, RepositoryError> {
        let mut sql = format!("SELECT {WASTE_COLUMNS} FROM waste_record WHERE 1 = 1");
        if matches!(scope, BranchScope::Only(_)) {
            sql.push_str(" AND branch_id = ?");
        }
        if filter.reason_code.is_some() {
            sql.push_str(" AND reason_code = ?");
        }
        if filter.occurred_from.is_some() {
            sql.push_str(" AND occurred_on >= ?");
        }
        if filter.occurred_to.is_some() {
            sql.push_str(" AND occurred_on <= ?");
        }
        sql.push_str(" ORDER BY occurred_on DESC, created_at DESC");

        let mut query = sqlx::query(&sql);
        if let BranchScope::Only(branch) = scope {
            query = query.bind(branch.0.clone());
        }
        if let Some(reason) = filter.reason_code {
            query = query.bind(reason_as_str(reason));
        }
        if let Some(from) = filter.occurred_from {
            query = query.bind(from.to_string());
        }
        if let Some(to) = filter.occurred_to {
            query = query.bind(to.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_waste_record).collect::<Result<Vec<_>, _>>()
    }
}
