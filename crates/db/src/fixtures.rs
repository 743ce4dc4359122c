//! Deterministic seed dataset for tests and local bootstrap.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use wastegate_core::domain::actor::{Actor, ActorId, ActorRole};
use wastegate_core::domain::branch::{Branch, BranchId};
use wastegate_core::domain::waste::{ReasonCode, Unit, WasteRecord, WasteRecordId};

use crate::repositories::{
    ActorRepository, BranchRepository, RepositoryError, SqlActorRepository, SqlBranchRepository,
    SqlWasteRecordRepository, WasteRecordRepository,
};
use crate::DbPool;

#[derive(Clone, Debug)]
pub struct SeedDataset {
    pub branches: Vec<Branch>,
    pub admin: Actor,
    pub operators: Vec<Actor>,
    pub records: Vec<WasteRecord>,
}

impl SeedDataset {
    pub fn build() -> Self {
        let seeded_at = Utc.with_ymd_and_hms(2026, 8, 1, 6, 0, 0).single().expect("fixed instant");

        let branches = vec![
            Branch {
                id: BranchId("B1".to_string()),
                name: "Downtown".to_string(),
                location: "Riverside 12".to_string(),
                created_at: seeded_at,
                updated_at: seeded_at,
            },
            Branch {
                id: BranchId("B2".to_string()),
                name: "Uptown".to_string(),
                location: "Hillcrest 4".to_string(),
                created_at: seeded_at,
                updated_at: seeded_at,
            },
        ];

        let admin = Actor {
            id: ActorId("U-ADMIN".to_string()),
            username: "hq.admin".to_string(),
            role: ActorRole::Elevated,
            branch_id: None,
        };

        let operators = vec![
            Actor {
                id: ActorId("U-B1".to_string()),
                username: "ops.downtown".to_string(),
                role: ActorRole::Scoped,
                branch_id: Some(BranchId("B1".to_string())),
            },
            Actor {
                id: ActorId("U-B2".to_string()),
                username: "ops.uptown".to_string(),
                role: ActorRole::Scoped,
                branch_id: Some(BranchId("B2".to_string())),
            },
        ];

        let records = vec![
            WasteRecord {
                id: WasteRecordId("WR-SEED-1".to_string()),
                branch_id: BranchId("B1".to_string()),
                item_name: "Salmon fillet".to_string(),
                quantity: Decimal::new(32, 1),
                unit: Unit::Kg,
                value: Decimal::new(4800, 0),
                reason_code: ReasonCode::Spoilage,
                photo_ref: None,
                occurred_on: NaiveDate::from_ymd_opt(2026, 7, 30).expect("date"),
                created_at: seeded_at,
                updated_at: seeded_at,
            },
            WasteRecord {
                id: WasteRecordId("WR-SEED-2".to_string()),
                branch_id: BranchId("B2".to_string()),
                item_name: "Bread rolls".to_string(),
                quantity: Decimal::new(24, 0),
                unit: Unit::Pcs,
                value: Decimal::new(360, 0),
                reason_code: ReasonCode::BuffetLeftover,
                photo_ref: None,
                occurred_on: NaiveDate::from_ymd_opt(2026, 7, 31).expect("date"),
                created_at: seeded_at,
                updated_at: seeded_at,
            },
        ];

        Self { branches, admin, operators, records }
    }

    pub async fn apply(&self, pool: &DbPool) -> Result<(), RepositoryError> {
        let branches = SqlBranchRepository::new(pool.clone());
        for branch in &self.branches {
            branches.save(branch.clone()).await?;
        }

        let actors = SqlActorRepository::new(pool.clone());
        actors.save(self.admin.clone()).await?;
        for operator in &self.operators {
            actors.save(operator.clone()).await?;
        }

        let records = SqlWasteRecordRepository::new(pool.clone());
        for record in &self.records {
            records.save(record.clone()).await?;
        }

        Ok(())
    }
}

pub async fn seed(pool: &DbPool) -> Result<SeedDataset, RepositoryError> {
    let dataset = SeedDataset::build();
    dataset.apply(pool).await?;
    Ok(dataset)
}
