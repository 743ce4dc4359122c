use wastegate_core::domain::actor::{Actor, ActorId};

use super::codec::{role_as_str, row_to_actor};
use super::{ActorRepository, RepositoryError};
use crate::DbPool;

pub struct SqlActorRepository {
    pool: DbPool,
}

impl SqlActorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ActorRepository for SqlActorRepository {
    async fn find_by_id(&self, id: &ActorId) -> Result<Option<Actor>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, role, branch_id FROM actor WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_actor(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, actor: Actor) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO actor (id, username, role, branch_id)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 username = excluded.username,
                 role = excluded.role,
                 branch_id = excluded.branch_id",
        )
        .bind(&actor.id.0)
        .bind(&actor.username)
        .bind(role_as_str(actor.role))
        .bind(actor.branch_id.as_ref().map(|b| b.0.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
