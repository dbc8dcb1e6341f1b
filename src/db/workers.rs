//! Worker registry: the directory entries are resolved against.
//!
//! Deleting a worker leaves their entries in place; aggregation skips the
//! orphans instead of failing.

use super::{Database, NewWorker, Worker};
use uuid::Uuid;

impl Database {
    pub async fn insert_worker(&self, worker: &NewWorker) -> Result<Worker, sqlx::Error> {
        sqlx::query_as::<_, Worker>(
            "INSERT INTO workers (id, name, phone_number, is_active, joined_at)
             VALUES ($1, $2, $3, TRUE, NOW())
             RETURNING id, name, phone_number, is_active, joined_at",
        )
        .bind(Uuid::new_v4())
        .bind(&worker.name)
        .bind(&worker.phone_number)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_worker(&self, id: Uuid) -> Result<Option<Worker>, sqlx::Error> {
        sqlx::query_as::<_, Worker>(
            "SELECT id, name, phone_number, is_active, joined_at FROM workers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get all registered workers, newest first.
    pub async fn get_all_workers(&self) -> Result<Vec<Worker>, sqlx::Error> {
        sqlx::query_as::<_, Worker>(
            "SELECT id, name, phone_number, is_active, joined_at
             FROM workers ORDER BY joined_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Remove a worker. Returns false if no such worker existed.
    pub async fn delete_worker(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
