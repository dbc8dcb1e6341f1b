//! Production entry persistence: insert, filtered listing, hard delete.
//!
//! Listing builds its WHERE clause at runtime from whichever `EntryFilter`
//! fields are set. The sort direction is whitelist-validated by
//! `EntryFilter::safe_sort_dir`; every value is bound, never interpolated.

use super::{Database, EntryFilter, NewEntry, ProductionEntry};
use uuid::Uuid;

const ENTRY_COLUMNS: &str = "id, worker_id, category, quantity, recorded_at, recorded_by, created_at";

impl Database {
    pub async fn insert_entry(&self, entry: &NewEntry) -> Result<ProductionEntry, sqlx::Error> {
        let sql = format!(
            "INSERT INTO entries (id, worker_id, category, quantity, recorded_at, recorded_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             RETURNING {ENTRY_COLUMNS}"
        );
        sqlx::query_as::<_, ProductionEntry>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.worker_id)
            .bind(&entry.category)
            .bind(entry.quantity)
            .bind(entry.recorded_at)
            .bind(&entry.recorded_by)
            .fetch_one(&self.pool)
            .await
    }

    /// Query entries with optional worker and inclusive time bounds.
    pub async fn get_entries_filtered(
        &self,
        filter: &EntryFilter,
    ) -> Result<Vec<ProductionEntry>, sqlx::Error> {
        let mut conditions = Vec::new();
        let mut param_idx = 1u32;

        if filter.worker_id.is_some() {
            conditions.push(format!("worker_id = ${}", param_idx));
            param_idx += 1;
        }
        if filter.start.is_some() {
            conditions.push(format!("recorded_at >= ${}", param_idx));
            param_idx += 1;
        }
        if filter.end.is_some() {
            conditions.push(format!("recorded_at <= ${}", param_idx));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit_clause = if filter.limit.is_some() {
            format!("LIMIT ${}", param_idx)
        } else {
            String::new()
        };

        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries {} ORDER BY recorded_at {}, id {} {}",
            where_clause,
            filter.safe_sort_dir(),
            filter.safe_sort_dir(),
            limit_clause,
        );

        let mut query = sqlx::query_as::<_, ProductionEntry>(&sql);
        if let Some(worker_id) = filter.worker_id {
            query = query.bind(worker_id);
        }
        if let Some(start) = filter.start {
            query = query.bind(start);
        }
        if let Some(end) = filter.end {
            query = query.bind(end);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit.max(0));
        }
        query.fetch_all(&self.pool).await
    }

    /// Permanently remove an entry. Returns false if no such entry existed.
    pub async fn delete_entry(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
