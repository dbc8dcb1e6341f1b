//! Payout records: created pending, later marked paid.

use super::{Database, NewPayout, Payout};
use uuid::Uuid;

const PAYOUT_COLUMNS: &str = "id, worker_id, period_start, period_end, amount, status, method,
                              gateway_ref, created_at, updated_at";

impl Database {
    pub async fn insert_payout(&self, payout: &NewPayout) -> Result<Payout, sqlx::Error> {
        let sql = format!(
            "INSERT INTO payouts (id, worker_id, period_start, period_end, amount, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 'pending', NOW(), NOW())
             RETURNING {PAYOUT_COLUMNS}"
        );
        sqlx::query_as::<_, Payout>(&sql)
            .bind(Uuid::new_v4())
            .bind(payout.worker_id)
            .bind(payout.period_start)
            .bind(payout.period_end)
            .bind(payout.amount)
            .fetch_one(&self.pool)
            .await
    }

    /// All payouts, newest first.
    pub async fn get_payouts(&self) -> Result<Vec<Payout>, sqlx::Error> {
        let sql = format!("SELECT {PAYOUT_COLUMNS} FROM payouts ORDER BY created_at DESC, id");
        sqlx::query_as::<_, Payout>(&sql)
            .fetch_all(&self.pool)
            .await
    }

    /// Mark a payout paid. Returns `None` if no such payout exists.
    pub async fn mark_payout_paid(
        &self,
        id: Uuid,
        method: &str,
        gateway_ref: Option<&str>,
    ) -> Result<Option<Payout>, sqlx::Error> {
        let sql = format!(
            "UPDATE payouts SET status = 'paid', method = $2, gateway_ref = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {PAYOUT_COLUMNS}"
        );
        sqlx::query_as::<_, Payout>(&sql)
            .bind(id)
            .bind(method)
            .bind(gateway_ref)
            .fetch_optional(&self.pool)
            .await
    }
}
