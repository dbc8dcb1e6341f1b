//! Rate table persistence: atomic per-category upsert and ordered listing.
//!
//! The `rates.category` column carries a UNIQUE constraint, and the upsert is
//! a single `INSERT … ON CONFLICT DO UPDATE`, so concurrent upserts on one
//! category resolve last-writer-wins without ever producing a second row.

use super::{Category, Database};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

impl Database {
    /// Insert or replace the rate for `category`.
    ///
    /// Returns the stored row and whether it was newly created. `xmax = 0`
    /// holds only for tuples inserted by this statement.
    pub async fn upsert_rate(
        &self,
        category: &str,
        amount: Decimal,
    ) -> Result<(Category, bool), sqlx::Error> {
        let (category, amount, updated_at, created): (String, Decimal, DateTime<Utc>, bool) =
            sqlx::query_as(
                "INSERT INTO rates (category, amount, updated_at)
                 VALUES ($1, $2, NOW())
                 ON CONFLICT (category) DO UPDATE SET
                   amount = EXCLUDED.amount, updated_at = NOW()
                 RETURNING category, amount, updated_at, (xmax = 0) AS created",
            )
            .bind(category)
            .bind(amount)
            .fetch_one(&self.pool)
            .await?;
        Ok((
            Category {
                category,
                amount,
                updated_at,
            },
            created,
        ))
    }

    /// All rates, ordered by category ascending.
    pub async fn get_rates(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT category, amount, updated_at FROM rates ORDER BY category ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Rate for a single category, if one is stored.
    pub async fn get_rate(&self, category: &str) -> Result<Option<Decimal>, sqlx::Error> {
        sqlx::query_scalar("SELECT amount FROM rates WHERE category = $1")
            .bind(category)
            .fetch_optional(&self.pool)
            .await
    }
}
