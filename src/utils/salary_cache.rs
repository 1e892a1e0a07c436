use anyhow::{Result, anyhow};
use futures::StreamExt;
use moka::future::Cache;
use sqlx::SqlitePool;
use std::time::Duration;

/// Monthly salary per user id, in front of the `users` table. Earnings
/// endpoints read it on every request; salary updates and deletes invalidate it.
#[derive(Clone)]
pub struct SalaryCache {
    inner: Cache<i64, f64>,
}

impl Default for SalaryCache {
    fn default() -> Self {
        Self::new(100_000, Duration::from_secs(3600))
    }
}

impl SalaryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// `None` when the user does not exist.
    pub async fn salary_of(&self, pool: &SqlitePool, user_id: i64) -> Result<Option<f64>, sqlx::Error> {
        if let Some(salary) = self.inner.get(&user_id).await {
            return Ok(Some(salary));
        }

        let salary = sqlx::query_scalar::<_, f64>("SELECT salary FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        if let Some(s) = salary {
            self.inner.insert(user_id, s).await;
        }
        Ok(salary)
    }

    pub async fn invalidate(&self, user_id: i64) {
        self.inner.invalidate(&user_id).await;
    }

    /// Preload every salary, streaming rows in batches.
    pub async fn warmup(&self, pool: &SqlitePool, batch_size: usize) -> Result<()> {
        let mut stream = sqlx::query_as::<_, (i64, f64)>("SELECT id, salary FROM users").fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let row = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
            batch.push(row);
            total += 1;

            if batch.len() >= batch_size {
                self.insert_batch(&batch).await;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&batch).await;
        }

        log::info!("Salary cache warmup complete: {} users", total);
        Ok(())
    }

    async fn insert_batch(&self, rows: &[(i64, f64)]) {
        let futures: Vec<_> = rows
            .iter()
            .map(|(id, salary)| self.inner.insert(*id, *salary))
            .collect();

        futures::future::join_all(futures).await;
    }
}
