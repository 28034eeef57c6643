//! Trigger repository for async database operations.
//!
//! Backs the postgres trigger store. Claiming uses `FOR UPDATE SKIP LOCKED`
//! so concurrent claimers never see the same row.

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use jiff_diesel::ToDiesel;

use crate::db::AsyncDbPool;
use crate::error::{AppError, DatabaseErrorConverter};
use crate::models::TriggerRow;
use crate::schema::scheduled_triggers;

/// Trigger repository holding an async connection pool.
///
/// `AsyncDbPool` is reference counted internally, so cloning is cheap.
#[derive(Clone)]
pub struct TriggerRepository {
    pool: AsyncDbPool,
}

impl TriggerRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Inserts one trigger row. Returns once the insert is committed.
    pub async fn insert(&self, row: TriggerRow) -> Result<(), AppError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(scheduled_triggers::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "insert trigger"))?;
        Ok(())
    }

    /// Deletes the row with `id` if it belongs to `group`.
    ///
    /// # Returns
    /// Number of deleted rows (0 or 1)
    pub async fn delete(&self, id: &str, group: &str) -> Result<usize, AppError> {
        use crate::schema::scheduled_triggers::dsl::*;
        let mut conn = self.pool.get().await?;

        diesel::delete(
            scheduled_triggers
                .filter(job_id.eq(id))
                .filter(job_group.eq(group)),
        )
        .execute(&mut conn)
        .await
        .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "delete trigger"))
    }

    /// Deletes every row in `group`.
    pub async fn delete_group(&self, group: &str) -> Result<usize, AppError> {
        use crate::schema::scheduled_triggers::dsl::*;
        let mut conn = self.pool.get().await?;

        diesel::delete(scheduled_triggers.filter(job_group.eq(group)))
            .execute(&mut conn)
            .await
            .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "delete trigger group"))
    }

    /// Deletes and returns up to `limit` rows due at `now`.
    ///
    /// Rows locked by another claimer are skipped rather than waited on.
    pub async fn claim_due(
        &self,
        now: jiff::Timestamp,
        limit: i64,
    ) -> Result<Vec<TriggerRow>, AppError> {
        let mut conn = self.pool.get().await?;
        let now = now.to_diesel();

        let mut rows = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let ids: Vec<String> = scheduled_triggers::table
                        .select(scheduled_triggers::job_id)
                        .filter(scheduled_triggers::trigger_time.le(now))
                        .order(scheduled_triggers::trigger_time.asc())
                        .limit(limit)
                        .for_update()
                        .skip_locked()
                        .load(conn)
                        .await?;

                    if ids.is_empty() {
                        return Ok(Vec::new());
                    }

                    diesel::delete(
                        scheduled_triggers::table.filter(scheduled_triggers::job_id.eq_any(ids)),
                    )
                    .returning(TriggerRow::as_returning())
                    .get_results(conn)
                    .await
                }
                .scope_boxed()
            })
            .await
            .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "claim due triggers"))?;

        rows.sort_by(|a, b| {
            a.trigger_time
                .to_jiff()
                .cmp(&b.trigger_time.to_jiff())
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(rows)
    }

    /// Lists rows ordered by trigger time, optionally restricted to one group.
    pub async fn list(&self, group: Option<&str>) -> Result<Vec<TriggerRow>, AppError> {
        use crate::schema::scheduled_triggers::dsl::*;
        let mut conn = self.pool.get().await?;

        let mut query = scheduled_triggers
            .select(TriggerRow::as_select())
            .order((trigger_time.asc(), job_id.asc()))
            .into_boxed();
        if let Some(group) = group {
            query = query.filter(job_group.eq(group.to_string()));
        }

        query
            .load(&mut conn)
            .await
            .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "list triggers"))
    }

    /// Counts rows, optionally restricted to one group.
    pub async fn count(&self, group: Option<&str>) -> Result<i64, AppError> {
        use crate::schema::scheduled_triggers::dsl::*;
        let mut conn = self.pool.get().await?;

        let result = match group {
            Some(group) => {
                scheduled_triggers
                    .filter(job_group.eq(group))
                    .count()
                    .get_result::<i64>(&mut conn)
                    .await
            }
            None => scheduled_triggers.count().get_result::<i64>(&mut conn).await,
        };

        result.map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "count triggers"))
    }
}
