// src/store/gateway.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::models::answer::AnswerRecord;
use crate::models::exam::CategoryProgress;
use crate::store::StoreError;

/// Boundary to the durable store for everything that outlives a session:
/// session rows, per-question answer statistics and daily study time.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Opens a session row and returns its id.
    async fn create_session(
        &self,
        user_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Stamps the end of a session. The end time is written at most once;
    /// a second close of the same session is a no-op.
    async fn close_session(
        &self,
        session_id: i64,
        ended_at: DateTime<Utc>,
        duration_secs: i64,
    ) -> Result<(), StoreError>;

    /// Records one graded answer, keyed by (user, question). Re-answering
    /// overwrites; it never duplicates the row.
    async fn upsert_answer(&self, user_id: i64, record: &AnswerRecord) -> Result<(), StoreError>;

    /// Adds to the per-day study-time aggregate, keyed by (user, day).
    async fn upsert_daily_time(
        &self,
        user_id: i64,
        day: NaiveDate,
        delta_secs: i64,
    ) -> Result<(), StoreError>;

    /// Per-category answer tallies accumulated by `upsert_answer`.
    async fn category_progress(&self, user_id: i64) -> Result<Vec<CategoryProgress>, StoreError>;
}

/// Postgres-backed gateway.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        PgGateway { pool }
    }
}

#[async_trait]
impl PersistenceGateway for PgGateway {
    async fn create_session(
        &self,
        user_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let session_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO exam_sessions (user_id, started_at) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(started_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session_id)
    }

    async fn close_session(
        &self,
        session_id: i64,
        ended_at: DateTime<Utc>,
        duration_secs: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE exam_sessions
            SET ended_at = $2, duration_secs = $3
            WHERE id = $1 AND ended_at IS NULL
            "#,
        )
        .bind(session_id)
        .bind(ended_at)
        .bind(duration_secs)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_answer(&self, user_id: i64, record: &AnswerRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO answer_stats (user_id, question_id, category, is_correct, tag, answered_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (user_id, question_id) DO UPDATE SET
                category = EXCLUDED.category,
                is_correct = EXCLUDED.is_correct,
                tag = EXCLUDED.tag,
                answered_at = now()
            "#,
        )
        .bind(user_id)
        .bind(record.question_global_id)
        .bind(record.category.as_str())
        .bind(record.is_correct)
        .bind(record.tag.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_daily_time(
        &self,
        user_id: i64,
        day: NaiveDate,
        delta_secs: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO daily_study_time (user_id, day, seconds)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, day) DO UPDATE SET
                seconds = daily_study_time.seconds + EXCLUDED.seconds
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(delta_secs)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn category_progress(&self, user_id: i64) -> Result<Vec<CategoryProgress>, StoreError> {
        let rows = sqlx::query_as::<_, CategoryProgress>(
            r#"
            SELECT category,
                   COUNT(*) AS answered,
                   COUNT(*) FILTER (WHERE is_correct) AS correct
            FROM answer_stats
            WHERE user_id = $1
            GROUP BY category
            ORDER BY category
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
