// src/store/source.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::category::Category;
use crate::models::question::{Choice, SourceQuestion};
use crate::store::StoreError;

/// Boundary to whatever supplies exam questions.
///
/// The engine only ever asks for "up to `limit` questions of `category`";
/// returning fewer than requested is legal and the section simply runs
/// shorter.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch(&self, category: Category, limit: u32) -> Result<Vec<SourceQuestion>, StoreError>;
}

/// Question bank backed by the `questions` table, drawing a random sample
/// per request.
#[derive(Clone)]
pub struct PgQuestionSource {
    pool: PgPool,
}

impl PgQuestionSource {
    pub fn new(pool: PgPool) -> Self {
        PgQuestionSource { pool }
    }
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    category: String,
    prompt: String,
    options: sqlx::types::Json<Vec<String>>,
    correct_option: String,
    explanation: Option<String>,
    tag: Option<String>,
}

impl QuestionRow {
    /// Decodes the string keys. A row with an unknown category or answer
    /// key is logged and dropped rather than failing the whole batch.
    fn into_source_question(self) -> Option<SourceQuestion> {
        let category = match self.category.parse::<Category>() {
            Ok(category) => category,
            Err(e) => {
                tracing::warn!("Skipping question {}: {}", self.id, e);
                return None;
            }
        };
        let correct_option = match self.correct_option.parse::<Choice>() {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!("Skipping question {}: {}", self.id, e);
                return None;
            }
        };

        Some(SourceQuestion {
            global_id: self.id,
            category,
            prompt: self.prompt,
            options: self.options.0,
            correct_option,
            explanation: self.explanation,
            tag: self.tag,
        })
    }
}

#[async_trait]
impl QuestionSource for PgQuestionSource {
    async fn fetch(&self, category: Category, limit: u32) -> Result<Vec<SourceQuestion>, StoreError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, category, prompt, options, correct_option, explanation, tag
            FROM questions
            WHERE category = $1
            ORDER BY RANDOM()
            LIMIT $2
            "#,
        )
        .bind(category.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(QuestionRow::into_source_question)
            .collect())
    }
}
