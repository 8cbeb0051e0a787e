// src/models/answer.rs

use serde::{Deserialize, Serialize};

use crate::models::category::Category;
use crate::models::question::Choice;

/// One graded answer, produced the moment the user picks an option and
/// held in the answer buffer until a section boundary flushes it.
///
/// Keyed remotely by (user, `question_global_id`); re-answering the same
/// question appends another record and the upsert makes the last one win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_global_id: i64,
    pub category: Category,
    pub chosen: Choice,
    pub is_correct: bool,
    pub tag: Option<String>,
}
