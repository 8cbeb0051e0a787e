// src/models/exam.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::session::Phase;
use crate::models::category::Category;
use crate::models::question::Choice;
use crate::models::score::ExamScore;

/// DTO for starting (or restarting) a mock exam.
#[derive(Debug, Deserialize, Validate)]
pub struct StartExamRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
    pub timed: bool,
}

/// DTO for answering the current question.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub choice: Choice,
}

/// DTO for jumping to a question from the review sidebar.
#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub question_id: i64,
}

/// The current question as shown to the client. The correct option and
/// its explanation stay hidden until the question has been answered.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub question_id: i64,
    pub section_index: usize,
    pub category: Category,
    pub prompt: String,
    pub options: Vec<String>,
    pub chosen: Option<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Sidebar entry, one per question of the current section.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewEntry {
    pub question_id: i64,
    pub answered: bool,
}

/// Full client-facing projection of one exam session.
#[derive(Debug, Clone, Serialize)]
pub struct ExamStateView {
    pub user_id: i64,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    pub timed: bool,
    pub section_index: usize,
    pub section_name: String,
    pub section_count: usize,
    pub question_index: usize,
    pub question_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_secs: Option<u32>,
    pub warned_thresholds: Vec<u32>,
    pub completed_sections: Vec<usize>,
    pub overview: Vec<OverviewEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ExamScore>,
}

/// Per-category answer tally for the progress endpoint.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryProgress {
    pub category: String,
    pub answered: i64,
    pub correct: i64,
}
