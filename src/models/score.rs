// src/models/score.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::category::Category;
use crate::models::question::Choice;

/// Per-category slice of the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub total: u32,
    pub correct: u32,
    pub percentage: u32,
}

/// One question as it appears in the post-exam review list, with the
/// user's answer (or lack of one) next to the correct option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub question_id: i64,
    pub global_id: i64,
    pub section_index: usize,
    pub category: Category,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: Choice,
    pub explanation: Option<String>,
    pub user_answer: Option<Choice>,
}

/// The final report of a finished exam.
///
/// Category keys are held in a `BTreeMap` so serializing the same score
/// twice yields the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamScore {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub percentage: u32,
    pub time_spent_secs: i64,
    pub category_scores: BTreeMap<Category, CategoryScore>,
    pub review: Vec<ReviewItem>,
}
