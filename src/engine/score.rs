// src/engine/score.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::models::category::Category;
use crate::models::question::{Choice, Question};
use crate::models::score::{CategoryScore, ExamScore, ReviewItem};

/// Reduces the presented questions and the collected answers into the
/// final report.
///
/// Pure with respect to its inputs: no clock, no store, no mutation. An
/// unanswered question counts as incorrect. Every presented question
/// lands in exactly one category bucket and one review item, so the
/// category totals always sum to the overall total.
pub fn calculate_score(
    questions: &[Question],
    answers: &HashMap<i64, Choice>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> ExamScore {
    let mut correct = 0u32;
    let mut buckets: BTreeMap<Category, (u32, u32)> = BTreeMap::new();
    let mut review = Vec::with_capacity(questions.len());

    for question in questions {
        let user_answer = answers.get(&question.question_id).copied();
        let is_correct = user_answer == Some(question.correct_option);
        if is_correct {
            correct += 1;
        }

        let bucket = buckets.entry(question.category).or_insert((0, 0));
        bucket.0 += 1;
        if is_correct {
            bucket.1 += 1;
        }

        review.push(ReviewItem {
            question_id: question.question_id,
            global_id: question.global_id,
            section_index: question.section_index,
            category: question.category,
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            correct_option: question.correct_option,
            explanation: question.explanation.clone(),
            user_answer,
        });
    }

    let total = questions.len() as u32;
    let category_scores = buckets
        .into_iter()
        .map(|(category, (cat_total, cat_correct))| {
            (
                category,
                CategoryScore {
                    total: cat_total,
                    correct: cat_correct,
                    percentage: percentage(cat_correct, cat_total),
                },
            )
        })
        .collect();

    // Whole elapsed seconds; sub-second remainders are dropped.
    let time_spent_secs = (finished_at - started_at).num_seconds().max(0);

    ExamScore {
        total,
        correct,
        incorrect: total - correct,
        percentage: percentage(correct, total),
        time_spent_secs,
        category_scores,
        review,
    }
}

/// Rounded integer percentage; an empty denominator scores zero.
fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}
