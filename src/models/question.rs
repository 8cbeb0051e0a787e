// src/models/question.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::category::Category;

/// One of the four answer options of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored answer key is not one of A-D.
#[derive(Debug)]
pub struct UnknownChoice(pub String);

impl fmt::Display for UnknownChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown choice key '{}'", self.0)
    }
}

impl std::error::Error for UnknownChoice {}

impl FromStr for Choice {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Choice::A),
            "B" => Ok(Choice::B),
            "C" => Ok(Choice::C),
            "D" => Ok(Choice::D),
            other => Err(UnknownChoice(other.to_string())),
        }
    }
}

/// A question as delivered by the question bank, before the engine has
/// stamped session-local identity onto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceQuestion {
    pub global_id: i64,
    pub category: Category,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: Choice,
    pub explanation: Option<String>,
    pub tag: Option<String>,
}

/// A question owned by a running exam session.
///
/// * `question_id` is unique within the session and is the key the client
///   navigates and answers by.
/// * `global_id` is the bank row the question came from; answer statistics
///   are recorded against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: i64,
    pub global_id: i64,
    pub category: Category,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: Choice,
    pub explanation: Option<String>,
    pub tag: Option<String>,
    pub section_index: usize,
}
