// src/engine/buffer.rs

use serde::{Deserialize, Serialize};

use crate::models::answer::AnswerRecord;

/// Graded answers waiting for the next section boundary.
///
/// Records are appended in answer order and are invisible to the
/// persistence gateway until a flush drains them in bulk. Re-answering a
/// question appends a second record rather than replacing the first; the
/// remote upsert keyed by (user, question) makes the last one win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerBuffer {
    records: Vec<AnswerRecord>,
}

impl AnswerBuffer {
    pub fn new() -> Self {
        AnswerBuffer {
            records: Vec::new(),
        }
    }

    /// Rebuilds a buffer from records carried over in a snapshot.
    pub fn from_records(records: Vec<AnswerRecord>) -> Self {
        AnswerBuffer { records }
    }

    pub fn push(&mut self, record: AnswerRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    /// Hands the pending records over for flushing, leaving the buffer
    /// empty.
    pub fn drain(&mut self) -> Vec<AnswerRecord> {
        std::mem::take(&mut self.records)
    }
}
