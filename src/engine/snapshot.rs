// src/engine/snapshot.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::session::Phase;
use crate::engine::timer::SectionTimer;
use crate::models::answer::AnswerRecord;
use crate::models::question::{Choice, Question};
use crate::models::score::ExamScore;

/// Everything needed to rebuild an engine after a process restart.
///
/// Written through on every answer, navigation step and timer tick; read
/// once when an engine is constructed from it. The persisted remaining
/// time is authoritative on resume, so time away from the exam is not
/// charged against the section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user_id: i64,
    pub timed: bool,
    pub session_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub phase: Phase,
    pub current_section: usize,
    pub current_question: usize,
    pub section_caches: BTreeMap<usize, Vec<Question>>,
    pub all_questions: Vec<Question>,
    pub answers: HashMap<i64, Choice>,
    pub completed_sections: BTreeSet<usize>,
    pub pending_records: Vec<AnswerRecord>,
    pub timer: SectionTimer,
    pub next_question_id: i64,
    pub score: Option<ExamScore>,
}

/// Local durable store for snapshots: one JSON document per user, named
/// `<user_id>.json` under the configured directory.
///
/// Writes are last-write-wins and synchronous; the documents are small
/// and the write sits on paths that already cross the filesystem.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotStore { dir: dir.into() }
    }

    fn path_for(&self, user_id: i64) -> PathBuf {
        self.dir.join(format!("{}.json", user_id))
    }

    /// Reads the snapshot for a user. A missing or corrupt document reads
    /// as "nothing to resume"; corruption is logged and the file is left
    /// for the next start to overwrite.
    pub fn load(&self, user_id: i64) -> Option<SessionSnapshot> {
        let raw = match fs::read_to_string(self.path_for(user_id)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read session snapshot for user {}: {}", user_id, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(
                    "Discarding corrupt session snapshot for user {}: {}",
                    user_id,
                    e
                );
                None
            }
        }
    }

    /// Writes the current state through to disk. Failures are logged and
    /// swallowed; the in-memory engine stays authoritative for the
    /// running process.
    pub fn save(&self, snapshot: &SessionSnapshot) {
        if let Err(e) = self.try_save(snapshot) {
            tracing::warn!(
                "Failed to persist session snapshot for user {}: {}",
                snapshot.user_id,
                e
            );
        }
    }

    fn try_save(&self, snapshot: &SessionSnapshot) -> Result<(), Box<dyn std::error::Error>> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec(snapshot)?;
        fs::write(self.path_for(snapshot.user_id), data)?;
        Ok(())
    }

    /// Drops the snapshot for a user, if any.
    pub fn clear(&self, user_id: i64) {
        if let Err(e) = fs::remove_file(self.path_for(user_id)) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    "Failed to remove session snapshot for user {}: {}",
                    user_id,
                    e
                );
            }
        }
    }
}
