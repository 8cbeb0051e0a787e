// src/engine/session.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::engine::buffer::AnswerBuffer;
use crate::engine::catalog::Section;
use crate::engine::score::calculate_score;
use crate::engine::snapshot::{SessionSnapshot, SnapshotStore};
use crate::engine::timer::{SectionTimer, TickOutcome};
use crate::models::answer::AnswerRecord;
use crate::models::exam::{ExamStateView, OverviewEntry, QuestionView};
use crate::models::question::{Choice, Question};
use crate::models::score::ExamScore;
use crate::store::gateway::PersistenceGateway;
use crate::store::source::QuestionSource;

/// Lifecycle phase of one exam session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    SectionActive,
    SectionTransition,
    Finished,
}

/// What closed a section out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionTrigger {
    Advance,
    Timeout,
}

/// Rejections the engine hands back to its caller. Failures of the
/// remote collaborators never appear here; those are logged and absorbed
/// where they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The target question sits in a completed, locked section.
    SectionLocked { section_index: usize },
    /// The question is not part of this session (sections that have not
    /// been entered yet have no questions to jump to).
    UnknownQuestion { question_id: i64 },
    /// The operation needs an active section.
    NotActive { phase: Phase },
    /// The current section has no question at the cursor.
    NoQuestion,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::SectionLocked { section_index } => {
                write!(f, "Section {} is completed and locked", section_index)
            }
            EngineError::UnknownQuestion { question_id } => {
                write!(f, "Question {} is not part of this exam", question_id)
            }
            EngineError::NotActive { phase } => {
                write!(f, "No active section (phase is {:?})", phase)
            }
            EngineError::NoQuestion => write!(f, "The current section has no question here"),
        }
    }
}

impl std::error::Error for EngineError {}

/// State machine for one user's mock exam.
///
/// The engine is single-threaded by construction: the HTTP layer puts it
/// behind a per-user async mutex, so handler calls and the once-a-second
/// tick driver take turns. Every mutation writes the snapshot through so
/// a process restart resumes exactly where the user left off.
pub struct ExamEngine {
    user_id: i64,
    timed: bool,
    catalog: Arc<Vec<Section>>,
    source: Arc<dyn QuestionSource>,
    gateway: Arc<dyn PersistenceGateway>,
    snapshots: SnapshotStore,

    phase: Phase,
    session_id: Option<i64>,
    started_at: DateTime<Utc>,
    current_section: usize,
    current_question: usize,
    section_caches: BTreeMap<usize, Vec<Question>>,
    all_questions: Vec<Question>,
    answers: HashMap<i64, Choice>,
    completed_sections: BTreeSet<usize>,
    buffer: AnswerBuffer,
    timer: SectionTimer,
    next_question_id: i64,
    score: Option<ExamScore>,
}

impl ExamEngine {
    pub fn new(
        user_id: i64,
        timed: bool,
        catalog: Arc<Vec<Section>>,
        source: Arc<dyn QuestionSource>,
        gateway: Arc<dyn PersistenceGateway>,
        snapshots: SnapshotStore,
    ) -> Self {
        ExamEngine {
            user_id,
            timed,
            catalog,
            source,
            gateway,
            snapshots,
            phase: Phase::NotStarted,
            session_id: None,
            started_at: Utc::now(),
            current_section: 0,
            current_question: 0,
            section_caches: BTreeMap::new(),
            all_questions: Vec::new(),
            answers: HashMap::new(),
            completed_sections: BTreeSet::new(),
            buffer: AnswerBuffer::new(),
            timer: SectionTimer::disabled(),
            next_question_id: 1,
            score: None,
        }
    }

    /// Rebuilds an engine from a persisted snapshot. The persisted
    /// remaining time is taken as-is; time spent away is not charged.
    pub fn resume(
        snapshot: SessionSnapshot,
        catalog: Arc<Vec<Section>>,
        source: Arc<dyn QuestionSource>,
        gateway: Arc<dyn PersistenceGateway>,
        snapshots: SnapshotStore,
    ) -> Self {
        tracing::info!(
            "Resuming exam for user {} in section {} (phase {:?})",
            snapshot.user_id,
            snapshot.current_section,
            snapshot.phase
        );
        ExamEngine {
            user_id: snapshot.user_id,
            timed: snapshot.timed,
            catalog,
            source,
            gateway,
            snapshots,
            phase: snapshot.phase,
            session_id: snapshot.session_id,
            started_at: snapshot.started_at,
            current_section: snapshot.current_section,
            current_question: snapshot.current_question,
            section_caches: snapshot.section_caches,
            all_questions: snapshot.all_questions,
            answers: snapshot.answers,
            completed_sections: snapshot.completed_sections,
            buffer: AnswerBuffer::from_records(snapshot.pending_records),
            timer: snapshot.timer,
            next_question_id: snapshot.next_question_id,
            score: snapshot.score,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn timed(&self) -> bool {
        self.timed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> Option<&ExamScore> {
        self.score.as_ref()
    }

    /// Opens a fresh session: resets every cursor and buffer, registers
    /// the session with the gateway and brings the first section into
    /// play. Any previous state of this engine is discarded.
    pub async fn start(&mut self) {
        self.phase = Phase::NotStarted;
        self.session_id = None;
        self.started_at = Utc::now();
        self.current_section = 0;
        self.current_question = 0;
        self.section_caches.clear();
        self.all_questions.clear();
        self.answers.clear();
        self.completed_sections.clear();
        self.buffer = AnswerBuffer::new();
        self.timer = SectionTimer::disabled();
        self.next_question_id = 1;
        self.score = None;

        match self.gateway.create_session(self.user_id, self.started_at).await {
            Ok(session_id) => self.session_id = Some(session_id),
            Err(e) => {
                // The exam still runs; only the remote session row is missing.
                tracing::warn!("Failed to open exam session for user {}: {}", self.user_id, e);
            }
        }

        self.enter_section(0).await;
        tracing::info!(
            "User {} started a mock exam (session {:?}, timed: {})",
            self.user_id,
            self.session_id,
            self.timed
        );
        self.save_snapshot();
    }

    /// Records an answer for the question under the cursor: grades it,
    /// overwrites any earlier pick in the answer map and appends a record
    /// to the flush buffer.
    pub fn select_answer(&mut self, choice: Choice) -> Result<(), EngineError> {
        if self.phase != Phase::SectionActive {
            return Err(EngineError::NotActive { phase: self.phase });
        }
        let question = match self.current_question_ref() {
            Some(question) => question,
            None => return Err(EngineError::NoQuestion),
        };

        let record = AnswerRecord {
            question_global_id: question.global_id,
            category: question.category,
            chosen: choice,
            is_correct: choice == question.correct_option,
            tag: question.tag.clone(),
        };
        let question_id = question.question_id;

        self.answers.insert(question_id, choice);
        self.buffer.push(record);
        self.save_snapshot();
        Ok(())
    }

    /// Moves the cursor to the next question, or runs the section
    /// completion sequence when the section is exhausted.
    pub async fn advance(&mut self) -> Result<(), EngineError> {
        if self.phase != Phase::SectionActive {
            return Err(EngineError::NotActive { phase: self.phase });
        }

        let question_count = self.current_cache_len();
        if self.current_question + 1 < question_count {
            self.current_question += 1;
        } else {
            self.complete_section(CompletionTrigger::Advance).await;
        }
        self.save_snapshot();
        Ok(())
    }

    /// Review-sidebar navigation within the current section. Completed
    /// sections are locked forever; questions of sections not yet entered
    /// do not exist yet and read as unknown.
    pub fn jump_to(&mut self, question_id: i64) -> Result<(), EngineError> {
        if self.phase != Phase::SectionActive {
            return Err(EngineError::NotActive { phase: self.phase });
        }

        if let Some(cache) = self.section_caches.get(&self.current_section) {
            if let Some(position) = cache.iter().position(|q| q.question_id == question_id) {
                self.current_question = position;
                self.save_snapshot();
                return Ok(());
            }
        }

        for (&section_index, cache) in &self.section_caches {
            if cache.iter().any(|q| q.question_id == question_id) {
                return Err(EngineError::SectionLocked { section_index });
            }
        }

        Err(EngineError::UnknownQuestion { question_id })
    }

    /// One cooperative scheduler step: drops a second off the countdown,
    /// surfaces threshold warnings and runs the forced transition when
    /// the section expires. A no-op outside an active timed section.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::SectionActive {
            return TickOutcome::Inactive;
        }

        let outcome = self.timer.tick(&config::WARNING_THRESHOLDS_SECS);
        match outcome {
            TickOutcome::Inactive => return TickOutcome::Inactive,
            TickOutcome::Ticked { .. } => {}
            TickOutcome::Warning { threshold, remaining } => {
                tracing::info!(
                    "User {} has {}s left in section {} (crossed the {}s mark)",
                    self.user_id,
                    remaining,
                    self.current_section,
                    threshold
                );
            }
            TickOutcome::Expired => {
                tracing::info!(
                    "Section {} timer expired for user {}",
                    self.current_section,
                    self.user_id
                );
                self.complete_section(CompletionTrigger::Timeout).await;
            }
        }
        self.save_snapshot();
        outcome
    }

    /// Abandons the exam. In-memory progress and the local snapshot are
    /// discarded; whatever was already flushed to the gateway stays. The
    /// engine goes terminal so a still-scheduled tick cannot write the
    /// snapshot back.
    pub fn leave(&mut self) {
        tracing::info!("User {} left the exam", self.user_id);
        self.phase = Phase::Finished;
        self.snapshots.clear(self.user_id);
    }

    /// Client-facing projection of the whole session.
    pub fn state_view(&self) -> ExamStateView {
        let cache = self.section_caches.get(&self.current_section);
        let question_count = cache.map_or(0, |c| c.len());

        let question = if self.phase == Phase::SectionActive {
            cache
                .and_then(|c| c.get(self.current_question))
                .map(|q| self.question_view(q))
        } else {
            None
        };

        let overview = cache.map_or_else(Vec::new, |c| {
            c.iter()
                .map(|q| OverviewEntry {
                    question_id: q.question_id,
                    answered: self.answers.contains_key(&q.question_id),
                })
                .collect()
        });

        let remaining_secs = (self.phase == Phase::SectionActive && self.timer.enabled())
            .then(|| self.timer.remaining());

        ExamStateView {
            user_id: self.user_id,
            phase: self.phase,
            session_id: self.session_id,
            timed: self.timed,
            section_index: self.current_section,
            section_name: self
                .catalog
                .get(self.current_section)
                .map_or_else(String::new, |s| s.name.clone()),
            section_count: self.catalog.len(),
            question_index: self.current_question,
            question_count,
            question,
            remaining_secs,
            warned_thresholds: self.timer.warned_thresholds(),
            completed_sections: self.completed_sections.iter().copied().collect(),
            overview,
            score: self.score.clone(),
        }
    }

    /// Projection of one question. The correct option and explanation are
    /// revealed only once the user has answered it.
    fn question_view(&self, question: &Question) -> QuestionView {
        let chosen = self.answers.get(&question.question_id).copied();
        QuestionView {
            question_id: question.question_id,
            section_index: question.section_index,
            category: question.category,
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            chosen,
            correct_option: chosen.map(|_| question.correct_option),
            explanation: if chosen.is_some() {
                question.explanation.clone()
            } else {
                None
            },
        }
    }

    fn current_question_ref(&self) -> Option<&Question> {
        self.section_caches
            .get(&self.current_section)?
            .get(self.current_question)
    }

    fn current_cache_len(&self) -> usize {
        self.section_caches
            .get(&self.current_section)
            .map_or(0, |c| c.len())
    }

    /// Brings a section into play: fetches its questions on first entry
    /// (each section is fetched once per session) and seeds the countdown.
    async fn enter_section(&mut self, index: usize) {
        self.current_section = index;
        self.current_question = 0;

        if !self.section_caches.contains_key(&index) {
            let questions = self.fetch_section(index).await;
            self.section_caches.insert(index, questions);
        }

        self.timer = if self.timed {
            SectionTimer::seed(self.catalog[index].time_limit_secs)
        } else {
            SectionTimer::disabled()
        };
        self.phase = Phase::SectionActive;
    }

    /// Draws a section's questions from the bank, pool by pool in
    /// declaration order, and stamps session-local ids onto them. A pool
    /// that fails or comes up short shrinks the section instead of
    /// blocking it.
    async fn fetch_section(&mut self, index: usize) -> Vec<Question> {
        let pools = self.catalog[index].pools();
        let source = Arc::clone(&self.source);
        let mut questions = Vec::new();

        for pool in pools {
            let batch = match source.fetch(pool.category, pool.count).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(
                        "Question fetch for {} failed, section {} continues without this pool: {}",
                        pool.category,
                        index,
                        e
                    );
                    Vec::new()
                }
            };
            if (batch.len() as u32) < pool.count {
                tracing::warn!(
                    "Pool {} delivered {} of {} requested questions",
                    pool.category,
                    batch.len(),
                    pool.count
                );
            }

            for source_question in batch {
                let question_id = self.next_question_id;
                self.next_question_id += 1;
                questions.push(Question {
                    question_id,
                    global_id: source_question.global_id,
                    category: source_question.category,
                    prompt: source_question.prompt,
                    options: source_question.options,
                    correct_option: source_question.correct_option,
                    explanation: source_question.explanation,
                    tag: source_question.tag,
                    section_index: index,
                });
            }
        }

        questions
    }

    /// The completion sequence shared by manual advance and timer expiry:
    /// lock the section, merge its questions into the cumulative list,
    /// flush the answer buffer, then enter the next section or finish.
    /// Idempotent per section, so a race between the two triggers cannot
    /// complete the same section twice.
    async fn complete_section(&mut self, trigger: CompletionTrigger) {
        let index = self.current_section;
        if self.completed_sections.contains(&index) {
            return;
        }

        self.phase = Phase::SectionTransition;
        self.completed_sections.insert(index);
        self.merge_section_questions(index);
        self.flush_buffer().await;
        tracing::info!(
            "User {} completed section {} ({:?})",
            self.user_id,
            index,
            trigger
        );

        if index + 1 < self.catalog.len() {
            self.enter_section(index + 1).await;
        } else {
            self.finish().await;
        }
    }

    /// Folds a completed section's questions into the cumulative list.
    /// Merge key is the session-local question id; a later entry for the
    /// same id wins.
    fn merge_section_questions(&mut self, index: usize) {
        let Some(cache) = self.section_caches.get(&index) else {
            return;
        };
        for question in cache {
            match self
                .all_questions
                .iter_mut()
                .find(|existing| existing.question_id == question.question_id)
            {
                Some(existing) => *existing = question.clone(),
                None => self.all_questions.push(question.clone()),
            }
        }
    }

    /// Pushes buffered records through the gateway one by one. A failed
    /// record is logged and skipped so one bad row never blocks the
    /// transition or the rest of the batch.
    async fn flush_buffer(&mut self) {
        let records = self.buffer.drain();
        if records.is_empty() {
            return;
        }

        let gateway = Arc::clone(&self.gateway);
        let count = records.len();
        for record in records {
            if let Err(e) = gateway.upsert_answer(self.user_id, &record).await {
                tracing::warn!(
                    "Skipping answer record for question {} of user {}: {}",
                    record.question_global_id,
                    self.user_id,
                    e
                );
            }
        }
        tracing::debug!("Flushed {} answer records for user {}", count, self.user_id);
    }

    /// The terminal transition: reduce everything into the final score,
    /// close the remote session and bank the study time for today.
    async fn finish(&mut self) {
        let finished_at = Utc::now();
        let score = calculate_score(&self.all_questions, &self.answers, self.started_at, finished_at);
        let duration_secs = score.time_spent_secs;

        if let Some(session_id) = self.session_id {
            if let Err(e) = self
                .gateway
                .close_session(session_id, finished_at, duration_secs)
                .await
            {
                tracing::warn!("Failed to close exam session {}: {}", session_id, e);
            }
        }
        if let Err(e) = self
            .gateway
            .upsert_daily_time(self.user_id, finished_at.date_naive(), duration_secs)
            .await
        {
            tracing::warn!("Failed to record study time for user {}: {}", self.user_id, e);
        }

        tracing::info!(
            "User {} finished the exam: {}/{} correct in {}s",
            self.user_id,
            score.correct,
            score.total,
            duration_secs
        );
        self.score = Some(score);
        self.phase = Phase::Finished;
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user_id,
            timed: self.timed,
            session_id: self.session_id,
            started_at: self.started_at,
            phase: self.phase,
            current_section: self.current_section,
            current_question: self.current_question,
            section_caches: self.section_caches.clone(),
            all_questions: self.all_questions.clone(),
            answers: self.answers.clone(),
            completed_sections: self.completed_sections.clone(),
            pending_records: self.buffer.records().to_vec(),
            timer: self.timer.clone(),
            next_question_id: self.next_question_id,
            score: self.score.clone(),
        }
    }

    fn save_snapshot(&self) {
        self.snapshots.save(&self.snapshot());
    }
}
