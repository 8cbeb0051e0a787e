use crate::config::Config;
use crate::engine::catalog::Section;
use crate::engine::session::ExamEngine;
use crate::engine::snapshot::SnapshotStore;
use crate::store::gateway::PersistenceGateway;
use crate::store::source::QuestionSource;
use axum::extract::FromRef;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Live engines, one per user. Each engine sits behind its own mutex so
/// handler calls and the tick driver of that session take turns.
pub type SessionMap = Arc<RwLock<HashMap<i64, Arc<Mutex<ExamEngine>>>>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionMap,
    pub source: Arc<dyn QuestionSource>,
    pub gateway: Arc<dyn PersistenceGateway>,
    pub snapshots: SnapshotStore,
    pub catalog: Arc<Vec<Section>>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<dyn PersistenceGateway> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.gateway)
    }
}
