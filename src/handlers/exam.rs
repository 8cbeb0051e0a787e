// src/handlers/exam.rs

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tokio::sync::Mutex;
use validator::Validate;

use crate::engine::session::{ExamEngine, Phase};
use crate::engine::timer::TickOutcome;
use crate::error::AppError;
use crate::models::exam::{AnswerRequest, JumpRequest, StartExamRequest};
use crate::state::AppState;

/// POST /api/exam/start
///
/// Opens a fresh mock exam for the user, replacing any live session and
/// its snapshot. Returns 201 with the initial state view.
pub async fn start_exam(
    State(state): State<AppState>,
    Json(payload): Json<StartExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut engine = ExamEngine::new(
        payload.user_id,
        payload.timed,
        Arc::clone(&state.catalog),
        Arc::clone(&state.source),
        Arc::clone(&state.gateway),
        state.snapshots.clone(),
    );
    engine.start().await;
    let view = engine.state_view();

    let engine = Arc::new(Mutex::new(engine));
    if payload.timed {
        spawn_ticker(payload.user_id, &engine);
    }
    // Dropping a replaced engine here also strands its ticker, which then
    // fails its weak upgrade and exits.
    state
        .sessions
        .write()
        .await
        .insert(payload.user_id, engine);

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/exam/{user_id}
///
/// Current state of the user's exam; resumes from the snapshot if the
/// process restarted since the exam began.
pub async fn exam_state(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let engine = resolve_engine(&state, user_id).await?;
    let view = engine.lock().await.state_view();
    Ok(Json(view))
}

/// POST /api/exam/{user_id}/answer
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let engine = resolve_engine(&state, user_id).await?;
    let mut engine = engine.lock().await;
    engine.select_answer(payload.choice)?;
    Ok(Json(engine.state_view()))
}

/// POST /api/exam/{user_id}/advance
///
/// Next question, or the section-completion sequence when the current
/// section is exhausted.
pub async fn advance(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let engine = resolve_engine(&state, user_id).await?;
    let mut engine = engine.lock().await;
    engine.advance().await?;
    Ok(Json(engine.state_view()))
}

/// POST /api/exam/{user_id}/jump
pub async fn jump(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<JumpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let engine = resolve_engine(&state, user_id).await?;
    let mut engine = engine.lock().await;
    engine.jump_to(payload.question_id)?;
    Ok(Json(engine.state_view()))
}

/// POST /api/exam/{user_id}/leave
///
/// Abandons the exam: the live engine and the snapshot are discarded,
/// already-flushed answer statistics stay.
pub async fn leave_exam(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state.sessions.write().await.remove(&user_id);
    match removed {
        Some(engine) => engine.lock().await.leave(),
        // No live engine; still drop any resumable snapshot on disk.
        None => state.snapshots.clear(user_id),
    }
    Ok(Json(json!({ "left": true })))
}

/// GET /api/exam/{user_id}/result
///
/// The final score. 409 until the exam has actually finished.
pub async fn exam_result(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let engine = resolve_engine(&state, user_id).await?;
    let engine = engine.lock().await;
    match engine.score() {
        Some(score) => Ok(Json(score.clone())),
        None => Err(AppError::Conflict("Exam is not finished yet".to_string())),
    }
}

/// Looks up the live engine for a user, falling back to the persisted
/// snapshot when the process restarted mid-exam. The snapshot is read
/// once, at engine construction.
async fn resolve_engine(
    state: &AppState,
    user_id: i64,
) -> Result<Arc<Mutex<ExamEngine>>, AppError> {
    if let Some(engine) = state.sessions.read().await.get(&user_id) {
        return Ok(Arc::clone(engine));
    }

    let Some(snapshot) = state.snapshots.load(user_id) else {
        return Err(AppError::NotFound(format!(
            "No exam in progress for user {}",
            user_id
        )));
    };

    let mut sessions = state.sessions.write().await;
    // Another request may have resumed this user while we read disk.
    if let Some(engine) = sessions.get(&user_id) {
        return Ok(Arc::clone(engine));
    }

    let engine = ExamEngine::resume(
        snapshot,
        Arc::clone(&state.catalog),
        Arc::clone(&state.source),
        Arc::clone(&state.gateway),
        state.snapshots.clone(),
    );
    let needs_ticker = engine.timed() && engine.phase() == Phase::SectionActive;
    let engine = Arc::new(Mutex::new(engine));
    if needs_ticker {
        spawn_ticker(user_id, &engine);
    }
    sessions.insert(user_id, Arc::clone(&engine));
    Ok(engine)
}

/// Drives the per-second countdown of one session. Each step takes the
/// session lock, so expiry and user actions serialize; the task exits
/// once the engine reports an inactive tick or the session is dropped.
fn spawn_ticker(user_id: i64, engine: &Arc<Mutex<ExamEngine>>) {
    let weak = Arc::downgrade(engine);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let Some(engine) = weak.upgrade() else { break };
            let outcome = engine.lock().await.tick().await;
            if outcome == TickOutcome::Inactive {
                break;
            }
        }
        tracing::debug!("Ticker for user {} stopped", user_id);
    });
}
