// tests/api_tests.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use exam_backend::config::Config;
use exam_backend::engine::catalog::Section;
use exam_backend::engine::snapshot::SnapshotStore;
use exam_backend::models::answer::AnswerRecord;
use exam_backend::models::category::Category;
use exam_backend::models::exam::CategoryProgress;
use exam_backend::models::question::{Choice, SourceQuestion};
use exam_backend::routes;
use exam_backend::state::AppState;
use exam_backend::store::StoreError;
use exam_backend::store::gateway::PersistenceGateway;
use exam_backend::store::source::QuestionSource;

/// Question bank double: always delivers the asked-for number of
/// questions, correct answer A.
#[derive(Default)]
struct StubSource {
    next_global_id: AtomicI64,
}

#[async_trait]
impl QuestionSource for StubSource {
    async fn fetch(&self, category: Category, limit: u32) -> Result<Vec<SourceQuestion>, StoreError> {
        Ok((0..limit)
            .map(|_| {
                let id = self.next_global_id.fetch_add(1, Ordering::SeqCst) + 1;
                SourceQuestion {
                    global_id: id,
                    category,
                    prompt: format!("Question {}", id),
                    options: vec![
                        "first".to_string(),
                        "second".to_string(),
                        "third".to_string(),
                        "fourth".to_string(),
                    ],
                    correct_option: Choice::A,
                    explanation: Some(format!("Explanation {}", id)),
                    tag: Some("stub".to_string()),
                }
            })
            .collect())
    }
}

/// Gateway double with the real upsert semantics, enough to feed the
/// progress endpoint.
#[derive(Default)]
struct InMemoryGateway {
    next_session_id: AtomicI64,
    answers: StdMutex<HashMap<(i64, i64), AnswerRecord>>,
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn create_session(
        &self,
        _user_id: i64,
        _started_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        Ok(self.next_session_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn close_session(
        &self,
        _session_id: i64,
        _ended_at: DateTime<Utc>,
        _duration_secs: i64,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_answer(&self, user_id: i64, record: &AnswerRecord) -> Result<(), StoreError> {
        self.answers
            .lock()
            .unwrap()
            .insert((user_id, record.question_global_id), record.clone());
        Ok(())
    }

    async fn upsert_daily_time(
        &self,
        _user_id: i64,
        _day: NaiveDate,
        _delta_secs: i64,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn category_progress(&self, user_id: i64) -> Result<Vec<CategoryProgress>, StoreError> {
        let answers = self.answers.lock().unwrap();
        let mut tallies: BTreeMap<String, (i64, i64)> = BTreeMap::new();
        for ((uid, _), record) in answers.iter() {
            if *uid != user_id {
                continue;
            }
            let entry = tallies.entry(record.category.to_string()).or_insert((0, 0));
            entry.0 += 1;
            if record.is_correct {
                entry.1 += 1;
            }
        }
        Ok(tallies
            .into_iter()
            .map(|(category, (answered, correct))| CategoryProgress {
                category,
                answered,
                correct,
            })
            .collect())
    }
}

/// Two sections of two questions each, more than enough for the flows.
fn test_catalog() -> Vec<Section> {
    vec![
        Section {
            name: "Fundamentals".to_string(),
            category: Category::Fundamentals,
            question_count: 2,
            time_limit_secs: 60,
            sub_pools: vec![],
        },
        Section {
            name: "Networking".to_string(),
            category: Category::Networking,
            question_count: 2,
            time_limit_secs: 60,
            sub_pools: vec![],
        },
    ]
}

fn temp_snapshots() -> SnapshotStore {
    let dir = std::env::temp_dir().join(format!("exam-api-tests-{}", uuid::Uuid::new_v4()));
    SnapshotStore::new(dir)
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    spawn_app_with(temp_snapshots()).await
}

/// Same, but with a caller-provided snapshot store so a second instance
/// can resume what the first one persisted.
async fn spawn_app_with(snapshots: SnapshotStore) -> String {
    let config = Config {
        database_url: "postgres://unused-in-tests".to_string(),
        snapshot_dir: "unused-in-tests".to_string(),
        rust_log: "error".to_string(),
    };

    let state = AppState {
        sessions: Arc::new(RwLock::new(HashMap::new())),
        source: Arc::new(StubSource::default()),
        gateway: Arc::new(InMemoryGateway::default()),
        snapshots,
        catalog: Arc::new(test_catalog()),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn start_exam(client: &reqwest::Client, address: &str, user_id: i64) -> serde_json::Value {
    let response = client
        .post(&format!("{}/api/exam/start", address))
        .json(&serde_json::json!({ "user_id": user_id, "timed": false }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.expect("Failed to parse response body")
}

#[tokio::test]
async fn unknown_route_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn start_returns_the_initial_state() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(&format!("{}/api/exam/start", address))
        .json(&serde_json::json!({ "user_id": 1, "timed": true }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert_eq!(body["phase"], "section_active");
    assert_eq!(body["section_index"], 0);
    assert_eq!(body["section_name"], "Fundamentals");
    assert_eq!(body["question_count"], 2);
    assert_eq!(body["remaining_secs"], 60);
    assert_eq!(body["question"]["question_id"], 1);

    // The grading stays server-side until the question is answered.
    let question = body["question"].as_object().unwrap();
    assert!(!question.contains_key("correct_option"));
    assert!(!question.contains_key("explanation"));
}

#[tokio::test]
async fn start_rejects_an_invalid_user_id() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(&format!("{}/api/exam/start", address))
        .json(&serde_json::json!({ "user_id": 0, "timed": false }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn state_of_an_unknown_user_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/api/exam/42", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_full_exam_flow() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    start_exam(&client, &address, 1).await;

    // Act: answer the first question correctly.
    let response = client
        .post(&format!("{}/api/exam/1/answer", address))
        .json(&serde_json::json!({ "choice": "A" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert_eq!(body["question"]["chosen"], "A");
    assert_eq!(body["question"]["correct_option"], "A");

    // The result is not available mid-exam.
    let response = client
        .get(&format!("{}/api/exam/1/result", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 409);

    // Advance through the rest of the paper (2 + 2 questions).
    let mut last_body = serde_json::Value::Null;
    for _ in 0..4 {
        let response = client
            .post(&format!("{}/api/exam/1/advance", address))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
        last_body = response.json().await.expect("Failed to parse response body");
    }

    // Assert: the final advance finished the exam.
    assert_eq!(last_body["phase"], "finished");
    assert_eq!(last_body["score"]["total"], 4);
    assert_eq!(last_body["score"]["correct"], 1);

    let response = client
        .get(&format!("{}/api/exam/1/result", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let score: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert_eq!(score["total"], 4);
    assert_eq!(score["percentage"], 25);
    assert_eq!(score["category_scores"]["fundamentals"]["correct"], 1);

    // The flushed answers feed the lifetime progress tallies.
    let response = client
        .get(&format!("{}/api/progress/1", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let progress: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert_eq!(progress[0]["category"], "fundamentals");
    assert_eq!(progress[0]["answered"], 1);
    assert_eq!(progress[0]["correct"], 1);
}

#[tokio::test]
async fn jump_into_a_locked_section_conflicts() {
    // Arrange: walk into the second section.
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let body = start_exam(&client, &address, 1).await;
    let first_question_id = body["question"]["question_id"].clone();

    for _ in 0..2 {
        let response = client
            .post(&format!("{}/api/exam/1/advance", address))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
    }

    // Act: jump back to a question of the completed section.
    let response = client
        .post(&format!("{}/api/exam/1/jump", address))
        .json(&serde_json::json!({ "question_id": first_question_id }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert!(
        body["error"]
            .as_str()
            .expect("error should be a string")
            .contains("locked")
    );

    // A question id that does not exist at all is a 404.
    let response = client
        .post(&format!("{}/api/exam/1/jump", address))
        .json(&serde_json::json!({ "question_id": 999 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn leave_discards_the_exam() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    start_exam(&client, &address, 1).await;

    // Act
    let response = client
        .post(&format!("{}/api/exam/1/leave", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    // Assert: nothing left to resume.
    let response = client
        .get(&format!("{}/api/exam/1", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn a_second_instance_resumes_from_the_snapshot() {
    // Arrange: two app instances sharing one snapshot directory, as
    // before and after a process restart.
    let dir = std::env::temp_dir().join(format!("exam-api-resume-{}", uuid::Uuid::new_v4()));
    let first = spawn_app_with(SnapshotStore::new(dir.clone())).await;
    let client = reqwest::Client::new();

    start_exam(&client, &first, 1).await;
    let response = client
        .post(&format!("{}/api/exam/1/answer", first))
        .json(&serde_json::json!({ "choice": "B" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    // Act: the second instance has never seen this user in memory.
    let second = spawn_app_with(SnapshotStore::new(dir)).await;
    let response = client
        .get(&format!("{}/api/exam/1", second))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert: same position, answer intact.
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert_eq!(body["phase"], "section_active");
    assert_eq!(body["section_index"], 0);
    assert_eq!(body["question_index"], 0);
    assert_eq!(body["question"]["chosen"], "B");
    assert_eq!(body["overview"][0]["answered"], true);

    // The resumed engine accepts further input.
    let response = client
        .post(&format!("{}/api/exam/1/advance", second))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert_eq!(body["question_index"], 1);
}
