//! Final submission against an in-process fake of the store's REST interface.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use curio_core::config::BackendSettings;
use curio_core::error::CurioError;
use curio_core::session::{AnswerValue, Answers, ResponseId, SurveyResponseRepository};
use curio_infrastructure::HttpSurveyBackend;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Deserialize)]
struct StoredAnswer {
    response_id: i64,
    question_id: String,
    text_answer: String,
}

struct FakeStore {
    status: String,
    answers: Vec<StoredAnswer>,
    patch_failures: usize,
    deletes: usize,
}

type Shared = Arc<Mutex<FakeStore>>;

async fn list_responses(State(store): State<Shared>) -> Json<serde_json::Value> {
    let store = store.lock().unwrap();
    Json(json!([{
        "id": 7,
        "survey_id": 3,
        "status": store.status,
        "respondent_identifier": "anon_abc",
        "created_at": "2024-10-20T10:00:00Z"
    }]))
}

async fn complete_response(State(store): State<Shared>) -> StatusCode {
    let mut store = store.lock().unwrap();
    if store.patch_failures > 0 {
        store.patch_failures -= 1;
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    store.status = "completed".to_string();
    StatusCode::NO_CONTENT
}

async fn delete_answers(
    State(store): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    let mut store = store.lock().unwrap();
    store.deletes += 1;
    if let Some(id) = params
        .get("response_id")
        .and_then(|filter| filter.strip_prefix("eq."))
        .and_then(|id| id.parse::<i64>().ok())
    {
        store.answers.retain(|row| row.response_id != id);
    }
    StatusCode::NO_CONTENT
}

async fn insert_answers(
    State(store): State<Shared>,
    Json(rows): Json<Vec<StoredAnswer>>,
) -> StatusCode {
    store.lock().unwrap().answers.extend(rows);
    StatusCode::CREATED
}

async fn serve(store: FakeStore) -> (HttpSurveyBackend, Shared) {
    let shared = Arc::new(Mutex::new(store));
    let app = Router::new()
        .route(
            "/cu_survey_responses",
            get(list_responses).patch(complete_response),
        )
        .route(
            "/cu_survey_answers",
            post(insert_answers).delete(delete_answers),
        )
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let settings = BackendSettings {
        rest_url: format!("http://{}", addr),
        ..BackendSettings::default()
    };
    (HttpSurveyBackend::new(&settings).unwrap(), shared)
}

fn answers() -> Answers {
    let mut answers = Answers::new();
    answers.insert("q1".to_string(), AnswerValue::Text("weekly".to_string()));
    answers.insert("q2".to_string(), AnswerValue::Number(4));
    answers
}

#[tokio::test]
async fn test_retry_after_failed_completion_does_not_duplicate_answers() {
    let (backend, store) = serve(FakeStore {
        status: "pending".to_string(),
        answers: Vec::new(),
        patch_failures: 1,
        deletes: 0,
    })
    .await;

    let err = backend
        .submit_final_answers(ResponseId(7), &answers())
        .await
        .unwrap_err();
    assert!(matches!(err, CurioError::Http { status: 503, .. }));
    {
        let store = store.lock().unwrap();
        assert_eq!(store.status, "pending");
        assert_eq!(store.answers.len(), 2);
    }

    let receipt = backend
        .submit_final_answers(ResponseId(7), &answers())
        .await
        .unwrap();
    assert_eq!(receipt.answer_count, 2);

    let store = store.lock().unwrap();
    assert_eq!(store.status, "completed");
    assert_eq!(store.deletes, 2);
    let mut stored: Vec<(&str, &str)> = store
        .answers
        .iter()
        .map(|row| (row.question_id.as_str(), row.text_answer.as_str()))
        .collect();
    stored.sort();
    assert_eq!(stored, vec![("q1", r#"["weekly"]"#), ("q2", "4")]);
}

#[tokio::test]
async fn test_completed_session_keeps_its_answers() {
    let (backend, store) = serve(FakeStore {
        status: "completed".to_string(),
        answers: Vec::new(),
        patch_failures: 0,
        deletes: 0,
    })
    .await;

    let err = backend
        .submit_final_answers(ResponseId(7), &answers())
        .await
        .unwrap_err();
    assert!(matches!(err, CurioError::Submission(_)));

    let store = store.lock().unwrap();
    assert_eq!(store.deletes, 0);
    assert!(store.answers.is_empty());
}
