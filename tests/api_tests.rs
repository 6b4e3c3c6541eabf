// tests/api_tests.rs

use std::{net::SocketAddr, sync::Arc};

use lms_assessment::{
    config::Config, routes, services::AttemptService, state::AppState, store::InMemoryStore,
    utils::jwt::sign_jwt,
};

const SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    learner_token: String,
    admin_token: String,
}

/// Helper function to spawn the app on a random port for testing.
/// Backed by the in-memory store, so no database is required.
async fn spawn_app() -> TestApp {
    let config = Config {
        database_url: None,
        jwt_secret: SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        log_dir: "logs".to_string(),
    };

    let store = Arc::new(InMemoryStore::new());
    let state = AppState {
        attempts: AttemptService::new(store),
        config,
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        learner_token: sign_jwt(7, "learner", SECRET, 600).unwrap(),
        admin_token: sign_jwt(1, "admin", SECRET, 600).unwrap(),
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

async fn create_quiz(app: &TestApp, client: &reqwest::Client, max_attempts: u32) -> i64 {
    let response = client
        .post(format!("{}/api/admin/quizzes", app.address))
        .header("Authorization", bearer(&app.admin_token))
        .json(&serde_json::json!({
            "title": "Bracket sets",
            "passing_score": 60,
            "max_attempts": max_attempts,
            "time_limit_minutes": 10,
            "questions": [
                {
                    "id": 1, "points": 5, "prompt": "Which dynasty built the Foguang Temple hall?",
                    "type": "multiple-choice", "options": ["Tang", "Song", "Ming"], "correct_answer": 0
                },
                {
                    "id": 2, "points": 5, "prompt": "Dougong sit between column and beam.",
                    "type": "true-false", "correct_answer": true
                }
            ]
        }))
        .send()
        .await
        .expect("Failed to create quiz");

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().expect("id missing")
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn start_requires_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz_id = create_quiz(&app, &client, 1).await;

    let response = client
        .post(format!("{}/api/quizzes/{}/attempts", app.address, quiz_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn learner_cannot_author_quizzes() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/admin/quizzes", app.address))
        .header("Authorization", bearer(&app.learner_token))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn create_quiz_fails_validation() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Only one option on a multiple-choice question.
    let response = client
        .post(format!("{}/api/admin/quizzes", app.address))
        .header("Authorization", bearer(&app.admin_token))
        .json(&serde_json::json!({
            "title": "Broken",
            "passing_score": 50,
            "max_attempts": 1,
            "questions": [
                {"id": 1, "points": 1, "prompt": "?", "type": "multiple-choice",
                 "options": ["only"], "correct_answer": 0}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn public_quiz_hides_answer_key() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz_id = create_quiz(&app, &client, 1).await;

    let body: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", app.address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["question_count"], 2);
    assert_eq!(body["total_points"], 10);
    for q in body["questions"].as_array().unwrap() {
        assert!(q.get("correct_answer").is_none());
    }

    let missing = client
        .get(format!("{}/api/final-tests/{}", app.address, quiz_id))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn test_attempt_flow() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz_id = create_quiz(&app, &client, 1).await;
    let auth = bearer(&app.learner_token);

    // 1. Start
    let response = client
        .post(format!("{}/api/quizzes/{}/attempts", app.address, quiz_id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let session: serde_json::Value = response.json().await.unwrap();
    let sid = session["session_id"].as_str().unwrap().to_string();
    assert_eq!(session["state"], "in_progress");
    assert_eq!(session["remaining_seconds"], 600);
    assert!(session["current_question"].get("correct_answer").is_none());

    // 2. Answer both questions, the second one wrong
    for (question_id, answer) in [
        (1, serde_json::json!({"kind": "index", "value": 0})),
        (2, serde_json::json!({"kind": "bool", "value": false})),
    ] {
        let response = client
            .put(format!("{}/api/sessions/{}/answers", app.address, sid))
            .header("Authorization", &auth)
            .json(&serde_json::json!({"question_id": question_id, "answer": answer}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    // 3. Navigate past the end: clamped
    let view: serde_json::Value = client
        .post(format!("{}/api/sessions/{}/navigate", app.address, sid))
        .header("Authorization", &auth)
        .json(&serde_json::json!({"action": "go_to", "index": 9}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["current_index"], 1);
    assert_eq!(view["answered_count"], 2);

    // 4. Submit
    let result: serde_json::Value = client
        .post(format!("{}/api/sessions/{}/submit", app.address, sid))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 50);
    assert_eq!(result["passed"], false);
    assert_eq!(result["persistence"]["status"], "saved");
    assert_eq!(result["questions"].as_array().unwrap().len(), 2);

    // 5. Answering after submit conflicts
    let response = client
        .put(format!("{}/api/sessions/{}/answers", app.address, sid))
        .header("Authorization", &auth)
        .json(&serde_json::json!({"question_id": 2, "answer": {"kind": "bool", "value": true}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // 6. Attempt cap reached: blocked with the best score
    let response = client
        .post(format!("{}/api/quizzes/{}/attempts", app.address, quiz_id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
    let blocked: serde_json::Value = response.json().await.unwrap();
    assert_eq!(blocked["error"], "Maximum Attempts Reached");
    assert_eq!(blocked["best_score"], 50);

    // 7. History
    let history: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}/history", app.address, quiz_id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["total_attempts"], 1);
    assert_eq!(history["can_start"], false);
}

#[tokio::test]
async fn abandon_discards_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz_id = create_quiz(&app, &client, 1).await;
    let auth = bearer(&app.learner_token);

    let session: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/attempts", app.address, quiz_id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sid = session["session_id"].as_str().unwrap();

    let response = client
        .delete(format!("{}/api/sessions/{}", app.address, sid))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("{}/api/sessions/{}", app.address, sid))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let history: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}/history", app.address, quiz_id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["total_attempts"], 0);
    assert_eq!(history["can_start"], true);
}

#[tokio::test]
async fn other_learner_cannot_see_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz_id = create_quiz(&app, &client, 1).await;

    let session: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/attempts", app.address, quiz_id))
        .header("Authorization", bearer(&app.learner_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sid = session["session_id"].as_str().unwrap();

    let other = sign_jwt(8, "learner", SECRET, 600).unwrap();
    let response = client
        .post(format!("{}/api/sessions/{}/submit", app.address, sid))
        .header("Authorization", bearer(&other))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
