use std::net::SocketAddr;

use portal_core::time::fixed_clock;
use reqwest::StatusCode;
use serde_json::{Value, json};
use server::router;
use services::{AppServices, PracticeConfig};
use storage::repository::Storage;

async fn spawn_app() -> String {
    let services = AppServices::from_storage(
        Storage::in_memory(),
        fixed_clock(),
        PracticeConfig::default(),
    );
    services.seed_demo(15).await.expect("seed");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr: SocketAddr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router(services)).await.expect("serve");
    });
    format!("http://{addr}")
}

fn fetch_body(count: u32, last_attempted: u64) -> Value {
    json!({
        "enrollmentNo": "0801CS221001",
        "questionDomainID": 1,
        "questionSubDomainID": 1,
        "questionDifficultyLevelID": 1,
        "questionFormatID": 1,
        "questionFormat": "MCQ",
        "questionCount": count,
        "lastAttemptedQuestionID": last_attempted
    })
}

#[tokio::test]
async fn fetch_submit_and_read_back_a_session() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/questions/fetch"))
        .json(&fetch_body(10, 12))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Practice session started successfully");
    let ids: Vec<u64> = body["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["questionID"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![13, 14, 15, 1, 2, 3, 4, 5, 6, 7]);
    let session_id = body["practiceSessionId"].as_u64().unwrap();

    let res = client
        .post(format!("{base}/practice-session/submit"))
        .json(&json!({
            "practiceSessionId": session_id,
            "questionsAttempted": 8,
            "questionsCorrect": 6,
            "feedbacks": "ok",
            "scoreEarnedPercentage": 75.0
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let view: Value = client
        .get(format!("{base}/practice-session/{session_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["status"], "Submitted");
    assert_eq!(view["session"]["questionsAttempted"], 8);
    assert_eq!(view["session"]["questionsCorrect"], 6);

    let res = client
        .post(format!("{base}/practice-session/end-forcefully"))
        .json(&json!({ "practiceSessionId": session_id, "enrollmentNo": "0801CS221001" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn force_end_shows_in_history() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{base}/questions/fetch"))
        .json(&fetch_body(1, 0))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session_id = body["practiceSessionId"].as_u64().unwrap();

    let res = client
        .post(format!("{base}/practice-session/end-forcefully"))
        .json(&json!({ "practiceSessionId": session_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let history: Value = client
        .get(format!("{base}/practice-session/history/0801CS221001"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history[0]["practiceSessionID"], session_id);
    assert_eq!(history[0]["status"], "Force End");
    assert!(history[0]["session"].is_null());
}

#[tokio::test]
async fn bad_requests_are_rejected_with_json_errors() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/questions/fetch"))
        .json(&fetch_body(7, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");

    let res = client
        .post(format!("{base}/questions/fetch"))
        .header("content-type", "text/plain")
        .body(fetch_body(10, 0).to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let res = client
        .post(format!("{base}/practice-session/submit"))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{base}/practice-session/history/not-an-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{base}/practice-session/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hierarchy_routes_browse_and_report_missing_children() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    let domains: Value = client
        .get(format!("{base}/questions/domains"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(domains[0]["domainName"], "Aptitude");

    let formats: Value = client
        .get(format!("{base}/questions/formats/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(formats.as_array().unwrap().len(), 4);
    assert_eq!(formats[0]["format"], "MCQ");

    let res = client
        .get(format!("{base}/questions/subdomains/2"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let snapshot: Value = client
        .get(format!("{base}/questions/hierarchy"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["subdomains"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["difficulty_levels"][0]["difficultyLevel"], "Easy");
}

#[tokio::test]
async fn ids_beyond_the_store_range_are_bad_requests() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    let mut body = fetch_body(10, 0);
    body["lastAttemptedQuestionID"] = json!(u64::MAX);
    let res = client
        .post(format!("{base}/questions/fetch"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "Validation failed");

    let mut body = fetch_body(10, 0);
    body["questionDomainID"] = json!(u64::MAX);
    let res = client
        .post(format!("{base}/questions/fetch"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{base}/practice-session/submit"))
        .json(&json!({
            "practiceSessionId": u64::MAX,
            "questionsAttempted": 1,
            "questionsCorrect": 1,
            "scoreEarnedPercentage": 100.0
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{base}/practice-session/{}", u64::MAX))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
