// tests/admin_tests.rs

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{ADMIN_EMAIL, perfect_answers, spawn_app};
use serde_json::{Value, json};

fn question(prompt: &str, correct: &str) -> Value {
    json!({
        "prompt": prompt,
        "option_a": "One",
        "option_b": "Two",
        "option_c": "Three",
        "option_d": "Four",
        "correct_option": correct,
    })
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/api/admin/login", app.address))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .post(format!("{}/api/admin/login", app.address))
        .json(&json!({ "email": "nobody@example.com", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_routes_require_a_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/api/admin/sessions", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .get(format!("{}/api/admin/questions", app.address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn create_session_returns_link_and_expiry() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

    let response = app
        .client
        .post(format!("{}/api/admin/sessions", app.address))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();

    let session_id = body["sessionId"].as_str().unwrap();
    assert_eq!(
        body["quizLink"],
        format!("http://quiz.test/quiz/{}", session_id).as_str()
    );
    let expires_at: DateTime<Utc> = body["expiresAt"].as_str().unwrap().parse().unwrap();
    assert_eq!(expires_at, now + Duration::hours(24));

    let body: Value = app
        .client
        .post(format!("{}/api/admin/sessions", app.address))
        .bearer_auth(&token)
        .json(&json!({ "validityHours": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let expires_at: DateTime<Utc> = body["expiresAt"].as_str().unwrap().parse().unwrap();
    assert_eq!(expires_at, now + Duration::hours(2));

    let response = app
        .client
        .post(format!("{}/api/admin/sessions", app.address))
        .bearer_auth(&token)
        .json(&json!({ "validityHours": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let sessions: Value = app
        .client
        .get(format!("{}/api/admin/sessions", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s["adminEmail"] == ADMIN_EMAIL));
}

#[tokio::test]
async fn results_list_only_completed_attempts() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let session_id = app.create_session(&token).await;

    let done = app.start_ok(&session_id, "10.0.2.1").await;
    app.start_ok(&session_id, "10.0.2.2").await;
    app.advance(Duration::seconds(42));
    app.submit(&session_id, &done, &perfect_answers()).await;

    let results: Value = app
        .client
        .get(format!("{}/api/admin/sessions/{}/results", app.address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["attemptId"], done.as_str());
    assert_eq!(results[0]["score"], 5);
    assert_eq!(results[0]["totalQuestions"], 5);

    let response = app
        .client
        .get(format!(
            "{}/api/admin/sessions/{}/results/export",
            app.address, session_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(
        response.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .starts_with("attachment")
    );

    let csv = response.text().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("attempt_id,student_name"));
    assert!(lines[1].starts_with(&done));
    assert!(lines[1].ends_with(",42"));

    let response = app
        .client
        .get(format!("{}/api/admin/sessions/missing/results", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn question_crud_validates_and_sanitizes() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let response = app
        .client
        .post(format!("{}/api/admin/questions", app.address))
        .bearer_auth(&token)
        .json(&question("Pick <b>two</b><script>alert(1)</script>", "B"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["prompt"], "Pick <b>two</b>");
    assert_eq!(created["correct_option"], "b");
    let id = created["id"].as_i64().unwrap();

    let response = app
        .client
        .post(format!("{}/api/admin/questions", app.address))
        .bearer_auth(&token)
        .json(&question("Invalid label", "e"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let mut missing_option = question("Missing option", "a");
    missing_option["option_d"] = json!("");
    let response = app
        .client
        .post(format!("{}/api/admin/questions", app.address))
        .bearer_auth(&token)
        .json(&missing_option)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let updated: Value = app
        .client
        .put(format!("{}/api/admin/questions/{}", app.address, id))
        .bearer_auth(&token)
        .json(&question("Pick three", "c"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["prompt"], "Pick three");
    assert_eq!(updated["correct_option"], "c");

    let fetched: Value = app
        .client
        .get(format!("{}/api/admin/questions/{}", app.address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["prompt"], "Pick three");

    let response = app
        .client
        .put(format!("{}/api/admin/questions/9999", app.address))
        .bearer_auth(&token)
        .json(&question("Nope", "a"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn deleting_stops_at_the_last_question() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    for id in 1..=4 {
        let response = app
            .client
            .delete(format!("{}/api/admin/questions/{}", app.address, id))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 204);
    }

    let response = app
        .client
        .delete(format!("{}/api/admin/questions/5", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .client
        .delete(format!("{}/api/admin/questions/1", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let questions: Value = app
        .client
        .get(format!("{}/api/admin/questions", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(questions.as_array().unwrap().len(), 1);
}
