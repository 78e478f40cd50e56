// tests/common/mod.rs

#![allow(dead_code)]

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use timed_quiz::{
    clock::ManualClock,
    config::{Config, RateLimit, VerificationPolicy},
    error::AppError,
    routes,
    services::{
        certificate::PdfCertificateIssuer,
        identity::{DisabledVerifier, IdentityVerifier, VerifiedIdentity},
    },
    state::AppState,
    store,
    utils::hash::hash_password,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const TIME_LIMIT_SECS: i64 = 600;

/// Correct labels of the seeded sample questions (ids 1..=5).
pub fn perfect_answers() -> Value {
    json!({ "1": "c", "2": "a", "3": "a", "4": "b", "5": "d" })
}

pub fn student(email: &str) -> Value {
    json!({ "name": "Ada Lovelace", "email": email, "school": "Analytical High" })
}

/// Accepts any credential of the form `<sub>:<email>`; anything else is unverified.
pub struct FakeVerifier;

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AppError> {
        let (sub, email) = credential
            .split_once(':')
            .ok_or_else(|| AppError::UnverifiedIdentity("Invalid credential".to_string()))?;
        Ok(VerifiedIdentity {
            email: email.to_string(),
            name: Some("Verified Student".to_string()),
            verified: true,
            backing_id: Some(sub.to_string()),
        })
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub clock: Arc<ManualClock>,
    pub pool: SqlitePool,
    pub certificate_dir: PathBuf,
}

pub struct TestOptions {
    pub verification: VerificationPolicy,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub rate_limit: Option<RateLimit>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            verification: VerificationPolicy::open(),
            verifier: Arc::new(DisabledVerifier),
            rate_limit: None,
        }
    }
}

/// Helper function to spawn the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(TestOptions::default()).await
}

pub async fn spawn_app_with(options: TestOptions) -> TestApp {
    // 1. Create an in-memory pool and run migrations
    let pool = store::connect_in_memory()
        .await
        .expect("Failed to open in-memory database");
    store::migrate(&pool).await.expect("Failed to migrate database");
    store::questions::seed_default_questions(&pool)
        .await
        .expect("Failed to seed questions");

    let hashed = hash_password(ADMIN_PASSWORD).expect("Failed to hash password");
    store::admins::insert_admin_if_missing(&pool, ADMIN_EMAIL, &hashed)
        .await
        .expect("Failed to seed admin");

    // 2. Scratch directories for certificates and the static client
    let scratch = std::env::temp_dir().join(format!("timed-quiz-{}", uuid::Uuid::new_v4()));
    let certificate_dir = scratch.join("certificates");
    let static_dir = scratch.join("public");
    std::fs::create_dir_all(&certificate_dir).unwrap();
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("quiz.html"), "<html>quiz</html>").unwrap();
    std::fs::write(static_dir.join("admin.html"), "<html>admin</html>").unwrap();

    // 3. Create test configuration and state
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        public_base_url: "http://quiz.test/".parse().unwrap(),
        admin_email: None,
        admin_password: None,
        quiz_time_limit_secs: TIME_LIMIT_SECS,
        session_validity_hours: 24,
        verification: options.verification,
        google_client_id: None,
        certificate_dir: certificate_dir.to_string_lossy().into_owned(),
        static_dir: static_dir.to_string_lossy().into_owned(),
        // Tests pick the requester identity through X-Forwarded-For
        trust_forwarded_for: true,
        rate_limit: options.rate_limit,
    };

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
    ));

    let state = AppState {
        pool: pool.clone(),
        config,
        clock: clock.clone(),
        verifier: options.verifier,
        issuer: Arc::new(PdfCertificateIssuer::new(certificate_dir.clone())),
    };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        clock,
        pool,
        certificate_dir,
    }
}

impl TestApp {
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub async fn admin_token(&self) -> String {
        let response = self
            .client
            .post(format!("{}/api/admin/login", self.address))
            .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);

        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a session with the default validity and returns its id.
    pub async fn create_session(&self, token: &str) -> String {
        let response = self
            .client
            .post(format!("{}/api/admin/sessions", self.address))
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        body["sessionId"].as_str().unwrap().to_string()
    }

    pub async fn get_state(&self, session_id: &str, ip: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/api/quiz/{}", self.address, session_id))
            .header("X-Forwarded-For", ip)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn start(&self, session_id: &str, ip: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/quiz/{}/start", self.address, session_id))
            .header("X-Forwarded-For", ip)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Starts an attempt that must succeed and returns its id.
    pub async fn start_ok(&self, session_id: &str, ip: &str) -> String {
        let response = self.start(session_id, ip, &student("ada@example.com")).await;
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        body["attemptId"].as_str().unwrap().to_string()
    }

    pub async fn save(&self, session_id: &str, attempt_id: &str, answers: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/quiz/{}/save", self.address, session_id))
            .json(&json!({ "attemptId": attempt_id, "answers": answers }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn submit(&self, session_id: &str, attempt_id: &str, answers: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/quiz/{}/submit", self.address, session_id))
            .json(&json!({ "attemptId": attempt_id, "answers": answers }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}
