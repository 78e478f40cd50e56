// src/routes.rs

use std::{path::Path, sync::Arc};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    config::RateLimit,
    handlers::{admin, auth, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Nests the student quiz API, the admin API and admin login.
/// * Serves the static client (`quiz.html` for quiz links, `admin.html` at `/`).
/// * Applies global middleware (Trace, CORS, optional per-peer rate limiting).
pub fn create_router(state: AppState) -> Router {
    let mut origins = vec![
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];
    let public_origin = state.config.public_base_url.origin().ascii_serialization();
    if let Ok(origin) = HeaderValue::from_str(&public_origin) {
        if !origins.contains(&origin) {
            origins.push(origin);
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/{session_id}", get(quiz::get_quiz_state))
        .route("/{session_id}/start", post(quiz::start_attempt))
        .route("/{session_id}/save", post(quiz::save_answers))
        .route("/{session_id}/submit", post(quiz::submit_attempt));

    let admin_routes = Router::new()
        .route(
            "/sessions",
            get(admin::list_sessions).post(admin::create_session),
        )
        .route(
            "/sessions/{id}/deactivate",
            post(admin::deactivate_session),
        )
        .route("/sessions/{id}/results", get(admin::session_results))
        .route(
            "/sessions/{id}/results/export",
            get(admin::export_session_results),
        )
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            get(admin::get_question)
                .put(admin::update_question)
                .delete(admin::delete_question),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let static_dir = Path::new(&state.config.static_dir);
    let static_files = Router::new()
        .route_service("/", ServeFile::new(static_dir.join("admin.html")))
        .route_service(
            "/quiz/{session_id}",
            ServeFile::new(static_dir.join("quiz.html")),
        )
        .fallback_service(ServeDir::new(static_dir));

    let rate_limit = state.config.rate_limit;
    let trust_forwarded_for = state.config.trust_forwarded_for;

    let app = Router::new()
        .route("/api/health", get(quiz::health))
        .route("/api/config", get(quiz::public_config))
        .route("/api/admin/login", post(auth::login))
        .nest("/api/quiz", quiz_routes)
        .nest("/api/admin", admin_routes)
        .route("/certificate/{attempt_id}", get(quiz::download_certificate))
        .merge(static_files)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    match rate_limit {
        Some(limit) => with_rate_limit(app, limit, trust_forwarded_for),
        None => app,
    }
}

/// Per-requester token bucket. Behind a trusted proxy the bucket is keyed by the
/// forwarded client address, the same address `ClientIdentity` uses.
fn with_rate_limit(app: Router, limit: RateLimit, trust_forwarded_for: bool) -> Router {
    if trust_forwarded_for {
        let governor_conf = GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .per_second(limit.period_secs)
            .burst_size(limit.burst)
            .finish();
        match governor_conf {
            Some(conf) => app.layer(GovernorLayer::new(Arc::new(conf))),
            None => app,
        }
    } else {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(limit.period_secs)
            .burst_size(limit.burst)
            .finish();
        match governor_conf {
            Some(conf) => app.layer(GovernorLayer::new(Arc::new(conf))),
            None => app,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        clock::SystemClock,
        config::{Config, VerificationPolicy},
        services::{certificate::PdfCertificateIssuer, identity::DisabledVerifier},
        store,
    };

    async fn test_router() -> Router {
        let pool = store::connect_in_memory().await.unwrap();
        store::migrate(&pool).await.unwrap();

        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "secret".to_string(),
            jwt_expiration: 60,
            rust_log: "error".to_string(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            public_base_url: "http://localhost:3000/".parse().unwrap(),
            admin_email: None,
            admin_password: None,
            quiz_time_limit_secs: 600,
            session_validity_hours: 24,
            verification: VerificationPolicy::open(),
            google_client_id: None,
            certificate_dir: std::env::temp_dir().to_string_lossy().into_owned(),
            static_dir: "public".to_string(),
            trust_forwarded_for: false,
            rate_limit: None,
        };

        create_router(AppState {
            pool,
            issuer: Arc::new(PdfCertificateIssuer::new(config.certificate_dir.clone())),
            config,
            clock: Arc::new(SystemClock),
            verifier: Arc::new(DisabledVerifier),
        })
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = test_router()
            .await
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_api_needs_bearer_token() {
        let response = test_router()
            .await
            .oneshot(
                Request::get("/api/admin/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_quiz_state_without_peer_address_fails_cleanly() {
        // oneshot carries no ConnectInfo and forwarded headers are not trusted
        let response = test_router()
            .await
            .oneshot(Request::get("/api/quiz/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
