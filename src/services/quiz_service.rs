// src/services/quiz_service.rs

//! Quiz attempt lifecycle: NonExistent -> InProgress -> Completed.
//!
//! Completed is terminal. An attempt leaves InProgress either through an explicit
//! submission or, lazily, when a state read finds its time limit has passed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use validator::{Validate, ValidateEmail};

use crate::{
    clock::Clock,
    config::VerificationPolicy,
    error::AppError,
    models::{
        attempt::{
            Answers, Attempt, CompletedState, QuizPaper, QuizStateView, ResumeState,
            SaveAnswersResponse, StartAttemptRequest, StartAttemptResponse, StudentInfo,
            SubmitResponse, TimeExpiredState,
        },
        question::OPTION_LABELS,
        session::QuizSession,
    },
    scoring,
    services::{
        certificate::{CertificateIssuer, CertificateRequest},
        identity::IdentityVerifier,
    },
    state::AppState,
    store::{
        attempts::{self, Completion, InsertOutcome},
        questions, sessions,
    },
};

const CERTIFICATE_NOTICE: &str =
    "Your score has been recorded, but the certificate could not be generated right now.";

/// Policy knobs the lifecycle depends on, loaded once at startup.
#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub time_limit: Duration,
    pub verification: VerificationPolicy,
}

pub struct QuizService {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    settings: QuizSettings,
    verifier: Arc<dyn IdentityVerifier>,
    issuer: Arc<dyn CertificateIssuer>,
}

impl QuizService {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        settings: QuizSettings,
        verifier: Arc<dyn IdentityVerifier>,
        issuer: Arc<dyn CertificateIssuer>,
    ) -> Self {
        Self {
            pool,
            clock,
            settings,
            verifier,
            issuer,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            state.clock.clone(),
            QuizSettings {
                time_limit: Duration::seconds(state.config.quiz_time_limit_secs),
                verification: state.config.verification.clone(),
            },
            state.verifier.clone(),
            state.issuer.clone(),
        )
    }

    /// Loads a session that is active and not expired.
    /// Missing or deactivated sessions are `SessionNotFound`; past-expiry ones `SessionExpired`.
    async fn open_session(&self, session_id: &str, now: DateTime<Utc>) -> Result<QuizSession, AppError> {
        let session = sessions::find_session(&self.pool, session_id)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load session {}: {:?}", session_id, e);
                AppError::from(e)
            })?
            .filter(|s| s.is_active)
            .ok_or(AppError::SessionNotFound)?;

        if !session.is_open(now) {
            return Err(AppError::SessionExpired);
        }

        Ok(session)
    }

    /// Returns what the requester should see for this session right now.
    ///
    /// Auto-submits an in-progress attempt whose time limit has elapsed.
    pub async fn get_quiz_state(&self, session_id: &str, identity: &str) -> Result<QuizStateView, AppError> {
        let now = self.clock.now();
        let session = self.open_session(session_id, now).await?;

        let existing = attempts::find_by_identity(&self.pool, &session.id, identity).await?;

        let Some(attempt) = existing else {
            let questions = questions::list_public_questions(&self.pool).await?;
            return Ok(QuizStateView::NotStarted(QuizPaper {
                session_id: session.id,
                questions,
                time_limit_ms: self.settings.time_limit.num_milliseconds(),
                started: false,
                already_completed: false,
            }));
        };

        if attempt.is_completed {
            return Ok(completed_view(&attempt));
        }

        let remaining = self.settings.time_limit - (now - attempt.started_at);
        if remaining <= Duration::zero() {
            return self.auto_submit(attempt, now).await;
        }

        let questions = questions::list_public_questions(&self.pool).await?;
        let saved_answers = attempt.saved_answers();
        Ok(QuizStateView::InProgress(ResumeState {
            session_id: session.id,
            attempt_id: attempt.id,
            questions,
            time_limit_ms: self.settings.time_limit.num_milliseconds(),
            remaining_ms: remaining.num_milliseconds(),
            started_at: attempt.started_at,
            saved_answers,
            started: true,
            already_completed: false,
        }))
    }

    /// Scores the last saved snapshot of a timed-out attempt and completes it.
    async fn auto_submit(&self, attempt: Attempt, now: DateTime<Utc>) -> Result<QuizStateView, AppError> {
        let key = questions::answer_key(&self.pool).await?;
        let snapshot = attempt.saved_answers();
        let score = scoring::score(&key, &snapshot);
        let total_questions = key.len() as i64;

        let won = attempts::finalize_attempt(
            &self.pool,
            &attempt.session_id,
            &attempt.id,
            &Completion {
                completed_at: now,
                score,
                total_questions,
                answers: &snapshot,
            },
        )
        .await?;

        if won {
            tracing::info!(
                "Attempt {} auto-submitted after time limit with score {}/{}",
                attempt.id,
                score,
                total_questions
            );
            return Ok(QuizStateView::TimeExpired(TimeExpiredState {
                time_expired: true,
                already_completed: true,
                attempt_id: attempt.id,
                score,
                total_questions: Some(total_questions),
            }));
        }

        // A concurrent submit completed it first; report what was stored.
        let stored = attempts::find_in_session(&self.pool, &attempt.session_id, &attempt.id)
            .await?
            .filter(|a| a.is_completed)
            .ok_or(AppError::InvalidAttempt)?;
        Ok(completed_view(&stored))
    }

    /// Creates the requester's attempt, or returns the one it already has.
    pub async fn start_attempt(
        &self,
        session_id: &str,
        identity: &str,
        request: StartAttemptRequest,
    ) -> Result<StartAttemptResponse, AppError> {
        let now = self.clock.now();
        let session = match self.open_session(session_id, now).await {
            Ok(session) => session,
            Err(AppError::SessionNotFound | AppError::SessionExpired) => {
                return Err(AppError::SessionInvalid);
            }
            Err(e) => return Err(e),
        };

        let student = self.resolve_student(request).await?;

        if let Some(existing) = attempts::find_by_identity(&self.pool, &session.id, identity).await? {
            return Ok(StartAttemptResponse {
                attempt_id: existing.id,
                started_at: existing.started_at,
            });
        }

        self.insert_or_fetch(&session.id, identity, &student, now).await
    }

    /// Inserts the attempt; if a concurrent start for the same identity won the
    /// unique index first, returns the stored row instead.
    async fn insert_or_fetch(
        &self,
        session_id: &str,
        identity: &str,
        student: &StudentInfo,
        now: DateTime<Utc>,
    ) -> Result<StartAttemptResponse, AppError> {
        match attempts::insert_attempt(&self.pool, session_id, identity, student, now).await? {
            InsertOutcome::Created(attempt) => {
                tracing::info!("Attempt {} started in session {}", attempt.id, session_id);
                Ok(StartAttemptResponse {
                    attempt_id: attempt.id,
                    started_at: attempt.started_at,
                })
            }
            InsertOutcome::AlreadyExists => {
                let existing = attempts::find_by_identity(&self.pool, session_id, identity)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalServerError(
                            "attempt vanished after unique violation".to_string(),
                        )
                    })?;
                Ok(StartAttemptResponse {
                    attempt_id: existing.id,
                    started_at: existing.started_at,
                })
            }
        }
    }

    /// Applies the required-field checks and the identity verification policy.
    async fn resolve_student(&self, request: StartAttemptRequest) -> Result<StudentInfo, AppError> {
        request.validate()?;

        let name = request.name.trim().to_string();
        let email = request.email.trim().to_string();
        let school = request.school.trim().to_string();

        if name.is_empty() || email.is_empty() || school.is_empty() {
            return Err(AppError::BadRequest(
                "Name, email, and school are required".to_string(),
            ));
        }

        let policy = &self.settings.verification;
        if !policy.required {
            if !email.validate_email() {
                return Err(AppError::BadRequest(
                    "Please enter a valid email address".to_string(),
                ));
            }
            return Ok(StudentInfo {
                name,
                email,
                school,
                email_verified: false,
                verified_id: None,
            });
        }

        let credential = request
            .credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::UnverifiedIdentity("Email verification is required".to_string()))?;

        let claims = self.verifier.verify(credential).await?;

        if !claims.verified {
            return Err(AppError::UnverifiedIdentity(
                "Email address is not verified".to_string(),
            ));
        }
        let verified_id = claims
            .backing_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::UnverifiedIdentity("Verified identity id missing".to_string()))?;
        if !policy.allows_domain(&claims.email) {
            return Err(AppError::UnverifiedIdentity(format!(
                "Only emails from {} are allowed",
                policy.allowed_domains.join(", ")
            )));
        }

        Ok(StudentInfo {
            name,
            email: claims.email,
            school,
            email_verified: true,
            verified_id: Some(verified_id),
        })
    }

    /// Replaces the in-progress answer snapshot. Last write wins.
    pub async fn save_answers(
        &self,
        session_id: &str,
        attempt_id: &str,
        answers: &Answers,
    ) -> Result<SaveAnswersResponse, AppError> {
        let key = questions::answer_key(&self.pool).await?;
        check_snapshot(&key, answers)?;

        let saved = attempts::save_answers(&self.pool, session_id, attempt_id, answers).await?;
        if !saved {
            return Err(AppError::InvalidAttempt);
        }

        Ok(SaveAnswersResponse {
            saved: answers.len(),
        })
    }

    /// Scores `answers`, completes the attempt and asks for a certificate.
    pub async fn submit_attempt(
        &self,
        session_id: &str,
        attempt_id: &str,
        answers: &Answers,
    ) -> Result<SubmitResponse, AppError> {
        let now = self.clock.now();

        let attempt = attempts::find_in_session(&self.pool, session_id, attempt_id)
            .await?
            .filter(|a| !a.is_completed)
            .ok_or(AppError::InvalidAttempt)?;

        let key = questions::answer_key(&self.pool).await?;
        let score = scoring::score(&key, answers);
        let total_questions = key.len() as i64;

        let won = attempts::finalize_attempt(
            &self.pool,
            session_id,
            attempt_id,
            &Completion {
                completed_at: now,
                score,
                total_questions,
                answers,
            },
        )
        .await?;
        if !won {
            return Err(AppError::InvalidAttempt);
        }

        tracing::info!(
            "Attempt {} submitted with score {}/{}",
            attempt.id,
            score,
            total_questions
        );

        let certificate = match self
            .issuer
            .issue(&CertificateRequest {
                attempt_id: attempt.id.clone(),
                student_name: attempt.student_name.clone(),
                score,
                total_questions,
                issued_at: now,
            })
            .await
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Certificate generation failed for {}: {}", attempt.id, e);
                None
            }
        };

        Ok(SubmitResponse {
            score,
            total_questions,
            completed: true,
            attempt_id: attempt.id,
            notice: certificate.is_none().then(|| CERTIFICATE_NOTICE.to_string()),
            certificate,
        })
    }
}

/// An autosave snapshot may only name questions in the bank and options a-d.
fn check_snapshot(key: &scoring::AnswerKey, answers: &Answers) -> Result<(), AppError> {
    for (question_id, label) in answers {
        if !key.contains_key(question_id) {
            return Err(AppError::BadRequest(format!(
                "Unknown question id {}",
                question_id
            )));
        }
        if !OPTION_LABELS.contains(&label.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Answer for question {} must be a, b, c, or d",
                question_id
            )));
        }
    }
    Ok(())
}

fn completed_view(attempt: &Attempt) -> QuizStateView {
    QuizStateView::Completed(CompletedState {
        already_completed: true,
        attempt_id: attempt.id.clone(),
        score: attempt.score.unwrap_or(0),
        total_questions: attempt.total_questions,
    })
}
