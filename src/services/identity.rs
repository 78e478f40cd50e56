// src/services/identity.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;

/// Claims an identity provider vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: Option<String>,
    pub verified: bool,
    /// Stable provider-side subject id.
    pub backing_id: Option<String>,
}

/// Turns an opaque credential (e.g. an ID token) into verified claims.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AppError>;
}

/// Installed when no provider is configured; every credential is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledVerifier;

#[async_trait]
impl IdentityVerifier for DisabledVerifier {
    async fn verify(&self, _credential: &str) -> Result<VerifiedIdentity, AppError> {
        Err(AppError::UnverifiedIdentity(
            "Identity verification is not configured".to_string(),
        ))
    }
}

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Validates Google ID tokens through the public tokeninfo endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTokenVerifier {
    client: reqwest::Client,
    client_id: String,
    endpoint: String,
}

/// Subset of the tokeninfo response we rely on.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    /// Google sends this as a string ("true") but some proxies return a bool.
    email_verified: Option<Value>,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
            endpoint: GOOGLE_TOKENINFO_URL.to_string(),
        }
    }

    /// Points the verifier at a different tokeninfo-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn claims_from(&self, info: TokenInfo) -> Result<VerifiedIdentity, AppError> {
        if info.aud.as_deref() != Some(self.client_id.as_str()) {
            return Err(AppError::UnverifiedIdentity(
                "Token was issued for a different client".to_string(),
            ));
        }

        let email = info.email.ok_or_else(|| {
            AppError::UnverifiedIdentity("Token does not carry an email".to_string())
        })?;

        let verified = match info.email_verified {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };

        Ok(VerifiedIdentity {
            email,
            name: info.name,
            verified,
            backing_id: info.sub,
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AppError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Identity provider unreachable: {:?}", e);
                AppError::UnverifiedIdentity("Could not verify identity".to_string())
            })?;

        if !response.status().is_success() {
            tracing::info!("Identity provider rejected token: {}", response.status());
            return Err(AppError::UnverifiedIdentity(
                "Invalid identity token".to_string(),
            ));
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            tracing::warn!("Malformed tokeninfo response: {:?}", e);
            AppError::UnverifiedIdentity("Could not verify identity".to_string())
        })?;

        self.claims_from(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: Value) -> TokenInfo {
        TokenInfo {
            aud: Some(aud.to_string()),
            sub: Some("1234567890".to_string()),
            email: Some("student@gmail.com".to_string()),
            name: Some("Ada".to_string()),
            email_verified: Some(verified),
        }
    }

    #[test]
    fn test_claims_accept_string_flag() {
        let verifier = GoogleTokenVerifier::new("client-1");
        let claims = verifier
            .claims_from(info("client-1", Value::String("true".into())))
            .unwrap();

        assert!(claims.verified);
        assert_eq!(claims.backing_id.as_deref(), Some("1234567890"));
    }

    #[test]
    fn test_claims_reject_foreign_audience() {
        let verifier = GoogleTokenVerifier::new("client-1");
        let err = verifier
            .claims_from(info("someone-else", Value::Bool(true)))
            .unwrap_err();

        assert!(matches!(err, AppError::UnverifiedIdentity(_)));
    }

    #[test]
    fn test_claims_unverified_flag() {
        let verifier = GoogleTokenVerifier::new("client-1");
        let claims = verifier
            .claims_from(info("client-1", Value::String("false".into())))
            .unwrap();

        assert!(!claims.verified);
    }
}
