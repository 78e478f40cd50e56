// src/config.rs

use std::{env, fmt, net::SocketAddr, str::FromStr};

use dotenvy::dotenv;
use url::Url;

/// Whether students must prove their email through the identity provider,
/// and which email domains are accepted when they do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPolicy {
    pub required: bool,
    pub allowed_domains: Vec<String>,
}

impl VerificationPolicy {
    /// Policy that accepts any syntactically valid email.
    pub fn open() -> Self {
        Self {
            required: false,
            allowed_domains: Vec::new(),
        }
    }

    /// Returns true if the email's domain is on the allow-list (case-insensitive).
    pub fn allows_domain(&self, email: &str) -> bool {
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };
        let domain = domain.trim().to_ascii_lowercase();
        self.allowed_domains.iter().any(|allowed| *allowed == domain)
    }
}

/// Token-bucket settings for the per-peer request limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub burst: u32,
    pub period_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Admin token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub public_base_url: Url,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Per-attempt time limit in seconds.
    pub quiz_time_limit_secs: i64,
    pub session_validity_hours: i64,
    pub verification: VerificationPolicy,
    pub google_client_id: Option<String>,
    pub certificate_dir: String,
    pub static_dir: String,
    pub trust_forwarded_for: bool,
    /// `None` disables rate limiting.
    pub rate_limit: Option<RateLimit>,
}

/// A missing or unparsable environment variable.
#[derive(Debug)]
pub struct ConfigError {
    pub key: &'static str,
    pub reason: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration for {}: {}", self.key, self.reason)
    }
}

impl std::error::Error for ConfigError {}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Upper bound for the per-attempt time limit (one day).
pub const MAX_QUIZ_TIME_LIMIT_SECS: i64 = 86_400;
/// Upper bound for session validity; matches the admin API's override range.
pub const MAX_SESSION_VALIDITY_HOURS: i64 = 720;

/// Accepts `value` only in `1..=max`.
fn within(key: &'static str, value: i64, max: i64) -> Result<i64, ConfigError> {
    if !(1..=max).contains(&value) {
        return Err(ConfigError {
            key,
            reason: format!("must be between 1 and {}", max),
        });
    }
    Ok(value)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url =
            optional("DATABASE_URL").unwrap_or_else(|| "sqlite://quiz.db?mode=rwc".to_string());

        let jwt_secret = optional("JWT_SECRET").ok_or(ConfigError {
            key: "JWT_SECRET",
            reason: "must be set".to_string(),
        })?;

        let rust_log = optional("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let bind_addr = parsed_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let public_base_url = optional("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000/".to_string());
        let public_base_url = Url::parse(&public_base_url).map_err(|e| ConfigError {
            key: "PUBLIC_BASE_URL",
            reason: e.to_string(),
        })?;

        let quiz_time_limit_secs = within(
            "QUIZ_TIME_LIMIT_SECS",
            parsed_or("QUIZ_TIME_LIMIT_SECS", 600)?,
            MAX_QUIZ_TIME_LIMIT_SECS,
        )?;
        let session_validity_hours = within(
            "SESSION_VALIDITY_HOURS",
            parsed_or("SESSION_VALIDITY_HOURS", 24)?,
            MAX_SESSION_VALIDITY_HOURS,
        )?;

        let allowed_domains = optional("ALLOWED_EMAIL_DOMAINS")
            .unwrap_or_else(|| "gmail.com".to_string())
            .split(',')
            .map(|d| d.trim().trim_start_matches('@').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        let verification = VerificationPolicy {
            required: parsed_or("REQUIRE_EMAIL_VERIFICATION", false)?,
            allowed_domains,
        };

        let burst: u32 = parsed_or("RATE_LIMIT_BURST", 100)?;
        let period_secs: u64 = parsed_or("RATE_LIMIT_PERIOD_SECS", 9)?;
        let rate_limit = (burst > 0 && period_secs > 0).then_some(RateLimit { burst, period_secs });

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration: parsed_or("JWT_EXPIRATION", 86_400)?,
            rust_log,
            bind_addr,
            public_base_url,
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
            quiz_time_limit_secs,
            session_validity_hours,
            verification,
            google_client_id: optional("GOOGLE_CLIENT_ID"),
            certificate_dir: optional("CERTIFICATE_DIR").unwrap_or_else(|| "certificates".to_string()),
            static_dir: optional("STATIC_DIR").unwrap_or_else(|| "public".to_string()),
            trust_forwarded_for: parsed_or("TRUST_FORWARDED_FOR", false)?,
            rate_limit,
        })
    }

    /// Public link a student opens to take the quiz for `session_id`.
    pub fn quiz_link(&self, session_id: &str) -> String {
        self.public_base_url
            .join(&format!("quiz/{}", session_id))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}quiz/{}", self.public_base_url, session_id))
    }
}
