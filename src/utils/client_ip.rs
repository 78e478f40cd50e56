// src/utils/client_ip.rs

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{config::Config, error::AppError};

/// Network-address-derived requester identity.
///
/// Uses the first `X-Forwarded-For` hop when the deployment trusts its proxy,
/// otherwise the peer socket address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
    Config: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Config::from_ref(state);

        if config.trust_forwarded_for {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|hop| !hop.is_empty());

            if let Some(hop) = forwarded {
                return Ok(ClientIdentity(hop.to_string()));
            }
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| ClientIdentity(addr.ip().to_string()))
            .ok_or_else(|| {
                AppError::InternalServerError("peer address unavailable".to_string())
            })
    }
}
