//! Session validation against the hosted identity provider.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves an access token to the user it was issued for.
    async fn resolve(&self, access_token: &str) -> Result<Uuid, AppError>;
}

/// Hosted auth service exposing `GET /auth/v1/user`.
pub struct HostedIdentity {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct IdentityUser {
    id: Uuid,
}

impl HostedIdentity {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentity {
    async fn resolve(&self, access_token: &str) -> Result<Uuid, AppError> {
        let url = format!("{}/auth/v1/user", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Identity provider unreachable: {e}")))?;

        match response.status() {
            StatusCode::OK => {
                let user: IdentityUser = response.json().await.map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Malformed identity response: {e}"))
                })?;
                Ok(user.id)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Unauthorized),
            StatusCode::NOT_FOUND => {
                warn!("Session refers to a user the identity provider no longer knows");
                Err(AppError::SessionRevoked)
            }
            other => Err(AppError::Internal(anyhow::anyhow!(
                "Identity provider returned {other}"
            ))),
        }
    }
}

/// The authenticated caller. Extracting it rejects requests without a valid session.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AppError::Unauthorized)?;

        let id = state.identity.resolve(token).await?;
        Ok(CurrentUser { id })
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
