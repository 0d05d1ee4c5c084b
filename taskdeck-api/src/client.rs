//! Blocking HTTP client for the Taskdeck backend.
//!
//! The backend exposes a PostgREST table API under `/rest/v1/<table>` and a
//! GoTrue auth API under `/auth/v1/`. Every request carries the project key in
//! the `apikey` header; calls on behalf of a user add
//! `Authorization: Bearer <access_token>`.
//!
//! One `ureq::Agent` is shared by all calls, configured with the per-call
//! timeout, so a hung backend surfaces as [`ApiError::Transport`].

use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use taskdeck_core::{Config, Identity, UserId};

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

/// `POST /auth/v1/token?grant_type=password` response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl BackendClient {
    /// `base_url` is taken verbatim minus any trailing slash.
    pub fn new(base_url: &str, api_key: &str, call_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(call_timeout)
            .timeout(call_timeout)
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            agent,
        }
    }

    /// Build from the effective configuration; errors if URL or key is unset.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Ok(Self::new(
            config.backend.base_url()?,
            config.backend.api_key()?,
            config.sync.call_timeout(),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    /// Exchange email + password for an access token.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let url = format!("{}/auth/v1/token", self.base_url);
        let response = self
            .request("POST", &url, None)
            .query("grant_type", "password")
            .send_json(json!({ "email": email, "password": password }))?;
        let token: TokenResponse = decode(response, "token")?;

        tracing::info!("signed in as {}", token.user.id);
        Ok(Identity {
            user_id: UserId::from(token.user.id),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            email: token.user.email.or_else(|| Some(email.to_string())),
            signed_in_at: Utc::now(),
        })
    }

    /// Revoke the access token on the backend.
    pub fn sign_out(&self, identity: &Identity) -> Result<(), ApiError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        self.request("POST", &url, Some(identity)).call()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Request helpers (used by the per-table impls in `resources`)
    // -----------------------------------------------------------------------

    pub(crate) fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    pub(crate) fn request(
        &self,
        method: &str,
        url: &str,
        identity: Option<&Identity>,
    ) -> ureq::Request {
        let bearer = match identity {
            Some(identity) => identity.access_token.as_str(),
            None => self.api_key.as_str(),
        };
        self.agent
            .request(method, url)
            .set("apikey", &self.api_key)
            .set("Authorization", &format!("Bearer {bearer}"))
            .set("Accept", "application/json")
    }
}

/// Read and decode a JSON response body.
pub(crate) fn decode<T: DeserializeOwned>(
    response: ureq::Response,
    resource: &'static str,
) -> Result<T, ApiError> {
    let body = response
        .into_string()
        .map_err(|source| ApiError::Read { resource, source })?;
    serde_json::from_str(&body).map_err(|source| ApiError::Decode { resource, source })
}

/// First row of a `return=representation` array.
pub(crate) fn first_row<T: DeserializeOwned>(
    response: ureq::Response,
    resource: &'static str,
) -> Result<T, ApiError> {
    let rows: Vec<T> = decode(response, resource)?;
    rows.into_iter()
        .next()
        .ok_or(ApiError::EmptyResponse { resource })
}

/// PostgREST equality filter value.
pub(crate) fn eq(value: &str) -> String {
    format!("eq.{value}")
}
