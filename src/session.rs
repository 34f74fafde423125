//! Signed-in session state and the sign-in client
//!
//! A [`Session`] is created by [`AuthService::sign_in`] and passed explicitly
//! to whatever needs it (record fetching, the browser). It becomes invalid on
//! [`AuthService::sign_out`] or when its optional expiry passes.

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// An authenticated user session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// The user id used to sign in
    pub user_id: String,
    /// Bearer token issued by the service, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Profile document returned at sign-in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<serde_json::Value>,
    /// When the session was created
    pub signed_in_at: DateTime<Utc>,
    /// When the session stops being valid (None = until sign-out)
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    invalidated: bool,
}

impl Session {
    /// Create a session starting now
    pub fn new(
        user_id: impl Into<String>,
        token: Option<String>,
        profile: Option<serde_json::Value>,
        ttl: Option<Duration>,
    ) -> Self {
        let signed_in_at = Utc::now();
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| signed_in_at.checked_add_signed(ttl));
        Self {
            user_id: user_id.into(),
            token,
            profile,
            signed_in_at,
            expires_at,
            invalidated: false,
        }
    }

    /// Whether the session can be used right now
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whether the session can be used at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.invalidated && self.expires_at.is_none_or(|expiry| now < expiry)
    }

    /// Mark the session as signed out
    pub fn invalidate(&mut self) {
        self.invalidated = true;
        self.token = None;
        self.profile = None;
    }

    /// Token to send with requests, or an error if the session is no longer usable
    pub fn authorization(&self) -> Result<Option<&str>> {
        if self.invalidated {
            return Err(Error::Unauthenticated("session was signed out".into()));
        }
        if !self.is_valid() {
            return Err(Error::Unauthenticated("session expired".into()));
        }
        Ok(self.token.as_deref())
    }
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    #[serde(rename = "Userid")]
    user_id: &'a str,
    #[serde(rename = "EMployeeid")]
    employee_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct SignInResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    profile: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Sign-in client for the sales service
#[derive(Clone, Debug)]
pub struct AuthService {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl AuthService {
    /// Create a sign-in client
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Sign in with a user id and employee id
    ///
    /// The service answers with a JSON document that may contain `success`,
    /// `token` and `profile`. An explicit `success: false` or an HTTP 401/403
    /// is reported as [`Error::SignInRejected`].
    pub async fn sign_in(&self, user_id: &str, employee_id: &str) -> Result<Session> {
        let url = self.config.endpoint("login");
        debug!(%url, user_id, "signing in");

        let response = self
            .client
            .post(&url)
            .json(&SignInRequest {
                user_id,
                employee_id,
            })
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            warn!(user_id, status = status.as_u16(), "sign-in rejected");
            return Err(Error::SignInRejected(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(Error::Service {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        let parsed: SignInResponse = if body.iter().all(u8::is_ascii_whitespace) {
            SignInResponse::default()
        } else {
            serde_json::from_slice(&body)?
        };

        if parsed.success == Some(false) {
            let reason = parsed
                .message
                .unwrap_or_else(|| "invalid credentials".to_string());
            warn!(user_id, %reason, "sign-in rejected");
            return Err(Error::SignInRejected(reason));
        }

        info!(user_id, has_token = parsed.token.is_some(), "signed in");
        Ok(Session::new(
            user_id,
            parsed.token,
            parsed.profile,
            self.config.session_ttl,
        ))
    }

    /// Sign out, invalidating the session
    pub fn sign_out(&self, session: &mut Session) {
        info!(user_id = %session.user_id, "signed out");
        session.invalidate();
    }
}
