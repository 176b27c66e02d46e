//! Session credentials for remote stores.
//!
//! A [`Session`] is acquired once per run, before any remote operation, and
//! handed to the stores the engine works with.
//!
//! # Resolution
//!
//! Priority:
//! 1. `RECSYNC_API_KEY` environment variable (API key auth)
//! 2. `RECSYNC_TOKEN` environment variable (bearer token)
//! 3. `~/.amplify/admin/config.json` entry for the app id (admin id token)
//!
//! An expired admin id token is exchanged once for a fresh one through the
//! Cognito `InitiateAuth` refresh flow. The refreshed token is used for the
//! run only; the admin config is left as it is. If the exchange fails the run
//! stops with `SessionExpired`.

use std::fmt;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Tokens are treated as expired this many seconds before their `exp`.
const EXPIRY_SKEW_SECS: i64 = 60;

const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Cognito id tokens last an hour unless the response says otherwise.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// How requests authenticate against the store.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    ApiKey(String),
    Bearer(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "ApiKey(***)"),
            Self::Bearer(_) => write!(f, "Bearer(***)"),
        }
    }
}

/// Credentials valid for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    auth: Auth,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            auth: Auth::ApiKey(key.into()),
            expires_at: None,
        }
    }

    #[must_use]
    pub fn bearer(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            auth: Auth::Bearer(token.into()),
            expires_at,
        }
    }

    #[must_use]
    pub const fn auth(&self) -> &Auth {
        &self.auth
    }

    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the credentials are (about to be) expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| now.timestamp() >= exp.timestamp() - EXPIRY_SKEW_SECS)
    }
}

/// Acquires credentials once per run.
pub trait SessionProvider {
    /// # Errors
    ///
    /// Returns `SessionExpired` if the stored credentials are expired and
    /// cannot be refreshed, or a configuration error if none are available.
    fn credentials(&self) -> impl Future<Output = Result<Session>> + Send;
}

/// Environment variables first, then the Amplify admin config.
#[derive(Debug, Clone)]
pub struct DefaultSessionProvider {
    app_id: String,
    admin_config: Option<PathBuf>,
    cognito_endpoint: Option<String>,
    client: reqwest::Client,
}

impl DefaultSessionProvider {
    #[must_use]
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            admin_config: admin_config_path(),
            cognito_endpoint: None,
            client: reqwest::Client::new(),
        }
    }

    /// Read admin credentials from a specific file instead of the home directory.
    #[must_use]
    pub fn with_admin_config(mut self, path: PathBuf) -> Self {
        self.admin_config = Some(path);
        self
    }

    /// Send token refreshes to `url` instead of the regional Cognito endpoint.
    #[must_use]
    pub fn with_cognito_endpoint(mut self, url: impl Into<String>) -> Self {
        self.cognito_endpoint = Some(url.into());
        self
    }

    /// Admin session for the app, refreshed if its id token is expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the admin config or the app entry is
    /// missing, and `SessionExpired` if an expired token cannot be refreshed.
    pub async fn admin_session(&self, now: DateTime<Utc>) -> Result<Session> {
        let path = self
            .admin_config
            .as_deref()
            .ok_or_else(|| Error::Config("Could not determine home directory".into()))?;
        let entry = read_admin_entry(path, &self.app_id)?;

        let session = entry.session();
        if !session.is_expired_at(now) {
            debug!(app_id = %self.app_id, expires_at = ?session.expires_at(), "loaded admin session");
            return Ok(session);
        }

        debug!(app_id = %self.app_id, "admin id token expired, refreshing");
        self.refresh(&entry, now).await
    }

    async fn refresh(&self, entry: &AdminEntry, now: DateTime<Utc>) -> Result<Session> {
        let (Some(refresh), Some(client_id), Some(region)) = (
            entry.refresh_token.as_ref(),
            entry.client_id(),
            entry.region.as_deref(),
        ) else {
            warn!(app_id = %self.app_id, "admin config has no refresh token");
            return Err(Error::SessionExpired);
        };

        let endpoint = self
            .cognito_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-idp.{region}.amazonaws.com/"));
        let body = json!({
            "AuthFlow": "REFRESH_TOKEN_AUTH",
            "ClientId": client_id,
            "AuthParameters": { "REFRESH_TOKEN": refresh.token },
        });

        let response = self
            .client
            .post(&endpoint)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .header("X-Amz-Target", INITIATE_AUTH_TARGET)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| refresh_failed(&e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(refresh_failed(&format!("{status}: {text}")));
        }

        let result: InitiateAuthResponse = response
            .json()
            .await
            .map_err(|e| refresh_failed(&e.to_string()))?;
        let tokens = result
            .authentication_result
            .ok_or_else(|| refresh_failed("response carried no tokens"))?;

        let lifetime = tokens.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        debug!(app_id = %self.app_id, lifetime, "refreshed admin id token");
        let expires_at = Duration::try_seconds(lifetime).and_then(|d| now.checked_add_signed(d));
        Ok(Session::bearer(tokens.id_token, expires_at))
    }
}

fn refresh_failed(reason: &str) -> Error {
    warn!(reason, "failed to refresh admin tokens");
    Error::SessionExpired
}

impl SessionProvider for DefaultSessionProvider {
    async fn credentials(&self) -> Result<Session> {
        if let Some(key) = non_empty_env("RECSYNC_API_KEY") {
            debug!("using API key from RECSYNC_API_KEY");
            return Ok(Session::api_key(key));
        }
        if let Some(token) = non_empty_env("RECSYNC_TOKEN") {
            debug!("using bearer token from RECSYNC_TOKEN");
            return Ok(Session::bearer(token, None));
        }
        self.admin_session(Utc::now()).await
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// `~/.amplify/admin/config.json`.
fn admin_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| {
        b.home_dir()
            .join(".amplify")
            .join("admin")
            .join("config.json")
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminEntry {
    id_token: AdminToken,
    #[serde(default)]
    access_token: Option<AdminToken>,
    #[serde(default)]
    refresh_token: Option<RefreshToken>,
    #[serde(default)]
    region: Option<String>,
}

impl AdminEntry {
    fn session(&self) -> Session {
        let expires_at = Utc.timestamp_opt(self.id_token.payload.exp, 0).single();
        Session::bearer(self.id_token.jwt_token.clone(), expires_at)
    }

    /// App client the tokens were issued to.
    fn client_id(&self) -> Option<&str> {
        self.access_token
            .as_ref()
            .and_then(|t| t.payload.client_id.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminToken {
    jwt_token: String,
    #[serde(default)]
    payload: AdminTokenPayload,
}

#[derive(Debug, Default, Deserialize)]
struct AdminTokenPayload {
    #[serde(default)]
    exp: i64,
    #[serde(default)]
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshToken {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: String,
    expires_in: Option<i64>,
}

fn read_admin_entry(path: &Path, app_id: &str) -> Result<AdminEntry> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Admin credentials have not been created: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read admin config: {e}")))?;
    let mut entries: std::collections::HashMap<String, AdminEntry> =
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse admin config: {e}")))?;

    entries
        .remove(app_id)
        .ok_or_else(|| Error::Config(format!("No admin credentials for app {app_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_admin(dir: &TempDir, exp: i64) -> PathBuf {
        let path = dir.path().join("config.json");
        let content = serde_json::json!({
            "app123": {
                "idToken": {"jwtToken": "jwt-abc", "payload": {"exp": exp, "iss": "https://cognito"}},
                "accessToken": {"jwtToken": "access"},
                "region": "us-east-1"
            }
        });
        fs::write(&path, content.to_string()).unwrap();
        path
    }

    fn provider(app_id: &str, path: PathBuf) -> DefaultSessionProvider {
        DefaultSessionProvider::new(app_id)
            .with_admin_config(path)
            .with_cognito_endpoint("http://127.0.0.1:9/")
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_admin_session_valid() {
        let dir = TempDir::new().unwrap();
        let path = write_admin(&dir, 10_000);

        let session = provider("app123", path).admin_session(at(5_000)).await.unwrap();
        assert_eq!(session.auth(), &Auth::Bearer("jwt-abc".into()));
        assert_eq!(session.expires_at(), Some(at(10_000)));
    }

    #[tokio::test]
    async fn test_expires_early_without_refresh_token() {
        let dir = TempDir::new().unwrap();
        let path = write_admin(&dir, 10_000);

        let err = provider("app123", path).admin_session(at(9_950)).await.unwrap_err();
        assert!(matches!(err, Error::SessionExpired));
    }

    #[tokio::test]
    async fn test_admin_session_unknown_app() {
        let dir = TempDir::new().unwrap();
        let path = write_admin(&dir, 10_000);
        let err = provider("other", path).admin_session(at(0)).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_admin_config() {
        let err = provider("a", PathBuf::from("/nonexistent/config.json"))
            .admin_session(Utc::now())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("have not been created"));
    }

    #[test]
    fn test_api_key_never_expires() {
        let session = Session::api_key("k");
        assert!(!session.is_expired_at(Utc::now()));
        assert_eq!(format!("{:?}", session.auth()), "ApiKey(***)");
    }
}
