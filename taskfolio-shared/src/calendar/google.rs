/// Google Calendar bridge
///
/// Implements the authorization-code OAuth2 flow against Google and the
/// event push to the user's primary calendar, using plain HTTPS calls.
///
/// The flow:
/// 1. [`build_auth_url`] sends the user to Google's consent screen with a
///    random `state` the caller must remember.
/// 2. [`exchange_code`] trades the returned code for a token set.
/// 3. [`sync_tasks`] pushes one all-day event per due-dated task to the
///    `primary` calendar, sequentially, best effort: the first failing
///    insert aborts the remaining loop.
///
/// Client credentials come from a Google client-secrets JSON file
/// (`credentials.json` format, `web` or `installed` key). A missing or
/// malformed file is a reported condition, never a crash.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use url::Url;

use crate::models::task::Task;

/// OAuth scope required to insert calendar events
pub const SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const EVENTS_ENDPOINT: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";

/// Error type for the Google Calendar bridge
///
/// Everything here is an external-service condition from the caller's
/// point of view: it gets reported as a one-line message, never panics.
#[derive(Debug, thiserror::Error)]
pub enum GoogleError {
    /// Client-secrets file is missing
    #[error("Google OAuth credentials file not found: {0}")]
    CredentialsNotFound(String),

    /// Client-secrets file could not be read or parsed
    #[error("Failed to load Google OAuth credentials: {0}")]
    CredentialsInvalid(String),

    /// The user has not completed the OAuth flow yet
    #[error("Google authentication required")]
    NotAuthenticated,

    /// Network-level failure talking to Google
    #[error("Google API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Google answered with a non-success status
    #[error("Google API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// OAuth client credentials from a Google client-secrets file
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

/// Raw shape of a `credentials.json` file
///
/// Google emits the secrets under either a `web` or `installed` key.
#[derive(Debug, Deserialize)]
struct SecretsFile {
    web: Option<ClientSecrets>,
    installed: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Loads client secrets from a `credentials.json` file
    ///
    /// # Errors
    ///
    /// - `GoogleError::CredentialsNotFound` if the file does not exist
    /// - `GoogleError::CredentialsInvalid` if it cannot be parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GoogleError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GoogleError::CredentialsNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GoogleError::CredentialsInvalid(e.to_string()))?;

        let file: SecretsFile = serde_json::from_str(&contents)
            .map_err(|e| GoogleError::CredentialsInvalid(e.to_string()))?;

        file.web.or(file.installed).ok_or_else(|| {
            GoogleError::CredentialsInvalid(
                "expected a 'web' or 'installed' section".to_string(),
            )
        })
    }
}

/// A token set obtained from the OAuth exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Short-lived access token for API calls
    pub access_token: String,

    /// Long-lived token used to obtain fresh access tokens
    ///
    /// Google only returns this on the initial consent, so it is carried
    /// forward across refreshes.
    pub refresh_token: Option<String>,

    /// When the access token expires, if Google said
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    /// Whether the access token is expired (or about to, within a minute)
    pub fn needs_refresh(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() + Duration::seconds(60) >= at,
            None => false,
        }
    }
}

/// Wire format of Google's token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token_set(self, previous_refresh: Option<String>) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }
}

/// Builds the Google consent URL for the authorization-code flow
///
/// `state` is echoed back on the callback and must be verified there.
/// `access_type=offline` with `prompt=consent` asks Google for a refresh
/// token alongside the access token.
pub fn build_auth_url(secrets: &ClientSecrets, redirect_uri: &str, state: &str) -> String {
    let mut url = Url::parse(AUTH_ENDPOINT).expect("static endpoint URL is valid");
    url.query_pairs_mut()
        .append_pair("client_id", &secrets.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", SCOPE)
        .append_pair("access_type", "offline")
        .append_pair("include_granted_scopes", "true")
        .append_pair("prompt", "consent")
        .append_pair("state", state);
    url.to_string()
}

/// Exchanges an authorization code for a token set
///
/// # Errors
///
/// Returns `GoogleError::Api` if Google rejects the code, or
/// `GoogleError::Http` on a network failure.
pub async fn exchange_code(
    client: &reqwest::Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenSet, GoogleError> {
    debug!("Exchanging OAuth authorization code for tokens");

    let response = client
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("code", code),
            ("client_id", &secrets.client_id),
            ("client_secret", &secrets.client_secret),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GoogleError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let token: TokenResponse = response.json().await?;
    info!("OAuth token exchange succeeded");
    Ok(token.into_token_set(None))
}

/// Obtains a fresh access token using the stored refresh token
///
/// # Errors
///
/// Returns `GoogleError::NotAuthenticated` if the token set has no refresh
/// token, otherwise the same failure modes as [`exchange_code`].
pub async fn refresh_tokens(
    client: &reqwest::Client,
    secrets: &ClientSecrets,
    tokens: &TokenSet,
) -> Result<TokenSet, GoogleError> {
    let refresh_token = tokens
        .refresh_token
        .as_deref()
        .ok_or(GoogleError::NotAuthenticated)?;

    debug!("Refreshing Google access token");

    let response = client
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("refresh_token", refresh_token),
            ("client_id", &secrets.client_id),
            ("client_secret", &secrets.client_secret),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GoogleError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.into_token_set(tokens.refresh_token.clone()))
}

/// Wire format of a calendar event insert
#[derive(Debug, Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventDate,
    end: EventDate,
}

#[derive(Debug, Serialize)]
struct EventDate {
    date: String,
}

/// Inserts one all-day event on the user's primary calendar
async fn insert_event(
    client: &reqwest::Client,
    access_token: &str,
    task: &Task,
    due: chrono::NaiveDate,
) -> Result<(), GoogleError> {
    let date = due.format("%Y-%m-%d").to_string();

    let body = EventBody {
        summary: &task.title,
        description: task.description.as_deref().unwrap_or(""),
        start: EventDate { date: date.clone() },
        end: EventDate { date },
    };

    let response = client
        .post(EVENTS_ENDPOINT)
        .bearer_auth(access_token)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GoogleError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(())
}

/// Pushes every due-dated task as an event, one insert per task
///
/// Sequential and best effort: the first failing insert aborts the rest of
/// the loop and the error reports how far the sync got. There is no
/// rollback of events already inserted.
///
/// # Returns
///
/// The number of events inserted.
pub async fn sync_tasks(
    client: &reqwest::Client,
    access_token: &str,
    tasks: &[Task],
) -> Result<usize, GoogleError> {
    let mut synced = 0;

    for task in tasks {
        let Some(due) = task.due_date else {
            continue;
        };
        insert_event(client, access_token, task, due).await?;
        synced += 1;
    }

    info!(synced, "Pushed tasks to Google Calendar");
    Ok(synced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_url_carries_required_parameters() {
        let secrets = ClientSecrets {
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
        };

        let url = build_auth_url(&secrets, "http://localhost:8080/v1/google/callback", "st8");
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert!(pairs.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("state".to_string(), "st8".to_string())));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
        assert!(pairs.contains(&("scope".to_string(), SCOPE.to_string())));
        // The secret must never appear in the browser-facing URL
        assert!(!url.contains("shh"));
    }

    #[test]
    fn test_secrets_file_missing() {
        let result = ClientSecrets::load("/nonexistent/credentials.json");
        assert!(matches!(result, Err(GoogleError::CredentialsNotFound(_))));
    }

    #[test]
    fn test_secrets_file_web_section() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("taskfolio-creds-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"web": {"client_id": "id-1", "client_secret": "sec-1"}}"#,
        )
        .unwrap();

        let secrets = ClientSecrets::load(&path).unwrap();
        assert_eq!(secrets.client_id, "id-1");
        assert_eq!(secrets.client_secret, "sec-1");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_secrets_file_without_known_section() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("taskfolio-creds-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"something_else": {}}"#).unwrap();

        let result = ClientSecrets::load(&path);
        assert!(matches!(result, Err(GoogleError::CredentialsInvalid(_))));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_token_set_refresh_preserved() {
        let response = TokenResponse {
            access_token: "new-access".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
        };

        let tokens = response.into_token_set(Some("old-refresh".to_string()));
        assert_eq!(tokens.refresh_token.as_deref(), Some("old-refresh"));
        assert!(!tokens.needs_refresh());
    }

    #[test]
    fn test_needs_refresh_when_expired() {
        let tokens = TokenSet {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() - Duration::hours(1)),
        };
        assert!(tokens.needs_refresh());

        let no_expiry = TokenSet {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: None,
        };
        assert!(!no_expiry.needs_refresh());
    }
}
