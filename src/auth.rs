//! Credential storage: the OAuth client identity and its current token,
//! persisted together in `auth.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::oauth::TokenEndpoint;
use crate::paths::write_private;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_DELTA_SECS: i64 = 10;

/// OAuth client identity taken from a provider-issued credentials document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ClientCredentials {
    /// Parses a Google client secret document (`installed` or `web` section)
    /// and scopes it to spreadsheet access.
    pub fn parse(raw: &[u8]) -> AppResult<Self> {
        let secret = yup_oauth2::parse_application_secret(raw)
            .map_err(|e| AppError::InvalidCredentials(e.to_string()))?;

        let required = [
            ("client_id", &secret.client_id),
            ("client_secret", &secret.client_secret),
            ("auth_uri", &secret.auth_uri),
            ("token_uri", &secret.token_uri),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AppError::InvalidCredentials(format!("missing {}", field)));
        }

        Ok(Self {
            client_id: secret.client_id,
            client_secret: secret.client_secret,
            auth_url: secret.auth_uri,
            token_url: secret.token_uri,
            redirect_url: secret.redirect_uris.into_iter().next(),
            scopes: vec![SPREADSHEETS_SCOPE.to_string()],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `None` means the provider gave no expiry; such tokens never expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_DELTA_SECS) < expiry,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub credentials: ClientCredentials,
    pub token: Token,
}

/// `auth.json` in the user's config directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> AppResult<CredentialRecord> {
        let content = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::NotAuthenticated {
                path: self.path.clone(),
            },
            _ => AppError::persistence("read", &self.path, e),
        })?;

        let record: CredentialRecord =
            serde_json::from_str(&content).map_err(|e| AppError::CorruptCredentials {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        debug!("Loaded credentials from {:?}", self.path);
        Ok(record)
    }

    pub fn save(&self, record: &CredentialRecord) -> AppResult<()> {
        let content = serde_json::to_string_pretty(record).map_err(|e| {
            AppError::persistence("serialize", &self.path, std::io::Error::new(ErrorKind::InvalidData, e))
        })?;
        write_private(&self.path, content.as_bytes())?;
        debug!("Saved credentials to {:?}", self.path);
        Ok(())
    }

    /// Returns the stored client and a usable token.
    ///
    /// An expired token is refreshed through `endpoint` and the new token is
    /// written back before returning. The file is left untouched when the
    /// refresh cannot happen.
    pub async fn get_valid_client<E: TokenEndpoint>(
        &self,
        endpoint: &E,
    ) -> AppResult<(ClientCredentials, Token)> {
        let mut record = self.load()?;

        if record.token.is_valid() {
            debug!("Stored access token is still valid");
            return Ok((record.credentials, record.token));
        }

        let refresh_token = record
            .token
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::ReauthenticationRequired {
                reason: "access token expired and no refresh token is stored".to_string(),
            })?;

        info!("Access token expired, refreshing");
        let mut token = endpoint
            .refresh(&record.credentials, &refresh_token)
            .await
            .map_err(|e| match e {
                AppError::ReauthenticationRequired { .. } => e,
                other => AppError::ReauthenticationRequired {
                    reason: other.to_string(),
                },
            })?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token);
        }

        record.token = token;
        self.save(&record)?;
        Ok((record.credentials, record.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::testing::FakeEndpoint;

    const INSTALLED_JSON: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "project_id": "gs-write",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    fn credentials() -> ClientCredentials {
        ClientCredentials::parse(INSTALLED_JSON.as_bytes()).unwrap()
    }

    fn token(access: &str, refresh: Option<&str>, expiry: Option<DateTime<Utc>>) -> Token {
        Token {
            access_token: access.to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: refresh.map(str::to_string),
            expiry,
        }
    }

    fn store_with(dir: &tempfile::TempDir, token: Token) -> CredentialStore {
        let store = CredentialStore::new(dir.path().join("auth.json"));
        store
            .save(&CredentialRecord {
                credentials: credentials(),
                token,
            })
            .unwrap();
        store
    }

    #[test]
    fn parses_installed_credentials() {
        let creds = credentials();
        assert_eq!(creds.client_id, "123.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "shh");
        assert_eq!(creds.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(creds.redirect_url.as_deref(), Some("http://localhost"));
        assert_eq!(creds.scopes, vec![SPREADSHEETS_SCOPE.to_string()]);
    }

    #[test]
    fn parses_web_credentials() {
        let raw = INSTALLED_JSON.replace("\"installed\"", "\"web\"");
        assert_eq!(ClientCredentials::parse(raw.as_bytes()).unwrap(), credentials());
    }

    #[test]
    fn rejects_malformed_credentials() {
        for raw in ["not json", "{}", r#"{"other": {}}"#] {
            let err = ClientCredentials::parse(raw.as_bytes()).unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials(_)), "{}", raw);
        }
    }

    #[test]
    fn rejects_empty_client_id() {
        let raw = INSTALLED_JSON.replace("123.apps.googleusercontent.com", "");
        let err = ClientCredentials::parse(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials(ref m) if m.contains("client_id")));
    }

    #[test]
    fn token_validity() {
        let now = Utc::now();
        assert!(token("a", None, None).is_valid_at(now));
        assert!(token("a", None, Some(now + Duration::hours(1))).is_valid_at(now));
        assert!(!token("a", None, Some(now - Duration::hours(1))).is_valid_at(now));
        assert!(!token("a", None, Some(now + Duration::seconds(5))).is_valid_at(now));
        assert!(!token("", None, None).is_valid_at(now));
    }

    #[test]
    fn missing_file_is_not_authenticated() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("auth.json"));
        assert!(matches!(store.load().unwrap_err(), AppError::NotAuthenticated { .. }));
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("auth.json"));
        fs::write(store.path(), "{\"credentials\": 1").unwrap();
        assert!(matches!(store.load().unwrap_err(), AppError::CorruptCredentials { .. }));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let record = CredentialRecord {
            credentials: credentials(),
            token: token("access", Some("refresh"), Some(Utc::now() + Duration::hours(1))),
        };
        let store = CredentialStore::new(dir.path().join("nested").join("auth.json"));

        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap(), record);
    }

    #[tokio::test]
    async fn valid_token_is_returned_without_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let stored = token("access", Some("refresh"), Some(Utc::now() + Duration::hours(1)));
        let store = store_with(&dir, stored.clone());
        let endpoint = FakeEndpoint::returning(None);

        let (creds, token) = store.get_valid_client(&endpoint).await.unwrap();

        assert_eq!(creds, credentials());
        assert_eq!(token, stored);
        assert_eq!(endpoint.refresh_calls.get(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(
            &dir,
            token("old", Some("refresh"), Some(Utc::now() - Duration::hours(1))),
        );
        let fresh = token("new", None, Some(Utc::now() + Duration::hours(1)));
        let endpoint = FakeEndpoint::returning(Some(fresh.clone()));

        let (_, token) = store.get_valid_client(&endpoint).await.unwrap();

        assert_eq!(endpoint.refresh_calls.get(), 1);
        assert_eq!(endpoint.last_refresh_token.borrow().as_deref(), Some("refresh"));
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(store.load().unwrap().token, token);
        assert_eq!(token.expiry, fresh.expiry);
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_needs_reauth() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, token("old", None, Some(Utc::now() - Duration::hours(1))));
        let before = fs::read(store.path()).unwrap();
        let endpoint = FakeEndpoint::returning(None);

        let err = store.get_valid_client(&endpoint).await.unwrap_err();

        assert!(matches!(err, AppError::ReauthenticationRequired { .. }));
        assert_eq!(endpoint.refresh_calls.get(), 0);
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn failed_refresh_needs_reauth_and_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(
            &dir,
            token("old", Some("revoked"), Some(Utc::now() - Duration::hours(1))),
        );
        let before = fs::read(store.path()).unwrap();
        let endpoint = FakeEndpoint::returning(None);

        let err = store.get_valid_client(&endpoint).await.unwrap_err();

        assert!(matches!(err, AppError::ReauthenticationRequired { ref reason } if reason.contains("invalid_grant")));
        assert_eq!(endpoint.refresh_calls.get(), 1);
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn missing_file_is_not_reauth() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("auth.json"));
        let endpoint = FakeEndpoint::returning(None);

        let err = store.get_valid_client(&endpoint).await.unwrap_err();
        assert!(matches!(err, AppError::NotAuthenticated { .. }));
    }
}
