//! `auth`: interactive authorization-code flow.

use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use tracing::info;

use crate::auth::{ClientCredentials, CredentialRecord, CredentialStore};
use crate::error::{AppError, AppResult};
use crate::oauth::{authorization_url, TokenEndpoint};

/// Reads the client credentials (from `credentials_file` or pasted on
/// `input`), walks the user through consent and stores the resulting token.
pub async fn run<E, R, W>(
    store: &CredentialStore,
    endpoint: &E,
    credentials_file: Option<&Path>,
    input: &mut R,
    out: &mut W,
) -> AppResult<()>
where
    E: TokenEndpoint,
    R: BufRead,
    W: Write,
{
    let raw = match credentials_file {
        Some(path) => fs::read(path).map_err(|e| {
            AppError::InvalidCredentials(format!("failed to read {}: {}", path.display(), e))
        })?,
        None => {
            writeln!(out, "Please paste your credentials JSON (press Ctrl+D when done):")?;
            out.flush()?;
            read_pasted_credentials(input)?
        }
    };

    let credentials = ClientCredentials::parse(&raw)?;

    writeln!(
        out,
        "\nPlease visit the following URL to authorize this application:\n{}\n",
        authorization_url(&credentials)
    )?;
    write!(out, "Enter the authorization code: ")?;
    out.flush()?;

    let mut code = String::new();
    input.read_line(&mut code)?;
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::TokenExchangeFailed(
            "no authorization code provided".to_string(),
        ));
    }

    let token = endpoint.exchange_code(&credentials, code).await?;
    store.save(&CredentialRecord { credentials, token })?;
    info!("Saved credentials to {:?}", store.path());

    writeln!(
        out,
        "\nAuthentication successful!\nAuthentication saved to: {}",
        store.path().display()
    )?;
    Ok(())
}

fn read_pasted_credentials(input: &mut impl BufRead) -> AppResult<Vec<u8>> {
    let mut pasted = String::new();
    std::io::Read::read_to_string(input, &mut pasted)?;
    let pasted = pasted.trim();
    if pasted.is_empty() {
        return Err(AppError::InvalidCredentials(
            "no credentials provided".to_string(),
        ));
    }
    Ok(pasted.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{Cursor, Read};

    use chrono::{Duration, Utc};

    use super::*;
    use crate::auth::Token;
    use crate::oauth::testing::FakeEndpoint;

    const CREDENTIALS_JSON: &str = r#"{"installed": {
        "client_id": "123.apps.googleusercontent.com",
        "client_secret": "shh",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token",
        "redirect_uris": ["http://localhost"]
    }}"#;

    fn issued_token() -> Token {
        Token {
            access_token: "ya29".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expiry: Some(Utc::now() + Duration::hours(1)),
        }
    }

    /// Stdin on a terminal: each Ctrl+D ends one read-to-EOF, and reading
    /// continues with whatever is typed next.
    struct TerminalInput {
        segments: VecDeque<Cursor<Vec<u8>>>,
    }

    impl TerminalInput {
        fn new(segments: &[&str]) -> Self {
            Self {
                segments: segments
                    .iter()
                    .map(|s| Cursor::new(s.as_bytes().to_vec()))
                    .collect(),
            }
        }

        fn pop_if_drained(&mut self) -> bool {
            let drained = self
                .segments
                .front()
                .is_some_and(|s| s.position() as usize >= s.get_ref().len());
            if drained {
                self.segments.pop_front();
            }
            drained
        }
    }

    impl Read for TerminalInput {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pop_if_drained() {
                return Ok(0);
            }
            match self.segments.front_mut() {
                Some(segment) => segment.read(buf),
                None => Ok(0),
            }
        }
    }

    impl BufRead for TerminalInput {
        fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
            if self.pop_if_drained() {
                return Ok(&[]);
            }
            match self.segments.front_mut() {
                Some(segment) => segment.fill_buf(),
                None => Ok(&[]),
            }
        }

        fn consume(&mut self, amt: usize) {
            if let Some(segment) = self.segments.front_mut() {
                segment.consume(amt);
            }
        }
    }

    fn fixture() -> (tempfile::TempDir, CredentialStore, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let creds_path = dir.path().join("credentials.json");
        fs::write(&creds_path, CREDENTIALS_JSON).unwrap();
        let store = CredentialStore::new(dir.path().join("gs-write").join("auth.json"));
        (dir, store, creds_path)
    }

    #[tokio::test]
    async fn stores_exchanged_token() {
        let (_dir, store, creds_path) = fixture();
        let endpoint = FakeEndpoint::returning(Some(issued_token()));
        let mut out = Vec::new();

        run(&store, &endpoint, Some(&creds_path), &mut "good-code\n".as_bytes(), &mut out)
            .await
            .unwrap();

        let record = store.load().unwrap();
        assert_eq!(record.token.access_token, "ya29");
        assert_eq!(record.token.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(record.credentials.client_id, "123.apps.googleusercontent.com");

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("access_type=offline"));
        assert!(printed.contains("state=state-token"));
        assert!(printed.contains("Authentication successful!"));
    }

    #[tokio::test]
    async fn rejected_code_saves_nothing() {
        let (_dir, store, creds_path) = fixture();
        let endpoint = FakeEndpoint::returning(Some(issued_token()));

        let err = run(&store, &endpoint, Some(&creds_path), &mut "bad-code\n".as_bytes(), &mut Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TokenExchangeFailed(_)));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn missing_code_is_an_error() {
        let (_dir, store, creds_path) = fixture();
        let endpoint = FakeEndpoint::returning(Some(issued_token()));

        let err = run(&store, &endpoint, Some(&creds_path), &mut "".as_bytes(), &mut Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TokenExchangeFailed(_)));
    }

    #[tokio::test]
    async fn pasted_credentials_then_code() {
        let (_dir, store, _) = fixture();
        let endpoint = FakeEndpoint::returning(Some(issued_token()));
        let mut input = TerminalInput::new(&[CREDENTIALS_JSON, "good-code\n"]);
        let mut out = Vec::new();

        run(&store, &endpoint, None, &mut input, &mut out).await.unwrap();

        let record = store.load().unwrap();
        assert_eq!(record.credentials.client_id, "123.apps.googleusercontent.com");
        assert_eq!(record.credentials.redirect_url.as_deref(), Some("http://localhost"));
        assert_eq!(record.token.access_token, "ya29");

        let printed = String::from_utf8(out).unwrap();
        let paste_prompt = printed.find("Please paste").unwrap();
        let code_prompt = printed.find("Enter the authorization code: ").unwrap();
        assert!(paste_prompt < code_prompt);
        assert!(printed.contains("client_id=123.apps.googleusercontent.com"));
        assert!(printed.ends_with(&format!("Authentication saved to: {}\n", store.path().display())));
    }

    #[tokio::test]
    async fn empty_paste_is_invalid() {
        let (_dir, store, _) = fixture();
        let endpoint = FakeEndpoint::returning(Some(issued_token()));
        let mut out = Vec::new();

        let err = run(&store, &endpoint, None, &mut "  \n".as_bytes(), &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidCredentials(_)));
        assert!(String::from_utf8(out).unwrap().starts_with("Please paste"));
    }

    #[tokio::test]
    async fn malformed_credentials_file_is_invalid() {
        let (dir, store, _) = fixture();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{\"installed\": 3}").unwrap();
        let endpoint = FakeEndpoint::returning(Some(issued_token()));

        let err = run(&store, &endpoint, Some(&bad), &mut "good-code\n".as_bytes(), &mut Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidCredentials(_)));
    }
}
