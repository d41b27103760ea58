use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{SheetsError, SheetsResult};

/// Tokens this close to expiry are treated as expired.
const EXPIRY_DELTA_SECS: i64 = 10;

const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// OAuth client registration, read from the client secret file.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

impl OAuthClient {
    pub fn load(path: &Path) -> SheetsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SheetsError::ClientSecret {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|message| SheetsError::ClientSecret {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Accepts both the "installed" and "web" client layouts.
    pub fn parse(content: &str) -> Result<Self, String> {
        let file: ClientSecretFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "missing \"installed\" or \"web\" client".to_string())
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(OOB_REDIRECT_URI)
    }
}

/// Bearer credential as persisted in the token file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// The zero timestamp `0001-01-01T00:00:00Z` means the token never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) if expiry.year() > 1 => {
                expiry <= now + Duration::seconds(EXPIRY_DELTA_SECS)
            }
            _ => false,
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token,
            expiry: self
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }
}

/// POST a form to the client's token endpoint.
pub(crate) async fn request_token(
    http: &reqwest::Client,
    client: &OAuthClient,
    form: &[(&str, &str)],
) -> SheetsResult<Token> {
    let response = http
        .post(&client.token_uri)
        .form(form)
        .send()
        .await
        .map_err(|e| SheetsError::Network {
            message: format!("token request failed: {}", e),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SheetsError::Authorization {
            message: format!("HTTP {} - {}", status, body),
        });
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| SheetsError::InvalidResponse {
            message: format!("failed to parse token response: {}", e),
        })?;

    Ok(token.into_token())
}

pub fn load_token(path: &Path) -> SheetsResult<Token> {
    let content = std::fs::read_to_string(path).map_err(|_| SheetsError::NoCachedToken {
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&content).map_err(|e| {
        debug!("Unreadable token file {}: {}", path.display(), e);
        SheetsError::NoCachedToken {
            path: path.to_path_buf(),
        }
    })
}

/// Write the token readable by the owner only.
pub fn save_token(path: &Path, token: &Token) -> SheetsResult<()> {
    let to_error = |message: String| SheetsError::TokenFile {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| to_error(e.to_string()))?;
    }
    let content = serde_json::to_vec_pretty(token).map_err(|e| to_error(e.to_string()))?;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| to_error(e.to_string()))?;
    file.write_all(&content).map_err(|e| to_error(e.to_string()))?;
    Ok(())
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> SheetsResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    NoCachedToken,
    Cached(Token),
}

/// Serves the token persisted by `rollcall auth`. Never prompts; a missing
/// token is reported as an error so live requests are not blocked.
pub struct CachedTokenProvider {
    token_path: PathBuf,
    credentials_path: PathBuf,
    http: reqwest::Client,
    state: RwLock<CredentialState>,
}

impl CachedTokenProvider {
    pub fn new(token_path: PathBuf, credentials_path: PathBuf, http: reqwest::Client) -> Self {
        Self {
            token_path,
            credentials_path,
            http,
            state: RwLock::new(CredentialState::NoCachedToken),
        }
    }

    pub async fn state(&self) -> CredentialState {
        self.state.read().await.clone()
    }

    async fn refresh(&self, token: &Token, refresh_token: &str) -> SheetsResult<Token> {
        let client = OAuthClient::load(&self.credentials_path)?;
        info!("Refreshing expired token via {}", client.token_uri);

        let mut refreshed = request_token(
            &self.http,
            &client,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
            ],
        )
        .await?;

        if refreshed.refresh_token().is_none() {
            refreshed.refresh_token = token.refresh_token.clone();
        }
        save_token(&self.token_path, &refreshed)?;
        Ok(refreshed)
    }
}

#[async_trait]
impl CredentialProvider for CachedTokenProvider {
    async fn bearer_token(&self) -> SheetsResult<String> {
        {
            let state = self.state.read().await;
            if let CredentialState::Cached(token) = &*state {
                if !token.is_expired(Utc::now()) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut state = self.state.write().await;
        let token = match &*state {
            CredentialState::Cached(token) => token.clone(),
            CredentialState::NoCachedToken => {
                let token = load_token(&self.token_path)?;
                debug!("Loaded cached token from {}", self.token_path.display());
                token
            }
        };

        let token = if token.is_expired(Utc::now()) {
            let refresh_token = token
                .refresh_token()
                .ok_or(SheetsError::TokenExpired)?
                .to_string();
            self.refresh(&token, &refresh_token).await?
        } else {
            token
        };

        let access_token = token.access_token.clone();
        *state = CredentialState::Cached(token);
        Ok(access_token)
    }
}
