use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;
use url::Url;

use crate::credentials::{request_token, OAuthClient, Token};
use crate::error::{SheetsError, SheetsResult};

const STATE_TOKEN: &str = "state-token";

/// One-time authorization code flow run by the operator. The resulting token
/// is what [`crate::CachedTokenProvider`] serves afterwards.
pub struct InteractiveBootstrap {
    client: OAuthClient,
    scope: String,
    http: reqwest::Client,
}

impl InteractiveBootstrap {
    pub fn new(client: OAuthClient, scope: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            client,
            scope: scope.into(),
            http,
        }
    }

    /// URL the operator opens in a browser to obtain an authorization code.
    pub fn authorization_url(&self) -> SheetsResult<String> {
        let url = Url::parse_with_params(
            &self.client.auth_uri,
            &[
                ("client_id", self.client.client_id.as_str()),
                ("redirect_uri", self.client.redirect_uri()),
                ("response_type", "code"),
                ("scope", self.scope.as_str()),
                ("state", STATE_TOKEN),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| SheetsError::Config {
            message: format!("invalid auth_uri {}: {}", self.client.auth_uri, e),
        })?;
        Ok(url.to_string())
    }

    /// Blocks until one line (the authorization code) is read from `input`.
    pub async fn read_code<R>(&self, input: &mut R) -> SheetsResult<String>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();
        input
            .read_line(&mut line)
            .await
            .map_err(|e| SheetsError::Authorization {
                message: format!("unable to read authorization code: {}", e),
            })?;

        let code = line.trim();
        if code.is_empty() {
            return Err(SheetsError::Authorization {
                message: "no authorization code entered".to_string(),
            });
        }
        Ok(code.to_string())
    }

    pub async fn exchange_code(&self, code: &str) -> SheetsResult<Token> {
        let token = request_token(
            &self.http,
            &self.client,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("redirect_uri", self.client.redirect_uri()),
            ],
        )
        .await?;
        info!("Exchanged authorization code for a {} token", token.token_type);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootstrap() -> InteractiveBootstrap {
        let client = OAuthClient {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            auth_uri: "https://accounts.example.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.example.com/token".to_string(),
            redirect_uris: vec!["http://localhost".to_string()],
        };
        InteractiveBootstrap::new(
            client,
            "https://www.googleapis.com/auth/spreadsheets",
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_authorization_url() {
        let url = Url::parse(&bootstrap().authorization_url().unwrap()).unwrap();
        assert_eq!(url.host_str(), Some("accounts.example.com"));

        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["redirect_uri"], "http://localhost");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "https://www.googleapis.com/auth/spreadsheets");
        assert_eq!(params["state"], "state-token");
        assert_eq!(params["access_type"], "offline");
    }

    #[tokio::test]
    async fn test_read_code_trims() {
        let mut input: &[u8] = b"  4/0Abc-code \n";
        assert_eq!(bootstrap().read_code(&mut input).await.unwrap(), "4/0Abc-code");
    }

    #[tokio::test]
    async fn test_read_code_empty() {
        let mut input: &[u8] = b"";
        assert!(matches!(
            bootstrap().read_code(&mut input).await,
            Err(SheetsError::Authorization { .. })
        ));
    }
}
