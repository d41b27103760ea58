use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use rollcall_config::SheetsConfig;
use rollcall_types::UserRecord;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::credentials::{CachedTokenProvider, CredentialProvider};
use crate::error::{SheetsError, SheetsResult};

const USER_AGENT_VALUE: &str = concat!("rollcall/", env!("CARGO_PKG_VERSION"));

const HTTP_TIMEOUT_SECS: u64 = 30;

/// External copy of created records. One call per record, no retry.
#[async_trait]
pub trait Mirror: Send + Sync {
    async fn append(&self, record: &UserRecord) -> SheetsResult<()>;
}

/// Appends rows through the Sheets `values:append` endpoint with RAW input.
pub struct SheetsMirror {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    range: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl SheetsMirror {
    pub fn new(config: &SheetsConfig, credentials: Arc<dyn CredentialProvider>) -> SheetsResult<Self> {
        Ok(Self {
            http: http_client()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            credentials,
        })
    }

    /// Mirror backed by the token file written by `rollcall auth`.
    pub fn from_config(config: &SheetsConfig) -> SheetsResult<Self> {
        let provider = CachedTokenProvider::new(
            config.token_path(),
            config.credentials_path(),
            http_client()?,
        );
        Self::new(config, Arc::new(provider))
    }

    fn append_url(&self) -> SheetsResult<Url> {
        let invalid = |message: String| SheetsError::Config { message };

        let append_segment = format!("{}:append", self.range);
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| invalid(format!("invalid api_url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("api_url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                append_segment.as_str(),
            ]);
        Ok(url)
    }
}

#[async_trait]
impl Mirror for SheetsMirror {
    async fn append(&self, record: &UserRecord) -> SheetsResult<()> {
        let token = self.credentials.bearer_token().await?;
        let url = self.append_url()?;
        debug!(url = %url, name = %record.name, "appending row");

        let response = self
            .http
            .post(url)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(token)
            .json(&json!({ "values": [record.to_row()] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

pub(crate) fn http_client() -> SheetsResult<reqwest::Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .default_headers(default_headers)
        .build()
        .map_err(|e| SheetsError::Network {
            message: format!("failed to create HTTP client: {}", e),
        })
}
