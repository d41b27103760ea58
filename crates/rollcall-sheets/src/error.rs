//! Error types for the Sheets mirror.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    /// Client secret file missing or malformed.
    #[error("unable to load client secret {path}: {message}")]
    ClientSecret { path: PathBuf, message: String },

    /// No usable token on disk; the operator has to authorize first.
    #[error("no cached token at {path}, run `rollcall auth` to authorize")]
    NoCachedToken { path: PathBuf },

    #[error("cached token expired and has no refresh token, run `rollcall auth` again")]
    TokenExpired,

    #[error("unable to write token file {path}: {message}")]
    TokenFile { path: PathBuf, message: String },

    /// Token endpoint refused the code or refresh token.
    #[error("authorization failed: {message}")]
    Authorization { message: String },

    #[error("network error: {message}")]
    Network { message: String },

    /// Sheets API answered with a non-success status.
    #[error("sheets API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl From<reqwest::Error> for SheetsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

pub type SheetsResult<T> = Result<T, SheetsError>;
