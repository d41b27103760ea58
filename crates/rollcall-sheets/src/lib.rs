//! Google Sheets mirror for roster records.
//!
//! Two halves:
//! - credentials: the OAuth client secret, the cached token file and the
//!   providers that hand out bearer tokens
//! - appender: the [`Mirror`] that appends one row per created record

mod appender;
mod bootstrap;
mod credentials;
mod error;

pub use appender::{Mirror, SheetsMirror};
pub use bootstrap::InteractiveBootstrap;
pub use credentials::{
    load_token, save_token, CachedTokenProvider, CredentialProvider, CredentialState, OAuthClient,
    Token,
};
pub use error::{SheetsError, SheetsResult};
