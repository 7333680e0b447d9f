use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing required profile fields: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("profile '{0}' not found in the profile store")]
    ProfileNotFound(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("no new invoice file appeared within {timeout:?} (download may have failed)")]
    DownloadTimeout { timeout: Duration },

    #[error("browser session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse profile store: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error aborts the whole batch instead of one attempt.
    /// Only configuration and profile-store problems are fatal; everything
    /// that can happen during a single attempt is contained by the retry loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::ProfileNotFound(_) | Error::Parse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
