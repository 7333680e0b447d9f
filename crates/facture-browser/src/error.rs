use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("Element '{selector}' not found within {timeout:?}")]
    ElementTimeout { selector: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

// Anything that goes wrong while driving a page is a navigation failure from
// the engine's point of view; the retry controller decides what to do with it.
impl From<Error> for facture_core::Error {
    fn from(err: Error) -> Self {
        facture_core::Error::Navigation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
