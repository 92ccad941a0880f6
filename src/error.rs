//! Exporter error taxonomy
//!
//! Only [`Error::Transport`] ever reaches a scrape client. Parse errors are
//! logged and the offending record is skipped; configuration and session
//! errors are fatal at startup.

/// Errors raised by the exporter and its Azure collaborators.
///
/// # Examples
///
/// ```rust
/// use azure_health_exporter::Error;
///
/// let err = Error::Parse("/subscriptions/S".to_string());
/// assert!(err.to_string().contains("/subscriptions/S"));
/// assert!(!err.is_transport());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file is unreadable or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Azure session could not be set up (missing subscription or credentials).
    #[error("Session error: {0}")]
    Session(String),

    /// An upstream Azure call failed: network, non-2xx status, bad payload or token.
    #[error("Transport error: {0:#}")]
    Transport(anyhow::Error),

    /// A resource identifier does not have the expected structure.
    #[error("Error parsing resource ID, expected pattern is not matched for {0}")]
    Parse(String),
}

impl Error {
    /// Whether this error aborts a collection cycle.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Transport(err)
    }
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
