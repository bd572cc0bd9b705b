// ================================================================
// File: statusbot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration. Fatal, raised before startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// One of the external services could not be reached at startup. Fatal.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single status query failed. Transient.
    #[error("Query error: {0}")]
    Query(String),

    /// Pushing presence or a reply to the chat platform failed. Transient.
    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Event bus error: {0}")]
    EventBus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Only the two startup classes terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_startup_errors_are_fatal() {
        assert!(Error::Config("no token".into()).is_fatal());
        assert!(Error::Connection("gateway down".into()).is_fatal());
        assert!(!Error::Query("timed out".into()).is_fatal());
        assert!(!Error::Publish("rate limited".into()).is_fatal());
        assert!(!Error::Platform("bad channel".into()).is_fatal());
    }

    #[test]
    fn display_names_the_class() {
        let err = Error::Query("no reply".into());
        assert_eq!(err.to_string(), "Query error: no reply");
    }
}
