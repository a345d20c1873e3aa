//! Error types for the nbody-trajectory crate.

use std::fmt;

/// Result type for trajectory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while locating, fetching or reading a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// HTTP request failed before a response arrived.
    Http {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The payload was not a well-formed scenario.
    Parse {
        /// Which part of the payload was rejected.
        context: &'static str,
        /// Description of what was wrong.
        detail: String,
    },
    /// A descriptor's data file does not resolve under the data root.
    InvalidPath {
        /// The offending file reference.
        file: String,
    },
    /// A time-step index outside the trajectory.
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of samples in the trajectory.
        len: usize,
    },
}

impl Error {
    /// Whether this error came from the network (transport or status).
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Http { .. } | Error::HttpStatus { .. })
    }

    /// Whether this error came from reading the payload.
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }

    pub(crate) fn parse(context: &'static str, detail: impl Into<String>) -> Self {
        Error::Parse {
            context,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status } => {
                write!(f, "http request to {url} returned status {status}")
            }
            Error::Parse { context, detail } => {
                write!(f, "invalid {context}: {detail}")
            }
            Error::InvalidPath { file } => {
                write!(f, "data file '{file}' does not resolve under the data root")
            }
            Error::IndexOutOfRange { index, len } => {
                write!(f, "time step {index} out of range for {len} samples")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse {
            context: "scenario json",
            detail: e.to_string(),
        }
    }
}
