//! Error handling for census operations.
//!
//! Fetch and resolution failures never abort a scan; they are recorded in the
//! per-task outcomes and logged. This type still carries them so the outcome
//! records and the log lines can say what went wrong.

use std::fmt;
use std::time::Duration;

/// Main error type for census operations.
#[derive(Debug, Clone)]
pub enum CensusError {
    /// Network-related errors (connection refused, reset, TLS, etc.)
    NetworkError {
        url: String,
        message: String,
    },

    /// The server answered, but not with a success status
    HttpStatus {
        url: String,
        status: u16,
    },

    /// A DNS lookup failed or returned no addresses
    ResolveError {
        host: String,
        message: String,
    },

    /// Malformed input (CIDR line, HTML fragment, config value)
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// Configuration errors (invalid settings, etc.)
    ConfigError {
        message: String,
    },

    /// File I/O errors when reading configuration files
    FileError {
        path: String,
        message: String,
    },

    /// Timeout errors when operations take too long
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Generic internal errors that don't fit other categories
    Internal {
        message: String,
    },
}

impl CensusError {
    /// Create a new network error.
    pub fn network<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::NetworkError {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new HTTP status error.
    pub fn http_status<U: Into<String>>(url: U, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Create a new resolution error.
    pub fn resolve<H: Into<String>, M: Into<String>>(host: H, message: M) -> Self {
        Self::ResolveError {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error, keeping the offending input.
    pub fn parse<M: Into<String>, C: Into<String>>(message: M, content: C) -> Self {
        Self::ParseError {
            message: message.into(),
            content: Some(content.into()),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for CensusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkError { url, message } => {
                write!(f, "Network error for '{}': {}", url, message)
            }
            Self::HttpStatus { url, status } => {
                write!(f, "HTTP {} from '{}'", status, url)
            }
            Self::ResolveError { host, message } => {
                write!(f, "Could not resolve '{}': {}", host, message)
            }
            Self::ParseError { message, content } => match content {
                Some(content) => write!(f, "Parse error: {} ('{}')", message, content),
                None => write!(f, "Parse error: {}", message),
            },
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for CensusError {}

impl From<reqwest::Error> for CensusError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if err.is_timeout() {
            Self::network(url, "Request timed out")
        } else if let Some(status) = err.status() {
            Self::http_status(url, status.as_u16())
        } else if err.is_connect() {
            Self::network(url, format!("Connection failed: {}", err))
        } else {
            Self::network(url, format!("HTTP request failed: {}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = CensusError::http_status("http://example.test/top", 503);
        assert_eq!(err.to_string(), "HTTP 503 from 'http://example.test/top'");

        let err = CensusError::parse("invalid CIDR", "10.0.0.0/33");
        assert!(err.to_string().contains("10.0.0.0/33"));
    }

    #[test]
    fn test_timeout_display_names_operation() {
        let err = CensusError::timeout("GET http://example.test/", Duration::from_millis(1500));
        assert_eq!(
            err.to_string(),
            "Timeout after 1.5s during: GET http://example.test/"
        );
    }
}
