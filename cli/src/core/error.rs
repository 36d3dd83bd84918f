//! # Dockhand Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout dockhand. Every failure
//! that a caller may want to tell apart (a missing Dockerfile, a malformed ignore
//! pattern, a daemon-reported authentication failure, ...) has its own variant
//! on `DockhandError`; everything else travels as an `anyhow::Error` with context.
//!
//! ## Architecture
//!
//! - `DockhandError`: a `thiserror` enum grouped by the error taxonomy of the client:
//!   - Configuration errors (raised before any network call is attempted)
//!   - Transport errors (connection failures, non-success HTTP status)
//!   - Protocol errors (malformed or truncated JSON streams)
//!   - Application errors reported by the daemon inside a decoded message
//! - `Result<T>`: an alias for `anyhow::Result<T>`.
//!
//! Per-file I/O errors during archiving are deliberately absent: the archive
//! producer logs and skips them, so they never reach a caller.
//!
//! ## Examples
//!
//! ```rust
//! match result {
//!     Err(e) if matches!(
//!         e.downcast_ref::<DockhandError>(),
//!         Some(DockhandError::AuthenticationRequired)
//!     ) => println!("Log in first."),
//!     other => other?,
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for the dockhand client.
#[derive(Error, Debug)]
pub enum DockhandError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No Dockerfile found in {path}")]
    DockerfileNotFound { path: String },

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    IgnorePattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Error reading {path}: {source}")]
    IgnoreFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}{}", tls_hint_suffix(.tls_hint))]
    Transport { message: String, tls_hint: bool },

    #[error("Daemon returned {status}: {message}")]
    DaemonResponse { status: u16, message: String },

    #[error("Malformed message stream: {source}")]
    Protocol {
        #[from]
        source: serde_json::Error,
    },

    #[error("Message stream ended in the middle of a message ({pending} bytes left undecoded)")]
    TruncatedStream { pending: usize },

    #[error("Authentication is required.")]
    AuthenticationRequired,

    #[error("{message}")]
    DaemonMessage { code: i64, message: String },

    #[error("Docker API interaction failed: {source}")]
    DockerApi {
        #[from]
        source: bollard::errors::Error,
    },

    #[error("Container '{name}' not found.")]
    ContainerNotFound { name: String },

    #[error("Argument parsing error: {0}")]
    ArgumentParsing(String),
}

fn tls_hint_suffix(tls_hint: &bool) -> &'static str {
    if *tls_hint {
        ". Are you trying to connect to a TLS-enabled daemon without TLS?"
    } else {
        ""
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = DockhandError::Config("Missing setting 'host'".to_string());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: Missing setting 'host'"
        );

        assert_eq!(
            DockhandError::AuthenticationRequired.to_string(),
            "Authentication is required."
        );

        // Daemon-reported messages pass through verbatim.
        let daemon = DockhandError::DaemonMessage {
            code: 500,
            message: "manifest unknown".into(),
        };
        assert_eq!(daemon.to_string(), "manifest unknown");
    }

    #[test]
    fn test_transport_hint_only_when_requested() {
        let with_hint = DockhandError::Transport {
            message: "connection reset by peer".into(),
            tls_hint: true,
        };
        assert!(with_hint.to_string().ends_with("without TLS?"));

        let without_hint = DockhandError::Transport {
            message: "connection refused".into(),
            tls_hint: false,
        };
        assert_eq!(without_hint.to_string(), "connection refused");
    }
}
