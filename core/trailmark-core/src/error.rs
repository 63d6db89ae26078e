//! Error types for sink construction and event handling.

use thiserror::Error;

/// A required construction option is missing or unusable.
///
/// Raised before any subscription is made; the sink is not created.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("application host name must be specified")]
    MissingAppHostName,

    #[error("analytics API must be specified")]
    MissingApi,

    #[error("telemetry source must be specified")]
    MissingTelemetrySource,

    #[error("application host name {host:?} does not form a valid app:// URL")]
    InvalidAppHostName {
        host: String,
        #[source]
        source: url::ParseError,
    },
}

/// Which outbound report a [`SinkError::Rejected`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    View,
    Event,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::View => f.write_str("view"),
            ReportKind::Event => f.write_str("event"),
        }
    }
}

/// Failure while handling an activity event.
///
/// State changes applied before the failing call are kept.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("analytics backend rejected {kind} report for {url}")]
    Rejected { kind: ReportKind, url: String },
}
