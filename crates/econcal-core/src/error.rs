//! Error types for the economic calendar scraper
//!
//! Every failure that can reach a caller is a `CalendarError`. Per-row
//! problems never show up here; they are absorbed into
//! [`Extraction::diagnostics`](crate::types::Extraction).

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for calendar scraping operations
#[derive(Error, Debug)]
pub enum CalendarError {
    /// A required date-range parameter was absent or blank
    #[error("Missing required query parameter: {0}")]
    MissingParameter(&'static str),

    /// The request's parameters could not be read at all
    #[error("Invalid query parameters: {0}")]
    InvalidQuery(String),

    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Rate limited by the upstream server (HTTP 429) after all retries
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Fetch target could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The calendar container or a required marker is gone from the page
    #[error("Calendar structure changed: {reason}. The upstream page layout has likely changed")]
    StructureChanged { reason: String, source_url: String },

    /// An extraction layout could not be compiled
    #[error("Invalid extraction layout: {0}")]
    InvalidLayout(String),
}

/// Coarse classification of a [`CalendarError`], used by callers to pick a
/// response status and by alerting to tell drift from outages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputValidation,
    FetchFailure,
    StructureChanged,
    Configuration,
}

impl CalendarError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingParameter(_) | Self::InvalidQuery(_) => ErrorKind::InputValidation,
            Self::HttpError(_)
            | Self::UpstreamStatus { .. }
            | Self::RateLimited
            | Self::InvalidUrl(_) => ErrorKind::FetchFailure,
            Self::StructureChanged { .. } => ErrorKind::StructureChanged,
            Self::InvalidLayout(_) => ErrorKind::Configuration,
        }
    }

    /// The upstream address involved in the failure, when one is known.
    pub fn source_url(&self) -> Option<&str> {
        match self {
            Self::UpstreamStatus { url, .. } => Some(url),
            Self::StructureChanged { source_url, .. } => Some(source_url),
            Self::HttpError(err) => err.url().map(|u| u.as_str()),
            _ => None,
        }
    }
}

/// Serialize as the error envelope `{"error", "kind", "source"?}`
impl Serialize for CalendarError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let source = self.source_url();
        let len = if source.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("CalendarError", len)?;
        state.serialize_field("error", &self.to_string())?;
        state.serialize_field("kind", &self.kind())?;
        if let Some(source) = source {
            state.serialize_field("source", source)?;
        }
        state.end()
    }
}

/// Result type alias for calendar operations
pub type Result<T> = std::result::Result<T, CalendarError>;
