//! Data types for the economic calendar scraper
//!
//! All output types implement Serialize and Deserialize so results can be
//! handed to any JSON transport unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

/// One economic event as listed on the calendar page.
///
/// Only `event` is guaranteed non-empty. Every other field is best-effort
/// and falls back to an empty string (or `None` for `impact`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Scheduled date/time in whatever form the source provides
    pub date: String,
    /// Country or region name, or ISO code
    pub country: String,
    /// Event title
    pub event: String,
    /// Severity label such as "Low", "Medium" or "High"; `None` when unknown
    pub impact: Option<String>,
    /// Released value, empty until published
    pub actual: String,
    /// Prior period value
    pub previous: String,
    /// Forecast or consensus value
    pub estimate: String,
    /// Currency code tied to the event's country
    pub currency: String,
}

/// Inclusive date range requested by the caller.
///
/// Dates are opaque strings handed to the fetch target verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    /// Validate raw `startdate`/`enddate` parameters.
    ///
    /// # Errors
    /// `CalendarError::MissingParameter` if either value is absent or blank.
    ///
    /// # Example
    /// ```
    /// use econcal_core::DateRange;
    ///
    /// let range = DateRange::new(Some("2024-01-01"), Some("2024-01-07")).unwrap();
    /// assert_eq!(range.start, "2024-01-01");
    /// assert!(DateRange::new(None, Some("2024-01-07")).is_err());
    /// ```
    pub fn new(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start = required("startdate", start)?;
        let end = required("enddate", end)?;
        Ok(Self { start, end })
    }
}

fn required(name: &'static str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CalendarError::MissingParameter(name)),
    }
}

/// Why a candidate row did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowIssue {
    /// Fewer cells than a calendar entry has; header or separator rows
    TooFewCells { found: usize, required: usize },
    /// Every event-title strategy came back empty
    MissingEvent,
}

/// A skipped row, recorded alongside the successful records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDiagnostic {
    /// Zero-based position among the candidate rows
    pub row_index: usize,
    pub issue: RowIssue,
}

/// Outcome class of a successful extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionStatus {
    /// At least one record was produced
    Populated,
    /// The calendar was found but listed nothing usable
    Empty,
}

/// Result of running the extractor over one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Records in source row order
    pub records: Vec<EventRecord>,
    /// One entry per skipped row
    pub diagnostics: Vec<RowDiagnostic>,
    /// Number of candidate rows found under the container
    pub candidate_rows: usize,
}

impl Extraction {
    /// Create an extraction result
    pub fn new(records: Vec<EventRecord>, diagnostics: Vec<RowDiagnostic>, candidate_rows: usize) -> Self {
        Self {
            records,
            diagnostics,
            candidate_rows,
        }
    }

    /// Create an empty result for a container without rows
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), 0)
    }

    pub fn status(&self) -> ExtractionStatus {
        if self.records.is_empty() {
            ExtractionStatus::Empty
        } else {
            ExtractionStatus::Populated
        }
    }

    /// Consume the extraction, keeping only the records
    pub fn into_records(self) -> Vec<EventRecord> {
        self.records
    }
}
