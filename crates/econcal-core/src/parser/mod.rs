//! HTML extraction for calendar pages
//!
//! This module turns calendar page markup into event records:
//! - `layout`: where the table is and how each field is resolved
//! - `rows`: container lookup and candidate row discovery
//! - `fields`: per-row mapping with ordered fallbacks

mod fields;
pub mod layout;
mod rows;

use scraper::Html;
use tracing::{debug, info, trace, warn};

use crate::error::{CalendarError, Result};
use crate::types::{Extraction, RowDiagnostic, RowIssue};

use self::layout::CompiledLayout;
use self::rows::Discovery;

pub use layout::{FieldStrategies, Layout, Strategy, DEFAULT_MIN_CELLS};

/// Calendar extractor built from a [`Layout`].
///
/// Extraction is a pure function of the markup: the same input always gives
/// the same records in the same order.
#[derive(Debug, Clone)]
pub struct Extractor {
    layout: CompiledLayout,
}

impl Extractor {
    /// Compile a layout into an extractor.
    ///
    /// # Errors
    /// `CalendarError::InvalidLayout` if a selector or pattern does not parse,
    /// or a strategy addresses a cell rows are not guaranteed to have.
    pub fn new(layout: &Layout) -> Result<Self> {
        Ok(Self {
            layout: CompiledLayout::compile(layout)?,
        })
    }

    /// Extract event records from calendar markup.
    ///
    /// # Arguments
    /// * `html` - Raw HTML of the calendar page
    /// * `source_url` - Where the markup came from, reported on structural errors
    ///
    /// # Returns
    /// * `Ok(Extraction)` with records in row order and one diagnostic per skipped row
    /// * `Err(CalendarError::StructureChanged)` if the container or a required marker is missing
    pub fn extract(&self, html: &str, source_url: &str) -> Result<Extraction> {
        let document = Html::parse_document(html);

        let rows = match rows::discover_rows(&document, &self.layout) {
            Discovery::Rows(rows) => rows,
            Discovery::MissingContainer(css) => {
                return Err(structure_changed(format!("container `{}` not found", css), source_url));
            }
            Discovery::MissingMarker(css) => {
                return Err(structure_changed(format!("required marker `{}` not found", css), source_url));
            }
        };

        if rows.is_empty() {
            info!("Calendar container has no rows");
            return Ok(Extraction::empty());
        }

        let mut records = Vec::new();
        let mut diagnostics = Vec::new();

        for (row_index, row) in rows.iter().enumerate() {
            match fields::map_row(row, &self.layout) {
                Ok(record) => records.push(record),
                Err(issue) => {
                    match &issue {
                        RowIssue::TooFewCells { found, required } => {
                            trace!(row_index, found, required, "Skipping short row");
                        }
                        RowIssue::MissingEvent => {
                            debug!(row_index, "Skipping row without event title");
                        }
                    }
                    diagnostics.push(RowDiagnostic { row_index, issue });
                }
            }
        }

        info!(
            candidate_rows = rows.len(),
            records = records.len(),
            skipped = diagnostics.len(),
            "Extracted calendar events"
        );

        Ok(Extraction::new(records, diagnostics, rows.len()))
    }
}

fn structure_changed(reason: String, source_url: &str) -> CalendarError {
    warn!(%reason, source_url, "Calendar page structure changed");
    CalendarError::StructureChanged {
        reason,
        source_url: source_url.to_string(),
    }
}

/// Extract events using the default layout.
///
/// # Examples
/// ```
/// use econcal_core::parser::parse_calendar;
///
/// let html = r#"<table id="calendar"><tbody></tbody></table>"#;
/// let extraction = parse_calendar(html, "https://example.test/calendar").unwrap();
/// assert!(extraction.records.is_empty());
///
/// assert!(parse_calendar("<html></html>", "https://example.test/calendar").is_err());
/// ```
pub fn parse_calendar(html: &str, source_url: &str) -> Result<Extraction> {
    Extractor::new(&Layout::default())?.extract(html, source_url)
}
