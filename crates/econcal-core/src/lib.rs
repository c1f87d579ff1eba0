//! Economic Calendar Scraper Core Library
//!
//! This crate fetches an economic-events calendar page for a date range and
//! extracts a normalized list of event records from its HTML.
//!
//! # Features
//! - Layout-driven extraction with ordered fallback strategies per field
//! - Explicit "structure changed" error, distinct from an empty calendar
//! - Per-row diagnostics for skipped rows instead of aborting the batch
//! - Rate-limited HTTP fetcher with retry on transient upstream errors

pub mod client;
pub mod error;
pub mod parser;
pub mod scraper;
pub mod types;

// Re-export main types for convenience
pub use client::{CalendarClient, ClientConfig, Fetcher, RateLimiter};
pub use error::{CalendarError, ErrorKind, Result};
pub use parser::{parse_calendar, Extractor, Layout, Strategy};
pub use self::scraper::CalendarScraper;
pub use types::{DateRange, EventRecord, Extraction, ExtractionStatus, RowDiagnostic, RowIssue};
