//! Main calendar scraper API
//!
//! Combines a [`Fetcher`] with an [`Extractor`]: validate the date range,
//! fetch the page, extract the records.

use tracing::{info, instrument};

use crate::client::{CalendarClient, Fetcher};
use crate::error::Result;
use crate::parser::{Extractor, Layout};
use crate::types::{DateRange, Extraction};

/// Economic calendar scraper
///
/// # Example
/// ```no_run
/// use econcal_core::CalendarScraper;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let scraper = CalendarScraper::new()?;
///
///     let extraction = scraper.events(Some("2024-01-01"), Some("2024-01-07")).await?;
///     println!("Found {} events", extraction.records.len());
///
///     Ok(())
/// }
/// ```
pub struct CalendarScraper<F = CalendarClient> {
    fetcher: F,
    extractor: Extractor,
}

impl CalendarScraper<CalendarClient> {
    /// Create a new scraper with the default HTTP client and layout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_client(CalendarClient::new()?)
    }

    /// Create a scraper around a pre-configured HTTP client.
    ///
    /// # Errors
    /// Returns an error if the default layout fails to compile.
    pub fn with_client(client: CalendarClient) -> Result<Self> {
        Ok(Self::with_fetcher(client, Extractor::new(&Layout::default())?))
    }
}

impl<F: Fetcher> CalendarScraper<F> {
    /// Create a scraper from any fetcher and extractor.
    pub fn with_fetcher(fetcher: F, extractor: Extractor) -> Self {
        Self { fetcher, extractor }
    }

    /// Get the underlying fetcher
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch and extract events for raw `startdate`/`enddate` parameters.
    ///
    /// Parameters are validated before anything is fetched.
    ///
    /// # Returns
    /// * `Ok(Extraction)` with records in page order, possibly empty
    /// * `Err(CalendarError::MissingParameter)` if either date is absent or blank
    /// * `Err(CalendarError::StructureChanged)` if the page no longer has the calendar table
    /// * Any fetch error, unchanged
    pub async fn events(&self, startdate: Option<&str>, enddate: Option<&str>) -> Result<Extraction> {
        let range = DateRange::new(startdate, enddate)?;
        self.events_in_range(&range).await
    }

    /// Fetch and extract events for an already validated range.
    #[instrument(skip(self, range), fields(start = %range.start, end = %range.end))]
    pub async fn events_in_range(&self, range: &DateRange) -> Result<Extraction> {
        let source_url = self.fetcher.source_url(range);
        let html = self.fetcher.fetch(range).await?;
        info!(bytes = html.len(), %source_url, "Fetched calendar page");

        self.extractor.extract(&html, &source_url)
    }
}
