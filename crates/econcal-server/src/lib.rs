//! Economic Calendar HTTP Server
//!
//! Exposes the calendar scraper as a single JSON endpoint.
//!
//! # Usage
//!
//! ```rust,no_run
//! use econcal_core::CalendarScraper;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let app = econcal_server::app(CalendarScraper::new()?);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8888").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Routes
//! - `GET /calendar?startdate=..&enddate=..` - Events in the range as a JSON array
//! - `GET /health` - Liveness check

pub mod config;
pub mod logging;
pub mod routes;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use econcal_core::{CalendarScraper, Fetcher};

/// Scraper shared between request handlers.
pub type SharedScraper<F> = Arc<CalendarScraper<F>>;

/// Build the application router around a scraper.
pub fn app<F>(scraper: CalendarScraper<F>) -> Router
where
    F: Fetcher + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/calendar",
            get(routes::calendar_events::<F>).post(routes::calendar_events::<F>),
        )
        .route("/health", get(routes::health))
        .with_state(Arc::new(scraper))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
