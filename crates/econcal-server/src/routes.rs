//! Request handlers for the calendar endpoint

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, error, warn};

use econcal_core::{CalendarError, ErrorKind, Fetcher};

use crate::SharedScraper;

/// Query parameters of `/calendar`
#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub startdate: Option<String>,
    pub enddate: Option<String>,
}

/// Get events between `startdate` and `enddate`.
///
/// # Returns
/// * `200` with a JSON array of event records, possibly empty
/// * `400` if a date parameter is missing or the query string is malformed
/// * `502` if the page could not be fetched or its structure changed
pub async fn calendar_events<F: Fetcher + 'static>(
    State(scraper): State<SharedScraper<F>>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return error_response(CalendarError::InvalidQuery(rejection.body_text())),
    };

    match scraper
        .events(query.startdate.as_deref(), query.enddate.as_deref())
        .await
    {
        Ok(extraction) => {
            if !extraction.diagnostics.is_empty() {
                debug!(
                    skipped = extraction.diagnostics.len(),
                    "Calendar rows skipped during extraction"
                );
            }
            Json(extraction.into_records()).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Liveness check
pub async fn health() -> &'static str {
    "OK"
}

/// Map an error to its status code and JSON envelope.
pub fn error_response(err: CalendarError) -> Response {
    let status = match err.kind() {
        ErrorKind::InputValidation => StatusCode::BAD_REQUEST,
        ErrorKind::FetchFailure | ErrorKind::StructureChanged => StatusCode::BAD_GATEWAY,
        ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
    };

    match err.kind() {
        ErrorKind::InputValidation => debug!(error = %err, "Rejected calendar request"),
        ErrorKind::StructureChanged => warn!(error = %err, source = ?err.source_url(), "Calendar layout drift"),
        _ => error!(error = %err, "Calendar request failed"),
    }

    (status, Json(err)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use econcal_core::{CalendarScraper, DateRange, Extractor, Layout, Result};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::app;

    struct StubFetcher {
        html: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        fn source_url(&self, range: &DateRange) -> String {
            format!("https://calendar.test/calendar?start={}&end={}", range.start, range.end)
        }

        async fn fetch(&self, _range: &DateRange) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.html.to_string())
        }
    }

    struct DownFetcher;

    #[async_trait]
    impl Fetcher for DownFetcher {
        fn source_url(&self, _range: &DateRange) -> String {
            "https://calendar.test/calendar".to_string()
        }

        async fn fetch(&self, _range: &DateRange) -> Result<String> {
            Err(CalendarError::RateLimited)
        }
    }

    const PAGE: &str = r#"<table id="calendar"><tbody>
        <tr><td>Friday</td></tr>
        <tr><td>2024-01-05</td><td><a>US</a></td><td><a>Nonfarm Payrolls</a></td>
            <td><i title="High"></i></td><td>200K</td><td>180K</td><td>190K</td><td>USD</td>
            <td></td><td></td></tr>
        </tbody></table>"#;

    fn stub_app(html: &'static str) -> (axum::Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = StubFetcher {
            html,
            calls: Arc::clone(&calls),
        };
        let scraper = CalendarScraper::with_fetcher(fetcher, Extractor::new(&Layout::default()).unwrap());
        (app(scraper), calls)
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_calendar_returns_records() {
        let (app, calls) = stub_app(PAGE);
        let (status, body) = get(app, "/calendar?startdate=2024-01-05&enddate=2024-01-05").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!([{
                "date": "2024-01-05",
                "country": "US",
                "event": "Nonfarm Payrolls",
                "impact": "High",
                "actual": "200K",
                "previous": "180K",
                "estimate": "190K",
                "currency": "USD",
            }])
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_calendar_empty_is_ok() {
        let (app, _) = stub_app(r#"<table id="calendar"><tbody></tbody></table>"#);
        let (status, body) = get(app, "/calendar?startdate=a&enddate=b").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_missing_parameter_is_bad_request() {
        let (app, calls) = stub_app(PAGE);
        let (status, body) = get(app, "/calendar?startdate=2024-01-05").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "input_validation");
        assert!(body["error"].as_str().unwrap().contains("enddate"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_query_is_json_bad_request() {
        let (app, calls) = stub_app(PAGE);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/calendar?startdate=a&startdate=b&enddate=c")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "input_validation");
        assert!(body["error"].as_str().unwrap().contains("startdate"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_structure_changed_is_bad_gateway_with_source() {
        let (app, _) = stub_app("<html><body><p>Please enable JavaScript</p></body></html>");
        let (status, body) = get(app, "/calendar?startdate=a&enddate=b").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "structure_changed");
        assert_eq!(body["source"], "https://calendar.test/calendar?start=a&end=b");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_bad_gateway() {
        let scraper = CalendarScraper::with_fetcher(DownFetcher, Extractor::new(&Layout::default()).unwrap());
        let (status, body) = get(app(scraper), "/calendar?startdate=a&enddate=b").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "fetch_failure");
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let (app, _) = stub_app(PAGE);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/calendar?startdate=a&enddate=b")
                    .header(header::ORIGIN, "https://dashboard.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = stub_app(PAGE);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[test]
    fn test_error_response_status_mapping() {
        assert_eq!(
            error_response(CalendarError::MissingParameter("startdate")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(CalendarError::InvalidLayout("x".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
