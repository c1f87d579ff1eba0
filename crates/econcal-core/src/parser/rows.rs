//! Row discovery
//!
//! Finds the calendar container and lists its candidate rows. A missing
//! container is reported separately from a container that simply has no
//! rows, since only the former means the page shape moved.

use scraper::{ElementRef, Html};

use super::layout::CompiledLayout;

/// Outcome of looking for calendar rows in a document
#[derive(Debug)]
pub(crate) enum Discovery<'a> {
    /// Container found; rows may be empty
    Rows(Vec<ElementRef<'a>>),
    /// No element matched the container selector
    MissingContainer(String),
    /// A required marker selector matched nothing
    MissingMarker(String),
}

/// Locate the container and collect its direct rows.
pub(crate) fn discover_rows<'a>(document: &'a Html, layout: &CompiledLayout) -> Discovery<'a> {
    let Some(container) = document.select(&layout.container).next() else {
        return Discovery::MissingContainer(layout.container_css.clone());
    };

    for (css, marker) in &layout.markers {
        if document.select(marker).next().is_none() {
            return Discovery::MissingMarker(css.clone());
        }
    }

    Discovery::Rows(direct_rows(container))
}

/// `tr` children of the container, or of its direct `tbody` children.
///
/// Rows under `thead`/`tfoot` and rows of nested tables are not candidates.
fn direct_rows(container: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();

    for child in container.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "tbody" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "tr"),
            ),
            _ => {}
        }
    }

    rows
}
