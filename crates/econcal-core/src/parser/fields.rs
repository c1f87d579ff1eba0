//! Per-row field mapping
//!
//! Turns one candidate row into an [`EventRecord`] by running each field's
//! strategies in order. Mapping never fails outright: a row either yields a
//! record or a [`RowIssue`] describing why it was skipped.

use scraper::ElementRef;

use crate::types::{EventRecord, RowIssue};

use super::layout::{CompiledLayout, CompiledStrategy, Scope, Source};

/// Direct `td` children of a row, in order.
///
/// Header cells (`th`) are not counted, so a header row never reaches the
/// cell minimum.
pub(crate) fn row_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect()
}

/// Visible text with inner whitespace runs collapsed to one space.
pub(crate) fn normalized_text(element: &ElementRef) -> String {
    let raw = element.text().collect::<String>();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Map one row to a record.
///
/// Rows below the layout's cell minimum are header or separator rows. Rows
/// whose event title resolves empty are decorative or partial.
pub(crate) fn map_row(row: &ElementRef, layout: &CompiledLayout) -> Result<EventRecord, RowIssue> {
    let cells = row_cells(row);
    if cells.len() < layout.min_cells {
        return Err(RowIssue::TooFewCells {
            found: cells.len(),
            required: layout.min_cells,
        });
    }

    let fields = &layout.fields;
    let resolve = |strategies: &[CompiledStrategy]| resolve_field(strategies, row, &cells);

    let event = resolve(fields.event.as_slice()).ok_or(RowIssue::MissingEvent)?;

    Ok(EventRecord {
        date: resolve(fields.date.as_slice()).unwrap_or_default(),
        country: resolve(fields.country.as_slice()).unwrap_or_default(),
        event,
        impact: resolve(fields.impact.as_slice()),
        actual: resolve(fields.actual.as_slice()).unwrap_or_default(),
        previous: resolve(fields.previous.as_slice()).unwrap_or_default(),
        estimate: resolve(fields.estimate.as_slice()).unwrap_or_default(),
        currency: resolve(fields.currency.as_slice()).unwrap_or_default(),
    })
}

/// First non-empty value produced by `strategies`.
fn resolve_field(strategies: &[CompiledStrategy], row: &ElementRef, cells: &[ElementRef]) -> Option<String> {
    strategies
        .iter()
        .find_map(|strategy| apply_strategy(strategy, row, cells))
}

fn apply_strategy(strategy: &CompiledStrategy, row: &ElementRef, cells: &[ElementRef]) -> Option<String> {
    let scope = match strategy.scope {
        Scope::Row => *row,
        Scope::Cell(index) => *cells.get(index)?,
    };

    let target = match &strategy.selector {
        Some(selector) => scope.select(selector).next()?,
        None => scope,
    };

    let value = match &strategy.source {
        Source::Text => normalized_text(&target),
        Source::Attr(name) => target.value().attr(name)?.trim().to_string(),
    };

    let value = match &strategy.pattern {
        Some(re) => {
            // Group 1 when the pattern has one, else the whole match
            let caps = re.captures(&value)?;
            let group = if re.captures_len() > 1 { caps.get(1)? } else { caps.get(0)? };
            group.as_str().trim().to_string()
        }
        None => value,
    };

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
