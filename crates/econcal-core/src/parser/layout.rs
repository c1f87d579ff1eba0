//! Extraction layout for the calendar page
//!
//! A layout describes where the calendar lives in the document and, for each
//! record field, an ordered list of strategies. Strategies are tried in order
//! and the first non-empty value wins, so a changed upstream page usually
//! needs a new strategy rather than new code.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

/// Minimum direct cells a calendar entry row has
pub const DEFAULT_MIN_CELLS: usize = 10;

/// One way of resolving a field value inside a row.
///
/// `cell` scopes the lookup to the n-th direct cell of the row; without it
/// the whole row is searched. `selector` picks the first matching descendant
/// of that scope; without it the scope element itself is used. `pattern`,
/// when present, keeps only the first capture group of its first match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Visible text, whitespace-normalised
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cell: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    /// Value of an attribute
    Attr {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cell: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        attr: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
}

impl Strategy {
    /// Text of the cell itself
    pub fn cell_text(cell: usize) -> Self {
        Self::Text {
            cell: Some(cell),
            selector: None,
            pattern: None,
        }
    }

    /// Text of the first `selector` match inside a cell
    pub fn nested_text(cell: usize, selector: &str) -> Self {
        Self::Text {
            cell: Some(cell),
            selector: Some(selector.to_string()),
            pattern: None,
        }
    }

    /// Text of the first `selector` match anywhere in the row
    pub fn row_text(selector: &str) -> Self {
        Self::Text {
            cell: None,
            selector: Some(selector.to_string()),
            pattern: None,
        }
    }

    /// Attribute of a cell, or of the first `selector` match inside it
    pub fn attr(cell: usize, selector: Option<&str>, attr: &str) -> Self {
        Self::Attr {
            cell: Some(cell),
            selector: selector.map(str::to_string),
            attr: attr.to_string(),
            pattern: None,
        }
    }

    /// Restrict this strategy to the first capture group of `pattern`
    pub fn with_pattern(self, re: &str) -> Self {
        match self {
            Self::Text { cell, selector, .. } => Self::Text {
                cell,
                selector,
                pattern: Some(re.to_string()),
            },
            Self::Attr {
                cell, selector, attr, ..
            } => Self::Attr {
                cell,
                selector,
                attr,
                pattern: Some(re.to_string()),
            },
        }
    }

    fn cell(&self) -> Option<usize> {
        match self {
            Self::Text { cell, .. } | Self::Attr { cell, .. } => *cell,
        }
    }
}

/// Ordered strategies for every field of an event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStrategies {
    pub date: Vec<Strategy>,
    pub country: Vec<Strategy>,
    pub event: Vec<Strategy>,
    pub impact: Vec<Strategy>,
    pub actual: Vec<Strategy>,
    pub previous: Vec<Strategy>,
    pub estimate: Vec<Strategy>,
    pub currency: Vec<Strategy>,
}

impl Default for FieldStrategies {
    fn default() -> Self {
        Self {
            date: vec![
                Strategy::attr(0, None, "data-value"),
                Strategy::nested_text(0, "span"),
                Strategy::cell_text(0),
            ],
            country: vec![
                Strategy::nested_text(1, "a"),
                Strategy::cell_text(1),
                Strategy::row_text(".calendar-iso"),
            ],
            event: vec![
                Strategy::nested_text(2, "a"),
                Strategy::row_text("a.calendar-event"),
                Strategy::cell_text(2),
            ],
            impact: vec![
                Strategy::attr(3, Some("i[title]"), "title"),
                Strategy::attr(3, Some("i"), "data-original-title"),
                Strategy::attr(3, Some("[class*='impact-'], [class*='importance-']"), "class")
                    .with_pattern(r"(?i)\b(?:impact|importance)-(low|medium|high)\b"),
            ],
            actual: vec![Strategy::row_text("#actual"), Strategy::cell_text(4)],
            previous: vec![Strategy::row_text("#previous"), Strategy::cell_text(5)],
            estimate: vec![Strategy::row_text("#consensus"), Strategy::cell_text(6)],
            currency: vec![Strategy::nested_text(7, "span"), Strategy::cell_text(7)],
        }
    }
}

/// Full description of the calendar page shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Selector for the calendar table
    pub container: String,
    /// Selectors that must match somewhere in the document
    #[serde(default)]
    pub required_markers: Vec<String>,
    /// Rows with fewer direct cells are skipped
    #[serde(default = "default_min_cells")]
    pub min_cells: usize,
    pub fields: FieldStrategies,
}

fn default_min_cells() -> usize {
    DEFAULT_MIN_CELLS
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            container: "#calendar".to_string(),
            required_markers: Vec::new(),
            min_cells: DEFAULT_MIN_CELLS,
            fields: FieldStrategies::default(),
        }
    }
}

impl Layout {
    /// Load a layout from its JSON form.
    ///
    /// # Errors
    /// `CalendarError::InvalidLayout` if the JSON does not describe a layout.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CalendarError::InvalidLayout(e.to_string()))
    }
}

/// Where a compiled strategy looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Row,
    Cell(usize),
}

/// What a compiled strategy reads
#[derive(Debug, Clone)]
pub(crate) enum Source {
    Text,
    Attr(String),
}

/// A strategy with its selector and pattern parsed
#[derive(Debug, Clone)]
pub(crate) struct CompiledStrategy {
    pub(crate) scope: Scope,
    pub(crate) selector: Option<Selector>,
    pub(crate) source: Source,
    pub(crate) pattern: Option<regex_lite::Regex>,
}

/// Strategies for every field, ready to run
#[derive(Debug, Clone)]
pub(crate) struct CompiledFields {
    pub(crate) date: Vec<CompiledStrategy>,
    pub(crate) country: Vec<CompiledStrategy>,
    pub(crate) event: Vec<CompiledStrategy>,
    pub(crate) impact: Vec<CompiledStrategy>,
    pub(crate) actual: Vec<CompiledStrategy>,
    pub(crate) previous: Vec<CompiledStrategy>,
    pub(crate) estimate: Vec<CompiledStrategy>,
    pub(crate) currency: Vec<CompiledStrategy>,
}

/// Layout with every selector and pattern parsed once
#[derive(Debug, Clone)]
pub(crate) struct CompiledLayout {
    pub(crate) container_css: String,
    pub(crate) container: Selector,
    pub(crate) markers: Vec<(String, Selector)>,
    pub(crate) min_cells: usize,
    pub(crate) fields: CompiledFields,
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| CalendarError::InvalidLayout(format!("Invalid selector `{}`: {:?}", css, e)))
}

impl CompiledLayout {
    pub(crate) fn compile(layout: &Layout) -> Result<Self> {
        if layout.min_cells == 0 {
            return Err(CalendarError::InvalidLayout(
                "min_cells must be at least 1".to_string(),
            ));
        }

        let markers = layout
            .required_markers
            .iter()
            .map(|css| -> Result<(String, Selector)> { Ok((css.clone(), parse_selector(css)?)) })
            .collect::<Result<Vec<_>>>()?;

        let min = layout.min_cells;
        let f = &layout.fields;
        let fields = CompiledFields {
            date: compile_field("date", &f.date, min)?,
            country: compile_field("country", &f.country, min)?,
            event: compile_field("event", &f.event, min)?,
            impact: compile_field("impact", &f.impact, min)?,
            actual: compile_field("actual", &f.actual, min)?,
            previous: compile_field("previous", &f.previous, min)?,
            estimate: compile_field("estimate", &f.estimate, min)?,
            currency: compile_field("currency", &f.currency, min)?,
        };

        if fields.event.is_empty() {
            return Err(CalendarError::InvalidLayout(
                "event needs at least one strategy".to_string(),
            ));
        }

        Ok(Self {
            container_css: layout.container.clone(),
            container: parse_selector(&layout.container)?,
            markers,
            min_cells: layout.min_cells,
            fields,
        })
    }
}

fn compile_field(name: &str, strategies: &[Strategy], min_cells: usize) -> Result<Vec<CompiledStrategy>> {
    strategies
        .iter()
        .map(|strategy| {
            // Rows are only mapped once they have min_cells cells
            if let Some(cell) = strategy.cell() {
                if cell >= min_cells {
                    return Err(CalendarError::InvalidLayout(format!(
                        "{} strategy addresses cell {} but rows are only guaranteed {} cells",
                        name, cell, min_cells
                    )));
                }
            }
            compile_strategy(strategy)
        })
        .collect()
}

fn compile_strategy(strategy: &Strategy) -> Result<CompiledStrategy> {
    let (cell, selector, source, pattern) = match strategy {
        Strategy::Text {
            cell,
            selector,
            pattern,
        } => (cell, selector, Source::Text, pattern),
        Strategy::Attr {
            cell,
            selector,
            attr,
            pattern,
        } => (cell, selector, Source::Attr(attr.clone()), pattern),
    };

    let selector = selector.as_deref().map(parse_selector).transpose()?;
    let pattern = pattern
        .as_deref()
        .map(|re| {
            regex_lite::Regex::new(re)
                .map_err(|e| CalendarError::InvalidLayout(format!("Invalid pattern `{}`: {}", re, e)))
        })
        .transpose()?;

    Ok(CompiledStrategy {
        scope: cell.map_or(Scope::Row, Scope::Cell),
        selector,
        source,
        pattern,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_compiles() {
        let compiled = CompiledLayout::compile(&Layout::default()).unwrap();
        assert_eq!(compiled.min_cells, 10);
        assert_eq!(compiled.container_css, "#calendar");
        assert_eq!(compiled.fields.date.len(), 3);
        assert_eq!(compiled.fields.date[0].scope, Scope::Cell(0));
        assert_eq!(compiled.fields.actual[0].scope, Scope::Row);
        assert!(compiled.fields.impact[2].pattern.is_some());
    }

    #[test]
    fn test_layout_json_roundtrip_keeps_strategy_order() {
        let layout = Layout::default();
        let json = serde_json::to_string(&layout).unwrap();
        let parsed = Layout::from_json(&json).unwrap();
        assert_eq!(parsed, layout);
    }

    #[test]
    fn test_layout_from_minimal_json() {
        let json = r##"{
            "container": "table.events",
            "fields": {
                "date": [{"kind": "text", "cell": 0}],
                "country": [],
                "event": [{"kind": "text", "cell": 1, "selector": "a"}],
                "impact": [{"kind": "attr", "cell": 2, "attr": "data-impact"}],
                "actual": [],
                "previous": [],
                "estimate": [],
                "currency": []
            }
        }"##;
        let layout = Layout::from_json(json).unwrap();
        assert_eq!(layout.min_cells, DEFAULT_MIN_CELLS);
        assert!(layout.required_markers.is_empty());
        assert_eq!(layout.fields.event, vec![Strategy::nested_text(1, "a")]);
        assert!(CompiledLayout::compile(&layout).is_ok());
    }

    #[test]
    fn test_layout_from_invalid_json() {
        match Layout::from_json("{\"container\": 5}") {
            Err(CalendarError::InvalidLayout(_)) => {}
            other => panic!("Expected InvalidLayout, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let layout = Layout {
            container: "table[".to_string(),
            ..Layout::default()
        };
        match CompiledLayout::compile(&layout) {
            Err(CalendarError::InvalidLayout(msg)) => assert!(msg.contains("table[")),
            other => panic!("Expected InvalidLayout, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut layout = Layout::default();
        layout.fields.impact = vec![Strategy::cell_text(3).with_pattern("(unclosed")];
        assert!(matches!(
            CompiledLayout::compile(&layout),
            Err(CalendarError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_cell_beyond_min_cells_rejected() {
        let mut layout = Layout::default();
        layout.min_cells = 5;
        match CompiledLayout::compile(&layout) {
            Err(CalendarError::InvalidLayout(msg)) => assert!(msg.contains("cell")),
            other => panic!("Expected InvalidLayout, got {:?}", other),
        }
    }

    #[test]
    fn test_event_without_strategies_rejected() {
        let mut layout = Layout::default();
        layout.fields.event.clear();
        assert!(CompiledLayout::compile(&layout).is_err());
    }

    #[test]
    fn test_zero_min_cells_rejected() {
        let mut layout = Layout::default();
        layout.min_cells = 0;
        assert!(CompiledLayout::compile(&layout).is_err());
    }
}
