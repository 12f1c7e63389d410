use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::{PipelineError, RowField};

static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr[itemscope]").unwrap());
static START_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="startTime"]"#).unwrap());
static END_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="endTime"]"#).unwrap());
static NAME_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="name"]"#).unwrap());

/// Where a row sits in the table. Attached at extraction time so date
/// normalization never has to look at the surrounding sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPosition {
    pub index: usize,
    pub total: usize,
}

impl RowPosition {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub position: RowPosition,
    pub start_label: String,
    pub end_label: Option<String>,
    pub activity: String,
}

impl RawRow {
    /// End label, falling back to the start label when the row has none.
    pub fn end_label(&self) -> &str {
        self.end_label.as_deref().unwrap_or(&self.start_label)
    }
}

/// Pull every `<tr itemscope>` row out of the document, in document order.
///
/// A row without a usable `startTime` or `name` aborts extraction; a missing
/// `endTime` is normal for single-day entries.
pub fn extract_rows(document: &Html) -> Result<Vec<RawRow>, PipelineError> {
    let elements: Vec<ElementRef> = document.select(&ROW_SEL).collect();
    if elements.is_empty() {
        return Err(PipelineError::NoRows);
    }

    let total = elements.len();
    elements
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            let position = RowPosition { index, total };
            let start_label = field_text(row, &START_SEL).ok_or(PipelineError::MalformedRow {
                index,
                field: RowField::StartTime,
            })?;
            let activity = field_text(row, &NAME_SEL).ok_or(PipelineError::MalformedRow {
                index,
                field: RowField::Name,
            })?;
            let end_label = field_text(row, &END_SEL);

            Ok(RawRow {
                position,
                start_label,
                end_label,
                activity,
            })
        })
        .collect()
}

/// Text of the first matching descendant, whitespace-collapsed.
/// Empty text counts as absent.
fn field_text(row: ElementRef, selector: &Selector) -> Option<String> {
    let el = row.select(selector).next()?;
    let text = el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ── Tests ──
