use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use super::rows::RawRow;
use crate::error::PipelineError;

/// "Weekday DD Month", as published in the table.
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+ \d{1,2} [A-Za-z]+$").unwrap());

const LABEL_FORMAT: &str = "%A %d %B %Y";

/// Format used by every tabular output.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub name: String,
}

impl NormalizedEvent {
    pub fn start_str(&self) -> String {
        format_date(self.start)
    }

    pub fn end_str(&self) -> String {
        format_date(self.end)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a "Weekday DD Month" label in `year`.
///
/// Strict: the weekday has to agree with the date it names.
pub fn parse_label(label: &str, year: i32, index: usize) -> Result<NaiveDate, PipelineError> {
    let fail = |reason: String| PipelineError::DateParse {
        index,
        label: label.to_string(),
        reason,
    };

    if !LABEL_RE.is_match(label) {
        return Err(fail("expected \"Weekday DD Month\"".to_string()));
    }
    NaiveDate::parse_from_str(&format!("{label} {year}"), LABEL_FORMAT)
        .map_err(|e| fail(format!("{e} (in {year})")))
}

/// Normalize one row against the reference year.
///
/// The table runs from the end of the previous year into the start of the
/// next one: the first row's start is moved back a year and the last row's
/// end forward a year. A lone row gets both shifts.
pub fn normalize_row(row: &RawRow, reference_year: i32) -> Result<NormalizedEvent, PipelineError> {
    let index = row.position.index;
    let end_label = row.end_label();

    let start = if row.position.is_first() {
        parse_shifted(&row.start_label, reference_year, reference_year - 1, index)?
    } else {
        parse_label(&row.start_label, reference_year, index)?
    };
    let end = if row.position.is_last() {
        parse_shifted(end_label, reference_year, reference_year + 1, index)?
    } else {
        parse_label(end_label, reference_year, index)?
    };

    if end < start {
        return Err(PipelineError::DateOrdering { index, start, end });
    }

    Ok(NormalizedEvent {
        index,
        start,
        end,
        name: row.activity.clone(),
    })
}

pub fn normalize_rows(
    rows: &[RawRow],
    reference_year: i32,
) -> Result<Vec<NormalizedEvent>, PipelineError> {
    rows.iter()
        .map(|row| normalize_row(row, reference_year))
        .collect()
}

/// Parse a boundary label that belongs in `year`.
///
/// The page usually prints the weekday of the shifted year. Some editions
/// print the reference year's weekday instead, so that is accepted too and
/// the date moved across. A label matching neither is rejected.
fn parse_shifted(
    label: &str,
    reference_year: i32,
    year: i32,
    index: usize,
) -> Result<NaiveDate, PipelineError> {
    if let Ok(date) = parse_label(label, year, index) {
        return Ok(date);
    }
    let date = parse_label(label, reference_year, index).map_err(|_| PipelineError::DateParse {
        index,
        label: label.to_string(),
        reason: format!("weekday matches neither {year} nor {reference_year}"),
    })?;
    date.with_year(year).ok_or_else(|| PipelineError::DateParse {
        index,
        label: label.to_string(),
        reason: format!("{} has no such date in {year}", date.format("%d %B")),
    })
}

// ── Tests ──
