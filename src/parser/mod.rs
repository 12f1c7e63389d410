pub mod dates;
pub mod rows;

use scraper::Html;
use tracing::debug;

use crate::error::PipelineError;
use dates::NormalizedEvent;

/// Two-pass pipeline: html → raw rows → normalized events.
///
/// Fails on the first bad row; nothing partial is returned.
pub fn parse_document(html: &str, reference_year: i32) -> Result<Vec<NormalizedEvent>, PipelineError> {
    let document = Html::parse_document(html);
    let raw = rows::extract_rows(&document)?;
    debug!("Extracted {} rows", raw.len());
    dates::normalize_rows(&raw, reference_year)
}
