use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Which itemprop field a row was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    StartTime,
    Name,
}

impl std::fmt::Display for RowField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowField::StartTime => f.write_str("startTime"),
            RowField::Name => f.write_str("name"),
        }
    }
}

/// Everything that can abort a run. None of these are retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("GET {url} returned status {status}")]
    Fetch { url: String, status: u16 },

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no itemscope table rows found in the document")]
    NoRows,

    #[error("row {index}: missing or empty `{field}` field")]
    MalformedRow { index: usize, field: RowField },

    #[error("row {index}: cannot parse date label {label:?}: {reason}")]
    DateParse {
        index: usize,
        label: String,
        reason: String,
    },

    #[error("row {index}: end date {end} is before start date {start}")]
    DateOrdering {
        index: usize,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("row {index}: local time {local} does not exist in {timezone}")]
    Localization {
        index: usize,
        local: NaiveDateTime,
        timezone: String,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration")]
    Load(#[from] config::ConfigError),

    #[error("time window {start}..{end} is empty or reversed")]
    EmptyWindow {
        start: chrono::NaiveTime,
        end: chrono::NaiveTime,
    },

    #[error("invalid source url {0:?}")]
    Url(String),
}
