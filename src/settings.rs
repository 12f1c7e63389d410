use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Url;
use serde::Deserialize;

use crate::classify::{ClassifierConfig, Preset, WindowPolicy};
use crate::error::SettingsError;

const DEFAULT_CONFIG_FILE: &str = "key_dates.toml";
const DEFAULT_SOURCE_URL: &str = "https://www.unimelb.edu.au/dates";
const HOLIDAYS_URL: &str = "https://www.unimelb.edu.au/dates/university-holidays";
const ENV_PREFIX: &str = "KEY_DATES";

/// Which year's holiday page to read, relative to the current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Period {
    Previous,
    This,
    Next,
}

impl Period {
    fn query_value(self) -> &'static str {
        match self {
            Period::Previous => "previous_year",
            Period::This => "this_year",
            Period::Next => "next_year",
        }
    }

    fn year_offset(self) -> i32 {
        match self {
            Period::Previous => -1,
            Period::This => 0,
            Period::Next => 1,
        }
    }

    pub fn url(self) -> Result<Url, SettingsError> {
        let mut url = Url::parse(HOLIDAYS_URL).map_err(|_| SettingsError::Url(HOLIDAYS_URL.to_string()))?;
        url.query_pairs_mut()
            .append_pair("queries_year_fquery", self.query_value());
        Ok(url)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source_url: String,
    pub output_dir: PathBuf,
    pub timezone: Tz,
    pub calendar_name: String,
    pub preset: Preset,
    /// Overrides the preset's window when set.
    pub window_policy: Option<WindowPolicy>,
    /// Overrides the preset's prefix when set; empty means no prefix.
    pub title_prefix: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            output_dir: PathBuf::from("."),
            timezone: chrono_tz::Australia::Melbourne,
            calendar_name: "UniMelb Holiday Events".to_string(),
            preset: Preset::default(),
            window_policy: None,
            title_prefix: None,
        }
    }
}

impl Settings {
    /// Defaults, then the TOML file (required only if named explicitly), then
    /// `KEY_DATES__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_layers(path, environment())
    }

    fn load_layers(
        path: Option<&Path>,
        env: config::Environment,
    ) -> Result<Self, SettingsError> {
        let file = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let settings = config::Config::builder()
            .add_source(config::File::from(file).required(path.is_some()))
            .add_source(env)
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn classifier(&self) -> Result<ClassifierConfig, SettingsError> {
        let mut config = self.preset.config();
        if let Some(policy) = &self.window_policy {
            config.policy = policy.clone();
        }
        if let Some(prefix) = &self.title_prefix {
            config.title_prefix = Some(prefix.clone()).filter(|p| !p.is_empty());
        }
        config.validate()?;
        Ok(config)
    }

    /// `--url` wins, then `--period`, then the configured source.
    pub fn source(&self, url: Option<&str>, period: Option<Period>) -> Result<Url, SettingsError> {
        if let Some(url) = url {
            return Url::parse(url).map_err(|_| SettingsError::Url(url.to_string()));
        }
        if let Some(period) = period {
            return period.url();
        }
        Url::parse(&self.source_url).map_err(|_| SettingsError::Url(self.source_url.clone()))
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

/// Per-run values, fixed once at startup and handed to every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub reference_year: i32,
    pub timezone: Tz,
}

impl RunContext {
    /// Reads the clock at most once, and only if no year was given.
    pub fn capture(year: Option<i32>, period: Option<Period>, timezone: Tz) -> Self {
        let reference_year = year.unwrap_or_else(|| {
            let current = Utc::now().with_timezone(&timezone).year();
            current + period.map_or(0, Period::year_offset)
        });
        Self {
            reference_year,
            timezone,
        }
    }

    /// DTSTAMP for every calendar entry: midnight UTC on 1 January of the
    /// reference year.
    pub fn stamp(&self) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(self.reference_year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or_default()
    }
}
