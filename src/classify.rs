use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::SettingsError;
use crate::parser::dates::NormalizedEvent;

const HOLIDAY_MARKER: &str = "holiday";

/// Public holidays that get a clock window under the `named` preset.
const NAMED_HOLIDAYS: &[&str] = &["Australia Day", "ANZAC Day", "King's Birthday", "AFL Grand Final"];

/// How holidays are placed on the clock.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Holidays whose name contains one of `names` get `start..end`; the rest
    /// are all-day.
    AllowList {
        names: Vec<String>,
        start: NaiveTime,
        end: NaiveTime,
    },
    /// Every holiday gets `start..end`.
    Uniform { start: NaiveTime, end: NaiveTime },
}

impl WindowPolicy {
    fn bounds(&self) -> (NaiveTime, NaiveTime) {
        match self {
            WindowPolicy::AllowList { start, end, .. } | WindowPolicy::Uniform { start, end } => {
                (*start, *end)
            }
        }
    }
}

/// Built-in classifier setups, one per known deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Named public holidays 08:00-20:00, everything else all-day
    #[default]
    Named,
    /// Every holiday 08:00-17:00, titles prefixed with "[HOLIDAY] "
    Workday,
    /// Every holiday 09:00-17:00
    Business,
}

impl Preset {
    pub fn config(self) -> ClassifierConfig {
        match self {
            Preset::Named => ClassifierConfig {
                policy: WindowPolicy::AllowList {
                    names: NAMED_HOLIDAYS.iter().map(|s| s.to_string()).collect(),
                    start: hm(8, 0),
                    end: hm(20, 0),
                },
                title_prefix: None,
            },
            Preset::Workday => ClassifierConfig {
                policy: WindowPolicy::Uniform {
                    start: hm(8, 0),
                    end: hm(17, 0),
                },
                title_prefix: Some("[HOLIDAY] ".to_string()),
            },
            Preset::Business => ClassifierConfig {
                policy: WindowPolicy::Uniform {
                    start: hm(9, 0),
                    end: hm(17, 0),
                },
                title_prefix: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub policy: WindowPolicy,
    pub title_prefix: Option<String>,
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let (start, end) = self.policy.bounds();
        if start >= end {
            return Err(SettingsError::EmptyWindow { start, end });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventWindow {
    AllDay,
    /// Clock times on the first and last day of the event.
    Timed { start: NaiveTime, end: NaiveTime },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEvent {
    pub event: NormalizedEvent,
    pub is_holiday: bool,
    /// Display title; carries the prefix for holidays.
    pub title: String,
    /// `None` for non-holidays, which never reach the calendar.
    pub window: Option<EventWindow>,
}

pub fn is_holiday(name: &str) -> bool {
    name.to_lowercase().contains(HOLIDAY_MARKER)
}

pub struct EventClassifier {
    config: ClassifierConfig,
    allow_list: Vec<String>,
}

impl EventClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let allow_list = match &config.policy {
            WindowPolicy::AllowList { names, .. } => names.iter().map(|n| fold(n)).collect(),
            WindowPolicy::Uniform { .. } => Vec::new(),
        };
        Self { config, allow_list }
    }

    pub fn classify(&self, event: NormalizedEvent) -> ClassifiedEvent {
        if !is_holiday(&event.name) {
            return ClassifiedEvent {
                title: event.name.clone(),
                event,
                is_holiday: false,
                window: None,
            };
        }

        let window = match &self.config.policy {
            WindowPolicy::Uniform { start, end } => EventWindow::Timed {
                start: *start,
                end: *end,
            },
            WindowPolicy::AllowList { start, end, .. } => {
                let name = fold(&event.name);
                if self.allow_list.iter().any(|n| name.contains(n.as_str())) {
                    EventWindow::Timed {
                        start: *start,
                        end: *end,
                    }
                } else {
                    EventWindow::AllDay
                }
            }
        };

        let title = match &self.config.title_prefix {
            Some(prefix) => format!("{prefix}{}", event.name),
            None => event.name.clone(),
        };

        ClassifiedEvent {
            event,
            is_holiday: true,
            title,
            window: Some(window),
        }
    }

    pub fn classify_all(&self, events: Vec<NormalizedEvent>) -> Vec<ClassifiedEvent> {
        events.into_iter().map(|e| self.classify(e)).collect()
    }
}

/// Lowercase and straighten typographic apostrophes ("King’s").
fn fold(s: &str) -> String {
    s.to_lowercase().replace('\u{2019}', "'")
}

/// Preset boundaries only; panics on an out-of-range constant.
fn hm(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).expect("preset time out of range")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rstest::rstest;

    use super::*;

    fn event(name: &str) -> NormalizedEvent {
        let day = NaiveDate::from_ymd_opt(2024, 1, 26).unwrap();
        NormalizedEvent {
            index: 1,
            start: day,
            end: day,
            name: name.to_string(),
        }
    }

    #[rstest]
    #[case("Holiday", true)]
    #[case("HOLIDAY", true)]
    #[case("Public Holiday Monday", true)]
    #[case("University holiday period", true)]
    #[case("Orientation Week", false)]
    #[case("Holi day", false)]
    fn holiday_marker_is_case_insensitive(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_holiday(name), expected);
    }

    #[test]
    fn non_holidays_have_no_window() {
        let c = EventClassifier::new(Preset::Workday.config()).classify(event("Orientation Week"));
        assert!(!c.is_holiday);
        assert_eq!(c.window, None);
        assert_eq!(c.title, "Orientation Week");
    }

    #[rstest]
    #[case("Australia Day Holiday", true)]
    #[case("ANZAC Day Holiday", true)]
    #[case("King\u{2019}s Birthday Holiday", true)]
    #[case("AFL Grand Final Friday Holiday", true)]
    #[case("New Year's Day Holiday", false)]
    #[case("University Holiday Period", false)]
    fn named_preset_times_only_allow_listed(#[case] name: &str, #[case] timed: bool) {
        let c = EventClassifier::new(Preset::Named.config()).classify(event(name));
        let expected = if timed {
            EventWindow::Timed { start: hm(8, 0), end: hm(20, 0) }
        } else {
            EventWindow::AllDay
        };
        assert_eq!(c.window, Some(expected));
        assert_eq!(c.title, name);
    }

    #[test]
    fn workday_preset_times_everything_and_prefixes() {
        let c = EventClassifier::new(Preset::Workday.config())
            .classify(event("University Holiday Period"));
        assert_eq!(
            c.window,
            Some(EventWindow::Timed { start: hm(8, 0), end: hm(17, 0) })
        );
        assert_eq!(c.title, "[HOLIDAY] University Holiday Period");
        assert_eq!(c.event.name, "University Holiday Period");
    }

    #[test]
    fn business_preset_window() {
        let c = EventClassifier::new(Preset::Business.config()).classify(event("ANZAC Day Holiday"));
        assert_eq!(
            c.window,
            Some(EventWindow::Timed { start: hm(9, 0), end: hm(17, 0) })
        );
    }

    #[test]
    fn reversed_window_is_rejected() {
        let config = ClassifierConfig {
            policy: WindowPolicy::Uniform { start: hm(17, 0), end: hm(9, 0) },
            title_prefix: None,
        };
        assert!(matches!(config.validate(), Err(SettingsError::EmptyWindow { .. })));
        for preset in [Preset::Named, Preset::Workday, Preset::Business] {
            assert!(preset.config().validate().is_ok());
        }
    }

    #[test]
    #[should_panic(expected = "preset time out of range")]
    fn out_of_range_preset_time_panics() {
        hm(24, 30);
    }
}
