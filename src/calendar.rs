use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, Event, EventLike};
use tracing::debug;

use crate::classify::{ClassifiedEvent, EventWindow};
use crate::error::PipelineError;
use crate::settings::RunContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTiming {
    Timed { start: DateTime<Tz>, end: DateTime<Tz> },
    /// Inclusive on both ends.
    AllDay { first: NaiveDate, last: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub uid: String,
    pub title: String,
    pub timing: EntryTiming,
}

/// Holiday entries in table order. Overlaps and duplicates are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDocument {
    pub timezone: Tz,
    pub entries: Vec<CalendarEntry>,
}

impl CalendarDocument {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as iCalendar text. Timed entries are written as UTC instants.
    pub fn to_ics(&self, name: &str, stamp: DateTime<Utc>) -> String {
        let mut calendar = Calendar::new();
        calendar.name(name).timezone(self.timezone.name());

        for entry in &self.entries {
            let mut event = Event::new();
            event.uid(&entry.uid).summary(&entry.title).timestamp(stamp);
            match &entry.timing {
                EntryTiming::Timed { start, end } => {
                    event
                        .starts(start.with_timezone(&Utc))
                        .ends(end.with_timezone(&Utc));
                }
                EntryTiming::AllDay { first, last } => {
                    // DTEND is exclusive for date values
                    let after = last.checked_add_days(Days::new(1)).unwrap_or(*last);
                    event.starts(*first).ends(after);
                }
            }
            calendar.push(event.done());
        }

        calendar.to_string()
    }
}

/// Turn classified holidays into calendar entries, localized to the run's
/// timezone. Non-holidays are skipped.
pub fn build(events: &[ClassifiedEvent], ctx: &RunContext) -> Result<CalendarDocument, PipelineError> {
    let mut entries = Vec::new();

    for classified in events {
        let Some(window) = classified.window else {
            continue;
        };
        let event = &classified.event;

        let timing = match window {
            EventWindow::Timed { start, end } => EntryTiming::Timed {
                start: localize(ctx.timezone, event.start, start, event.index)?,
                end: localize(ctx.timezone, event.end, end, event.index)?,
            },
            EventWindow::AllDay => EntryTiming::AllDay {
                first: event.start,
                last: event.end,
            },
        };

        entries.push(CalendarEntry {
            uid: entry_uid(event.index, event.start, &event.name),
            title: classified.title.clone(),
            timing,
        });
    }

    debug!("Built {} calendar entries", entries.len());
    Ok(CalendarDocument {
        timezone: ctx.timezone,
        entries,
    })
}

/// Attach `time` to `date` in `tz`. Repeated wall-clock times (DST ending)
/// take the earlier instant; skipped ones (DST starting) are an error.
fn localize(tz: Tz, date: NaiveDate, time: NaiveTime, index: usize) -> Result<DateTime<Tz>, PipelineError> {
    let local = date.and_time(time);
    tz.from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| PipelineError::Localization {
            index,
            local,
            timezone: tz.name().to_string(),
        })
}

/// Stable across runs so regenerated files diff cleanly.
fn entry_uid(index: usize, start: NaiveDate, name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    format!(
        "{:03}-{}-{}@key-dates",
        index,
        start.format("%Y%m%d"),
        slug.trim_matches('-')
    )
}
