mod calendar;
mod classify;
mod error;
mod export;
mod fetch;
mod parser;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use calendar::CalendarDocument;
use classify::{ClassifiedEvent, EventClassifier, EventWindow, Preset};
use export::OutputFile;
use settings::{Period, RunContext, Settings};

#[derive(Parser)]
#[command(
    name = "key_dates",
    about = "Scrape university key dates into CSV and a holiday iCalendar file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Page to scrape (overrides --period and the configured source_url)
    #[arg(long)]
    url: Option<String>,
    /// Scrape the university-holidays page for this period
    #[arg(short, long, value_enum)]
    period: Option<Period>,
    /// Reference year (default: current year, shifted by --period)
    #[arg(short, long)]
    year: Option<i32>,
    /// Read a saved HTML page instead of fetching
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Configuration file (default: key_dates.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Holiday time-window preset; replaces any configured window_policy and title_prefix
    #[arg(long, value_enum)]
    preset: Option<Preset>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape, then write events.csv, holiday_events.csv and holiday_events_<year>.ics
    Run {
        #[command(flatten)]
        source: SourceArgs,
        /// Output directory (default: configured output_dir)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Print the holiday table without writing anything
    Preview {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { source, out_dir } => {
            let run = process(&source).await?;
            let files = render_outputs(&run)?;
            let dir = out_dir.unwrap_or_else(|| run.settings.output_dir.clone());
            export::write_outputs(&dir, &files)?;
            println!("Wrote {} files to {}", files.len(), dir.display());
            Ok(())
        }
        Commands::Preview { source } => {
            let run = process(&source).await?;
            print_holidays(&run);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ProcessedRun {
    settings: Settings,
    ctx: RunContext,
    events: Vec<ClassifiedEvent>,
    calendar: CalendarDocument,
}

/// Settings → source → parse → classify → calendar, all in memory.
async fn process(source: &SourceArgs) -> anyhow::Result<ProcessedRun> {
    let mut settings = Settings::load(source.config.as_deref())?;
    if let Some(preset) = source.preset {
        settings.preset = preset;
        settings.window_policy = None;
        settings.title_prefix = None;
    }
    let classifier = EventClassifier::new(settings.classifier()?);
    let ctx = RunContext::capture(source.year, source.period, settings.timezone);
    info!(
        "Reference year {} ({}), preset {:?}",
        ctx.reference_year,
        ctx.timezone.name(),
        settings.preset
    );

    let html = match &source.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let url = settings.source(source.url.as_deref(), source.period)?;
            fetch::fetch_page(&url).await?
        }
    };

    let normalized = parser::parse_document(&html, ctx.reference_year)?;
    let events = classifier.classify_all(normalized);
    let calendar = calendar::build(&events, &ctx)?;
    info!(
        "Parsed {} events, {} holidays",
        events.len(),
        calendar.entries.len()
    );

    Ok(ProcessedRun {
        settings,
        ctx,
        events,
        calendar,
    })
}

/// Render every output file in memory. The full export is read back and
/// compared before anything touches the disk.
fn render_outputs(run: &ProcessedRun) -> anyhow::Result<Vec<OutputFile>> {
    let events_csv = export::events_csv(&run.events)?;
    let rows = export::read_rows(&events_csv)?;
    let round_trips = rows.len() == run.events.len()
        && rows
            .iter()
            .zip(&run.events)
            .all(|(row, c)| row.0 == c.event.start && row.1 == c.event.end);
    anyhow::ensure!(round_trips, "Rendered events.csv does not match the parsed table");

    let mut files = vec![OutputFile {
        name: "events.csv".to_string(),
        bytes: events_csv,
    }];

    if run.calendar.is_empty() {
        warn!("No holiday events found; skipping holiday CSV and calendar");
        return Ok(files);
    }

    files.push(OutputFile {
        name: "holiday_events.csv".to_string(),
        bytes: export::holidays_csv(&run.events)?,
    });
    files.push(OutputFile {
        name: format!("holiday_events_{}.ics", run.ctx.reference_year),
        bytes: run
            .calendar
            .to_ics(&run.settings.calendar_name, run.ctx.stamp())
            .into_bytes(),
    });
    Ok(files)
}

fn print_holidays(run: &ProcessedRun) {
    let holidays: Vec<_> = run.events.iter().filter(|c| c.is_holiday).collect();
    if holidays.is_empty() {
        println!("No holiday events found.");
        return;
    }

    println!(
        "{:>3} | {:<10} | {:<10} | {:<40} | {:<11}",
        "#", "Start", "End", "Holiday", "Time"
    );
    println!("{}", "-".repeat(88));

    for (i, c) in holidays.iter().enumerate() {
        let time = match c.window {
            Some(EventWindow::Timed { start, end }) => {
                format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
            }
            _ => "all day".to_string(),
        };
        println!(
            "{:>3} | {:<10} | {:<10} | {:<40} | {:<11}",
            i + 1,
            c.event.start_str(),
            c.event.end_str(),
            truncate(&c.title, 40),
            time
        );
    }

    println!(
        "\n{} holidays of {} events | reference year {}",
        holidays.len(),
        run.events.len(),
        run.ctx.reference_year
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    async fn fixture_run(preset: Preset) -> ProcessedRun {
        let source = SourceArgs {
            url: None,
            period: None,
            year: Some(2024),
            input: Some(PathBuf::from("tests/fixtures/key_dates.html")),
            config: None,
            preset: Some(preset),
        };
        process(&source).await.unwrap()
    }

    #[tokio::test]
    async fn fixture_renders_three_files() {
        let run = fixture_run(Preset::Named).await;
        let files = render_outputs(&run).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["events.csv", "holiday_events.csv", "holiday_events_2024.ics"]
        );

        let holidays = export::read_rows(&files[1].bytes).unwrap();
        assert_eq!(holidays.len(), 5);
        assert!(holidays.iter().all(|r| classify::is_holiday(&r.2)));

        let ics = String::from_utf8(files[2].bytes.clone()).unwrap();
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 5);
        assert!(ics.contains("X-WR-CALNAME:UniMelb Holiday Events"));
        // Australia Day, 08:00-20:00 AEDT
        assert!(ics.contains("DTSTART:20240125T210000Z"));
        assert!(ics.contains("DTEND:20240126T090000Z"));
        // University Holiday Period, all day, straddling the year boundary
        assert!(ics.contains("DTSTART;VALUE=DATE:20231223"));
        assert!(ics.contains("DTEND;VALUE=DATE:20250102"));
    }

    #[tokio::test]
    async fn rerun_is_byte_identical() {
        let first = render_outputs(&fixture_run(Preset::Workday).await).unwrap();
        let second = render_outputs(&fixture_run(Preset::Workday).await).unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.bytes, b.bytes);
        }
    }

    #[tokio::test]
    async fn malformed_row_aborts_before_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.html");
        std::fs::write(
            &path,
            r#"<table>
                 <tr itemscope><td><span itemprop="startTime">Friday 26 January</span></td>
                   <td><span itemprop="name">Australia Day Holiday</span></td></tr>
                 <tr itemscope><td><span itemprop="startTime">Thursday 25 April</span></td></tr>
               </table>"#,
        )
        .unwrap();

        let source = SourceArgs {
            url: None,
            period: None,
            year: Some(2024),
            input: Some(path),
            config: None,
            preset: None,
        };
        let err = process(&source).await.err().unwrap();

        let err = err.downcast::<error::PipelineError>().unwrap();
        assert!(matches!(
            err,
            error::PipelineError::MalformedRow { index: 1, field: error::RowField::Name }
        ));
    }

    #[tokio::test]
    async fn preset_flag_replaces_configured_window() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("key_dates.toml");
        std::fs::write(
            &config,
            r#"
title_prefix = "[OFF] "

[window_policy]
kind = "uniform"
start = "10:00:00"
end = "12:00:00"
"#,
        )
        .unwrap();

        let source = |preset| SourceArgs {
            url: None,
            period: None,
            year: Some(2024),
            input: Some(PathBuf::from("tests/fixtures/key_dates.html")),
            config: Some(config.clone()),
            preset,
        };
        let anzac = |run: &ProcessedRun| {
            run.events
                .iter()
                .find(|c| c.event.name == "ANZAC Day Holiday")
                .cloned()
                .unwrap()
        };
        let hm = |h| chrono::NaiveTime::from_hms_opt(h, 0, 0).unwrap();

        let configured = anzac(&process(&source(None)).await.unwrap());
        assert_eq!(configured.title, "[OFF] ANZAC Day Holiday");
        assert_eq!(
            configured.window,
            Some(EventWindow::Timed { start: hm(10), end: hm(12) })
        );

        let business = anzac(&process(&source(Some(Preset::Business))).await.unwrap());
        assert_eq!(business.title, "ANZAC Day Holiday");
        assert_eq!(
            business.window,
            Some(EventWindow::Timed { start: hm(9), end: hm(17) })
        );
    }

    #[test]
    fn truncate_marks_cut_titles() {
        assert_eq!(truncate("ANZAC Day Holiday", 40), "ANZAC Day Holiday");
        assert_eq!(truncate("University Holiday Period", 10), "Univers...");
    }

    #[test]
    fn durations_scale_their_units() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
