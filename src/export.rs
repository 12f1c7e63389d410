use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::classify::ClassifiedEvent;
use crate::parser::dates::{NormalizedEvent, DATE_FORMAT};

pub const HEADER: [&str; 3] = ["Start Date", "End Date", "Event Name"];

/// Every event, holiday or not.
pub fn events_csv(events: &[ClassifiedEvent]) -> Result<Vec<u8>> {
    write_csv(events.iter().map(|c| &c.event))
}

/// Holidays only, with their plain (undecorated) names.
pub fn holidays_csv(events: &[ClassifiedEvent]) -> Result<Vec<u8>> {
    write_csv(events.iter().filter(|c| c.is_holiday).map(|c| &c.event))
}

fn write_csv<'a>(events: impl Iterator<Item = &'a NormalizedEvent>) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for e in events {
        writer.write_record([e.start_str().as_str(), e.end_str().as_str(), e.name.as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e.error()))
}

/// Parse an exported table back into dates.
pub fn read_rows(data: &[u8]) -> Result<Vec<(NaiveDate, NaiveDate, String)>> {
    let mut reader = csv::Reader::from_reader(data);
    let header = reader.headers()?.clone();
    anyhow::ensure!(
        header.iter().eq(HEADER),
        "Unexpected CSV header: {:?}",
        header
    );

    reader
        .records()
        .enumerate()
        .map(|(i, record)| {
            let record = record?;
            let date = |col: usize| -> Result<NaiveDate> {
                let raw = record.get(col).unwrap_or_default();
                NaiveDate::parse_from_str(raw, DATE_FORMAT)
                    .with_context(|| format!("Row {}: bad date {:?}", i, raw))
            };
            let name = record.get(2).unwrap_or_default().to_string();
            Ok((date(0)?, date(1)?, name))
        })
        .collect()
}

pub struct OutputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Write every file to a temporary name, then rename them all into place.
///
/// Nothing is renamed until every temporary has been written, and the
/// temporaries are removed again on any failure.
pub fn write_outputs(dir: &Path, files: &[OutputFile]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let staged: Vec<(PathBuf, PathBuf)> = files
        .iter()
        .map(|f| (dir.join(format!(".{}.tmp", f.name)), dir.join(&f.name)))
        .collect();

    let result = stage(files, &staged).and_then(|()| commit(&staged));
    if result.is_err() {
        for (tmp, _) in &staged {
            let _ = std::fs::remove_file(tmp);
        }
        return result;
    }

    for (file, (_, target)) in files.iter().zip(&staged) {
        info!("Wrote {} ({} bytes)", target.display(), file.bytes.len());
    }
    Ok(())
}

fn stage(files: &[OutputFile], staged: &[(PathBuf, PathBuf)]) -> Result<()> {
    for (file, (tmp, target)) in files.iter().zip(staged) {
        anyhow::ensure!(
            !target.is_dir(),
            "Cannot replace {}: it is a directory",
            target.display()
        );
        std::fs::write(tmp, &file.bytes)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
    }
    Ok(())
}

fn commit(staged: &[(PathBuf, PathBuf)]) -> Result<()> {
    for (tmp, target) in staged {
        std::fs::rename(tmp, target)
            .with_context(|| format!("Failed to move {} into place", target.display()))?;
    }
    Ok(())
}

// ── Tests ──
