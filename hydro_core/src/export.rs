//! CSV export of the ledger.
//!
//! One row per record, ordered by date then insertion order.

use crate::{DayLedger, DayStat, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A row in the records CSV
#[derive(Debug, serde::Serialize)]
struct RecordRow {
    date: String,
    time: String,
    amount_ml: u32,
}

/// A row in the weekly summary CSV
#[derive(Debug, serde::Serialize)]
struct SummaryRow {
    date: String,
    total_ml: u32,
    goal_ml: u32,
    goal_met: bool,
}

/// Write all records as CSV; returns the number of rows
pub fn write_records<W: Write>(records: &DayLedger, writer: W) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut count = 0;

    for (date, day) in records {
        for record in day {
            writer.serialize(RecordRow {
                date: date.format("%Y-%m-%d").to_string(),
                time: record.time.format("%H:%M").to_string(),
                amount_ml: record.amount,
            })?;
            count += 1;
        }
    }

    writer.flush()?;
    Ok(count)
}

/// Write a weekly summary as CSV
pub fn write_summary<W: Write>(stats: &[DayStat], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for stat in stats {
        writer.serialize(SummaryRow {
            date: stat.date.format("%Y-%m-%d").to_string(),
            total_ml: stat.total,
            goal_ml: stat.goal,
            goal_met: stat.goal_met(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Export all records to `path`, replacing any existing file
pub fn export_records(records: &DayLedger, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let count = write_records(records, &file)?;
    file.sync_all()?;

    tracing::info!("Exported {} records to {:?}", count, path);
    Ok(count)
}
