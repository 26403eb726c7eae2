//! CSV file bar adapter.
//!
//! Expected header: `time,open,high,low,close,spread`. `time` is Unix seconds
//! or `YYYY-MM-DD HH:MM:SS`.

use crate::domain::bar::Bar;
use crate::domain::error::TraderError;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDateTime};
use std::path::PathBuf;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

pub fn parse_time(value: &str) -> Result<NaiveDateTime, TraderError> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| TraderError::Data {
                reason: format!("timestamp out of range: {}", secs),
            });
    }
    NaiveDateTime::parse_from_str(value, TIME_FORMAT).map_err(|e| TraderError::Data {
        reason: format!("invalid time '{}': {}", value, e),
    })
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, TraderError> {
    record
        .get(index)
        .ok_or_else(|| TraderError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| TraderError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

/// Parse bar CSV text, sorted ascending. Duplicate timestamps are an error.
pub fn parse_bars(content: &str) -> Result<Vec<Bar>, TraderError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let time = parse_time(record.get(0).ok_or_else(|| TraderError::Data {
            reason: "missing time column".into(),
        })?)?;

        bars.push(Bar {
            time,
            open: parse_field(&record, 1, "open")?,
            high: parse_field(&record, 2, "high")?,
            low: parse_field(&record, 3, "low")?,
            close: parse_field(&record, 4, "close")?,
            spread: parse_field(&record, 5, "spread")?,
        });
    }

    bars.sort_by_key(|b| b.time);
    if let Some(pair) = bars.windows(2).find(|w| w[0].time == w[1].time) {
        return Err(TraderError::Data {
            reason: format!("duplicate bar timestamp {}", pair[0].time),
        });
    }
    Ok(bars)
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, TraderError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| TraderError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let bars = parse_bars(&content)?
            .into_iter()
            .filter(|b| start.is_none_or(|s| b.time >= s) && end.is_none_or(|e| b.time <= e))
            .collect();
        Ok(bars)
    }
}
