//! Per-bar backtest output as CSV: bars, MA, signals, profitable flags,
//! stop-loss hits and the balance series, one row per simulated bar.

use std::path::Path;

use crate::adapters::csv_adapter::TIME_FORMAT;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::TraderError;
use crate::ports::report_port::ReportPort;

pub const HEADER: [&str; 11] = [
    "time",
    "open",
    "high",
    "low",
    "close",
    "spread",
    "ma",
    "signal",
    "profitable",
    "stop_loss",
    "balance",
];

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn write_to<W: std::io::Write>(
        &self,
        result: &BacktestResult,
        writer: W,
    ) -> Result<(), TraderError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(HEADER)?;

        for r in &result.portfolio.records {
            let profitable = match r.profitable {
                Some(true) => "1".to_string(),
                Some(false) => "0".to_string(),
                None => String::new(),
            };
            let stop = r.stop_loss_hit.map(|s| s.to_string()).unwrap_or_default();
            wtr.write_record([
                r.time.format(TIME_FORMAT).to_string(),
                r.open.to_string(),
                r.high.to_string(),
                r.low.to_string(),
                r.close.to_string(),
                r.spread.to_string(),
                r.ma.to_string(),
                r.signal.value().to_string(),
                profitable,
                stop,
                r.balance.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), TraderError> {
        let file = std::fs::File::create(output_path)?;
        self.write_to(result, file)
    }
}
