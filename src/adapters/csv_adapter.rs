//! CSV directory price history adapter.
//!
//! Expects one `<CODE>.csv` per instrument with a header row containing a
//! `date` column (`YYYY-MM-DD`) and either an adjusted close column
//! (`adj_close` / `adj close`) or a plain `close` column.

use crate::domain::error::MomtraderError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::price_port::PriceHistoryPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::warn;

const COMPONENT: &str = "price history";
const PRICE_COLUMNS: [&str; 4] = ["adj_close", "adj close", "adjclose", "close"];

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    /// `Ok(None)` when the file is absent or has no rows inside the window.
    fn read_series(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<PriceSeries>, MomtraderError> {
        let path = self.csv_path(code);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MomtraderError::collaborator(
                    COMPONENT,
                    format!("failed to read {}: {}", path.display(), e),
                ));
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| {
                MomtraderError::collaborator(COMPONENT, format!("CSV header error: {}", e))
            })?
            .clone();
        let date_idx = column_index(&headers, &["date"]).ok_or_else(|| {
            MomtraderError::collaborator(COMPONENT, format!("{}: missing date column", code))
        })?;
        let price_idx = column_index(&headers, &PRICE_COLUMNS).ok_or_else(|| {
            MomtraderError::collaborator(COMPONENT, format!("{}: missing close column", code))
        })?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| {
                MomtraderError::collaborator(COMPONENT, format!("CSV parse error: {}", e))
            })?;

            let date_str = record.get(date_idx).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                MomtraderError::collaborator(
                    COMPONENT,
                    format!("{}: invalid date '{}': {}", code, date_str, e),
                )
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            let close_str = record.get(price_idx).unwrap_or_default().trim();
            let close: f64 = close_str.parse().map_err(|e| {
                MomtraderError::collaborator(
                    COMPONENT,
                    format!("{}: invalid close value '{}': {}", code, close_str, e),
                )
            })?;

            points.push(PricePoint::new(date, close));
        }

        if points.is_empty() {
            return Ok(None);
        }

        PriceSeries::from_unsorted(code, points)
            .map(Some)
            .map_err(|e| MomtraderError::collaborator(COMPONENT, e.to_string()))
    }
}

fn column_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

impl PriceHistoryPort for CsvPriceAdapter {
    fn fetch_history(
        &self,
        codes: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HashMap<String, PriceSeries>, MomtraderError> {
        if !self.base_path.is_dir() {
            return Err(MomtraderError::collaborator(
                COMPONENT,
                format!("data directory {} not found", self.base_path.display()),
            ));
        }

        let mut history = HashMap::with_capacity(codes.len());
        for code in codes {
            match self.read_series(code, start_date, end_date) {
                Ok(Some(series)) => {
                    history.insert(code.clone(), series);
                }
                Ok(None) => warn!(code = %code, "no CSV price data in window"),
                Err(e) => warn!(code = %code, error = %e, "skipping unreadable CSV price data"),
            }
        }
        Ok(history)
    }

    fn is_available(&self) -> bool {
        self.base_path.is_dir()
    }
}
