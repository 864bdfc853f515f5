#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use momtrader::domain::allocation::OrderIntent;
use momtrader::domain::error::MomtraderError;
use momtrader::domain::execution::{confirmation_id, AccountInfo, PAPER_BUYING_POWER};
use momtrader::domain::price::{PricePoint, PriceSeries};
use momtrader::ports::activity_log_port::ActivityLog;
use momtrader::ports::order_port::OrderSink;
use momtrader::ports::price_port::PriceHistoryPort;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

pub struct MockPriceSource {
    pub series: HashMap<String, PriceSeries>,
    pub failure: Option<String>,
    pub available: bool,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            failure: None,
            available: true,
        }
    }

    pub fn with_series(mut self, code: &str, closes: &[(&str, f64)]) -> Self {
        self.series.insert(code.to_string(), make_series(code, closes));
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self.available = false;
        self
    }
}

impl PriceHistoryPort for MockPriceSource {
    fn fetch_history(
        &self,
        codes: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HashMap<String, PriceSeries>, MomtraderError> {
        if let Some(reason) = &self.failure {
            return Err(MomtraderError::collaborator("price history", reason.as_str()));
        }
        let mut history = HashMap::new();
        for code in codes {
            let Some(series) = self.series.get(code) else {
                continue;
            };
            let points: Vec<PricePoint> = series
                .points()
                .iter()
                .copied()
                .filter(|p| p.date >= start_date && p.date <= end_date)
                .collect();
            if let Ok(windowed) = PriceSeries::new(code.as_str(), points) {
                history.insert(code.clone(), windowed);
            }
        }
        Ok(history)
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

pub struct MockOrderSink {
    pub quotes: HashMap<String, f64>,
    pub failing: HashSet<String>,
    pub placed: RefCell<Vec<OrderIntent>>,
}

impl MockOrderSink {
    pub fn new() -> Self {
        Self {
            quotes: HashMap::new(),
            failing: HashSet::new(),
            placed: RefCell::new(Vec::new()),
        }
    }

    pub fn with_quote(mut self, code: &str, price: f64) -> Self {
        self.quotes.insert(code.to_string(), price);
        self
    }

    pub fn failing_on(mut self, code: &str) -> Self {
        self.failing.insert(code.to_string());
        self
    }

    pub fn placed_codes(&self) -> Vec<String> {
        self.placed.borrow().iter().map(|o| o.code.clone()).collect()
    }
}

impl OrderSink for MockOrderSink {
    fn place_order(&self, order: &OrderIntent) -> Result<String, MomtraderError> {
        if self.failing.contains(&order.code) {
            return Err(MomtraderError::collaborator("order sink", "broker rejected order"));
        }
        self.placed.borrow_mut().push(order.clone());
        Ok(confirmation_id(&order.code, order.side, order.quantity))
    }

    fn reference_price(&self, code: &str) -> Option<f64> {
        self.quotes.get(code).copied()
    }

    fn account_info(&self) -> AccountInfo {
        AccountInfo::paper(PAPER_BUYING_POWER)
    }
}

#[derive(Default)]
pub struct MemoryActivityLog {
    pub lines: RefCell<Vec<(NaiveDateTime, String)>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summaries(&self) -> Vec<String> {
        self.lines.borrow().iter().map(|(_, s)| s.clone()).collect()
    }
}

impl ActivityLog for MemoryActivityLog {
    fn append(&self, timestamp: NaiveDateTime, summary: &str) -> Result<(), MomtraderError> {
        self.lines.borrow_mut().push((timestamp, summary.to_string()));
        Ok(())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

pub fn make_series(code: &str, closes: &[(&str, f64)]) -> PriceSeries {
    let points = closes
        .iter()
        .map(|(d, close)| PricePoint::new(date(d), *close))
        .collect();
    PriceSeries::new(code, points).unwrap()
}

/// Prices for the A/B/C scenario: A +10%, B +40%, C -20%.
pub fn abc_prices() -> MockPriceSource {
    MockPriceSource::new()
        .with_series("A", &[("2024-01-02", 100.0), ("2024-12-30", 110.0)])
        .with_series("B", &[("2024-01-02", 50.0), ("2024-12-30", 70.0)])
        .with_series("C", &[("2024-01-02", 200.0), ("2024-12-30", 160.0)])
}
