//! Equal-weight position sizing and order generation.
//!
//! Every ranked instrument receives the same cash slice of the investable
//! part of the portfolio. Quantities are whole shares, rounded down, so the
//! total spend never exceeds the investable budget.

use std::fmt;
use tracing::{info, warn};

use crate::domain::error::MomtraderError;
use crate::domain::signal::RankedSignalSet;
use crate::ports::order_port::OrderSink;

pub const DEFAULT_PORTFOLIO_VALUE: f64 = 10_000.0;
pub const DEFAULT_INVESTABLE_FRACTION: f64 = 0.8;
/// Per-share price used when the sink cannot quote an instrument.
pub const DEFAULT_FALLBACK_PRICE: f64 = 150.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationConfig {
    pub investable_fraction: f64,
    pub fallback_price: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        AllocationConfig {
            investable_fraction: DEFAULT_INVESTABLE_FRACTION,
            fallback_price: DEFAULT_FALLBACK_PRICE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub code: String,
    pub side: Side,
    pub quantity: u64,
    pub reference_price: f64,
    pub momentum_score: f64,
}

impl OrderIntent {
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.reference_price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioPlan {
    pub total_value: f64,
    pub investable_fraction: f64,
    pub cash_per_instrument: f64,
}

impl PortfolioPlan {
    pub fn new(
        total_value: f64,
        investable_fraction: f64,
        instruments: usize,
    ) -> Result<Self, MomtraderError> {
        validate_portfolio_value(total_value)?;
        validate_investable_fraction(investable_fraction)?;
        if instruments == 0 {
            return Err(MomtraderError::NoData {
                reason: "no instruments to allocate to".into(),
            });
        }
        Ok(PortfolioPlan {
            total_value,
            investable_fraction,
            cash_per_instrument: total_value * investable_fraction / instruments as f64,
        })
    }

    pub fn investable(&self) -> f64 {
        self.total_value * self.investable_fraction
    }
}

pub fn validate_portfolio_value(value: f64) -> Result<(), MomtraderError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(MomtraderError::invalid(
            "trading",
            "portfolio_value",
            "portfolio_value must be positive",
        ));
    }
    Ok(())
}

pub fn validate_investable_fraction(fraction: f64) -> Result<(), MomtraderError> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(MomtraderError::invalid(
            "trading",
            "investable_fraction",
            "investable_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}

/// Quote from the sink if it is a usable price, else the fallback.
pub fn reference_price(sink: &dyn OrderSink, code: &str, fallback: f64) -> f64 {
    match sink.reference_price(code) {
        Some(price) if price.is_finite() && price > 0.0 => price,
        Some(price) => {
            warn!(code = %code, price, fallback, "unusable reference price, using fallback");
            fallback
        }
        None => fallback,
    }
}

pub fn build_orders(
    signals: &RankedSignalSet,
    portfolio_value: f64,
    config: &AllocationConfig,
    sink: &dyn OrderSink,
) -> Result<Vec<OrderIntent>, MomtraderError> {
    if signals.is_empty() {
        info!("no signals to allocate, skipping order generation");
        return Ok(Vec::new());
    }

    let plan = PortfolioPlan::new(portfolio_value, config.investable_fraction, signals.len())?;
    info!(
        portfolio_value,
        cash_per_instrument = plan.cash_per_instrument,
        instruments = signals.len(),
        "equal-weight allocation"
    );

    let mut orders = Vec::with_capacity(signals.len());
    for signal in signals {
        let price = reference_price(sink, &signal.code, config.fallback_price);
        let quantity = (plan.cash_per_instrument / price).floor() as u64;
        if quantity == 0 {
            warn!(
                code = %signal.code,
                price,
                cash = plan.cash_per_instrument,
                "allocation buys zero shares, dropping"
            );
            continue;
        }
        orders.push(OrderIntent {
            code: signal.code.clone(),
            side: Side::Buy,
            quantity,
            reference_price: price,
            momentum_score: signal.score,
        });
    }

    Ok(orders)
}
