//! Configuration validation for the `[trading]` and `[schedule]` sections.

use crate::domain::allocation::{
    validate_investable_fraction, validate_portfolio_value, DEFAULT_FALLBACK_PRICE,
    DEFAULT_INVESTABLE_FRACTION, DEFAULT_PORTFOLIO_VALUE,
};
use crate::domain::error::MomtraderError;
use crate::domain::schedule::{
    parse_time_of_day, DEFAULT_HEALTH_CHECK_TIME, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_REBALANCE_TIME, MAX_POLL_INTERVAL_SECS,
};
use crate::domain::signal::{DEFAULT_LOOKBACK_DAYS, DEFAULT_TOP_K, MAX_LOOKBACK_DAYS};
use crate::domain::universe::{parse_codes, DEFAULT_CODES};
use crate::ports::config_port::ConfigPort;

pub fn validate_trading_config(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    validate_codes(config)?;
    validate_lookback(config)?;
    validate_top_k(config)?;
    validate_portfolio_value(config.get_double(
        "trading",
        "portfolio_value",
        DEFAULT_PORTFOLIO_VALUE,
    ))?;
    validate_investable_fraction(config.get_double(
        "trading",
        "investable_fraction",
        DEFAULT_INVESTABLE_FRACTION,
    ))?;
    validate_fallback_price(config)?;
    Ok(())
}

pub fn validate_schedule_config(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    validate_time(config, "rebalance_time", DEFAULT_REBALANCE_TIME)?;
    validate_time(config, "health_check_time", DEFAULT_HEALTH_CHECK_TIME)?;
    validate_poll_interval(config)?;
    Ok(())
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let codes = config.get_string_or("trading", "codes", DEFAULT_CODES);
    parse_codes(&codes).map_err(|e| MomtraderError::invalid("trading", "codes", e.to_string()))?;
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let value = config.get_int("trading", "lookback_days", DEFAULT_LOOKBACK_DAYS);
    if !(1..=MAX_LOOKBACK_DAYS).contains(&value) {
        return Err(MomtraderError::invalid(
            "trading",
            "lookback_days",
            format!("lookback_days must be between 1 and {}", MAX_LOOKBACK_DAYS),
        ));
    }
    Ok(())
}

fn validate_top_k(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let value = config.get_int("trading", "top_k", DEFAULT_TOP_K as i64);
    if value < 1 {
        return Err(MomtraderError::invalid(
            "trading",
            "top_k",
            "top_k must be at least 1",
        ));
    }
    Ok(())
}

fn validate_fallback_price(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let value = config.get_double("trading", "fallback_price", DEFAULT_FALLBACK_PRICE);
    if !value.is_finite() || value <= 0.0 {
        return Err(MomtraderError::invalid(
            "trading",
            "fallback_price",
            "fallback_price must be positive",
        ));
    }
    Ok(())
}

fn validate_time(config: &dyn ConfigPort, key: &str, default: &str) -> Result<(), MomtraderError> {
    let value = config.get_string_or("schedule", key, default);
    match parse_time_of_day(&value) {
        Some(_) => Ok(()),
        None => Err(MomtraderError::invalid(
            "schedule",
            key,
            format!("invalid time '{}', expected HH:MM", value),
        )),
    }
}

fn validate_poll_interval(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let value = config.get_int(
        "schedule",
        "poll_interval_secs",
        DEFAULT_POLL_INTERVAL_SECS as i64,
    );
    if value < 1 || value > MAX_POLL_INTERVAL_SECS as i64 {
        return Err(MomtraderError::invalid(
            "schedule",
            "poll_interval_secs",
            format!("poll_interval_secs must be between 1 and {}", MAX_POLL_INTERVAL_SECS),
        ));
    }
    Ok(())
}
