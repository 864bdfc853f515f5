//! Momentum signal generation.
//!
//! Scores each instrument by its simple total return over the lookback
//! window (`last / first - 1`, not annualised or risk-adjusted), then keeps
//! the top-K by score.

use chrono::{Days, NaiveDate};
use tracing::{debug, warn};

use crate::domain::error::MomtraderError;
use crate::domain::price::PriceSeries;
use crate::domain::universe::Universe;
use crate::ports::price_port::PriceHistoryPort;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;
pub const DEFAULT_TOP_K: usize = 2;
pub const MIN_OBSERVATIONS: usize = 2;
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumSignal {
    pub code: String,
    pub score: f64,
}

/// Signals sorted by descending score, at most `top_k` long.
///
/// Only [`rank_signals`] builds one, so the ordering cannot be broken by callers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankedSignalSet {
    signals: Vec<MomentumSignal>,
}

impl RankedSignalSet {
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MomentumSignal> {
        self.signals.iter()
    }

    pub fn as_slice(&self) -> &[MomentumSignal] {
        &self.signals
    }

    pub fn codes(&self) -> Vec<&str> {
        self.signals.iter().map(|s| s.code.as_str()).collect()
    }
}

impl IntoIterator for RankedSignalSet {
    type Item = MomentumSignal;
    type IntoIter = std::vec::IntoIter<MomentumSignal>;

    fn into_iter(self) -> Self::IntoIter {
        self.signals.into_iter()
    }
}

impl<'a> IntoIterator for &'a RankedSignalSet {
    type Item = &'a MomentumSignal;
    type IntoIter = std::slice::Iter<'a, MomentumSignal>;

    fn into_iter(self) -> Self::IntoIter {
        self.signals.iter()
    }
}

/// Lookback window measured in calendar days ending on the as-of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback {
    pub days: i64,
}

impl Lookback {
    pub fn days(days: i64) -> Self {
        Lookback { days }
    }

    /// First date of the window. Fails for a negative length or one that
    /// reaches past the earliest representable date.
    pub fn start_date(&self, as_of: NaiveDate) -> Result<NaiveDate, MomtraderError> {
        u64::try_from(self.days)
            .ok()
            .and_then(|days| as_of.checked_sub_days(Days::new(days)))
            .ok_or_else(|| {
                MomtraderError::invalid(
                    "trading",
                    "lookback_days",
                    format!("{} days before {} is out of range", self.days, as_of),
                )
            })
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Lookback::days(DEFAULT_LOOKBACK_DAYS)
    }
}

/// `last / first - 1`, or `None` when the series is too short or the
/// result is not finite.
pub fn momentum_score(series: &PriceSeries) -> Option<f64> {
    if series.len() < MIN_OBSERVATIONS {
        return None;
    }
    let first = series.first().close;
    let last = series.last().close;
    if first <= 0.0 {
        return None;
    }
    let score = last / first - 1.0;
    score.is_finite().then_some(score)
}

/// Stable descending sort by score, truncated to `top_k`. Ties keep input order.
pub fn rank_signals(mut signals: Vec<MomentumSignal>, top_k: usize) -> RankedSignalSet {
    signals.retain(|s| s.score.is_finite());
    signals.sort_by(|a, b| b.score.total_cmp(&a.score));
    signals.truncate(top_k);
    RankedSignalSet { signals }
}

pub fn compute_signals(
    prices: &dyn PriceHistoryPort,
    universe: &Universe,
    as_of: NaiveDate,
    lookback: Lookback,
    top_k: usize,
) -> Result<RankedSignalSet, MomtraderError> {
    let start_date = lookback.start_date(as_of)?;
    let history = prices.fetch_history(&universe.codes, start_date, as_of)?;

    let mut scored = Vec::with_capacity(universe.count());
    for code in &universe.codes {
        let Some(series) = history.get(code) else {
            warn!(code = %code, "no price history returned, excluding");
            continue;
        };
        match momentum_score(series) {
            Some(score) => {
                debug!(code = %code, score, bars = series.len(), "momentum scored");
                scored.push(MomentumSignal {
                    code: code.clone(),
                    score,
                });
            }
            None => warn!(
                code = %code,
                bars = series.len(),
                "series unusable for momentum (too short or non-finite return), excluding"
            ),
        }
    }

    let ranked = rank_signals(scored, top_k);
    if ranked.is_empty() {
        return Err(MomtraderError::NoData {
            reason: format!(
                "none of {} codes produced a valid momentum score",
                universe.count()
            ),
        });
    }
    Ok(ranked)
}
