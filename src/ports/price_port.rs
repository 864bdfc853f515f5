//! Price history source port.

use crate::domain::error::MomtraderError;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;
use std::collections::HashMap;

pub trait PriceHistoryPort {
    /// Fetch adjusted close series for `codes` between `start_date` and
    /// `end_date` inclusive, in one batched request.
    ///
    /// Codes with no data are omitted from the map rather than failing the
    /// whole request. An `Err` means the source itself is unusable.
    fn fetch_history(
        &self,
        codes: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HashMap<String, PriceSeries>, MomtraderError>;

    /// Cheap reachability check for health reporting.
    fn is_available(&self) -> bool {
        true
    }
}
