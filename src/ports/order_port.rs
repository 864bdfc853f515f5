//! Order sink port (paper-trading endpoint).

use crate::domain::allocation::OrderIntent;
use crate::domain::error::MomtraderError;
use crate::domain::execution::AccountInfo;

pub trait OrderSink {
    /// Place one order and return the sink's confirmation id.
    fn place_order(&self, order: &OrderIntent) -> Result<String, MomtraderError>;

    /// Current execution price estimate for `code`, if the sink can quote it.
    fn reference_price(&self, _code: &str) -> Option<f64> {
        None
    }

    fn account_info(&self) -> AccountInfo;
}
