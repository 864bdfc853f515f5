//! Simulated paper-trading order sink.
//!
//! Accepts every well-formed order and confirms it with the deterministic
//! [`confirmation_id`]. Nothing is filled, charged or persisted.

use crate::domain::allocation::OrderIntent;
use crate::domain::error::MomtraderError;
use crate::domain::execution::{confirmation_id, AccountInfo, PAPER_BUYING_POWER};
use crate::ports::config_port::ConfigPort;
use crate::ports::order_port::OrderSink;
use std::collections::HashMap;
use tracing::info;

const COMPONENT: &str = "order sink";

pub struct PaperTradingAdapter {
    buying_power: f64,
    quotes: HashMap<String, f64>,
}

impl PaperTradingAdapter {
    pub fn new(buying_power: f64) -> Self {
        Self {
            buying_power,
            quotes: HashMap::new(),
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        Self::new(config.get_double("paper", "buying_power", PAPER_BUYING_POWER))
    }

    /// Quote `code` at `price` for reference-price lookups.
    pub fn with_quote(mut self, code: &str, price: f64) -> Self {
        self.quotes.insert(code.to_uppercase(), price);
        self
    }
}

impl Default for PaperTradingAdapter {
    fn default() -> Self {
        Self::new(PAPER_BUYING_POWER)
    }
}

impl OrderSink for PaperTradingAdapter {
    fn place_order(&self, order: &OrderIntent) -> Result<String, MomtraderError> {
        if order.code.trim().is_empty() {
            return Err(MomtraderError::collaborator(COMPONENT, "invalid symbol: empty code"));
        }
        if order.quantity == 0 {
            return Err(MomtraderError::collaborator(
                COMPONENT,
                format!("invalid quantity 0 for {}", order.code),
            ));
        }

        let id = confirmation_id(&order.code, order.side, order.quantity);
        info!(
            code = %order.code,
            side = %order.side,
            quantity = order.quantity,
            price = order.reference_price,
            value = order.notional(),
            confirmation = %id,
            "paper trade executed"
        );
        Ok(id)
    }

    fn reference_price(&self, code: &str) -> Option<f64> {
        self.quotes.get(code).copied()
    }

    fn account_info(&self) -> AccountInfo {
        AccountInfo::paper(self.buying_power)
    }
}
