//! Order submission against the order sink.
//!
//! Each intent is submitted on its own. A rejected intent is logged and
//! recorded but never retried, and it does not stop the remaining intents.

use tracing::{info, warn};

use crate::domain::allocation::{OrderIntent, Side};
use crate::ports::order_port::OrderSink;

pub const PAPER_BUYING_POWER: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    pub account_type: String,
    pub buying_power: f64,
    pub commission: f64,
}

impl AccountInfo {
    pub fn paper(buying_power: f64) -> Self {
        AccountInfo {
            account_type: "paper_trading".to_string(),
            buying_power,
            commission: 0.0,
        }
    }
}

/// Deterministic id for a confirmed order: `PAPER_<CODE>_<SIDE>_<QTY>`.
pub fn confirmation_id(code: &str, side: Side, quantity: u64) -> String {
    format!("PAPER_{}_{}_{}", code, side, quantity)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionEntry {
    pub order: OrderIntent,
    pub confirmation_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOrder {
    pub order: OrderIntent,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionReport {
    pub entries: Vec<ExecutionEntry>,
    pub rejected: Vec<RejectedOrder>,
}

impl ExecutionReport {
    pub fn confirmed_count(&self) -> usize {
        self.entries.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn total_notional(&self) -> f64 {
        self.entries.iter().map(|e| e.order.notional()).sum()
    }
}

pub fn submit(sink: &dyn OrderSink, orders: Vec<OrderIntent>) -> ExecutionReport {
    let mut report = ExecutionReport::default();

    for order in orders {
        match sink.place_order(&order) {
            Ok(confirmation_id) => {
                info!(
                    code = %order.code,
                    side = %order.side,
                    quantity = order.quantity,
                    confirmation = %confirmation_id,
                    "order confirmed"
                );
                report.entries.push(ExecutionEntry {
                    order,
                    confirmation_id,
                });
            }
            Err(e) => {
                warn!(
                    code = %order.code,
                    side = %order.side,
                    quantity = order.quantity,
                    error = %e,
                    "order rejected"
                );
                report.rejected.push(RejectedOrder {
                    order,
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::MomtraderError;
    use std::cell::RefCell;

    struct Recording {
        fail_on: Option<String>,
        seen: RefCell<Vec<String>>,
    }

    impl OrderSink for Recording {
        fn place_order(&self, order: &OrderIntent) -> Result<String, MomtraderError> {
            self.seen.borrow_mut().push(order.code.clone());
            if self.fail_on.as_deref() == Some(order.code.as_str()) {
                return Err(MomtraderError::collaborator("order sink", "invalid symbol"));
            }
            Ok(confirmation_id(&order.code, order.side, order.quantity))
        }

        fn account_info(&self) -> AccountInfo {
            AccountInfo::paper(PAPER_BUYING_POWER)
        }
    }

    fn buy(code: &str, quantity: u64) -> OrderIntent {
        OrderIntent {
            code: code.into(),
            side: Side::Buy,
            quantity,
            reference_price: 100.0,
            momentum_score: 0.1,
        }
    }

    #[test]
    fn confirmation_id_format() {
        assert_eq!(confirmation_id("AAPL", Side::Buy, 26), "PAPER_AAPL_BUY_26");
        assert_eq!(confirmation_id("MSFT", Side::Sell, 3), "PAPER_MSFT_SELL_3");
    }

    #[test]
    fn all_orders_confirmed() {
        let sink = Recording {
            fail_on: None,
            seen: RefCell::new(Vec::new()),
        };
        let report = submit(&sink, vec![buy("A", 10), buy("B", 5)]);
        assert_eq!(report.confirmed_count(), 2);
        assert_eq!(report.rejected_count(), 0);
        assert_eq!(report.entries[0].confirmation_id, "PAPER_A_BUY_10");
        assert!((report.total_notional() - 1_500.0).abs() < 1e-9);
    }

    #[test]
    fn failure_does_not_abort_remaining() {
        let sink = Recording {
            fail_on: Some("A".into()),
            seen: RefCell::new(Vec::new()),
        };
        let report = submit(&sink, vec![buy("A", 10), buy("B", 5)]);
        assert_eq!(*sink.seen.borrow(), vec!["A", "B"]);
        assert_eq!(report.confirmed_count(), 1);
        assert_eq!(report.entries[0].order.code, "B");
        assert_eq!(report.rejected[0].order.code, "A");
        assert!(report.rejected[0].reason.contains("invalid symbol"));
    }

    #[test]
    fn empty_submission() {
        let sink = Recording {
            fail_on: None,
            seen: RefCell::new(Vec::new()),
        };
        let report = submit(&sink, Vec::new());
        assert_eq!(report, ExecutionReport::default());
    }

    #[test]
    fn paper_account_defaults() {
        let info = AccountInfo::paper(PAPER_BUYING_POWER);
        assert_eq!(info.account_type, "paper_trading");
        assert_eq!(info.commission, 0.0);
    }
}
