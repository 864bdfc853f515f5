//! Port traits the domain depends on.

pub mod config_port;
pub mod price_port;
pub mod order_port;
pub mod activity_log_port;
