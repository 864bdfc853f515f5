//! momtrader: monthly momentum rebalancing with paper execution.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command surface in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
