//! Core domain types and logic.

pub mod price;
pub mod universe;
pub mod signal;
pub mod schedule;
pub mod allocation;
pub mod execution;
pub mod cycle;
pub mod config_validation;
pub mod error;
