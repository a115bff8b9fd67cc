//! Lead intake, credit scoring, and loan-offer marketplace primitives.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
