//! Delinquency Report - credit-card delinquency by months since origination
//!
//! Loads a five-column CSV extract, splits it into a client sample and a
//! delinquency table, aggregates clients on default per month since
//! origination and renders static charts of the result.

pub mod analysis;
pub mod app;
pub mod charts;
pub mod cli;
pub mod data;
pub mod report;
pub mod settings;
pub mod stats;

pub use analysis::Analysis;
pub use data::DataError;
