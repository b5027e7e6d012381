#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod oracle;
pub mod passes;
pub mod pipeline;
pub mod tags;

pub use config::{Feature, FeatureFlags, OptimizerConfig};
pub use oracle::{DerivativeOracle, DerivativeStatus, OracleError};
pub use pipeline::{HtmlOptimizer, optimize};
