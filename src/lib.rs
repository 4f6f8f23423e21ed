//! Quarterly ABS issuance statistics: fetch the chart feed, pivot it into a
//! year × quarter table, write it out and chart it.

pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod sink;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use pipeline::{run, run_with_config, RunOutput};
