//! fargate-compare library
//!
//! Compares what ECS clusters cost on their EC2 container instances against
//! what the same running services would cost on Fargate, and writes the
//! comparison as an Excel workbook.

pub mod aws;
pub mod compare;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod gather;
pub mod pricing;
pub mod region;
pub mod report;
pub mod retry;
pub mod sizing;
pub mod summary;
pub mod usage;
pub mod xlsx;

// Re-export commonly used types
pub use config::RunSettings;
pub use error::{CompareError, ConfigError, Result};
pub use region::Region;
pub use sizing::{normalize, SizeTier};
