//! AWS RDS provider
//!
//! [`RdsClient`] implements [`crate::RdsApi`] on top of `aws-sdk-rds`.

mod client;
pub mod error;

pub use client::RdsClient;
pub use error::{classify_code, classify_sdk_error};
