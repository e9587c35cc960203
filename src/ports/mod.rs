//! Port traits the domain is driven through.

pub mod config_port;
pub mod data_port;
pub mod decision_port;
pub mod report_port;
