//! Data models and configuration.

pub mod config;
pub mod detection;
pub mod table;
