//! Proactive Juniper Mist monitoring with day-over-day trend analysis

pub mod config;
pub mod cycle;
pub mod error;
pub mod history;
pub mod mist;
pub mod notify;
pub mod report;

pub use error::{Error, Result};
