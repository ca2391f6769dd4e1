//! Frontend helpers for the `a5200` inspection tool.

pub mod config;
pub mod report;
