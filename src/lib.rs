//! Passive screen-time tracking: samples the foreground window once a second, splits the samples
//! into usage sessions, categorizes them and keeps today's totals in memory.
//!

pub mod categorizer;
pub mod cli;
pub mod config;
pub mod tracker;
pub mod utils;
pub mod window_api;
