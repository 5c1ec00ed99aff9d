//! File-system persistence.

pub mod config;
