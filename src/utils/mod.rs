//! Utility helpers shared across the service

pub mod atomic_file;
pub mod cron_helper;

pub use atomic_file::{StagedFile, write_atomic};
