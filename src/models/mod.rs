//! Data models.

pub mod config;
pub mod conversion;
pub mod defaults;
pub mod restoration;
pub mod undo_log;
