//! Templatize Library
//!
//! Turns a project into a reusable template while recording an undo log,
//! and restores the original project from that log.

pub mod cli;
pub mod core;
pub mod error;
pub mod models;
pub mod utils;

pub use error::{Error, Result};
