//! Core business logic modules.

pub mod categorizer;
pub mod converter;
pub mod defaults;
pub mod engine;
pub mod planner;
pub mod processor;
pub mod prompter;
pub mod sanitizer;
pub mod undo_log;
