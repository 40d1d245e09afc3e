//! Persistence layer for skill maps and 30-day skill programs.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
