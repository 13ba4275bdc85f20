//! Command handlers for the CLI

pub mod config;
pub mod record;
pub mod workspace;
