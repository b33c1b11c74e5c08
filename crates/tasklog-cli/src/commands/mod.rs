//! CLI subcommand handlers.

pub(crate) mod config;
pub(crate) mod demo;
