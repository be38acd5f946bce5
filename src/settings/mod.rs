//! Layered configuration: a TOML file plus `TOKENKEEPER__*` environment
//! overrides. See `bin/settings_demo.rs` for a binary that prints the result.

mod cli;
pub use clap::{Parser, Subcommand};
pub use cli::*;

mod settings;
pub use settings::*;
