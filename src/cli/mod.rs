//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse arguments and config-override flags
//! - Delegate to the credential broker
//! - Translate errors into a non-zero exit with the message on stderr
//!
//! The CLI layer is thin: all credential logic lives in [`crate::auth`].

pub mod args;
pub mod commands;

pub use args::{Cli, OutputFormat};

use anyhow::Result;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    commands::dispatch(cli).await
}
