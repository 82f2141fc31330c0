//! cli::args
//!
//! Command-line argument definitions using clap derive.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How the resolved credential is printed.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Raw token on stdout
    Token,
    /// Structured JSON credentials bundle
    Json,
    /// Shell export statement
    Env,
    /// Authenticated git clone command
    Clone,
}

/// ghcred - GitHub App credential helper for CI pipelines
#[derive(Parser, Debug)]
#[command(name = "ghcred")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Repository owner (user or org)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Token)]
    pub output_format: OutputFormat,

    /// GitHub App ID (overrides GITHUB_APP_ID)
    #[arg(long)]
    pub app_id: Option<String>,

    /// Path to the app's PEM private key (overrides GITHUB_APP_PRIVATE_KEY_PATH)
    #[arg(long)]
    pub private_key_path: Option<PathBuf>,

    /// Installation ID, skipping per-repository lookup (overrides GITHUB_APP_INSTALLATION_ID)
    #[arg(long)]
    pub installation_id: Option<String>,

    /// Enable verbose diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn positionals_and_default_format() {
        let cli = Cli::try_parse_from(["ghcred", "octocat", "hello-world"]).expect("parse");
        assert_eq!(cli.owner, "octocat");
        assert_eq!(cli.repo, "hello-world");
        assert_eq!(cli.output_format, OutputFormat::Token);
        assert!(!cli.verbose);
    }

    #[test]
    fn output_format_values() {
        for (flag, expected) in [
            ("token", OutputFormat::Token),
            ("json", OutputFormat::Json),
            ("env", OutputFormat::Env),
            ("clone", OutputFormat::Clone),
        ] {
            let cli = Cli::try_parse_from(["ghcred", "o", "r", "--output-format", flag])
                .expect("parse");
            assert_eq!(cli.output_format, expected);
        }
    }

    #[test]
    fn config_override_flags() {
        let cli = Cli::try_parse_from([
            "ghcred",
            "o",
            "r",
            "--app-id",
            "42",
            "--private-key-path",
            "/keys/app.pem",
            "--installation-id",
            "7",
        ])
        .expect("parse");

        assert_eq!(cli.app_id.as_deref(), Some("42"));
        assert_eq!(cli.private_key_path, Some(PathBuf::from("/keys/app.pem")));
        assert_eq!(cli.installation_id.as_deref(), Some("7"));
    }

    #[test]
    fn missing_repo_is_a_parse_error() {
        assert!(Cli::try_parse_from(["ghcred", "octocat"]).is_err());
    }
}
