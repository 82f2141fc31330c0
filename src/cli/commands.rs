//! cli::commands
//!
//! Command execution: resolve a credential and print it in the requested
//! format.
//!
//! # Security
//!
//! The token is written to stdout only - that is the command's purpose - and
//! never to stderr or verbose diagnostics.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};

use super::args::{Cli, OutputFormat};
use crate::auth::CredentialBroker;
use crate::config::{Config, ConfigOverrides};

/// Execute the resolved command line.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::resolve(&ConfigOverrides {
        app_id: cli.app_id.clone(),
        private_key_path: cli.private_key_path.clone(),
        installation_id: cli.installation_id.clone(),
    })
    .context("invalid configuration")?;

    if cli.verbose {
        eprintln!(
            "ghcred: app {} key {}",
            config.app_id,
            config.private_key_path.display()
        );
    }

    let broker =
        Arc::new(CredentialBroker::from_config(&config).context("failed to initialize app auth")?);

    match cli.output_format {
        OutputFormat::Token => {
            let token = require_credential(&broker, &cli.owner, &cli.repo).await?;
            println!("{}", token);
        }
        OutputFormat::Env => {
            let token = require_credential(&broker, &cli.owner, &cli.repo).await?;
            println!("export GITHUB_TOKEN=\"{}\"", token);
        }
        OutputFormat::Json => {
            let bundle = broker
                .credentials_bundle(&cli.owner, &cli.repo)
                .await?
                .with_context(|| no_installation_message(&cli.owner, &cli.repo))?;
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }
        OutputFormat::Clone => {
            let command = broker
                .clone_command(&cli.owner, &cli.repo)
                .await?
                .with_context(|| no_installation_message(&cli.owner, &cli.repo))?;
            println!("{}", command);
        }
    }

    Ok(())
}

/// Get a token for the repository or fail with the standard message.
async fn require_credential(
    broker: &CredentialBroker,
    owner: &str,
    repo: &str,
) -> Result<String> {
    match broker.credential_for(owner, repo).await? {
        Some(token) => Ok(token),
        None => bail!("{}", no_installation_message(owner, repo)),
    }
}

fn no_installation_message(owner: &str, repo: &str) -> String {
    format!("no app installation found for {}/{}", owner, repo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_installation_message_names_the_repo() {
        let msg = no_installation_message("octocat", "hello-world");
        assert_eq!(msg, "no app installation found for octocat/hello-world");
    }
}
