use std::time::Duration;

use dex_rpc::{ClientError, Userpass};

use crate::cli::Cli;
use crate::node::activation::RetryPolicy;
use crate::node::session::NodeSettings;

/// Settings the shell runs with, resolved from flags, environment and
/// `.env`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dex_url: String,
    pub userpass: Userpass,
    pub retry: RetryPolicy,
    pub activation_commands_url: String,
    pub node_defaults: NodeSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--poll-attempts must be at least 1")]
    NoPollAttempts,
    #[error("failed to read userpass: {0}")]
    Prompt(#[from] std::io::Error),
    #[error(transparent)]
    Credential(#[from] ClientError),
}

impl AppConfig {
    /// `prompt` is only consulted when no userpass was supplied.
    pub fn resolve<F>(cli: &Cli, prompt: F) -> Result<Self, ConfigError>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        if cli.activation.poll_attempts == 0 {
            return Err(ConfigError::NoPollAttempts);
        }
        let secret = match cli.userpass.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => secret.to_owned(),
            _ => {
                tracing::warn!(
                    "MM2_USERPASS not set; add it to .env (see `dex-lightning configure`) to skip this prompt"
                );
                prompt()?
            }
        };
        let userpass = Userpass::new(secret)?;

        Ok(Self {
            dex_url: cli.dex_url.clone(),
            userpass,
            retry: RetryPolicy {
                max_attempts: cli.activation.poll_attempts,
                interval: Duration::from_millis(cli.activation.poll_interval_ms),
            },
            activation_commands_url: cli.activation.activation_commands_url.clone(),
            node_defaults: NodeSettings {
                payment_retries: cli.activation.payment_retries,
                ..NodeSettings::default()
            },
        })
    }
}
