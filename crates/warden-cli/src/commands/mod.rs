//! CLI command definitions and dispatch.

pub mod check;
pub mod policy;
pub mod role;
pub mod validate;

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::debug;

use warden_core::AppResult;
use warden_core::config::AppConfig;
use warden_policy::Enforcer;

use crate::output::OutputFormat;

/// Warden: offline administration of the RBAC policy files
#[derive(Debug, Parser)]
#[command(name = "warden-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Policy model file (overrides `rbac.model_path`)
    #[arg(long)]
    pub model: Option<String>,

    /// Policy file (overrides `rbac.policy_path`)
    #[arg(long)]
    pub policy: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Evaluate a request against the policy
    Check(check::CheckArgs),
    /// Policy rule management
    Policy(policy::PolicyArgs),
    /// Role assignment management
    Role(role::RoleArgs),
    /// Load the model and policy files and report what they contain
    Validate,
}

impl Cli {
    /// Execute the CLI command. Returns `false` when a check is denied.
    pub async fn execute(&self) -> AppResult<bool> {
        let (model_path, policy_path) = self.policy_files()?;
        let enforcer = Enforcer::from_files(&model_path, &policy_path).await?;

        match &self.command {
            Commands::Check(args) => Ok(check::execute(args, &enforcer, self.format)),
            Commands::Policy(args) => policy::execute(args, &enforcer, self.format).await,
            Commands::Role(args) => role::execute(args, &enforcer, self.format).await,
            Commands::Validate => Ok(validate::execute(&enforcer, self.format)),
        }
    }

    /// Model and policy paths from the flags, falling back to the config file.
    fn policy_files(&self) -> AppResult<(String, String)> {
        if let (Some(model), Some(policy)) = (&self.model, &self.policy) {
            return Ok((model.clone(), policy.clone()));
        }
        let config = if Path::new(&self.config).exists() {
            AppConfig::load_file(&self.config)?
        } else {
            debug!(path = %self.config, "Config file not found, using defaults");
            AppConfig::default()
        };
        Ok((
            self.model.clone().unwrap_or(config.rbac.model_path),
            self.policy.clone().unwrap_or(config.rbac.policy_path),
        ))
    }
}
