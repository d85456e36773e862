//! Command line and environment configuration.
//!
//! Every setting can come from a flag or from the environment; `.env` is
//! loaded before parsing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use sitesmith_core::gateway::groq::DEFAULT_BASE_URL;
use sitesmith_core::gateway::{GroqConfig, RetryPolicy};
use sitesmith_core::models::DEFAULT_MODEL;
use sitesmith_core::skills::Template;
use sitesmith_core::swarm::CoordinatorConfig;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Sitesmith - multi-stage website generation service")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    #[command(flatten)]
    pub settings: Settings,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CliCommand {
    /// Start the HTTP server (default)
    Serve,
    /// Generate a website locally and write the files to disk (no server)
    Run {
        /// What to build
        #[arg(short, long)]
        prompt: String,
        /// Project template
        #[arg(short, long, default_value = "vite-react")]
        template: Template,
        /// Skip quality review and fixes
        #[arg(long)]
        no_qa: bool,
        /// Directory the generated files are written to
        #[arg(short, long, default_value = "generated")]
        out: PathBuf,
    },
}

#[derive(clap::Args, Clone, Debug)]
pub struct Settings {
    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, global = true)]
    pub groq_api_key: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000, global = true)]
    pub port: u16,

    /// Allowed CORS origin
    #[arg(long, env = "FRONTEND_URL", global = true)]
    pub frontend_url: Option<String>,

    /// Environment name (development, production, ...)
    #[arg(long, env = "APP_ENV", default_value = "development", global = true)]
    pub environment: String,

    #[arg(long, env = "GROQ_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    #[arg(long, env = "GROQ_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Attempts per model call, including the first
    #[arg(long, env = "LLM_MAX_ATTEMPTS", default_value_t = 3, global = true)]
    pub max_attempts: u32,

    #[arg(long, env = "LLM_REQUEST_TIMEOUT_SECS", default_value_t = 90, global = true)]
    pub request_timeout_secs: u64,

    /// Concurrent file generations in website runs
    #[arg(long, env = "FILE_CONCURRENCY", default_value_t = 1, global = true)]
    pub file_concurrency: usize,

    #[arg(long, env = "COMPONENT_TIMEOUT_SECS", default_value_t = 60, global = true)]
    pub component_timeout_secs: u64,

    #[arg(long, env = "WEBSITE_TIMEOUT_SECS", default_value_t = 120, global = true)]
    pub website_timeout_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

impl Settings {
    /// The API key; startup fails without one.
    pub fn api_key(&self) -> Result<&str> {
        match self.groq_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => bail!("Missing required environment variables: GROQ_API_KEY"),
        }
    }

    /// API key safe to log.
    pub fn masked_api_key(&self) -> String {
        match self.api_key() {
            Ok(key) if key.chars().count() > 8 => {
                let prefix: String = key.chars().take(4).collect();
                format!("{prefix}***")
            }
            Ok(_) => "***configured***".to_string(),
            Err(_) => "missing".to_string(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn groq_config(&self) -> Result<GroqConfig> {
        let mut config = GroqConfig::new(self.api_key()?);
        config.base_url = self.base_url.clone();
        config.request_timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.max_attempts)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            model: self.model.clone(),
            file_concurrency: self.file_concurrency.max(1),
            component_timeout_secs: self.component_timeout_secs,
            website_timeout_secs: self.website_timeout_secs,
            ..CoordinatorConfig::default()
        }
    }
}
