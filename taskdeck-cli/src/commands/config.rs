//! `taskdeck config show` and `taskdeck config set`

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use taskdeck_core::config::{self, Config, ENV_API_KEY, ENV_BACKEND_URL};

use super::home;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective settings (file plus environment overrides).
    Show,

    /// Update settings in `~/.taskdeck/config.yaml`.
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Backend base URL, e.g. https://project.supabase.co
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Public API key sent with every request.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Seconds between scheduled background syncs.
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,
}

pub fn run(cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(),
        ConfigCommand::Set(args) => set(args),
    }
}

fn show() -> Result<()> {
    let home = home()?;
    let config = config::load_at(&home).context("failed to load configuration")?;
    print_config(&config);
    println!(
        "{}",
        format!(
            "file: {} (env overrides: {ENV_BACKEND_URL}, {ENV_API_KEY})",
            config::config_path_at(&home).display()
        )
        .bright_black()
    );
    Ok(())
}

fn set(args: SetArgs) -> Result<()> {
    if args.backend_url.is_none() && args.api_key.is_none() && args.interval.is_none() {
        bail!("nothing to set; pass --backend-url, --api-key or --interval");
    }

    let home = home()?;
    let mut config = config::load_file_at(&home).context("failed to load configuration")?;
    if let Some(url) = args.backend_url {
        config.backend.base_url = url;
    }
    if let Some(key) = args.api_key {
        config.backend.api_key = key;
    }
    if let Some(secs) = args.interval {
        if secs == 0 {
            bail!("--interval must be at least 1 second");
        }
        config.sync.interval_secs = secs;
    }

    config::save_at(&home, &config).context("failed to save configuration")?;
    println!("✓ Saved {}", config::config_path_at(&home).display());
    Ok(())
}

fn print_config(config: &Config) {
    let unset = || "(unset)".yellow().to_string();
    let base_url = config
        .backend
        .base_url()
        .map(str::to_string)
        .unwrap_or_else(|_| unset());
    let api_key = config
        .backend
        .api_key()
        .map(mask)
        .unwrap_or_else(|_| unset());

    println!("{}", "backend".bold());
    row("base_url", base_url);
    row("api_key", api_key);
    println!("{}", "sync".bold());
    row("interval_secs", config.sync.interval_secs);
    row("call_timeout_secs", config.sync.call_timeout_secs);
    row("job_timeout_secs", config.sync.job_timeout_secs);
    row("max_retries", config.sync.max_retries);
    row("retry_base_delay_ms", config.sync.retry_base_delay_ms);
    row("retry_max_delay_secs", config.sync.retry_max_delay_secs);
}

fn row(key: &str, value: impl std::fmt::Display) {
    println!("  {:<22}{value}", format!("{key}:"));
}

/// Show only the last four characters of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
