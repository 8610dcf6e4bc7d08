use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use warden_common::{ClaimValue, Claims};
use warden_lib::{config::Settings, AuthService, Clock, Credential, SystemClock, Warden};

#[derive(Parser)]
#[command(name = "warden", version, about = "Issue and verify warden credentials")]
struct Cli {
    /// Config file (defaults to ./warden.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign a token for a subject
    Issue {
        #[arg(long)]
        sub: String,
        /// Lifetime in seconds (defaults to token.default_ttl_secs)
        #[arg(long)]
        ttl: Option<u64>,
        /// Signing key id (defaults to keys.active)
        #[arg(long)]
        kid: Option<String>,
        /// Extra claim, `name=value`; integers are stored as integers
        #[arg(long = "claim", value_parser = parse_claim)]
        claims: Vec<(String, ClaimValue)>,
    },
    /// Verify a token and print its principal
    Verify { token: String },
    /// Load and validate the configuration
    CheckConfig,
}

fn parse_claim(raw: &str) -> Result<(String, ClaimValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    if name.is_empty() {
        return Err("claim name must not be empty".to_string());
    }
    let value = value
        .parse::<i64>()
        .map(ClaimValue::Int)
        .unwrap_or_else(|_| ClaimValue::Str(value.to_string()));
    Ok((name.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let warden = Warden::in_memory(settings)?;
    match cli.command {
        Command::Issue { sub, ttl, kid, claims } => issue(&warden, sub, ttl, kid, claims),
        Command::Verify { token } => verify(&warden, &token).await,
        Command::CheckConfig => check_config(&warden),
    }
}

fn issue(
    warden: &Warden,
    sub: String,
    ttl: Option<u64>,
    kid: Option<String>,
    extra: Vec<(String, ClaimValue)>,
) -> Result<()> {
    let kid = kid
        .or_else(|| warden.active_kid())
        .ok_or_else(|| anyhow!("no signing key configured; add one under [keys.secrets]"))?;
    let ttl = ttl.unwrap_or(warden.settings.token.default_ttl_secs);
    let now = SystemClock.unix_seconds();
    let exp = i64::try_from(ttl)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .context("ttl out of range")?;

    let mut claims = Claims::new(sub, exp);
    for (name, value) in extra {
        claims.insert(name, value);
    }

    let token = warden.auth.issue_token(claims, &kid)?;
    info!(kid = %kid, exp, "token issued");
    println!("{token}");
    Ok(())
}

async fn verify(warden: &Warden, token: &str) -> Result<()> {
    match warden.auth.authenticate(Credential::new(token)).await {
        Ok(principal) => {
            println!("{}", serde_json::to_string_pretty(&principal)?);
            Ok(())
        },
        Err(err) => bail!("{} ({})", err.sanitized_message(), err.error_code()),
    }
}

fn check_config(warden: &Warden) -> Result<()> {
    let summary = serde_json::json!({
        "log_level": warden.settings.log_level,
        "token": warden.settings.token,
        "session": warden.settings.session,
        "keys": {
            "active": warden.active_kid(),
            "kids": warden.keys.kids(),
        },
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
