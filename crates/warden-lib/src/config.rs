// ============================
// crates/warden-lib/src/config.rs
// ============================
//! Configuration management.
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "warden.toml";

/// Environment variable prefix; nested keys use `__`, e.g. `WARDEN_TOKEN__CLOCK_SKEW_SECS`
pub const ENV_PREFIX: &str = "WARDEN_";

/// Longest TTL accepted anywhere (10 years)
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level
    pub log_level: String,
    /// Stateless token policy
    pub token: TokenSettings,
    /// Server-side session policy
    pub session: SessionSettings,
    /// Signing keys
    pub keys: KeySettings,
}

/// Token verification policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Tolerated clock difference between issuer and verifier
    pub clock_skew_secs: u64,
    /// Lifetime applied by callers that do not pick one
    pub default_ttl_secs: u64,
    /// Longest token accepted for verification
    pub max_token_bytes: usize,
}

/// Session lifecycle policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Hard ceiling on a session's life
    pub absolute_ttl_secs: u64,
    /// Extension applied on each validated access
    pub sliding_ttl_secs: u64,
    /// Idle period after which the sweep removes a session
    pub max_idle_secs: u64,
    /// Deadline for a single persistence adapter call
    pub adapter_timeout_ms: u64,
    /// Number of per-key lock stripes
    pub lock_stripes: usize,
}

/// Provisioned signing keys
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySettings {
    /// Key id used for new tokens
    pub active: Option<String>,
    /// Key id to unpadded base64url secret. Never serialized back out.
    #[serde(skip_serializing)]
    pub secrets: BTreeMap<String, String>,
}

impl KeySettings {
    /// Wipe the encoded secrets once they have been loaded into a key ring
    pub fn clear_secrets(&mut self) {
        for secret in self.secrets.values_mut() {
            secret.zeroize();
        }
        self.secrets.clear();
    }
}

impl fmt::Debug for KeySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySettings")
            .field("active", &self.active)
            .field("kids", &self.secrets.keys().collect::<Vec<_>>())
            .field("secrets", &"**redacted**")
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            token: TokenSettings::default(),
            session: SessionSettings::default(),
            keys: KeySettings::default(),
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            clock_skew_secs: 60,
            default_ttl_secs: 15 * 60,
            max_token_bytes: 8 * 1024,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            absolute_ttl_secs: 60 * 60 * 24, // 1 day
            sliding_ttl_secs: 30 * 60,
            max_idle_secs: 30 * 60,
            adapter_timeout_ms: 2_000,
            lock_stripes: 64,
        }
    }
}

impl TokenSettings {
    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.clock_skew_secs)
    }
}

impl SessionSettings {
    pub fn absolute_ttl(&self) -> chrono::Duration {
        secs(self.absolute_ttl_secs)
    }

    pub fn sliding_ttl(&self) -> chrono::Duration {
        secs(self.sliding_ttl_secs)
    }

    pub fn max_idle(&self) -> chrono::Duration {
        secs(self.max_idle_secs)
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }
}

fn secs(value: u64) -> chrono::Duration {
    chrono::Duration::seconds(value.min(MAX_TTL_SECS) as i64)
}

impl Settings {
    /// Defaults, then `warden.toml`, then `WARDEN_*` environment variables
    pub fn load() -> Result<Self> {
        Self::figment(Toml::file(DEFAULT_CONFIG_FILE))
    }

    /// Defaults, then the given TOML file, then `WARDEN_*` environment variables
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        Self::figment(Toml::file(path))
    }

    fn figment(file: figment::providers::Data<Toml>) -> Result<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("invalid log level `{}`", self.log_level);
        }

        let token = &self.token;
        if token.default_ttl_secs == 0 {
            bail!("token.default_ttl_secs must be positive");
        }
        if token.max_token_bytes == 0 {
            bail!("token.max_token_bytes must be positive");
        }

        let session = &self.session;
        if session.absolute_ttl_secs == 0 || session.sliding_ttl_secs == 0 || session.max_idle_secs == 0 {
            bail!("session TTLs must be positive");
        }
        if session.absolute_ttl_secs > MAX_TTL_SECS || token.default_ttl_secs > MAX_TTL_SECS {
            bail!("TTLs must not exceed {MAX_TTL_SECS} seconds");
        }
        if session.sliding_ttl_secs > session.max_idle_secs {
            bail!("session.sliding_ttl_secs must not exceed session.max_idle_secs");
        }
        if session.max_idle_secs > session.absolute_ttl_secs {
            bail!("session.max_idle_secs must not exceed session.absolute_ttl_secs");
        }
        if session.adapter_timeout_ms == 0 {
            bail!("session.adapter_timeout_ms must be positive");
        }
        if session.lock_stripes == 0 {
            bail!("session.lock_stripes must be positive");
        }

        if let Some(active) = &self.keys.active {
            if !self.keys.secrets.contains_key(active) {
                bail!("active key `{active}` has no configured secret");
            }
        }

        Ok(())
    }
}
