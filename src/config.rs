// Configuration: persisted CLI settings and credential resolution.
// The token and account slug are each resolved independently with the
// precedence (highest to lowest):
// 1. Explicit value (command-line flag or constructor argument)
// 2. Environment variable (`FIZZY_API_TOKEN`, `FIZZY_ACCOUNT_SLUG`)
// 3. Config file (`<config dir>/fizzy-cli/config.json`)
// Empty strings are treated as unset at every level.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{FizzyError, FizzyResult};

pub const TOKEN_ENV: &str = "FIZZY_API_TOKEN";
pub const ACCOUNT_ENV: &str = "FIZZY_ACCOUNT_SLUG";

const CONFIG_DIR_NAME: &str = "fizzy-cli";
const CONFIG_FILE_NAME: &str = "config.json";

/// Values stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        default,
        rename = "accountSlug",
        skip_serializing_if = "Option::is_none"
    )]
    pub account_slug: Option<String>,
}

/// JSON file holding the persisted token and account slug.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at the platform config location, falling back to the
    /// current directory when the platform has none.
    pub fn default_location() -> Self {
        let dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::at(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored values. A missing file is an empty config.
    pub fn load(&self) -> FizzyResult<StoredConfig> {
        if !self.path.exists() {
            debug!("No config file at {}", self.path.display());
            return Ok(StoredConfig::default());
        }

        debug!("Loading config from: {}", self.path.display());
        let content = std::fs::read_to_string(&self.path)?;
        // An empty file counts as no config
        if content.trim().is_empty() {
            return Ok(StoredConfig::default());
        }
        serde_json::from_str(&content).map_err(|e| {
            FizzyError::ConfigFile(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    pub fn save(&self, config: &StoredConfig) -> FizzyResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config).map_err(FizzyError::Serialization)?;
        std::fs::write(&self.path, content)?;
        debug!("Saved config to: {}", self.path.display());
        Ok(())
    }

    pub fn set_token(&self, token: &str) -> FizzyResult<()> {
        let mut config = self.load()?;
        config.token = Some(token.to_string());
        self.save(&config)
    }

    pub fn set_account_slug(&self, slug: &str) -> FizzyResult<()> {
        let mut config = self.load()?;
        config.account_slug = Some(slug.to_string());
        self.save(&config)
    }

    /// Remove all stored values.
    pub fn clear(&self) -> FizzyResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Explicit,
    Environment(&'static str),
    ConfigFile,
    Unset,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Explicit => write!(f, "command line"),
            Source::Environment(name) => write!(f, "{} env", name),
            Source::ConfigFile => write!(f, "config file"),
            Source::Unset => write!(f, "-"),
        }
    }
}

/// A single resolved value and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub value: Option<String>,
    pub source: Source,
}

impl Setting {
    fn resolve(
        explicit: Option<String>,
        env_name: &'static str,
        env: &impl Fn(&str) -> Option<String>,
        stored: Option<&String>,
    ) -> Self {
        if let Some(value) = explicit.filter(|v| !v.is_empty()) {
            return Self {
                value: Some(value),
                source: Source::Explicit,
            };
        }
        if let Some(value) = env(env_name).filter(|v| !v.is_empty()) {
            return Self {
                value: Some(value),
                source: Source::Environment(env_name),
            };
        }
        if let Some(value) = stored.filter(|v| !v.is_empty()) {
            return Self {
                value: Some(value.clone()),
                source: Source::ConfigFile,
            };
        }
        Self {
            value: None,
            source: Source::Unset,
        }
    }
}

/// Credentials resolved once per invocation.
///
/// Construction never fails on missing values; the `require_*` guards are
/// what every operation calls before it touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub token: Setting,
    pub account_slug: Setting,
}

impl ResolvedConfig {
    /// Build from explicit values only, ignoring environment and file.
    pub fn explicit(token: Option<String>, account_slug: Option<String>) -> Self {
        let no_env = |_: &str| None;
        Self::resolve(token, account_slug, no_env, &StoredConfig::default())
    }

    /// Resolve against the process environment and the given store.
    pub fn load(
        token: Option<String>,
        account_slug: Option<String>,
        store: &ConfigStore,
    ) -> FizzyResult<Self> {
        let stored = store.load()?;
        let resolved = Self::resolve(token, account_slug, |name| std::env::var(name).ok(), &stored);
        debug!(
            token_source = %resolved.token.source,
            account_source = %resolved.account_slug.source,
            "Resolved credentials"
        );
        Ok(resolved)
    }

    pub fn resolve(
        token: Option<String>,
        account_slug: Option<String>,
        env: impl Fn(&str) -> Option<String>,
        stored: &StoredConfig,
    ) -> Self {
        Self {
            token: Setting::resolve(token, TOKEN_ENV, &env, stored.token.as_ref()),
            account_slug: Setting::resolve(
                account_slug,
                ACCOUNT_ENV,
                &env,
                stored.account_slug.as_ref(),
            ),
        }
    }

    pub fn require_token(&self) -> FizzyResult<&str> {
        self.token.value.as_deref().ok_or_else(|| {
            FizzyError::configuration(
                "No API token configured. Run: fizzy config set-token <token>",
            )
        })
    }

    pub fn require_account(&self) -> FizzyResult<&str> {
        self.account_slug.value.as_deref().ok_or_else(|| {
            FizzyError::configuration(
                "No account configured. Run: fizzy config set-account <account-slug>",
            )
        })
    }
}

/// Mask a token for display, keeping only its last four characters.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("***{}", tail)
}
