//! Configuration for the ANW access-control stack.
//!
//! Configuration is a TOML file with three sections. Every field has a
//! default, so an absent file is a valid (production-pointing) config:
//!
//! ```toml
//! [store]
//! url = "https://aderrignw.ie/.netlify/functions/store"
//! init_ttl_secs = 600
//!
//! [identity]
//! url = "https://aderrignw.ie/.netlify/identity"
//! restore_timeout_ms = 1500
//!
//! [acl]
//! login_path = "login.html"
//! landing_path = "index.html"
//! unknown_feature = "show"
//! ```
//!
//! Resolution order for the file: explicit path, `ANW_CONFIG`, then
//! `<config_dir>/anw/config.toml`. Environment overrides are applied last.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ANW_CONFIG";

const DEFAULT_SITE: &str = "https://aderrignw.ie";

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnwConfig {
    /// Remote KV store and cache settings.
    pub store: StoreConfig,
    /// Identity provider settings.
    pub identity: IdentityConfig,
    /// Gating behaviour.
    pub acl: AclConfig,
}

/// `[store]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// URL of the serverless store function.
    pub url: String,
    /// Per-request timeout for store calls.
    pub request_timeout_secs: u64,
    /// Minimum interval between redundant initializer refreshes.
    pub init_ttl_secs: u64,
    /// KV key holding the user directory.
    pub users_key: String,
    /// KV key holding the ACL matrix.
    pub acl_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: format!("{DEFAULT_SITE}/.netlify/functions/store"),
            request_timeout_secs: 10,
            init_ttl_secs: 600,
            users_key: "anw_users".to_string(),
            acl_key: "anw_acl".to_string(),
        }
    }
}

impl StoreConfig {
    /// Initializer TTL as a `Duration`.
    pub fn init_ttl(&self) -> Duration {
        Duration::from_secs(self.init_ttl_secs)
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Keys pulled by a default initializer run.
    pub fn default_keys(&self) -> Vec<String> {
        vec![self.users_key.clone(), self.acl_key.clone()]
    }
}

/// `[identity]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// GoTrue endpoint of the identity provider.
    pub url: String,
    /// Access token of the operator, if any. Usually supplied via `ANW_TOKEN`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// How long to wait for session restoration before treating the user as anonymous.
    pub restore_timeout_ms: u64,
    /// Bootstrap address that always resolves to the owner role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_email: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: format!("{DEFAULT_SITE}/.netlify/identity"),
            token: None,
            restore_timeout_ms: 1500,
            master_email: None,
        }
    }
}

impl IdentityConfig {
    /// Restore timeout as a `Duration`.
    pub fn restore_timeout(&self) -> Duration {
        Duration::from_millis(self.restore_timeout_ms)
    }
}

/// What the feature gate does with a key the matrix does not mention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFeaturePolicy {
    /// Leave the element visible (fail-open).
    #[default]
    Show,
    /// Hide and disable the element.
    Hide,
}

/// `[acl]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// Where anonymous visitors are sent when a page denies them.
    pub login_path: String,
    /// Where signed-in but unauthorized visitors are sent.
    pub landing_path: String,
    /// Policy for feature keys absent from the matrix.
    pub unknown_feature: UnknownFeaturePolicy,
    /// Extra `href -> page key` routes for the navigation filter.
    pub routes: BTreeMap<String, String>,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            login_path: "login.html".to_string(),
            landing_path: "index.html".to_string(),
            unknown_feature: UnknownFeaturePolicy::Show,
            routes: BTreeMap::new(),
        }
    }
}

impl AnwConfig {
    /// Name used for the config directory and CLI hints.
    pub fn project_name() -> &'static str {
        "anw"
    }

    /// `<config_dir>/anw/config.toml`, if the platform has a config dir.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(Self::project_name()).join("config.toml"))
    }

    /// Resolve the config file path: explicit, then `ANW_CONFIG`, then default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = explicit {
            return Some(PathBuf::from(p));
        }
        if let Ok(p) = std::env::var(CONFIG_ENV)
            && !p.trim().is_empty()
        {
            return Some(PathBuf::from(p));
        }
        Self::default_config_path()
    }

    /// Load configuration and apply environment overrides.
    ///
    /// An explicitly named file must exist; a missing default file yields
    /// the built-in defaults.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if explicit.is_some() => {
                return Err(Error::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::parse(e.to_string()))
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Apply `ANW_*` overrides using the given variable lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("ANW_STORE_URL") {
            self.store.url = url;
        }
        if let Some(url) = non_empty("ANW_IDENTITY_URL") {
            self.identity.url = url;
        }
        if let Some(token) = non_empty("ANW_TOKEN") {
            self.identity.token = Some(token);
        }
        if let Some(email) = non_empty("ANW_MASTER_EMAIL") {
            self.identity.master_email = Some(email);
        }
    }

    /// Flatten into `ANW_*` environment variables (the token is never exported).
    pub fn to_env_vars(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            ("ANW_STORE_URL".to_string(), self.store.url.clone()),
            ("ANW_IDENTITY_URL".to_string(), self.identity.url.clone()),
        ];
        if let Some(email) = &self.identity.master_email {
            vars.push(("ANW_MASTER_EMAIL".to_string(), email.clone()));
        }
        vars
    }
}
