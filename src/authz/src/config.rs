//! Configuration loading and validation

use anyhow::{bail, Context, Result};
use rolegate_core::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Environment variable overriding `admin.roles` (comma separated)
pub const ENV_ADMIN_ROLES: &str = "ROLEGATE_ADMIN_ROLES";

/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "ROLEGATE_LOG_LEVEL";

/// Complete configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RolegateConfig {
    #[serde(default)]
    pub admin: AdminSection,

    #[serde(default)]
    pub resolver: ResolverSettings,

    #[serde(default)]
    pub providers: ProviderCacheSettings,

    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminSection {
    /// Role names granting unconditional admin
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverSettings {
    /// Identities aggregated concurrently during bulk resolution
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            bulk_concurrency: default_bulk_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderCacheSettings {
    /// Load a provider's snapshot on the first query that finds none,
    /// instead of serving nothing until the scheduler refreshes it
    #[serde(default = "default_true")]
    pub load_on_demand: bool,
}

impl Default for ProviderCacheSettings {
    fn default() -> Self {
        Self {
            load_on_demand: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSection {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_thread_ids: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_bulk_concurrency() -> usize {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RolegateConfig {
    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file {:?}", path))
    }

    /// Parse and validate TOML
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ROLEGATE_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(roles) = lookup(ENV_ADMIN_ROLES) {
            self.admin.roles = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        self.validate()
    }

    /// Check invariants
    pub fn validate(&self) -> Result<()> {
        if self.resolver.bulk_concurrency == 0 {
            bail!("resolver.bulk_concurrency must be at least 1");
        }
        if let Some(blank) = self.admin.roles.iter().find(|r| r.trim().is_empty()) {
            bail!("admin.roles contains a blank role name: {:?}", blank);
        }
        tracing_subscriber::EnvFilter::try_new(&self.logging.level)
            .with_context(|| format!("Invalid logging.level {:?}", self.logging.level))?;
        Ok(())
    }

    /// Admin role set
    pub fn admin_roles(&self) -> AdminRoles {
        AdminRoles::new(self.admin.roles.iter().cloned())
    }
}

/// Role names granting admin status. Built once at startup and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminRoles {
    names: HashSet<String>,
}

impl AdminRoles {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether any of `roles` is an admin role
    pub fn is_admin<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a Role>,
    {
        roles.into_iter().any(|role| self.names.contains(role.name()))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
