use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::str::FromStr;
use typeahead_indexer::ConsolidationConfig;

const ENV_PREFIX: &str = "TYPEAHEAD_";

/// Command-line overrides; applied after the file and the environment.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Maximum suggestions kept per prefix
    #[arg(long, global = true)]
    pub capacity: Option<usize>,

    /// Reseed keeps capacity / retain-ratio suggestions per prefix
    #[arg(long, global = true)]
    pub retain_ratio: Option<usize>,

    /// Distinct pending words needed before a tick consolidates
    #[arg(long, global = true)]
    pub trigger_threshold: Option<usize>,

    /// Consolidation timer period in milliseconds
    #[arg(long, global = true)]
    pub tick_interval_ms: Option<u64>,

    /// Words taken from the starter list when the store is empty
    #[arg(long, global = true)]
    pub starter_load_size: Option<usize>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut ConsolidationConfig) {
        if let Some(value) = self.capacity {
            config.capacity = value;
        }
        if let Some(value) = self.retain_ratio {
            config.retain_ratio = value;
        }
        if let Some(value) = self.trigger_threshold {
            config.trigger_threshold = value;
        }
        if let Some(value) = self.tick_interval_ms {
            config.tick_interval_ms = value;
        }
        if let Some(value) = self.starter_load_size {
            config.starter_load_size = value;
        }
    }
}

/// Defaults, then the optional TOML file, then `TYPEAHEAD_*`, then flags.
pub fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ConsolidationConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            parse_toml(&raw).with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ConsolidationConfig::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn parse_toml(raw: &str) -> Result<ConsolidationConfig> {
    Ok(toml::from_str(raw)?)
}

fn apply_env_overrides<F>(config: &mut ConsolidationConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    env_value(&lookup, "CAPACITY", &mut config.capacity)?;
    env_value(&lookup, "RETAIN_RATIO", &mut config.retain_ratio)?;
    env_value(&lookup, "TRIGGER_THRESHOLD", &mut config.trigger_threshold)?;
    env_value(&lookup, "TICK_INTERVAL_MS", &mut config.tick_interval_ms)?;
    env_value(&lookup, "STARTER_LOAD_SIZE", &mut config.starter_load_size)?;
    Ok(())
}

fn env_value<F, T>(lookup: &F, suffix: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let name = format!("{ENV_PREFIX}{suffix}");
    if let Some(raw) = lookup(&name) {
        let raw = raw.trim();
        if !raw.is_empty() {
            *slot = raw
                .parse()
                .with_context(|| format!("{name} must be a non-negative integer, got {raw:?}"))?;
        }
    }
    Ok(())
}
