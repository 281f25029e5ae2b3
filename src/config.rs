use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::warn;

use crate::sink;
use crate::types::TagFilters;

const DEFAULT_SCAN_INTERVAL: u64 = 60;
const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Config file schema. Every field is optional; a missing file is treated
/// as an empty configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub logging: RawLogging,
    pub scan_interval: u64,
    pub ignore_default_credentials: bool,
    pub regions: Vec<String>,
    pub roles: Vec<RoleConfig>,
    pub clusters: Vec<String>,
    pub cluster_tags: TagFilters,
    pub services: Vec<String>,
    pub service_tags: TagFilters,
    pub max_in_flight: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawLogging {
    pub logger: String,
    pub options: serde_yaml::Value,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub role_arn: String,
    pub regions: Vec<String>,
}

/// Sink selection as resolved from config plus environment.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub kind: String,
    pub options: serde_yaml::Value,
}

/// Fully resolved configuration, computed once at startup and passed to the
/// scanner as-is.
#[derive(Debug, Clone)]
pub struct Config {
    pub sink: SinkConfig,
    pub scan_interval: u64,
    pub ignore_default_credentials: bool,
    pub regions: Vec<String>,
    pub roles: Vec<RoleConfig>,
    pub clusters: Vec<String>,
    pub cluster_tags: TagFilters,
    pub services: Vec<String>,
    pub service_tags: TagFilters,
    pub max_in_flight: usize,
}

pub fn load_raw(path: &Path) -> Result<RawConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "config file {} does not exist - using empty configuration",
                path.display()
            );
            return Ok(RawConfig::default());
        }
        Err(err) => {
            return Err(err).context(format!("reading config file {}", path.display()));
        }
    };
    if contents.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    serde_yaml::from_str(&contents).context(format!("parsing config file {}", path.display()))
}

/// Resolve the raw file config against the process environment. Pure: all
/// inputs are explicit, including the fallback region used when the file
/// names none.
pub fn resolve(
    raw: RawConfig,
    env: &HashMap<String, String>,
    fallback_region: Option<String>,
) -> Result<Config> {
    let mut scan_interval = raw.scan_interval;
    if let Some(value) = env.get("SCAN_INTERVAL") {
        scan_interval = value
            .parse()
            .with_context(|| format!("invalid scan interval '{value}'"))?;
    }
    if scan_interval == 0 {
        scan_interval = DEFAULT_SCAN_INTERVAL;
    }

    let mut kind = raw.logging.logger;
    let mut options = raw.logging.options;
    sink::apply_env_overrides(&mut kind, &mut options, env);
    if kind.is_empty() {
        kind = "stdout".to_string();
    }

    if raw.ignore_default_credentials && raw.roles.is_empty() {
        bail!(
            "nothing to scan for - either add roles to your config file, \
             or re-enable the default credentials"
        );
    }

    let regions = if raw.regions.is_empty() {
        let Some(region) = fallback_region else {
            bail!("no regions configured and no default region could be inferred");
        };
        vec![region]
    } else {
        raw.regions
    };

    let roles = raw
        .roles
        .into_iter()
        .map(|mut role| {
            if role.regions.is_empty() {
                role.regions = regions.clone();
            }
            role
        })
        .collect();

    let max_in_flight = raw.max_in_flight.unwrap_or(DEFAULT_MAX_IN_FLIGHT);
    anyhow::ensure!(max_in_flight > 0, "max_in_flight must be at least 1");

    Ok(Config {
        sink: SinkConfig { kind, options },
        scan_interval,
        ignore_default_credentials: raw.ignore_default_credentials,
        regions,
        roles,
        clusters: raw.clusters,
        cluster_tags: raw.cluster_tags,
        services: raw.services,
        service_tags: raw.service_tags,
        max_in_flight,
    })
}
