//! stackdeck.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{default_replicas_for, SeedService, ServiceRecord, StackSeed, Timings};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    pub cluster: Option<ClusterConfig>,
    pub timings: Option<TimingsConfig>,
    pub policy: Option<PolicyConfig>,
    /// When absent, the built-in WordPress stack is used.
    pub services: Option<Vec<ServiceConfig>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub nodes: Option<u32>,
    pub databases: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingsConfig {
    /// Delay before a scale settles (e.g. "2s", "500ms").
    pub scale: Option<String>,
    pub deploy: Option<String>,
    pub rollback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Upper bound the CLI applies to scale requests.
    pub max_replicas: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub image: String,
    pub replicas: u32,
    /// Rollback target. Falls back to the well-known table.
    pub default_replicas: Option<u32>,
    pub last_update: Option<String>,
}

const DEFAULT_MAX_REPLICAS: u32 = 10;

impl StackConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: StackConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a stackdeck.toml describing the built-in WordPress stack.
    pub fn scaffold() -> Self {
        let seed = StackSeed::wordpress();
        let defaults = Timings::default();
        StackConfig {
            cluster: Some(ClusterConfig {
                nodes: Some(seed.nodes),
                databases: Some(seed.databases.clone()),
            }),
            timings: Some(TimingsConfig {
                scale: Some(format_duration(defaults.scale)),
                deploy: Some(format_duration(defaults.deploy)),
                rollback: Some(format_duration(defaults.rollback)),
            }),
            policy: Some(PolicyConfig {
                max_replicas: Some(DEFAULT_MAX_REPLICAS),
            }),
            services: Some(
                seed.services
                    .into_iter()
                    .map(|s| ServiceConfig {
                        name: s.record.name,
                        image: s.record.image,
                        replicas: s.record.replicas,
                        default_replicas: Some(s.default_replicas),
                        last_update: Some(s.record.last_update),
                    })
                    .collect(),
            ),
        }
    }

    /// Check the parts serde cannot: unique names, parseable durations, policy bounds.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(services) = &self.services {
            let mut seen = HashSet::new();
            for svc in services {
                if svc.name.trim().is_empty() {
                    return Err(ConfigError::EmptyServiceName);
                }
                if !seen.insert(svc.name.as_str()) {
                    return Err(ConfigError::DuplicateService(svc.name.clone()));
                }
            }
        }
        self.timings()?;
        if self.max_replicas() == 0 {
            return Err(ConfigError::Invalid {
                field: "policy.max_replicas",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Build the initial stack described by this config.
    pub fn seed(&self) -> StackSeed {
        let builtin = StackSeed::wordpress();
        let services = match &self.services {
            Some(services) => services
                .iter()
                .map(|svc| SeedService {
                    record: ServiceRecord::new(
                        &svc.name,
                        svc.replicas,
                        &svc.image,
                        svc.last_update.as_deref().unwrap_or("never"),
                    ),
                    default_replicas: svc
                        .default_replicas
                        .unwrap_or_else(|| default_replicas_for(&svc.name)),
                })
                .collect(),
            None => builtin.services,
        };
        let cluster = self.cluster.as_ref();
        StackSeed {
            services,
            nodes: cluster.and_then(|c| c.nodes).unwrap_or(builtin.nodes),
            databases: cluster
                .and_then(|c| c.databases.clone())
                .unwrap_or(builtin.databases),
        }
    }

    /// Resolve transition delays, using defaults for anything unset.
    pub fn timings(&self) -> ConfigResult<Timings> {
        let mut timings = Timings::default();
        if let Some(cfg) = &self.timings {
            if let Some(s) = &cfg.scale {
                timings.scale = parse_duration("timings.scale", s)?;
            }
            if let Some(s) = &cfg.deploy {
                timings.deploy = parse_duration("timings.deploy", s)?;
            }
            if let Some(s) = &cfg.rollback {
                timings.rollback = parse_duration("timings.rollback", s)?;
            }
        }
        Ok(timings)
    }

    pub fn max_replicas(&self) -> u32 {
        self.policy
            .as_ref()
            .and_then(|p| p.max_replicas)
            .unwrap_or(DEFAULT_MAX_REPLICAS)
    }
}

/// Parse "500ms", "2s" or "1m". A bare number is seconds.
fn parse_duration(field: &'static str, s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration {
        field,
        value: s.to_string(),
    };
    let parsed = if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins = mins.parse::<u64>().map_err(|_| invalid())?;
        return mins
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(invalid);
    } else {
        s.parse::<u64>().map(Duration::from_secs)
    };
    parsed.map_err(|_| invalid())
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
