//! Shared types used across stackdeck crates.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Service ───────────────────────────────────────────────────────

/// Observed lifecycle status of a simulated service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Settled.
    Running,
    /// A mutation is in flight.
    Pending,
    /// Only reachable through failure injection.
    Error,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Pending => "pending",
            ServiceStatus::Error => "error",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One managed workload's identity and observed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Unique within a service set; the join key for every per-service operation.
    pub name: String,
    pub replicas: u32,
    /// Opaque artifact reference.
    pub image: String,
    pub status: ServiceStatus,
    /// Human-readable marker of the last transition.
    pub last_update: String,
}

impl ServiceRecord {
    pub fn new(name: &str, replicas: u32, image: &str, last_update: &str) -> Self {
        Self {
            name: name.to_string(),
            replicas,
            image: image.to_string(),
            status: ServiceStatus::Running,
            last_update: last_update.to_string(),
        }
    }
}

/// Replica count the stack assumes for a well-known service.
///
/// Used both as the rollback target and as the fallback when a formatter
/// looks up a service that is not in the current set.
pub fn default_replicas_for(name: &str) -> u32 {
    match name {
        "wordpress" => 2,
        "flask-api" => 3,
        "nginx-gateway" => 2,
        _ => 1,
    }
}

// ── Config formats ────────────────────────────────────────────────

/// Infrastructure-as-code format a deployment state can be rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFormat {
    /// Orchestration manifests.
    Kubernetes,
    /// Provisioning-tool configuration.
    Terraform,
    /// Configuration-management playbook.
    Ansible,
}

impl ConfigFormat {
    pub const ALL: [ConfigFormat; 3] = [
        ConfigFormat::Kubernetes,
        ConfigFormat::Terraform,
        ConfigFormat::Ansible,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ConfigFormat::Kubernetes => "kubernetes",
            ConfigFormat::Terraform => "terraform",
            ConfigFormat::Ansible => "ansible",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ConfigFormat::Kubernetes => "Kubernetes",
            ConfigFormat::Terraform => "Terraform",
            ConfigFormat::Ansible => "Ansible",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Kubernetes => "yaml",
            ConfigFormat::Terraform => "tf",
            ConfigFormat::Ansible => "yml",
        }
    }

    /// File name used when exporting a render, e.g. `terraform-wordpress-stack.tf`.
    pub fn file_name(&self) -> String {
        format!("{}-wordpress-stack.{}", self.id(), self.extension())
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(ConfigFormat::Kubernetes),
            "terraform" | "tf" => Ok(ConfigFormat::Terraform),
            "ansible" => Ok(ConfigFormat::Ansible),
            other => Err(format!("unknown config format: {other}")),
        }
    }
}

/// Cached renders of every format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedConfigs {
    pub kubernetes: String,
    pub terraform: String,
    pub ansible: String,
}

impl RenderedConfigs {
    pub fn get(&self, format: ConfigFormat) -> &str {
        match format {
            ConfigFormat::Kubernetes => &self.kubernetes,
            ConfigFormat::Terraform => &self.terraform,
            ConfigFormat::Ansible => &self.ansible,
        }
    }

    pub fn set(&mut self, format: ConfigFormat, text: String) {
        match format {
            ConfigFormat::Kubernetes => self.kubernetes = text,
            ConfigFormat::Terraform => self.terraform = text,
            ConfigFormat::Ansible => self.ansible = text,
        }
    }
}

// ── Deployment state ──────────────────────────────────────────────

/// Snapshot of the whole simulated stack.
///
/// Values of this type handed out by the store are owned copies; changing
/// them has no effect on the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    /// Insertion-ordered. The order drives display and config emission.
    pub services: Vec<ServiceRecord>,
    /// Operator-set cluster capacity, not derived from services.
    pub nodes: u32,
    /// Always the sum of `replicas` over `services`.
    pub total_pods: u64,
    pub databases: String,
    /// Set only by deploy-all.
    pub last_deployment: Option<DateTime<Utc>>,
    pub current_configs: RenderedConfigs,
    /// Bumped on every published change.
    pub version: u64,
}

impl DeploymentState {
    /// Look up a service by name.
    pub fn service(&self, name: &str) -> Option<&ServiceRecord> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn replica_sum(&self) -> u64 {
        self.services.iter().map(|s| u64::from(s.replicas)).sum()
    }

    /// True when no service has a transition in flight.
    pub fn is_settled(&self) -> bool {
        self.services
            .iter()
            .all(|s| s.status != ServiceStatus::Pending)
    }
}

// ── Seed ──────────────────────────────────────────────────────────

/// A service in the initial set, together with its rollback target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedService {
    pub record: ServiceRecord,
    pub default_replicas: u32,
}

/// Everything a store needs to build its initial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSeed {
    pub services: Vec<SeedService>,
    pub nodes: u32,
    pub databases: String,
}

impl StackSeed {
    /// The WordPress stack the dashboard ships with.
    pub fn wordpress() -> Self {
        let records = [
            ServiceRecord::new("wordpress", 2, "wordpress:6.3-apache", "2 minutes ago"),
            ServiceRecord::new("mysql", 1, "mysql:8.0", "5 minutes ago"),
            ServiceRecord::new("mongodb", 1, "mongo:6.0", "5 minutes ago"),
            ServiceRecord::new("redis-cache", 1, "redis:7-alpine", "10 minutes ago"),
            ServiceRecord::new("flask-api", 3, "cloudnative/flask-api:latest", "3 minutes ago"),
            ServiceRecord::new("nginx-gateway", 2, "nginx/nginx-ingress:latest", "1 minute ago"),
        ];
        Self {
            services: records
                .into_iter()
                .map(|record| SeedService {
                    default_replicas: default_replicas_for(&record.name),
                    record,
                })
                .collect(),
            nodes: 3,
            databases: "MySQL + MongoDB".to_string(),
        }
    }

    /// An empty stack.
    pub fn empty(nodes: u32) -> Self {
        Self {
            services: Vec::new(),
            nodes,
            databases: String::new(),
        }
    }
}

impl Default for StackSeed {
    fn default() -> Self {
        Self::wordpress()
    }
}

/// Fixed delays before each operation's deferred completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub scale: Duration,
    pub deploy: Duration,
    pub rollback: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            scale: Duration::from_secs(2),
            deploy: Duration::from_secs(5),
            rollback: Duration::from_secs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wordpress_seed_matches_default_table() {
        let seed = StackSeed::wordpress();
        assert_eq!(seed.services.len(), 6);
        for s in &seed.services {
            assert_eq!(s.record.replicas, s.default_replicas, "{}", s.record.name);
            assert_eq!(s.record.status, ServiceStatus::Running);
        }
        let total: u32 = seed.services.iter().map(|s| s.record.replicas).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn fallback_table() {
        assert_eq!(default_replicas_for("wordpress"), 2);
        assert_eq!(default_replicas_for("flask-api"), 3);
        assert_eq!(default_replicas_for("nginx-gateway"), 2);
        assert_eq!(default_replicas_for("mysql"), 1);
        assert_eq!(default_replicas_for("anything-else"), 1);
    }

    #[test]
    fn format_parse_and_file_names() {
        assert_eq!("k8s".parse::<ConfigFormat>().unwrap(), ConfigFormat::Kubernetes);
        assert_eq!(" Terraform ".parse::<ConfigFormat>().unwrap(), ConfigFormat::Terraform);
        assert!("helm".parse::<ConfigFormat>().is_err());
        assert_eq!(
            ConfigFormat::Kubernetes.file_name(),
            "kubernetes-wordpress-stack.yaml"
        );
        assert_eq!(ConfigFormat::Ansible.file_name(), "ansible-wordpress-stack.yml");
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ServiceStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
