//! stackdeck-render — infrastructure-as-code renderers for a deployment state.
//!
//! Each renderer is a pure function of the service set, the cluster's node
//! count and a generation timestamp. Renders are rebuilt from scratch on every
//! call: a structured document is assembled first, then handed to a
//! format-specific serializer.
//!
//! # Formats
//!
//! - **`kubernetes`** — namespace, secrets, claims, deployments, services, ingress
//! - **`terraform`** — EKS cluster and node group, managed MySQL and DocumentDB
//! - **`ansible`** — node setup play plus a templated stack deployment play
//!
//! Two renders of identical state differ only on their `# Generated on:` line.

pub mod ansible;
pub mod hcl;
pub mod kubernetes;
pub mod terraform;

use chrono::{DateTime, SecondsFormat, Utc};
use stackdeck_core::{default_replicas_for, ConfigFormat, RenderedConfigs, ServiceRecord};

/// Prefix of the timestamp line every render carries.
pub const GENERATED_ON_PREFIX: &str = "# Generated on: ";

/// Everything a renderer may read.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub services: &'a [ServiceRecord],
    pub nodes: u32,
    pub generated_at: DateTime<Utc>,
}

impl<'a> RenderInput<'a> {
    pub fn new(services: &'a [ServiceRecord], nodes: u32) -> Self {
        Self {
            services,
            nodes,
            generated_at: Utc::now(),
        }
    }
}

/// Render a single format.
pub fn render(format: ConfigFormat, input: &RenderInput<'_>) -> String {
    match format {
        ConfigFormat::Kubernetes => kubernetes::render(input),
        ConfigFormat::Terraform => terraform::render(input),
        ConfigFormat::Ansible => ansible::render(input),
    }
}

/// Render every format with the same timestamp.
pub fn render_all(input: &RenderInput<'_>) -> RenderedConfigs {
    let mut configs = RenderedConfigs::default();
    for format in ConfigFormat::ALL {
        configs.set(format, render(format, input));
    }
    configs
}

/// Replica count of `name`, or its documented default when it is not in the set.
pub fn replicas_of(services: &[ServiceRecord], name: &str) -> u32 {
    services
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.replicas)
        .unwrap_or_else(|| default_replicas_for(name))
}

/// Drop the `# Generated on:` line so two renders can be compared.
pub fn without_timestamp(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with(GENERATED_ON_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn header_timestamp(input: &RenderInput<'_>) -> String {
    format!(
        "{GENERATED_ON_PREFIX}{}\n",
        input
            .generated_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
