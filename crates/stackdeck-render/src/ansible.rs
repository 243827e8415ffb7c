//! Ansible playbook for the WordPress stack.
//!
//! Replica counts appear once, as play variables, and the deployment tasks
//! reference them through `{{ <service>_replicas }}` templates.

use std::collections::HashSet;

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use stackdeck_core::ServiceRecord;

use crate::kubernetes::{self, Replicas};
use crate::{header_timestamp, replicas_of, RenderInput};

#[derive(Debug, Serialize)]
struct Play {
    name: &'static str,
    hosts: &'static str,
    #[serde(rename = "become", skip_serializing_if = "Option::is_none")]
    become_root: Option<bool>,
    vars: Mapping,
    tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
struct Task {
    name: String,
    #[serde(flatten)]
    action: Mapping,
    #[serde(skip_serializing_if = "Option::is_none")]
    when: Option<&'static str>,
}

impl Task {
    fn new(name: impl Into<String>, module: &str, args: Value) -> Self {
        let mut action = Mapping::new();
        action.insert(Value::from(module), args);
        Self {
            name: name.into(),
            action,
            when: None,
        }
    }

    fn on_debian(mut self) -> Self {
        self.when = Some("ansible_os_family == \"Debian\"");
        self
    }
}

fn mapping<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Mapping(
        entries
            .into_iter()
            .map(|(k, v)| (Value::from(k), v))
            .collect(),
    )
}

/// Identifier-safe stem of a service name, e.g. `redis_cache`.
fn var_stem(service: &str) -> String {
    let mut stem: String = service
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.starts_with(|c: char| c.is_ascii_digit()) {
        stem.insert(0, '_');
    }
    stem
}

/// Variable holding a service's replica count, e.g. `redis_cache_replicas`.
pub fn replica_var(service: &str) -> String {
    format!("{}_replicas", var_stem(service))
}

/// One replica variable per service, in order.
///
/// Names that normalize to the same stem get a numeric suffix, so every
/// service keeps its own variable: `redis-cache` and `redis_cache` become
/// `redis_cache_replicas` and `redis_cache_2_replicas`.
pub fn replica_vars<'a>(services: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    services
        .into_iter()
        .map(|service| {
            let stem = var_stem(service);
            let mut var = format!("{stem}_replicas");
            let mut n = 2;
            while !used.insert(var.clone()) {
                var = format!("{stem}_{n}_replicas");
                n += 1;
            }
            var
        })
        .collect()
}

fn title(service: &str) -> String {
    match service {
        "wordpress" => "WordPress".to_string(),
        "mysql" => "MySQL".to_string(),
        other => other.to_string(),
    }
}

fn node_setup_play() -> Play {
    let mut vars = Mapping::new();
    vars.insert("kubernetes_version".into(), "1.28.0".into());
    vars.insert("docker_version".into(), "24.0".into());

    Play {
        name: "Configure WordPress Infrastructure",
        hosts: "kubernetes_nodes",
        become_root: Some(true),
        vars,
        tasks: vec![
            Task::new(
                "Update system packages",
                "apt",
                mapping([("update_cache", true.into()), ("upgrade", "dist".into())]),
            )
            .on_debian(),
            Task::new(
                "Install Docker",
                "apt",
                mapping([
                    (
                        "name",
                        Value::Sequence(vec!["docker.io".into(), "docker-compose-plugin".into()]),
                    ),
                    ("state", "present".into()),
                ]),
            )
            .on_debian(),
            Task::new(
                "Start Docker service",
                "systemd",
                mapping([
                    ("name", "docker".into()),
                    ("state", "started".into()),
                    ("enabled", true.into()),
                ]),
            ),
            Task::new(
                "Install kubectl",
                "get_url",
                mapping([
                    (
                        "url",
                        "https://dl.k8s.io/release/v{{ kubernetes_version }}/bin/linux/amd64/kubectl"
                            .into(),
                    ),
                    ("dest", "/usr/local/bin/kubectl".into()),
                    ("mode", "0755".into()),
                ]),
            ),
            Task::new(
                "Install AWS CLI",
                "pip",
                mapping([("name", "awscli".into()), ("state", "present".into())]),
            ),
        ],
    }
}

/// Services deployed by the stack play, in task order, with their images.
fn deploy_targets(services: &[ServiceRecord]) -> Vec<(String, String)> {
    let image_of = |name: &str| {
        services
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.image.clone())
            .unwrap_or_else(|| kubernetes::default_image(name).to_string())
    };
    let mut targets = vec![
        ("mysql".to_string(), image_of("mysql")),
        ("wordpress".to_string(), image_of("wordpress")),
    ];
    targets.extend(
        services
            .iter()
            .filter(|s| s.name != "mysql" && s.name != "wordpress")
            .map(|s| (s.name.clone(), s.image.clone())),
    );
    targets
}

fn deploy_play(services: &[ServiceRecord]) -> Play {
    let targets = deploy_targets(services);

    let var_names = replica_vars(targets.iter().map(|(name, _)| name.as_str()));

    let mut vars = Mapping::new();
    vars.insert("namespace".into(), "wordpress".into());
    for ((name, _), var) in targets.iter().zip(&var_names) {
        vars.insert(var.as_str().into(), Value::from(replicas_of(services, name)));
    }

    let mut tasks = vec![Task::new(
        "Create WordPress namespace",
        "kubernetes.core.k8s",
        mapping([
            ("name", "{{ namespace }}".into()),
            ("api_version", "v1".into()),
            ("kind", "Namespace".into()),
            ("state", "present".into()),
        ]),
    )];

    for ((name, image), var) in targets.iter().zip(&var_names) {
        let spec = kubernetes::deployment_spec(
            name,
            image,
            Replicas::Template(format!("{{{{ {var} }}}}")),
            true,
            false,
        );
        let definition = kubernetes::deployment(name, "{{ namespace }}", spec);
        match serde_yaml::to_value(&definition) {
            Ok(definition) => tasks.push(Task::new(
                format!("Deploy {}", title(name)),
                "kubernetes.core.k8s",
                mapping([("definition", definition)]),
            )),
            Err(e) => tracing::warn!(service = %name, error = %e, "skipping deploy task"),
        }
    }

    Play {
        name: "Deploy WordPress Stack",
        hosts: "localhost",
        become_root: None,
        vars,
        tasks,
    }
}

pub fn render(input: &RenderInput<'_>) -> String {
    let services = input.services;
    let total: u64 = services.iter().map(|s| u64::from(s.replicas)).sum();
    let plays = vec![node_setup_play(), deploy_play(services)];

    let mut out = String::new();
    out.push_str("---\n");
    out.push_str("# Ansible Playbook for WordPress Stack Configuration\n");
    out.push_str(&header_timestamp(input));
    out.push_str(&format!("# Current Configuration: {total} total pods\n\n"));
    match serde_yaml::to_string(&plays) {
        Ok(yaml) => out.push_str(&yaml),
        Err(e) => tracing::warn!(error = %e, "playbook failed to serialize"),
    }
    out
}
