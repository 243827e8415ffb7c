//! Kubernetes manifests for the WordPress stack.
//!
//! Every workload in the service set becomes a `Deployment`. The three
//! services the stack is built around (wordpress, mysql, mongodb) are always
//! emitted, falling back to their default replica counts when absent.

use std::collections::BTreeMap;

use serde::Serialize;
use stackdeck_core::{default_replicas_for, ServiceRecord};

use crate::{header_timestamp, RenderInput};

const NAMESPACE: &str = "wordpress";

/// Services with a hand-written template, in emission order.
pub(crate) const CORE_SERVICES: [&str; 3] = ["wordpress", "mysql", "mongodb"];

// ── Object model ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Object<S> {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata,
    #[serde(flatten)]
    body: S,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct Metadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl Metadata {
    fn named(name: &str) -> Self {
        Self::in_namespace(name, NAMESPACE)
    }

    fn in_namespace(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }
    }
}

/// Replica field of a deployment: a literal count, or a template expression
/// when the manifest is embedded in a playbook.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum Replicas {
    Count(u32),
    Template(String),
}

#[derive(Debug, Serialize)]
struct NoBody {}

#[derive(Debug, Serialize)]
struct SecretBody {
    #[serde(rename = "type")]
    kind: &'static str,
    data: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpecBody<T> {
    spec: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimSpec {
    access_modes: Vec<&'static str>,
    resources: ClaimResources,
}

#[derive(Debug, Serialize)]
struct ClaimResources {
    requests: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeploymentSpec {
    pub replicas: Replicas,
    pub selector: Selector,
    pub template: PodTemplate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Selector {
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PodTemplate {
    pub metadata: TemplateMetadata,
    pub spec: PodSpec,
}

#[derive(Debug, Serialize)]
pub(crate) struct TemplateMetadata {
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PodSpec {
    pub containers: Vec<Container>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Container {
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContainerPort {
    pub container_port: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnvVar {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvSource>,
}

impl EnvVar {
    pub(crate) fn value(name: &'static str, value: &str) -> Self {
        Self {
            name,
            value: Some(value.to_string()),
            value_from: None,
        }
    }

    fn secret(name: &'static str, secret: &'static str, key: &'static str) -> Self {
        Self {
            name,
            value: None,
            value_from: Some(EnvSource {
                secret_key_ref: SecretKeyRef { name: secret, key },
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnvSource {
    secret_key_ref: SecretKeyRef,
}

#[derive(Debug, Serialize)]
pub(crate) struct SecretKeyRef {
    name: &'static str,
    key: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VolumeMount {
    name: String,
    mount_path: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Volume {
    name: String,
    persistent_volume_claim: ClaimRef,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRef {
    claim_name: String,
}

#[derive(Debug, Serialize)]
struct ServiceSpec {
    selector: BTreeMap<&'static str, String>,
    ports: Vec<ServicePort>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServicePort {
    port: u16,
    target_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_port: Option<u16>,
}

#[derive(Debug, Serialize)]
struct IngressSpec {
    tls: Vec<IngressTls>,
    rules: Vec<IngressRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngressTls {
    hosts: Vec<&'static str>,
    secret_name: &'static str,
}

#[derive(Debug, Serialize)]
struct IngressRule {
    host: &'static str,
    http: IngressHttp,
}

#[derive(Debug, Serialize)]
struct IngressHttp {
    paths: Vec<IngressPath>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngressPath {
    path: &'static str,
    path_type: &'static str,
    backend: IngressBackend,
}

#[derive(Debug, Serialize)]
struct IngressBackend {
    service: BackendService,
}

#[derive(Debug, Serialize)]
struct BackendService {
    name: &'static str,
    port: BackendPort,
}

#[derive(Debug, Serialize)]
struct BackendPort {
    number: u16,
}

// ── Workload templates ─────────────────────────────────────────────

/// Port a well-known service listens on.
pub(crate) fn container_port(name: &str) -> Option<u16> {
    match name {
        "wordpress" => Some(80),
        "mysql" => Some(3306),
        "mongodb" => Some(27017),
        "redis-cache" => Some(6379),
        "flask-api" => Some(5000),
        "nginx-gateway" => Some(80),
        _ => None,
    }
}

/// Image used for a core service that is missing from the set.
pub(crate) fn default_image(name: &str) -> &'static str {
    match name {
        "wordpress" => "wordpress:6.3-apache",
        "mysql" => "mysql:8.0",
        "mongodb" => "mongo:6.0",
        _ => "busybox:latest",
    }
}

fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), name.to_string())])
}

fn pvc_volume(volume: &str, claim: &str, mount_path: &'static str) -> (Volume, VolumeMount) {
    (
        Volume {
            name: volume.to_string(),
            persistent_volume_claim: ClaimRef {
                claim_name: claim.to_string(),
            },
        },
        VolumeMount {
            name: volume.to_string(),
            mount_path,
        },
    )
}

/// Container definition for a workload.
///
/// `literal_secrets` inlines credentials instead of referencing
/// `mysql-secret`; the playbook uses that form.
pub(crate) fn container(name: &str, image: &str, literal_secrets: bool) -> Container {
    let env = match name {
        "wordpress" => vec![
            EnvVar::value("WORDPRESS_DB_HOST", "mysql"),
            EnvVar::value("WORDPRESS_DB_NAME", "wordpress"),
            EnvVar::value("WORDPRESS_DB_USER", "root"),
            if literal_secrets {
                EnvVar::value("WORDPRESS_DB_PASSWORD", "wordpress")
            } else {
                EnvVar::secret("WORDPRESS_DB_PASSWORD", "mysql-secret", "password")
            },
        ],
        "mysql" => vec![
            if literal_secrets {
                EnvVar::value("MYSQL_ROOT_PASSWORD", "wordpress")
            } else {
                EnvVar::secret("MYSQL_ROOT_PASSWORD", "mysql-secret", "root-password")
            },
            EnvVar::value("MYSQL_DATABASE", "wordpress"),
        ],
        "mongodb" => vec![
            EnvVar::value("MONGO_INITDB_ROOT_USERNAME", "admin"),
            EnvVar::value("MONGO_INITDB_ROOT_PASSWORD", "mongodb123"),
        ],
        _ => Vec::new(),
    };
    Container {
        name: name.to_string(),
        image: image.to_string(),
        ports: container_port(name)
            .map(|container_port| vec![ContainerPort { container_port }])
            .unwrap_or_default(),
        env,
        volume_mounts: Vec::new(),
    }
}

pub(crate) fn deployment_spec(
    name: &str,
    image: &str,
    replicas: Replicas,
    literal_secrets: bool,
    with_storage: bool,
) -> DeploymentSpec {
    let mut container = container(name, image, literal_secrets);
    let mut volumes = Vec::new();
    if with_storage {
        let mount = match name {
            "wordpress" => Some(("wordpress-storage", "wordpress-pvc", "/var/www/html")),
            "mysql" => Some(("mysql-storage", "mysql-pvc", "/var/lib/mysql")),
            _ => None,
        };
        if let Some((volume, claim, path)) = mount {
            let (volume, mount) = pvc_volume(volume, claim, path);
            volumes.push(volume);
            container.volume_mounts.push(mount);
        }
    }
    DeploymentSpec {
        replicas,
        selector: Selector {
            match_labels: app_labels(name),
        },
        template: PodTemplate {
            metadata: TemplateMetadata {
                labels: app_labels(name),
            },
            spec: PodSpec {
                containers: vec![container],
                volumes,
            },
        },
    }
}

pub(crate) type Deployment = Object<SpecBody<DeploymentSpec>>;

pub(crate) fn deployment(name: &str, namespace: &str, spec: DeploymentSpec) -> Deployment {
    Object {
        api_version: "apps/v1",
        kind: "Deployment",
        metadata: Metadata::in_namespace(name, namespace),
        body: SpecBody { spec },
    }
}

// ── Rendering ──────────────────────────────────────────────────────

/// One workload to emit: either a service from the set or a core service
/// filled in from defaults.
struct Workload<'a> {
    name: &'a str,
    image: &'a str,
    replicas: u32,
}

/// Workloads in emission order: the set in insertion order, then any missing
/// core services.
fn workloads<'a>(services: &'a [ServiceRecord]) -> Vec<Workload<'a>> {
    let mut out: Vec<Workload<'a>> = services
        .iter()
        .map(|s| Workload {
            name: &s.name,
            image: &s.image,
            replicas: s.replicas,
        })
        .collect();
    for name in CORE_SERVICES {
        if !services.iter().any(|s| s.name == name) {
            out.push(Workload {
                name,
                image: default_image(name),
                replicas: default_replicas_for(name),
            });
        }
    }
    out
}

fn push_doc<T: Serialize>(docs: &mut Vec<String>, object: &T) {
    match serde_yaml::to_string(object) {
        Ok(yaml) => docs.push(yaml),
        Err(e) => tracing::warn!(error = %e, "skipping manifest that failed to serialize"),
    }
}

pub fn render(input: &RenderInput<'_>) -> String {
    let services = input.services;
    let total: u64 = services.iter().map(|s| u64::from(s.replicas)).sum();

    let mut docs = Vec::new();

    push_doc(
        &mut docs,
        &Object {
            api_version: "v1",
            kind: "Namespace",
            metadata: Metadata {
                name: NAMESPACE.to_string(),
                ..Default::default()
            },
            body: NoBody {},
        },
    );

    push_doc(
        &mut docs,
        &Object {
            api_version: "v1",
            kind: "Secret",
            metadata: Metadata::named("mysql-secret"),
            body: SecretBody {
                kind: "Opaque",
                // base64("wordpress")
                data: BTreeMap::from([
                    ("root-password", "d29yZHByZXNz"),
                    ("password", "d29yZHByZXNz"),
                ]),
            },
        },
    );

    for claim in ["mysql-pvc", "wordpress-pvc"] {
        push_doc(
            &mut docs,
            &Object {
                api_version: "v1",
                kind: "PersistentVolumeClaim",
                metadata: Metadata::named(claim),
                body: SpecBody {
                    spec: ClaimSpec {
                        access_modes: vec!["ReadWriteOnce"],
                        resources: ClaimResources {
                            requests: BTreeMap::from([("storage", "10Gi")]),
                        },
                    },
                },
            },
        );
    }

    let workloads = workloads(services);

    for w in &workloads {
        let spec = deployment_spec(w.name, w.image, Replicas::Count(w.replicas), false, true);
        push_doc(&mut docs, &deployment(w.name, NAMESPACE, spec));
    }

    for w in &workloads {
        let Some(port) = container_port(w.name) else {
            continue;
        };
        let exposed = w.name == "wordpress";
        push_doc(
            &mut docs,
            &Object {
                api_version: "v1",
                kind: "Service",
                metadata: Metadata::named(w.name),
                body: SpecBody {
                    spec: ServiceSpec {
                        selector: BTreeMap::from([("app", w.name.to_string())]),
                        ports: vec![ServicePort {
                            port,
                            target_port: port,
                            node_port: exposed.then_some(30080),
                        }],
                        kind: exposed.then_some("NodePort"),
                    },
                },
            },
        );
    }

    push_doc(
        &mut docs,
        &Object {
            api_version: "networking.k8s.io/v1",
            kind: "Ingress",
            metadata: Metadata {
                annotations: Some(BTreeMap::from([
                    ("kubernetes.io/ingress.class".to_string(), "nginx".to_string()),
                    (
                        "cert-manager.io/cluster-issuer".to_string(),
                        "letsencrypt-prod".to_string(),
                    ),
                    (
                        "nginx.ingress.kubernetes.io/rewrite-target".to_string(),
                        "/".to_string(),
                    ),
                ])),
                ..Metadata::named("wordpress-ingress")
            },
            body: SpecBody {
                spec: IngressSpec {
                    tls: vec![IngressTls {
                        hosts: vec!["your-wordpress.com"],
                        secret_name: "wordpress-tls",
                    }],
                    rules: vec![IngressRule {
                        host: "your-wordpress.com",
                        http: IngressHttp {
                            paths: vec![IngressPath {
                                path: "/",
                                path_type: "Prefix",
                                backend: IngressBackend {
                                    service: BackendService {
                                        name: "wordpress",
                                        port: BackendPort { number: 80 },
                                    },
                                },
                            }],
                        },
                    }],
                },
            },
        },
    );

    let mut out = String::new();
    out.push_str("# Kubernetes Manifests for WordPress Stack\n");
    out.push_str(&header_timestamp(input));
    out.push_str(&format!(
        "# Current Configuration: {} total pods across {} services\n\n",
        total,
        services.len()
    ));
    out.push_str(&docs.join("---\n"));
    out
}
