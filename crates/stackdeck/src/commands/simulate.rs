//! Scripted simulations: apply a sequence of operations to a fresh store and
//! print every state change as it is published.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use stackdeck_core::{DeploymentState, ServiceStatus, StackConfig};
use stackdeck_state::DeploymentStore;
use tracing::{info, warn};

use super::state::format_state;

/// One simulation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Scale { service: String, replicas: i64 },
    Deploy,
    Rollback,
    Fail { service: String },
    Nodes(u32),
    Wait(Duration),
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, arg) = match s.split_once(':') {
            Some((verb, arg)) => (verb, Some(arg.trim())),
            None => (s, None),
        };

        match (verb.to_ascii_lowercase().as_str(), arg) {
            ("deploy", None) => Ok(Step::Deploy),
            ("rollback", None) => Ok(Step::Rollback),
            ("scale", Some(arg)) => {
                let (service, replicas) = arg
                    .split_once('=')
                    .ok_or_else(|| format!("expected scale:<service>=<replicas>, got '{s}'"))?;
                let service = service.trim();
                if service.is_empty() {
                    return Err(format!("missing service name in '{s}'"));
                }
                let replicas = replicas
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| format!("invalid replica count in '{s}': {e}"))?;
                Ok(Step::Scale {
                    service: service.to_string(),
                    replicas,
                })
            }
            ("fail", Some(service)) if !service.is_empty() => Ok(Step::Fail {
                service: service.to_string(),
            }),
            ("nodes", Some(arg)) => arg
                .parse::<u32>()
                .map(Step::Nodes)
                .map_err(|e| format!("invalid node count in '{s}': {e}")),
            ("wait", Some(arg)) => {
                let secs = arg
                    .parse::<f64>()
                    .map_err(|e| format!("invalid wait in '{s}': {e}"))?;
                Duration::try_from_secs_f64(secs).map(Step::Wait).map_err(|_| {
                    format!("wait must be a non-negative number of seconds, got '{arg}'")
                })
            }
            _ => Err(format!("unknown step '{s}'")),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Scale { service, replicas } => write!(f, "scale:{service}={replicas}"),
            Step::Deploy => f.write_str("deploy"),
            Step::Rollback => f.write_str("rollback"),
            Step::Fail { service } => write!(f, "fail:{service}"),
            Step::Nodes(n) => write!(f, "nodes:{n}"),
            Step::Wait(d) => write!(f, "wait:{}", d.as_secs_f64()),
        }
    }
}

pub fn parse_steps(raw: &[String]) -> anyhow::Result<Vec<Step>> {
    raw.iter()
        .map(|s| s.parse::<Step>().map_err(anyhow::Error::msg))
        .collect()
}

pub async fn simulate(config: &StackConfig, raw: &[String]) -> anyhow::Result<()> {
    let steps = parse_steps(raw)?;
    let store = super::open_store(config)?;

    let reader = store.clone();
    let subscription = store.subscribe(move || println!("{}", describe_change(&reader.get_state())));

    let result = run(&store, &steps, config.max_replicas()).await;
    subscription.unsubscribe();
    result?;

    println!();
    print!("{}", format_state(&store.get_state()));
    Ok(())
}

/// Apply every step in order, then wait for in-flight transitions to settle.
pub async fn run(store: &DeploymentStore, steps: &[Step], max_replicas: u32) -> anyhow::Result<()> {
    for step in steps {
        info!(%step, "applying step");
        match step {
            Step::Scale { service, replicas } => {
                let requested = *replicas;
                let clamped = requested.min(i64::from(max_replicas));
                if clamped != requested {
                    warn!(service = %service, requested, max_replicas, "scale request clamped");
                }
                store
                    .update_service_replicas(service, clamped)
                    .with_context(|| format!("step '{step}' failed"))?;
            }
            Step::Deploy => store.deploy_all(),
            Step::Rollback => store.rollback(),
            Step::Fail { service } => store
                .inject_failure(service, "injected by simulation")
                .with_context(|| format!("step '{step}' failed"))?,
            Step::Nodes(n) => store.set_nodes(*n),
            Step::Wait(d) => tokio::time::sleep(*d).await,
        }
    }
    store.wait_idle().await;
    Ok(())
}

/// One line per notification: version, pod total, and anything not running.
pub fn describe_change(state: &DeploymentState) -> String {
    let unsettled: Vec<String> = state
        .services
        .iter()
        .filter(|s| s.status != ServiceStatus::Running)
        .map(|s| format!("{}={} {} ({})", s.name, s.replicas, s.status, s.last_update))
        .collect();

    if unsettled.is_empty() {
        format!("[v{}] {} pods, all running", state.version, state.total_pods)
    } else {
        format!(
            "[v{}] {} pods, {}",
            state.version,
            state.total_pods,
            unsettled.join(", ")
        )
    }
}
