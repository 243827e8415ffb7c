//! End-to-end store scenarios.
//!
//! Drives the store through the operator flows the dashboard exposes and
//! checks the published state after each step.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stackdeck_core::{DeploymentState, StackConfig, StackSeed, Timings};
use stackdeck_render::without_timestamp;
use stackdeck_state::*;

fn check_invariants(state: &DeploymentState) {
    assert_eq!(state.total_pods, state.replica_sum(), "total_pods drifted");
    let names: HashSet<_> = state.services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names.len(), state.services.len(), "duplicate service names");
}

fn recording(store: &DeploymentStore) -> Arc<Mutex<Vec<DeploymentState>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (reader, sink) = (store.clone(), seen.clone());
    store.subscribe(move || sink.lock().unwrap().push(reader.get_state()));
    seen
}

#[tokio::test(start_paused = true)]
async fn operator_session() {
    let store = DeploymentStore::with_defaults();
    let seen = recording(&store);

    store.update_service_replicas("wordpress", 5).unwrap();
    store.update_service_replicas("flask-api", 6).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(store.get_state().is_settled());
    assert_eq!(store.get_state().total_pods, 16);

    store.deploy_all();
    tokio::time::sleep(Duration::from_secs(1)).await;
    store.rollback();
    store.wait_idle().await;

    let state = store.get_state();
    assert_eq!(state.total_pods, 10);
    assert!(state.is_settled());
    // Deploy's settle is superseded by the rollback that followed it.
    assert!(state.services.iter().all(|s| s.last_update == "Rolled back"));
    assert!(state.last_deployment.is_some());

    let seen = seen.lock().unwrap();
    for snapshot in seen.iter() {
        check_invariants(snapshot);
    }
    let versions: Vec<u64> = seen.iter().map(|s| s.version).collect();
    assert!(versions.windows(2).all(|w| w[0] < w[1]), "{versions:?}");
    assert_eq!(seen.last().unwrap(), &state);
}

#[tokio::test(start_paused = true)]
async fn cached_configs_follow_every_mutation() {
    let store = DeploymentStore::with_defaults();

    store.update_service_replicas("wordpress", 7).unwrap();
    let pending = store.get_state();
    assert!(pending.current_configs.kubernetes.contains("replicas: 7"));
    assert!(pending.current_configs.terraform.contains("WordPress(7)"));
    assert!(pending.current_configs.ansible.contains("wordpress_replicas: 7"));

    store.wait_idle().await;
    let settled = store.get_state();
    assert_eq!(
        without_timestamp(&pending.current_configs.kubernetes),
        without_timestamp(&settled.current_configs.kubernetes)
    );

    store.rollback();
    let rolled = store.get_state();
    assert!(rolled.current_configs.terraform.contains("WordPress(2), MySQL(1)"));
}

#[tokio::test(start_paused = true)]
async fn custom_stack_from_config() {
    let config = StackConfig::from_toml_str(
        r#"
[cluster]
nodes = 2
databases = "PostgreSQL"

[timings]
scale = "500ms"

[[services]]
name = "api"
image = "acme/api:2.1"
replicas = 3
default_replicas = 2

[[services]]
name = "worker"
image = "acme/worker:2.1"
replicas = 1
"#,
    )
    .unwrap();
    let store = DeploymentStore::from_config(&config).unwrap();
    let state = store.get_state();
    assert_eq!(state.total_pods, 4);
    assert_eq!(state.databases, "PostgreSQL");
    // Core workloads still render with their fallbacks.
    assert!(state.current_configs.kubernetes.contains("name: wordpress"));
    assert!(state.current_configs.kubernetes.contains("acme/api:2.1"));

    store.update_service_replicas("api", 5).unwrap();
    tokio::time::sleep(Duration::from_millis(501)).await;
    assert!(store.get_state().is_settled());

    store.rollback();
    store.wait_idle().await;
    let state = store.get_state();
    assert_eq!(state.service("api").unwrap().replicas, 2);
    assert_eq!(state.service("worker").unwrap().replicas, 1);
}

#[tokio::test(start_paused = true)]
async fn empty_stack_is_usable() {
    let store = DeploymentStore::new(StackSeed::empty(1), Timings::default()).unwrap();
    let notified = Arc::new(AtomicUsize::new(0));
    let n = notified.clone();
    store.subscribe(move || {
        n.fetch_add(1, Ordering::SeqCst);
    });

    store.deploy_all();
    store.rollback();
    store.wait_idle().await;

    let state = store.get_state();
    assert_eq!(state.total_pods, 0);
    assert!(state.current_configs.ansible.contains("# Current Configuration: 0 total pods"));
    // Pending publishes only; there is nothing to settle.
    assert_eq!(notified.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutations_keep_invariants() {
    let timings = Timings {
        scale: Duration::from_millis(5),
        deploy: Duration::from_millis(10),
        rollback: Duration::from_millis(5),
    };
    let store = DeploymentStore::new(StackSeed::wordpress(), timings).unwrap();
    let violations = Arc::new(AtomicUsize::new(0));
    let (reader, v) = (store.clone(), violations.clone());
    store.subscribe(move || {
        let state = reader.get_state();
        if state.total_pods != state.replica_sum() {
            v.fetch_add(1, Ordering::SeqCst);
        }
    });

    let mut handles = Vec::new();
    for worker in 0..4i64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..25i64 {
                let name = ["wordpress", "mysql", "flask-api"][(i % 3) as usize];
                store.update_service_replicas(name, (worker + i) % 8).unwrap();
                if i % 10 == 0 {
                    store.deploy_all();
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    store.wait_idle().await;

    let state = store.get_state();
    check_invariants(&state);
    assert!(state.is_settled());
    assert_eq!(violations.load(Ordering::SeqCst), 0);
}

#[test]
fn snapshot_serializes_to_json() {
    let state = DeploymentStore::with_defaults().get_state();
    let value = serde_json::to_value(&state).unwrap();
    assert_eq!(value["total_pods"], 10);
    assert_eq!(value["services"][0]["status"], "running");
    assert!(value["last_deployment"].is_null());

    let back: DeploymentState = serde_json::from_value(value).unwrap();
    assert_eq!(back, state);
}

#[test]
fn duplicate_config_services_are_rejected() {
    let err = StackConfig::from_toml_str(
        r#"
[[services]]
name = "api"
image = "a"
replicas = 1

[[services]]
name = "api"
image = "b"
replicas = 2
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("api"));
}

#[test]
fn errors_render_readably() {
    let store = DeploymentStore::with_defaults();
    let err = store.update_service_replicas("ghost", 1).unwrap_err();
    assert_eq!(err.to_string(), "unknown service: ghost");
    let err = store.update_service_replicas("mysql", -3).unwrap_err();
    assert!(err.to_string().contains("-3"));
}
