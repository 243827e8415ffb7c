//! DeploymentStore — the single owner of a simulated stack's state.
//!
//! Mutations apply their synchronous phase under the state lock, publish,
//! and schedule a Tokio task that settles the affected services after the
//! operation's delay. Readers only ever receive owned snapshots.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use stackdeck_core::{
    default_replicas_for, ConfigFormat, DeploymentState, RenderedConfigs, ServiceRecord,
    ServiceStatus, StackConfig, StackSeed, Timings,
};
use stackdeck_render::RenderInput;

use crate::error::{StoreError, StoreResult};
use crate::subscribers::{Registry, Subscription};
use crate::transition::{Ticket, Transition, FAILED_MARKER};

/// Mutable state guarded by the store's lock.
struct Inner {
    state: DeploymentState,
    /// Rollback target per service.
    defaults: HashMap<String, u32>,
    /// In-flight generation per service; bumped by every request touching it.
    generations: HashMap<String, u64>,
    next_generation: u64,
}

impl Inner {
    fn build(seed: StackSeed) -> Self {
        let defaults = seed
            .services
            .iter()
            .map(|s| (s.record.name.clone(), s.default_replicas))
            .collect();
        let generations = seed
            .services
            .iter()
            .map(|s| (s.record.name.clone(), 0))
            .collect();
        let mut inner = Self {
            state: DeploymentState {
                services: seed.services.into_iter().map(|s| s.record).collect(),
                nodes: seed.nodes,
                total_pods: 0,
                databases: seed.databases,
                last_deployment: None,
                current_configs: RenderedConfigs::default(),
                version: 0,
            },
            defaults,
            generations,
            next_generation: 1,
        };
        inner.recount();
        inner.rerender();
        inner
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.state.services.iter().position(|s| s.name == name)
    }

    fn recount(&mut self) {
        self.state.total_pods = self.state.replica_sum();
    }

    fn rerender(&mut self) {
        let input = RenderInput::new(&self.state.services, self.state.nodes);
        self.state.current_configs = stackdeck_render::render_all(&input);
    }

    /// Mark a change as published.
    fn publish(&mut self) -> u64 {
        self.state.version += 1;
        self.state.version
    }

    /// Start a new generation for the named services and return the ticket
    /// their settle must present.
    fn begin<'a>(
        &mut self,
        transition: Transition,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Ticket {
        let generation = self.next_generation;
        self.next_generation += 1;
        let generations = names
            .into_iter()
            .map(|name| {
                self.generations.insert(name.to_string(), generation);
                (name.to_string(), generation)
            })
            .collect();
        Ticket {
            transition,
            generations,
        }
    }

    fn mark_pending(&mut self, index: usize, transition: Transition) {
        let svc = &mut self.state.services[index];
        svc.status = ServiceStatus::Pending;
        svc.last_update = transition.pending_marker().to_string();
    }

    fn all_names(&self) -> Vec<String> {
        self.state.services.iter().map(|s| s.name.clone()).collect()
    }
}

/// Owner of the canonical deployment state.
///
/// Cloning yields another handle to the same store. Deferred completions are
/// spawned on the ambient Tokio runtime; without one, services stay `pending`.
#[derive(Clone)]
pub struct DeploymentStore {
    inner: Arc<Mutex<Inner>>,
    subscribers: Arc<Registry>,
    timings: Timings,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl DeploymentStore {
    /// Create a store from a seed, rejecting duplicate service names.
    pub fn new(seed: StackSeed, timings: Timings) -> StoreResult<Self> {
        let mut seen = HashSet::new();
        for s in &seed.services {
            if !seen.insert(s.record.name.as_str()) {
                return Err(StoreError::DuplicateService(s.record.name.clone()));
            }
        }
        Ok(Self::build(seed, timings))
    }

    /// The built-in WordPress stack with default delays.
    pub fn with_defaults() -> Self {
        Self::build(StackSeed::wordpress(), Timings::default())
    }

    pub fn from_config(config: &StackConfig) -> StoreResult<Self> {
        Self::new(config.seed(), config.timings()?)
    }

    fn build(seed: StackSeed, timings: Timings) -> Self {
        let inner = Inner::build(seed);
        info!(
            services = inner.state.services.len(),
            total_pods = inner.state.total_pods,
            nodes = inner.state.nodes,
            "deployment store created"
        );
        Self {
            inner: Arc::new(Mutex::new(inner)),
            subscribers: Arc::new(Registry::default()),
            timings,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Reading ────────────────────────────────────────────────────

    /// An owned copy of the current state.
    pub fn get_state(&self) -> DeploymentState {
        self.lock().state.clone()
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    /// Number of deferred completions that have not run yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until every scheduled completion has run.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    // ── Subscribers ────────────────────────────────────────────────

    /// Register a callback invoked after every state change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribers.add(Arc::new(listener))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&self) {
        let failed = self.subscribers.notify();
        if failed > 0 {
            debug!(failed, "some subscribers panicked");
        }
    }

    // ── Mutations ──────────────────────────────────────────────────

    /// Set a service's replica count.
    ///
    /// The service is `pending` on return and settles after the scale delay.
    pub fn update_service_replicas(&self, name: &str, replicas: i64) -> StoreResult<()> {
        let count = u32::try_from(replicas).map_err(|_| StoreError::InvalidReplicas {
            name: name.to_string(),
            replicas,
        })?;

        let (ticket, total_pods) = {
            let mut inner = self.lock();
            let index = inner
                .position(name)
                .ok_or_else(|| StoreError::UnknownService(name.to_string()))?;

            inner.state.services[index].replicas = count;
            inner.mark_pending(index, Transition::Scale);
            let ticket = inner.begin(Transition::Scale, [name]);
            inner.recount();
            inner.rerender();
            inner.publish();
            (ticket, inner.state.total_pods)
        };

        info!(service = %name, replicas = count, total_pods, "scaling service");
        self.notify();
        self.schedule(ticket);
        Ok(())
    }

    /// Redeploy every service.
    pub fn deploy_all(&self) {
        let ticket = {
            let mut inner = self.lock();
            for index in 0..inner.state.services.len() {
                inner.mark_pending(index, Transition::DeployAll);
            }
            let names = inner.all_names();
            let ticket = inner.begin(Transition::DeployAll, names.iter().map(String::as_str));
            inner.state.last_deployment = Some(Utc::now());
            inner.rerender();
            inner.publish();
            ticket
        };

        info!(services = ticket.generations.len(), "deploying all services");
        self.notify();
        self.schedule(ticket);
    }

    /// Reset every service to its default replica count.
    ///
    /// There is no deployment history: the target is always the default
    /// table, whatever was deployed before.
    pub fn rollback(&self) {
        let (ticket, total_pods) = {
            let mut inner = self.lock();
            for index in 0..inner.state.services.len() {
                let name = &inner.state.services[index].name;
                let target = inner
                    .defaults
                    .get(name)
                    .copied()
                    .unwrap_or_else(|| default_replicas_for(name));
                inner.state.services[index].replicas = target;
                inner.mark_pending(index, Transition::Rollback);
            }
            let names = inner.all_names();
            let ticket = inner.begin(Transition::Rollback, names.iter().map(String::as_str));
            inner.recount();
            inner.rerender();
            inner.publish();
            (ticket, inner.state.total_pods)
        };

        info!(total_pods, "rolling back to default replicas");
        self.notify();
        self.schedule(ticket);
    }

    /// Put a service into the `error` state.
    ///
    /// Any transition in flight for the service is superseded and will not
    /// flip it back to `running`.
    pub fn inject_failure(&self, name: &str, reason: &str) -> StoreResult<()> {
        {
            let mut inner = self.lock();
            let index = inner
                .position(name)
                .ok_or_else(|| StoreError::UnknownService(name.to_string()))?;
            let generation = inner.next_generation;
            inner.next_generation += 1;
            inner.generations.insert(name.to_string(), generation);

            let svc = &mut inner.state.services[index];
            svc.status = ServiceStatus::Error;
            svc.last_update = FAILED_MARKER.to_string();
            inner.publish();
        }

        warn!(service = %name, %reason, "service failed");
        self.notify();
        Ok(())
    }

    /// Change the cluster's node count.
    pub fn set_nodes(&self, nodes: u32) {
        {
            let mut inner = self.lock();
            if inner.state.nodes == nodes {
                return;
            }
            inner.state.nodes = nodes;
            inner.rerender();
            inner.publish();
        }

        info!(nodes, "cluster node count changed");
        self.notify();
    }

    // ── Deferred completion ────────────────────────────────────────

    fn schedule(&self, ticket: Ticket) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(transition = %ticket.transition, "no tokio runtime; transition will stay pending");
                return;
            }
        };

        let delay = ticket.transition.delay(&self.timings);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let store = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            store.settle(ticket);
            store.in_flight.fetch_sub(1, Ordering::SeqCst);
            store.idle.notify_waiters();
        });
    }

    /// Apply a deferred completion to every service it still owns.
    fn settle(&self, ticket: Ticket) {
        let transition = ticket.transition;
        let settled = {
            let mut inner = self.lock();
            let mut settled = 0usize;
            for (name, generation) in &ticket.generations {
                if inner.generations.get(name) != Some(generation) {
                    debug!(service = %name, %transition, "superseded; skipping settle");
                    continue;
                }
                if let Some(index) = inner.position(name) {
                    let svc = &mut inner.state.services[index];
                    svc.status = ServiceStatus::Running;
                    svc.last_update = transition.settled_marker().to_string();
                    settled += 1;
                }
            }
            if settled > 0 {
                if transition.rerenders_on_settle() {
                    inner.recount();
                    inner.rerender();
                }
                inner.publish();
            }
            settled
        };

        if settled > 0 {
            info!(%transition, services = settled, "transition settled");
            self.notify();
        }
    }

    // ── Rendering ──────────────────────────────────────────────────

    /// Render one format from the current state with a fresh timestamp.
    pub fn generate(&self, format: ConfigFormat) -> String {
        let (services, nodes): (Vec<ServiceRecord>, u32) = {
            let inner = self.lock();
            (inner.state.services.clone(), inner.state.nodes)
        };
        stackdeck_render::render(format, &RenderInput::new(&services, nodes))
    }

    pub fn generate_manifest_format(&self) -> String {
        self.generate(ConfigFormat::Kubernetes)
    }

    pub fn generate_provisioning_format(&self) -> String {
        self.generate(ConfigFormat::Terraform)
    }

    pub fn generate_config_management_format(&self) -> String {
        self.generate(ConfigFormat::Ansible)
    }
}

impl std::fmt::Debug for DeploymentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentStore")
            .field("timings", &self.timings)
            .field("in_flight", &self.in_flight())
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use stackdeck_core::{SeedService, ServiceStatus};
    use stackdeck_render::without_timestamp;

    fn counting(store: &DeploymentStore) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        store.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    fn status(store: &DeploymentStore, name: &str) -> ServiceStatus {
        store.get_state().service(name).unwrap().status
    }

    fn replicas(store: &DeploymentStore, name: &str) -> u32 {
        store.get_state().service(name).unwrap().replicas
    }

    fn assert_invariants(state: &DeploymentState) {
        assert_eq!(state.total_pods, state.replica_sum());
        let names: HashSet<_> = state.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), state.services.len());
    }

    #[test]
    fn initial_state() {
        let store = DeploymentStore::with_defaults();
        let state = store.get_state();
        assert_eq!(state.services.len(), 6);
        assert_eq!(state.total_pods, 10);
        assert_eq!(state.nodes, 3);
        assert_eq!(state.databases, "MySQL + MongoDB");
        assert!(state.last_deployment.is_none());
        assert_eq!(state.version, 0);
        assert!(state.current_configs.kubernetes.contains("10 total pods across 6 services"));
        assert_invariants(&state);
    }

    #[test]
    fn duplicate_seed_names_rejected() {
        let mut seed = StackSeed::wordpress();
        let dup = seed.services[0].clone();
        seed.services.push(dup);
        let err = DeploymentStore::new(seed, Timings::default()).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateService(ref n) if n == "wordpress"));
    }

    #[test]
    fn snapshots_are_independent() {
        let store = DeploymentStore::with_defaults();
        let mut first = store.get_state();
        let second = store.get_state();
        assert_eq!(first, second);

        first.services[0].replicas = 99;
        first.total_pods = 0;
        assert_eq!(store.get_state(), second);
        assert_ne!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn scale_goes_pending_then_running() {
        let store = DeploymentStore::with_defaults();
        let notified = counting(&store);

        store.update_service_replicas("wordpress", 5).unwrap();

        let state = store.get_state();
        let wp = state.service("wordpress").unwrap();
        assert_eq!(wp.status, ServiceStatus::Pending);
        assert_eq!(wp.replicas, 5);
        assert_eq!(wp.last_update, "Just now");
        assert_eq!(state.total_pods, 13);
        assert!(state.current_configs.kubernetes.contains("replicas: 5"));
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(store.in_flight(), 1);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(status(&store, "wordpress"), ServiceStatus::Pending);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let state = store.get_state();
        let wp = state.service("wordpress").unwrap();
        assert_eq!(wp.status, ServiceStatus::Running);
        assert_eq!(wp.last_update, "Just deployed");
        assert_eq!(notified.load(Ordering::SeqCst), 2);
        assert_eq!(store.in_flight(), 0);
        assert_invariants(&state);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_service_is_rejected_without_notify() {
        let store = DeploymentStore::with_defaults();
        let notified = counting(&store);
        let before = store.get_state();

        let err = store.update_service_replicas("does-not-exist", 4).unwrap_err();
        assert!(matches!(err, StoreError::UnknownService(ref n) if n == "does-not-exist"));

        assert_eq!(store.get_state(), before);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
        assert_eq!(store.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_replicas_are_rejected() {
        let store = DeploymentStore::with_defaults();
        let notified = counting(&store);
        let before = store.get_state();

        let err = store.update_service_replicas("wordpress", -1).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReplicas { replicas: -1, .. }));
        let err = store
            .update_service_replicas("wordpress", i64::from(u32::MAX) + 1)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReplicas { .. }));

        assert_eq!(store.get_state(), before);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_replicas_is_accepted() {
        let store = DeploymentStore::with_defaults();
        store.update_service_replicas("redis-cache", 0).unwrap();
        assert_eq!(replicas(&store, "redis-cache"), 0);
        assert_eq!(store.get_state().total_pods, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn deploy_all_marks_everything_pending() {
        let store = DeploymentStore::with_defaults();
        let notified = counting(&store);
        let before = Utc::now();

        store.deploy_all();

        let state = store.get_state();
        assert!(state
            .services
            .iter()
            .all(|s| s.status == ServiceStatus::Pending && s.last_update == "Deploying..."));
        let deployed_at = state.last_deployment.unwrap();
        assert!(deployed_at >= before && deployed_at <= Utc::now());
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let state = store.get_state();
        assert!(state
            .services
            .iter()
            .all(|s| s.status == ServiceStatus::Running && s.last_update == "Just deployed"));
        assert_eq!(state.last_deployment, Some(deployed_at));
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rollback_resets_to_defaults() {
        let store = DeploymentStore::with_defaults();
        store.update_service_replicas("wordpress", 9).unwrap();
        store.update_service_replicas("flask-api", 7).unwrap();
        assert_eq!(store.get_state().total_pods, 20);

        store.rollback();
        let state = store.get_state();
        assert_eq!(state.service("wordpress").unwrap().replicas, 2);
        assert_eq!(state.service("flask-api").unwrap().replicas, 3);
        assert_eq!(state.total_pods, 10);
        assert!(state
            .services
            .iter()
            .all(|s| s.status == ServiceStatus::Pending && s.last_update == "Rolling back..."));

        store.wait_idle().await;
        let state = store.get_state();
        assert_eq!(state.service("wordpress").unwrap().replicas, 2);
        assert_eq!(state.total_pods, 10);
        assert!(state
            .services
            .iter()
            .all(|s| s.status == ServiceStatus::Running && s.last_update == "Rolled back"));
        assert_invariants(&state);
    }

    #[tokio::test(start_paused = true)]
    async fn rollback_uses_seed_defaults() {
        let seed = StackSeed {
            services: vec![SeedService {
                record: ServiceRecord::new("worker", 1, "acme/worker:1", "never"),
                default_replicas: 4,
            }],
            nodes: 1,
            databases: String::new(),
        };
        let store = DeploymentStore::new(seed, Timings::default()).unwrap();
        store.rollback();
        assert_eq!(replicas(&store, "worker"), 4);
        assert_eq!(store.get_state().total_pods, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_scale_does_not_settle_early() {
        let store = DeploymentStore::with_defaults();

        store.update_service_replicas("wordpress", 3).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.update_service_replicas("wordpress", 5).unwrap();

        // The first request's timer fires here but no longer owns wordpress.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(status(&store, "wordpress"), ServiceStatus::Pending);
        assert_eq!(replicas(&store, "wordpress"), 5);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status(&store, "wordpress"), ServiceStatus::Running);
        assert_eq!(replicas(&store, "wordpress"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_scales_last_writer_wins() {
        let store = DeploymentStore::with_defaults();
        let notified = counting(&store);

        store.update_service_replicas("wordpress", 3).unwrap();
        store.update_service_replicas("wordpress", 5).unwrap();
        store.wait_idle().await;

        let state = store.get_state();
        assert_eq!(state.service("wordpress").unwrap().replicas, 5);
        assert_eq!(state.service("wordpress").unwrap().status, ServiceStatus::Running);
        // Two pending publishes, one settle; the stale settle is silent.
        assert_eq!(notified.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn scale_during_deploy_keeps_its_own_settle() {
        let store = DeploymentStore::with_defaults();
        store.deploy_all();
        tokio::time::sleep(Duration::from_secs(4)).await;
        store.update_service_replicas("mysql", 2).unwrap();

        // Deploy settles everything but mysql.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let state = store.get_state();
        assert_eq!(state.service("mysql").unwrap().status, ServiceStatus::Pending);
        assert_eq!(state.service("wordpress").unwrap().status, ServiceStatus::Running);

        store.wait_idle().await;
        assert_eq!(status(&store, "mysql"), ServiceStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_injection_overrides_pending() {
        let store = DeploymentStore::with_defaults();
        let notified = counting(&store);

        store.update_service_replicas("mongodb", 2).unwrap();
        store.inject_failure("mongodb", "disk full").unwrap();
        assert_eq!(status(&store, "mongodb"), ServiceStatus::Error);
        assert_eq!(store.get_state().service("mongodb").unwrap().last_update, "Failed");

        store.wait_idle().await;
        assert_eq!(status(&store, "mongodb"), ServiceStatus::Error);
        assert_eq!(notified.load(Ordering::SeqCst), 2);

        assert!(matches!(
            store.inject_failure("nope", "x"),
            Err(StoreError::UnknownService(_))
        ));

        // A later deploy recovers it.
        store.deploy_all();
        store.wait_idle().await;
        assert_eq!(status(&store, "mongodb"), ServiceStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_subscriber_does_not_block_others() {
        let store = DeploymentStore::with_defaults();
        store.subscribe(|| panic!("view crashed"));
        let notified = counting(&store);

        store.update_service_replicas("wordpress", 4).unwrap();
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(replicas(&store, "wordpress"), 4);

        store.wait_idle().await;
        assert_eq!(notified.load(Ordering::SeqCst), 2);
        assert_eq!(status(&store, "wordpress"), ServiceStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn subscriber_sees_published_state() {
        let store = DeploymentStore::with_defaults();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (reader, sink) = (store.clone(), seen.clone());
        store.subscribe(move || {
            let state = reader.get_state();
            sink.lock().unwrap().push((state.version, state.total_pods));
        });

        store.update_service_replicas("flask-api", 1).unwrap();
        store.wait_idle().await;

        assert_eq!(*seen.lock().unwrap(), vec![(1, 8), (2, 8)]);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_stops_notifications() {
        let store = DeploymentStore::with_defaults();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let sub = store.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(store.subscriber_count(), 1);

        store.deploy_all();
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);

        store.wait_idle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn set_nodes_rerenders_provisioning() {
        let store = DeploymentStore::with_defaults();
        let notified = counting(&store);

        store.set_nodes(5);
        assert!(store
            .get_state()
            .current_configs
            .terraform
            .contains("desired_size = 5"));
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        store.set_nodes(5);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn generated_formats_match_cache_modulo_timestamp() {
        let store = DeploymentStore::with_defaults();
        store.update_service_replicas("wordpress", 6).unwrap();

        let state = store.get_state();
        assert_eq!(
            without_timestamp(&store.generate_manifest_format()),
            without_timestamp(&state.current_configs.kubernetes)
        );
        assert_eq!(
            without_timestamp(&store.generate_provisioning_format()),
            without_timestamp(&state.current_configs.terraform)
        );
        assert_eq!(
            without_timestamp(&store.generate_config_management_format()),
            without_timestamp(&state.current_configs.ansible)
        );
    }

    #[test]
    fn mutation_without_runtime_stays_pending() {
        let store = DeploymentStore::with_defaults();
        store.deploy_all();
        assert_eq!(store.in_flight(), 0);
        assert!(!store.get_state().is_settled());
    }

    #[test]
    fn from_config_uses_timings() {
        let config =
            StackConfig::from_toml_str("[timings]\nscale = \"100ms\"\n").unwrap();
        let store = DeploymentStore::from_config(&config).unwrap();
        assert_eq!(store.timings().scale, Duration::from_millis(100));
        assert_eq!(store.get_state().services.len(), 6);
    }
}
