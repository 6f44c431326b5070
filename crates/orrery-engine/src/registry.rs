//! Handle-to-environment association readable from any thread.
//!
//! The registry never owns environments. Each [`Environment`](crate::Environment)
//! publishes an [`EnvironmentInfo`] and the registry keeps a weak
//! reference to it, so a dropped environment's handle simply stops
//! resolving.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use indexmap::IndexMap;
use orrery_core::{Namespace, SimTime, StateHandle};

// ── EnvironmentInfo ────────────────────────────────────────────────

/// Live status of one environment.
///
/// Written only by the thread that steps the environment; read from
/// anywhere. Individual fields are atomic, not the record as a whole.
pub struct EnvironmentInfo {
    namespace: Namespace,
    handle: StateHandle,
    sim_time_bits: AtomicU64,
    steps: AtomicU64,
    registered_plugins: AtomicUsize,
    ready_plugins: AtomicUsize,
    cameras: AtomicUsize,
}

impl EnvironmentInfo {
    pub(crate) fn new(namespace: Namespace, handle: StateHandle) -> Self {
        Self {
            namespace,
            handle,
            sim_time_bits: AtomicU64::new(0f64.to_bits()),
            steps: AtomicU64::new(0),
            registered_plugins: AtomicUsize::new(0),
            ready_plugins: AtomicUsize::new(0),
            cameras: AtomicUsize::new(0),
        }
    }

    /// Namespace of the environment.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Handle of the state object the environment owns.
    pub fn handle(&self) -> StateHandle {
        self.handle
    }

    /// Simulation time after the most recent step.
    pub fn sim_time(&self) -> SimTime {
        SimTime(f64::from_bits(self.sim_time_bits.load(Ordering::Acquire)))
    }

    /// Steps completed since construction.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }

    /// Plugins instantiated by the most recent load.
    pub fn registered_plugins(&self) -> usize {
        self.registered_plugins.load(Ordering::Acquire)
    }

    /// Plugins that loaded successfully in the most recent load.
    pub fn ready_plugins(&self) -> usize {
        self.ready_plugins.load(Ordering::Acquire)
    }

    /// Cameras scheduled by the most recent load.
    pub fn cameras(&self) -> usize {
        self.cameras.load(Ordering::Acquire)
    }

    pub(crate) fn record_step(&self, time: SimTime, steps: u64) {
        self.sim_time_bits.store(time.as_secs().to_bits(), Ordering::Release);
        self.steps.store(steps, Ordering::Release);
    }

    pub(crate) fn record_load(&self, registered: usize, ready: usize, cameras: usize) {
        self.registered_plugins.store(registered, Ordering::Release);
        self.ready_plugins.store(ready, Ordering::Release);
        self.cameras.store(cameras, Ordering::Release);
    }
}

impl fmt::Debug for EnvironmentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentInfo")
            .field("namespace", &self.namespace)
            .field("handle", &self.handle)
            .field("sim_time", &self.sim_time())
            .field("steps", &self.steps())
            .field("registered_plugins", &self.registered_plugins())
            .field("ready_plugins", &self.ready_plugins())
            .field("cameras", &self.cameras())
            .finish()
    }
}

// ── EnvironmentRegistry ────────────────────────────────────────────

/// Maps state handles to the environment that owns the state.
///
/// Shared by reference (typically `Arc<EnvironmentRegistry>`) between
/// the application, every environment constructor, and any monitoring
/// thread. All operations take `&self`.
///
/// ```
/// use orrery_core::StateHandle;
/// use orrery_engine::EnvironmentRegistry;
///
/// let registry = EnvironmentRegistry::new();
/// assert!(registry.lookup(StateHandle::next()).is_none());
/// ```
#[derive(Default)]
pub struct EnvironmentRegistry {
    entries: RwLock<IndexMap<StateHandle, Weak<EnvironmentInfo>>>,
}

impl EnvironmentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `handle` with `env`, replacing any previous association.
    pub fn assign(&self, handle: StateHandle, env: &Arc<EnvironmentInfo>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(handle, Arc::downgrade(env));
    }

    /// The environment associated with `handle`, if it is still alive.
    pub fn lookup(&self, handle: StateHandle) -> Option<Arc<EnvironmentInfo>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&handle).and_then(Weak::upgrade)
    }

    /// Forget `handle`. Returns whether an entry existed.
    pub fn remove(&self, handle: StateHandle) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.shift_remove(&handle).is_some()
    }

    /// Drop entries whose environment no longer exists. Returns how many
    /// were removed.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, env| env.strong_count() > 0);
        before - entries.len()
    }

    /// Live environments in assignment order.
    pub fn environments(&self) -> Vec<Arc<EnvironmentInfo>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.values().filter_map(Weak::upgrade).collect()
    }

    /// Number of entries, including ones whose environment is gone.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EnvironmentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentRegistry")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    fn info(ns: &str) -> Arc<EnvironmentInfo> {
        Arc::new(EnvironmentInfo::new(Namespace::new(ns), StateHandle::next()))
    }

    #[test]
    fn assign_then_lookup() {
        let registry = EnvironmentRegistry::new();
        let env = info("env0");
        registry.assign(env.handle(), &env);
        let found = registry.lookup(env.handle()).unwrap();
        assert!(Arc::ptr_eq(&found, &env));
    }

    #[test]
    fn unknown_handle_is_none() {
        let registry = EnvironmentRegistry::new();
        assert!(registry.lookup(StateHandle::next()).is_none());
    }

    #[test]
    fn assign_overwrites() {
        let registry = EnvironmentRegistry::new();
        let first = info("a");
        let second = info("b");
        let handle = first.handle();
        registry.assign(handle, &first);
        registry.assign(handle, &second);
        assert_eq!(registry.lookup(handle).unwrap().namespace().as_str(), "b");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dropped_environment_is_not_found_and_prunable() {
        let registry = EnvironmentRegistry::new();
        let env = info("gone");
        let handle = env.handle();
        registry.assign(handle, &env);
        drop(env);
        assert!(registry.lookup(handle).is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.prune(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_forgets_handle() {
        let registry = EnvironmentRegistry::new();
        let env = info("x");
        registry.assign(env.handle(), &env);
        assert!(registry.remove(env.handle()));
        assert!(!registry.remove(env.handle()));
        assert!(registry.lookup(env.handle()).is_none());
    }

    #[test]
    fn status_updates_are_visible() {
        let env = info("x");
        env.record_load(3, 2, 1);
        env.record_step(SimTime(0.004), 2);
        assert_eq!(env.registered_plugins(), 3);
        assert_eq!(env.ready_plugins(), 2);
        assert_eq!(env.cameras(), 1);
        assert_eq!(env.steps(), 2);
        assert_eq!(env.sim_time(), SimTime(0.004));
    }

    #[test]
    fn concurrent_assign_and_lookup() {
        let registry = Arc::new(EnvironmentRegistry::new());
        let envs: Vec<_> = (0..8).map(|i| info(&format!("env{i}"))).collect();
        let handles: Vec<_> = envs
            .iter()
            .map(|env| {
                let registry = Arc::clone(&registry);
                let env = Arc::clone(env);
                thread::spawn(move || {
                    registry.assign(env.handle(), &env);
                    registry.lookup(env.handle()).is_some()
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(registry.environments().len(), 8);
    }

    proptest! {
        #[test]
        fn last_assignment_wins(targets in proptest::collection::vec(0usize..4, 1..32)) {
            let registry = EnvironmentRegistry::new();
            let envs: Vec<_> = (0..4).map(|i| info(&format!("e{i}"))).collect();
            let handle = StateHandle::next();
            for &t in &targets {
                registry.assign(handle, &envs[t]);
            }
            let last = *targets.last().unwrap();
            prop_assert!(Arc::ptr_eq(&registry.lookup(handle).unwrap(), &envs[last]));
            prop_assert_eq!(registry.len(), 1);
        }
    }
}
