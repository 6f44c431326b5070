//! Strongly-typed identifiers: [`StateHandle`], [`Namespace`], [`SimTime`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`StateHandle`] allocation.
static STATE_HANDLE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for one simulation-state object.
///
/// Allocated from a monotonic atomic counter via [`StateHandle::next`].
/// Two distinct state objects always have different handles, so the
/// handle can key the environment registry without ABA reuse when a
/// state is dropped and a new one is allocated at the same address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateHandle(u64);

impl StateHandle {
    /// Allocate a fresh, unique handle. Thread-safe.
    pub fn next() -> Self {
        Self(STATE_HANDLE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logging and status reports.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of an environment, used as the prefix of every channel and
/// parameter key that belongs to it.
///
/// The empty namespace is the root namespace. Leading and trailing
/// slashes are stripped on construction, so `"/env0/"` and `"env0"`
/// name the same environment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Namespace(String);

impl Namespace {
    /// Create a namespace from a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim_matches('/').to_string())
    }

    /// The root (empty) namespace.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Whether this is the root namespace.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The namespace name without slashes.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve a relative channel or key name inside this namespace.
    ///
    /// ```
    /// use orrery_core::Namespace;
    ///
    /// assert_eq!(Namespace::new("env0").join("cameras/front/rgb"), "/env0/cameras/front/rgb");
    /// assert_eq!(Namespace::root().join("cameras/front/rgb"), "cameras/front/rgb");
    /// ```
    pub fn join(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if self.is_root() {
            relative.to_string()
        } else {
            format!("/{}/{}", self.0, relative)
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "/{}", self.0)
        }
    }
}

impl From<&str> for Namespace {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

/// A point on the simulation clock, in seconds.
///
/// Simulation time only advances when the integrator steps; it is
/// unrelated to wall-clock time. Every published camera frame is
/// stamped with a `SimTime`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default)]
pub struct SimTime(pub f64);

impl SimTime {
    /// The time reached after `steps` fixed steps of length `timestep`.
    ///
    /// Computed by multiplication rather than repeated addition so that
    /// grid-aligned times carry no accumulated rounding drift.
    pub fn from_steps(steps: u64, timestep: f64) -> Self {
        Self(steps as f64 * timestep)
    }

    /// The index of the fixed step closest to this time.
    ///
    /// Returns 0 for non-positive times or a non-positive timestep.
    pub fn to_steps(self, timestep: f64) -> u64 {
        if timestep <= 0.0 || self.0 <= 0.0 {
            return 0;
        }
        (self.0 / timestep).round() as u64
    }

    /// Seconds as a raw `f64`.
    pub fn as_secs(self) -> f64 {
        self.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_handles_are_unique() {
        let a = StateHandle::next();
        let b = StateHandle::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn namespace_strips_slashes() {
        assert_eq!(Namespace::new("/env0/"), Namespace::new("env0"));
        assert_eq!(Namespace::new("/env0").to_string(), "/env0");
        assert!(Namespace::new("/").is_root());
        assert_eq!(Namespace::root().to_string(), "/");
    }

    #[test]
    fn namespace_join_handles_leading_slash() {
        let ns = Namespace::new("arm");
        assert_eq!(ns.join("/cameras/c/depth"), "/arm/cameras/c/depth");
    }

    #[test]
    fn sim_time_step_conversion() {
        let t = SimTime::from_steps(34, 0.002);
        assert!((t.as_secs() - 0.068).abs() < 1e-12);
        assert_eq!(t.to_steps(0.002), 34);
        assert_eq!(SimTime(-1.0).to_steps(0.002), 0);
        assert_eq!(SimTime(1.0).to_steps(0.0), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn joined_names_have_no_empty_segments(
                ns in "/?[a-z0-9_]{1,8}/?",
                rel in "/?[a-z0-9_]{1,8}(/[a-z0-9_]{1,8}){0,3}",
            ) {
                let joined = Namespace::new(&ns).join(&rel);
                prop_assert!(joined.starts_with('/'));
                prop_assert!(!joined.contains("//"));
                prop_assert!(joined.ends_with(rel.trim_start_matches('/')));
            }

            #[test]
            fn step_index_survives_conversion(steps in 0u64..10_000_000, dt in 1e-4f64..0.1) {
                prop_assert_eq!(SimTime::from_steps(steps, dt).to_steps(dt), steps);
            }
        }
    }
}
