use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use warden_kernel::capability::{CapabilityError, CapabilitySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    AllowAll,
    Listed,
}

/// [`CapabilitySource`] answering from a mutable in-memory grant set.
#[derive(Debug)]
pub struct StaticCapabilitySource {
    policy: Policy,
    granted: Mutex<HashSet<String>>,
    queries: Mutex<HashMap<String, usize>>,
}

impl StaticCapabilitySource {
    fn with_policy(policy: Policy, granted: HashSet<String>) -> Self {
        Self {
            policy,
            granted: Mutex::new(granted),
            queries: Mutex::new(HashMap::new()),
        }
    }

    /// Grants every capability.
    pub fn allow_all() -> Self {
        Self::with_policy(Policy::AllowAll, HashSet::new())
    }

    /// Grants nothing until [`grant`](Self::grant) is called.
    pub fn deny_all() -> Self {
        Self::with_policy(Policy::Listed, HashSet::new())
    }

    /// Grants exactly `names`.
    pub fn granting<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_policy(Policy::Listed, names.into_iter().map(Into::into).collect())
    }

    pub fn grant(&self, name: impl Into<String>) {
        self.granted.lock().insert(name.into());
    }

    pub fn revoke(&self, name: &str) {
        self.granted.lock().remove(name);
    }

    /// Times `name` was queried.
    pub fn query_count(&self, name: &str) -> usize {
        self.queries.lock().get(name).copied().unwrap_or(0)
    }

    pub fn total_queries(&self) -> usize {
        self.queries.lock().values().sum()
    }
}

#[async_trait]
impl CapabilitySource for StaticCapabilitySource {
    async fn query_grant(&self, name: &str) -> Result<bool, CapabilityError> {
        *self.queries.lock().entry(name.to_string()).or_default() += 1;
        Ok(match self.policy {
            Policy::AllowAll => true,
            Policy::Listed => self.granted.lock().contains(name),
        })
    }
}

/// [`CapabilitySource`] whose every query fails with
/// [`CapabilityError::Unavailable`].
#[derive(Debug)]
pub struct FailingCapabilitySource {
    reason: String,
    calls: AtomicUsize,
}

impl FailingCapabilitySource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilitySource for FailingCapabilitySource {
    async fn query_grant(&self, _name: &str) -> Result<bool, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CapabilityError::Unavailable(self.reason.clone()))
    }
}
