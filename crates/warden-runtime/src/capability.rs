//! Fail-closed capability evaluation with a per-name grant cache.

use crate::audit::AuditLog;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use warden_kernel::audit::{AuditCategory, AuditDraft, AuditLevel};
use warden_kernel::capability::{
    Capability, CapabilityCheck, CapabilityError, CapabilitySource, validate_declarations,
};

const SOURCE: &str = "capability_registry";

/// Cached answer for one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantState {
    pub granted: bool,
    pub checked_at: DateTime<Utc>,
}

/// Answers "is capability X granted right now?".
///
/// Every answer other than an explicit grant from the [`CapabilitySource`]
/// is `false`: undeclared names, query errors and denials alike. Query
/// errors are never cached, so the next check asks the source again.
///
/// Cached entries live until [`invalidate_cache`](Self::invalidate_cache)
/// is called or, when a TTL is configured, until they expire. Hosts must
/// call `invalidate_cache` whenever permissions may have changed.
pub struct CapabilityRegistry {
    declarations: Vec<Capability>,
    index: HashMap<String, usize>,
    source: Arc<dyn CapabilitySource>,
    audit: Arc<AuditLog>,
    cache: DashMap<String, GrantState>,
    ttl: Option<TimeDelta>,
}

impl CapabilityRegistry {
    /// Rejects empty or duplicate declaration names.
    pub fn new(
        declarations: Vec<Capability>,
        source: Arc<dyn CapabilitySource>,
        audit: Arc<AuditLog>,
    ) -> Result<Self, CapabilityError> {
        validate_declarations(&declarations)?;
        let index = declarations
            .iter()
            .enumerate()
            .map(|(i, cap)| (cap.name.clone(), i))
            .collect();

        Ok(Self {
            declarations,
            index,
            source,
            audit,
            cache: DashMap::new(),
            ttl: None,
        })
    }

    /// Expire cached answers after `ttl`.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = TimeDelta::from_std(ttl).ok();
        self
    }

    pub fn declared(&self) -> &[Capability] {
        &self.declarations
    }

    pub fn declaration(&self, name: &str) -> Option<&Capability> {
        self.index.get(name).map(|&i| &self.declarations[i])
    }

    pub fn cached_state(&self, name: &str) -> Option<GrantState> {
        self.cache.get(name).map(|entry| *entry.value())
    }

    fn fresh(&self, state: &GrantState) -> bool {
        self.ttl
            .is_none_or(|ttl| Utc::now().signed_duration_since(state.checked_at) < ttl)
    }

    /// Whether `name` is currently granted.
    pub async fn check(&self, name: &str) -> bool {
        if self.declaration(name).is_none() {
            self.audit.record_event(
                AuditDraft::new(
                    AuditLevel::Warn,
                    AuditCategory::Authorization,
                    "undeclared capability requested",
                    SOURCE,
                )
                .with_context("capability", name),
            );
            return false;
        }

        // Copy out of the map so no shard guard lives across the query.
        if let Some(state) = self.cached_state(name).filter(|s| self.fresh(s)) {
            return state.granted;
        }

        match self.source.query_grant(name).await {
            Ok(granted) => {
                self.cache.insert(
                    name.to_string(),
                    GrantState {
                        granted,
                        checked_at: Utc::now(),
                    },
                );
                if granted {
                    tracing::debug!(capability = %name, "capability granted");
                } else {
                    self.audit.record_event(
                        AuditDraft::new(
                            AuditLevel::Warn,
                            AuditCategory::Authorization,
                            "capability denied",
                            SOURCE,
                        )
                        .with_context("capability", name),
                    );
                }
                granted
            }
            Err(err) => {
                self.audit.record_event(
                    AuditDraft::new(
                        AuditLevel::Error,
                        AuditCategory::Authorization,
                        "capability query failed",
                        SOURCE,
                    )
                    .with_context("capability", name)
                    .with_context("reason", err.to_string()),
                );
                false
            }
        }
    }

    /// Evaluate every name, without short-circuiting on the first miss.
    ///
    /// Repeated names are evaluated once and `missing` keeps first-seen
    /// order. Missing high or critical capabilities are reported in one
    /// error-level event. Undeclared names count as elevated.
    pub async fn check_all<S: AsRef<str>>(&self, names: &[S]) -> CapabilityCheck {
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                continue;
            }
            if !self.check(name).await {
                missing.push(name.to_string());
            }
        }

        let elevated: Vec<Value> = missing
            .iter()
            .filter(|name| {
                self.declaration(name)
                    .is_none_or(|cap| cap.severity.is_elevated())
            })
            .map(|name| Value::from(name.as_str()))
            .collect();
        if !elevated.is_empty() {
            self.audit.record_event(
                AuditDraft::new(
                    AuditLevel::Error,
                    AuditCategory::Authorization,
                    "elevated capabilities missing",
                    SOURCE,
                )
                .with_context("missing", elevated),
            );
        }

        CapabilityCheck::from_missing(missing)
    }

    /// Forget every cached answer.
    pub fn invalidate_cache(&self) {
        let entries = self.cache.len();
        self.cache.clear();
        self.audit.record_event(
            AuditDraft::new(
                AuditLevel::Info,
                AuditCategory::Authorization,
                "capability cache invalidated",
                SOURCE,
            )
            .with_context("entries", entries),
        );
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("declared", &self.declarations.len())
            .field("cached", &self.cache.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_kernel::audit::AuditFilter;
    use warden_kernel::capability::CapabilitySeverity;
    use warden_testing::capability::{FailingCapabilitySource, StaticCapabilitySource};

    fn declarations() -> Vec<Capability> {
        vec![
            Capability::new("fs:read", "read files", CapabilitySeverity::Low),
            Capability::new("fs:write", "write files", CapabilitySeverity::Medium),
            Capability::new("shell:exec", "run processes", CapabilitySeverity::Critical),
        ]
    }

    fn registry(source: Arc<dyn CapabilitySource>) -> (CapabilityRegistry, Arc<AuditLog>) {
        let audit = Arc::new(AuditLog::new(100));
        let registry = CapabilityRegistry::new(declarations(), source, audit.clone()).unwrap();
        (registry, audit)
    }

    #[test]
    fn construction_rejects_duplicates() {
        let mut caps = declarations();
        caps.push(caps[0].clone());
        let result = CapabilityRegistry::new(
            caps,
            Arc::new(StaticCapabilitySource::allow_all()),
            Arc::new(AuditLog::default()),
        );
        assert!(matches!(result, Err(CapabilityError::DuplicateDeclaration(n)) if n == "fs:read"));
    }

    #[tokio::test]
    async fn grants_are_cached() {
        let source = Arc::new(StaticCapabilitySource::granting(["fs:read"]));
        let (registry, audit) = registry(source.clone());

        assert!(registry.check("fs:read").await);
        assert!(registry.check("fs:read").await);

        assert_eq!(source.query_count("fs:read"), 1);
        assert!(registry.cached_state("fs:read").unwrap().granted);
        assert!(audit.is_empty());
    }

    #[tokio::test]
    async fn denial_is_cached_and_audited() {
        let source = Arc::new(StaticCapabilitySource::deny_all());
        let (registry, audit) = registry(source.clone());

        assert!(!registry.check("fs:write").await);
        assert!(!registry.check("fs:write").await);

        assert_eq!(source.query_count("fs:write"), 1);
        let warnings: Vec<_> = audit
            .filter(AuditFilter::new().level(AuditLevel::Warn))
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "capability denied");
    }

    #[tokio::test]
    async fn undeclared_is_denied_without_querying() {
        let source = Arc::new(StaticCapabilitySource::allow_all());
        let (registry, audit) = registry(source.clone());

        assert!(!registry.check("net:fetch").await);
        assert_eq!(source.query_count("net:fetch"), 0);
        assert_eq!(audit.snapshot()[0].message, "undeclared capability requested");
    }

    #[tokio::test]
    async fn query_errors_fail_closed_and_are_not_cached() {
        let source = Arc::new(FailingCapabilitySource::new("permission service down"));
        let (registry, audit) = registry(source.clone());

        assert!(!registry.check("fs:read").await);
        assert!(!registry.check("fs:read").await);

        assert_eq!(source.calls(), 2);
        assert!(registry.cached_state("fs:read").is_none());
        let errors: Vec<_> = audit
            .filter(AuditFilter::new().level(AuditLevel::Error))
            .collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].context_value("reason").and_then(Value::as_str),
            Some("capability source unavailable: permission service down")
        );
    }

    #[tokio::test]
    async fn check_all_evaluates_every_name() {
        let source = Arc::new(StaticCapabilitySource::granting(["fs:read"]));
        let (registry, audit) = registry(source.clone());

        let check = registry
            .check_all(&["fs:write", "fs:read", "shell:exec"])
            .await;

        assert!(!check.granted);
        assert_eq!(check.missing, vec!["fs:write", "shell:exec"]);
        assert_eq!(source.query_count("shell:exec"), 1);

        let elevated: Vec<_> = audit
            .filter(AuditFilter::new().level(AuditLevel::Error))
            .collect();
        assert_eq!(elevated.len(), 1);
        assert_eq!(
            elevated[0].context_value("missing"),
            Some(&serde_json::json!(["shell:exec"]))
        );
    }

    #[tokio::test]
    async fn check_all_reports_repeated_names_once() {
        let source = Arc::new(StaticCapabilitySource::granting(["fs:read"]));
        let (registry, audit) = registry(source.clone());

        let check = registry
            .check_all(&["shell:exec", "fs:write", "shell:exec", "fs:read", "fs:write"])
            .await;

        assert_eq!(check.missing, vec!["shell:exec", "fs:write"]);
        assert_eq!(source.query_count("shell:exec"), 1);
        assert_eq!(source.query_count("fs:write"), 1);

        let elevated: Vec<_> = audit
            .filter(AuditFilter::new().level(AuditLevel::Error))
            .collect();
        assert_eq!(elevated.len(), 1);
        assert_eq!(
            elevated[0].context_value("missing"),
            Some(&serde_json::json!(["shell:exec"]))
        );
    }

    #[tokio::test]
    async fn invalidate_forces_requery() {
        let source = Arc::new(StaticCapabilitySource::deny_all());
        let (registry, audit) = registry(source.clone());

        assert!(!registry.check("fs:read").await);
        source.grant("fs:read");
        assert!(!registry.check("fs:read").await, "stale denial served from cache");

        registry.invalidate_cache();
        assert!(registry.check("fs:read").await);
        assert_eq!(source.query_count("fs:read"), 2);

        let infos: Vec<_> = audit
            .filter(AuditFilter::new().level(AuditLevel::Info))
            .collect();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].context_value("entries"), Some(&Value::from(1)));
    }

    #[tokio::test]
    async fn expired_entries_are_requeried() {
        let source = Arc::new(StaticCapabilitySource::allow_all());
        let audit = Arc::new(AuditLog::default());
        let registry = CapabilityRegistry::new(declarations(), source.clone(), audit)
            .unwrap()
            .with_cache_ttl(Duration::from_millis(20));

        assert!(registry.check("fs:read").await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(registry.check("fs:read").await);
        assert_eq!(source.query_count("fs:read"), 2);
    }
}
