use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::domain::PolicyDocument;
use crate::engine::PolicyEngine;
use crate::observability::MetricsRegistry;

use super::loader::{compile_document, PolicyError, PolicyLoader};

/// Interval used when a zero check interval is requested.
const FALLBACK_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Watch the policy file and install new rule sets when it changes.
pub struct PolicyWatcher {
    loader: PolicyLoader,
    engine: Arc<PolicyEngine>,
    metrics: Arc<MetricsRegistry>,
    check_interval: Duration,
    last_fingerprint: Option<String>,
    rejected_fingerprint: Option<String>,
}

impl PolicyWatcher {
    /// Create a new policy watcher. A zero interval is replaced by one second.
    pub fn new(
        loader: PolicyLoader,
        engine: Arc<PolicyEngine>,
        metrics: Arc<MetricsRegistry>,
        check_interval: Duration,
    ) -> Self {
        let check_interval = if check_interval.is_zero() {
            warn!("Policy check interval must be non-zero, using 1s");
            FALLBACK_CHECK_INTERVAL
        } else {
            check_interval
        };

        PolicyWatcher {
            loader,
            engine,
            metrics,
            check_interval,
            last_fingerprint: None,
            rejected_fingerprint: None,
        }
    }

    /// Record the document already installed so it is not reloaded.
    pub fn with_installed(mut self, document: &PolicyDocument) -> Self {
        self.last_fingerprint = Some(document.fingerprint.clone());
        self
    }

    /// Start polling in a background task.
    pub fn start(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(self.check_interval);

            loop {
                interval.tick().await;

                match self.check_for_updates() {
                    Ok(true) => info!("Policy reloaded successfully"),
                    Ok(false) => {} // No changes
                    Err(e) => warn!(error = %e, "Error checking for policy updates"),
                }
            }
        })
    }

    /// Check for policy changes and install the new rule set if the
    /// document changed and compiles.
    ///
    /// A document that fails to compile is remembered and not retried
    /// until its content changes again. The active rule set is untouched.
    pub fn check_for_updates(&mut self) -> Result<bool, PolicyError> {
        let document = self.loader.load_document()?;

        if self.last_fingerprint.as_ref() == Some(&document.fingerprint)
            || self.rejected_fingerprint.as_ref() == Some(&document.fingerprint)
        {
            return Ok(false);
        }

        let ruleset = match compile_document(&document, self.loader.compiler()) {
            Ok(ruleset) => ruleset,
            Err(e) => {
                self.rejected_fingerprint = Some(document.fingerprint.clone());
                self.metrics.record_policy_reload(false);
                return Err(e);
            }
        };

        info!(
            previous = ?self.last_fingerprint,
            policy_version = %ruleset.policy_version,
            "Policy document changed"
        );

        self.engine.install(ruleset);
        self.last_fingerprint = Some(document.fingerprint);
        self.rejected_fingerprint = None;
        self.metrics.record_policy_reload(true);

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::Ordering;
    use tempfile::NamedTempFile;

    const V1: &str = r#"
policy_version: "v1"
rules:
  - name: default_allow
    action: allow
"#;

    const V2: &str = r#"
policy_version: "v2"
rules:
  - name: block_unhosted_wallets
    when:
      field: originator.kyc
      op: eq
      value: false
    action: block
    priority: 20
  - name: default_allow
    action: allow
"#;

    fn setup_with_interval(
        check_interval: Duration,
    ) -> (NamedTempFile, PolicyWatcher, Arc<PolicyEngine>, Arc<MetricsRegistry>) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(V1.as_bytes()).unwrap();

        let loader = PolicyLoader::new(file.path());
        let (document, ruleset) = loader.load().unwrap();

        let engine = Arc::new(PolicyEngine::new(ruleset));
        let metrics = Arc::new(MetricsRegistry::new());
        let watcher = PolicyWatcher::new(loader, engine.clone(), metrics.clone(), check_interval)
            .with_installed(&document);

        (file, watcher, engine, metrics)
    }

    fn setup() -> (NamedTempFile, PolicyWatcher, Arc<PolicyEngine>, Arc<MetricsRegistry>) {
        setup_with_interval(Duration::from_millis(20))
    }

    #[test]
    fn test_unchanged_document_is_not_reloaded() {
        let (_file, mut watcher, engine, metrics) = setup();

        assert!(!watcher.check_for_updates().unwrap());
        assert_eq!(engine.policy_version(), "v1");
        assert_eq!(metrics.policy_reloads_total.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_changed_document_is_installed() {
        let (file, mut watcher, engine, metrics) = setup();

        std::fs::write(file.path(), V2).unwrap();

        assert!(watcher.check_for_updates().unwrap());
        assert_eq!(engine.policy_version(), "v2");
        assert_eq!(engine.snapshot().len(), 2);
        assert_eq!(metrics.policy_reloads_total.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_broken_document_keeps_active_set() {
        let (file, mut watcher, engine, metrics) = setup();

        std::fs::write(
            file.path(),
            r#"
policy_version: "v3"
rules:
  - name: broken
    when:
      field: amount
      op: greater
      value: 1
    action: block
"#,
        )
        .unwrap();

        assert!(watcher.check_for_updates().is_err());
        assert_eq!(engine.policy_version(), "v1");
        assert_eq!(metrics.policy_reload_errors.load(Ordering::Relaxed), 1);

        // The same broken content is not retried
        assert!(!watcher.check_for_updates().unwrap());
        assert_eq!(metrics.policy_reload_errors.load(Ordering::Relaxed), 1);

        // A fixed document is picked up
        std::fs::write(file.path(), V2).unwrap();
        assert!(watcher.check_for_updates().unwrap());
        assert_eq!(engine.policy_version(), "v2");
    }

    #[tokio::test]
    async fn test_policy_watcher_detects_changes() {
        let (file, watcher, engine, _metrics) = setup();
        let handle = watcher.start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        std::fs::write(file.path(), V2).unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while engine.policy_version() != "v2" {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Timeout waiting for policy change");

        assert_eq!(engine.snapshot().len(), 2);

        handle.abort();
    }

    #[tokio::test]
    async fn test_zero_interval_keeps_watching() {
        let (_file, watcher, _engine, _metrics) = setup_with_interval(Duration::ZERO);
        assert_eq!(watcher.check_interval, FALLBACK_CHECK_INTERVAL);

        let handle = watcher.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        handle.abort();
    }
}
