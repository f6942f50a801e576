use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use domwatch_db::models::{Domain, DomainStatus};
use domwatch_db::normalize::normalize_domain;
use domwatch_db::repositories::DomainRepository;

use crate::services::egress::EgressSelector;
use crate::services::notification_service::Notifier;
use crate::services::probe::Prober;

#[derive(Debug, Error)]
pub enum CheckError {
    /// The domain is not registered; the caller should tell the user to
    /// add it first.
    #[error("domain is not registered")]
    DomainNotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub is_up: bool,
    pub error: Option<String>,
}

/// Orchestrates "check one domain": egress selection, probe, status
/// transition against the previously stored state, persistence, and the
/// notify decision. A single gate serializes all check execution, so a
/// scheduled batch and an on-demand check can never interleave their
/// read-probe-write sequences.
pub struct DomainChecker {
    domains: DomainRepository,
    egress: EgressSelector,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    jitter: Duration,
    gate: Mutex<()>,
}

impl DomainChecker {
    pub fn new(
        domains: DomainRepository,
        egress: EgressSelector,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
        jitter: Duration,
    ) -> Self {
        Self {
            domains,
            egress,
            prober,
            notifier,
            interval,
            jitter,
            gate: Mutex::new(()),
        }
    }

    /// Checks every registered domain, holding the gate for the whole
    /// batch. Probe failures become `down` outcomes and never abort the
    /// pass; store failures propagate.
    pub async fn check_all(&self) -> Result<()> {
        let _guard = self.gate.lock().await;

        let domains = self.domains.list().await?;
        info!("Running availability pass over {} domains", domains.len());

        for record in domains {
            self.check_record(&record, true).await?;
        }

        Ok(())
    }

    /// On-demand check of a single domain. Waits on the same gate as
    /// scheduled batches. Notifications are suppressed: manual checks
    /// must not trigger broadcast spam.
    pub async fn check_by_name(&self, name: &str) -> Result<CheckOutcome, CheckError> {
        let name = normalize_domain(name);
        let _guard = self.gate.lock().await;

        let record = self
            .domains
            .get(&name)
            .await?
            .ok_or(CheckError::DomainNotFound)?;

        Ok(self.check_record(&record, false).await?)
    }

    async fn check_record(&self, record: &Domain, notify_on_change: bool) -> Result<CheckOutcome> {
        let proxy = self.egress.select().await?;
        let outcome = self.prober.attempt(&record.name, proxy.as_ref()).await;

        let new_status = if outcome.is_up { DomainStatus::Up } else { DomainStatus::Down };
        // Transition is judged against the state recorded before this probe.
        let previous = record.last_status;

        debug!(
            "Checked {}: {} (was {})",
            record.name,
            new_status.as_str(),
            previous.as_str()
        );

        // Status write and log append happen on every check, transition
        // or not.
        self.domains
            .update_status(record.id, new_status, outcome.error.as_deref())
            .await?;
        self.domains
            .append_check_log(record.id, new_status, outcome.error.as_deref())
            .await?;

        // A first-ever check only establishes the baseline: `unknown` is
        // "never evaluated", not a monitored state.
        if notify_on_change && previous != new_status && previous != DomainStatus::Unknown {
            match new_status {
                DomainStatus::Down => {
                    let reason = outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string());
                    self.notifier.notify_downtime(&record.name, &reason).await;
                }
                DomainStatus::Up if previous == DomainStatus::Down => {
                    self.notifier.notify_recovery(&record.name).await;
                }
                _ => {}
            }
        }

        Ok(CheckOutcome {
            is_up: outcome.is_up,
            error: outcome.error,
        })
    }

    /// Scheduler loop: one pass shortly after startup, then a jittered
    /// interval so deployments do not probe in lockstep. Runs forever;
    /// spawn it.
    pub async fn run(self: Arc<Self>) {
        info!(
            "Starting domain checker: every {:?} with up to {:?} jitter",
            self.interval, self.jitter
        );

        if let Err(e) = self.check_all().await {
            error!("Startup availability pass failed: {e:#}");
        }

        loop {
            tokio::time::sleep(self.interval + self.random_jitter()).await;
            if let Err(e) = self.check_all().await {
                error!("Scheduled availability pass failed: {e:#}");
            }
        }
    }

    fn random_jitter(&self) -> Duration {
        use rand::Rng;

        let max = self.jitter.as_secs();
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(rand::rng().random_range(0..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use domwatch_db::init_schema;
    use domwatch_db::models::Proxy;
    use domwatch_db::repositories::ProxyRepository;
    use domwatch_db::sqlx::SqlitePool;
    use domwatch_db::sqlx::sqlite::SqlitePoolOptions;

    use crate::services::probe::ProbeOutcome;

    /// Pops scripted outcomes in order; reports `up` once exhausted.
    /// An optional delay widens the probe window for the gate test.
    struct ScriptedProber {
        outcomes: StdMutex<VecDeque<ProbeOutcome>>,
        delay: Duration,
        events: Arc<StdMutex<Vec<&'static str>>>,
    }

    impl ScriptedProber {
        fn new(outcomes: Vec<ProbeOutcome>) -> Self {
            Self {
                outcomes: StdMutex::new(outcomes.into()),
                delay: Duration::ZERO,
                events: Arc::new(StdMutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn attempt(&self, _domain: &str, _proxy: Option<&Proxy>) -> ProbeOutcome {
            self.events.lock().unwrap().push("probe_start");
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(ProbeOutcome::up);
            self.events.lock().unwrap().push("probe_end");
            outcome
        }
    }

    struct RecordingNotifier {
        messages: StdMutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self { messages: StdMutex::new(Vec::new()) }
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn broadcast(&self, text: &str) {
            self.messages.lock().unwrap().push(text.to_string());
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    struct Harness {
        checker: Arc<DomainChecker>,
        domains: DomainRepository,
        notifier: Arc<RecordingNotifier>,
        pool: SqlitePool,
    }

    async fn harness(prober: ScriptedProber) -> Harness {
        let pool = test_pool().await;
        let domains = DomainRepository::new(pool.clone());
        let egress = EgressSelector::new(ProxyRepository::new(pool.clone()), "turkey");
        let notifier = Arc::new(RecordingNotifier::new());

        let checker = Arc::new(DomainChecker::new(
            domains.clone(),
            egress,
            Arc::new(prober),
            notifier.clone(),
            Duration::from_secs(300),
            Duration::from_secs(300),
        ));

        Harness { checker, domains, notifier, pool }
    }

    async fn check_log_count(pool: &SqlitePool) -> i64 {
        domwatch_db::sqlx::query_scalar("SELECT COUNT(*) FROM check_logs")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn first_check_is_silent_then_recovery_notifies_once() {
        let h = harness(ScriptedProber::new(vec![
            ProbeOutcome::down("TIMEOUT"),
            ProbeOutcome::up(),
        ]))
        .await;
        h.domains.add("example.com").await.unwrap();

        // unknown -> down: baseline, no broadcast
        h.checker.check_all().await.unwrap();
        assert!(h.notifier.messages().is_empty());

        // down -> up: exactly one recovery broadcast
        h.checker.check_all().await.unwrap();
        let messages = h.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("back up"));
    }

    #[tokio::test]
    async fn flap_notifies_only_on_concrete_transitions() {
        let h = harness(ScriptedProber::new(vec![
            ProbeOutcome::up(),
            ProbeOutcome::down("HTTP 503"),
            ProbeOutcome::up(),
        ]))
        .await;
        h.domains.add("example.com").await.unwrap();

        for _ in 0..3 {
            h.checker.check_all().await.unwrap();
        }

        // unknown -> up is silent; up -> down and down -> up notify
        let messages = h.notifier.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("is down"));
        assert!(messages[0].contains("HTTP 503"));
        assert!(messages[1].contains("back up"));
    }

    #[tokio::test]
    async fn every_probe_writes_status_and_one_log_row() {
        let h = harness(ScriptedProber::new(vec![
            ProbeOutcome::up(),
            ProbeOutcome::up(),
        ]))
        .await;
        h.domains.add("example.com").await.unwrap();

        h.checker.check_all().await.unwrap();
        h.checker.check_all().await.unwrap();

        // no transition after the baseline, but both probes are logged
        assert_eq!(check_log_count(&h.pool).await, 2);
        let record = h.domains.get("example.com").await.unwrap().unwrap();
        assert_eq!(record.last_status, DomainStatus::Up);
        assert!(record.last_checked.is_some());
    }

    #[tokio::test]
    async fn recovery_clears_error_and_broadcasts_once() {
        let h = harness(ScriptedProber::new(vec![
            ProbeOutcome::up(),
            ProbeOutcome::down("HTTP 503"),
            ProbeOutcome::up(),
        ]))
        .await;
        h.domains.add("example.com").await.unwrap();

        for _ in 0..3 {
            h.checker.check_all().await.unwrap();
        }

        let record = h.domains.get("example.com").await.unwrap().unwrap();
        assert_eq!(record.last_status, DomainStatus::Up);
        assert!(record.last_error.is_none());
        let recoveries = h
            .notifier
            .messages()
            .iter()
            .filter(|m| m.contains("back up"))
            .count();
        assert_eq!(recoveries, 1);
    }

    #[tokio::test]
    async fn manual_check_suppresses_notifications() {
        let h = harness(ScriptedProber::new(vec![
            ProbeOutcome::up(),
            ProbeOutcome::down("TIMEOUT"),
        ]))
        .await;
        h.domains.add("example.com").await.unwrap();

        // establish a concrete up state via the scheduled path
        h.checker.check_all().await.unwrap();

        // up -> down through the manual path: outcome returned, nothing
        // broadcast
        let outcome = h.checker.check_by_name("Example.com/").await.unwrap();
        assert!(!outcome.is_up);
        assert_eq!(outcome.error.as_deref(), Some("TIMEOUT"));
        assert!(h.notifier.messages().is_empty());

        let record = h.domains.get("example.com").await.unwrap().unwrap();
        assert_eq!(record.last_status, DomainStatus::Down);
        assert_eq!(check_log_count(&h.pool).await, 2);
    }

    #[tokio::test]
    async fn unregistered_domain_is_not_found_and_nothing_is_written() {
        let h = harness(ScriptedProber::new(vec![])).await;

        let result = h.checker.check_by_name("missing.example").await;
        assert!(matches!(result, Err(CheckError::DomainNotFound)));
        assert_eq!(check_log_count(&h.pool).await, 0);
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn concurrent_batch_and_manual_check_never_interleave() {
        let mut prober = ScriptedProber::new(vec![
            ProbeOutcome::down("TIMEOUT"),
            ProbeOutcome::up(),
        ]);
        prober.delay = Duration::from_millis(50);
        let events = prober.events.clone();

        let h = harness(prober).await;
        h.domains.add("example.com").await.unwrap();

        let batch = {
            let checker = h.checker.clone();
            tokio::spawn(async move { checker.check_all().await.unwrap() })
        };
        let manual = {
            let checker = h.checker.clone();
            tokio::spawn(async move { checker.check_by_name("example.com").await.unwrap() })
        };

        batch.await.unwrap();
        manual.await.unwrap();

        // Whichever ran second saw the first run's completed state, and
        // the probe windows never overlapped.
        let events = events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["probe_start", "probe_end", "probe_start", "probe_end"]
        );
        assert_eq!(check_log_count(&h.pool).await, 2);
    }
}
