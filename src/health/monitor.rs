// src/health/monitor.rs
use super::check::Check;
use super::executor::{self, Execution};
use super::state::{CheckStatus, State};
use crate::metrics::MetricsCollector;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type StatusCache = Arc<RwLock<HashMap<String, Slot>>>;

/// Cache entry. `observed_at` is the monotonic time of the stored result and
/// orders writes; the wall-clock timestamp inside `check_status` is only
/// reported.
#[derive(Debug, Clone, Default)]
struct Slot {
    check_status: CheckStatus,
    observed_at: Option<Instant>,
}

/// Point-in-time view of every registered check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStatus {
    /// Most degraded state across all checks, `Up` when there are none.
    pub state: State,
    pub check_statuses: HashMap<String, CheckStatus>,
}

impl MonitorStatus {
    pub fn is_healthy(&self) -> bool {
        self.state != State::Down
    }

    pub fn get(&self, name: &str) -> Option<&CheckStatus> {
        self.check_statuses.get(name)
    }
}

/// Polls registered checks in the background and caches their results.
///
/// Each check gets its own task. Results are kept behind a single read/write
/// lock that is held only while inserting one entry or copying the map, never
/// while a probe runs. Clones share the same cache.
#[derive(Clone, Default)]
pub struct Monitor {
    check_statuses: StatusCache,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Seeds a `Down` placeholder for the check and starts polling it.
    ///
    /// Polling stops at the top of the first iteration after `token` is
    /// cancelled. The check is moved into its task, so it cannot be changed
    /// once registered. Names are expected to be unique: a second registration
    /// under the same name shares the first one's cache slot while both tasks
    /// keep running.
    pub async fn register(&self, token: &CancellationToken, check: Check) -> JoinHandle<()> {
        {
            let mut statuses = self.check_statuses.write().await;
            if statuses.insert(check.name.clone(), Slot::default()).is_some() {
                warn!(
                    check = %check.name,
                    "Health check name is already registered, sharing its cache slot"
                );
            }

            if let Some(metrics) = &self.metrics {
                metrics.check_started(&check.name);
            }
        }

        info!(
            check = %check.name,
            ttl = ?check.ttl,
            timeout = ?check.effective_timeout(),
            "Registered health check"
        );

        let poller = Poller {
            check,
            token: token.clone(),
            check_statuses: self.check_statuses.clone(),
            metrics: self.metrics.clone(),
        };

        tokio::spawn(poller.run())
    }

    pub async fn register_all<I>(
        &self,
        token: &CancellationToken,
        checks: I,
    ) -> Vec<JoinHandle<()>>
    where
        I: IntoIterator<Item = Check>,
    {
        let mut handles = Vec::new();
        for check in checks {
            handles.push(self.register(token, check).await);
        }
        handles
    }

    /// Latest cached result of every check, folded into one overall state.
    pub async fn check(&self) -> MonitorStatus {
        let check_statuses: HashMap<String, CheckStatus> = self
            .check_statuses
            .read()
            .await
            .iter()
            .map(|(name, slot)| (name.clone(), slot.check_status.clone()))
            .collect();
        let state = State::worst(check_statuses.values().map(CheckStatus::state));

        MonitorStatus {
            state,
            check_statuses,
        }
    }

    pub async fn check_status(&self, name: &str) -> Option<CheckStatus> {
        self.check_statuses
            .read()
            .await
            .get(name)
            .map(|slot| slot.check_status.clone())
    }

    pub async fn len(&self) -> usize {
        self.check_statuses.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.check_statuses.read().await.is_empty()
    }
}

struct Poller {
    check: Check,
    token: CancellationToken,
    check_statuses: StatusCache,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Poller {
    async fn run(self) {
        let mut previous = State::Down;

        // The TTL sleep is not interrupted; cancellation is seen on the next pass.
        while !self.token.is_cancelled() {
            let execution = executor::execute(&self.token, &self.check).await;
            self.observe(&execution, previous);
            previous = execution.check_status.state();

            let observed_at = execution.finished_at;
            store_status(
                &self.check_statuses,
                &self.check.name,
                execution.check_status,
                observed_at,
            )
            .await;
            tokio::time::sleep(self.check.ttl).await;
        }

        if let Some(metrics) = &self.metrics {
            metrics.check_stopped(&self.check.name);
        }
        info!(check = %self.check.name, "Health check polling stopped");
    }

    fn observe(&self, execution: &Execution, previous: State) {
        let name = &self.check.name;
        let state = execution.check_status.state();

        debug!(check = %name, %state, elapsed = ?execution.elapsed, "Health check executed");

        if state != previous {
            if state == State::Down {
                warn!(check = %name, from = %previous, "Health check is now down");
            } else {
                info!(
                    check = %name,
                    from = %previous,
                    to = %state,
                    "Health check state changed"
                );
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_execution(name, execution);
        }
    }
}

/// Writes `check_status` unless the cache already holds a result for `name`
/// observed later on the monotonic clock.
async fn store_status(
    cache: &RwLock<HashMap<String, Slot>>,
    name: &str,
    check_status: CheckStatus,
    observed_at: Instant,
) -> bool {
    let mut statuses = cache.write().await;
    match statuses.get(name) {
        Some(existing) if existing.observed_at > Some(observed_at) => {
            debug!(check = %name, "Discarding stale health check result");
            false
        }
        _ => {
            let slot = Slot {
                check_status,
                observed_at: Some(observed_at),
            };
            statuses.insert(name.to_string(), slot);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::Status;
    use crate::metrics::MetricsRegistry;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    fn cached(cache: &HashMap<String, Slot>, name: &str) -> Option<CheckStatus> {
        cache.get(name).map(|slot| slot.check_status.clone())
    }

    #[tokio::test]
    async fn test_empty_monitor_is_up() {
        let monitor = Monitor::new();
        let status = monitor.check().await;

        assert_eq!(
            status,
            MonitorStatus {
                state: State::Up,
                check_statuses: HashMap::new(),
            }
        );
        assert!(monitor.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_status_rejects_older_result() {
        let cache = RwLock::new(HashMap::new());
        let earlier = Instant::now();
        let later = earlier + Duration::from_millis(50);

        let newer = CheckStatus::observed(Status::up(), Utc::now());
        let older = CheckStatus::observed(Status::down(), Utc::now());

        assert!(store_status(&cache, "db", newer.clone(), later).await);
        assert!(!store_status(&cache, "db", older, earlier).await);
        assert_eq!(cached(&*cache.read().await, "db"), Some(newer));
    }

    #[tokio::test]
    async fn test_store_status_ignores_wall_clock_going_backwards() {
        let cache = RwLock::new(HashMap::new());
        let now = Utc::now();
        let first_finished = Instant::now();

        // The system clock steps back a minute between two polls.
        let before_step = CheckStatus::observed(Status::up(), now);
        let after_step = CheckStatus::observed(
            Status::down(),
            now - ChronoDuration::seconds(60),
        );

        assert!(store_status(&cache, "db", before_step, first_finished).await);
        assert!(
            store_status(
                &cache,
                "db",
                after_step.clone(),
                first_finished + Duration::from_millis(10),
            )
            .await
        );
        assert_eq!(cached(&*cache.read().await, "db"), Some(after_step));
    }

    #[tokio::test]
    async fn test_store_status_replaces_placeholder() {
        let cache = RwLock::new(HashMap::from([("db".to_string(), Slot::default())]));
        let observed = CheckStatus::observed(Status::warn(), Utc::now());

        assert!(store_status(&cache, "db", observed.clone(), Instant::now()).await);
        assert_eq!(cached(&*cache.read().await, "db"), Some(observed));
    }

    #[tokio::test]
    async fn test_duplicate_name_shares_slot() {
        let monitor = Monitor::new();
        let token = CancellationToken::new();

        let first = Check::new("db", |_ctx| async { Status::up() })
            .with_ttl(Duration::from_millis(20));
        let second = Check::new("db", |_ctx| async { Status::up() })
            .with_ttl(Duration::from_millis(20));
        monitor.register_all(&token, [first, second]).await;

        assert_eq!(monitor.len().await, 1);
        token.cancel();
    }

    #[tokio::test]
    async fn test_metrics_track_registrations_and_executions() {
        let registry = MetricsRegistry::new().unwrap();
        let monitor = Monitor::new().with_metrics(registry.collector());
        let token = CancellationToken::new();

        let check = Check::new("queue", |_ctx| async { Status::warn() })
            .with_ttl(Duration::from_millis(20));
        monitor.register(&token, check).await;

        let collector = registry.collector();
        assert_eq!(collector.registered_checks.get(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(
            collector
                .check_executions_total
                .with_label_values(&["queue", "warn"])
                .get()
                >= 1
        );
        assert_eq!(collector.check_state.with_label_values(&["queue"]).get(), 1);
        token.cancel();
    }

    #[tokio::test]
    async fn test_metrics_drop_stopped_checks() {
        let registry = MetricsRegistry::new().unwrap();
        let monitor = Monitor::new().with_metrics(registry.collector());
        let token = CancellationToken::new();

        let check = Check::new("queue", |_ctx| async { Status::up() })
            .with_ttl(Duration::from_millis(20));
        let handle = monitor.register(&token, check).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        handle.await.unwrap();

        let collector = registry.collector();
        assert_eq!(collector.registered_checks.get(), 0);

        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(!text.contains("health_check_state{check=\"queue\"}"));
        assert!(text.contains("health_check_executions_total"));

        // The last cached result stays readable after the task stops.
        assert_eq!(monitor.check().await.state, State::Up);
    }
}
