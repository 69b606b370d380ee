// src/health/check.rs
use super::state::Status;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TTL: Duration = Duration::from_secs(1);

/// Probe function supplied by the caller.
pub type CheckFn = Arc<dyn Fn(CheckContext) -> BoxFuture<'static, Status> + Send + Sync>;

/// Cancellable context handed to a probe.
///
/// When the check has a timeout the context carries a deadline, and the token
/// is cancelled once that deadline passes. Probes are expected to watch
/// `cancelled()`; nothing forces them to stop.
#[derive(Debug, Clone)]
pub struct CheckContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CheckContext {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_deadline(token: CancellationToken, deadline: Instant) -> Self {
        Self {
            token,
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, `None` if there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled or its deadline expires.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// A named health probe and its polling schedule.
///
/// `ttl` is the wait between executions. `timeout`, when set, bounds how long
/// the probe is given before its context is cancelled.
#[derive(Clone)]
pub struct Check {
    pub name: String,
    pub func: CheckFn,
    pub ttl: Duration,
    pub timeout: Option<Duration>,
}

impl Check {
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(CheckContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Status> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(move |ctx| func(ctx).boxed()),
            ttl: DEFAULT_TTL,
            timeout: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Timeout that actually applies; a zero duration counts as unset.
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }

    /// Defers the call into the returned future so that a panic raised while
    /// building the probe surfaces when the future is polled.
    pub(crate) fn probe(
        &self,
        ctx: CheckContext,
    ) -> impl Future<Output = Status> + Send + 'static {
        let func = Arc::clone(&self.func);
        async move { func(ctx).await }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
