// src/health/executor.rs
use super::check::{Check, CheckContext};
use super::state::{CheckStatus, Status};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Outcome of running one probe.
#[derive(Debug, Clone)]
pub struct Execution {
    pub check_status: CheckStatus,
    pub elapsed: Duration,
    /// Monotonic time the probe returned, used to order cache writes.
    pub finished_at: Instant,
    /// The deadline passed before the probe returned.
    pub timed_out: bool,
    /// The probe panicked and was recorded as `Down`.
    pub panicked: bool,
}

/// Runs the probe once, with a deadline if the check has a timeout.
pub async fn execute(parent: &CancellationToken, check: &Check) -> Execution {
    match check.effective_timeout() {
        Some(timeout) => execute_with_timeout(parent, check, timeout).await,
        None => run_probe(check, CheckContext::new(parent.clone())).await,
    }
}

/// Runs the probe with a child context that is cancelled after `timeout`.
///
/// The probe is not aborted when the deadline passes; its context is
/// cancelled and the call keeps being awaited. The child token is cancelled
/// on every exit path, so nothing derived from it outlives the call.
///
/// A timeout too large to express as an `Instant` runs without a deadline.
pub async fn execute_with_timeout(
    parent: &CancellationToken,
    check: &Check,
    timeout: Duration,
) -> Execution {
    let Some(deadline) = Instant::now().checked_add(timeout) else {
        debug!(check = %check.name, ?timeout, "Timeout out of range, running without a deadline");
        return run_probe(check, CheckContext::new(parent.clone())).await;
    };

    let child = parent.child_token();
    let _guard = child.clone().drop_guard();

    let probe = run_probe(check, CheckContext::with_deadline(child.clone(), deadline));
    tokio::pin!(probe);

    let expiry = tokio::time::sleep_until(deadline);
    tokio::pin!(expiry);

    let mut timed_out = false;
    let mut execution = loop {
        tokio::select! {
            execution = &mut probe => break execution,
            () = &mut expiry, if !timed_out => {
                timed_out = true;
                warn!(check = %check.name, ?timeout, "Health check exceeded its timeout");
                child.cancel();
            }
        }
    };

    execution.timed_out = timed_out;
    execution
}

async fn run_probe(check: &Check, ctx: CheckContext) -> Execution {
    let started = Instant::now();
    let probe = check.probe(ctx);

    let (status, panicked) = match AssertUnwindSafe(probe).catch_unwind().await {
        Ok(status) => (status, false),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(check = %check.name, panic = %message, "Health check panicked");
            (
                Status::down().with_details(serde_json::json!({ "panic": message })),
                true,
            )
        }
    };

    let finished_at = Instant::now();
    Execution {
        check_status: CheckStatus::observed(status, Utc::now()),
        elapsed: finished_at - started,
        finished_at,
        timed_out: false,
        panicked,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
