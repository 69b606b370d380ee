// demos/basic.rs
use anyhow::Result;
use health_monitor::config::{self, MonitorConfig};
use health_monitor::metrics::MetricsRegistry;
use health_monitor::{CancellationToken, Check, CheckContext, Monitor, Status};
use std::time::{Duration, Instant};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("health_monitor=debug".parse()?),
        )
        .init();

    // Optional config file with per-check ttl/timeout overrides
    let monitor_config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            config::load_config(&path).await?
        }
        None => MonitorConfig::default(),
    };

    let metrics_registry = MetricsRegistry::new()?;
    let monitor = Monitor::new().with_metrics(metrics_registry.collector());
    let token = CancellationToken::new();

    let always_up = Check::new("always-up", |_ctx| async { Status::up() });

    let slow = Check::new("slow-dependency", |ctx: CheckContext| async move {
        let started = Instant::now();
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(300)) => {
                let response_time_ms = started.elapsed().as_millis() as u64;
                Status::up()
                    .with_details(serde_json::json!({ "response_time_ms": response_time_ms }))
            }
            _ = ctx.cancelled() => Status::warn()
                .with_details(serde_json::json!({ "error": "deadline exceeded" })),
        }
    })
    .with_ttl(Duration::from_millis(500))
    .with_timeout(Duration::from_millis(200));

    let handles = monitor
        .register_all(
            &token,
            [monitor_config.apply(always_up), monitor_config.apply(slow)],
        )
        .await;

    for _ in 0..3 {
        let status = monitor.check().await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        tokio::time::sleep(Duration::from_millis(400)).await;
    }

    println!("{}", String::from_utf8_lossy(&metrics_registry.gather()?));

    token.cancel();
    futures::future::join_all(handles).await;
    info!("All health checks stopped");

    Ok(())
}
