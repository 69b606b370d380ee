// src/lib.rs
pub mod config;
pub mod health;
pub mod metrics;

pub use health::{Check, CheckContext, CheckStatus, Monitor, MonitorStatus, State, Status};
pub use tokio_util::sync::CancellationToken;
