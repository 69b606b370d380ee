// src/health/mod.rs
mod check;
mod executor;
mod monitor;
mod state;

pub use check::{Check, CheckContext, CheckFn, DEFAULT_TTL};
pub use executor::{execute, execute_with_timeout, Execution};
pub use monitor::{Monitor, MonitorStatus};
pub use state::{CheckStatus, State, Status};
