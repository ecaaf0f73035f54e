//! Domain model of the storyreel orchestration core.
//!
//! Pure logic only: no I/O, no async. The client, orchestrator and API
//! crates build on these types.

pub mod batch;
pub mod error;
pub mod estimation;
pub mod job;
pub mod logs;
pub mod progress;
pub mod retry;
pub mod session;
pub mod step;
pub mod types;
