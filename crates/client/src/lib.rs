//! Client side of the storyreel orchestration core.
//!
//! REST wrappers for the job execution engine and the batch service, the
//! job status poller with its retry policy, the batch detail watcher and a
//! single-owner generation session.

pub mod api;
pub mod config;
pub mod engine;
pub mod events;
pub mod poller;
pub mod session;
pub mod watch;
