pub mod control;
pub mod orchestrator;
pub mod runner;
pub mod service;
pub mod store;
