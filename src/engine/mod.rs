// src/engine/mod.rs

//! Orchestration engine for devloop.
//!
//! [`orchestrator`] wires the watcher, the debounce loop, the router, the
//! bundler and the supervised processes together and drives the shutdown
//! sequence. [`signals`] provides the SIGINT/SIGTERM future that ends it.

pub mod orchestrator;
pub mod signals;

pub use orchestrator::Orchestrator;
pub use signals::ShutdownSignal;
