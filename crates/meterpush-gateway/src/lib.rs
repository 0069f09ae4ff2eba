//! meterpush gateway library entry.
//!
//! This crate wires the configuration, metrics provider, request
//! instrumentation, demo handlers, and lifecycle coordinator into a single
//! HTTP service. It is intended to be consumed by the binary (`main.rs`) and
//! by integration tests.

pub mod app_state;
pub mod config;
pub mod lifecycle;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
