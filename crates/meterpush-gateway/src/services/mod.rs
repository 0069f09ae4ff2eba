//! Application handlers served behind the instrumentation middleware.

pub mod demo;
