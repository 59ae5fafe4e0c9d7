//! Observability bootstrap shared by the binaries and the tests: tracing
//! initialization and the global metrics registry.

pub mod metrics;
pub mod tracing;
