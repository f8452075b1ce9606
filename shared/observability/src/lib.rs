//! Courier Observability Library
//!
//! Provides unified logging and tracing infrastructure for the Courier services.
//!
//! # Features
//! - Structured JSON or pretty logging with consistent schema
//! - Trace ID propagation through request headers
//! - Domain event logging for reports, metric ingestion, SLA breaches and imports
//! - HTTP middleware for request/response logging and slow request detection

pub mod trace_context;
pub mod domain_events;
pub mod middleware;
pub mod init;

pub use trace_context::*;
pub use domain_events::*;
pub use middleware::*;
pub use init::*;

// Re-export tracing for convenience
pub use tracing::{debug, error, info, warn, trace, span, Level, Instrument};
pub use tracing::instrument;
