#![deny(missing_docs)]

//! Core library for the Medbrief document analysis server.

/// Boundary-delimited aggregation of extracted document text.
pub mod aggregation;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Format-dispatched document text extraction.
pub mod extraction;
/// Generation provider clients, prompt framing and the summary/chat facade.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Analysis and chat counters.
pub mod metrics;
/// Analysis and chat orchestration.
pub mod pipeline;
/// In-memory analysis and conversation stores.
pub mod store;
