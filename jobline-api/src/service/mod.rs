//! Service Module
//!
//! Business logic layer for the API.
//! Services sit between the HTTP handlers and the store/queue handles.

pub mod job;

// Re-export for convenience
pub use job as job_service;
