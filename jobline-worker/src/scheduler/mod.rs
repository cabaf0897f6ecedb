//! Scheduler layer for the worker
//!
//! The job loop and its retry policies, plus the optional sweep that
//! recovers jobs abandoned in `running`.

pub mod policy;
pub mod reconciler;
pub mod worker;

pub use policy::RetryPolicy;
pub use reconciler::Reconciler;
pub use worker::JobWorker;
