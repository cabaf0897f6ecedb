//! Core domain types
//!
//! These types are shared between the API (which creates records), the worker
//! (which drives them through their lifecycle) and the client (which reads them).

pub mod job;
