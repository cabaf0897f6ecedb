//! Data Transfer Objects
//!
//! Lightweight request/response bodies used on the HTTP surface.

pub mod job;
