//! Jobline Core
//!
//! Core types shared by every Jobline service.
//!
//! This crate contains:
//! - Domain types: the Job Record and its lifecycle status
//! - DTOs: request and response bodies exchanged over the HTTP API

pub mod domain;
pub mod dto;
