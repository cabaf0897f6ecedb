//! Service layer
//!
//! Business logic for the worker. The execution strategy is trait-based so
//! the loop can be driven by the simulation or by real task dispatch.

mod execution;

pub use execution::{Deadline, ExecutionFailure, ExecutionStrategy, SimulatedExecution};
