//! post-scheduler domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `recurrence`: Next-occurrence computation for recurring posts
//! - `timezone`: Wall-clock/instant conversion
//! - `stats`: Reporting aggregates
//! - `policy`: Validation of scheduling requests
//! - `usecases`: Scheduling service, queue processor, dispatch and background trigger

pub mod model;
pub mod policy;
pub mod ports;
pub mod recurrence;
pub mod stats;
pub mod timezone;
pub mod usecases;

pub use model::*;
pub use ports::*;
pub use recurrence::next_occurrence;
pub use stats::{compute_stats, optimal_posting_times};
