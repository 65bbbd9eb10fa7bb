//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the bot's core workflow.
//!
//! Use cases:
//! - `LadderController`: One expire → convert → replenish cycle
//! - `LadderRunner`: Cadence, cooldown and shutdown around the controller

pub mod ladder_controller;
pub mod runner;

pub use ladder_controller::{CycleError, CycleReport, LadderController, LadderSettings};
pub use runner::{LadderRunner, RunSummary, RunnerTiming};
