//! Booking graph: a three-stage state machine over shared run state.
//!
//! Each `StageNode` delegates to one worker, mutates the `RunState`, and
//! names its successor. The `GraphExecutor` walks nodes from SearchFlights
//! until a terminal outcome, charging every delegated call to the run's
//! `UsageMeter`.

pub mod executor;
pub mod node;
pub mod state;

pub use executor::{ExecutionResult, GraphExecutor, StepRecord};
pub use node::{BookingWorkers, Outcome, StageNode, StageSettings};
pub use state::RunState;
