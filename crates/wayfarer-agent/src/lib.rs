pub mod delegation;
pub mod graph;
pub mod handoff;
pub mod output;
pub mod prompts;
pub mod search;
pub mod workers;

pub use delegation::{DelegationInvoker, DispatchMode, PlanningOutcome, TravelPlanner};
pub use graph::{
    BookingWorkers, ExecutionResult, GraphExecutor, Outcome, RunState, StageNode, StageSettings,
    StepRecord,
};
pub use handoff::{HandoffOutcome, HandoffPipeline};
pub use search::BestFlightSearch;
pub use workers::{llm_workers, mock_workers, LlmWorker, MockFlightDatabase, WorkerSet};
