use std::fmt;
use std::sync::Arc;

use wayfarer_core::booking::{FlightDetails, PaymentOutcome, SeatPreference};
use wayfarer_core::config::RunConfig;
use wayfarer_core::traits::WorkerInvoker;
use wayfarer_core::types::Stage;

/// The three workers a booking run delegates to.
#[derive(Clone)]
pub struct BookingWorkers {
    pub search: Arc<dyn WorkerInvoker<Vec<FlightDetails>>>,
    pub seat: Arc<dyn WorkerInvoker<SeatPreference>>,
    pub payment: Arc<dyn WorkerInvoker<PaymentOutcome>>,
}

impl BookingWorkers {
    pub fn new(
        search: Arc<dyn WorkerInvoker<Vec<FlightDetails>>>,
        seat: Arc<dyn WorkerInvoker<SeatPreference>>,
        payment: Arc<dyn WorkerInvoker<PaymentOutcome>>,
    ) -> Self {
        Self {
            search,
            seat,
            payment,
        }
    }

    /// Build a fresh node for `stage`, bound to that stage's worker.
    pub fn node(&self, stage: Stage) -> StageNode {
        match stage {
            Stage::SearchFlights => StageNode::SearchFlights(self.search.clone()),
            Stage::SelectSeat => StageNode::SelectSeat(self.seat.clone()),
            Stage::ProcessPayment => StageNode::ProcessPayment(self.payment.clone()),
        }
    }
}

/// One stage of the booking graph, bound to the worker it delegates to.
///
/// A node is consumed by `GraphExecutor::step`; the successor is always a
/// newly built node.
pub enum StageNode {
    SearchFlights(Arc<dyn WorkerInvoker<Vec<FlightDetails>>>),
    SelectSeat(Arc<dyn WorkerInvoker<SeatPreference>>),
    ProcessPayment(Arc<dyn WorkerInvoker<PaymentOutcome>>),
}

impl StageNode {
    pub fn stage(&self) -> Stage {
        match self {
            Self::SearchFlights(_) => Stage::SearchFlights,
            Self::SelectSeat(_) => Stage::SelectSeat,
            Self::ProcessPayment(_) => Stage::ProcessPayment,
        }
    }

    pub fn worker_name(&self) -> &str {
        match self {
            Self::SearchFlights(w) => w.name(),
            Self::SelectSeat(w) => w.name(),
            Self::ProcessPayment(w) => w.name(),
        }
    }
}

impl fmt::Debug for StageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageNode")
            .field("stage", &self.stage())
            .field("worker", &self.worker_name())
            .finish()
    }
}

/// What a step hands back to the executor.
#[derive(Debug)]
pub enum Outcome {
    /// Run this node next.
    Continue(StageNode),
    /// The run is over.
    Terminal { success: bool },
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    /// Stage of the successor node, if any.
    pub fn next_stage(&self) -> Option<Stage> {
        match self {
            Self::Continue(node) => Some(node.stage()),
            Self::Terminal { .. } => None,
        }
    }
}

/// Traveller inputs the stage prompts are built from.
#[derive(Debug, Clone)]
pub struct StageSettings {
    pub seat_preference: String,
    pub payment_info: String,
}

impl From<&RunConfig> for StageSettings {
    fn from(run: &RunConfig) -> Self {
        Self {
            seat_preference: run.seat_preference.clone(),
            payment_info: run.payment_info.clone(),
        }
    }
}

impl Default for StageSettings {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}
