//! Worker implementations for every stage.
//!
//! [`llm_workers`] and [`mock_workers`] build the same set of roles, so the
//! binary picks one at startup and the flows never know which it got.

pub mod llm;
pub mod mock;

use std::sync::Arc;

use wayfarer_core::booking::{
    FlightDetails, FlightSearchResult, PaymentOutcome, SeatPreference, TravelPlan,
};
use wayfarer_core::config::ModelConfig;
use wayfarer_core::traits::{LlmClient, WorkerInvoker};

use crate::graph::BookingWorkers;
use crate::prompts;

pub use llm::LlmWorker;
pub use mock::{
    MockBestFlightWorker, MockFlightDatabase, MockPaymentWorker, MockPlannerWorker,
    MockSearchWorker, MockSeatWorker,
};

/// Every worker role the flows use.
#[derive(Clone)]
pub struct WorkerSet {
    pub booking: BookingWorkers,
    /// Flight search used by the planner's delegation.
    pub delegate_search: Arc<dyn WorkerInvoker<Vec<FlightDetails>>>,
    pub planner: Arc<dyn WorkerInvoker<TravelPlan>>,
    pub best_flight: Arc<dyn WorkerInvoker<FlightSearchResult>>,
}

fn model_worker<T>(
    name: &str,
    client: &Arc<dyn LlmClient>,
    model: &ModelConfig,
    system: impl Into<String>,
) -> LlmWorker<T> {
    LlmWorker::new(name, client.clone(), model.clone(), system)
}

/// Model-backed workers sharing one client.
pub fn llm_workers(client: Arc<dyn LlmClient>, model: &ModelConfig) -> WorkerSet {
    let search = model_worker::<Vec<FlightDetails>>(
        "flight-search",
        &client,
        model,
        prompts::flight_search_system(),
    )
    .with_envelope("flights");
    let seat =
        model_worker::<SeatPreference>("seat-selection", &client, model, prompts::SEAT_SELECTION_SYSTEM);
    let payment = model_worker::<PaymentOutcome>("payment", &client, model, prompts::PAYMENT_SYSTEM);
    let delegate = model_worker::<Vec<FlightDetails>>(
        "flight-search-delegate",
        &client,
        model,
        prompts::delegate_search_system(),
    )
    .with_envelope("flights");
    let planner =
        model_worker::<TravelPlan>("travel-planner", &client, model, prompts::travel_planner_system());
    let best = model_worker::<FlightSearchResult>("best-flight", &client, model, prompts::best_flight_system());

    WorkerSet {
        booking: BookingWorkers::new(Arc::new(search), Arc::new(seat), Arc::new(payment)),
        delegate_search: Arc::new(delegate),
        planner: Arc::new(planner),
        best_flight: Arc::new(best),
    }
}

/// Offline workers over `db`. The payment worker declines the first
/// `declines` attempts.
pub fn mock_workers(db: Arc<MockFlightDatabase>, declines: usize) -> WorkerSet {
    WorkerSet {
        booking: BookingWorkers::new(
            Arc::new(MockSearchWorker::new(db.clone())),
            Arc::new(MockSeatWorker),
            Arc::new(MockPaymentWorker::declining(declines)),
        ),
        delegate_search: Arc::new(MockSearchWorker::new(db.clone())),
        planner: Arc::new(MockPlannerWorker::new(db.clone())),
        best_flight: Arc::new(MockBestFlightWorker::new(db)),
    }
}
