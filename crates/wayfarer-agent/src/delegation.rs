//! One-level delegation: a controller hands sub-requests to a specialist
//! worker and merges what comes back.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::try_join_all;
use tracing::{debug, info};

use wayfarer_core::booking::{FlightDetails, TravelPlan, TripParams};
use wayfarer_core::error::Result;
use wayfarer_core::traits::WorkerInvoker;
use wayfarer_core::usage::UsageMeter;

use crate::prompts::{plan_prompt, search_prompt};

/// How sub-calls are issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// One after another, in request order.
    #[default]
    Sequential,
    /// All at once; results are still merged in request order.
    Concurrent,
}

impl DispatchMode {
    pub fn from_flag(concurrent: bool) -> Self {
        if concurrent {
            Self::Concurrent
        } else {
            Self::Sequential
        }
    }
}

/// Issues sub-calls to a specialist worker, each charged to the caller's meter.
///
/// Every sub-call starts from an empty history. If any sub-call fails the
/// error is returned as is and nothing is merged.
pub struct DelegationInvoker<T> {
    worker: Arc<dyn WorkerInvoker<Vec<T>>>,
    mode: DispatchMode,
}

impl<T: Send + 'static> DelegationInvoker<T> {
    pub fn new(worker: Arc<dyn WorkerInvoker<Vec<T>>>, mode: DispatchMode) -> Self {
        Self { worker, mode }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    async fn call(&self, meter: &UsageMeter, prompt: &str) -> Result<Vec<T>> {
        let used = meter.reserve_one()?;
        debug!(worker = %self.worker.name(), used, limit = meter.limit(), "Delegating");
        let output = self.worker.invoke(prompt, Vec::new()).await?;
        Ok(output.result)
    }

    /// Run one sub-call per prompt and concatenate the results in prompt order.
    pub async fn fan_out(&self, meter: &UsageMeter, prompts: &[String]) -> Result<Vec<T>> {
        let batches = match self.mode {
            DispatchMode::Sequential => {
                let mut batches = Vec::with_capacity(prompts.len());
                for prompt in prompts {
                    batches.push(self.call(meter, prompt).await?);
                }
                batches
            }
            DispatchMode::Concurrent => {
                try_join_all(prompts.iter().map(|p| self.call(meter, p))).await?
            }
        };
        Ok(batches.into_iter().flatten().collect())
    }
}

impl DelegationInvoker<FlightDetails> {
    /// Outbound search, plus a return search when `return_date` is set.
    /// Return flights follow the outbound ones.
    pub async fn find_flights(
        &self,
        meter: &UsageMeter,
        origin: &str,
        destination: &str,
        departure: NaiveDate,
        return_date: Option<NaiveDate>,
    ) -> Result<Vec<FlightDetails>> {
        let mut prompts = vec![search_prompt(origin, destination, departure)];
        if let Some(ret) = return_date {
            prompts.push(search_prompt(destination, origin, ret));
        }
        self.fan_out(meter, &prompts).await
    }
}

/// A finished plan and the flights it was built from.
#[derive(Debug, Clone)]
pub struct PlanningOutcome {
    pub plan: TravelPlan,
    pub flights: Vec<FlightDetails>,
    /// Units charged to the meter, the planner's own call included.
    pub used: u64,
}

/// Controller that plans a trip: it searches flights through a
/// [`DelegationInvoker`] and then asks the planner worker for a `TravelPlan`.
pub struct TravelPlanner {
    planner: Arc<dyn WorkerInvoker<TravelPlan>>,
    search: DelegationInvoker<FlightDetails>,
}

impl TravelPlanner {
    pub fn new(
        planner: Arc<dyn WorkerInvoker<TravelPlan>>,
        search: DelegationInvoker<FlightDetails>,
    ) -> Self {
        Self { planner, search }
    }

    /// The planner's own unit is reserved before any delegation, so a
    /// budget of one cannot even start a search.
    pub async fn plan(&self, trip: &TripParams, meter: &UsageMeter) -> Result<PlanningOutcome> {
        meter.reserve_one()?;
        info!(
            origin = %trip.origin,
            destination = %trip.destination,
            return_date = ?trip.return_date,
            mode = ?self.search.mode(),
            "Planning trip"
        );

        let flights = self
            .search
            .find_flights(
                meter,
                &trip.origin,
                &trip.destination,
                trip.travel_date,
                trip.return_date,
            )
            .await?;
        debug!(found = flights.len(), used = meter.used(), "Delegated search complete");

        let prompt = plan_prompt(trip, &flights);
        let plan = self.planner.invoke(&prompt, Vec::new()).await?.result;
        info!(
            outbound = %plan.outbound_flight.flight_number,
            total_budget = plan.total_budget,
            used = meter.used(),
            "Travel plan ready"
        );

        Ok(PlanningOutcome {
            plan,
            flights,
            used: meter.used(),
        })
    }
}
