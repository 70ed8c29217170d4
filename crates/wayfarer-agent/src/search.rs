//! Single-worker flight search: one call returns the candidates and the
//! worker's pick among them.

use std::sync::Arc;

use tracing::info;

use wayfarer_core::booking::{FlightSearchResult, TripParams, Validate};
use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::traits::WorkerInvoker;
use wayfarer_core::usage::UsageMeter;

use crate::prompts::search_prompt;

pub struct BestFlightSearch {
    worker: Arc<dyn WorkerInvoker<FlightSearchResult>>,
}

impl BestFlightSearch {
    pub fn new(worker: Arc<dyn WorkerInvoker<FlightSearchResult>>) -> Self {
        Self { worker }
    }

    /// Run the search on `meter` and check the answer is consistent.
    pub async fn search(&self, trip: &TripParams, meter: &UsageMeter) -> Result<FlightSearchResult> {
        meter.reserve_one()?;
        let prompt = search_prompt(&trip.origin, &trip.destination, trip.travel_date);
        let result = self.worker.invoke(&prompt, Vec::new()).await?.result;
        result
            .validate()
            .map_err(|detail| WayfarerError::validation(self.worker.name(), detail))?;

        info!(
            found = result.found_flights.len(),
            best = ?result.best_flight.as_ref().map(|f| f.flight_number.as_str()),
            used = meter.used(),
            "Flight search complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_test_utils::fixtures::{return_flight, sample_flight, sample_trip};
    use wayfarer_test_utils::ScriptedWorker;

    #[tokio::test]
    async fn test_best_must_be_among_found() {
        let worker = ScriptedWorker::new("best").then_ok(FlightSearchResult {
            found_flights: vec![sample_flight()],
            best_flight: Some(return_flight()),
            explanation: "cheapest".into(),
        });
        let meter = UsageMeter::new(5);
        let err = BestFlightSearch::new(Arc::new(worker))
            .search(&sample_trip(), &meter)
            .await
            .unwrap_err();
        assert!(matches!(err, WayfarerError::Validation { .. }));
        assert_eq!(meter.used(), 1);
    }

    #[tokio::test]
    async fn test_search_uses_one_unit() {
        let worker = Arc::new(ScriptedWorker::new("best").then_ok(FlightSearchResult {
            found_flights: vec![sample_flight()],
            best_flight: Some(sample_flight()),
            explanation: "only option".into(),
        }));
        let meter = UsageMeter::new(5);
        let result = BestFlightSearch::new(worker.clone())
            .search(&sample_trip(), &meter)
            .await
            .unwrap();
        assert_eq!(result.best_flight, Some(sample_flight()));
        assert_eq!(meter.used(), 1);
        assert_eq!(worker.calls()[0].prompt, "Find flights from SFO to JFK on 2024-05-01");
    }

    #[tokio::test]
    async fn test_exhausted_meter_skips_call() {
        let worker = Arc::new(ScriptedWorker::<FlightSearchResult>::new("best"));
        let meter = UsageMeter::new(0);
        let err = BestFlightSearch::new(worker.clone())
            .search(&sample_trip(), &meter)
            .await
            .unwrap_err();
        assert!(err.is_run_fatal());
        assert_eq!(worker.call_count(), 0);
    }
}
