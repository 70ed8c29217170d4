//! Travel planning through delegated flight searches.

use std::sync::Arc;

use wayfarer_agent::{mock_workers, DelegationInvoker, DispatchMode, MockFlightDatabase, TravelPlanner};
use wayfarer_core::booking::{FlightDetails, TravelPlan};
use wayfarer_core::{UsageMeter, WayfarerError};
use wayfarer_test_utils::fixtures::{date, flight, return_flight, sample_flight, sample_trip};
use wayfarer_test_utils::ScriptedWorker;

fn plan_for(outbound: FlightDetails, ret: Option<FlightDetails>) -> TravelPlan {
    TravelPlan {
        outbound_flight: outbound,
        return_flight: ret,
        hotel_recommendations: vec!["Harbor Inn".into()],
        activity_suggestions: vec!["Museum".into()],
        total_budget: 1200.0,
    }
}

#[tokio::test]
async fn outbound_only_uses_one_unit_beyond_controller() {
    let search = Arc::new(ScriptedWorker::new("search").then_ok(vec![sample_flight()]));
    let planner = Arc::new(ScriptedWorker::new("planner").then_ok(plan_for(sample_flight(), None)));
    let meter = UsageMeter::new(10);

    let outcome = TravelPlanner::new(
        planner.clone(),
        DelegationInvoker::<FlightDetails>::new(search.clone(), DispatchMode::Sequential),
    )
    .plan(&sample_trip(), &meter)
    .await
    .unwrap();

    assert_eq!(outcome.flights, vec![sample_flight()]);
    assert_eq!(outcome.used, 2);
    assert_eq!(search.call_count(), 1);
    assert!(planner.calls()[0].prompt.contains("AA123"));
}

#[tokio::test]
async fn return_date_adds_one_unit_and_appends_return_flights() {
    for mode in [DispatchMode::Sequential, DispatchMode::Concurrent] {
        let search = Arc::new(
            ScriptedWorker::new("search")
                .then_ok(vec![sample_flight()])
                .then_ok(vec![return_flight()]),
        );
        let planner = Arc::new(
            ScriptedWorker::new("planner")
                .then_ok(plan_for(sample_flight(), Some(return_flight()))),
        );
        let meter = UsageMeter::new(10);
        let trip = sample_trip().with_return(date(2024, 5, 5));

        let outcome = TravelPlanner::new(planner, DelegationInvoker::<FlightDetails>::new(search.clone(), mode))
            .plan(&trip, &meter)
            .await
            .unwrap();

        assert_eq!(outcome.used, 3, "mode {:?}", mode);
        let numbers: Vec<_> = outcome.flights.iter().map(|f| f.flight_number.as_str()).collect();
        assert_eq!(numbers, vec!["AA123", "AA124"], "mode {:?}", mode);
        assert_eq!(outcome.plan.return_flight, Some(return_flight()));
    }
}

#[tokio::test]
async fn concurrent_results_keep_request_order() {
    let search = Arc::new(
        ScriptedWorker::new("search")
            .then_ok(vec![
                sample_flight(),
                flight("UA456", "SFO", "JFK", date(2024, 5, 1), 349.99),
            ])
            .then_ok(vec![return_flight()]),
    );
    let invoker = DelegationInvoker::<FlightDetails>::new(search, DispatchMode::Concurrent);
    let meter = UsageMeter::new(2);

    let flights = invoker
        .find_flights(&meter, "SFO", "JFK", date(2024, 5, 1), Some(date(2024, 5, 5)))
        .await
        .unwrap();
    let numbers: Vec<_> = flights.iter().map(|f| f.flight_number.as_str()).collect();
    assert_eq!(numbers, vec!["AA123", "UA456", "AA124"]);
    assert_eq!(meter.used(), 2);
}

#[tokio::test]
async fn subcalls_share_the_controller_budget() {
    let search = Arc::new(
        ScriptedWorker::new("search")
            .then_ok(vec![sample_flight()])
            .then_ok(vec![return_flight()]),
    );
    let planner = Arc::new(ScriptedWorker::<TravelPlan>::new("planner"));
    // Controller + outbound fit; the return search does not.
    let meter = UsageMeter::new(2);
    let trip = sample_trip().with_return(date(2024, 5, 5));

    let err = TravelPlanner::new(
        planner.clone(),
        DelegationInvoker::<FlightDetails>::new(search.clone(), DispatchMode::Sequential),
    )
    .plan(&trip, &meter)
    .await
    .unwrap_err();

    assert!(matches!(err, WayfarerError::BudgetExceeded { limit: 2, .. }));
    assert_eq!(meter.used(), 2);
    assert_eq!(search.call_count(), 1);
    assert_eq!(planner.call_count(), 0);
}

#[tokio::test]
async fn mock_planner_builds_round_trip() {
    let workers = mock_workers(Arc::new(MockFlightDatabase::sample()), 0);
    let meter = UsageMeter::new(10);
    let trip = sample_trip().with_return(date(2024, 5, 5));

    let outcome = TravelPlanner::new(
        workers.planner,
        DelegationInvoker::<FlightDetails>::new(workers.delegate_search, DispatchMode::Concurrent),
    )
    .plan(&trip, &meter)
    .await
    .unwrap();

    assert_eq!(outcome.flights.len(), 3);
    assert_eq!(outcome.plan.outbound_flight.flight_number, "AA123");
    assert_eq!(
        outcome.plan.return_flight.map(|f| f.flight_number),
        Some("AA124".to_string())
    );
    assert_eq!(meter.used(), 3);
}
