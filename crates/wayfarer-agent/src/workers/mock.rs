//! Offline workers over an in-memory flight table.
//!
//! They read the same prompts the model-backed workers get and answer
//! deterministically, so the whole booking flow can run without a provider
//! (`--mock`) and in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::BoxFuture;
use serde::Serialize;
use tracing::debug;

use wayfarer_core::booking::{
    FlightDetails, FlightSearchResult, PaymentOutcome, SeatPreference, TravelPlan,
};
use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::traits::{WorkerInvoker, WorkerOutput};
use wayfarer_core::types::ChatMessage;

/// The flights the mock workers know about.
#[derive(Debug, Clone)]
pub struct MockFlightDatabase {
    flights: Vec<FlightDetails>,
}

fn flight(number: &str, price: f64, from: &str, to: &str, date: NaiveDate, hours: f64) -> FlightDetails {
    FlightDetails {
        flight_number: number.to_string(),
        price,
        origin: from.to_string(),
        destination: to.to_string(),
        departure_date: date,
        arrival_date: date,
        duration_hours: hours,
    }
}

impl MockFlightDatabase {
    pub fn new(flights: Vec<FlightDetails>) -> Self {
        Self { flights }
    }

    /// Mock flight database.
    pub fn sample() -> Self {
        let may = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap_or_default();
        Self::new(vec![
            flight("AA123", 299.99, "SFO", "JFK", may(1), 5.5),
            flight("UA456", 349.99, "SFO", "JFK", may(1), 5.0),
            flight("AA124", 289.99, "JFK", "SFO", may(5), 6.0),
        ])
    }

    pub fn flights(&self) -> &[FlightDetails] {
        &self.flights
    }

    /// Flights on the route departing on the given date, in table order.
    pub fn search(&self, origin: &str, destination: &str, date: NaiveDate) -> Vec<FlightDetails> {
        self.flights
            .iter()
            .filter(|f| f.origin == origin && f.destination == destination && f.departure_date == date)
            .cloned()
            .collect()
    }
}

/// Pull `(origin, destination, date)` out of a "... from X to Y on/departing D" prompt.
fn parse_route(prompt: &str) -> Option<(String, String, NaiveDate)> {
    let words: Vec<&str> = prompt
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c == ',' || c == '.'))
        .collect();
    let after = |key: &str| {
        words
            .iter()
            .position(|w| *w == key)
            .and_then(|i| words.get(i + 1))
            .copied()
    };
    let origin = after("from")?;
    let destination = after("to")?;
    let date = after("departing").or_else(|| after("on"))?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some((origin.to_string(), destination.to_string(), date))
}

fn parse_return(prompt: &str) -> Option<NaiveDate> {
    let rest = prompt.split("returning ").nth(1)?;
    let date: String = rest.chars().take(10).collect();
    NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()
}

/// Value following `label` on its own prompt line.
fn line_value<'p>(prompt: &'p str, label: &str) -> Option<&'p str> {
    prompt
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
}

fn reply<T: Serialize>(prompt: &str, mut history: Vec<ChatMessage>, result: T) -> Result<WorkerOutput<T>> {
    let answer = serde_json::to_string(&result)?;
    history.push(ChatMessage::user(prompt));
    history.push(ChatMessage::assistant_text(answer));
    Ok(WorkerOutput::new(result, history))
}

/// Answers flight searches from the table.
pub struct MockSearchWorker {
    db: Arc<MockFlightDatabase>,
}

impl MockSearchWorker {
    pub fn new(db: Arc<MockFlightDatabase>) -> Self {
        Self { db }
    }
}

impl WorkerInvoker<Vec<FlightDetails>> for MockSearchWorker {
    fn name(&self) -> &str {
        "mock-flight-search"
    }

    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        history: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<WorkerOutput<Vec<FlightDetails>>>> {
        Box::pin(async move {
            let (origin, destination, date) = parse_route(prompt).ok_or_else(|| {
                WayfarerError::worker(self.name(), format!("cannot read a route from '{}'", prompt))
            })?;
            let flights = self.db.search(&origin, &destination, date);
            debug!(%origin, %destination, %date, found = flights.len(), "Mock search");
            reply(prompt, history, flights)
        })
    }
}

/// Picks a seat from keywords in the preference text.
///
/// "legroom" maps to row 14, otherwise row 8; "aisle" maps to C, "middle"
/// to B, anything else to the window seat A.
pub struct MockSeatWorker;

impl WorkerInvoker<SeatPreference> for MockSeatWorker {
    fn name(&self) -> &str {
        "mock-seat-selection"
    }

    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        history: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<WorkerOutput<SeatPreference>>> {
        Box::pin(async move {
            let wants = prompt.to_lowercase();
            let row = if wants.contains("legroom") { 14 } else { 8 };
            let letter = if wants.contains("aisle") {
                "C"
            } else if wants.contains("middle") {
                "B"
            } else {
                "A"
            };
            reply(prompt, history, SeatPreference::new(row, letter))
        })
    }
}

/// Charges the price in the payment prompt.
pub struct MockPaymentWorker {
    declines_left: AtomicUsize,
}

impl MockPaymentWorker {
    /// Decline the first `n` attempts, then approve.
    pub fn declining(n: usize) -> Self {
        Self {
            declines_left: AtomicUsize::new(n),
        }
    }

    fn take_decline(&self) -> bool {
        self.declines_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl WorkerInvoker<PaymentOutcome> for MockPaymentWorker {
    fn name(&self) -> &str {
        "mock-payment"
    }

    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        history: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<WorkerOutput<PaymentOutcome>>> {
        Box::pin(async move {
            let amount = line_value(prompt, "Price: $")
                .and_then(|p| p.parse::<f64>().ok())
                .ok_or_else(|| WayfarerError::worker(self.name(), "payment prompt has no price"))?;
            let method = line_value(prompt, "Payment info:").unwrap_or("card");

            let outcome = if method.to_lowercase().contains("expired") {
                PaymentOutcome::failure("Card expired")
            } else if self.take_decline() {
                PaymentOutcome::failure("Card declined by issuer")
            } else {
                let confirmation = format!("WF{:06}", rand::random::<u32>() % 1_000_000);
                PaymentOutcome::success(confirmation, amount, method)
            };
            reply(prompt, history, outcome)
        })
    }
}

/// Builds a travel plan from the cheapest matching flights.
pub struct MockPlannerWorker {
    db: Arc<MockFlightDatabase>,
}

impl MockPlannerWorker {
    pub fn new(db: Arc<MockFlightDatabase>) -> Self {
        Self { db }
    }
}

fn cheapest(mut flights: Vec<FlightDetails>) -> Option<FlightDetails> {
    flights.sort_by(|a, b| a.price.total_cmp(&b.price));
    flights.into_iter().next()
}

impl WorkerInvoker<TravelPlan> for MockPlannerWorker {
    fn name(&self) -> &str {
        "mock-travel-planner"
    }

    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        history: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<WorkerOutput<TravelPlan>>> {
        Box::pin(async move {
            let (origin, destination, date) = parse_route(prompt).ok_or_else(|| {
                WayfarerError::worker(self.name(), "cannot read the trip from the planning prompt")
            })?;
            let outbound = cheapest(self.db.search(&origin, &destination, date)).ok_or_else(|| {
                WayfarerError::worker(self.name(), format!("no flights from {} to {}", origin, destination))
            })?;
            let return_date = parse_return(prompt);
            let return_flight =
                return_date.and_then(|d| cheapest(self.db.search(&destination, &origin, d)));

            let nights = return_date
                .map(|d| (d - date).num_days().max(1))
                .unwrap_or(1) as f64;
            let flights_total = outbound.price + return_flight.as_ref().map_or(0.0, |f| f.price);

            let plan = TravelPlan {
                hotel_recommendations: vec![
                    format!("Central business hotel in {}", destination),
                    format!("Boutique guesthouse near {} old town", destination),
                ],
                activity_suggestions: vec![
                    "Guided walking tour".to_string(),
                    "Local food market visit".to_string(),
                    "Museum day pass".to_string(),
                ],
                total_budget: ((flights_total + nights * 220.0) * 100.0).round() / 100.0,
                outbound_flight: outbound,
                return_flight,
            };
            reply(prompt, history, plan)
        })
    }
}

/// Single-call search that also picks the best flight: lowest price, then
/// shortest duration.
pub struct MockBestFlightWorker {
    db: Arc<MockFlightDatabase>,
}

impl MockBestFlightWorker {
    pub fn new(db: Arc<MockFlightDatabase>) -> Self {
        Self { db }
    }
}

impl WorkerInvoker<FlightSearchResult> for MockBestFlightWorker {
    fn name(&self) -> &str {
        "mock-best-flight"
    }

    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        history: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<WorkerOutput<FlightSearchResult>>> {
        Box::pin(async move {
            let (origin, destination, date) = parse_route(prompt).ok_or_else(|| {
                WayfarerError::worker(self.name(), format!("cannot read a route from '{}'", prompt))
            })?;
            let found = self.db.search(&origin, &destination, date);
            let best = found
                .iter()
                .min_by(|a, b| {
                    a.price
                        .total_cmp(&b.price)
                        .then(a.duration_hours.total_cmp(&b.duration_hours))
                })
                .cloned();
            let explanation = match &best {
                Some(f) => format!(
                    "{} is the cheapest of {} option(s) at ${:.2} for {}h",
                    f.flight_number,
                    found.len(),
                    f.price,
                    f.duration_hours
                ),
                None => format!("No flights from {} to {} on {}", origin, destination, date),
            };
            reply(
                prompt,
                history,
                FlightSearchResult {
                    found_flights: found,
                    best_flight: best,
                    explanation,
                },
            )
        })
    }
}
