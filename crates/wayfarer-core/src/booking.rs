//! Data contracts exchanged with booking workers.
//!
//! These types are what workers hand back across the `WorkerInvoker`
//! boundary. Deserialization only checks shape; [`Validate`] checks the
//! value constraints (positive prices, airport codes, date ordering).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Seat letters available on every row.
pub const SEAT_LETTERS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];
/// Highest row number on the aircraft.
pub const MAX_ROW: i64 = 30;

/// Value-level validation for worker results.
pub trait Validate {
    /// Collect every constraint violation. Empty means valid.
    fn issues(&self) -> Vec<String>;

    fn validate(&self) -> std::result::Result<(), String> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues.join("; "))
        }
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn issues(&self) -> Vec<String> {
        self.iter()
            .enumerate()
            .flat_map(|(i, item)| {
                item.issues()
                    .into_iter()
                    .map(move |issue| format!("[{}] {}", i, issue))
            })
            .collect()
    }
}

fn is_airport_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Details of a flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightDetails {
    /// Unique flight identifier (e.g. "AA123").
    pub flight_number: String,
    /// Current price in USD.
    pub price: f64,
    /// Three-letter IATA code of the departure airport.
    pub origin: String,
    /// Three-letter IATA code of the arrival airport.
    pub destination: String,
    pub departure_date: NaiveDate,
    pub arrival_date: NaiveDate,
    /// Total duration in hours (5.5 = 5h30m).
    pub duration_hours: f64,
}

impl Validate for FlightDetails {
    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.flight_number.trim().is_empty() {
            issues.push("flight_number is empty".to_string());
        }
        if !(self.price > 0.0) {
            issues.push(format!("price must be positive, got {}", self.price));
        }
        if !is_airport_code(&self.origin) {
            issues.push(format!("origin '{}' is not a 3-letter airport code", self.origin));
        }
        if !is_airport_code(&self.destination) {
            issues.push(format!(
                "destination '{}' is not a 3-letter airport code",
                self.destination
            ));
        }
        if self.arrival_date < self.departure_date {
            issues.push(format!(
                "arrival_date {} is before departure_date {}",
                self.arrival_date, self.departure_date
            ));
        }
        if !(self.duration_hours > 0.0) {
            issues.push(format!(
                "duration_hours must be positive, got {}",
                self.duration_hours
            ));
        }
        issues
    }
}

/// Seat choice returned by the seat worker.
///
/// Rows and letters are kept loose here (a worker may answer row 0 or
/// seat "Z"); [`SeatPreference::check_range`] is what the booking flow
/// uses to decide whether to ask again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatPreference {
    /// Row number (valid range 1-30).
    pub row: i64,
    /// Seat letter A-F. A/F are window, B/E middle, C/D aisle.
    pub seat: String,
    pub is_window: bool,
    pub is_extra_legroom: bool,
}

impl SeatPreference {
    pub fn new(row: i64, seat: impl Into<String>) -> Self {
        let seat = seat.into();
        let is_window = seat == "A" || seat == "F";
        Self {
            row,
            seat,
            is_window,
            is_extra_legroom: matches!(row, 1 | 14 | 20),
        }
    }

    /// Check the row is in 1..=30 and the letter is one of A-F.
    pub fn check_range(&self) -> std::result::Result<(), String> {
        if !(1..=MAX_ROW).contains(&self.row) {
            return Err(format!("row {} is outside 1-{}", self.row, MAX_ROW));
        }
        if !SEAT_LETTERS.contains(&self.seat.as_str()) {
            return Err(format!("seat '{}' is not one of A-F", self.seat));
        }
        Ok(())
    }

    /// Seat label as printed on a boarding pass, e.g. "14A".
    pub fn label(&self) -> String {
        format!("{}{}", self.row, self.seat)
    }
}

/// Only the shape is checked here. Row and letter ranges are left to
/// [`SeatPreference::check_range`] so an out-of-range answer reaches the
/// booking flow and is asked again.
impl Validate for SeatPreference {
    fn issues(&self) -> Vec<String> {
        if self.seat.trim().is_empty() {
            vec!["seat letter is empty".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Result of a payment attempt.
///
/// A declined payment is an ordinary value, not an error: it is what sends
/// the booking flow back to flight search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum PaymentOutcome {
    #[serde(rename = "success")]
    Success {
        confirmation_number: String,
        total_amount: f64,
        payment_method: String,
    },
    #[serde(rename = "failed")]
    Failure { reason: String },
}

impl PaymentOutcome {
    pub fn success(
        confirmation_number: impl Into<String>,
        total_amount: f64,
        payment_method: impl Into<String>,
    ) -> Self {
        Self::Success {
            confirmation_number: confirmation_number.into(),
            total_amount,
            payment_method: payment_method.into(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl Validate for PaymentOutcome {
    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        match self {
            Self::Success {
                confirmation_number,
                total_amount,
                payment_method,
            } => {
                if confirmation_number.trim().is_empty() {
                    issues.push("confirmation_number is empty".to_string());
                }
                if !(*total_amount > 0.0) {
                    issues.push(format!("total_amount must be positive, got {}", total_amount));
                }
                if payment_method.trim().is_empty() {
                    issues.push("payment_method is empty".to_string());
                }
            }
            Self::Failure { reason } => {
                if reason.trim().is_empty() {
                    issues.push("failure reason is empty".to_string());
                }
            }
        }
        issues
    }
}

/// Complete travel plan produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelPlan {
    pub outbound_flight: FlightDetails,
    #[serde(default)]
    pub return_flight: Option<FlightDetails>,
    pub hotel_recommendations: Vec<String>,
    pub activity_suggestions: Vec<String>,
    /// Total budget for the whole trip in USD.
    pub total_budget: f64,
}

impl Validate for TravelPlan {
    fn issues(&self) -> Vec<String> {
        let mut issues: Vec<String> = self
            .outbound_flight
            .issues()
            .into_iter()
            .map(|i| format!("outbound_flight: {}", i))
            .collect();
        if let Some(ref ret) = self.return_flight {
            issues.extend(ret.issues().into_iter().map(|i| format!("return_flight: {}", i)));
        }
        if !(self.total_budget > 0.0) {
            issues.push(format!("total_budget must be positive, got {}", self.total_budget));
        }
        issues
    }
}

/// Answer of the single-worker best-flight search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSearchResult {
    pub found_flights: Vec<FlightDetails>,
    #[serde(default)]
    pub best_flight: Option<FlightDetails>,
    /// Why the best flight was chosen.
    pub explanation: String,
}

impl Validate for FlightSearchResult {
    fn issues(&self) -> Vec<String> {
        let mut issues = self.found_flights.issues();
        if let Some(ref best) = self.best_flight {
            if !self
                .found_flights
                .iter()
                .any(|f| f.flight_number == best.flight_number)
            {
                issues.push(format!(
                    "best_flight {} is not among found_flights",
                    best.flight_number
                ));
            }
        }
        issues
    }
}

/// Immutable parameters of one trip request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripParams {
    pub origin: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
}

impl TripParams {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        travel_date: NaiveDate,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            travel_date,
            return_date: None,
        }
    }

    pub fn with_return(mut self, return_date: NaiveDate) -> Self {
        self.return_date = Some(return_date);
        self
    }
}

impl Validate for TripParams {
    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !is_airport_code(&self.origin) {
            issues.push(format!("origin '{}' is not a 3-letter airport code", self.origin));
        }
        if !is_airport_code(&self.destination) {
            issues.push(format!(
                "destination '{}' is not a 3-letter airport code",
                self.destination
            ));
        }
        if self.origin == self.destination {
            issues.push("origin and destination are the same".to_string());
        }
        if let Some(ret) = self.return_date {
            if ret < self.travel_date {
                issues.push(format!(
                    "return_date {} is before travel_date {}",
                    ret, self.travel_date
                ));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn flight() -> FlightDetails {
        FlightDetails {
            flight_number: "AA123".into(),
            price: 299.99,
            origin: "SFO".into(),
            destination: "JFK".into(),
            departure_date: date(2024, 5, 1),
            arrival_date: date(2024, 5, 1),
            duration_hours: 5.5,
        }
    }

    #[test]
    fn test_flight_valid() {
        assert!(flight().validate().is_ok());
    }

    #[test]
    fn test_flight_issues() {
        let mut f = flight();
        f.price = 0.0;
        f.origin = "sf".into();
        f.duration_hours = -1.0;
        let issues = f.issues();
        assert_eq!(issues.len(), 3);
        assert!(issues[0].contains("price"));
        assert!(issues[1].contains("origin"));
        assert!(issues[2].contains("duration_hours"));
    }

    #[test]
    fn test_flight_arrival_before_departure() {
        let mut f = flight();
        f.arrival_date = date(2024, 4, 30);
        assert!(f.validate().unwrap_err().contains("arrival_date"));
    }

    #[test]
    fn test_flight_list_issues_are_indexed() {
        let mut bad = flight();
        bad.price = -5.0;
        let issues = vec![flight(), bad].issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("[1]"));
    }

    #[test]
    fn test_flight_deserializes_iso_dates() {
        let json = r#"{"flight_number":"UA456","price":349.99,"origin":"SFO","destination":"JFK",
            "departure_date":"2024-05-01","arrival_date":"2024-05-01","duration_hours":5.0}"#;
        let f: FlightDetails = serde_json::from_str(json).unwrap();
        assert_eq!(f.departure_date, date(2024, 5, 1));
    }

    #[test]
    fn test_seat_range() {
        assert!(SeatPreference::new(5, "A").check_range().is_ok());
        assert!(SeatPreference::new(30, "F").check_range().is_ok());
        assert!(SeatPreference::new(0, "A").check_range().unwrap_err().contains("row 0"));
        assert!(SeatPreference::new(31, "A").check_range().is_err());
        assert!(SeatPreference::new(12, "G").check_range().unwrap_err().contains("'G'"));
        assert!(SeatPreference::new(12, "a").check_range().is_err());
    }

    #[test]
    fn test_seat_validate_leaves_range_to_check_range() {
        assert!(SeatPreference::new(0, "Z").validate().is_ok());
        assert!(SeatPreference::new(31, "A").validate().is_ok());
        let err = SeatPreference::new(5, " ").validate().unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_seat_constructor_flags() {
        let seat = SeatPreference::new(14, "F");
        assert!(seat.is_window);
        assert!(seat.is_extra_legroom);
        assert_eq!(seat.label(), "14F");

        let seat = SeatPreference::new(7, "C");
        assert!(!seat.is_window);
        assert!(!seat.is_extra_legroom);
    }

    #[test]
    fn test_payment_outcome_tagging() {
        let ok: PaymentOutcome = serde_json::from_str(
            r#"{"status":"success","confirmation_number":"CONF-1","total_amount":299.99,"payment_method":"credit_card"}"#,
        )
        .unwrap();
        assert!(ok.is_success());

        let failed: PaymentOutcome =
            serde_json::from_str(r#"{"status":"failed","reason":"card declined"}"#).unwrap();
        assert_eq!(failed, PaymentOutcome::failure("card declined"));

        let json = serde_json::to_value(PaymentOutcome::failure("x")).unwrap();
        assert_eq!(json["status"], "failed");
    }

    #[test]
    fn test_payment_success_requires_amount() {
        let outcome = PaymentOutcome::success("CONF-1", 0.0, "credit_card");
        assert!(outcome.validate().unwrap_err().contains("total_amount"));
    }

    #[test]
    fn test_travel_plan_budget() {
        let plan = TravelPlan {
            outbound_flight: flight(),
            return_flight: None,
            hotel_recommendations: vec!["The Plaza".into()],
            activity_suggestions: vec![],
            total_budget: 0.0,
        };
        assert!(plan.validate().unwrap_err().contains("total_budget"));
    }

    #[test]
    fn test_search_result_best_must_be_found() {
        let mut other = flight();
        other.flight_number = "ZZ999".into();
        let result = FlightSearchResult {
            found_flights: vec![flight()],
            best_flight: Some(other),
            explanation: "cheapest".into(),
        };
        assert!(result.validate().unwrap_err().contains("ZZ999"));
    }

    #[test]
    fn test_trip_params() {
        let trip = TripParams::new("SFO", "JFK", date(2024, 5, 1)).with_return(date(2024, 5, 5));
        assert!(trip.validate().is_ok());

        let trip = TripParams::new("SFO", "SFO", date(2024, 5, 1)).with_return(date(2024, 4, 1));
        let issues = trip.issues();
        assert_eq!(issues.len(), 2);
    }
}
