use std::path::PathBuf;

use chrono::NaiveDate;
use tempfile::TempDir;

use wayfarer_core::booking::{FlightDetails, PaymentOutcome, SeatPreference, TripParams};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
}

/// SFO → JFK on 2024-05-01.
pub fn sample_trip() -> TripParams {
    TripParams::new("SFO", "JFK", date(2024, 5, 1))
}

/// AA123 SFO → JFK, 2024-05-01, $299.99, 5.5h.
pub fn sample_flight() -> FlightDetails {
    flight("AA123", "SFO", "JFK", date(2024, 5, 1), 299.99)
}

/// AA124 JFK → SFO, 2024-05-05, $289.99.
pub fn return_flight() -> FlightDetails {
    flight("AA124", "JFK", "SFO", date(2024, 5, 5), 289.99)
}

pub fn flight(number: &str, origin: &str, destination: &str, on: NaiveDate, price: f64) -> FlightDetails {
    FlightDetails {
        flight_number: number.to_string(),
        price,
        origin: origin.to_string(),
        destination: destination.to_string(),
        departure_date: on,
        arrival_date: on,
        duration_hours: 5.5,
    }
}

pub fn seat(row: i64, letter: &str) -> SeatPreference {
    SeatPreference::new(row, letter)
}

pub fn paid(amount: f64) -> PaymentOutcome {
    PaymentOutcome::success("CONF123", amount, "Credit card ending in 1234")
}

pub fn declined() -> PaymentOutcome {
    PaymentOutcome::failure("Card declined")
}

/// Write `content` to `wayfarer.toml` in a fresh temp dir. Keep the
/// returned dir alive for as long as the path is used.
pub fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("wayfarer.toml");
    std::fs::write(&path, content).expect("write config");
    (dir, path)
}
