//! Prompts sent to the booking workers.
//!
//! System prompts describe the worker's job and the exact JSON shape it
//! must answer with; the builders render the per-call user prompts from
//! run state.

use chrono::NaiveDate;

use wayfarer_core::booking::{FlightDetails, SeatPreference, TripParams};

/// Notice appended to the seat history before the seat worker is asked again.
pub const INVALID_SEAT_NOTICE: &str = "Invalid seat selection, please try again.";

const FLIGHT_SHAPE: &str = r#"{"flight_number": "AA123", "price": 299.99, "origin": "SFO", "destination": "JFK", "departure_date": "2024-05-01", "arrival_date": "2024-05-01", "duration_hours": 5.5}"#;

pub fn flight_search_system() -> String {
    format!(
        "Find available flights matching the search criteria.\n\n\
         Respond with a JSON object {{\"flights\": [...]}} where each flight looks like:\n{}\n\
         Use an empty list when nothing matches. Dates are YYYY-MM-DD.",
        FLIGHT_SHAPE
    )
}

pub fn delegate_search_system() -> String {
    format!(
        "You are a flight search specialist. Find the best flights matching the given criteria.\n\n\
         Respond with a JSON object {{\"flights\": [...]}} where each flight looks like:\n{}",
        FLIGHT_SHAPE
    )
}

pub const SEAT_SELECTION_SYSTEM: &str = "\
Help users select their seat based on their preferences.
- Rows 1, 14, and 20 have extra legroom
- Seats A and F are window seats
- Rows run from 1 to 30, seat letters from A to F

Respond with a JSON object:
{\"row\": 14, \"seat\": \"A\", \"is_window\": true, \"is_extra_legroom\": true}";

pub const PAYMENT_SYSTEM: &str = "\
Process payment and generate booking confirmation.

On success respond with:
{\"status\": \"success\", \"confirmation_number\": \"...\", \"total_amount\": 299.99, \"payment_method\": \"...\"}
If the payment cannot be completed respond with:
{\"status\": \"failed\", \"reason\": \"...\"}";

pub fn travel_planner_system() -> String {
    format!(
        "You are a travel planning expert. Your job is to:\n\
         1. Pick suitable flights from the search results you are given\n\
         2. Suggest hotels and activities at the destination\n\
         3. Calculate total budget including flights and estimated other expenses\n\n\
         Respond with a JSON object:\n\
         {{\"outbound_flight\": {flight}, \"return_flight\": null, \
         \"hotel_recommendations\": [\"...\"], \"activity_suggestions\": [\"...\"], \
         \"total_budget\": 1500.0}}",
        flight = FLIGHT_SHAPE
    )
}

pub fn best_flight_system() -> String {
    format!(
        "You are a flight search expert. Your job is to:\n\
         1. Search available flights for the request\n\
         2. Analyze the results to find the best option based on price and duration\n\
         3. Provide a clear explanation of why you chose that flight\n\n\
         Respond with a JSON object:\n\
         {{\"found_flights\": [{flight}], \"best_flight\": {flight}, \"explanation\": \"...\"}}\n\
         `best_flight` must be one of `found_flights`, or null when none were found.",
        flight = FLIGHT_SHAPE
    )
}

pub fn search_prompt(origin: &str, destination: &str, date: NaiveDate) -> String {
    format!("Find flights from {} to {} on {}", origin, destination, date)
}

pub fn payment_prompt(flight: &FlightDetails, seat: &SeatPreference, payment_info: &str) -> String {
    format!(
        "Process payment for:\n\
         Flight: {}\n\
         Price: ${}\n\
         Seat: {}\n\n\
         Payment info: {}",
        flight.flight_number,
        flight.price,
        seat.label(),
        payment_info
    )
}

pub fn plan_prompt(trip: &TripParams, flights: &[FlightDetails]) -> String {
    let mut prompt = format!(
        "Plan a trip from {} to {} departing {}",
        trip.origin, trip.destination, trip.travel_date
    );
    if let Some(ret) = trip.return_date {
        prompt.push_str(&format!(" and returning {}", ret));
    }
    prompt.push_str(".\n\nAvailable flights:\n");
    if flights.is_empty() {
        prompt.push_str("(none found)\n");
    }
    for f in flights {
        prompt.push_str(&format!(
            "- {} {}→{} on {}, ${:.2}, {}h\n",
            f.flight_number, f.origin, f.destination, f.departure_date, f.price, f.duration_hours
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight() -> FlightDetails {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        FlightDetails {
            flight_number: "AA123".into(),
            price: 299.99,
            origin: "SFO".into(),
            destination: "JFK".into(),
            departure_date: d,
            arrival_date: d,
            duration_hours: 5.5,
        }
    }

    #[test]
    fn test_search_prompt_format() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(
            search_prompt("SFO", "JFK", d),
            "Find flights from SFO to JFK on 2024-05-01"
        );
    }

    #[test]
    fn test_payment_prompt_includes_booking() {
        let p = payment_prompt(&flight(), &SeatPreference::new(14, "A"), "Credit card ending in 1234");
        assert!(p.contains("Flight: AA123"));
        assert!(p.contains("Price: $299.99"));
        assert!(p.contains("Seat: 14A"));
        assert!(p.ends_with("Payment info: Credit card ending in 1234"));
    }

    #[test]
    fn test_plan_prompt_lists_flights() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let trip = TripParams::new("SFO", "JFK", d)
            .with_return(NaiveDate::from_ymd_opt(2024, 5, 5).unwrap());
        let p = plan_prompt(&trip, &[flight()]);
        assert!(p.contains("returning 2024-05-05"));
        assert!(p.contains("- AA123 SFO→JFK on 2024-05-01, $299.99, 5.5h"));

        let empty = plan_prompt(&TripParams::new("SFO", "JFK", d), &[]);
        assert!(empty.contains("(none found)"));
    }
}
