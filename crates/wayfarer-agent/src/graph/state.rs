use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use wayfarer_core::booking::{FlightDetails, PaymentOutcome, SeatPreference, TripParams};
use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::types::{ChatMessage, Stage};

/// Mutable context threaded through the booking stages of one run.
///
/// Ordering of the result slots is enforced on every mutation: a seat can
/// only be chosen once a flight is, and a payment only once both are.
/// `booking_confirmed` is true exactly when the recorded payment succeeded.
///
/// Conversation histories are kept per stage and are append-only. A stage
/// that is entered again sees its own earlier turns and nobody else's.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    trip: TripParams,
    selected_flight: Option<FlightDetails>,
    selected_seat: Option<SeatPreference>,
    payment: Option<PaymentOutcome>,
    booking_confirmed: bool,
    failed_payments: Vec<String>,
    histories: HashMap<String, Vec<ChatMessage>>,
}

impl RunState {
    pub fn new(trip: TripParams) -> Self {
        Self {
            trip,
            selected_flight: None,
            selected_seat: None,
            payment: None,
            booking_confirmed: false,
            failed_payments: Vec::new(),
            histories: HashMap::new(),
        }
    }

    pub fn trip(&self) -> &TripParams {
        &self.trip
    }

    pub fn origin(&self) -> &str {
        &self.trip.origin
    }

    pub fn destination(&self) -> &str {
        &self.trip.destination
    }

    pub fn travel_date(&self) -> NaiveDate {
        self.trip.travel_date
    }

    pub fn selected_flight(&self) -> Option<&FlightDetails> {
        self.selected_flight.as_ref()
    }

    pub fn selected_seat(&self) -> Option<&SeatPreference> {
        self.selected_seat.as_ref()
    }

    pub fn payment(&self) -> Option<&PaymentOutcome> {
        self.payment.as_ref()
    }

    pub fn booking_confirmed(&self) -> bool {
        self.booking_confirmed
    }

    /// Reasons of every declined payment in this run, oldest first.
    pub fn failed_payments(&self) -> &[String] {
        &self.failed_payments
    }

    /// Store the flight the run will book.
    pub fn select_flight(&mut self, flight: FlightDetails) -> Result<()> {
        if self.selected_seat.is_some() || self.payment.is_some() {
            return Err(WayfarerError::InvariantViolation(
                "cannot select a flight while a seat or payment is recorded; restart first".into(),
            ));
        }
        self.selected_flight = Some(flight);
        Ok(())
    }

    /// Store the seat. Requires a selected flight.
    pub fn select_seat(&mut self, seat: SeatPreference) -> Result<()> {
        if self.selected_flight.is_none() {
            return Err(WayfarerError::InvariantViolation(
                "seat selected before a flight".into(),
            ));
        }
        if self.payment.is_some() {
            return Err(WayfarerError::InvariantViolation(
                "seat changed after payment was recorded".into(),
            ));
        }
        self.selected_seat = Some(seat);
        Ok(())
    }

    /// Store the payment outcome. Requires both a flight and a seat.
    pub fn record_payment(&mut self, outcome: PaymentOutcome) -> Result<()> {
        if self.selected_flight.is_none() || self.selected_seat.is_none() {
            return Err(WayfarerError::InvariantViolation(
                "payment recorded before flight and seat were selected".into(),
            ));
        }
        if let PaymentOutcome::Failure { ref reason } = outcome {
            self.failed_payments.push(reason.clone());
        }
        self.booking_confirmed = outcome.is_success();
        self.payment = Some(outcome);
        Ok(())
    }

    /// Discard flight, seat and payment so the flow can start over.
    /// Histories and the declined-payment log are kept.
    pub fn restart(&mut self) {
        self.selected_flight = None;
        self.selected_seat = None;
        self.payment = None;
        self.booking_confirmed = false;
    }

    /// History of one stage (empty if the stage never ran).
    pub fn history(&self, stage: Stage) -> &[ChatMessage] {
        self.histories
            .get(stage.history_key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append messages to one stage's history.
    pub fn append_history(
        &mut self,
        stage: Stage,
        messages: impl IntoIterator<Item = ChatMessage>,
    ) {
        self.histories
            .entry(stage.history_key().to_string())
            .or_default()
            .extend(messages);
    }

    /// All histories keyed by stage history key.
    pub fn histories(&self) -> &HashMap<String, Vec<ChatMessage>> {
        &self.histories
    }

    /// Re-check the slot ordering invariants.
    pub fn check_invariants(&self) -> Result<()> {
        if self.selected_seat.is_some() && self.selected_flight.is_none() {
            return Err(WayfarerError::InvariantViolation(
                "seat is set without a flight".into(),
            ));
        }
        if self.payment.is_some() && (self.selected_flight.is_none() || self.selected_seat.is_none())
        {
            return Err(WayfarerError::InvariantViolation(
                "payment is set without flight and seat".into(),
            ));
        }
        let paid = self.payment.as_ref().is_some_and(PaymentOutcome::is_success);
        if self.booking_confirmed != paid {
            return Err(WayfarerError::InvariantViolation(
                "booking_confirmed does not match the payment outcome".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_test_utils::fixtures::{sample_flight, sample_trip};

    #[test]
    fn test_seat_requires_flight() {
        let mut state = RunState::new(sample_trip());
        let err = state.select_seat(SeatPreference::new(5, "A")).unwrap_err();
        assert!(matches!(err, WayfarerError::InvariantViolation(_)));
        assert!(state.selected_seat().is_none());
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_payment_requires_flight_and_seat() {
        let mut state = RunState::new(sample_trip());
        state.select_flight(sample_flight()).unwrap();
        assert!(state
            .record_payment(PaymentOutcome::success("C1", 299.99, "credit_card"))
            .is_err());

        state.select_seat(SeatPreference::new(5, "A")).unwrap();
        state
            .record_payment(PaymentOutcome::success("C1", 299.99, "credit_card"))
            .unwrap();
        assert!(state.booking_confirmed());
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_failed_payment_not_confirmed() {
        let mut state = RunState::new(sample_trip());
        state.select_flight(sample_flight()).unwrap();
        state.select_seat(SeatPreference::new(5, "A")).unwrap();
        state
            .record_payment(PaymentOutcome::failure("card declined"))
            .unwrap();
        assert!(!state.booking_confirmed());
        assert_eq!(state.failed_payments(), ["card declined".to_string()]);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_restart_keeps_histories() {
        let mut state = RunState::new(sample_trip());
        state.append_history(Stage::SearchFlights, vec![ChatMessage::user("find")]);
        state.select_flight(sample_flight()).unwrap();
        state.select_seat(SeatPreference::new(5, "A")).unwrap();
        state.record_payment(PaymentOutcome::failure("declined")).unwrap();

        assert!(state.select_flight(sample_flight()).is_err());
        state.restart();

        assert!(state.selected_flight().is_none());
        assert!(state.selected_seat().is_none());
        assert!(state.payment().is_none());
        assert_eq!(state.history(Stage::SearchFlights).len(), 1);
        assert_eq!(state.failed_payments().len(), 1);
        state.select_flight(sample_flight()).unwrap();
    }

    #[test]
    fn test_histories_are_per_stage() {
        let mut state = RunState::new(sample_trip());
        state.append_history(Stage::SearchFlights, vec![ChatMessage::user("a")]);
        state.append_history(Stage::SelectSeat, vec![ChatMessage::user("b")]);
        state.append_history(Stage::SearchFlights, vec![ChatMessage::assistant_text("c")]);

        let search: Vec<_> = state
            .history(Stage::SearchFlights)
            .iter()
            .map(|m| m.text())
            .collect();
        assert_eq!(search, vec!["a", "c"]);
        assert_eq!(state.history(Stage::SelectSeat).len(), 1);
        assert!(state.history(Stage::ProcessPayment).is_empty());
        assert_eq!(state.histories().len(), 2);
    }

    #[test]
    fn test_trip_accessors() {
        let state = RunState::new(sample_trip());
        assert_eq!(state.origin(), "SFO");
        assert_eq!(state.destination(), "JFK");
        assert_eq!(state.travel_date(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }
}
