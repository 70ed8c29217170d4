//! Programmatic handoff: the booking stages as plain sequential calls.
//!
//! Unlike the graph, a declined payment does not loop back to search; it
//! is simply the result of the run.

use tracing::{info, warn};

use wayfarer_core::booking::{FlightDetails, PaymentOutcome, SeatPreference, TripParams};
use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::types::ChatMessage;
use wayfarer_core::usage::UsageMeter;

use crate::graph::{BookingWorkers, StageSettings};
use crate::prompts::{payment_prompt, search_prompt, INVALID_SEAT_NOTICE};

/// How a handoff run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum HandoffOutcome {
    /// Search returned nothing; no seat or payment call was made.
    NoFlights,
    Booked {
        flight: FlightDetails,
        seat: SeatPreference,
        payment: PaymentOutcome,
    },
    Declined {
        flight: FlightDetails,
        seat: SeatPreference,
        reason: String,
    },
}

impl HandoffOutcome {
    pub fn is_booked(&self) -> bool {
        matches!(self, Self::Booked { .. })
    }
}

pub struct HandoffPipeline {
    workers: BookingWorkers,
    settings: StageSettings,
}

impl HandoffPipeline {
    pub fn new(workers: BookingWorkers, settings: StageSettings) -> Self {
        Self { workers, settings }
    }

    /// First flight the search worker offers, if any.
    pub async fn search_flights(
        &self,
        trip: &TripParams,
        meter: &UsageMeter,
    ) -> Result<Option<FlightDetails>> {
        meter.reserve_one()?;
        let prompt = search_prompt(&trip.origin, &trip.destination, trip.travel_date);
        let output = self.workers.search.invoke(&prompt, Vec::new()).await?;
        Ok(output.result.into_iter().next())
    }

    /// Ask for a seat until one is within rows 1-30 and letters A-F.
    ///
    /// The conversation is local to this call and carries the worker's
    /// earlier answers plus an "invalid seat" notice for each rejection.
    pub async fn select_seat(&self, meter: &UsageMeter) -> Result<SeatPreference> {
        let mut history: Vec<ChatMessage> = Vec::new();
        loop {
            meter.reserve_one()?;
            let rejected = match self
                .workers
                .seat
                .invoke(&self.settings.seat_preference, history.clone())
                .await
            {
                Ok(output) => match output.result.check_range() {
                    Ok(()) => return Ok(output.result),
                    Err(reason) => {
                        history = output.history;
                        reason
                    }
                },
                Err(WayfarerError::Validation { detail, .. }) => detail,
                Err(e) => return Err(e),
            };
            warn!(reason = %rejected, used = meter.used(), "Invalid seat selection, asking again");
            history.push(ChatMessage::user(INVALID_SEAT_NOTICE));
        }
    }

    pub async fn process_payment(
        &self,
        flight: &FlightDetails,
        seat: &SeatPreference,
        meter: &UsageMeter,
    ) -> Result<PaymentOutcome> {
        meter.reserve_one()?;
        let prompt = payment_prompt(flight, seat, &self.settings.payment_info);
        Ok(self.workers.payment.invoke(&prompt, Vec::new()).await?.result)
    }

    /// Search, seat, payment. Every call is charged to `meter`.
    pub async fn run(&self, trip: &TripParams, meter: &UsageMeter) -> Result<HandoffOutcome> {
        info!(origin = %trip.origin, destination = %trip.destination, limit = meter.limit(), "Starting handoff run");

        let Some(flight) = self.search_flights(trip, meter).await? else {
            warn!("No flights found");
            return Ok(HandoffOutcome::NoFlights);
        };
        info!(flight = %flight.flight_number, "Selected flight");

        let seat = self.select_seat(meter).await?;
        info!(seat = %seat.label(), "Seat selected");

        let payment = self.process_payment(&flight, &seat, meter).await?;
        let outcome = match payment {
            PaymentOutcome::Failure { reason } => {
                warn!(reason = %reason, "Payment failed");
                HandoffOutcome::Declined {
                    flight,
                    seat,
                    reason,
                }
            }
            success => HandoffOutcome::Booked {
                flight,
                seat,
                payment: success,
            },
        };
        info!(booked = outcome.is_booked(), used = meter.used(), "Handoff run finished");
        Ok(outcome)
    }
}
