use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wayfarer_core::booking::{FlightDetails, PaymentOutcome, SeatPreference};
use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::event::EventBus;
use wayfarer_core::traits::WorkerInvoker;
use wayfarer_core::types::{ChatMessage, RunEvent, RunId, Stage};
use wayfarer_core::usage::UsageMeter;

use super::node::{BookingWorkers, Outcome, StageNode, StageSettings};
use super::state::RunState;
use crate::prompts::{payment_prompt, search_prompt, INVALID_SEAT_NOTICE};

/// Record of one executed stage.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub stage: Stage,
    /// Name of the worker the stage delegated to.
    pub worker: String,
    /// Delegated calls this stage charged to the meter (seat retries count).
    pub calls: u64,
    pub elapsed_ms: u64,
    /// Whether the step returned without error.
    pub succeeded: bool,
    /// Where control went next; `None` when the run ended here.
    pub next: Option<Stage>,
}

/// Result of a whole booking run.
#[derive(Debug)]
pub struct ExecutionResult {
    pub run_id: RunId,
    /// Per-stage records in execution order.
    pub steps: Vec<StepRecord>,
    /// Final state, histories included, even when the run aborted.
    pub state: RunState,
    /// Delegated calls charged to the meter.
    pub used: u64,
    pub total_elapsed_ms: u64,
    /// True only when the run reached a confirmed booking.
    pub succeeded: bool,
    /// The error that aborted the run, if any.
    pub error: Option<WayfarerError>,
}

/// Drives the SearchFlights → SelectSeat → ProcessPayment state machine.
///
/// Transitions:
/// - SearchFlights ends the run unsuccessfully when no flight is found,
///   otherwise picks the first candidate.
/// - SelectSeat asks its worker again, with an "invalid seat" notice in the
///   stage history, until the seat is within rows 1-30 and letters A-F.
/// - ProcessPayment ends the run on success. A declined payment clears
///   flight, seat and payment and goes back to SearchFlights.
///
/// Every delegated call first reserves one unit on the run's meter; the
/// meter's ceiling is the only bound on the retry and restart loops.
pub struct GraphExecutor {
    workers: BookingWorkers,
    settings: StageSettings,
    event_bus: Option<Arc<EventBus>>,
    cancel: Option<CancellationToken>,
}

impl GraphExecutor {
    pub fn new(workers: BookingWorkers, settings: StageSettings) -> Self {
        Self {
            workers,
            settings,
            event_bus: None,
            cancel: None,
        }
    }

    /// Publish progress events to `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Abort the run with `Cancelled` once `token` fires.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn publish(&self, event: RunEvent) {
        if let Some(ref bus) = self.event_bus {
            bus.publish(event);
        }
    }

    /// Run the graph from SearchFlights until it reaches a terminal state or
    /// an error aborts it.
    ///
    /// Errors are attached to the returned result rather than returned, so
    /// the partially populated state is never lost.
    pub async fn execute(&self, state: RunState, meter: &UsageMeter) -> ExecutionResult {
        let start = Instant::now();
        let run_id = RunId::new();
        let mut state = state;
        let mut steps = Vec::new();
        let mut node = self.workers.node(Stage::SearchFlights);

        info!(
            run_id = %run_id,
            origin = %state.origin(),
            destination = %state.destination(),
            date = %state.travel_date(),
            limit = meter.limit(),
            "Starting booking run"
        );
        self.publish(RunEvent::RunStarted {
            run_id: run_id.clone(),
            limit: meter.limit(),
        });

        let (succeeded, failure) = loop {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                break (false, Some(WayfarerError::Cancelled));
            }

            let stage = node.stage();
            let worker = node.worker_name().to_string();
            info!(stage = %stage, worker = %worker, used = meter.used(), "Entering stage");
            self.publish(RunEvent::StageStarted { stage });

            let stage_start = Instant::now();
            let used_before = meter.used();
            let result = match self.cancel {
                Some(ref token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(WayfarerError::Cancelled),
                    r = self.step(node, &mut state, meter) => r,
                },
                None => self.step(node, &mut state, meter).await,
            };
            let elapsed_ms = stage_start.elapsed().as_millis() as u64;

            steps.push(StepRecord {
                stage,
                worker,
                calls: meter.used() - used_before,
                elapsed_ms,
                succeeded: result.is_ok(),
                next: result.as_ref().ok().and_then(Outcome::next_stage),
            });
            self.publish(RunEvent::StageCompleted { stage, elapsed_ms });
            debug!(stage = %stage, elapsed_ms, used = meter.used(), "Stage complete");

            match result {
                Ok(Outcome::Continue(next)) => node = next,
                Ok(Outcome::Terminal { success }) => break (success, None),
                Err(e) => {
                    error!(stage = %stage, error = %e, used = meter.used(), "Booking run aborted");
                    break (false, Some(e));
                }
            }
        };

        if let Some(ref e) = failure {
            self.publish(RunEvent::RunError {
                run_id: run_id.clone(),
                error: e.to_string(),
            });
        }
        let succeeded = succeeded && state.booking_confirmed();
        self.publish(RunEvent::RunCompleted {
            run_id: run_id.clone(),
            succeeded,
            used: meter.used(),
        });
        info!(
            run_id = %run_id,
            succeeded,
            used = meter.used(),
            stages = steps.len(),
            "Booking run finished"
        );

        ExecutionResult {
            run_id,
            steps,
            state,
            used: meter.used(),
            total_elapsed_ms: start.elapsed().as_millis() as u64,
            succeeded,
            error: failure,
        }
    }

    /// Run one node and decide where control goes next.
    pub async fn step(
        &self,
        node: StageNode,
        state: &mut RunState,
        meter: &UsageMeter,
    ) -> Result<Outcome> {
        state.check_invariants()?;
        let outcome = match node {
            StageNode::SearchFlights(worker) => self.search_flights(&*worker, state, meter).await?,
            StageNode::SelectSeat(worker) => self.select_seat(&*worker, state, meter).await?,
            StageNode::ProcessPayment(worker) => {
                self.process_payment(&*worker, state, meter).await?
            }
        };
        state.check_invariants()?;
        Ok(outcome)
    }

    async fn search_flights(
        &self,
        worker: &dyn WorkerInvoker<Vec<FlightDetails>>,
        state: &mut RunState,
        meter: &UsageMeter,
    ) -> Result<Outcome> {
        let prompt = search_prompt(state.origin(), state.destination(), state.travel_date());
        let flights = self
            .delegate(Stage::SearchFlights, worker, &prompt, state, meter)
            .await?;

        self.publish(RunEvent::FlightsFound {
            count: flights.len(),
        });
        let Some(first) = flights.into_iter().next() else {
            warn!(
                origin = %state.origin(),
                destination = %state.destination(),
                "No flights found"
            );
            return Ok(Outcome::Terminal { success: false });
        };

        info!(flight = %first.flight_number, price = first.price, "Selected flight");
        state.select_flight(first)?;
        Ok(Outcome::Continue(self.workers.node(Stage::SelectSeat)))
    }

    async fn select_seat(
        &self,
        worker: &dyn WorkerInvoker<SeatPreference>,
        state: &mut RunState,
        meter: &UsageMeter,
    ) -> Result<Outcome> {
        loop {
            let attempt = self
                .delegate(Stage::SelectSeat, worker, &self.settings.seat_preference, state, meter)
                .await;

            let (label, reason) = match attempt {
                Ok(seat) => match seat.check_range() {
                    Ok(()) => {
                        info!(seat = %seat.label(), window = seat.is_window, legroom = seat.is_extra_legroom, "Seat selected");
                        state.select_seat(seat)?;
                        return Ok(Outcome::Continue(self.workers.node(Stage::ProcessPayment)));
                    }
                    Err(reason) => (Some(seat.label()), reason),
                },
                Err(WayfarerError::Validation { detail, .. }) => (None, detail),
                Err(e) => return Err(e),
            };

            warn!(seat = ?label, reason = %reason, used = meter.used(), "Invalid seat selection, asking again");
            self.publish(RunEvent::SeatRejected { label, reason });
            state.append_history(Stage::SelectSeat, [ChatMessage::user(INVALID_SEAT_NOTICE)]);
        }
    }

    async fn process_payment(
        &self,
        worker: &dyn WorkerInvoker<PaymentOutcome>,
        state: &mut RunState,
        meter: &UsageMeter,
    ) -> Result<Outcome> {
        let (Some(flight), Some(seat)) = (state.selected_flight(), state.selected_seat()) else {
            return Err(WayfarerError::InvariantViolation(
                "payment stage entered without flight and seat".into(),
            ));
        };
        let prompt = payment_prompt(flight, seat, &self.settings.payment_info);

        let outcome = self
            .delegate(Stage::ProcessPayment, worker, &prompt, state, meter)
            .await?;
        state.record_payment(outcome.clone())?;

        match outcome {
            PaymentOutcome::Success {
                confirmation_number,
                total_amount,
                ..
            } => {
                info!(confirmation = %confirmation_number, total_amount, "Booking confirmed");
                Ok(Outcome::Terminal { success: true })
            }
            PaymentOutcome::Failure { reason } => {
                warn!(reason = %reason, used = meter.used(), "Payment failed, restarting from flight search");
                self.publish(RunEvent::PaymentFailed { reason });
                state.restart();
                Ok(Outcome::Continue(self.workers.node(Stage::SearchFlights)))
            }
        }
    }

    /// One delegated call: reserve a unit, invoke the worker with the
    /// stage's history, and append only the new messages to that history.
    async fn delegate<T: 'static>(
        &self,
        stage: Stage,
        worker: &dyn WorkerInvoker<T>,
        prompt: &str,
        state: &mut RunState,
        meter: &UsageMeter,
    ) -> Result<T> {
        let used = meter.reserve_one()?;
        self.publish(RunEvent::UsageReserved {
            worker: worker.name().to_string(),
            used,
            limit: meter.limit(),
        });

        let history = state.history(stage).to_vec();
        let prior_len = history.len();
        let output = worker.invoke(prompt, history).await?;
        state.append_history(stage, output.new_messages(prior_len).iter().cloned());
        Ok(output.result)
    }
}
