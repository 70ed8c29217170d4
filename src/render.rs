use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use wayfarer_agent::{ExecutionResult, HandoffOutcome, PlanningOutcome};
use wayfarer_core::booking::{FlightDetails, FlightSearchResult, PaymentOutcome, SeatPreference};
use wayfarer_core::types::RunEvent;

/// Print run progress to stderr until the run completes.
pub fn spawn_progress(mut rx: broadcast::Receiver<RunEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                RunEvent::RunStarted { run_id, limit } => {
                    eprintln!("[run {} | limit {} calls]", short_id(&run_id.0), limit);
                }
                RunEvent::StageStarted { stage } => eprintln!("\nExecuting node: {}", stage),
                RunEvent::UsageReserved { worker, used, limit } => {
                    eprintln!("  [{}: call {}/{}]", worker, used, limit);
                }
                RunEvent::FlightsFound { count } => eprintln!("  found {} flight(s)", count),
                RunEvent::SeatRejected { label, reason } => match label {
                    Some(label) => eprintln!("  seat {} rejected: {}", label, reason),
                    None => eprintln!("  seat answer rejected: {}", reason),
                },
                RunEvent::PaymentFailed { reason } => {
                    eprintln!("  Booking failed: {} (searching again)", reason);
                }
                RunEvent::StageCompleted { .. } => {}
                RunEvent::RunError { error, .. } => eprintln!("\n[error: {}]", error),
                RunEvent::RunCompleted { succeeded, used, .. } => {
                    let status = if succeeded { "confirmed" } else { "not confirmed" };
                    eprintln!("\n[done: booking {}, {} call(s) used]", status, used);
                    break;
                }
            }
        }
    })
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn flight_line(f: &FlightDetails) -> String {
    format!(
        "{} {} → {} on {} | ${:.2} | {}h",
        f.flight_number, f.origin, f.destination, f.departure_date, f.price, f.duration_hours
    )
}

fn seat_line(s: &SeatPreference) -> String {
    let mut traits = Vec::new();
    if s.is_window {
        traits.push("window");
    }
    if s.is_extra_legroom {
        traits.push("extra legroom");
    }
    if traits.is_empty() {
        s.label()
    } else {
        format!("{} ({})", s.label(), traits.join(", "))
    }
}

fn payment_lines(p: &PaymentOutcome) -> Vec<String> {
    match p {
        PaymentOutcome::Success {
            confirmation_number,
            total_amount,
            payment_method,
        } => vec![
            format!("Confirmation number: {}", confirmation_number),
            format!("Total amount paid: ${:.2}", total_amount),
            format!("Payment method: {}", payment_method),
        ],
        PaymentOutcome::Failure { reason } => vec![format!("Payment failed: {}", reason)],
    }
}

pub fn booking_summary(result: &ExecutionResult) {
    let state = &result.state;
    println!();
    if let Some(f) = state.selected_flight() {
        println!("Flight:  {}", flight_line(f));
    }
    if let Some(s) = state.selected_seat() {
        println!("Seat:    {}", seat_line(s));
    }
    if let Some(p) = state.payment() {
        for line in payment_lines(p) {
            println!("{}", line);
        }
    }
    if !state.failed_payments().is_empty() {
        println!("Declined attempts: {}", state.failed_payments().join("; "));
    }
    println!(
        "Stages:  {} | calls used: {} | {} ms",
        result.steps.len(),
        result.used,
        result.total_elapsed_ms
    );
    if let Some(ref e) = result.error {
        println!("Aborted: {}", e);
    }
    if result.succeeded {
        println!("\nBooking process completed successfully!");
    } else {
        println!("\nBooking process ended without confirmation");
    }
}

pub fn handoff_summary(outcome: &HandoffOutcome, used: u64) {
    println!();
    match outcome {
        HandoffOutcome::NoFlights => println!("No flights found"),
        HandoffOutcome::Booked {
            flight,
            seat,
            payment,
        } => {
            println!("Flight:  {}", flight_line(flight));
            println!("Seat:    {}", seat_line(seat));
            for line in payment_lines(payment) {
                println!("{}", line);
            }
            println!("\nBooking confirmed!");
        }
        HandoffOutcome::Declined {
            flight,
            seat,
            reason,
        } => {
            println!("Flight:  {}", flight_line(flight));
            println!("Seat:    {}", seat_line(seat));
            println!("Booking failed: {}", reason);
        }
    }
    println!("Calls used: {}", used);
}

pub fn plan_summary(outcome: &PlanningOutcome) {
    let plan = &outcome.plan;
    println!("\nFlights considered:");
    for f in &outcome.flights {
        println!("  {}", flight_line(f));
    }
    println!("\nOutbound: {}", flight_line(&plan.outbound_flight));
    if let Some(ref ret) = plan.return_flight {
        println!("Return:   {}", flight_line(ret));
    }
    println!("\nHotels:");
    for h in &plan.hotel_recommendations {
        println!("  - {}", h);
    }
    println!("Activities:");
    for a in &plan.activity_suggestions {
        println!("  - {}", a);
    }
    println!("\nTotal budget: ${:.2}", plan.total_budget);
    println!("Calls used: {}", outcome.used);
}

pub fn search_summary(result: &FlightSearchResult) {
    println!("\nFound {} flight(s):", result.found_flights.len());
    for f in &result.found_flights {
        println!("  {}", flight_line(f));
    }
    match result.best_flight {
        Some(ref best) => println!("\nBest: {}", flight_line(best)),
        None => println!("\nNo best flight selected"),
    }
    println!("Why: {}", result.explanation);
}
