mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wayfarer_agent::{
    llm_workers, mock_workers, BestFlightSearch, DelegationInvoker, DispatchMode, GraphExecutor,
    HandoffPipeline, MockFlightDatabase, RunState, StageSettings, TravelPlanner, WorkerSet,
};
use wayfarer_core::booking::{TripParams, Validate};
use wayfarer_core::config::AppConfig;
use wayfarer_core::event::EventBus;
use wayfarer_core::usage::UsageMeter;

#[derive(Parser)]
#[command(name = "wayfarer", version, about = "Multi-stage flight booking orchestrator")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "wayfarer.toml")]
    config: PathBuf,

    /// Use the offline mock workers instead of the configured model
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct TripArgs {
    /// Origin airport code
    #[arg(long, default_value = "SFO")]
    origin: String,
    /// Destination airport code
    #[arg(long, default_value = "JFK")]
    destination: String,
    /// Departure date (YYYY-MM-DD)
    #[arg(long, default_value = "2024-05-01")]
    date: NaiveDate,
    /// Override the configured usage limit for this run
    #[arg(long)]
    limit: Option<u64>,
}

impl TripArgs {
    fn trip(&self) -> TripParams {
        TripParams::new(
            self.origin.to_uppercase(),
            self.destination.to_uppercase(),
            self.date,
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Book a flight through the search, seat and payment graph
    Book {
        #[command(flatten)]
        trip: TripArgs,
        /// Number of payments the mock payment worker declines first
        #[arg(long, default_value = "0")]
        mock_declines: usize,
        /// Print the final run state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Book with direct sequential calls (no restart on a declined payment)
    Handoff {
        #[command(flatten)]
        trip: TripArgs,
        /// Number of payments the mock payment worker declines first
        #[arg(long, default_value = "0")]
        mock_declines: usize,
    },
    /// Plan a trip, delegating flight searches to the search worker
    Plan {
        #[command(flatten)]
        trip: TripArgs,
        /// Return date (YYYY-MM-DD)
        #[arg(long)]
        return_date: Option<NaiveDate>,
        /// Issue outbound and return searches concurrently
        #[arg(long)]
        concurrent: bool,
    },
    /// Find the best flight for a route
    Search {
        #[command(flatten)]
        trip: TripArgs,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wayfarer=info,warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "wayfarer", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_config(&cli.config)?;
    if cli.mock {
        config.workers.mock = true;
    }

    match cli.command {
        Commands::Book {
            trip,
            mock_declines,
            json,
        } => {
            let workers = build_workers(&config, mock_declines);
            let limit = trip.limit.unwrap_or(config.run.usage_limit);
            let meter = UsageMeter::new(limit);
            let params = checked_trip(trip.trip())?;

            let bus = Arc::new(EventBus::default());
            let printer = render::spawn_progress(bus.subscribe());
            let executor = GraphExecutor::new(workers.booking, StageSettings::from(&config.run))
                .with_event_bus(bus.clone())
                .with_cancel(cancel_on_ctrl_c());

            let result = executor.execute(RunState::new(params), &meter).await;
            printer.await.ok();

            if json {
                println!("{}", serde_json::to_string_pretty(&result.state)?);
            } else {
                render::booking_summary(&result);
            }
            if !result.succeeded {
                std::process::exit(1);
            }
        }
        Commands::Handoff {
            trip,
            mock_declines,
        } => {
            let workers = build_workers(&config, mock_declines);
            let meter = UsageMeter::new(trip.limit.unwrap_or(config.run.usage_limit));
            let params = checked_trip(trip.trip())?;

            let pipeline = HandoffPipeline::new(workers.booking, StageSettings::from(&config.run));
            let outcome = pipeline.run(&params, &meter).await?;
            render::handoff_summary(&outcome, meter.used());
            if !outcome.is_booked() {
                std::process::exit(1);
            }
        }
        Commands::Plan {
            trip,
            return_date,
            concurrent,
        } => {
            let workers = build_workers(&config, 0);
            let meter = UsageMeter::new(trip.limit.unwrap_or(config.run.plan_usage_limit));
            let mut params = trip.trip();
            if let Some(ret) = return_date {
                params = params.with_return(ret);
            }
            let params = checked_trip(params)?;

            let mode = DispatchMode::from_flag(concurrent || config.run.concurrent_delegation);
            let planner = TravelPlanner::new(
                workers.planner,
                DelegationInvoker::new(workers.delegate_search, mode),
            );
            let outcome = planner.plan(&params, &meter).await?;
            render::plan_summary(&outcome);
        }
        Commands::Search { trip } => {
            let workers = build_workers(&config, 0);
            let meter = UsageMeter::new(trip.limit.unwrap_or(config.run.search_usage_limit));
            let params = checked_trip(trip.trip())?;

            let result = BestFlightSearch::new(workers.best_flight)
                .search(&params, &meter)
                .await?;
            render::search_summary(&result);
        }
        Commands::Config => {
            let mut shown = config.clone();
            for model in std::iter::once(&mut shown.model).chain(shown.fallback_models.iter_mut()) {
                if model.api_key.is_some() {
                    model.api_key = Some("***".to_string());
                }
            }
            println!("{}", toml::to_string_pretty(&shown)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        Ok(AppConfig::load(path)?)
    } else {
        eprintln!(
            "No config file at {}; using WAYFARER_* / GROQ_API_KEY environment defaults.",
            path.display()
        );
        Ok(AppConfig::from_env())
    }
}

fn build_workers(config: &AppConfig, mock_declines: usize) -> WorkerSet {
    if config.workers.mock {
        info!(declines = mock_declines, "Using mock workers");
        mock_workers(Arc::new(MockFlightDatabase::sample()), mock_declines)
    } else {
        if config.model.api_key.is_none() {
            warn!(provider = %config.model.provider, "No API key configured; requests may be rejected");
        }
        let client = Arc::from(wayfarer_llm::client_for(config));
        llm_workers(client, &config.model)
    }
}

fn checked_trip(trip: TripParams) -> anyhow::Result<TripParams> {
    if let Err(issues) = trip.validate() {
        anyhow::bail!("invalid trip: {}", issues);
    }
    Ok(trip)
}

fn cancel_on_ctrl_c() -> tokio_util::sync::CancellationToken {
    let cancel = tokio_util::sync::CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        eprintln!("\nInterrupted, cancelling the run...");
        token.cancel();
    });
    cancel
}
