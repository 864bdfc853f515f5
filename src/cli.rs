//! CLI definition and dispatch.

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

use crate::adapters::activity_log_adapter::{FileActivityLog, DEFAULT_ACTIVITY_LOG};
use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_adapter::PaperTradingAdapter;
use crate::domain::allocation::{
    AllocationConfig, PortfolioPlan, DEFAULT_FALLBACK_PRICE, DEFAULT_INVESTABLE_FRACTION,
    DEFAULT_PORTFOLIO_VALUE,
};
use crate::domain::config_validation::{validate_schedule_config, validate_trading_config};
use crate::domain::cycle::{
    CycleOrchestrator, CycleOutcome, HealthReport, JobOutcome, JobRun, TradingConfig,
};
use crate::domain::error::MomtraderError;
use crate::domain::execution::AccountInfo;
use crate::domain::schedule::{
    next_rebalance_date, parse_time_of_day, ScheduleConfig, Scheduler, DEFAULT_HEALTH_CHECK_TIME,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REBALANCE_TIME,
};
use crate::domain::signal::{
    compute_signals, Lookback, RankedSignalSet, DEFAULT_LOOKBACK_DAYS, DEFAULT_TOP_K,
};
use crate::domain::universe::{Universe, DEFAULT_CODES};
use crate::ports::config_port::ConfigPort;
use crate::ports::order_port::OrderSink;
use crate::ports::price_port::PriceHistoryPort;

pub const DEFAULT_CSV_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "momtrader", about = "Monthly momentum rebalancer with paper execution")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one rebalancing cycle now
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Evaluate as of this date instead of today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Start the scheduler loop (Ctrl+C to stop)
    Schedule {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print ranked momentum signals without trading
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Validate a configuration file and print the allocation plan
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config, as_of } => run_now(&config, as_of),
        Command::Schedule { config } => run_schedule(&config),
        Command::Signals { config, as_of } => run_signals(&config, as_of),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

fn fail(err: &MomtraderError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn build_trading_config(adapter: &dyn ConfigPort) -> Result<TradingConfig, MomtraderError> {
    validate_trading_config(adapter)?;

    let codes = adapter.get_string_or("trading", "codes", DEFAULT_CODES);
    let universe = Universe::parse(&codes)
        .map_err(|e| MomtraderError::invalid("trading", "codes", e.to_string()))?;

    let lookback_days = adapter.get_int("trading", "lookback_days", DEFAULT_LOOKBACK_DAYS);
    let top_k = adapter.get_int("trading", "top_k", DEFAULT_TOP_K as i64) as usize;

    Ok(TradingConfig {
        universe,
        lookback: Lookback::days(lookback_days),
        top_k,
        portfolio_value: adapter.get_double(
            "trading",
            "portfolio_value",
            DEFAULT_PORTFOLIO_VALUE,
        ),
        allocation: AllocationConfig {
            investable_fraction: adapter.get_double(
                "trading",
                "investable_fraction",
                DEFAULT_INVESTABLE_FRACTION,
            ),
            fallback_price: adapter.get_double(
                "trading",
                "fallback_price",
                DEFAULT_FALLBACK_PRICE,
            ),
        },
    })
}

pub fn build_schedule_config(adapter: &dyn ConfigPort) -> Result<ScheduleConfig, MomtraderError> {
    validate_schedule_config(adapter)?;

    let time = |key: &str, default: &str| {
        let value = adapter.get_string_or("schedule", key, default);
        parse_time_of_day(&value).ok_or_else(|| {
            MomtraderError::invalid("schedule", key, format!("invalid time '{}'", value))
        })
    };

    let poll_secs = adapter.get_int(
        "schedule",
        "poll_interval_secs",
        DEFAULT_POLL_INTERVAL_SECS as i64,
    );

    Ok(ScheduleConfig {
        rebalance_time: time("rebalance_time", DEFAULT_REBALANCE_TIME)?,
        health_check_time: time("health_check_time", DEFAULT_HEALTH_CHECK_TIME)?,
        poll_interval: Duration::from_secs(poll_secs as u64),
    })
}

/// Price source selected by `[data] source` (`csv` or `sqlite`).
pub fn open_price_source(
    adapter: &dyn ConfigPort,
) -> Result<Box<dyn PriceHistoryPort>, MomtraderError> {
    let source = adapter.get_string_or("data", "source", "csv").to_lowercase();

    match source.as_str() {
        "csv" => {
            let dir = adapter.get_string_or("data", "csv_dir", DEFAULT_CSV_DIR);
            Ok(Box::new(CsvPriceAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_adapter::SqlitePriceAdapter;

            let sqlite = SqlitePriceAdapter::from_config(adapter)?;
            sqlite.initialize_schema()?;
            Ok(Box::new(sqlite))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(MomtraderError::invalid(
            "data",
            "source",
            "sqlite feature is required for source = sqlite",
        )),
        other => Err(MomtraderError::invalid(
            "data",
            "source",
            format!("unknown source '{}', expected csv or sqlite", other),
        )),
    }
}

pub fn activity_log_path(adapter: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(adapter.get_string_or("log", "activity_log", DEFAULT_ACTIVITY_LOG))
}

/// Current local time, moved onto `as_of` when one is given.
fn evaluation_time(as_of: Option<NaiveDate>) -> NaiveDateTime {
    let now = Local::now().naive_local();
    match as_of {
        Some(date) => date.and_time(now.time()),
        None => now,
    }
}

pub struct Pipeline {
    pub trading: TradingConfig,
    pub prices: Box<dyn PriceHistoryPort>,
    pub sink: PaperTradingAdapter,
    pub log: FileActivityLog,
}

/// Wires the price source, paper sink and activity log described by `adapter`.
pub fn build_pipeline(adapter: &dyn ConfigPort) -> Result<Pipeline, MomtraderError> {
    Ok(Pipeline {
        trading: build_trading_config(adapter)?,
        prices: open_price_source(adapter)?,
        sink: PaperTradingAdapter::from_config(adapter),
        log: FileActivityLog::new(activity_log_path(adapter)),
    })
}

fn load_pipeline(config_path: &Path) -> Result<Pipeline, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    build_pipeline(&adapter).map_err(|e| fail(&e))
}

fn run_now(config_path: &Path, as_of: Option<NaiveDate>) -> ExitCode {
    let pipeline = match load_pipeline(config_path) {
        Ok(p) => p,
        Err(code) => return code,
    };

    print_account(&pipeline.sink.account_info());

    let orchestrator = CycleOrchestrator::new(
        pipeline.prices.as_ref(),
        &pipeline.sink,
        &pipeline.log,
        pipeline.trading,
    );
    let outcome = orchestrator.run_cycle(evaluation_time(as_of));
    print_outcome(&outcome);
    eprintln!("\nActivity logged to {}", pipeline.log.path().display());

    match outcome {
        CycleOutcome::Failed { .. } => ExitCode::from(4),
        _ => ExitCode::SUCCESS,
    }
}

fn run_schedule(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let schedule = match build_schedule_config(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let pipeline = match build_pipeline(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => return fail(&MomtraderError::Io(e)),
    };

    let started_at = Local::now().naive_local();
    let mut orchestrator = CycleOrchestrator::new(
        pipeline.prices.as_ref(),
        &pipeline.sink,
        &pipeline.log,
        pipeline.trading,
    )
    .with_scheduler(Scheduler::from_config(started_at, &schedule));

    eprintln!("Rebalancing scheduled:");
    eprintln!(
        "  Daily check at {} (rebalances on the last day of the month)",
        schedule.rebalance_time.format("%H:%M")
    );
    eprintln!(
        "  Health check at {}",
        schedule.health_check_time.format("%H:%M")
    );
    eprintln!(
        "  Polling every {}s, press Ctrl+C to stop",
        schedule.poll_interval.as_secs()
    );

    print_health(&orchestrator.health_check(started_at));

    runtime.block_on(poll(&mut orchestrator, schedule.poll_interval));

    eprintln!("\nScheduler stopped");
    ExitCode::SUCCESS
}

/// Ticks the orchestrator until interrupted. A running job always finishes
/// before the interrupt is observed.
async fn poll(orchestrator: &mut CycleOrchestrator<'_>, interval: Duration) {
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        for job in orchestrator.tick(Local::now().naive_local()) {
            print_job(&job);
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = &mut interrupt => {
                match result {
                    Ok(()) => info!("interrupt received, stopping scheduler"),
                    Err(e) => error!(error = %e, "failed to listen for interrupt"),
                }
                break;
            }
        }
    }
}

fn run_signals(config_path: &Path, as_of: Option<NaiveDate>) -> ExitCode {
    let pipeline = match load_pipeline(config_path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let trading = &pipeline.trading;
    let as_of = evaluation_time(as_of).date();

    eprintln!(
        "Computing {}-day momentum for {} codes as of {}",
        trading.lookback.days,
        trading.universe.count(),
        as_of
    );

    match compute_signals(
        pipeline.prices.as_ref(),
        &trading.universe,
        as_of,
        trading.lookback,
        trading.top_k,
    ) {
        Ok(signals) => {
            print_signals(&signals);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let trading = match build_trading_config(&adapter) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };
    let schedule = match build_schedule_config(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    if let Err(e) = open_price_source(&adapter) {
        return fail(&e);
    }

    let plan = match PortfolioPlan::new(
        trading.portfolio_value,
        trading.allocation.investable_fraction,
        trading.top_k,
    ) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    eprintln!("\nUniverse:");
    eprintln!("  codes: {}", trading.universe.codes.join(", "));
    eprintln!("  lookback: {} days, top {}", trading.lookback.days, trading.top_k);

    eprintln!("\nAllocation:");
    eprintln!("  Portfolio value:    ${:.2}", plan.total_value);
    eprintln!(
        "  Investable:         ${:.2} ({:.0}%)",
        plan.investable(),
        plan.investable_fraction * 100.0
    );
    eprintln!("  Per instrument:     ${:.2}", plan.cash_per_instrument);
    eprintln!(
        "  Fallback price:     ${:.2}",
        trading.allocation.fallback_price
    );

    let today = Local::now().date_naive();
    eprintln!("\nSchedule:");
    eprintln!("  rebalance check:    {}", schedule.rebalance_time.format("%H:%M"));
    eprintln!("  health check:       {}", schedule.health_check_time.format("%H:%M"));
    eprintln!("  poll interval:      {}s", schedule.poll_interval.as_secs());
    eprintln!("  next rebalance:     {}", next_rebalance_date(today));
    eprintln!("  activity log:       {}", activity_log_path(&adapter).display());

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn print_account(account: &AccountInfo) {
    eprintln!("\n=== Account ===");
    eprintln!("Type:             {}", account.account_type);
    eprintln!("Buying Power:     ${:.2}", account.buying_power);
    eprintln!("Commission:       ${:.2}", account.commission);
}

fn print_signals(signals: &RankedSignalSet) {
    if signals.is_empty() {
        eprintln!("No momentum signals");
        return;
    }
    eprintln!("\n=== Momentum Signals ===");
    for (rank, signal) in signals.iter().enumerate() {
        println!("{}\t{}\t{:.2}%", rank + 1, signal.code, signal.score * 100.0);
    }
}

fn print_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Executed(summary) => {
            print_signals(&summary.signals);
            eprintln!("\n=== Orders ===");
            for entry in &summary.report.entries {
                eprintln!(
                    "  {} {} {} @ ${:.2}  (${:.2})  {}",
                    entry.order.side,
                    entry.order.quantity,
                    entry.order.code,
                    entry.order.reference_price,
                    entry.order.notional(),
                    entry.confirmation_id
                );
            }
            for rejected in &summary.report.rejected {
                eprintln!(
                    "  REJECTED {} {}: {}",
                    rejected.order.side, rejected.order.code, rejected.reason
                );
            }
            eprintln!(
                "Total notional:   ${:.2}",
                summary.report.total_notional()
            );
            eprintln!("\n{}", outcome);
        }
        CycleOutcome::Skipped { .. } | CycleOutcome::Failed { .. } => {
            eprintln!("\n{}", outcome);
        }
    }
}

fn print_health(report: &HealthReport) {
    eprintln!("\n=== Health Check ({}) ===", report.checked_at.format("%Y-%m-%d %H:%M"));
    for status in &report.components {
        let mark = if status.ok { "OK" } else { "FAIL" };
        eprintln!("  {:<10} {:<5} {}", status.component, mark, status.detail);
    }
    eprintln!("  next rebalance: {}", report.next_rebalance);
}

fn print_job(job: &JobRun) {
    match &job.outcome {
        JobOutcome::Cycle(outcome) => {
            eprintln!("\n[{}] {}", job.name, job.fired_on);
            print_outcome(outcome);
        }
        JobOutcome::NotRebalanceDay => {
            eprintln!("[{}] {}: not last day of month", job.name, job.fired_on);
        }
        JobOutcome::Health(report) => print_health(report),
    }
}
