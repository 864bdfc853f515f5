//! Rebalancing cycle orchestration.
//!
//! One cycle runs signal generation, allocation and submission in order and
//! appends a single outcome line to the activity log. Stage errors become a
//! [`CycleOutcome`] instead of propagating, so a failed cycle never stops the
//! polling loop.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use tracing::{error, info, warn};

use crate::domain::allocation::{build_orders, AllocationConfig, DEFAULT_PORTFOLIO_VALUE};
use crate::domain::error::MomtraderError;
use crate::domain::execution::{submit, ExecutionReport};
use crate::domain::schedule::{is_rebalance_day, next_rebalance_date, JobKind, Scheduler};
use crate::domain::signal::{compute_signals, Lookback, RankedSignalSet, DEFAULT_TOP_K};
use crate::domain::universe::Universe;
use crate::ports::activity_log_port::ActivityLog;
use crate::ports::order_port::OrderSink;
use crate::ports::price_port::PriceHistoryPort;

pub const NO_SIGNALS: &str = "no signals";

#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    pub universe: Universe,
    pub lookback: Lookback,
    pub top_k: usize,
    pub portfolio_value: f64,
    pub allocation: AllocationConfig,
}

impl TradingConfig {
    pub fn new(universe: Universe) -> Self {
        TradingConfig {
            universe,
            lookback: Lookback::default(),
            top_k: DEFAULT_TOP_K,
            portfolio_value: DEFAULT_PORTFOLIO_VALUE,
            allocation: AllocationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub signals: RankedSignalSet,
    pub orders_generated: usize,
    pub report: ExecutionReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Executed(CycleSummary),
    Skipped { reason: String },
    Failed { error: String },
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            CycleOutcome::Executed(summary) => Some(&summary.report),
            _ => None,
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Executed(summary) => write!(
                f,
                "Executed {} trades ({} signals, {} orders, {} rejected)",
                summary.report.confirmed_count(),
                summary.signals.len(),
                summary.orders_generated,
                summary.report.rejected_count(),
            ),
            CycleOutcome::Skipped { reason } => write!(f, "Skipped: {}", reason),
            CycleOutcome::Failed { error } => write!(f, "Failed: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentStatus {
    pub component: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub checked_at: NaiveDateTime,
    pub components: Vec<ComponentStatus>,
    pub next_rebalance: NaiveDate,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.components.iter().all(|c| c.ok)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Cycle(CycleOutcome),
    NotRebalanceDay,
    Health(HealthReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRun {
    pub name: String,
    pub kind: JobKind,
    pub fired_on: NaiveDate,
    pub outcome: JobOutcome,
}

/// Runs rebalancing cycles against injected collaborators and owns the
/// job scheduler that decides when they fire.
pub struct CycleOrchestrator<'a> {
    prices: &'a dyn PriceHistoryPort,
    sink: &'a dyn OrderSink,
    log: &'a dyn ActivityLog,
    config: TradingConfig,
    scheduler: Scheduler,
}

impl<'a> CycleOrchestrator<'a> {
    pub fn new(
        prices: &'a dyn PriceHistoryPort,
        sink: &'a dyn OrderSink,
        log: &'a dyn ActivityLog,
        config: TradingConfig,
    ) -> Self {
        CycleOrchestrator {
            prices,
            sink,
            log,
            config,
            scheduler: Scheduler::new(NaiveDateTime::default()),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn run_cycle(&self, now: NaiveDateTime) -> CycleOutcome {
        info!(at = %now, codes = self.config.universe.count(), "starting rebalancing cycle");

        let outcome = match self.execute(now) {
            Ok(summary) => CycleOutcome::Executed(summary),
            Err(MomtraderError::NoData { reason }) => {
                warn!(%reason, "cycle skipped");
                CycleOutcome::Skipped {
                    reason: NO_SIGNALS.to_string(),
                }
            }
            Err(e) => {
                error!(error = %e, "cycle failed");
                CycleOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        self.record(now, &outcome);
        outcome
    }

    fn execute(&self, now: NaiveDateTime) -> Result<CycleSummary, MomtraderError> {
        let signals = compute_signals(
            self.prices,
            &self.config.universe,
            now.date(),
            self.config.lookback,
            self.config.top_k,
        )?;
        for signal in &signals {
            info!(code = %signal.code, score = signal.score, "selected");
        }

        let orders = build_orders(
            &signals,
            self.config.portfolio_value,
            &self.config.allocation,
            self.sink,
        )?;
        let orders_generated = orders.len();
        let report = submit(self.sink, orders);

        Ok(CycleSummary {
            signals,
            orders_generated,
            report,
        })
    }

    fn record(&self, now: NaiveDateTime, outcome: &CycleOutcome) {
        let line = outcome.to_string();
        info!(outcome = %line, "cycle complete");
        if let Err(e) = self.log.append(now, &line) {
            error!(error = %e, "failed to append activity log");
        }
    }

    pub fn health_check(&self, now: NaiveDateTime) -> HealthReport {
        let config = &self.config;
        let strategy_ok = config.universe.count() > 0 && config.top_k > 0;
        let account = self.sink.account_info();
        let data_ok = self.prices.is_available();

        let report = HealthReport {
            checked_at: now,
            components: vec![
                ComponentStatus {
                    component: "strategy".into(),
                    ok: strategy_ok,
                    detail: format!(
                        "top {} of {} codes over {} days",
                        config.top_k,
                        config.universe.count(),
                        config.lookback.days
                    ),
                },
                ComponentStatus {
                    component: "trader".into(),
                    ok: true,
                    detail: format!(
                        "{} account, buying power ${:.0}",
                        account.account_type, account.buying_power
                    ),
                },
                ComponentStatus {
                    component: "data".into(),
                    ok: data_ok,
                    detail: if data_ok {
                        "price history source reachable".into()
                    } else {
                        "price history source unavailable".into()
                    },
                },
            ],
            next_rebalance: next_rebalance_date(now.date()),
        };

        for status in &report.components {
            if status.ok {
                info!(component = %status.component, detail = %status.detail, "health OK");
            } else {
                warn!(component = %status.component, detail = %status.detail, "health FAIL");
            }
        }
        info!(next_rebalance = %report.next_rebalance, "health check complete");
        report
    }

    pub fn run_job(&self, kind: JobKind, now: NaiveDateTime) -> JobOutcome {
        match kind {
            JobKind::Rebalance => {
                if is_rebalance_day(now.date()) {
                    info!(date = %now.date(), "last day of month, rebalancing");
                    JobOutcome::Cycle(self.run_cycle(now))
                } else {
                    info!(date = %now.date(), "not last day of month, skipping rebalancing");
                    JobOutcome::NotRebalanceDay
                }
            }
            JobKind::HealthCheck => JobOutcome::Health(self.health_check(now)),
        }
    }

    /// Evaluates the scheduler once and runs every due job to completion,
    /// one at a time, in registration order.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<JobRun> {
        let due = self.scheduler.due_jobs(now);
        let mut runs = Vec::with_capacity(due.len());

        for index in due {
            let Some(kind) = self.scheduler.begin(index) else {
                continue;
            };
            let outcome = self.run_job(kind, now);
            self.scheduler.finish(index, now.date());

            let name = self
                .scheduler
                .job(index)
                .map(|job| job.name.clone())
                .unwrap_or_default();
            runs.push(JobRun {
                name,
                kind,
                fired_on: now.date(),
                outcome,
            });
        }

        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::{OrderIntent, Side};
    use crate::domain::execution::{confirmation_id, AccountInfo, ExecutionEntry};
    use crate::domain::price::{PricePoint, PriceSeries};
    use crate::domain::schedule::is_health_check_time;
    use chrono::NaiveTime;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct Prices(HashMap<String, PriceSeries>);

    impl PriceHistoryPort for Prices {
        fn fetch_history(
            &self,
            codes: &[String],
            _start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<HashMap<String, PriceSeries>, MomtraderError> {
            Ok(codes
                .iter()
                .filter_map(|c| self.0.get(c).map(|s| (c.clone(), s.clone())))
                .collect())
        }
    }

    struct Sink;

    impl OrderSink for Sink {
        fn place_order(&self, order: &OrderIntent) -> Result<String, MomtraderError> {
            Ok(confirmation_id(&order.code, order.side, order.quantity))
        }

        fn reference_price(&self, _code: &str) -> Option<f64> {
            Some(100.0)
        }

        fn account_info(&self) -> AccountInfo {
            AccountInfo::paper(1_000_000.0)
        }
    }

    #[derive(Default)]
    struct Lines(RefCell<Vec<String>>);

    impl ActivityLog for Lines {
        fn append(&self, _timestamp: NaiveDateTime, summary: &str) -> Result<(), MomtraderError> {
            self.0.borrow_mut().push(summary.to_string());
            Ok(())
        }
    }

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn prices(returns: &[(&str, f64)]) -> Prices {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        Prices(
            returns
                .iter()
                .map(|(code, r)| {
                    let series = PriceSeries::new(
                        *code,
                        vec![
                            PricePoint::new(start, 100.0),
                            PricePoint::new(end, 100.0 * (1.0 + r)),
                        ],
                    )
                    .unwrap();
                    (code.to_string(), series)
                })
                .collect(),
        )
    }

    fn config(codes: &str) -> TradingConfig {
        TradingConfig::new(Universe::parse(codes).unwrap())
    }

    #[test]
    fn executed_cycle_logs_summary() {
        let prices = prices(&[("A", 0.10), ("B", 0.40), ("C", -0.05)]);
        let log = Lines::default();
        let orchestrator = CycleOrchestrator::new(&prices, &Sink, &log, config("A,B,C"));

        let outcome = orchestrator.run_cycle(dt(2024, 12, 31, 16));
        let report = outcome.report().unwrap();
        assert_eq!(report.confirmed_count(), 2);
        assert_eq!(
            report.entries[0],
            ExecutionEntry {
                order: OrderIntent {
                    code: "B".into(),
                    side: Side::Buy,
                    quantity: 40,
                    reference_price: 100.0,
                    momentum_score: report.entries[0].order.momentum_score,
                },
                confirmation_id: "PAPER_B_BUY_40".into(),
            }
        );
        assert_eq!(
            *log.0.borrow(),
            vec!["Executed 2 trades (2 signals, 2 orders, 0 rejected)".to_string()]
        );
    }

    #[test]
    fn skipped_cycle_when_no_signals() {
        let prices = Prices(HashMap::new());
        let log = Lines::default();
        let orchestrator = CycleOrchestrator::new(&prices, &Sink, &log, config("A,B"));

        let outcome = orchestrator.run_cycle(dt(2024, 12, 31, 16));
        assert_eq!(
            outcome,
            CycleOutcome::Skipped {
                reason: NO_SIGNALS.into()
            }
        );
        assert_eq!(*log.0.borrow(), vec!["Skipped: no signals".to_string()]);
    }

    #[test]
    fn invalid_portfolio_value_fails_cycle() {
        let prices = prices(&[("A", 0.10)]);
        let log = Lines::default();
        let mut cfg = config("A");
        cfg.portfolio_value = 0.0;
        let orchestrator = CycleOrchestrator::new(&prices, &Sink, &log, cfg);

        let outcome = orchestrator.run_cycle(dt(2024, 12, 31, 16));
        assert!(matches!(
            outcome,
            CycleOutcome::Failed { ref error } if error.contains("portfolio_value")
        ));
        assert!(log.0.borrow()[0].starts_with("Failed: "));
    }

    #[test]
    fn oversized_lookback_fails_cycle() {
        let prices = prices(&[("A", 0.10)]);
        let log = Lines::default();
        let mut cfg = config("A");
        cfg.lookback = Lookback::days(100_000_000);
        let orchestrator = CycleOrchestrator::new(&prices, &Sink, &log, cfg);

        let outcome = orchestrator.run_cycle(dt(2024, 12, 31, 16));
        assert!(matches!(
            outcome,
            CycleOutcome::Failed { ref error } if error.contains("lookback_days")
        ));
        assert_eq!(log.0.borrow().len(), 1);
        assert!(log.0.borrow()[0].starts_with("Failed: "));
    }

    #[test]
    fn rebalance_job_only_on_month_end() {
        let prices = prices(&[("A", 0.10)]);
        let log = Lines::default();
        let orchestrator = CycleOrchestrator::new(&prices, &Sink, &log, config("A"));

        assert_eq!(
            orchestrator.run_job(JobKind::Rebalance, dt(2024, 12, 30, 16)),
            JobOutcome::NotRebalanceDay
        );
        assert!(log.0.borrow().is_empty());
        assert!(matches!(
            orchestrator.run_job(JobKind::Rebalance, dt(2024, 12, 31, 16)),
            JobOutcome::Cycle(CycleOutcome::Executed(_))
        ));
    }

    #[test]
    fn health_check_reports_components() {
        let prices = prices(&[("A", 0.10)]);
        let log = Lines::default();
        let orchestrator = CycleOrchestrator::new(&prices, &Sink, &log, config("A"));

        let report = orchestrator.health_check(dt(2024, 2, 10, 9));
        assert!(report.is_healthy());
        assert_eq!(report.components.len(), 3);
        assert_eq!(report.next_rebalance, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn tick_runs_due_jobs_once() {
        let prices = prices(&[("A", 0.10)]);
        let log = Lines::default();
        let mut scheduler = Scheduler::new(dt(2024, 12, 31, 8));
        scheduler.register(
            "rebalance",
            JobKind::Rebalance,
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        );
        let mut orchestrator =
            CycleOrchestrator::new(&prices, &Sink, &log, config("A")).with_scheduler(scheduler);

        assert!(orchestrator.tick(dt(2024, 12, 31, 15)).is_empty());
        let runs = orchestrator.tick(dt(2024, 12, 31, 16));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "rebalance");
        assert!(orchestrator.tick(dt(2024, 12, 31, 17)).is_empty());
        assert_eq!(log.0.borrow().len(), 1);
    }

    #[test]
    fn late_poll_still_runs_health_check_once() {
        let prices = prices(&[("A", 0.10)]);
        let log = Lines::default();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let mut scheduler = Scheduler::new(dt(2024, 6, 10, 0));
        scheduler.register("health_check", JobKind::HealthCheck, nine);
        let mut orchestrator =
            CycleOrchestrator::new(&prices, &Sink, &log, config("A")).with_scheduler(scheduler);
        let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let late = day.and_hms_opt(9, 7, 0).unwrap();

        assert!(!is_health_check_time(dt(2024, 6, 10, 8), nine, None));
        assert!(orchestrator.tick(dt(2024, 6, 10, 8)).is_empty());

        assert!(is_health_check_time(late, nine, None));
        let runs = orchestrator.tick(late);
        assert_eq!(runs.len(), 1);
        assert!(matches!(runs[0].outcome, JobOutcome::Health(_)));

        assert!(!is_health_check_time(dt(2024, 6, 10, 10), nine, Some(day)));
        assert!(orchestrator.tick(dt(2024, 6, 10, 10)).is_empty());
        assert_eq!(orchestrator.tick(dt(2024, 6, 11, 9)).len(), 1);
    }
}
