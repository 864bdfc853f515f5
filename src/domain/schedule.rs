//! Calendar triggers and the daily job scheduler.
//!
//! The predicates here are pure. [`is_slot_due`] decides whether a daily slot
//! is open; the [`Scheduler`] applies it to each registered job, so a job runs
//! at most once per calendar day, at or after its time of day.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use std::time::Duration;

pub const DEFAULT_REBALANCE_TIME: &str = "16:00";
pub const DEFAULT_HEALTH_CHECK_TIME: &str = "09:00";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const MAX_POLL_INTERVAL_SECS: u64 = 60;

/// True on the last calendar day of the month.
pub fn is_rebalance_day(date: NaiveDate) -> bool {
    match date.succ_opt() {
        Some(next) => next.month() != date.month(),
        None => true,
    }
}

/// True once today's `at` has been reached, unless the job already fired today.
pub fn is_slot_due(now: NaiveDateTime, at: NaiveTime, last_fired: Option<NaiveDate>) -> bool {
    let today = now.date();
    today.and_time(at) <= now && last_fired != Some(today)
}

/// Health check trigger: the first poll at or after `at` on any calendar day.
pub fn is_health_check_time(
    now: NaiveDateTime,
    at: NaiveTime,
    last_fired: Option<NaiveDate>,
) -> bool {
    is_slot_due(now, at, last_fired)
}

/// Last day of the month containing `date`.
pub fn next_rebalance_date(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Parses `HH:MM` (or `HH:MM:SS`).
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    pub rebalance_time: NaiveTime,
    pub health_check_time: NaiveTime,
    pub poll_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            rebalance_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            health_check_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Daily check that rebalances on the last day of the month.
    Rebalance,
    HealthCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Due,
    Running,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub name: String,
    pub kind: JobKind,
    pub at: NaiveTime,
    pub state: JobState,
    pub last_fired: Option<NaiveDate>,
}

/// Registered daily jobs and their firing state.
#[derive(Debug, Clone)]
pub struct Scheduler {
    started_at: NaiveDateTime,
    jobs: Vec<Job>,
}

impl Scheduler {
    /// Jobs whose time of day has already passed at `started_at` first fire
    /// on the following day.
    pub fn new(started_at: NaiveDateTime) -> Self {
        Scheduler {
            started_at,
            jobs: Vec::new(),
        }
    }

    pub fn from_config(started_at: NaiveDateTime, config: &ScheduleConfig) -> Self {
        let mut scheduler = Scheduler::new(started_at);
        scheduler.register("rebalance", JobKind::Rebalance, config.rebalance_time);
        scheduler.register("health_check", JobKind::HealthCheck, config.health_check_time);
        scheduler
    }

    pub fn register(&mut self, name: &str, kind: JobKind, at: NaiveTime) {
        self.jobs.push(Job {
            name: name.to_string(),
            kind,
            at,
            state: JobState::Idle,
            last_fired: None,
        });
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, index: usize) -> Option<&Job> {
        self.jobs.get(index)
    }

    fn is_due(&self, job: &Job, now: NaiveDateTime) -> bool {
        let slot_due = match job.kind {
            JobKind::HealthCheck => is_health_check_time(now, job.at, job.last_fired),
            JobKind::Rebalance => is_slot_due(now, job.at, job.last_fired),
        };
        job.state == JobState::Idle && slot_due && now.date().and_time(job.at) >= self.started_at
    }

    /// Moves every Idle job whose slot has arrived to Due and returns their
    /// indices in registration order.
    pub fn due_jobs(&mut self, now: NaiveDateTime) -> Vec<usize> {
        let due: Vec<usize> = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| self.is_due(job, now))
            .map(|(i, _)| i)
            .collect();
        for &i in &due {
            self.jobs[i].state = JobState::Due;
        }
        due
    }

    /// Due → Running. Returns `None` if the job is not Due.
    pub fn begin(&mut self, index: usize) -> Option<JobKind> {
        let job = self.jobs.get_mut(index)?;
        if job.state != JobState::Due {
            return None;
        }
        job.state = JobState::Running;
        Some(job.kind)
    }

    /// Running → Idle, whether the run succeeded or not.
    pub fn finish(&mut self, index: usize, fired_on: NaiveDate) {
        if let Some(job) = self.jobs.get_mut(index) {
            if job.state == JobState::Running {
                job.state = JobState::Idle;
                job.last_fired = Some(fired_on);
            }
        }
    }
}
