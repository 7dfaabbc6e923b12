//! Day-sync orchestration.
//!
//! Fans out per-technician feed fetches concurrently, then runs the pure
//! timeline builder for each technician. One technician's feed failure is
//! recorded and never aborts the rest of the roster. Progress can be
//! observed through an optional [`SyncTracker`], which stores run metadata
//! and log lines in memory for status endpoints to poll.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{CustomLocation, TechnicianId, TechnicianProfile, TimeWindow};
use crate::config::EngineConfig;
use crate::feeds::FeedSet;
use crate::models::time::utc_day_window;
use crate::services::timeline::{build, DayInputs, DayTimeline};

/// A single log entry with timestamp and message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Run status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Run metadata and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub run_id: String,
    pub date: NaiveDate,
    pub status: RunStatus,
    pub logs: Vec<LogEntry>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub timelines_built: usize,
    pub failure_count: usize,
}

/// In-memory sync-run tracker.
///
/// Log timestamps are wall-clock diagnostics for operators; they are not
/// part of any engine output.
#[derive(Clone)]
pub struct SyncTracker {
    runs: Arc<RwLock<HashMap<String, SyncRun>>>,
}

impl SyncTracker {
    /// Create a new tracker.
    pub fn new() -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new run for a date and return its ID.
    pub fn start_run(&self, date: NaiveDate) -> String {
        let run_id = Uuid::new_v4().to_string();
        let run = SyncRun {
            run_id: run_id.clone(),
            date,
            status: RunStatus::Running,
            logs: vec![],
            started_at: Utc::now(),
            completed_at: None,
            timelines_built: 0,
            failure_count: 0,
        };
        self.runs.write().insert(run_id.clone(), run);
        run_id
    }

    /// Add a log entry to a run.
    pub fn log(&self, run_id: &str, level: LogLevel, message: impl Into<String>) {
        let mut runs = self.runs.write();
        if let Some(run) = runs.get_mut(run_id) {
            run.logs.push(LogEntry {
                timestamp: Utc::now(),
                level,
                message: message.into(),
            });
        }
    }

    /// Mark a run as completed with its outcome counts.
    pub fn complete_run(&self, run_id: &str, timelines_built: usize, failure_count: usize) {
        let mut runs = self.runs.write();
        if let Some(run) = runs.get_mut(run_id) {
            run.status = RunStatus::Completed;
            run.completed_at = Some(Utc::now());
            run.timelines_built = timelines_built;
            run.failure_count = failure_count;
        }
    }

    /// Mark a run as failed.
    pub fn fail_run(&self, run_id: &str, error_message: impl Into<String>) {
        let mut runs = self.runs.write();
        if let Some(run) = runs.get_mut(run_id) {
            run.status = RunStatus::Failed;
            run.completed_at = Some(Utc::now());
            run.logs.push(LogEntry {
                timestamp: Utc::now(),
                level: LogLevel::Error,
                message: error_message.into(),
            });
        }
    }

    /// Get a run by ID.
    pub fn get_run(&self, run_id: &str) -> Option<SyncRun> {
        self.runs.read().get(run_id).cloned()
    }

    /// Get all logs for a run.
    pub fn get_logs(&self, run_id: &str) -> Vec<LogEntry> {
        self.runs
            .read()
            .get(run_id)
            .map(|run| run.logs.clone())
            .unwrap_or_default()
    }
}

impl Default for SyncTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Which fetch or step failed for a technician.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Schedule,
    Telemetry,
    Timeclock,
    Build,
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SyncStage::Schedule => "schedule",
            SyncStage::Telemetry => "telemetry",
            SyncStage::Timeclock => "timeclock",
            SyncStage::Build => "build",
        };
        write!(f, "{label}")
    }
}

/// One technician's failure inside an otherwise successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub technician_id: TechnicianId,
    pub stage: SyncStage,
    pub message: String,
}

/// Outcome of one roster-wide sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySyncReport {
    pub run_id: String,
    pub date: NaiveDate,
    pub timelines: Vec<DayTimeline>,
    pub failures: Vec<SyncFailure>,
    /// Technicians with no data at all for the date
    pub skipped: usize,
}

enum TechnicianOutcome {
    Built(Box<DayTimeline>),
    Skipped(TechnicianId),
    Failed(SyncFailure),
}

/// Sync one date for a roster of technicians.
///
/// Fetches run concurrently per technician; the pure builder then runs per
/// technician on the fetched data. Custom geofences are fetched once per
/// run and shared.
pub async fn sync_day(
    feeds: Arc<dyn FeedSet>,
    roster: &[TechnicianProfile],
    date: NaiveDate,
    config: &EngineConfig,
    now: DateTime<Utc>,
    tracker: Option<&SyncTracker>,
) -> DaySyncReport {
    let run_id = match tracker {
        Some(tracker) => tracker.start_run(date),
        None => Uuid::new_v4().to_string(),
    };
    if let Some(tracker) = tracker {
        tracker.log(
            &run_id,
            LogLevel::Info,
            format!("syncing {} technicians for {date}", roster.len()),
        );
    }

    let custom_locations = match feeds.fetch_custom_locations().await {
        Ok(locations) => locations,
        Err(err) => {
            log::warn!("custom geofence fetch failed, classifying without them: {err}");
            if let Some(tracker) = tracker {
                tracker.log(
                    &run_id,
                    LogLevel::Warning,
                    format!("custom geofence fetch failed: {err}"),
                );
            }
            Vec::new()
        }
    };

    let tasks = roster.iter().map(|technician| {
        let feeds = feeds.clone();
        let custom_locations = custom_locations.clone();
        async move {
            sync_technician(feeds, technician, date, custom_locations, config, now).await
        }
    });
    let outcomes = futures::future::join_all(tasks).await;

    let mut timelines = Vec::new();
    let mut failures = Vec::new();
    let mut skipped = 0;
    for outcome in outcomes {
        match outcome {
            TechnicianOutcome::Built(timeline) => timelines.push(*timeline),
            TechnicianOutcome::Skipped(technician_id) => {
                skipped += 1;
                if let Some(tracker) = tracker {
                    tracker.log(
                        &run_id,
                        LogLevel::Info,
                        format!("technician {technician_id}: no data for {date}, skipped"),
                    );
                }
            }
            TechnicianOutcome::Failed(failure) => {
                log::warn!(
                    "technician {} failed at {}: {}",
                    failure.technician_id,
                    failure.stage,
                    failure.message
                );
                if let Some(tracker) = tracker {
                    tracker.log(
                        &run_id,
                        LogLevel::Warning,
                        format!(
                            "technician {} failed at {}: {}",
                            failure.technician_id, failure.stage, failure.message
                        ),
                    );
                }
                failures.push(failure);
            }
        }
    }

    if let Some(tracker) = tracker {
        let level = if failures.is_empty() {
            LogLevel::Success
        } else {
            LogLevel::Warning
        };
        tracker.log(
            &run_id,
            level,
            format!(
                "built {} timelines, {} failures, {} skipped",
                timelines.len(),
                failures.len(),
                skipped
            ),
        );
        tracker.complete_run(&run_id, timelines.len(), failures.len());
    }

    DaySyncReport {
        run_id,
        date,
        timelines,
        failures,
        skipped,
    }
}

fn failed(
    technician_id: TechnicianId,
    stage: SyncStage,
    err: impl std::fmt::Display,
) -> TechnicianOutcome {
    TechnicianOutcome::Failed(SyncFailure {
        technician_id,
        stage,
        message: err.to_string(),
    })
}

async fn sync_technician(
    feeds: Arc<dyn FeedSet>,
    technician: &TechnicianProfile,
    date: NaiveDate,
    custom_locations: Vec<CustomLocation>,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> TechnicianOutcome {
    let jobs = match feeds.fetch_jobs(technician.id, date).await {
        Ok(jobs) => jobs,
        Err(err) => return failed(technician.id, SyncStage::Schedule, err),
    };
    let excused_visits = match feeds.fetch_excused_visits(technician.id, date).await {
        Ok(visits) => visits,
        Err(err) => return failed(technician.id, SyncStage::Schedule, err),
    };
    let manual_overrides = match feeds.fetch_overrides(technician.id, date).await {
        Ok(overrides) => overrides,
        Err(err) => return failed(technician.id, SyncStage::Schedule, err),
    };

    // No vehicle mapping degrades to empty telemetry; an actual fetch
    // failure is reported.
    let (segments, points) = match technician.vehicle_id {
        Some(vehicle) => {
            let segments = match feeds.fetch_segments(vehicle, date).await {
                Ok(segments) => segments,
                Err(err) => return failed(technician.id, SyncStage::Telemetry, err),
            };
            let day = utc_day_window(date);
            let window = TimeWindow {
                start: day.start - Duration::minutes(config.arrival_window_before_minutes),
                end: day.end + Duration::minutes(config.arrival_window_after_minutes),
            };
            let points = match feeds.fetch_breadcrumbs(vehicle, window).await {
                Ok(points) => points,
                Err(err) => return failed(technician.id, SyncStage::Telemetry, err),
            };
            (segments, points)
        }
        None => (Vec::new(), Vec::new()),
    };

    let raw_punches = match technician.employee_id {
        Some(employee) => match feeds.fetch_punches(employee, date).await {
            Ok(punches) => punches,
            Err(err) => return failed(technician.id, SyncStage::Timeclock, err),
        },
        None => Vec::new(),
    };

    if jobs.is_empty() && segments.is_empty() && points.is_empty() && raw_punches.is_empty() {
        return TechnicianOutcome::Skipped(technician.id);
    }

    let inputs = DayInputs {
        date,
        technician: technician.clone(),
        segments,
        jobs,
        raw_punches,
        points,
        custom_locations,
        excused_visits,
        manual_overrides,
    };
    match build(&inputs, config, now) {
        Ok(timeline) => TechnicianOutcome::Built(Box::new(timeline)),
        Err(err) => failed(technician.id, SyncStage::Build, err),
    }
}
