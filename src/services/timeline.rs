//! Day timeline construction.
//!
//! Reassembles one technician's day from four independent feeds (vehicle
//! segments, scheduled jobs, punch rows, GPS breadcrumbs) plus operator
//! corrections into a single ordered event sequence with punctuality
//! verdicts and a summary block.
//!
//! The builder is pure: all inputs, the configuration, and the observation
//! instant `now` arrive as parameters, so two calls with identical inputs
//! produce byte-identical output. Events are collected unordered and put in
//! their final order by exactly one stable sort with a fixed kind tie-break.
//!
//! Missing optional inputs degrade to empty-list behavior. A blank
//! technician id or inputs dated outside the requested day are contract
//! violations and return [`BuildError`] instead of a defaulted timeline.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use qtty::{Feet, Miles, Minutes};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::api::{
    ArrivalVerification, Coordinate, CustomLocation, ExcusedVisit, JobId, JobVisit,
    ManualOverride, RawPunchRecord, TechnicianId, TechnicianProfile, VehiclePoint,
    VehicleSegment,
};
use crate::config::EngineConfig;
use crate::models::time::{utc_day_window, whole_minutes_between};
use crate::services::arrival::{closest_approach, find_arrival};
use crate::services::classify::{classify, LocationCategory, LocationClass, LocationContext};
use crate::services::fingerprint::day_input_fingerprint;
use crate::services::geo::Sphere;
use crate::services::punches::{reconcile, PunchKind, ReconciledPunches, ViolationReason};

/// Kind of a timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ClockIn,
    ClockOut,
    MealStart,
    MealEnd,
    JobArrival,
    MaterialPickup,
    Arrived,
    Departed,
}

impl EventKind {
    /// Tie-break rank for events sharing a timestamp: clock events, then
    /// job arrivals, then material pickups, then vehicle arrive/depart.
    fn source_rank(&self) -> u8 {
        match self {
            EventKind::ClockIn
            | EventKind::ClockOut
            | EventKind::MealStart
            | EventKind::MealEnd => 0,
            EventKind::JobArrival => 1,
            EventKind::MaterialPickup => 2,
            EventKind::Arrived => 3,
            EventKind::Departed => 4,
        }
    }
}

/// One atomic entry in a technician's day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_class: Option<LocationClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Travel time of the vehicle segment this departure opens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_minutes: Option<Minutes>,
    /// Travel distance of the vehicle segment this departure opens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_miles: Option<Miles>,
    /// Dwell at this stop until the next departure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<Minutes>,
    /// Whole minutes since the previous event in the final ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_minutes: Option<Minutes>,
    /// Gap since the previous event exceeds the suspicious threshold and no
    /// travel segment accounts for it
    pub has_untracked_time: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_late: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance_minutes: Option<Minutes>,
    pub is_violation: bool,
    pub can_be_excused: bool,
    pub is_unnecessary: bool,
    pub is_manual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TimelineEvent {
    fn at(kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            timestamp,
            location: None,
            location_class: None,
            job_id: None,
            travel_minutes: None,
            travel_miles: None,
            duration_minutes: None,
            elapsed_minutes: None,
            has_untracked_time: false,
            is_late: None,
            variance_minutes: None,
            is_violation: false,
            can_be_excused: false,
            is_unnecessary: false,
            is_manual: false,
            note: None,
        }
    }
}

/// Normalized inputs for one (technician, date) build.
///
/// Serializable so the whole bundle can be fingerprinted and archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayInputs {
    pub date: NaiveDate,
    pub technician: TechnicianProfile,
    #[serde(default)]
    pub segments: Vec<VehicleSegment>,
    #[serde(default)]
    pub jobs: Vec<JobVisit>,
    #[serde(default)]
    pub raw_punches: Vec<RawPunchRecord>,
    #[serde(default)]
    pub points: Vec<VehiclePoint>,
    #[serde(default)]
    pub custom_locations: Vec<CustomLocation>,
    #[serde(default)]
    pub excused_visits: Vec<ExcusedVisit>,
    #[serde(default)]
    pub manual_overrides: Vec<ManualOverride>,
}

/// Contract violations in the build request. Data-quality problems are
/// handled inline (dropped records, unverified jobs); these are caller
/// errors.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("technician id {id} is not a valid identifier")]
    InvalidTechnician { id: i64 },

    #[error("job {job_id} scheduled {scheduled} does not belong to day {date}")]
    JobOutsideDay {
        job_id: JobId,
        scheduled: DateTime<Utc>,
        date: NaiveDate,
    },

    #[error("segment starting {start} does not belong to day {date}")]
    SegmentOutsideDay {
        start: DateTime<Utc>,
        date: NaiveDate,
    },
}

/// Roll-up counters for one technician-day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub total_jobs: usize,
    pub jobs_verified_on_time: usize,
    pub jobs_verified_late: usize,
    pub jobs_unverified: usize,
    pub jobs_pending: usize,
    /// Verdict for the first job of the day, when verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_job_on_time: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_job_variance_minutes: Option<Minutes>,
    pub total_office_visits: usize,
    pub unnecessary_office_visits: usize,
    pub total_drive_minutes: Minutes,
    pub total_travel_miles: Miles,
    pub violations: usize,
    pub excusable_violations: usize,
    pub dropped_punch_records: usize,
    pub has_missing_clock_out: bool,
    pub overnight_at_office: bool,
}

/// The reconstructed day: ordered events, enriched jobs, and counters.
///
/// Rebuilt from scratch on every request; never incrementally patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTimeline {
    pub date: NaiveDate,
    pub technician_id: TechnicianId,
    pub events: Vec<TimelineEvent>,
    /// Scheduled jobs with verification outcomes attached
    pub jobs: Vec<JobVisit>,
    pub summary: DaySummary,
    /// SHA-256 over the canonical serialized inputs
    pub input_fingerprint: String,
}

/// Build the timeline for one technician-day.
pub fn build(
    inputs: &DayInputs,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<DayTimeline, BuildError> {
    validate_inputs(inputs)?;

    let technician = &inputs.technician;
    let sphere = config.sphere();
    let radius = config.arrival_radius();

    let mut jobs = ordered_jobs(&inputs.jobs);
    let context = LocationContext::for_day(technician, &inputs.custom_locations, &jobs);
    let has_excused_visit = inputs
        .excused_visits
        .iter()
        .any(|v| v.technician_id == technician.id && v.date == inputs.date);

    let mut events: Vec<TimelineEvent> = Vec::new();

    let coverage = emit_segment_events(inputs, &context, sphere, radius, &mut events);

    let manually_verified = verify_jobs(&mut jobs, inputs, config, now);
    emit_job_events(&jobs, &manually_verified, &mut events);

    let reconciled = reconcile(
        technician,
        &inputs.raw_punches,
        &inputs.points,
        &context,
        has_excused_visit,
        config,
    );
    emit_punch_events(&reconciled, &inputs.manual_overrides, &mut events);

    // The single final ordering pass. Everything before this point pushes
    // events in whatever order the feeds produced them.
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.kind.source_rank().cmp(&b.kind.source_rank()))
    });

    annotate_elapsed_and_gaps(&mut events, &coverage, config);
    annotate_dwell(&mut events);
    flag_office_visits(technician, has_excused_visit, &mut events);

    let summary = summarize(&jobs, &events, &reconciled);

    Ok(DayTimeline {
        date: inputs.date,
        technician_id: technician.id,
        events,
        jobs,
        summary,
        input_fingerprint: day_input_fingerprint(inputs),
    })
}

fn validate_inputs(inputs: &DayInputs) -> Result<(), BuildError> {
    if inputs.technician.id.value() <= 0 {
        return Err(BuildError::InvalidTechnician {
            id: inputs.technician.id.value(),
        });
    }

    // Jobs are scheduled in local wall-clock time, so a UTC instant may land
    // up to a day off the requested calendar date. Anything further out is a
    // routing mistake by the caller.
    let day = utc_day_window(inputs.date);
    let earliest = day.start - Duration::days(1);
    let latest = day.end + Duration::days(1);

    for job in &inputs.jobs {
        if job.scheduled_start < earliest || job.scheduled_start >= latest {
            return Err(BuildError::JobOutsideDay {
                job_id: job.job_id,
                scheduled: job.scheduled_start,
                date: inputs.date,
            });
        }
    }
    for segment in &inputs.segments {
        if segment.start_time < earliest || segment.start_time >= latest {
            return Err(BuildError::SegmentOutsideDay {
                start: segment.start_time,
                date: inputs.date,
            });
        }
    }
    Ok(())
}

/// Jobs sorted by scheduled start (job id as tie-break), with
/// `is_first_of_day` recomputed so exactly the earliest appointment carries
/// it regardless of what the scheduling feed claimed.
fn ordered_jobs(jobs: &[JobVisit]) -> Vec<JobVisit> {
    let mut ordered = jobs.to_vec();
    ordered.sort_by(|a, b| {
        a.scheduled_start
            .cmp(&b.scheduled_start)
            .then(a.job_id.cmp(&b.job_id))
    });
    for (index, job) in ordered.iter_mut().enumerate() {
        job.is_first_of_day = index == 0;
    }
    ordered
}

/// Emit departed/arrived events for each usable segment and return the time
/// intervals the kept segments cover (for untracked-gap subtraction). Open
/// segments cover from their start onward.
fn emit_segment_events(
    inputs: &DayInputs,
    context: &LocationContext,
    sphere: Sphere,
    radius: Feet,
    events: &mut Vec<TimelineEvent>,
) -> Vec<(DateTime<Utc>, Option<DateTime<Utc>>)> {
    let mut segments: Vec<&VehicleSegment> = inputs.segments.iter().collect();
    segments.sort_by_key(|s| s.start_time);

    let mut coverage = Vec::new();
    let mut previous_end: Option<DateTime<Utc>> = None;

    for segment in segments {
        if let Some(end) = segment.end_time {
            if end < segment.start_time {
                log::warn!(
                    "skipping segment ending {end} before its start {}",
                    segment.start_time
                );
                continue;
            }
        }
        if let Some(prev_end) = previous_end {
            if segment.start_time < prev_end {
                log::warn!(
                    "skipping segment starting {} inside the previous segment",
                    segment.start_time
                );
                continue;
            }
        }

        let mut departed = TimelineEvent::at(EventKind::Departed, segment.start_time);
        departed.location = Some(segment.start_location);
        departed.location_class = Some(classify(
            Some(segment.start_location),
            context,
            sphere,
            radius,
        ));
        departed.travel_minutes = segment.duration_minutes();
        departed.travel_miles = Some(segment.travel_distance);
        events.push(departed);

        if let (Some(end), Some(end_location)) = (segment.end_time, segment.end_location) {
            let class = classify(Some(end_location), context, sphere, radius);
            let mut arrived =
                TimelineEvent::at(arrival_kind(class, &inputs.custom_locations), end);
            arrived.location = Some(end_location);
            arrived.location_class = Some(class);
            events.push(arrived);
            previous_end = Some(end);
        }

        coverage.push((segment.start_time, segment.end_time));
    }

    coverage
}

/// Arrivals inside a supply-house geofence are material pickups, not plain
/// stops.
fn arrival_kind(class: LocationClass, custom_locations: &[CustomLocation]) -> EventKind {
    if let LocationClass::Custom { location_id } = class {
        let is_supply_house = custom_locations
            .iter()
            .any(|c| c.id == location_id && c.category == LocationCategory::SupplyHouse);
        if is_supply_house {
            return EventKind::MaterialPickup;
        }
    }
    EventKind::Arrived
}

/// Attach arrival verdicts to jobs. Operator job-to-stop assignments verify
/// any job they name; otherwise only the first job of the day is checked.
/// Returns the ids verified manually.
fn verify_jobs(
    jobs: &mut [JobVisit],
    inputs: &DayInputs,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> HashSet<JobId> {
    let technician = &inputs.technician;
    let sphere = config.sphere();
    let radius = config.arrival_radius();
    let grace = config.grace_for(technician);

    let mut manually_verified = HashSet::new();
    for entry in &inputs.manual_overrides {
        if let ManualOverride::AssignJobToStop { job_id, stop_time } = entry {
            match jobs.iter_mut().find(|j| j.job_id == *job_id) {
                Some(job) => {
                    let variance = whole_minutes_between(job.scheduled_start, *stop_time);
                    job.actual_arrival = Some(*stop_time);
                    job.variance_minutes = Some(Minutes::new(variance as f64));
                    job.verification = ArrivalVerification::Verified {
                        is_late: variance > grace,
                    };
                    manually_verified.insert(*job_id);
                }
                None => log::warn!("override names job {job_id} not scheduled this day"),
            }
        }
    }

    let trace = breadcrumb_trace(inputs);
    for job in jobs.iter_mut() {
        if manually_verified.contains(&job.job_id) || !job.is_first_of_day {
            continue;
        }
        if job.scheduled_start > now {
            job.verification = ArrivalVerification::Pending;
            continue;
        }

        let window = config.arrival_window(job.scheduled_start);
        match find_arrival(&trace, job.location, window, radius, sphere) {
            Some(hit) => {
                let variance = whole_minutes_between(job.scheduled_start, hit.time);
                job.actual_arrival = Some(hit.time);
                job.variance_minutes = Some(Minutes::new(variance as f64));
                job.verification = ArrivalVerification::Verified {
                    is_late: variance > grace,
                };
            }
            None => {
                job.verification = ArrivalVerification::Unverified {
                    closest_approach: closest_approach(&trace, job.location, sphere),
                };
            }
        }
    }

    manually_verified
}

/// Breadcrumbs when the tracker supplied them, otherwise the endpoints of
/// the day's segments as a sparse trace.
fn breadcrumb_trace(inputs: &DayInputs) -> Vec<VehiclePoint> {
    if !inputs.points.is_empty() {
        return inputs.points.clone();
    }
    let mut trace = Vec::new();
    for segment in &inputs.segments {
        trace.push(VehiclePoint {
            time: segment.start_time,
            position: segment.start_location,
        });
        if let (Some(end), Some(end_location)) = (segment.end_time, segment.end_location) {
            trace.push(VehiclePoint {
                time: end,
                position: end_location,
            });
        }
    }
    trace
}

fn emit_job_events(
    jobs: &[JobVisit],
    manually_verified: &HashSet<JobId>,
    events: &mut Vec<TimelineEvent>,
) {
    for job in jobs {
        let Some(arrival) = job.actual_arrival else {
            continue;
        };
        let mut event = TimelineEvent::at(EventKind::JobArrival, arrival);
        event.location = Some(job.location);
        event.location_class = Some(LocationClass::Job { job_id: job.job_id });
        event.job_id = Some(job.job_id);
        event.variance_minutes = job.variance_minutes;
        event.is_late = match job.verification {
            ArrivalVerification::Verified { is_late } => Some(is_late),
            _ => None,
        };
        event.is_manual = manually_verified.contains(&job.job_id);
        events.push(event);
    }
}

fn emit_punch_events(
    reconciled: &ReconciledPunches,
    overrides: &[ManualOverride],
    events: &mut Vec<TimelineEvent>,
) {
    for punch in &reconciled.punches {
        let mut timestamp = punch.time;
        let mut is_manual = false;
        for entry in overrides {
            if let ManualOverride::CorrectPunchTime {
                punch_kind,
                original_time,
                corrected_time,
            } = entry
            {
                if *punch_kind == punch.kind && *original_time == punch.time {
                    timestamp = *corrected_time;
                    is_manual = true;
                }
            }
        }

        let kind = match punch.kind {
            PunchKind::ClockIn => EventKind::ClockIn,
            PunchKind::ClockOut => EventKind::ClockOut,
            PunchKind::MealStart => EventKind::MealStart,
            PunchKind::MealEnd => EventKind::MealEnd,
        };
        let mut event = TimelineEvent::at(kind, timestamp);
        event.location = punch.gps_location;
        event.location_class = Some(punch.location_class);
        event.is_violation = punch.is_violation;
        event.can_be_excused = punch.can_be_excused;
        event.is_manual = is_manual;
        event.note = punch.violation_reason.map(|r| violation_note(r).to_string());
        events.push(event);
    }
}

fn violation_note(reason: ViolationReason) -> &'static str {
    match reason {
        ViolationReason::HomeClockEvent => "clock event at home",
        ViolationReason::OfficeClockEvent => "clock event at office without an excused visit",
        ViolationReason::NotAtJobSite => "clock event away from any job site",
        ViolationReason::NotAtOffice => "clock event away from the office",
    }
}

/// Fill `elapsed_minutes` between consecutive events and flag gaps the
/// suspicious-gap threshold catches. Travel segments subtract from a gap
/// before it is judged.
fn annotate_elapsed_and_gaps(
    events: &mut [TimelineEvent],
    coverage: &[(DateTime<Utc>, Option<DateTime<Utc>>)],
    config: &EngineConfig,
) {
    let threshold = Duration::minutes(config.untracked_gap_minutes);
    for index in 1..events.len() {
        let previous = events[index - 1].timestamp;
        let current = events[index].timestamp;
        events[index].elapsed_minutes =
            Some(Minutes::new(whole_minutes_between(previous, current) as f64));

        let gap = current - previous;
        if gap <= threshold {
            continue;
        }
        let mut covered = Duration::zero();
        for (start, end) in coverage {
            let covered_end = end.unwrap_or(current).min(current);
            let covered_start = (*start).max(previous);
            if covered_end > covered_start {
                covered = covered + (covered_end - covered_start);
            }
        }
        if gap - covered > threshold {
            events[index].has_untracked_time = true;
        }
    }
}

/// Dwell time at each stop: from the arrival to the next departure.
fn annotate_dwell(events: &mut [TimelineEvent]) {
    for index in 0..events.len() {
        if !matches!(
            events[index].kind,
            EventKind::Arrived | EventKind::MaterialPickup
        ) {
            continue;
        }
        let arrived_at = events[index].timestamp;
        let next_departure = (index + 1..events.len())
            .find(|&later| events[later].kind == EventKind::Departed);
        if let Some(later) = next_departure {
            let minutes =
                (events[later].timestamp - arrived_at).num_milliseconds() as f64 / 60_000.0;
            events[index].duration_minutes = Some(Minutes::new(minutes));
        }
    }
}

/// Flag office stops strictly between the first job departure and the last
/// job arrival of a take-home-truck technician, unless the technician is
/// exempt or an excused-visit record exists.
fn flag_office_visits(
    technician: &TechnicianProfile,
    has_excused_visit: bool,
    events: &mut [TimelineEvent],
) {
    if !technician.takes_truck_home
        || technician.exclude_from_office_visits
        || has_excused_visit
    {
        return;
    }

    let job_class = |event: &TimelineEvent| {
        matches!(event.location_class, Some(LocationClass::Job { .. }))
    };
    let first_job_departure = events
        .iter()
        .position(|e| e.kind == EventKind::Departed && job_class(e));
    let last_job_arrival = events.iter().rposition(|e| {
        matches!(e.kind, EventKind::Arrived | EventKind::JobArrival) && job_class(e)
    });

    let (Some(first), Some(last)) = (first_job_departure, last_job_arrival) else {
        return;
    };
    if first + 1 >= last {
        return;
    }
    for event in &mut events[first + 1..last] {
        if event.kind == EventKind::Arrived
            && event.location_class == Some(LocationClass::Office)
        {
            event.is_unnecessary = true;
        }
    }
}

fn summarize(
    jobs: &[JobVisit],
    events: &[TimelineEvent],
    reconciled: &ReconciledPunches,
) -> DaySummary {
    let mut verified_on_time = 0;
    let mut verified_late = 0;
    let mut unverified = 0;
    let mut pending = 0;
    for job in jobs {
        match job.verification {
            ArrivalVerification::Verified { is_late: false } => verified_on_time += 1,
            ArrivalVerification::Verified { is_late: true } => verified_late += 1,
            ArrivalVerification::Unverified { .. } => unverified += 1,
            ArrivalVerification::Pending => pending += 1,
            ArrivalVerification::NotChecked => {}
        }
    }

    let first_job = jobs.iter().find(|j| j.is_first_of_day);
    let first_job_on_time = first_job.and_then(|j| match j.verification {
        ArrivalVerification::Verified { is_late } => Some(!is_late),
        _ => None,
    });
    let first_job_variance_minutes = first_job.and_then(|j| j.variance_minutes);

    let office_arrival = |event: &&TimelineEvent| {
        event.kind == EventKind::Arrived
            && event.location_class == Some(LocationClass::Office)
    };
    let total_office_visits = events.iter().filter(office_arrival).count();
    let unnecessary_office_visits = events.iter().filter(|e| e.is_unnecessary).count();

    let total_drive_minutes = events
        .iter()
        .filter(|e| e.kind == EventKind::Departed)
        .filter_map(|e| e.travel_minutes)
        .fold(Minutes::new(0.0), |acc, m| acc + m);
    let total_travel_miles = events
        .iter()
        .filter(|e| e.kind == EventKind::Departed)
        .filter_map(|e| e.travel_miles)
        .fold(Miles::new(0.0), |acc, m| acc + m);

    let violations = reconciled.punches.iter().filter(|p| p.is_violation).count();
    let excusable_violations = reconciled
        .punches
        .iter()
        .filter(|p| p.is_violation && p.can_be_excused)
        .count();

    let overnight_at_office = match events
        .iter()
        .rposition(|e| matches!(e.kind, EventKind::Arrived | EventKind::MaterialPickup))
    {
        Some(last_stop) => {
            events[last_stop].location_class == Some(LocationClass::Office)
                && !events[last_stop + 1..]
                    .iter()
                    .any(|e| e.kind == EventKind::Departed)
        }
        None => false,
    };

    DaySummary {
        total_jobs: jobs.len(),
        jobs_verified_on_time: verified_on_time,
        jobs_verified_late: verified_late,
        jobs_unverified: unverified,
        jobs_pending: pending,
        first_job_on_time,
        first_job_variance_minutes,
        total_office_visits,
        unnecessary_office_visits,
        total_drive_minutes,
        total_travel_miles,
        violations,
        excusable_violations,
        dropped_punch_records: reconciled.dropped_records,
        has_missing_clock_out: reconciled.has_missing_clock_out(),
        overnight_at_office,
    }
}
