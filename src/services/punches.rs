//! Punch reconciliation.
//!
//! The payroll feed delivers loosely-paired rows: a clock-in row often
//! carries both its own time and its paired clock-out time, counterpart rows
//! may be missing entirely, and timestamps arrive as strings in mixed
//! formats. Reconciliation turns that into discrete, zone-qualified punch
//! events with pairing links, synthesized counterparts where the time is
//! known, a GPS location class per punch, and the first-in/last-out
//! violation policy applied.
//!
//! One bad record never blocks the rest of the day: unparseable sides are
//! dropped with a logged warning and counted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::api::{
    Coordinate, PunchPairKind, RawPunchRecord, TechnicianId, TechnicianProfile, VehiclePoint,
};
use crate::config::EngineConfig;
use crate::models::time::parse_feed_timestamp;
use crate::services::classify::{classify, LocationClass, LocationContext};

/// Kind of a discrete punch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchKind {
    ClockIn,
    ClockOut,
    MealStart,
    MealEnd,
}

impl PunchKind {
    /// The kind that closes (or opens) a pair with this one.
    pub fn counterpart(&self) -> PunchKind {
        match self {
            PunchKind::ClockIn => PunchKind::ClockOut,
            PunchKind::ClockOut => PunchKind::ClockIn,
            PunchKind::MealStart => PunchKind::MealEnd,
            PunchKind::MealEnd => PunchKind::MealStart,
        }
    }

    pub fn is_meal(&self) -> bool {
        matches!(self, PunchKind::MealStart | PunchKind::MealEnd)
    }

    fn sort_rank(&self) -> u8 {
        match self {
            PunchKind::ClockIn => 0,
            PunchKind::MealStart => 1,
            PunchKind::MealEnd => 2,
            PunchKind::ClockOut => 3,
        }
    }
}

/// How a punch event came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchOrigin {
    /// Independently reported by the payroll feed
    Feed,
    /// Split out of a paired row's known counterpart time
    Synthesized,
    /// Operator-corrected
    Manual,
}

/// Why a first-in or last-out punch violates location policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReason {
    /// Take-home technician clocked at home; never excusable
    HomeClockEvent,
    /// Take-home technician clocked at the office without an excused visit
    OfficeClockEvent,
    /// Take-home technician clocked somewhere that is not a job site
    NotAtJobSite,
    /// Office-reporting technician clocked away from the office
    NotAtOffice,
}

/// A reconciled, discrete punch event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchRecord {
    pub technician_id: TechnicianId,
    pub kind: PunchKind,
    pub time: DateTime<Utc>,
    /// Time of the counterpart punch, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_time: Option<DateTime<Utc>>,
    /// Nearest breadcrumb position within the lookup tolerance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_location: Option<Coordinate>,
    pub location_class: LocationClass,
    pub is_violation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_reason: Option<ViolationReason>,
    pub can_be_excused: bool,
    pub origin: PunchOrigin,
}

/// Output of [`reconcile`]: ordered punch events plus drop accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReconciledPunches {
    /// Chronologically ordered punch events
    pub punches: Vec<PunchRecord>,
    /// Punch sides discarded for unparseable or absent timestamps
    pub dropped_records: usize,
}

impl ReconciledPunches {
    /// Chronologically first clock-in of the day.
    pub fn first_clock_in(&self) -> Option<&PunchRecord> {
        self.punches.iter().find(|p| p.kind == PunchKind::ClockIn)
    }

    /// Chronologically last clock-out of the day.
    pub fn last_clock_out(&self) -> Option<&PunchRecord> {
        self.punches
            .iter()
            .rev()
            .find(|p| p.kind == PunchKind::ClockOut)
    }

    /// True when a clock-in never got a paired clock-out.
    pub fn has_missing_clock_out(&self) -> bool {
        self.punches
            .iter()
            .any(|p| p.kind == PunchKind::ClockIn && p.paired_time.is_none())
    }
}

/// Reconcile one technician's raw punch rows for a day.
///
/// `has_excused_visit` reflects an operator-approved office visit for this
/// technician/date; it suppresses the excusable office-clock-in violation
/// for take-home technicians.
pub fn reconcile(
    technician: &TechnicianProfile,
    raw: &[RawPunchRecord],
    points: &[VehiclePoint],
    context: &LocationContext,
    has_excused_visit: bool,
    config: &EngineConfig,
) -> ReconciledPunches {
    let mut dropped = 0usize;
    let mut punches = split_raw_records(technician, raw, &mut dropped);

    drop_duplicate_synthesized(&mut punches);

    punches.sort_by(|a, b| a.time.cmp(&b.time).then(a.kind.sort_rank().cmp(&b.kind.sort_rank())));

    link_pairs(&mut punches);

    let sphere = config.sphere();
    let radius = config.arrival_radius();
    let tolerance = config.punch_tolerance();
    for punch in punches.iter_mut() {
        punch.gps_location =
            nearest_point_within(points, punch.time, tolerance).map(|p| p.position);
        punch.location_class = classify(punch.gps_location, context, sphere, radius);
    }

    apply_violation_policy(technician, has_excused_visit, &mut punches);

    ReconciledPunches {
        punches,
        dropped_records: dropped,
    }
}

fn split_raw_records(
    technician: &TechnicianProfile,
    raw: &[RawPunchRecord],
    dropped: &mut usize,
) -> Vec<PunchRecord> {
    let mut punches = Vec::new();

    for record in raw {
        if let Some(expected) = technician.employee_id {
            if record.employee_id != expected {
                log::warn!(
                    "skipping punch row for employee {} while reconciling employee {expected}",
                    record.employee_id
                );
                continue;
            }
        }

        let (start_kind, end_kind) = match record.pair_kind {
            PunchPairKind::Work => (PunchKind::ClockIn, PunchKind::ClockOut),
            PunchPairKind::Meal => (PunchKind::MealStart, PunchKind::MealEnd),
        };

        let clock_in = parse_side(record.clock_in_time.as_deref(), "clock-in", record, dropped);
        let clock_out =
            parse_side(record.clock_out_time.as_deref(), "clock-out", record, dropped);

        match (clock_in, clock_out) {
            (Some(time_in), Some(time_out)) => {
                // The row is the in-side record; the out side exists only as
                // the row's paired timestamp, so it is synthesized.
                punches.push(base_punch(technician.id, start_kind, time_in, Some(time_out), PunchOrigin::Feed));
                punches.push(base_punch(
                    technician.id,
                    end_kind,
                    time_out,
                    Some(time_in),
                    PunchOrigin::Synthesized,
                ));
            }
            (Some(time_in), None) => {
                punches.push(base_punch(technician.id, start_kind, time_in, None, PunchOrigin::Feed));
            }
            (None, Some(time_out)) => {
                punches.push(base_punch(technician.id, end_kind, time_out, None, PunchOrigin::Feed));
            }
            (None, None) => {
                if record.clock_in_time.is_none() && record.clock_out_time.is_none() {
                    log::warn!(
                        "dropping punch row with no times for employee {}",
                        record.employee_id
                    );
                    *dropped += 1;
                }
            }
        }
    }

    punches
}

fn parse_side(
    raw_time: Option<&str>,
    side: &str,
    record: &RawPunchRecord,
    dropped: &mut usize,
) -> Option<DateTime<Utc>> {
    let raw_time = raw_time?;
    match parse_feed_timestamp(raw_time) {
        Ok(time) => Some(time),
        Err(err) => {
            log::warn!(
                "dropping {side} punch for employee {}: {err:#}",
                record.employee_id
            );
            *dropped += 1;
            None
        }
    }
}

fn base_punch(
    technician_id: TechnicianId,
    kind: PunchKind,
    time: DateTime<Utc>,
    paired_time: Option<DateTime<Utc>>,
    origin: PunchOrigin,
) -> PunchRecord {
    PunchRecord {
        technician_id,
        kind,
        time,
        paired_time,
        gps_location: None,
        location_class: LocationClass::NoGps,
        is_violation: false,
        violation_reason: None,
        can_be_excused: false,
        origin,
    }
}

/// When the feed also delivered a discrete row for a time we synthesized,
/// keep the feed-reported event and drop the synthesized duplicate.
fn drop_duplicate_synthesized(punches: &mut Vec<PunchRecord>) {
    let feed_keys: HashSet<(PunchKind, i64)> = punches
        .iter()
        .filter(|p| p.origin == PunchOrigin::Feed)
        .map(|p| (p.kind, p.time.timestamp_millis()))
        .collect();
    punches.retain(|p| {
        p.origin != PunchOrigin::Synthesized
            || !feed_keys.contains(&(p.kind, p.time.timestamp_millis()))
    });
}

/// Link unpaired punches.
///
/// First honor explicit references: an unpaired event whose counterpart
/// already points at its time gets linked back. Then pair leftovers
/// chronologically (each start with the next unclaimed end of its kind).
/// Unknown times are never invented; a start with no end stays unpaired.
fn link_pairs(punches: &mut [PunchRecord]) {
    // Back-links for events referenced by an already-paired counterpart.
    let mut back_links: Vec<(usize, DateTime<Utc>)> = Vec::new();
    for (j, punch) in punches.iter().enumerate() {
        if punch.paired_time.is_some() {
            continue;
        }
        let counterpart = punch.kind.counterpart();
        if let Some(owner) = punches
            .iter()
            .find(|p| p.kind == counterpart && p.paired_time == Some(punch.time))
        {
            back_links.push((j, owner.time));
        }
    }
    for (j, time) in back_links {
        punches[j].paired_time = Some(time);
    }

    // Chronological fallback for discrete-row feeds.
    let mut links: Vec<(usize, usize)> = Vec::new();
    let mut claimed = vec![false; punches.len()];
    for i in 0..punches.len() {
        let end_kind = match punches[i].kind {
            PunchKind::ClockIn => PunchKind::ClockOut,
            PunchKind::MealStart => PunchKind::MealEnd,
            _ => continue,
        };
        if punches[i].paired_time.is_some() {
            continue;
        }
        for j in i + 1..punches.len() {
            if !claimed[j] && punches[j].kind == end_kind && punches[j].paired_time.is_none() {
                links.push((i, j));
                claimed[j] = true;
                break;
            }
        }
    }
    for (i, j) in links {
        let end_time = punches[j].time;
        let start_time = punches[i].time;
        punches[i].paired_time = Some(end_time);
        punches[j].paired_time = Some(start_time);
    }
}

/// Nearest breadcrumb to `target` within `tolerance`; ties keep the earlier
/// point.
fn nearest_point_within(
    points: &[VehiclePoint],
    target: DateTime<Utc>,
    tolerance: Duration,
) -> Option<VehiclePoint> {
    let limit = tolerance.num_milliseconds().abs();
    let mut best: Option<(i64, VehiclePoint)> = None;
    for point in points {
        let offset = (point.time - target).num_milliseconds().abs();
        if offset > limit {
            continue;
        }
        let better = match &best {
            Some((current, _)) => offset < *current,
            None => true,
        };
        if better {
            best = Some((offset, *point));
        }
    }
    best.map(|(_, point)| point)
}

/// Location policy for first clock-in and last clock-out. Mid-day punches
/// are exempt regardless of location; `NoGps` suppresses the check.
fn apply_violation_policy(
    technician: &TechnicianProfile,
    has_excused_visit: bool,
    punches: &mut [PunchRecord],
) {
    let first_in = punches.iter().position(|p| p.kind == PunchKind::ClockIn);
    let last_out = punches.iter().rposition(|p| p.kind == PunchKind::ClockOut);

    for index in [first_in, last_out].into_iter().flatten() {
        let class = punches[index].location_class;
        if let Some((reason, excusable)) =
            violation_for(technician.takes_truck_home, class, has_excused_visit)
        {
            punches[index].is_violation = true;
            punches[index].violation_reason = Some(reason);
            punches[index].can_be_excused = excusable;
        }
    }
}

fn violation_for(
    takes_truck_home: bool,
    class: LocationClass,
    has_excused_visit: bool,
) -> Option<(ViolationReason, bool)> {
    if takes_truck_home {
        match class {
            LocationClass::Job { .. } | LocationClass::NoGps => None,
            LocationClass::Home => Some((ViolationReason::HomeClockEvent, false)),
            LocationClass::Office => {
                if has_excused_visit {
                    None
                } else {
                    Some((ViolationReason::OfficeClockEvent, true))
                }
            }
            LocationClass::Custom { .. } | LocationClass::Unknown => {
                Some((ViolationReason::NotAtJobSite, true))
            }
        }
    } else {
        match class {
            LocationClass::Office | LocationClass::NoGps => None,
            _ => Some((ViolationReason::NotAtOffice, false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EmployeeId, JobId, TechnicianId};
    use chrono::TimeZone;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, s).unwrap()
    }

    fn technician(takes_truck_home: bool) -> TechnicianProfile {
        TechnicianProfile {
            id: TechnicianId::new(5),
            name: "Riley Mata".to_string(),
            vehicle_id: None,
            employee_id: Some(EmployeeId::new(505)),
            takes_truck_home,
            home_location: Some(coord(34.05, -118.05)),
            office_location: coord(34.0, -118.0),
            exclude_from_office_visits: false,
            grace_minutes: None,
        }
    }

    fn context() -> LocationContext {
        LocationContext {
            office: coord(34.0, -118.0),
            home: Some(coord(34.05, -118.05)),
            custom_locations: vec![],
            job_sites: vec![(JobId::new(901), coord(34.1, -117.95))],
        }
    }

    fn work_row(clock_in: Option<&str>, clock_out: Option<&str>) -> RawPunchRecord {
        RawPunchRecord {
            employee_id: EmployeeId::new(505),
            clock_in_time: clock_in.map(str::to_string),
            clock_out_time: clock_out.map(str::to_string),
            pair_kind: PunchPairKind::Work,
            source: "payroll".to_string(),
        }
    }

    fn breadcrumb(time: DateTime<Utc>, position: Coordinate) -> VehiclePoint {
        VehiclePoint { time, position }
    }

    #[test]
    fn test_paired_row_splits_into_two_events_one_synthesized() {
        let raw = vec![work_row(
            Some("2024-03-04 13:00:00"),
            Some("2024-03-04 22:00:00"),
        )];
        let result = reconcile(
            &technician(true),
            &raw,
            &[],
            &context(),
            false,
            &EngineConfig::default(),
        );

        assert_eq!(result.punches.len(), 2);
        assert_eq!(result.dropped_records, 0);

        let clock_in = &result.punches[0];
        let clock_out = &result.punches[1];
        assert_eq!(clock_in.kind, PunchKind::ClockIn);
        assert_eq!(clock_in.time, at(13, 0, 0));
        assert_eq!(clock_in.paired_time, Some(at(22, 0, 0)));
        assert_eq!(clock_in.origin, PunchOrigin::Feed);

        assert_eq!(clock_out.kind, PunchKind::ClockOut);
        assert_eq!(clock_out.time, at(22, 0, 0));
        assert_eq!(clock_out.paired_time, Some(at(13, 0, 0)));
        assert_eq!(clock_out.origin, PunchOrigin::Synthesized);
    }

    #[test]
    fn test_missing_side_is_never_invented() {
        let raw = vec![work_row(Some("2024-03-04 13:00:00"), None)];
        let result = reconcile(
            &technician(true),
            &raw,
            &[],
            &context(),
            false,
            &EngineConfig::default(),
        );

        assert_eq!(result.punches.len(), 1);
        assert_eq!(result.punches[0].kind, PunchKind::ClockIn);
        assert!(result.punches[0].paired_time.is_none());
        assert!(result.has_missing_clock_out());
    }

    #[test]
    fn test_meal_rows_become_meal_events() {
        let raw = vec![RawPunchRecord {
            pair_kind: PunchPairKind::Meal,
            ..work_row(Some("2024-03-04 17:00:00"), Some("2024-03-04 17:30:00"))
        }];
        let result = reconcile(
            &technician(true),
            &raw,
            &[],
            &context(),
            false,
            &EngineConfig::default(),
        );
        assert_eq!(result.punches[0].kind, PunchKind::MealStart);
        assert_eq!(result.punches[1].kind, PunchKind::MealEnd);
    }

    #[test]
    fn test_unparseable_side_dropped_rest_continue() {
        let raw = vec![
            work_row(Some("not a time"), Some("2024-03-04 22:00:00")),
            work_row(Some("2024-03-04 13:00:00"), None),
        ];
        let result = reconcile(
            &technician(true),
            &raw,
            &[],
            &context(),
            false,
            &EngineConfig::default(),
        );

        assert_eq!(result.dropped_records, 1);
        // The bad row's out side survives; the good row's in side survives.
        assert_eq!(result.punches.len(), 2);
        assert_eq!(result.punches[0].kind, PunchKind::ClockIn);
        assert_eq!(result.punches[1].kind, PunchKind::ClockOut);
        // Orphan sides pair up chronologically.
        assert_eq!(result.punches[0].paired_time, Some(at(22, 0, 0)));
        assert_eq!(result.punches[1].paired_time, Some(at(13, 0, 0)));
    }

    #[test]
    fn test_row_with_no_times_counts_as_dropped() {
        let raw = vec![work_row(None, None)];
        let result = reconcile(
            &technician(true),
            &raw,
            &[],
            &context(),
            false,
            &EngineConfig::default(),
        );
        assert!(result.punches.is_empty());
        assert_eq!(result.dropped_records, 1);
    }

    #[test]
    fn test_discrete_rows_link_without_synthesis() {
        let raw = vec![
            work_row(Some("2024-03-04 13:00:00"), None),
            work_row(None, Some("2024-03-04 22:00:00")),
        ];
        let result = reconcile(
            &technician(true),
            &raw,
            &[],
            &context(),
            false,
            &EngineConfig::default(),
        );

        assert_eq!(result.punches.len(), 2);
        assert!(result
            .punches
            .iter()
            .all(|p| p.origin == PunchOrigin::Feed));
        assert_eq!(result.punches[0].paired_time, Some(at(22, 0, 0)));
        assert_eq!(result.punches[1].paired_time, Some(at(13, 0, 0)));
        assert!(!result.has_missing_clock_out());
    }

    #[test]
    fn test_feed_duplicate_replaces_synthesized() {
        let raw = vec![
            work_row(Some("2024-03-04 13:00:00"), Some("2024-03-04 22:00:00")),
            work_row(None, Some("2024-03-04 22:00:00")),
        ];
        let result = reconcile(
            &technician(true),
            &raw,
            &[],
            &context(),
            false,
            &EngineConfig::default(),
        );

        assert_eq!(result.punches.len(), 2);
        let clock_out = result.punches.iter().find(|p| p.kind == PunchKind::ClockOut).unwrap();
        assert_eq!(clock_out.origin, PunchOrigin::Feed);
        assert_eq!(clock_out.paired_time, Some(at(13, 0, 0)));
    }

    #[test]
    fn test_rows_for_other_employees_are_skipped() {
        let mut foreign = work_row(Some("2024-03-04 13:00:00"), None);
        foreign.employee_id = EmployeeId::new(999);
        let result = reconcile(
            &technician(true),
            &[foreign],
            &[],
            &context(),
            false,
            &EngineConfig::default(),
        );
        assert!(result.punches.is_empty());
    }

    #[test]
    fn test_take_home_first_in_at_home_not_excusable() {
        let raw = vec![work_row(
            Some("2024-03-04 13:00:00"),
            Some("2024-03-04 22:00:00"),
        )];
        let points = vec![breadcrumb(at(13, 2, 0), coord(34.05, -118.05))];
        let result = reconcile(
            &technician(true),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );

        let first = result.first_clock_in().unwrap();
        assert_eq!(first.location_class, LocationClass::Home);
        assert!(first.is_violation);
        assert_eq!(first.violation_reason, Some(ViolationReason::HomeClockEvent));
        assert!(!first.can_be_excused);
    }

    #[test]
    fn test_take_home_first_in_at_office_excusable() {
        let raw = vec![work_row(Some("2024-03-04 13:00:00"), None)];
        let points = vec![breadcrumb(at(13, 0, 0), coord(34.0, -118.0))];
        let result = reconcile(
            &technician(true),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );

        let first = result.first_clock_in().unwrap();
        assert_eq!(first.location_class, LocationClass::Office);
        assert!(first.is_violation);
        assert_eq!(
            first.violation_reason,
            Some(ViolationReason::OfficeClockEvent)
        );
        assert!(first.can_be_excused);
    }

    #[test]
    fn test_excused_visit_suppresses_office_violation() {
        let raw = vec![work_row(Some("2024-03-04 13:00:00"), None)];
        let points = vec![breadcrumb(at(13, 0, 0), coord(34.0, -118.0))];
        let result = reconcile(
            &technician(true),
            &raw,
            &points,
            &context(),
            true,
            &EngineConfig::default(),
        );
        assert!(!result.first_clock_in().unwrap().is_violation);
    }

    #[test]
    fn test_take_home_first_in_at_job_site_clean() {
        let raw = vec![work_row(Some("2024-03-04 13:00:00"), None)];
        let points = vec![breadcrumb(at(13, 0, 0), coord(34.1, -117.95))];
        let result = reconcile(
            &technician(true),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );
        let first = result.first_clock_in().unwrap();
        assert!(first.location_class.is_job());
        assert!(!first.is_violation);
    }

    #[test]
    fn test_take_home_unknown_location_excusable_violation() {
        let raw = vec![work_row(Some("2024-03-04 13:00:00"), None)];
        let points = vec![breadcrumb(at(13, 0, 0), coord(35.0, -119.0))];
        let result = reconcile(
            &technician(true),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );
        let first = result.first_clock_in().unwrap();
        assert_eq!(first.location_class, LocationClass::Unknown);
        assert_eq!(first.violation_reason, Some(ViolationReason::NotAtJobSite));
        assert!(first.can_be_excused);
    }

    #[test]
    fn test_office_reporter_away_from_office_not_excusable() {
        let raw = vec![work_row(Some("2024-03-04 13:00:00"), None)];
        let points = vec![breadcrumb(at(13, 0, 0), coord(34.05, -118.05))];
        let result = reconcile(
            &technician(false),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );
        let first = result.first_clock_in().unwrap();
        assert!(first.is_violation);
        assert_eq!(first.violation_reason, Some(ViolationReason::NotAtOffice));
        assert!(!first.can_be_excused);
    }

    #[test]
    fn test_office_reporter_at_office_clean() {
        let raw = vec![work_row(Some("2024-03-04 13:00:00"), None)];
        let points = vec![breadcrumb(at(13, 0, 0), coord(34.0, -118.0))];
        let result = reconcile(
            &technician(false),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );
        assert!(!result.first_clock_in().unwrap().is_violation);
    }

    #[test]
    fn test_no_breadcrumb_within_tolerance_suppresses_check() {
        let raw = vec![work_row(Some("2024-03-04 13:00:00"), None)];
        // 20 minutes out, beyond the ±10 minute tolerance.
        let points = vec![breadcrumb(at(13, 20, 0), coord(34.05, -118.05))];
        let result = reconcile(
            &technician(true),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );
        let first = result.first_clock_in().unwrap();
        assert_eq!(first.location_class, LocationClass::NoGps);
        assert!(first.gps_location.is_none());
        assert!(!first.is_violation);
    }

    #[test]
    fn test_mid_day_punches_exempt_from_policy() {
        let raw = vec![
            work_row(Some("2024-03-04 13:00:00"), Some("2024-03-04 16:00:00")),
            work_row(Some("2024-03-04 17:00:00"), Some("2024-03-04 22:00:00")),
        ];
        // Mid-day punches at home; first-in and last-out at a job site.
        let points = vec![
            breadcrumb(at(13, 0, 0), coord(34.1, -117.95)),
            breadcrumb(at(16, 0, 0), coord(34.05, -118.05)),
            breadcrumb(at(17, 0, 0), coord(34.05, -118.05)),
            breadcrumb(at(22, 0, 0), coord(34.1, -117.95)),
        ];
        let result = reconcile(
            &technician(true),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );

        assert_eq!(result.punches.len(), 4);
        let violations: Vec<_> = result.punches.iter().filter(|p| p.is_violation).collect();
        assert!(violations.is_empty());
        // The mid-day events really were classified at home.
        assert_eq!(result.punches[1].location_class, LocationClass::Home);
        assert_eq!(result.punches[2].location_class, LocationClass::Home);
    }

    #[test]
    fn test_last_out_at_home_is_violation_for_take_home() {
        let raw = vec![work_row(
            Some("2024-03-04 13:00:00"),
            Some("2024-03-04 22:00:00"),
        )];
        let points = vec![
            breadcrumb(at(13, 0, 0), coord(34.1, -117.95)),
            breadcrumb(at(22, 0, 0), coord(34.05, -118.05)),
        ];
        let result = reconcile(
            &technician(true),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );

        let last = result.last_clock_out().unwrap();
        assert_eq!(last.location_class, LocationClass::Home);
        assert!(last.is_violation);
        assert!(!last.can_be_excused);
        assert!(!result.first_clock_in().unwrap().is_violation);
    }

    #[test]
    fn test_nearest_breadcrumb_wins() {
        let raw = vec![work_row(Some("2024-03-04 13:00:00"), None)];
        let points = vec![
            breadcrumb(at(12, 55, 0), coord(34.0, -118.0)),  // office, 5 min away
            breadcrumb(at(13, 1, 0), coord(34.1, -117.95)),  // job, 1 min away
        ];
        let result = reconcile(
            &technician(true),
            &raw,
            &points,
            &context(),
            false,
            &EngineConfig::default(),
        );
        assert!(result.punches[0].location_class.is_job());
    }
}
