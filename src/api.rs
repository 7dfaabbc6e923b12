//! Public value types consumed and produced by the engine.
//!
//! This file consolidates the identifier newtypes and the normalized input
//! shapes the feeds deliver, plus re-exports of the output types each
//! service owns. All types derive Serialize/Deserialize for JSON
//! serialization.

pub use crate::services::arrival::ArrivalMatch;
pub use crate::services::arrival::ClosestApproach;
pub use crate::services::classify::CustomLocation;
pub use crate::services::classify::GeofenceBoundary;
pub use crate::services::classify::LocationCategory;
pub use crate::services::classify::LocationClass;
pub use crate::services::classify::LocationContext;
pub use crate::services::punches::PunchKind;
pub use crate::services::punches::PunchOrigin;
pub use crate::services::punches::PunchRecord;
pub use crate::services::punches::ReconciledPunches;
pub use crate::services::punches::ViolationReason;
pub use crate::services::reports::PeriodSummary;
pub use crate::services::reports::TechnicianPeriodRow;
pub use crate::services::reports::TrendPoint;
pub use crate::services::reports::WeekdayRow;
pub use crate::services::sync::DaySyncReport;
pub use crate::services::sync::SyncFailure;
pub use crate::services::timeline::BuildError;
pub use crate::services::timeline::DayInputs;
pub use crate::services::timeline::DaySummary;
pub use crate::services::timeline::DayTimeline;
pub use crate::services::timeline::EventKind;
pub use crate::services::timeline::TimelineEvent;

use chrono::{DateTime, NaiveDate, Utc};
use qtty::{Miles, Minutes};
use serde::{Deserialize, Serialize};

/// Technician identifier (dispatch-system key).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TechnicianId(pub i64);

/// Vehicle identifier (fleet-tracking key).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub i64);

/// Employee identifier (payroll-system key).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub i64);

/// Scheduled-job identifier.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct JobId(pub i64);

/// Custom-geofence identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomLocationId(pub i64);

impl TechnicianId {
    pub fn new(value: i64) -> Self {
        TechnicianId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl VehicleId {
    pub fn new(value: i64) -> Self {
        VehicleId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl EmployeeId {
    pub fn new(value: i64) -> Self {
        EmployeeId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl JobId {
    pub fn new(value: i64) -> Self {
        JobId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl CustomLocationId {
    pub fn new(value: i64) -> Self {
        CustomLocationId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TechnicianId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for CustomLocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TechnicianId> for i64 {
    fn from(id: TechnicianId) -> Self {
        id.0
    }
}

/// Geographic coordinate (WGS84 decimal degrees).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Validating constructor. Rejects out-of-range and non-finite values so
    /// the distance math never sees NaN or infinity.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err("Coordinates must be finite numbers".to_string());
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err("Latitude must be between -90 and 90 degrees".to_string());
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err("Longitude must be between -180 and 180 degrees".to_string());
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Half-open UTC time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive start instant
    pub start: DateTime<Utc>,
    /// Exclusive end instant
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Length of the interval in minutes.
    pub fn duration(&self) -> Minutes {
        Minutes::new((self.end - self.start).num_milliseconds() as f64 / 60_000.0)
    }

    /// Check if an instant lies inside this interval (inclusive start, exclusive end).
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// Check if this interval overlaps with another.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A single GPS fix from the fleet-tracking feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehiclePoint {
    /// Fix timestamp (UTC)
    pub time: DateTime<Utc>,
    /// Fix position
    pub position: Coordinate,
}

/// A continuous interval of vehicle motion reported by the fleet tracker.
///
/// Open-ended segments (`end_time`/`end_location` absent) mean the vehicle
/// was still moving at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSegment {
    /// Departure timestamp (UTC)
    pub start_time: DateTime<Utc>,
    /// Departure position
    pub start_location: Coordinate,
    /// Arrival timestamp, absent while the segment is open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Arrival position, absent while the segment is open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_location: Option<Coordinate>,
    /// Measured travel distance for the segment
    pub travel_distance: Miles,
    /// Peak speed over the segment in mph, when the tracker reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    /// Idle time accumulated during the segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_minutes: Option<Minutes>,
    /// Whether the tracker has closed the segment
    #[serde(default)]
    pub is_complete: bool,
}

impl VehicleSegment {
    /// Wall-clock duration of the segment, when it has closed.
    pub fn duration_minutes(&self) -> Option<Minutes> {
        self.end_time
            .map(|end| Minutes::new((end - self.start_time).num_milliseconds() as f64 / 60_000.0))
    }
}

/// Arrival-verification outcome for a scheduled job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArrivalVerification {
    /// Arrival verification does not apply (not the first job of the day).
    #[default]
    NotChecked,
    /// Job is scheduled after the injected "now"; not yet due.
    Pending,
    /// No GPS point satisfied the arrival window and radius. Carries the
    /// closest-approach diagnostic when any point exists for the day.
    Unverified {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        closest_approach: Option<ClosestApproach>,
    },
    /// Arrival confirmed by a GPS point inside the arrival radius.
    Verified { is_late: bool },
}

impl ArrivalVerification {
    pub fn is_verified(&self) -> bool {
        matches!(self, ArrivalVerification::Verified { .. })
    }

    pub fn is_unverified(&self) -> bool {
        matches!(self, ArrivalVerification::Unverified { .. })
    }
}

/// A scheduled job visit for a technician on a given date.
///
/// Created from the scheduling feed; `actual_arrival`, `variance_minutes`
/// and `verification` are derived by the timeline builder, never supplied
/// by the scheduling source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobVisit {
    pub job_id: JobId,
    /// Scheduled arrival instant (UTC)
    pub scheduled_start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end: Option<DateTime<Utc>>,
    /// Job-site coordinate
    pub location: Coordinate,
    /// Earliest appointment of the technician's day; the only one subject
    /// to arrival-time verification
    pub is_first_of_day: bool,
    #[serde(default)]
    pub is_follow_up: bool,
    /// Dispatch-system status, passed through unmodified
    #[serde(default)]
    pub status: String,
    /// GPS-derived (or operator-assigned) arrival instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_arrival: Option<DateTime<Utc>>,
    /// Signed whole minutes between actual and scheduled arrival; positive
    /// means late
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance_minutes: Option<Minutes>,
    #[serde(default)]
    pub verification: ArrivalVerification,
}

/// Kind of a raw paired punch row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchPairKind {
    /// Shift clock-in / clock-out pair
    Work,
    /// Meal-break start / end pair
    Meal,
}

/// A raw, loosely-paired punch row as the payroll feed delivers it.
///
/// Times arrive as strings that may lack timezone qualifiers; they pass
/// through the UTC-convention parser before any use. A single row often
/// carries both its own time and its paired counterpart's time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPunchRecord {
    pub employee_id: EmployeeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_in_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_out_time: Option<String>,
    pub pair_kind: PunchPairKind,
    /// Upstream system label, passed through for auditing
    #[serde(default)]
    pub source: String,
}

/// Per-technician configuration from the dispatch system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicianProfile {
    pub id: TechnicianId,
    pub name: String,
    /// Fleet vehicle assigned to this technician, when any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<VehicleId>,
    /// Payroll identity for punch lookups, when any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<EmployeeId>,
    /// Take-truck-home technicians are expected to clock in at a job site;
    /// office-reporting technicians at the office
    pub takes_truck_home: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_location: Option<Coordinate>,
    pub office_location: Coordinate,
    /// Exempts the technician from unnecessary-office-visit checks
    #[serde(default)]
    pub exclude_from_office_visits: bool,
    /// Per-technician override of the engine-wide grace threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_minutes: Option<i64>,
}

/// Operator approval of an office visit for a technician/date, suppressing
/// the unnecessary-visit flag and excusing office clock events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcusedVisit {
    pub technician_id: TechnicianId,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Operator-entered correction merged into the timeline.
///
/// Overrides take precedence over automatically derived values for the same
/// slot and are flagged manual in the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManualOverride {
    /// Bind a detected vehicle stop to a scheduled job. Also counts as a
    /// manual arrival verification for that job.
    AssignJobToStop {
        job_id: JobId,
        stop_time: DateTime<Utc>,
    },
    /// Replace a punch event's timestamp with an operator-corrected one.
    CorrectPunchTime {
        punch_kind: PunchKind,
        original_time: DateTime<Utc>,
        corrected_time: DateTime<Utc>,
    },
}
