//! Upstream data-source abstraction.
//!
//! The engine consumes already-normalized values from three independent
//! sources: the dispatch/scheduling system, the fleet telemetry provider,
//! and the payroll timeclock. Each is modeled as an async trait so the
//! orchestrator can fan out per technician without caring which transport
//! sits behind it, and so the test suites can swap in the in-memory
//! [`local::LocalFeeds`] implementation.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::api::{
    CustomLocation, EmployeeId, ExcusedVisit, JobVisit, ManualOverride, RawPunchRecord,
    TechnicianId, TimeWindow, VehicleId, VehiclePoint, VehicleSegment,
};

pub mod credentials;
pub mod error;
#[cfg(feature = "local-feeds")]
pub mod local;

pub use credentials::{AccessToken, CachedCredentials, TokenSource};
pub use error::{ErrorContext, FeedError, FeedResult};

/// Feed trait for the dispatch/scheduling system.
///
/// Supplies the planned side of a technician's day plus the operator-entered
/// records that adjust how the engine judges it.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait SchedulingFeed: Send + Sync {
    /// Fetch the jobs scheduled for a technician on a date.
    ///
    /// # Arguments
    /// * `technician` - The technician whose schedule to read
    /// * `date` - The calendar date of interest
    ///
    /// # Returns
    /// * `Ok(Vec<JobVisit>)` - Scheduled visits, derived fields unset
    /// * `Err(FeedError)` - If the source cannot be read
    async fn fetch_jobs(
        &self,
        technician: TechnicianId,
        date: NaiveDate,
    ) -> FeedResult<Vec<JobVisit>>;

    /// Fetch operator-approved office visits for a technician/date.
    async fn fetch_excused_visits(
        &self,
        technician: TechnicianId,
        date: NaiveDate,
    ) -> FeedResult<Vec<ExcusedVisit>>;

    /// Fetch manual overrides recorded for a technician/date.
    async fn fetch_overrides(
        &self,
        technician: TechnicianId,
        date: NaiveDate,
    ) -> FeedResult<Vec<ManualOverride>>;

    /// Fetch the shared custom geofence list.
    ///
    /// Not technician-scoped; the orchestrator fetches it once per run.
    async fn fetch_custom_locations(&self) -> FeedResult<Vec<CustomLocation>>;
}

/// Feed trait for the fleet telemetry provider.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait TelemetryFeed: Send + Sync {
    /// Fetch the travel segments recorded for a vehicle on a date.
    ///
    /// # Arguments
    /// * `vehicle` - The fleet vehicle to read
    /// * `date` - The calendar date of interest
    ///
    /// # Returns
    /// * `Ok(Vec<VehicleSegment>)` - Segments, possibly with an open tail
    /// * `Err(FeedError)` - If the source cannot be read
    async fn fetch_segments(
        &self,
        vehicle: VehicleId,
        date: NaiveDate,
    ) -> FeedResult<Vec<VehicleSegment>>;

    /// Fetch raw GPS breadcrumbs for a vehicle inside a time window.
    ///
    /// # Arguments
    /// * `vehicle` - The fleet vehicle to read
    /// * `window` - UTC interval to cover
    ///
    /// # Returns
    /// * `Ok(Vec<VehiclePoint>)` - Fixes inside the window, any order
    /// * `Err(FeedError)` - If the source cannot be read
    async fn fetch_breadcrumbs(
        &self,
        vehicle: VehicleId,
        window: TimeWindow,
    ) -> FeedResult<Vec<VehiclePoint>>;
}

/// Feed trait for the payroll timeclock.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait TimeclockFeed: Send + Sync {
    /// Fetch the raw punch rows for an employee on a date.
    ///
    /// Rows come back loosely paired with string timestamps; the punch
    /// reconciler owns all interpretation.
    async fn fetch_punches(
        &self,
        employee: EmployeeId,
        date: NaiveDate,
    ) -> FeedResult<Vec<RawPunchRecord>>;
}

/// The full set of sources the day-sync orchestrator needs.
pub trait FeedSet: SchedulingFeed + TelemetryFeed + TimeclockFeed {}

impl<T: SchedulingFeed + TelemetryFeed + TimeclockFeed> FeedSet for T {}
