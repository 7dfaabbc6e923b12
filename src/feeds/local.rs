//! In-memory feed implementation.
//!
//! Backs the test suites and local development runs: data is loaded through
//! the `push_*` methods and served back through the feed traits with
//! deterministic ordering. Telemetry outages can be injected per vehicle to
//! exercise the orchestrator's failure isolation.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use crate::api::{
    CustomLocation, EmployeeId, ExcusedVisit, JobVisit, ManualOverride, RawPunchRecord,
    TechnicianId, TimeWindow, VehicleId, VehiclePoint, VehicleSegment,
};

use super::error::{ErrorContext, FeedError, FeedResult};
use super::{SchedulingFeed, TelemetryFeed, TimeclockFeed};

#[derive(Default)]
struct LocalState {
    jobs: HashMap<(i64, NaiveDate), Vec<JobVisit>>,
    excused_visits: HashMap<(i64, NaiveDate), Vec<ExcusedVisit>>,
    overrides: HashMap<(i64, NaiveDate), Vec<ManualOverride>>,
    custom_locations: Vec<CustomLocation>,
    segments: HashMap<(i64, NaiveDate), Vec<VehicleSegment>>,
    breadcrumbs: HashMap<i64, Vec<VehiclePoint>>,
    punches: HashMap<(i64, NaiveDate), Vec<RawPunchRecord>>,
    telemetry_outages: HashSet<i64>,
}

/// In-memory [`FeedSet`](super::FeedSet) implementation.
#[derive(Default)]
pub struct LocalFeeds {
    state: RwLock<LocalState>,
}

impl LocalFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_jobs(&self, technician: TechnicianId, date: NaiveDate, jobs: Vec<JobVisit>) {
        self.state
            .write()
            .jobs
            .entry((technician.value(), date))
            .or_default()
            .extend(jobs);
    }

    pub fn push_excused_visit(&self, visit: ExcusedVisit) {
        self.state
            .write()
            .excused_visits
            .entry((visit.technician_id.value(), visit.date))
            .or_default()
            .push(visit);
    }

    pub fn push_override(
        &self,
        technician: TechnicianId,
        date: NaiveDate,
        entry: ManualOverride,
    ) {
        self.state
            .write()
            .overrides
            .entry((technician.value(), date))
            .or_default()
            .push(entry);
    }

    pub fn set_custom_locations(&self, locations: Vec<CustomLocation>) {
        self.state.write().custom_locations = locations;
    }

    pub fn push_segments(
        &self,
        vehicle: VehicleId,
        date: NaiveDate,
        segments: Vec<VehicleSegment>,
    ) {
        self.state
            .write()
            .segments
            .entry((vehicle.value(), date))
            .or_default()
            .extend(segments);
    }

    pub fn push_breadcrumbs(&self, vehicle: VehicleId, points: Vec<VehiclePoint>) {
        self.state
            .write()
            .breadcrumbs
            .entry(vehicle.value())
            .or_default()
            .extend(points);
    }

    pub fn push_punches(
        &self,
        employee: EmployeeId,
        date: NaiveDate,
        punches: Vec<RawPunchRecord>,
    ) {
        self.state
            .write()
            .punches
            .entry((employee.value(), date))
            .or_default()
            .extend(punches);
    }

    /// Make every telemetry fetch for this vehicle fail until cleared.
    pub fn fail_telemetry(&self, vehicle: VehicleId) {
        self.state.write().telemetry_outages.insert(vehicle.value());
    }

    pub fn clear_telemetry_outage(&self, vehicle: VehicleId) {
        self.state
            .write()
            .telemetry_outages
            .remove(&vehicle.value());
    }

    fn telemetry_outage(&self, vehicle: VehicleId, operation: &str) -> Option<FeedError> {
        let state = self.state.read();
        if state.telemetry_outages.contains(&vehicle.value()) {
            Some(FeedError::connection_failed_with_context(
                "telemetry provider unreachable",
                ErrorContext::new(operation)
                    .for_feed("telemetry")
                    .with_subject(vehicle),
            ))
        } else {
            None
        }
    }
}

#[async_trait]
impl SchedulingFeed for LocalFeeds {
    async fn fetch_jobs(
        &self,
        technician: TechnicianId,
        date: NaiveDate,
    ) -> FeedResult<Vec<JobVisit>> {
        let state = self.state.read();
        let mut jobs = state
            .jobs
            .get(&(technician.value(), date))
            .cloned()
            .unwrap_or_default();
        jobs.sort_by(|a, b| {
            a.scheduled_start
                .cmp(&b.scheduled_start)
                .then(a.job_id.cmp(&b.job_id))
        });
        Ok(jobs)
    }

    async fn fetch_excused_visits(
        &self,
        technician: TechnicianId,
        date: NaiveDate,
    ) -> FeedResult<Vec<ExcusedVisit>> {
        let state = self.state.read();
        Ok(state
            .excused_visits
            .get(&(technician.value(), date))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_overrides(
        &self,
        technician: TechnicianId,
        date: NaiveDate,
    ) -> FeedResult<Vec<ManualOverride>> {
        let state = self.state.read();
        Ok(state
            .overrides
            .get(&(technician.value(), date))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_custom_locations(&self) -> FeedResult<Vec<CustomLocation>> {
        Ok(self.state.read().custom_locations.clone())
    }
}

#[async_trait]
impl TelemetryFeed for LocalFeeds {
    async fn fetch_segments(
        &self,
        vehicle: VehicleId,
        date: NaiveDate,
    ) -> FeedResult<Vec<VehicleSegment>> {
        if let Some(outage) = self.telemetry_outage(vehicle, "fetch_segments") {
            return Err(outage);
        }
        let state = self.state.read();
        let mut segments = state
            .segments
            .get(&(vehicle.value(), date))
            .cloned()
            .unwrap_or_default();
        segments.sort_by_key(|s| s.start_time);
        Ok(segments)
    }

    async fn fetch_breadcrumbs(
        &self,
        vehicle: VehicleId,
        window: TimeWindow,
    ) -> FeedResult<Vec<VehiclePoint>> {
        if let Some(outage) = self.telemetry_outage(vehicle, "fetch_breadcrumbs") {
            return Err(outage);
        }
        let state = self.state.read();
        let mut points: Vec<VehiclePoint> = state
            .breadcrumbs
            .get(&vehicle.value())
            .map(|all| all.iter().filter(|p| window.contains(p.time)).copied().collect())
            .unwrap_or_default();
        points.sort_by_key(|p| p.time);
        Ok(points)
    }
}

#[async_trait]
impl TimeclockFeed for LocalFeeds {
    async fn fetch_punches(
        &self,
        employee: EmployeeId,
        date: NaiveDate,
    ) -> FeedResult<Vec<RawPunchRecord>> {
        let state = self.state.read();
        Ok(state
            .punches
            .get(&(employee.value(), date))
            .cloned()
            .unwrap_or_default())
    }
}
