//! Shared fixtures for the integration suites.
//!
//! All scenarios run on 2024-03-04 (a Monday) around four fixed places:
//! the office, the technician's home, job 901's site, and a supply-house
//! geofence. Distances quoted in comments are great-circle feet on the
//! default sphere.

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use qtty::{Feet, Miles};

use fieldtrace::api::{
    ArrivalVerification, Coordinate, CustomLocation, CustomLocationId, EmployeeId,
    GeofenceBoundary, JobId, JobVisit, LocationCategory, PunchPairKind, RawPunchRecord,
    TechnicianId, TechnicianProfile, VehicleId, VehiclePoint, VehicleSegment,
};

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, h, m, s).unwrap()
}

/// After every appointment of the fixture day has come due.
pub fn end_of_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 6, 0, 0).unwrap()
}

pub fn coord(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).unwrap()
}

pub fn office() -> Coordinate {
    coord(34.0, -118.0)
}

pub fn home() -> Coordinate {
    coord(34.05, -118.05)
}

pub fn job_site() -> Coordinate {
    coord(34.1, -117.95)
}

/// ~219 ft from the job site, inside the default 300 ft radius.
pub fn near_job_site() -> Coordinate {
    coord(34.1006, -117.95)
}

/// ~730 ft from the job site, outside the default radius.
pub fn outside_job_site() -> Coordinate {
    coord(34.102, -117.95)
}

pub fn supply_house_center() -> Coordinate {
    coord(34.02, -118.02)
}

pub fn technician() -> TechnicianProfile {
    TechnicianProfile {
        id: TechnicianId::new(5),
        name: "Riley Mata".to_string(),
        vehicle_id: Some(VehicleId::new(77)),
        employee_id: Some(EmployeeId::new(505)),
        takes_truck_home: true,
        home_location: Some(home()),
        office_location: office(),
        exclude_from_office_visits: false,
        grace_minutes: None,
    }
}

pub fn office_reporter() -> TechnicianProfile {
    TechnicianProfile {
        takes_truck_home: false,
        home_location: None,
        ..technician()
    }
}

pub fn job(id: i64, scheduled: DateTime<Utc>, location: Coordinate) -> JobVisit {
    JobVisit {
        job_id: JobId::new(id),
        scheduled_start: scheduled,
        scheduled_end: None,
        location,
        is_first_of_day: false,
        is_follow_up: false,
        status: "scheduled".to_string(),
        actual_arrival: None,
        variance_minutes: None,
        verification: ArrivalVerification::NotChecked,
    }
}

pub fn point(time: DateTime<Utc>, position: Coordinate) -> VehiclePoint {
    VehiclePoint { time, position }
}

pub fn segment(
    start: DateTime<Utc>,
    from: Coordinate,
    end: DateTime<Utc>,
    to: Coordinate,
    miles: f64,
) -> VehicleSegment {
    VehicleSegment {
        start_time: start,
        start_location: from,
        end_time: Some(end),
        end_location: Some(to),
        travel_distance: Miles::new(miles),
        max_speed: None,
        idle_minutes: None,
        is_complete: true,
    }
}

pub fn supply_house() -> CustomLocation {
    CustomLocation {
        id: CustomLocationId::new(7),
        name: "Valley Supply".to_string(),
        category: LocationCategory::SupplyHouse,
        boundary: GeofenceBoundary::Circle {
            center: supply_house_center(),
            radius_feet: Feet::new(400.0),
        },
        logo: None,
    }
}

pub fn punch_row(
    clock_in: Option<&str>,
    clock_out: Option<&str>,
    pair_kind: PunchPairKind,
) -> RawPunchRecord {
    RawPunchRecord {
        employee_id: EmployeeId::new(505),
        clock_in_time: clock_in.map(str::to_string),
        clock_out_time: clock_out.map(str::to_string),
        pair_kind,
        source: "timeclock".to_string(),
    }
}
