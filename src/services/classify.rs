//! Semantic location classification.
//!
//! Maps a GPS coordinate onto the place it most plausibly represents for a
//! technician's day. Matching is priority-ordered, not nearest-wins: home,
//! then office, then custom geofences in their configured order, then the
//! day's job sites. Home and office are semantically more likely to be the
//! correct interpretation even when a custom geofence is technically closer
//! (a gas station two blocks from the office must not shadow the office),
//! so the priority order is load-bearing policy.
//!
//! Absence of data and unmatched data are distinct outcomes:
//! [`LocationClass::NoGps`] means no coordinate was available at all, and it
//! suppresses downstream violation checks entirely; [`LocationClass::Unknown`]
//! means a fix existed but matched nothing, and still allows
//! not-at-expected-location judgments.

use qtty::Feet;
use serde::{Deserialize, Serialize};

use crate::api::{Coordinate, CustomLocationId, JobId, JobVisit, TechnicianProfile};
use crate::services::geo::Sphere;

/// Category label for a custom geofence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationCategory {
    GasStation,
    SupplyHouse,
    Vendor,
    Parking,
    #[default]
    Other,
}

/// Geofence boundary: a circle with its own radius, or a polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum GeofenceBoundary {
    Circle {
        center: Coordinate,
        radius_feet: Feet,
    },
    Polygon {
        vertices: Vec<Coordinate>,
    },
}

/// A user-labeled place enriching the classifier. Optional and
/// non-authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomLocation {
    pub id: CustomLocationId,
    pub name: String,
    #[serde(default)]
    pub category: LocationCategory,
    pub boundary: GeofenceBoundary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl CustomLocation {
    /// Whether a point falls inside this geofence.
    pub fn contains(&self, point: Coordinate, sphere: Sphere) -> bool {
        match &self.boundary {
            GeofenceBoundary::Circle {
                center,
                radius_feet,
            } => sphere.within_radius(point, *center, *radius_feet),
            GeofenceBoundary::Polygon { vertices } => point_in_polygon(point, vertices),
        }
    }
}

/// Semantic class of a location fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationClass {
    Home,
    Office,
    Job { job_id: JobId },
    Custom { location_id: CustomLocationId },
    /// A fix existed but matched no known place.
    Unknown,
    /// No fix was available at all. Distinct from `Unknown`: suppresses
    /// violation checks rather than permitting them.
    NoGps,
}

impl LocationClass {
    pub fn is_no_gps(&self) -> bool {
        matches!(self, LocationClass::NoGps)
    }

    pub fn is_job(&self) -> bool {
        matches!(self, LocationClass::Job { .. })
    }
}

impl std::fmt::Display for LocationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LocationClass::Home => "home",
            LocationClass::Office => "office",
            LocationClass::Job { .. } => "job",
            LocationClass::Custom { .. } => "custom",
            LocationClass::Unknown => "unknown",
            LocationClass::NoGps => "no_gps",
        };
        write!(f, "{label}")
    }
}

/// Candidate places for one technician's day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationContext {
    pub office: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<Coordinate>,
    #[serde(default)]
    pub custom_locations: Vec<CustomLocation>,
    /// The day's job sites, ordered by scheduled start for deterministic
    /// first-match behavior.
    #[serde(default)]
    pub job_sites: Vec<(JobId, Coordinate)>,
}

impl LocationContext {
    /// Assemble the day's context from the technician profile, the custom
    /// geofence list, and the scheduled jobs.
    pub fn for_day(
        technician: &TechnicianProfile,
        custom_locations: &[CustomLocation],
        jobs: &[JobVisit],
    ) -> Self {
        let mut ordered: Vec<&JobVisit> = jobs.iter().collect();
        ordered.sort_by(|a, b| {
            a.scheduled_start
                .cmp(&b.scheduled_start)
                .then(a.job_id.cmp(&b.job_id))
        });
        Self {
            office: technician.office_location,
            home: technician.home_location,
            custom_locations: custom_locations.to_vec(),
            job_sites: ordered.iter().map(|j| (j.job_id, j.location)).collect(),
        }
    }
}

/// Classify a point against the day's candidate places.
///
/// `default_radius` applies to home, office, and job-site matching; circular
/// custom geofences carry their own radius and polygons use containment.
pub fn classify(
    point: Option<Coordinate>,
    context: &LocationContext,
    sphere: Sphere,
    default_radius: Feet,
) -> LocationClass {
    let Some(point) = point else {
        return LocationClass::NoGps;
    };

    if let Some(home) = context.home {
        if sphere.within_radius(point, home, default_radius) {
            return LocationClass::Home;
        }
    }

    if sphere.within_radius(point, context.office, default_radius) {
        return LocationClass::Office;
    }

    for location in &context.custom_locations {
        if location.contains(point, sphere) {
            return LocationClass::Custom {
                location_id: location.id,
            };
        }
    }

    for (job_id, site) in &context.job_sites {
        if sphere.within_radius(point, *site, default_radius) {
            return LocationClass::Job { job_id: *job_id };
        }
    }

    LocationClass::Unknown
}

/// Even-odd ray-casting containment test on the lat/lon plane.
///
/// Adequate for geofence-sized polygons; not meant for polygons spanning
/// the antimeridian.
fn point_in_polygon(point: Coordinate, vertices: &[Coordinate]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].longitude, vertices[i].latitude);
        let (xj, yj) = (vertices[j].longitude, vertices[j].latitude);
        let straddles = (yi > point.latitude) != (yj > point.latitude);
        if straddles
            && point.longitude < (xj - xi) * (point.latitude - yi) / (yj - yi) + xi
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
