//! First-proximity arrival detection over GPS breadcrumbs.
//!
//! Arrival is defined as the first moment of proximity inside the search
//! window, not the moment of closest approach. [`closest_approach`] exists
//! only as a diagnostic fallback when no arrival is found, so a reviewer can
//! see how close the vehicle got and when.

use chrono::{DateTime, Utc};
use qtty::Feet;
use serde::{Deserialize, Serialize};

use crate::api::{Coordinate, TimeWindow, VehiclePoint};
use crate::services::geo::Sphere;

/// A confirmed arrival: the first in-window point inside the radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrivalMatch {
    pub time: DateTime<Utc>,
    pub position: Coordinate,
    pub distance_feet: Feet,
}

/// Diagnostic minimum-distance record across all of a day's points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestApproach {
    pub time: DateTime<Utc>,
    pub position: Coordinate,
    pub distance_feet: Feet,
}

/// Find the first point within `radius` of `target` inside `window`.
///
/// Points are sorted ascending by timestamp first (idempotent when already
/// sorted). Points strictly before `window.start` are skipped; the scan
/// stops at `window.end`. `None` is a legitimate negative result, not an
/// error: callers fall back to alternate data or mark the job unverified,
/// never assume on-time or late.
pub fn find_arrival(
    points: &[VehiclePoint],
    target: Coordinate,
    window: TimeWindow,
    radius: Feet,
    sphere: Sphere,
) -> Option<ArrivalMatch> {
    let mut ordered: Vec<&VehiclePoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.time);

    for point in ordered {
        if point.time < window.start {
            continue;
        }
        if point.time >= window.end {
            break;
        }
        let distance = sphere.distance_feet(point.position, target);
        if distance <= radius {
            return Some(ArrivalMatch {
                time: point.time,
                position: point.position,
                distance_feet: distance,
            });
        }
    }
    None
}

/// Scan all points tracking the minimum distance to `target`.
///
/// Ties keep the earliest point so the result is deterministic.
pub fn closest_approach(
    points: &[VehiclePoint],
    target: Coordinate,
    sphere: Sphere,
) -> Option<ClosestApproach> {
    let mut ordered: Vec<&VehiclePoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.time);

    let mut best: Option<ClosestApproach> = None;
    for point in ordered {
        let distance = sphere.distance_feet(point.position, target);
        let closer = match &best {
            Some(current) => distance < current.distance_feet,
            None => true,
        };
        if closer {
            best = Some(ClosestApproach {
                time: point.time,
                position: point.position,
                distance_feet: distance,
            });
        }
    }
    best
}
