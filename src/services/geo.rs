//! Great-circle distance primitives.
//!
//! Every proximity judgment in the engine reduces to [`Sphere::distance_feet`].
//! The sphere radius is carried as a value rather than read from a constant
//! at call sites so fleets with different GPS hardware can tune sensitivity
//! through [`crate::config::EngineConfig`].

use qtty::Feet;
use serde::{Deserialize, Serialize};

use crate::api::Coordinate;

/// Mean Earth radius in feet.
pub const MEAN_EARTH_RADIUS_FEET: f64 = 20_902_231.0;

/// Sphere on which great-circle distances are computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    radius_feet: f64,
}

impl Sphere {
    pub fn new(radius: Feet) -> Self {
        Self {
            radius_feet: radius.value(),
        }
    }

    pub fn radius(&self) -> Feet {
        Feet::new(self.radius_feet)
    }

    /// Haversine distance between two coordinates.
    ///
    /// Pure; inputs are assumed finite ([`Coordinate::new`] guarantees it).
    pub fn distance_feet(&self, a: Coordinate, b: Coordinate) -> Feet {
        let lat1 = a.latitude.to_radians();
        let lat2 = b.latitude.to_radians();
        let dlat = (b.latitude - a.latitude).to_radians();
        let dlon = (b.longitude - a.longitude).to_radians();

        let h = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        // Clamp before asin: rounding can push h a hair past 1 for
        // near-antipodal pairs.
        let c = 2.0 * h.sqrt().min(1.0).asin();

        Feet::new(self.radius_feet * c)
    }

    /// Whether two coordinates lie within `radius` of each other.
    pub fn within_radius(&self, a: Coordinate, b: Coordinate, radius: Feet) -> bool {
        self.distance_feet(a, b) <= radius
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            radius_feet: MEAN_EARTH_RADIUS_FEET,
        }
    }
}
