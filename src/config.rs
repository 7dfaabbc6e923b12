//! Engine configuration file support.
//!
//! All proximity and punctuality tunables live here so sensitivity can be
//! adjusted per fleet (GPS accuracy varies by tracking hardware) without
//! touching call sites. Values load from TOML or assemble in code;
//! [`EngineConfig::default`] matches the documented defaults.

use anyhow::{bail, Context, Result};
use qtty::Feet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};

use crate::api::{TechnicianProfile, TimeWindow};
use crate::services::geo::Sphere;

/// Engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sphere radius for great-circle distance, in feet
    #[serde(default = "default_earth_radius_feet")]
    pub earth_radius_feet: f64,
    /// Proximity threshold within which a GPS point counts as "at" a target
    #[serde(default = "default_arrival_radius_feet")]
    pub arrival_radius_feet: f64,
    /// Late-arrival grace threshold, whole minutes
    #[serde(default = "default_grace_minutes")]
    pub grace_minutes: i64,
    /// Half-width of the breadcrumb lookup window around a punch time
    #[serde(default = "default_punch_gps_tolerance_minutes")]
    pub punch_gps_tolerance_minutes: i64,
    /// Gap between consecutive events considered suspicious when no travel
    /// segment covers it
    #[serde(default = "default_untracked_gap_minutes")]
    pub untracked_gap_minutes: i64,
    /// Arrival search window opens this many minutes before the scheduled start
    #[serde(default = "default_arrival_window_before_minutes")]
    pub arrival_window_before_minutes: i64,
    /// Arrival search window closes this many minutes after the scheduled start
    #[serde(default = "default_arrival_window_after_minutes")]
    pub arrival_window_after_minutes: i64,
}

fn default_earth_radius_feet() -> f64 {
    // Mean Earth radius in feet
    20_902_231.0
}

fn default_arrival_radius_feet() -> f64 {
    300.0
}

fn default_grace_minutes() -> i64 {
    10
}

fn default_punch_gps_tolerance_minutes() -> i64 {
    10
}

fn default_untracked_gap_minutes() -> i64 {
    60
}

fn default_arrival_window_before_minutes() -> i64 {
    30
}

fn default_arrival_window_after_minutes() -> i64 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            earth_radius_feet: default_earth_radius_feet(),
            arrival_radius_feet: default_arrival_radius_feet(),
            grace_minutes: default_grace_minutes(),
            punch_gps_tolerance_minutes: default_punch_gps_tolerance_minutes(),
            untracked_gap_minutes: default_untracked_gap_minutes(),
            arrival_window_before_minutes: default_arrival_window_before_minutes(),
            arrival_window_after_minutes: default_arrival_window_after_minutes(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).context("Failed to parse engine config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Reject configurations that would make proximity or window math
    /// meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.earth_radius_feet.is_finite() || self.earth_radius_feet <= 0.0 {
            bail!("earth_radius_feet must be positive");
        }
        if !self.arrival_radius_feet.is_finite() || self.arrival_radius_feet <= 0.0 {
            bail!("arrival_radius_feet must be positive");
        }
        if self.grace_minutes < 0 {
            bail!("grace_minutes must not be negative");
        }
        if self.punch_gps_tolerance_minutes < 0 {
            bail!("punch_gps_tolerance_minutes must not be negative");
        }
        if self.untracked_gap_minutes <= 0 {
            bail!("untracked_gap_minutes must be positive");
        }
        if self.arrival_window_before_minutes < 0 {
            bail!("arrival_window_before_minutes must not be negative");
        }
        if self.arrival_window_after_minutes <= 0 {
            bail!("arrival_window_after_minutes must be positive");
        }
        Ok(())
    }

    /// Distance sphere built from the configured radius.
    pub fn sphere(&self) -> Sphere {
        Sphere::new(Feet::new(self.earth_radius_feet))
    }

    /// Default proximity threshold for arrival and place matching.
    pub fn arrival_radius(&self) -> Feet {
        Feet::new(self.arrival_radius_feet)
    }

    /// Grace threshold for a technician, honoring the per-technician
    /// override.
    pub fn grace_for(&self, technician: &TechnicianProfile) -> i64 {
        technician.grace_minutes.unwrap_or(self.grace_minutes)
    }

    /// Half-width of the punch breadcrumb lookup window.
    pub fn punch_tolerance(&self) -> Duration {
        Duration::minutes(self.punch_gps_tolerance_minutes)
    }

    /// Arrival search window around a scheduled start.
    pub fn arrival_window(&self, scheduled_start: DateTime<Utc>) -> TimeWindow {
        TimeWindow {
            start: scheduled_start - Duration::minutes(self.arrival_window_before_minutes),
            end: scheduled_start + Duration::minutes(self.arrival_window_after_minutes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.earth_radius_feet, 20_902_231.0);
        assert_eq!(config.arrival_radius_feet, 300.0);
        assert_eq!(config.grace_minutes, 10);
        assert_eq!(config.punch_gps_tolerance_minutes, 10);
        assert_eq!(config.untracked_gap_minutes, 60);
        assert_eq!(config.arrival_window_before_minutes, 30);
        assert_eq!(config.arrival_window_after_minutes, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            arrival_radius_feet = 450.0
            grace_minutes = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.arrival_radius_feet, 450.0);
        assert_eq!(config.grace_minutes, 0);
        assert_eq!(config.earth_radius_feet, 20_902_231.0);
        assert_eq!(config.untracked_gap_minutes, 60);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(EngineConfig::from_toml_str("arrival_radius_feet = 0.0").is_err());
        assert!(EngineConfig::from_toml_str("earth_radius_feet = -1.0").is_err());
        assert!(EngineConfig::from_toml_str("grace_minutes = -5").is_err());
        assert!(EngineConfig::from_toml_str("untracked_gap_minutes = 0").is_err());
        assert!(EngineConfig::from_toml_str("arrival_window_after_minutes = 0").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "grace_minutes = 15").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.grace_minutes, 15);
        assert_eq!(config.arrival_radius_feet, 300.0);
    }

    #[test]
    fn test_from_file_missing() {
        assert!(EngineConfig::from_file("/nonexistent/engine.toml").is_err());
    }

    #[test]
    fn test_grace_override() {
        let config = EngineConfig::default();
        let mut technician = crate::api::TechnicianProfile {
            id: crate::api::TechnicianId::new(1),
            name: "Tech".to_string(),
            vehicle_id: None,
            employee_id: None,
            takes_truck_home: true,
            home_location: None,
            office_location: crate::api::Coordinate::new(34.0, -118.0).unwrap(),
            exclude_from_office_visits: false,
            grace_minutes: None,
        };
        assert_eq!(config.grace_for(&technician), 10);
        technician.grace_minutes = Some(0);
        assert_eq!(config.grace_for(&technician), 0);
    }

    #[test]
    fn test_arrival_window() {
        let config = EngineConfig::default();
        let scheduled = Utc.with_ymd_and_hms(2024, 3, 4, 13, 0, 0).unwrap();
        let window = config.arrival_window(scheduled);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 4, 12, 30, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap());
    }
}
