//! Period aggregation over built timelines.
//!
//! Pure reductions over `&[DayTimeline]` for the reporting surface. The
//! on-time percentage is computed from verified jobs only; unverified and
//! pending jobs never enter a numerator or denominator here, they are
//! reported as their own counts.

use chrono::{Datelike, Weekday};
use qtty::{Miles, Minutes};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::api::TechnicianId;
use crate::services::timeline::DayTimeline;

/// Totals across a set of technician-days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub days: usize,
    pub technicians: usize,
    pub total_jobs: usize,
    pub jobs_verified_on_time: usize,
    pub jobs_verified_late: usize,
    pub jobs_unverified: usize,
    pub jobs_pending: usize,
    /// Share of verified jobs that were on time; `None` when nothing was
    /// verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_time_percentage: Option<f64>,
    pub violations: usize,
    pub excusable_violations: usize,
    pub total_office_visits: usize,
    pub unnecessary_office_visits: usize,
    pub total_drive_minutes: Minutes,
    pub total_travel_miles: Miles,
    pub untracked_gaps: usize,
}

/// Per-technician aggregate for a period, one row per technician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicianPeriodRow {
    pub technician_id: TechnicianId,
    pub days: usize,
    pub total_jobs: usize,
    pub jobs_verified_on_time: usize,
    pub jobs_verified_late: usize,
    pub jobs_unverified: usize,
    pub jobs_pending: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_time_percentage: Option<f64>,
    pub violations: usize,
    pub excusable_violations: usize,
    pub unnecessary_office_visits: usize,
    pub total_drive_minutes: Minutes,
    pub total_travel_miles: Miles,
}

/// Aggregate for one weekday across a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayRow {
    /// Weekday name, Monday through Sunday
    pub weekday: String,
    pub days: usize,
    pub total_jobs: usize,
    pub jobs_verified_on_time: usize,
    pub jobs_verified_late: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_time_percentage: Option<f64>,
    pub violations: usize,
}

/// Aggregate for one ISO week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub iso_year: i32,
    pub iso_week: u32,
    pub days: usize,
    pub jobs_verified_on_time: usize,
    pub jobs_verified_late: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_time_percentage: Option<f64>,
    pub violations: usize,
}

fn on_time_percentage(on_time: usize, late: usize) -> Option<f64> {
    let verified = on_time + late;
    if verified == 0 {
        None
    } else {
        Some(on_time as f64 / verified as f64 * 100.0)
    }
}

fn untracked_gaps(timeline: &DayTimeline) -> usize {
    timeline
        .events
        .iter()
        .filter(|e| e.has_untracked_time)
        .count()
}

/// Totals across all given technician-days.
pub fn summarize_period(timelines: &[DayTimeline]) -> PeriodSummary {
    let technicians: BTreeSet<TechnicianId> =
        timelines.iter().map(|t| t.technician_id).collect();

    let mut summary = PeriodSummary {
        days: timelines.len(),
        technicians: technicians.len(),
        total_jobs: 0,
        jobs_verified_on_time: 0,
        jobs_verified_late: 0,
        jobs_unverified: 0,
        jobs_pending: 0,
        on_time_percentage: None,
        violations: 0,
        excusable_violations: 0,
        total_office_visits: 0,
        unnecessary_office_visits: 0,
        total_drive_minutes: Minutes::new(0.0),
        total_travel_miles: Miles::new(0.0),
        untracked_gaps: 0,
    };

    for timeline in timelines {
        let day = &timeline.summary;
        summary.total_jobs += day.total_jobs;
        summary.jobs_verified_on_time += day.jobs_verified_on_time;
        summary.jobs_verified_late += day.jobs_verified_late;
        summary.jobs_unverified += day.jobs_unverified;
        summary.jobs_pending += day.jobs_pending;
        summary.violations += day.violations;
        summary.excusable_violations += day.excusable_violations;
        summary.total_office_visits += day.total_office_visits;
        summary.unnecessary_office_visits += day.unnecessary_office_visits;
        summary.total_drive_minutes = summary.total_drive_minutes + day.total_drive_minutes;
        summary.total_travel_miles = summary.total_travel_miles + day.total_travel_miles;
        summary.untracked_gaps += untracked_gaps(timeline);
    }

    summary.on_time_percentage =
        on_time_percentage(summary.jobs_verified_on_time, summary.jobs_verified_late);
    summary
}

/// One aggregate row per technician, ordered by technician id.
pub fn rollup_by_technician(timelines: &[DayTimeline]) -> Vec<TechnicianPeriodRow> {
    let mut rows: BTreeMap<TechnicianId, TechnicianPeriodRow> = BTreeMap::new();

    for timeline in timelines {
        let day = &timeline.summary;
        let row = rows
            .entry(timeline.technician_id)
            .or_insert_with(|| TechnicianPeriodRow {
                technician_id: timeline.technician_id,
                days: 0,
                total_jobs: 0,
                jobs_verified_on_time: 0,
                jobs_verified_late: 0,
                jobs_unverified: 0,
                jobs_pending: 0,
                on_time_percentage: None,
                violations: 0,
                excusable_violations: 0,
                unnecessary_office_visits: 0,
                total_drive_minutes: Minutes::new(0.0),
                total_travel_miles: Miles::new(0.0),
            });
        row.days += 1;
        row.total_jobs += day.total_jobs;
        row.jobs_verified_on_time += day.jobs_verified_on_time;
        row.jobs_verified_late += day.jobs_verified_late;
        row.jobs_unverified += day.jobs_unverified;
        row.jobs_pending += day.jobs_pending;
        row.violations += day.violations;
        row.excusable_violations += day.excusable_violations;
        row.unnecessary_office_visits += day.unnecessary_office_visits;
        row.total_drive_minutes = row.total_drive_minutes + day.total_drive_minutes;
        row.total_travel_miles = row.total_travel_miles + day.total_travel_miles;
    }

    rows.into_values()
        .map(|mut row| {
            row.on_time_percentage =
                on_time_percentage(row.jobs_verified_on_time, row.jobs_verified_late);
            row
        })
        .collect()
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Seven rows, Monday through Sunday, with per-weekday punctuality.
/// Weekdays with no data report zero days and no percentage.
pub fn breakdown_by_weekday(timelines: &[DayTimeline]) -> Vec<WeekdayRow> {
    let order = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    let mut rows: Vec<WeekdayRow> = order
        .iter()
        .map(|w| WeekdayRow {
            weekday: weekday_name(*w).to_string(),
            days: 0,
            total_jobs: 0,
            jobs_verified_on_time: 0,
            jobs_verified_late: 0,
            on_time_percentage: None,
            violations: 0,
        })
        .collect();

    for timeline in timelines {
        let index = timeline.date.weekday().num_days_from_monday() as usize;
        let day = &timeline.summary;
        rows[index].days += 1;
        rows[index].total_jobs += day.total_jobs;
        rows[index].jobs_verified_on_time += day.jobs_verified_on_time;
        rows[index].jobs_verified_late += day.jobs_verified_late;
        rows[index].violations += day.violations;
    }

    for row in &mut rows {
        row.on_time_percentage =
            on_time_percentage(row.jobs_verified_on_time, row.jobs_verified_late);
    }
    rows
}

/// ISO-week buckets in chronological order.
pub fn weekly_trend(timelines: &[DayTimeline]) -> Vec<TrendPoint> {
    let mut weeks: BTreeMap<(i32, u32), TrendPoint> = BTreeMap::new();

    for timeline in timelines {
        let iso = timeline.date.iso_week();
        let day = &timeline.summary;
        let point = weeks
            .entry((iso.year(), iso.week()))
            .or_insert_with(|| TrendPoint {
                iso_year: iso.year(),
                iso_week: iso.week(),
                days: 0,
                jobs_verified_on_time: 0,
                jobs_verified_late: 0,
                on_time_percentage: None,
                violations: 0,
            });
        point.days += 1;
        point.jobs_verified_on_time += day.jobs_verified_on_time;
        point.jobs_verified_late += day.jobs_verified_late;
        point.violations += day.violations;
    }

    weeks
        .into_values()
        .map(|mut point| {
            point.on_time_percentage =
                on_time_percentage(point.jobs_verified_on_time, point.jobs_verified_late);
            point
        })
        .collect()
}
