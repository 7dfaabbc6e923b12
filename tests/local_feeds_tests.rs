//! In-memory feed backend behavior: deterministic ordering, window
//! filtering, and simulated telemetry outages.

use chrono::{Duration, NaiveDate};

use fieldtrace::api::{
    EmployeeId, ExcusedVisit, JobId, ManualOverride, PunchPairKind, TechnicianId, TimeWindow,
    VehicleId,
};
use fieldtrace::feeds::local::LocalFeeds;
use fieldtrace::feeds::{FeedError, SchedulingFeed, TelemetryFeed, TimeclockFeed};

mod support;
use support::*;

#[tokio::test]
async fn test_jobs_come_back_in_scheduled_order() {
    let feeds = LocalFeeds::new();
    feeds.push_jobs(
        TechnicianId::new(5),
        day(),
        vec![
            job(902, at(14, 0, 0), job_site()),
            job(901, at(13, 0, 0), job_site()),
        ],
    );

    let jobs = feeds.fetch_jobs(TechnicianId::new(5), day()).await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].job_id, JobId::new(901));
    assert_eq!(jobs[1].job_id, JobId::new(902));
}

#[tokio::test]
async fn test_unseeded_keys_return_empty() {
    let feeds = LocalFeeds::new();
    feeds.push_jobs(
        TechnicianId::new(5),
        day(),
        vec![job(901, at(13, 0, 0), job_site())],
    );

    let other_technician = feeds.fetch_jobs(TechnicianId::new(6), day()).await.unwrap();
    assert!(other_technician.is_empty());

    let other_date = feeds
        .fetch_jobs(
            TechnicianId::new(5),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        )
        .await
        .unwrap();
    assert!(other_date.is_empty());

    assert!(feeds
        .fetch_segments(VehicleId::new(77), day())
        .await
        .unwrap()
        .is_empty());
    assert!(feeds
        .fetch_punches(EmployeeId::new(505), day())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_excused_visits_and_overrides_roundtrip() {
    let feeds = LocalFeeds::new();
    feeds.push_excused_visit(ExcusedVisit {
        technician_id: TechnicianId::new(5),
        date: day(),
        reason: Some("warehouse restock".to_string()),
    });
    feeds.push_override(
        TechnicianId::new(5),
        day(),
        ManualOverride::AssignJobToStop {
            job_id: JobId::new(901),
            stop_time: at(13, 5, 0),
        },
    );

    let visits = feeds
        .fetch_excused_visits(TechnicianId::new(5), day())
        .await
        .unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].reason.as_deref(), Some("warehouse restock"));

    let overrides = feeds
        .fetch_overrides(TechnicianId::new(5), day())
        .await
        .unwrap();
    assert_eq!(overrides.len(), 1);
    assert!(matches!(
        overrides[0],
        ManualOverride::AssignJobToStop { .. }
    ));

    assert!(feeds
        .fetch_excused_visits(TechnicianId::new(6), day())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_segments_sorted_by_start_time() {
    let feeds = LocalFeeds::new();
    feeds.push_segments(
        VehicleId::new(77),
        day(),
        vec![
            segment(at(15, 0, 0), job_site(), at(15, 30, 0), office(), 9.0),
            segment(at(8, 0, 0), home(), at(8, 30, 0), job_site(), 6.0),
        ],
    );

    let segments = feeds
        .fetch_segments(VehicleId::new(77), day())
        .await
        .unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].start_time, at(8, 0, 0));
    assert_eq!(segments[1].start_time, at(15, 0, 0));
}

#[tokio::test]
async fn test_breadcrumbs_filtered_to_window_and_sorted() {
    let feeds = LocalFeeds::new();
    feeds.push_breadcrumbs(
        VehicleId::new(77),
        vec![
            point(at(14, 0, 0), job_site()),
            point(at(9, 0, 0), office()),
            // The day before; outside any window below.
            point(at(9, 0, 0) - Duration::days(1), home()),
        ],
    );

    let window = TimeWindow::new(at(8, 0, 0), at(14, 0, 0)).unwrap();
    let points = feeds
        .fetch_breadcrumbs(VehicleId::new(77), window)
        .await
        .unwrap();
    // The window end is exclusive, so the 14:00 fix is out.
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].time, at(9, 0, 0));

    let wide = TimeWindow::new(at(0, 0, 0), at(23, 59, 59)).unwrap();
    let points = feeds
        .fetch_breadcrumbs(VehicleId::new(77), wide)
        .await
        .unwrap();
    assert_eq!(points.len(), 2);
    assert!(points[0].time < points[1].time);
}

#[tokio::test]
async fn test_punches_roundtrip() {
    let feeds = LocalFeeds::new();
    feeds.push_punches(
        EmployeeId::new(505),
        day(),
        vec![punch_row(
            Some("2024-03-04 08:00:00"),
            Some("2024-03-04 16:00:00"),
            PunchPairKind::Work,
        )],
    );

    let punches = feeds
        .fetch_punches(EmployeeId::new(505), day())
        .await
        .unwrap();
    assert_eq!(punches.len(), 1);
    assert_eq!(punches[0].employee_id, EmployeeId::new(505));
    assert_eq!(punches[0].clock_in_time.as_deref(), Some("2024-03-04 08:00:00"));
}

#[tokio::test]
async fn test_custom_locations_shared_catalog() {
    let feeds = LocalFeeds::new();
    assert!(feeds.fetch_custom_locations().await.unwrap().is_empty());

    feeds.set_custom_locations(vec![supply_house()]);
    let catalog = feeds.fetch_custom_locations().await.unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].name, "Valley Supply");
}

#[tokio::test]
async fn test_telemetry_outage_and_recovery() {
    let feeds = LocalFeeds::new();
    feeds.push_segments(
        VehicleId::new(77),
        day(),
        vec![segment(at(8, 0, 0), home(), at(8, 30, 0), job_site(), 6.0)],
    );
    feeds.fail_telemetry(VehicleId::new(77));

    let err = feeds
        .fetch_segments(VehicleId::new(77), day())
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::ConnectionFailed { .. }));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("telemetry"));

    let window = TimeWindow::new(at(0, 0, 0), at(23, 0, 0)).unwrap();
    assert!(feeds
        .fetch_breadcrumbs(VehicleId::new(77), window)
        .await
        .is_err());

    // Another vehicle is unaffected.
    assert!(feeds
        .fetch_segments(VehicleId::new(78), day())
        .await
        .is_ok());

    feeds.clear_telemetry_outage(VehicleId::new(77));
    let segments = feeds
        .fetch_segments(VehicleId::new(77), day())
        .await
        .unwrap();
    assert_eq!(segments.len(), 1);
}
