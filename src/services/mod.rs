//! Computation core and orchestration services.
//!
//! Everything except [`sync`] is pure, synchronous computation over
//! already-fetched in-memory inputs: each function's output depends only on
//! its arguments (including an explicitly injected "now"), so day timelines
//! can always be rebuilt from raw inputs with identical results.

pub mod arrival;

pub mod classify;

pub mod fingerprint;

pub mod geo;

pub mod punches;

pub mod reports;

pub mod sync;

pub mod timeline;

pub use arrival::{closest_approach, find_arrival};
pub use classify::classify;
pub use fingerprint::day_input_fingerprint;
pub use punches::reconcile;
pub use reports::{breakdown_by_weekday, rollup_by_technician, summarize_period, weekly_trend};
pub use sync::{sync_day, SyncTracker};
pub use timeline::build;
