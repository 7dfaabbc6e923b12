//! # Fieldtrace
//!
//! Field-technician timeline reconstruction and arrival-verification engine.
//!
//! This crate correlates three independent, unreliable data feeds (dispatch
//! records, vehicle GPS telemetry, and time-clock punches) into a single
//! per-technician, per-day timeline with derived punctuality judgments:
//! late or on-time arrivals, punch violations, and unnecessary office
//! visits.
//!
//! ## Features
//!
//! - **Geo primitives**: great-circle distance and radius checks on a
//!   configurable sphere
//! - **Location classification**: home/office/custom-geofence/job-site
//!   matching with a fixed priority order
//! - **Arrival detection**: first-proximity search over GPS breadcrumbs with
//!   a closest-approach diagnostic fallback
//! - **Punch reconciliation**: pairing, synthesis of missing counterparts,
//!   and location-based violation policy
//! - **Timeline building**: deterministic merge of all sources into one
//!   ordered event list per technician per day, plus summary metrics
//! - **Period reporting**: on-time percentages, per-technician rollups,
//!   weekday breakdowns, and weekly trends
//! - **Feed abstraction**: async traits for the upstream sources with an
//!   in-memory implementation for tests and development
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: identifiers and shared value types consumed and produced by
//!   the engine
//! - [`config`]: engine tunables, loadable from TOML
//! - [`models`]: normalization helpers (timestamp parsing, day windows)
//! - [`services`]: the pure computation core and the sync orchestrator
//! - [`feeds`]: upstream-source traits, credentials, and the local backend
//!
//! The computation core is pure and synchronous: every judgment is a
//! function of already-fetched in-memory inputs plus an explicitly injected
//! `now`, so a day can always be rebuilt from scratch with identical
//! results.

pub mod api;

pub mod config;
pub mod models;

pub mod feeds;

pub mod services;
