//! Trailmark core: keeps session, environment and location state consistent
//! while activity events arrive concurrently, and forwards translated reports
//! to an analytics backend.
//!
//! ```text
//! TelemetrySource ──► Synchronizer ──► AsyncLock (reader | writer)
//!                          │                 │
//!                          │                 ▼
//!                          │            StateStore
//!                          ▼
//!                     AnalyticsApi
//! ```
//!
//! - [`state::AsyncLock`]: reader/writer lock with writer preference
//! - [`state::StateStore`]: session/environment/location snapshots
//! - [`Synchronizer`]: per-event access policy and record building

pub mod api;
pub mod config;
pub mod defaults;
pub mod error;
pub mod hashing;
mod sink;
pub mod source;
pub mod state;

pub use api::{AnalyticsApi, EventRecord, ViewRecord};
pub use config::{SinkConfig, SinkOptions};
pub use error::{ConfigError, ReportKind, SinkError};
pub use sink::Synchronizer;
pub use source::{ActivityHub, ActivityListener, TelemetrySource};
