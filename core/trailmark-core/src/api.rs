//! Outbound analytics capability.
//!
//! The sink never talks to a backend directly. It builds [`ViewRecord`]s and
//! [`EventRecord`]s and hands them to an [`AnalyticsApi`] implementation,
//! which owns transport, batching and persistence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::state::{EnvironmentSnapshot, SessionSnapshot};

/// A page view, as forwarded to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRecord {
    pub url: String,
    pub view_name: Option<String>,
    /// Absent on the very first navigation.
    pub referrer_url: Option<String>,
    pub view_time: Option<Duration>,
    /// The store's snapshot at the time of the report, shared rather than copied.
    pub session: Option<Arc<SessionSnapshot>>,
    pub environment: Option<Arc<EnvironmentSnapshot>>,
}

/// A user action, as forwarded to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub url: String,
    pub category: String,
    pub action: String,
    pub name: Option<String>,
    pub referrer_url: Option<String>,
    pub session: Option<Arc<SessionSnapshot>>,
    pub environment: Option<Arc<EnvironmentSnapshot>>,
}

/// Analytics backend.
///
/// Both calls return `true` when the backend accepted the report.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    async fn report_view(&self, view: ViewRecord) -> bool;

    async fn report_event(&self, event: EventRecord) -> bool;
}
