//! Snapshot types held by the state store and shared with outbound records.
//!
//! Snapshots are never edited in place. A new one replaces the old wholesale,
//! so a record that captured an `Arc` keeps seeing exactly what was current
//! when it was built.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use trailmark_protocol::{EnvironmentInfo, ScreenResolution, SessionInfo};

use crate::hashing::hash_visitor_id;

/// Session as forwarded to the analytics backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub first_visit: Option<DateTime<Utc>>,
    pub last_visit: Option<DateTime<Utc>>,
    pub visits_count: u32,
    /// Hex-encoded MD5 of the reported visitor id.
    pub unique_visitor_id: Option<String>,
    pub user_id: Option<String>,
}

impl SessionSnapshot {
    pub fn from_session(session: &SessionInfo) -> Self {
        SessionSnapshot {
            first_visit: session.first_visit,
            last_visit: session.last_visit,
            visits_count: session.visits_count,
            unique_visitor_id: session
                .unique_visitor_id
                .as_deref()
                .and_then(hash_visitor_id),
            user_id: session.user_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenSnapshot {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}

impl From<&ScreenResolution> for ScreenSnapshot {
    fn from(screen: &ScreenResolution) -> Self {
        ScreenSnapshot {
            width: screen.width,
            height: screen.height,
            dpi: screen.dpi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSnapshot {
    pub device_name: Option<String>,
    pub device_type: Option<String>,
    pub operating_system: Option<String>,
    pub device_screen: Option<ScreenSnapshot>,
}

impl EnvironmentSnapshot {
    pub fn from_environment(env: &EnvironmentInfo) -> Self {
        EnvironmentSnapshot {
            device_name: env.device_name.clone(),
            device_type: env.device_type.clone(),
            operating_system: env.operating_system.clone(),
            device_screen: env.device_screen.as_ref().map(ScreenSnapshot::from),
        }
    }
}

/// Where the visitor is now and where they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub current: Option<Url>,
    pub referrer: Option<Url>,
}

impl Location {
    /// Moves the visitor to `next`, turning the current location into the referrer.
    pub fn advance(&mut self, next: Url) {
        self.referrer = self.current.replace(next);
    }
}
