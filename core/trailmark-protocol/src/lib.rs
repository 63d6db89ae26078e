//! Activity event payloads consumed by the Trailmark sink.
//!
//! These are the inbound shapes: what an application reports about a visitor's
//! session, device, navigation and actions. The core crate translates them into
//! analytics records; this crate only owns the types and their JSON encoding.
//!
//! # Wire format
//!
//! One JSON object per line, tagged by `event`:
//!
//! ```json
//! {"event":"begin_session","visits_count":3,"unique_visitor_id":"visitor-1"}
//! {"event":"report_view","absolute_path":"/inbox","title":"Inbox","time_ms":1500}
//! {"event":"report_action","name":"archive","category":"mail"}
//! {"event":"end_session"}
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session details reported when a visit starts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub first_visit: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_visit: Option<DateTime<Utc>>,
    #[serde(default)]
    pub visits_count: u32,
    /// Raw visitor identifier. Never forwarded as-is; the sink hashes it.
    #[serde(default)]
    pub unique_visitor_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenResolution {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub dpi: u32,
}

/// Device the application is running on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub operating_system: Option<String>,
    #[serde(default)]
    pub device_screen: Option<ScreenResolution>,
}

/// A navigation to a view inside the application.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewInfo {
    /// Path of the view relative to the application root, e.g. `/settings/profile`.
    #[serde(default)]
    pub absolute_path: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Time spent on the view.
    #[serde(default, rename = "time_ms", with = "duration_millis")]
    pub time: Option<Duration>,
}

/// Something the user did on the current view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub verb: Option<String>,
}

/// Envelope for the five activity events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ActivityEvent {
    BeginSession(SessionInfo),
    EndSession(SessionInfo),
    SetEnvironmentInfo(EnvironmentInfo),
    ReportView(ViewInfo),
    ReportAction(ActionInfo),
}

impl ActivityEvent {
    /// Parses one line of the JSON-lines transport. Blank lines yield `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivityEvent::BeginSession(_) => "begin_session",
            ActivityEvent::EndSession(_) => "end_session",
            ActivityEvent::SetEnvironmentInfo(_) => "set_environment_info",
            ActivityEvent::ReportView(_) => "report_view",
            ActivityEvent::ReportAction(_) => "report_action",
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_is_skipped() {
        assert_eq!(ActivityEvent::parse_line("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_begin_session_with_missing_fields() {
        let event = ActivityEvent::parse_line(r#"{"event":"begin_session","visits_count":3}"#)
            .unwrap()
            .unwrap();
        match event {
            ActivityEvent::BeginSession(session) => {
                assert_eq!(session.visits_count, 3);
                assert!(session.unique_visitor_id.is_none());
                assert!(session.first_visit.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_view_time_in_millis() {
        let event = ActivityEvent::parse_line(
            r#"{"event":"report_view","absolute_path":"/inbox","time_ms":1500}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            event,
            ActivityEvent::ReportView(ViewInfo {
                absolute_path: Some("/inbox".to_string()),
                title: None,
                time: Some(Duration::from_millis(1500)),
            })
        );
    }

    #[test]
    fn test_parse_nested_screen_resolution() {
        let event = ActivityEvent::parse_line(
            r#"{"event":"set_environment_info","device_name":"pixel","device_screen":{"width":1080,"height":2400,"dpi":420}}"#,
        )
        .unwrap()
        .unwrap();
        let ActivityEvent::SetEnvironmentInfo(env) = event else {
            panic!("expected environment event");
        };
        assert_eq!(env.device_name.as_deref(), Some("pixel"));
        assert_eq!(
            env.device_screen,
            Some(ScreenResolution {
                width: 1080,
                height: 2400,
                dpi: 420
            })
        );
    }

    #[test]
    fn test_unknown_event_tag_is_an_error() {
        assert!(ActivityEvent::parse_line(r#"{"event":"teleport"}"#).is_err());
    }

    #[test]
    fn test_event_name_matches_tag() {
        let event = ActivityEvent::ReportAction(ActionInfo::default());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"report_action""#));
        assert_eq!(event.name(), "report_action");
    }
}
