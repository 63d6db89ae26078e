//! Integration tests that start from a seeded store instead of replaying
//! navigation events.
//!
//! # Running These Tests
//!
//! These tests require the `test-helpers` feature:
//! ```bash
//! cargo test -p trailmark-core --test seeded_state_integration --features test-helpers
//! ```

// Only compile when test-helpers feature is enabled
#![cfg(feature = "test-helpers")]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use trailmark_core::{ActivityHub, AnalyticsApi, EventRecord, SinkOptions, Synchronizer, ViewRecord};
use trailmark_protocol::{ActionInfo, ViewInfo};
use url::Url;

#[derive(Default)]
struct RecordingApi {
    views: Mutex<Vec<ViewRecord>>,
    events: Mutex<Vec<EventRecord>>,
}

#[async_trait]
impl AnalyticsApi for RecordingApi {
    async fn report_view(&self, view: ViewRecord) -> bool {
        self.views.lock().push(view);
        true
    }

    async fn report_event(&self, event: EventRecord) -> bool {
        self.events.lock().push(event);
        true
    }
}

fn setup() -> (Arc<ActivityHub>, Arc<RecordingApi>, Arc<Synchronizer>) {
    let hub = Arc::new(ActivityHub::new());
    let api = Arc::new(RecordingApi::default());
    let sync = Synchronizer::new(
        SinkOptions::new()
            .app_host_name("apphost")
            .api(api.clone())
            .telemetry_source(hub.clone()),
    )
    .unwrap();
    (hub, api, sync)
}

fn url(path: &str) -> Url {
    Url::parse("app://apphost/").unwrap().join(path).unwrap()
}

#[tokio::test]
async fn action_reports_seeded_location() {
    let (hub, api, sync) = setup();
    sync.modify_for_test(|store| {
        store.set_location_for_test(Some(url("some/url")), Some(url("another/url")))
    })
    .await;

    hub.report_action(&ActionInfo {
        name: Some("Test".to_string()),
        category: Some("Some category".to_string()),
        verb: Some("Some verb".to_string()),
    })
    .await
    .unwrap();

    let record = api.events.lock().pop().unwrap();
    assert_eq!(record.url, "app://apphost/some/url");
    assert_eq!(record.referrer_url.as_deref(), Some("app://apphost/another/url"));
    assert_eq!(record.action, "Some verb");
}

#[tokio::test]
async fn view_after_seeded_location_uses_it_as_referrer() {
    let (hub, api, sync) = setup();
    sync.modify_for_test(|store| store.set_location_for_test(Some(url("cart")), None))
        .await;

    hub.report_view(&ViewInfo {
        absolute_path: Some("/checkout".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();

    let record = api.views.lock().pop().unwrap();
    assert_eq!(record.url, "app://apphost/checkout");
    assert_eq!(record.referrer_url.as_deref(), Some("app://apphost/cart"));
}

#[tokio::test]
async fn seeded_referrer_without_current_is_reported_as_is() {
    let (hub, api, sync) = setup();
    sync.modify_for_test(|store| store.set_location_for_test(None, Some(url("gone"))))
        .await;

    hub.report_action(&ActionInfo::default()).await.unwrap();

    let record = api.events.lock().pop().unwrap();
    assert_eq!(record.url, "app://apphost/");
    assert_eq!(record.referrer_url.as_deref(), Some("app://apphost/gone"));
    assert_eq!(record.category, "Unknown");
    assert_eq!(record.action, "Unknown");
}
