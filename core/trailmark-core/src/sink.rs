//! Synchronizer: translates activity events into analytics reports.
//!
//! ## Access per event
//!
//! ```text
//! BeginSession        → writer   replace session snapshot (visitor id hashed)
//! EndSession          → writer   clear session snapshot
//! SetEnvironmentInfo  → writer   replace environment snapshot
//! ReportView          → writer   advance location, then report_view
//! ReportAction        → reader   report_event against current location
//! ```
//!
//! Views take the writer side because they move the location and must not
//! interleave with another view's referrer/current shift. Actions only look at
//! existing snapshots, so any number of them report concurrently.
//!
//! The outbound call is made while the access is still held. Its failure is
//! returned to the dispatcher; whatever the handler already changed in the
//! store stays changed.

use std::sync::Arc;

use async_trait::async_trait;
use trailmark_protocol::{ActionInfo, EnvironmentInfo, SessionInfo, ViewInfo};
use url::Url;

use crate::api::{AnalyticsApi, EventRecord, ViewRecord};
use crate::config::SinkOptions;
use crate::defaults;
use crate::error::{ConfigError, ReportKind, SinkError};
use crate::source::ActivityListener;
use crate::state::{EnvironmentSnapshot, LockStatus, SessionSnapshot, SharedState, StateStore};

pub struct Synchronizer {
    base_url: Url,
    api: Arc<dyn AnalyticsApi>,
    state: SharedState,
}

impl Synchronizer {
    /// Validates `options` and subscribes the new synchronizer to the telemetry source.
    ///
    /// Nothing is subscribed when validation fails.
    pub fn new(options: SinkOptions) -> Result<Arc<Self>, ConfigError> {
        let options = options.validate()?;

        let sync = Arc::new(Synchronizer {
            base_url: options.base_url,
            api: options.api,
            state: SharedState::new(),
        });
        options
            .telemetry_source
            .subscribe(Arc::clone(&sync) as Arc<dyn ActivityListener>);

        tracing::debug!(base_url = %sync.base_url, "Synchronizer subscribed");
        Ok(sync)
    }

    /// `app://{host}/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a view path against the base URL.
    pub fn resolve_view_url(&self, path: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(defaults::view_path(path));
        url
    }

    /// Runs `f` against the store under reader access.
    pub async fn inspect<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        self.state.read().await.with(f)
    }

    /// Runs `f` against the store under writer access.
    #[cfg(any(test, feature = "test-helpers"))]
    pub async fn modify_for_test<R>(&self, f: impl FnOnce(&mut StateStore) -> R) -> R {
        self.state.write().await.with_mut(f)
    }

    pub fn lock_status(&self) -> LockStatus {
        self.state.lock_status()
    }

    pub async fn begin_session(&self, session: &SessionInfo) {
        let snapshot = SessionSnapshot::from_session(session);

        let access = self.state.write().await;
        access.with_mut(|store| store.replace_session(snapshot));

        tracing::debug!(visits = session.visits_count, "Session started");
    }

    pub async fn end_session(&self) {
        let access = self.state.write().await;
        access.with_mut(StateStore::clear_session);

        tracing::debug!("Session ended");
    }

    pub async fn set_environment_info(&self, environment: &EnvironmentInfo) {
        let snapshot = EnvironmentSnapshot::from_environment(environment);

        let access = self.state.write().await;
        access.with_mut(|store| store.replace_environment(snapshot));

        tracing::debug!(
            device = ?environment.device_name,
            os = ?environment.operating_system,
            "Environment updated"
        );
    }

    pub async fn report_view(&self, view: &ViewInfo) -> Result<(), SinkError> {
        let next = self.resolve_view_url(view.absolute_path.as_deref());

        let access = self.state.write().await;
        let url = next.to_string();
        let record = access.with_mut(|store| {
            let referrer_url = store
                .advance_location(next)
                .referrer
                .as_ref()
                .map(Url::to_string);
            ViewRecord {
                url,
                view_name: view.title.clone(),
                referrer_url,
                view_time: view.time,
                session: store.session(),
                environment: store.environment(),
            }
        });

        tracing::debug!(
            url = %record.url,
            referrer = ?record.referrer_url,
            "Reporting view"
        );

        let url = record.url.clone();
        let accepted = self.api.report_view(record).await;
        drop(access);

        if accepted {
            Ok(())
        } else {
            tracing::warn!(url = %url, "View report rejected");
            Err(SinkError::Rejected {
                kind: ReportKind::View,
                url,
            })
        }
    }

    pub async fn report_action(&self, action: &ActionInfo) -> Result<(), SinkError> {
        let access = self.state.read().await;
        let record = access.with(|store| {
            let location = store.location();
            EventRecord {
                url: location
                    .current
                    .as_ref()
                    .unwrap_or(&self.base_url)
                    .to_string(),
                category: defaults::event_category(action.category.as_deref()).to_string(),
                action: defaults::action_name(action.verb.as_deref(), action.name.as_deref())
                    .to_string(),
                name: action.name.clone(),
                referrer_url: location.referrer.as_ref().map(Url::to_string),
                session: store.session(),
                environment: store.environment(),
            }
        });

        tracing::debug!(
            url = %record.url,
            category = %record.category,
            action = %record.action,
            "Reporting action"
        );

        let url = record.url.clone();
        let accepted = self.api.report_event(record).await;
        drop(access);

        if accepted {
            Ok(())
        } else {
            tracing::warn!(url = %url, "Event report rejected");
            Err(SinkError::Rejected {
                kind: ReportKind::Event,
                url,
            })
        }
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("base_url", &self.base_url.as_str())
            .field("state", &self.state)
            .finish()
    }
}

#[async_trait]
impl ActivityListener for Synchronizer {
    async fn on_begin_session(&self, session: &SessionInfo) -> Result<(), SinkError> {
        self.begin_session(session).await;
        Ok(())
    }

    async fn on_end_session(&self, _session: &SessionInfo) -> Result<(), SinkError> {
        self.end_session().await;
        Ok(())
    }

    async fn on_set_environment_info(&self, environment: &EnvironmentInfo) -> Result<(), SinkError> {
        self.set_environment_info(environment).await;
        Ok(())
    }

    async fn on_report_view(&self, view: &ViewInfo) -> Result<(), SinkError> {
        self.report_view(view).await
    }

    async fn on_report_action(&self, action: &ActionInfo) -> Result<(), SinkError> {
        self.report_action(action).await
    }
}
