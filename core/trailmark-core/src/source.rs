//! Inbound activity capability and an in-process dispatcher for it.
//!
//! A [`TelemetrySource`] accepts [`ActivityListener`]s. Each of the five
//! activity events is delivered to every listener in registration order, and
//! the dispatcher awaits each handler before moving on to the next.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use trailmark_protocol::{ActionInfo, ActivityEvent, EnvironmentInfo, SessionInfo, ViewInfo};

use crate::error::SinkError;

/// Receives activity events from a [`TelemetrySource`].
#[async_trait]
pub trait ActivityListener: Send + Sync {
    async fn on_begin_session(&self, session: &SessionInfo) -> Result<(), SinkError>;

    async fn on_end_session(&self, session: &SessionInfo) -> Result<(), SinkError>;

    async fn on_set_environment_info(&self, environment: &EnvironmentInfo) -> Result<(), SinkError>;

    async fn on_report_view(&self, view: &ViewInfo) -> Result<(), SinkError>;

    async fn on_report_action(&self, action: &ActionInfo) -> Result<(), SinkError>;
}

/// Something that produces activity events.
pub trait TelemetrySource: Send + Sync {
    /// Registers a listener for the lifetime of the source.
    fn subscribe(&self, listener: Arc<dyn ActivityListener>);
}

/// In-process [`TelemetrySource`]: the application calls the dispatch methods
/// directly and every subscribed listener is awaited in turn.
///
/// A listener error does not stop delivery to later listeners. The first error
/// is returned once all of them have run.
#[derive(Default)]
pub struct ActivityHub {
    listeners: RwLock<Vec<Arc<dyn ActivityListener>>>,
}

impl ActivityHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn snapshot(&self) -> Vec<Arc<dyn ActivityListener>> {
        self.listeners.read().clone()
    }

    pub async fn begin_session(&self, session: &SessionInfo) -> Result<(), SinkError> {
        let mut first_err = None;
        for listener in self.snapshot() {
            if let Err(e) = listener.on_begin_session(session).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub async fn end_session(&self, session: &SessionInfo) -> Result<(), SinkError> {
        let mut first_err = None;
        for listener in self.snapshot() {
            if let Err(e) = listener.on_end_session(session).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub async fn set_environment_info(&self, environment: &EnvironmentInfo) -> Result<(), SinkError> {
        let mut first_err = None;
        for listener in self.snapshot() {
            if let Err(e) = listener.on_set_environment_info(environment).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub async fn report_view(&self, view: &ViewInfo) -> Result<(), SinkError> {
        let mut first_err = None;
        for listener in self.snapshot() {
            if let Err(e) = listener.on_report_view(view).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub async fn report_action(&self, action: &ActionInfo) -> Result<(), SinkError> {
        let mut first_err = None;
        for listener in self.snapshot() {
            if let Err(e) = listener.on_report_action(action).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Routes a decoded [`ActivityEvent`] to the matching dispatch method.
    pub async fn dispatch(&self, event: &ActivityEvent) -> Result<(), SinkError> {
        match event {
            ActivityEvent::BeginSession(session) => self.begin_session(session).await,
            ActivityEvent::EndSession(session) => self.end_session(session).await,
            ActivityEvent::SetEnvironmentInfo(env) => self.set_environment_info(env).await,
            ActivityEvent::ReportView(view) => self.report_view(view).await,
            ActivityEvent::ReportAction(action) => self.report_action(action).await,
        }
    }
}

impl TelemetrySource for ActivityHub {
    fn subscribe(&self, listener: Arc<dyn ActivityListener>) {
        self.listeners.write().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportKind;
    use parking_lot::Mutex;

    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_views: bool,
    }

    #[async_trait]
    impl ActivityListener for Recorder {
        async fn on_begin_session(&self, _: &SessionInfo) -> Result<(), SinkError> {
            self.log.lock().push(format!("{}:begin", self.tag));
            Ok(())
        }

        async fn on_end_session(&self, _: &SessionInfo) -> Result<(), SinkError> {
            self.log.lock().push(format!("{}:end", self.tag));
            Ok(())
        }

        async fn on_set_environment_info(&self, _: &EnvironmentInfo) -> Result<(), SinkError> {
            self.log.lock().push(format!("{}:env", self.tag));
            Ok(())
        }

        async fn on_report_view(&self, _: &ViewInfo) -> Result<(), SinkError> {
            self.log.lock().push(format!("{}:view", self.tag));
            if self.fail_views {
                return Err(SinkError::Rejected {
                    kind: ReportKind::View,
                    url: self.tag.to_string(),
                });
            }
            Ok(())
        }

        async fn on_report_action(&self, _: &ActionInfo) -> Result<(), SinkError> {
            self.log.lock().push(format!("{}:action", self.tag));
            Ok(())
        }
    }

    fn recorder(tag: &'static str, log: &Arc<Mutex<Vec<String>>>, fail_views: bool) -> Arc<Recorder> {
        Arc::new(Recorder {
            tag,
            log: Arc::clone(log),
            fail_views,
        })
    }

    #[tokio::test]
    async fn test_listeners_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hub = ActivityHub::new();
        hub.subscribe(recorder("a", &log, false));
        hub.subscribe(recorder("b", &log, false));

        hub.begin_session(&SessionInfo::default()).await.unwrap();
        hub.report_action(&ActionInfo::default()).await.unwrap();

        assert_eq!(*log.lock(), vec!["a:begin", "b:begin", "a:action", "b:action"]);
    }

    #[tokio::test]
    async fn test_error_is_returned_after_all_listeners_ran() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hub = ActivityHub::new();
        hub.subscribe(recorder("a", &log, true));
        hub.subscribe(recorder("b", &log, true));

        let err = hub.report_view(&ViewInfo::default()).await.unwrap_err();

        assert_eq!(
            err,
            SinkError::Rejected {
                kind: ReportKind::View,
                url: "a".to_string()
            }
        );
        assert_eq!(*log.lock(), vec!["a:view", "b:view"]);
    }

    #[tokio::test]
    async fn test_dispatch_routes_every_event() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hub = ActivityHub::new();
        hub.subscribe(recorder("x", &log, false));

        for event in [
            ActivityEvent::BeginSession(SessionInfo::default()),
            ActivityEvent::SetEnvironmentInfo(EnvironmentInfo::default()),
            ActivityEvent::ReportView(ViewInfo::default()),
            ActivityEvent::ReportAction(ActionInfo::default()),
            ActivityEvent::EndSession(SessionInfo::default()),
        ] {
            hub.dispatch(&event).await.unwrap();
        }

        assert_eq!(
            *log.lock(),
            vec!["x:begin", "x:env", "x:view", "x:action", "x:end"]
        );
    }

    #[tokio::test]
    async fn test_no_listeners_is_ok() {
        let hub = ActivityHub::new();
        assert_eq!(hub.listener_count(), 0);
        hub.end_session(&SessionInfo::default()).await.unwrap();
    }
}
