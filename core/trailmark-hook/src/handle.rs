//! Replays activity events through the sink.
//!
//! Reads newline-delimited JSON events (see `trailmark_protocol`), dispatches
//! each one through an [`ActivityHub`] into a [`Synchronizer`], and writes
//! every record the synchronizer produces to stdout, one JSON object per line:
//!
//! ```text
//! {"kind":"view","record":{"url":"app://mail/inbox", ...}}
//! {"kind":"event","record":{"url":"app://mail/inbox","category":"Unknown", ...}}
//! ```
//!
//! Lines that fail to parse are skipped. Rejected reports are logged and
//! counted; the run fails at the end if any report was rejected.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use trailmark_core::config::{load_sink_config, load_sink_config_from};
use trailmark_core::{ActivityHub, AnalyticsApi, EventRecord, SinkOptions, Synchronizer, ViewRecord};
use trailmark_protocol::ActivityEvent;

pub struct RunOptions {
    pub app_host: Option<String>,
    pub input: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Answer every report with "rejected" (exercises the failure path).
    pub reject_all: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub dispatched: usize,
    pub skipped: usize,
    pub rejected: usize,
}

/// Analytics backend that prints each record as a JSON line.
pub struct JsonLinesApi<W> {
    out: Mutex<W>,
    reject_all: bool,
}

impl<W: Write + Send> JsonLinesApi<W> {
    pub fn new(out: W) -> Self {
        JsonLinesApi {
            out: Mutex::new(out),
            reject_all: false,
        }
    }

    pub fn reject_all(mut self, reject: bool) -> Self {
        self.reject_all = reject;
        self
    }

    fn emit(&self, line: serde_json::Value) -> bool {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "Failed to write record");
            return false;
        }
        !self.reject_all
    }
}

#[cfg(test)]
impl JsonLinesApi<Vec<u8>> {
    fn lines(&self) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(&self.out.lock())
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

#[async_trait]
impl<W: Write + Send> AnalyticsApi for JsonLinesApi<W> {
    async fn report_view(&self, view: ViewRecord) -> bool {
        self.emit(json!({ "kind": "view", "record": view }))
    }

    async fn report_event(&self, event: EventRecord) -> bool {
        self.emit(json!({ "kind": "event", "record": event }))
    }
}

pub async fn run(options: RunOptions) -> Result<(), String> {
    let config = match &options.config {
        Some(path) => load_sink_config_from(path),
        None => load_sink_config(),
    };
    let app_host = options
        .app_host
        .or(config.app_host_name)
        .ok_or("No app host name: pass --app-host or set app_host_name in ~/.trailmark/config.json")?;

    let hub = Arc::new(ActivityHub::new());
    let api = Arc::new(JsonLinesApi::new(std::io::stdout()).reject_all(options.reject_all));
    let _sync = Synchronizer::new(
        SinkOptions::new()
            .app_host_name(app_host)
            .api(api)
            .telemetry_source(hub.clone()),
    )
    .map_err(|e| format!("Invalid sink options: {}", e))?;

    let summary = match &options.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
            replay(BufReader::new(file), &hub).await?
        }
        None => replay(BufReader::new(tokio::io::stdin()), &hub).await?,
    };

    tracing::info!(
        dispatched = summary.dispatched,
        skipped = summary.skipped,
        rejected = summary.rejected,
        "Replay finished"
    );

    if summary.rejected > 0 {
        return Err(format!(
            "{} of {} events were rejected by the analytics backend",
            summary.rejected, summary.dispatched
        ));
    }
    Ok(())
}

/// Feeds every line of `reader` to `hub`, in order.
pub async fn replay<R>(reader: R, hub: &ActivityHub) -> Result<ReplaySummary, String>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("Failed to read input: {}", e))?
    {
        line_no += 1;

        let event = match ActivityEvent::parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping unparseable event");
                summary.skipped += 1;
                continue;
            }
        };

        tracing::debug!(line = line_no, event = event.name(), "Dispatching event");
        summary.dispatched += 1;

        if let Err(e) = hub.dispatch(&event).await {
            tracing::warn!(line = line_no, error = %e, "Event was not accepted");
            summary.rejected += 1;
        }
    }

    Ok(summary)
}
