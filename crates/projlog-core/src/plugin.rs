//! Plugin context: wires the tracker, collector, writer and settings to
//! host document events.
//!
//! A [`ProjectLogger`] lives from plugin load to unload. The host wrapper
//! calls [`ProjectLogger::start`] with its event source and
//! [`ProjectLogger::stop`] on shutdown; the ribbon toggle calls
//! [`ProjectLogger::toggle_export`].

use crate::config::LoggerConfig;
use crate::csv_log::CsvLogWriter;
use crate::error::CoreError;
use crate::event::{DocumentEventHandler, EventBus, EventSource, PluginEvent, SubscriptionId};
use crate::host::HostDocument;
use crate::metrics::{collect, LogRecord};
use crate::session::{Clock, SessionState, SystemClock};
use crate::settings::SettingsStore;
use crate::tracker::{DocumentTracker, TrackerSnapshot};
use chrono::{DateTime, Local};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of handling one close notification
#[derive(Debug)]
pub enum CloseOutcome {
    /// Row appended to the monthly file at this path
    Logged(PathBuf),
    /// Export is switched off
    ExportDisabled,
    /// Family documents are not logged
    NotAProject,
}

/// Lifetime-scoped plugin state
pub struct ProjectLogger {
    session: SessionState,
    tracker: DocumentTracker,
    settings: SettingsStore,
    writer: CsvLogWriter,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl ProjectLogger {
    /// Create a logger on the system clock with a fresh session.
    pub fn new(config: LoggerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a logger on `clock`; the session starts at the clock's current time.
    pub fn with_clock(config: LoggerConfig, clock: Arc<dyn Clock>) -> Self {
        let session = SessionState::start(clock.as_ref());
        Self::with_session(config, clock, session)
    }

    pub fn with_session(config: LoggerConfig, clock: Arc<dyn Clock>, session: SessionState) -> Self {
        info!(
            session_id = %session.session_id(),
            log_dir = %config.log_dir.display(),
            "Project logger loaded"
        );
        Self {
            session,
            tracker: DocumentTracker::new(),
            settings: SettingsStore::new(config.settings_path),
            writer: CsvLogWriter::new(config.log_dir),
            events: EventBus::default_capacity(),
            clock,
        }
    }

    /// Register the document handlers with `source`.
    pub fn start(self: &Arc<Self>, source: &mut dyn EventSource) -> SubscriptionId {
        let handler: Arc<dyn DocumentEventHandler> = self.clone();
        let id = source.register(handler);
        debug!(?id, "Document handlers registered");
        id
    }

    /// Deregister from `source` and drop all tracking state.
    pub fn stop(&self, source: &mut dyn EventSource, id: SubscriptionId) {
        if !source.deregister(id) {
            warn!(?id, "Handlers were not registered");
        }
        let pending = self.tracker.len();
        self.tracker.clear();
        info!(pending, "Project logger unloaded");
    }

    pub fn tracker(&self) -> &DocumentTracker {
        &self.tracker
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Flip the export flag; returns the new state.
    pub fn toggle_export(&self) -> bool {
        let enabled = self.settings.toggle();
        info!(enabled, "Export toggled");
        self.events.publish(PluginEvent::ExportToggled { enabled });
        enabled
    }

    /// Handle a close notification end to end.
    ///
    /// The tracker entry is gone when this returns, whatever the result.
    pub fn handle_close(&self, doc: &dyn HostDocument) -> Result<CloseOutcome, CoreError> {
        let now = self.clock.now();
        let snapshot = self.tracker.consume_on_close(doc.id(), now);
        if !snapshot.was_tracked {
            debug!(document = %doc.id(), "Close for untracked document, timing falls back to now");
        }

        if !self.settings.is_export_enabled() {
            debug!(document = %doc.id(), "Export disabled, skipping record");
            return Ok(CloseOutcome::ExportDisabled);
        }
        if doc.is_family_document().unwrap_or(false) {
            debug!(document = %doc.id(), "Family document, skipping record");
            return Ok(CloseOutcome::NotAProject);
        }

        let record = self.build_record(doc, &snapshot, now);
        let path = self.writer.append(&record)?;
        info!(
            document = %doc.id(),
            project = %record.project_name,
            duration_secs = record.duration_secs(),
            sync_count = record.sync_count,
            "Close logged"
        );
        self.events.publish(PluginEvent::RecordAppended {
            path: path.clone(),
            project: record.project_name,
        });
        Ok(CloseOutcome::Logged(path))
    }

    fn build_record(
        &self,
        doc: &dyn HostDocument,
        snapshot: &TrackerSnapshot,
        now: DateTime<Local>,
    ) -> LogRecord {
        let (record, report) = collect(doc, &self.session, snapshot, now);
        for issue in &report.issues {
            warn!(
                document = %doc.id(),
                metric = issue.metric,
                error = %issue.error,
                "Metric degraded to default"
            );
        }
        record
    }
}

impl DocumentEventHandler for ProjectLogger {
    fn on_document_opened(&self, doc: &dyn HostDocument) {
        self.tracker.record_open(doc.id(), self.clock.now());
    }

    fn on_document_synchronized(&self, doc: &dyn HostDocument) {
        self.tracker.record_sync(doc.id(), self.clock.now());
    }

    /// Never fails towards the host: errors and panics become an
    /// `ExportFailed` notification.
    fn on_document_closing(&self, doc: &dyn HostDocument) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.handle_close(doc)
                .map_err(|e| (project_label(doc), e.to_string()))
        }));
        let (project, message) = match outcome {
            Ok(Ok(_)) => return,
            Ok(Err(failure)) => failure,
            Err(_) => {
                let e = CoreError::RecordBuild {
                    document: doc.id().to_string(),
                    message: "close handling panicked".to_string(),
                };
                (project_label(doc), e.to_string())
            }
        };
        warn!(document = %doc.id(), error = %message, "Failed to log project close");
        self.events
            .publish(PluginEvent::ExportFailed { project, message });
    }
}

/// Project name for notifications; empty when the host cannot supply it.
fn project_label(doc: &dyn HostDocument) -> String {
    catch_unwind(AssertUnwindSafe(|| doc.project_name().unwrap_or_default())).unwrap_or_default()
}
