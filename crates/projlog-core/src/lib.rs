//! projlog-core - Core library for projlog
//!
//! Tracks project documents through open, synchronize and close in a CAD host,
//! and appends one row of document metrics per closed project to a monthly
//! CSV log.

pub mod config;
pub mod csv_log;
pub mod error;
pub mod event;
pub mod host;
pub mod metrics;
pub mod plugin;
pub mod session;
pub mod settings;
pub mod tracker;

pub use config::LoggerConfig;
pub use csv_log::{CsvLogWriter, CSV_COLUMNS, CSV_HEADER_VERSION};
pub use error::{CollectReport, CoreError, HostError};
pub use event::{
    DocumentEventHandler, EventBus, EventSource, HostEvent, LocalEventSource, PluginEvent,
};
pub use host::{DocumentId, HostDocument, HostResult};
pub use metrics::{collect, LogAction, LogRecord};
pub use plugin::{CloseOutcome, ProjectLogger};
pub use session::{Clock, ManualClock, SessionState, SystemClock};
pub use settings::{Settings, SettingsStore};
pub use tracker::{DocumentTracker, TrackerSnapshot};
