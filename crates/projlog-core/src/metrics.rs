//! Close-event metrics collection
//!
//! [`collect`] turns a live document plus tracker/session state into a flat
//! [`LogRecord`]. Each host query is independent: a failing query yields the
//! type's default (0, "", false) and is noted in the [`CollectReport`].

use crate::error::{CollectReport, HostError};
use crate::host::{GroupKind, HostDocument, HostResult, WorksetKind};
use crate::session::SessionState;
use crate::tracker::TrackerSnapshot;
use chrono::{DateTime, Local};
use std::fmt;
use std::path::Path;

/// Case-insensitive path fragments that identify cloud-synced project folders
pub const DESKTOP_CONNECTOR_MARKERS: [&str; 3] = ["accdocs", "autodesk docs", "bim 360"];

/// Action column value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    CloseProject,
}

impl LogAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LogAction::CloseProject => "CloseProject",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the monthly log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    // Identity
    pub user_id: String,
    pub session_id: String,
    pub computer_name: String,
    pub host_version: String,

    // Timing
    pub timestamp: DateTime<Local>,
    pub session_started_at: DateTime<Local>,
    pub log_start: DateTime<Local>,
    pub log_end: DateTime<Local>,

    // Project identity
    pub project_name: String,
    pub project_number: String,
    pub project_file_name: String,
    pub project_directory: String,

    pub action: LogAction,

    // Counters
    pub sync_count: u32,
    pub warnings: u32,
    pub file_size_bytes: u64,
    pub worksets: u32,
    pub linked_models: u32,
    pub imported_images: u32,
    pub views: u32,
    pub sheets: u32,
    pub model_elements: u64,
    pub model_groups: u32,
    pub detail_groups: u32,
    pub design_options: u32,
    pub desktop_connector: bool,
    pub imported_cad_files: u32,
}

impl LogRecord {
    /// Open-to-close time in whole seconds
    pub fn duration_secs(&self) -> i64 {
        (self.log_end - self.log_start).num_seconds().max(0)
    }

    /// Session start to close in whole seconds
    pub fn session_duration_secs(&self) -> i64 {
        (self.log_end - self.session_started_at).num_seconds().max(0)
    }
}

/// Collapse a host query to its value or the type default.
fn or_default<T: Default>(
    report: &mut CollectReport,
    metric: &'static str,
    result: HostResult<T>,
) -> T {
    match result {
        Ok(value) => value,
        Err(error) => {
            report.add_issue(metric, error);
            T::default()
        }
    }
}

fn count_u32<I>(items: I) -> u32
where
    I: IntoIterator<Item = bool>,
{
    let n = items.into_iter().filter(|hit| *hit).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Split a stored path into (directory, file name), accepting both separators.
pub fn split_document_path(path: &str) -> (String, String) {
    match path.rfind(['/', '\\']) {
        Some(idx) => (path[..idx].to_string(), path[idx + 1..].to_string()),
        None => (String::new(), path.to_string()),
    }
}

/// True when the stored path lies in a desktop-connector / cloud folder.
pub fn is_desktop_connector_path(path: Option<&str>) -> bool {
    let Some(path) = path else {
        return false;
    };
    let lowered = path.to_lowercase();
    DESKTOP_CONNECTOR_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Size of the file at `path`, or zero when it is not on disk.
pub fn file_size_on_disk(path: Option<&str>) -> HostResult<u64> {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return Ok(0);
    };
    let path = Path::new(path);
    if !path.exists() {
        return Ok(0);
    }
    std::fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|e| HostError::Query(format!("stat {}: {}", path.display(), e)))
}

/// Build the record for a closing document.
pub fn collect(
    doc: &dyn HostDocument,
    session: &SessionState,
    snapshot: &TrackerSnapshot,
    now: DateTime<Local>,
) -> (LogRecord, CollectReport) {
    let mut report = CollectReport::new();

    let path = or_default(&mut report, "path", doc.path_name()).filter(|p| !p.is_empty());
    let (project_directory, file_name) = match path.as_deref() {
        Some(p) => split_document_path(p),
        None => (String::new(), String::new()),
    };
    let project_file_name = if file_name.is_empty() {
        or_default(&mut report, "title", doc.title())
    } else {
        file_name
    };

    let worksets = or_default(&mut report, "worksets", doc.worksets());
    let views = or_default(&mut report, "views", doc.views());
    let groups = or_default(&mut report, "groups", doc.groups());
    let cad_instances = or_default(&mut report, "cad_instances", doc.cad_instances());

    let record = LogRecord {
        user_id: or_default(&mut report, "user_name", doc.user_name()),
        session_id: session.session_id().to_string(),
        computer_name: session.computer_name().to_string(),
        host_version: or_default(&mut report, "host_version", doc.host_version()),

        timestamp: now,
        session_started_at: session.started_at(),
        log_start: snapshot.opened_at,
        log_end: now,

        project_name: or_default(&mut report, "project_name", doc.project_name()),
        project_number: or_default(&mut report, "project_number", doc.project_number()),
        project_file_name,
        project_directory,

        action: LogAction::CloseProject,

        sync_count: snapshot.sync_count,
        warnings: or_default(&mut report, "warnings", doc.warning_count()),
        file_size_bytes: or_default(
            &mut report,
            "file_size",
            file_size_on_disk(path.as_deref()),
        ),
        worksets: count_u32(worksets.iter().map(|k| *k == WorksetKind::User)),
        linked_models: or_default(&mut report, "linked_models", doc.linked_model_count()),
        imported_images: or_default(&mut report, "imported_images", doc.imported_image_count()),
        views: count_u32(views.iter().map(|v| !v.is_template)),
        sheets: count_u32(views.iter().map(|v| v.is_sheet && !v.is_template)),
        model_elements: or_default(&mut report, "model_elements", doc.model_element_count()),
        model_groups: count_u32(groups.iter().map(|g| *g == GroupKind::Model)),
        detail_groups: count_u32(groups.iter().map(|g| *g == GroupKind::Detail)),
        design_options: or_default(&mut report, "design_options", doc.design_option_count()),
        desktop_connector: is_desktop_connector_path(path.as_deref()),
        imported_cad_files: count_u32(cad_instances.iter().map(|c| !c.is_linked)),
    };

    (record, report)
}
