//! CLI commands: status, toggle, replay and show
//!
//! `replay` stands in for the host application: it feeds a scripted sequence
//! of document events into a [`ProjectLogger`] on a manual clock.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use comfy_table::{Cell, Color, ContentArrangement, Table};
use projlog_core::csv_log::monthly_file_name;
use projlog_core::host::{CadInstanceSummary, GroupKind, ViewSummary, WorksetKind};
use projlog_core::{
    DocumentId, HostDocument, HostError, HostEvent, HostResult, LocalEventSource,
    LoggerConfig, ManualClock, PluginEvent, ProjectLogger, SettingsStore, CSV_COLUMNS,
    CSV_HEADER_VERSION,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Status / Toggle
// ============================================================================

pub fn run_status(config: &LoggerConfig) -> Result<()> {
    let settings = SettingsStore::new(&config.settings_path);
    let current = config.log_dir.join(monthly_file_name(&Local::now()));

    println!("Settings file:  {}", config.settings_path.display());
    println!(
        "Export:         {}",
        if settings.is_export_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("Log directory:  {}", config.log_dir.display());
    if current.exists() {
        let rows = read_log(&current)?.rows.len();
        println!("Current log:    {} ({} rows)", current.display(), rows);
    } else {
        println!("Current log:    {} (not created yet)", current.display());
    }
    Ok(())
}

pub fn run_toggle(config: &LoggerConfig) -> Result<()> {
    let enabled = SettingsStore::new(&config.settings_path).toggle();
    println!(
        "Project logging is now {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

// ============================================================================
// Replay
// ============================================================================

/// Host simulation script
#[derive(Debug, Deserialize)]
pub struct ReplayScript {
    /// Session start; defaults to the first event's time
    #[serde(default)]
    pub session_start: Option<NaiveDateTime>,
    pub documents: Vec<ScriptedDocument>,
    pub events: Vec<ScriptedEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedEventKind {
    Opened,
    Synchronized,
    Closing,
}

#[derive(Debug, Deserialize)]
pub struct ScriptedEvent {
    pub at: NaiveDateTime,
    pub kind: ScriptedEventKind,
    pub document: DocumentId,
}

/// Document with fixed property values; metrics named in `failing` error out
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedDocument {
    pub id: DocumentId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub family: bool,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub host_version: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub project_number: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub warnings: u32,
    #[serde(default)]
    pub worksets: Vec<WorksetKind>,
    #[serde(default)]
    pub linked_models: u32,
    #[serde(default)]
    pub imported_images: u32,
    #[serde(default)]
    pub views: Vec<ViewSummary>,
    #[serde(default)]
    pub model_elements: u64,
    #[serde(default)]
    pub groups: Vec<GroupKind>,
    #[serde(default)]
    pub design_options: u32,
    #[serde(default)]
    pub cad_instances: Vec<CadInstanceSummary>,
    #[serde(default)]
    pub failing: Vec<String>,
}

impl ScriptedDocument {
    fn answer<T: Clone>(&self, metric: &str, value: &T) -> HostResult<T> {
        if self.failing.iter().any(|m| m == metric) {
            return Err(HostError::Unsupported(format!("{} (scripted failure)", metric)));
        }
        Ok(value.clone())
    }
}

impl HostDocument for ScriptedDocument {
    fn id(&self) -> DocumentId {
        self.id
    }
    fn title(&self) -> HostResult<String> {
        self.answer("title", &self.title)
    }
    fn is_family_document(&self) -> HostResult<bool> {
        self.answer("family", &self.family)
    }
    fn user_name(&self) -> HostResult<String> {
        self.answer("user_name", &self.user_name)
    }
    fn host_version(&self) -> HostResult<String> {
        self.answer("host_version", &self.host_version)
    }
    fn project_name(&self) -> HostResult<String> {
        self.answer("project_name", &self.project_name)
    }
    fn project_number(&self) -> HostResult<String> {
        self.answer("project_number", &self.project_number)
    }
    fn path_name(&self) -> HostResult<Option<String>> {
        self.answer("path", &self.path)
    }
    fn warning_count(&self) -> HostResult<u32> {
        self.answer("warnings", &self.warnings)
    }
    fn worksets(&self) -> HostResult<Vec<WorksetKind>> {
        self.answer("worksets", &self.worksets)
    }
    fn linked_model_count(&self) -> HostResult<u32> {
        self.answer("linked_models", &self.linked_models)
    }
    fn imported_image_count(&self) -> HostResult<u32> {
        self.answer("imported_images", &self.imported_images)
    }
    fn views(&self) -> HostResult<Vec<ViewSummary>> {
        self.answer("views", &self.views)
    }
    fn model_element_count(&self) -> HostResult<u64> {
        self.answer("model_elements", &self.model_elements)
    }
    fn groups(&self) -> HostResult<Vec<GroupKind>> {
        self.answer("groups", &self.groups)
    }
    fn design_option_count(&self) -> HostResult<u32> {
        self.answer("design_options", &self.design_options)
    }
    fn cad_instances(&self) -> HostResult<Vec<CadInstanceSummary>> {
        self.answer("cad_instances", &self.cad_instances)
    }
}

fn to_local(at: &NaiveDateTime) -> Result<DateTime<Local>> {
    Local
        .from_local_datetime(at)
        .earliest()
        .with_context(|| format!("{} does not exist in the local time zone", at))
}

pub fn load_script(path: &Path) -> Result<ReplayScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read replay script: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid replay script: {}", path.display()))
}

/// Summary of one replay run
#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub events: usize,
    pub appended: Vec<(PathBuf, String)>,
    pub failures: Vec<(String, String)>,
}

/// Drive a fresh logger through `script`.
pub fn replay(config: LoggerConfig, script: &ReplayScript) -> Result<ReplaySummary> {
    let Some(first) = script.events.first() else {
        bail!("Replay script has no events");
    };
    let start = to_local(script.session_start.as_ref().unwrap_or(&first.at))?;

    let documents: HashMap<DocumentId, &ScriptedDocument> =
        script.documents.iter().map(|d| (d.id, d)).collect();

    let clock = Arc::new(ManualClock::new(start));
    let logger = Arc::new(ProjectLogger::with_clock(config, clock.clone()));
    let mut notifications = logger.events().subscribe();

    let mut source = LocalEventSource::new();
    let subscription = logger.start(&mut source);

    let mut summary = ReplaySummary::default();
    for event in &script.events {
        let doc = documents
            .get(&event.document)
            .with_context(|| format!("Event refers to unknown document {}", event.document))?;
        clock.set(to_local(&event.at)?);
        debug!(document = %event.document, kind = ?event.kind, "Replaying event");

        let host_event = match event.kind {
            ScriptedEventKind::Opened => HostEvent::DocumentOpened(*doc),
            ScriptedEventKind::Synchronized => HostEvent::DocumentSynchronized(*doc),
            ScriptedEventKind::Closing => HostEvent::DocumentClosing(*doc),
        };
        source.emit(host_event);
        summary.events += 1;

        while let Ok(notification) = notifications.try_recv() {
            match notification {
                PluginEvent::RecordAppended { path, project } => {
                    summary.appended.push((path, project))
                }
                PluginEvent::ExportFailed { project, message } => {
                    summary.failures.push((project, message))
                }
                PluginEvent::ExportToggled { .. } => {}
            }
        }
    }

    logger.stop(&mut source, subscription);
    Ok(summary)
}

pub fn run_replay(config: LoggerConfig, script_path: &Path) -> Result<()> {
    let script = load_script(script_path)?;
    let summary = replay(config, &script)?;

    println!("Replayed {} events", summary.events);
    for (path, project) in &summary.appended {
        println!("  logged  {:<32} -> {}", project, path.display());
    }
    for (project, message) in &summary.failures {
        println!("  failed  {:<32} {}", project, message);
    }
    Ok(())
}

// ============================================================================
// Show
// ============================================================================

/// Parsed monthly log
pub struct MonthlyLog {
    pub header_matches: bool,
    pub rows: Vec<csv::StringRecord>,
}

pub fn read_log(path: &Path) -> Result<MonthlyLog> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open log: {}", path.display()))?;
    let header_matches = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .eq(CSV_COLUMNS.iter().copied());
    let rows = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Malformed row in {}", path.display()))?;
    Ok(MonthlyLog {
        header_matches,
        rows,
    })
}

/// Resolve `YYYYMM` (or the current month) to a log file path
pub fn log_path_for_month(log_dir: &Path, month: Option<&str>) -> Result<PathBuf> {
    match month {
        None => Ok(log_dir.join(monthly_file_name(&Local::now()))),
        Some(m) if m.len() == 6 && m.chars().all(|c| c.is_ascii_digit()) => {
            Ok(log_dir.join(format!("logs_{}.csv", m)))
        }
        Some(m) => bail!("Invalid month '{}', expected YYYYMM", m),
    }
}

fn format_duration(secs: &str) -> String {
    match secs.parse::<i64>() {
        Ok(s) if s >= 3600 => format!("{}h {:02}m", s / 3600, (s % 3600) / 60),
        Ok(s) if s >= 60 => format!("{}m {:02}s", s / 60, s % 60),
        Ok(s) => format!("{}s", s),
        Err(_) => secs.to_string(),
    }
}

fn column(name: &str) -> Option<usize> {
    CSV_COLUMNS.iter().position(|c| *c == name)
}

/// Cell for column `name`; empty for unknown columns or short rows.
fn field<'r>(row: &'r csv::StringRecord, name: &str) -> &'r str {
    column(name).and_then(|i| row.get(i)).unwrap_or("")
}

pub fn run_show(log_dir: &Path, month: Option<&str>, no_color: bool) -> Result<()> {
    let path = log_path_for_month(log_dir, month)?;
    if !path.exists() {
        println!("No log at {}", path.display());
        return Ok(());
    }
    let log = read_log(&path)?;
    if !log.header_matches {
        warn!(
            path = %path.display(),
            expected_version = CSV_HEADER_VERSION,
            "Log header does not match the current column layout"
        );
    }

    let headers = [
        "Date", "User", "Project", "Duration", "Syncs", "Warnings", "Views", "Sheets", "Cloud",
    ];
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if no_color {
        table.set_header(headers.to_vec());
    } else {
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }

    for row in &log.rows {
        table.add_row(vec![
            field(row, "Date").to_string(),
            field(row, "UserId").to_string(),
            field(row, "ProjectName").to_string(),
            format_duration(field(row, "DurationSeconds")),
            field(row, "SynchronizedProjectsCount").to_string(),
            field(row, "Warnings").to_string(),
            field(row, "Views").to_string(),
            field(row, "Sheets").to_string(),
            if field(row, "DesktopConnector") == "1" {
                "yes".to_string()
            } else {
                "-".to_string()
            },
        ]);
    }

    println!("{}", path.display());
    println!("{table}");
    println!("{} rows", log.rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DEMO_SCRIPT: &str = include_str!("../demos/replay_day.json");

    #[test]
    fn test_demo_script_replays() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let config = LoggerConfig::new(temp_dir.path().join("settings.json"), &log_dir);
        let script: ReplayScript = serde_json::from_str(DEMO_SCRIPT).unwrap();

        let summary = replay(config, &script).unwrap();

        assert_eq!(summary.events, script.events.len());
        assert_eq!(summary.appended.len(), 2);
        assert!(summary.failures.is_empty());

        let log = read_log(&log_dir.join("logs_202603.csv")).unwrap();
        assert!(log.header_matches);
        assert_eq!(log.rows.len(), 2);

        let tower = &log.rows[0];
        assert_eq!(field(tower, "ProjectName"), "Harbour Tower");
        assert_eq!(field(tower, "DurationSeconds"), "630");
        assert_eq!(field(tower, "SynchronizedProjectsCount"), "2");
        assert_eq!(field(tower, "Worksets"), "2");
        assert_eq!(field(tower, "DesktopConnector"), "1");
        assert_eq!(field(tower, "Views"), "0");

        let annex = &log.rows[1];
        assert_eq!(field(annex, "ProjectName"), "Annex, Block B");
        assert_eq!(field(annex, "FileSizeBytes"), "0");
        assert_eq!(field(annex, "Diroot"), "");
    }

    #[test]
    fn test_unknown_document_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggerConfig::new(
            temp_dir.path().join("settings.json"),
            temp_dir.path().join("logs"),
        );
        let script: ReplayScript = serde_json::from_str(
            r#"{
                "documents": [],
                "events": [{ "at": "2026-03-10T09:00:00", "kind": "opened", "document": 5 }]
            }"#,
        )
        .unwrap();

        let err = replay(config, &script).unwrap_err();
        assert!(err.to_string().contains("doc#5"));
    }

    #[test]
    fn test_unknown_column_reads_empty() {
        let row = csv::StringRecord::from(vec!["jdoe", "sess-1", "2026-03-10"]);
        assert_eq!(column("UserId"), Some(0));
        assert_eq!(column("NoSuchColumn"), None);
        assert_eq!(field(&row, "NoSuchColumn"), "");
        assert_eq!(field(&row, "Date"), "2026-03-10");
        // Known column beyond the end of a short row
        assert_eq!(field(&row, "ImportedCADFiles"), "");
    }

    #[test]
    fn test_log_path_for_month() {
        let dir = Path::new("/logs");
        assert_eq!(
            log_path_for_month(dir, Some("202602")).unwrap(),
            PathBuf::from("/logs/logs_202602.csv")
        );
        assert!(log_path_for_month(dir, Some("2026-02")).is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration("45"), "45s");
        assert_eq!(format_duration("630"), "10m 30s");
        assert_eq!(format_duration("7260"), "2h 01m");
        assert_eq!(format_duration("n/a"), "n/a");
    }
}
