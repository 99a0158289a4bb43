//! Monthly CSV log writer
//!
//! One file per calendar month (`logs_YYYYMM.csv`), append-only. The header
//! is written only into an empty file, decided under an exclusive lock so two
//! host processes racing on a fresh month never both write it.

use crate::error::CoreError;
use crate::metrics::LogRecord;
use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bumped whenever [`CSV_COLUMNS`] changes
pub const CSV_HEADER_VERSION: u32 = 1;

/// Column order of every log file
pub const CSV_COLUMNS: [&str; 28] = [
    "UserId",
    "SessionId",
    "Date",
    "ProjectName",
    "ProjectNumber",
    "ProjectFileName",
    "Action",
    "LogStart",
    "LogEnd",
    "DurationSeconds",
    "SessionDurationSeconds",
    "SynchronizedProjectsCount",
    "UserComputer",
    "RevitServicePackage",
    "Warnings",
    "FileSizeBytes",
    "Worksets",
    "LinkedModels",
    "ImportedImages",
    "Views",
    "Sheets",
    "ModelElements",
    "ModelGroups",
    "DetailGroups",
    "DesignOptions",
    "Diroot",
    "DesktopConnector",
    "ImportedCADFiles",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header line (without line terminator)
pub fn csv_header() -> String {
    CSV_COLUMNS.join(",")
}

/// Quote a field if it contains a comma, quote or line break.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Locale-invariant `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// File name of the log covering `at`'s calendar month
pub fn monthly_file_name(at: &DateTime<Local>) -> String {
    format!("logs_{}.csv", at.format("%Y%m"))
}

/// Field values of `record` in [`CSV_COLUMNS`] order, unescaped
pub fn record_fields(record: &LogRecord) -> [String; 28] {
    [
        record.user_id.clone(),
        record.session_id.clone(),
        format_timestamp(&record.timestamp),
        record.project_name.clone(),
        record.project_number.clone(),
        record.project_file_name.clone(),
        record.action.as_str().to_string(),
        format_timestamp(&record.log_start),
        format_timestamp(&record.log_end),
        record.duration_secs().to_string(),
        record.session_duration_secs().to_string(),
        record.sync_count.to_string(),
        record.computer_name.clone(),
        record.host_version.clone(),
        record.warnings.to_string(),
        record.file_size_bytes.to_string(),
        record.worksets.to_string(),
        record.linked_models.to_string(),
        record.imported_images.to_string(),
        record.views.to_string(),
        record.sheets.to_string(),
        record.model_elements.to_string(),
        record.model_groups.to_string(),
        record.detail_groups.to_string(),
        record.design_options.to_string(),
        record.project_directory.clone(),
        if record.desktop_connector { "1" } else { "0" }.to_string(),
        record.imported_cad_files.to_string(),
    ]
}

/// One escaped CSV line (without line terminator)
pub fn format_row(record: &LogRecord) -> String {
    record_fields(record)
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<_>>()
        .join(",")
}

/// Appends records to monthly files under a log directory
#[derive(Debug, Clone)]
pub struct CsvLogWriter {
    log_dir: PathBuf,
}

impl CsvLogWriter {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the monthly file covering `at`
    pub fn path_for(&self, at: &DateTime<Local>) -> PathBuf {
        self.log_dir.join(monthly_file_name(at))
    }

    /// Append `record` to the file of its event month; returns that path.
    pub fn append(&self, record: &LogRecord) -> Result<PathBuf, CoreError> {
        let path = self.path_for(&record.timestamp);
        append_row(record, &path)?;
        Ok(path)
    }
}

/// Append one record to `path`, writing the header first if the file is empty.
///
/// The file handle and its lock live only for this call.
pub fn append_row(record: &LogRecord, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| CoreError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| CoreError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;

    let mut lock = fd_lock::RwLock::new(file);
    let mut guard = lock.write().map_err(|source| CoreError::FileLock {
        path: path.to_path_buf(),
        source,
    })?;

    let is_new = guard
        .metadata()
        .map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })?
        .len()
        == 0;

    let mut buf = String::new();
    if is_new {
        buf.push_str(&csv_header());
        buf.push('\n');
    }
    buf.push_str(&format_row(record));
    buf.push('\n');

    guard
        .write_all(buf.as_bytes())
        .and_then(|()| guard.flush())
        .map_err(|source| CoreError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;

    if is_new {
        info!(path = %path.display(), "Created monthly log");
    }
    debug!(path = %path.display(), project = %record.project_name, "Appended log row");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LogAction;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn sample_record(project_name: &str) -> LogRecord {
        let t0 = Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        LogRecord {
            user_id: "jdoe".into(),
            session_id: "sess-1".into(),
            computer_name: "WS-042".into(),
            host_version: "2024.2".into(),
            timestamp: t0 + Duration::seconds(630),
            session_started_at: t0 - Duration::seconds(60),
            log_start: t0,
            log_end: t0 + Duration::seconds(630),
            project_name: project_name.into(),
            project_number: "P-100".into(),
            project_file_name: "model.rvt".into(),
            project_directory: String::new(),
            action: LogAction::CloseProject,
            sync_count: 2,
            warnings: 4,
            file_size_bytes: 0,
            worksets: 3,
            linked_models: 1,
            imported_images: 0,
            views: 10,
            sheets: 2,
            model_elements: 1200,
            model_groups: 1,
            detail_groups: 0,
            design_options: 0,
            desktop_connector: true,
            imported_cad_files: 5,
        }
    }

    #[test]
    fn test_escape_field_rules() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_field("cr\rhere"), "\"cr\rhere\"");
        assert!(matches!(escape_field("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_round_trips_through_csv_reader() {
        let values = [
            "Harbour, Phase 2",
            "He said \"done\"",
            "multi\nline, \"both\"",
            "",
            "plain",
        ];
        let line = values
            .iter()
            .map(|v| escape_field(v))
            .collect::<Vec<_>>()
            .join(",");

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_bytes());
        let parsed = reader.records().next().unwrap().unwrap();

        let parsed: Vec<&str> = parsed.iter().collect();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_header_matches_columns() {
        let header = csv_header();
        assert!(header.starts_with("UserId,SessionId,Date,ProjectName"));
        assert!(header.ends_with("Diroot,DesktopConnector,ImportedCADFiles"));
        assert_eq!(header.split(',').count(), 28);
    }

    #[test]
    fn test_monthly_file_name() {
        let at = Local.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(monthly_file_name(&at), "logs_202601.csv");
    }

    #[test]
    fn test_row_formatting() {
        let row = format_row(&sample_record("Harbour, Phase 2"));
        let fields: Vec<&str> = row.split(',').collect();

        assert_eq!(fields[0], "jdoe");
        assert_eq!(fields[2], "2026-03-10 09:10:30");
        assert_eq!(fields[3], "\"Harbour");
        assert!(row.contains(",CloseProject,2026-03-10 09:00:00,2026-03-10 09:10:30,630,690,2,"));
        assert!(row.ends_with(",,1,5"));
    }

    #[test]
    fn test_append_writes_header_once() {
        let temp_dir = TempDir::new().unwrap();
        let writer = CsvLogWriter::new(temp_dir.path().join("logs"));

        let mut path = PathBuf::new();
        for i in 0..3 {
            path = writer.append(&sample_record(&format!("Project {}", i))).unwrap();
        }

        assert_eq!(path.file_name().unwrap(), "logs_202603.csv");
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], csv_header());
        assert!(lines[1..].iter().all(|l| !l.starts_with("UserId")));
        for line in &lines {
            assert_eq!(line.split(',').count(), 28);
        }
    }

    #[test]
    fn test_append_never_truncates_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs_202603.csv");
        std::fs::write(&path, "existing header\nexisting row\n").unwrap();

        append_row(&sample_record("New"), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("existing header\nexisting row\n"));
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_append_parses_back_with_csv_reader() {
        let temp_dir = TempDir::new().unwrap();
        let writer = CsvLogWriter::new(temp_dir.path());
        let mut record = sample_record("Harbour, \"North\" Wing");
        record.project_directory = "C:\\Jobs\\Line\nBreak".into();

        let path = writer.append(&record).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 28);
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[3], "Harbour, \"North\" Wing");
        assert_eq!(&row[25], "C:\\Jobs\\Line\nBreak");
        assert_eq!(&row[26], "1");
    }
}
