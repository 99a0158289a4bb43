//! Error types for projlog-core
//!
//! Host query failures ([`HostError`]) are kept apart from I/O failures
//! ([`CoreError`]) so a single failing metric can degrade to its default while
//! the rest of the record is still built.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for projlog operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory: {path}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock file for append: {path}")]
    FileLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize settings")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    // ===================
    // Record Errors
    // ===================
    #[error("Failed to build log record for {document}: {message}")]
    RecordBuild { document: String, message: String },

    // ===================
    // Config Errors
    // ===================
    #[error("Could not determine a {kind} directory for this user")]
    UserDirectoryNotFound { kind: &'static str },
}

/// Failure of a single query against the host's document object model.
///
/// These never abort record construction; see [`CollectReport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("document is not ready: {0}")]
    NotReady(String),

    #[error("not supported by this host version: {0}")]
    Unsupported(String),

    #[error("host query failed: {0}")]
    Query(String),
}

/// One metric that fell back to its default value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricIssue {
    pub metric: &'static str,
    pub error: HostError,
}

/// Report of metrics that degraded while building a record
///
/// The record is always produced; this only tells the caller which columns
/// carry a default instead of a live value.
#[derive(Debug, Default, Clone)]
pub struct CollectReport {
    pub issues: Vec<MetricIssue>,
}

impl CollectReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, metric: &'static str, error: HostError) {
        self.issues.push(MetricIssue { metric, error });
    }

    /// Returns true when every metric came from the host
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Names of the degraded metrics, in collection order
    pub fn degraded_metrics(&self) -> Vec<&'static str> {
        self.issues.iter().map(|i| i.metric).collect()
    }

    /// Returns true if the named metric degraded
    pub fn is_degraded(&self, metric: &str) -> bool {
        self.issues.iter().any(|i| i.metric == metric)
    }
}
