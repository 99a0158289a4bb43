//! Accessor interface onto the host application's document model
//!
//! The host wrapper implements [`HostDocument`] for each live document and
//! issues a [`DocumentId`] per document instance. Every accessor is fallible:
//! the collector decides what a failure means, not the wrapper.

use crate::error::HostError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type HostResult<T> = Result<T, HostError>;

/// Opaque identity handle for one open document instance.
///
/// Two documents with identical titles, paths or contents still get distinct
/// ids; bookkeeping is keyed by this handle only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Kind of a workset in a workshared model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorksetKind {
    /// Created by users; the only kind that is counted
    User,
    Family,
    Standard,
    View,
}

/// Minimal view descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSummary {
    pub is_template: bool,
    pub is_sheet: bool,
}

/// Kind of an element group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Model,
    Detail,
}

/// Imported or linked CAD instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CadInstanceSummary {
    /// Linked (kept as external reference) rather than imported
    pub is_linked: bool,
}

/// Read-only view of a live host document.
pub trait HostDocument {
    /// Identity handle issued by the host wrapper
    fn id(&self) -> DocumentId;

    /// Window title / document title
    fn title(&self) -> HostResult<String>;

    /// Family (component) documents are not project documents
    fn is_family_document(&self) -> HostResult<bool>;

    /// Signed-in user of the host application
    fn user_name(&self) -> HostResult<String>;

    /// Host build / service pack string
    fn host_version(&self) -> HostResult<String>;

    fn project_name(&self) -> HostResult<String>;

    fn project_number(&self) -> HostResult<String>;

    /// Stored file path; `None` for documents never saved
    fn path_name(&self) -> HostResult<Option<String>>;

    fn warning_count(&self) -> HostResult<u32>;

    fn worksets(&self) -> HostResult<Vec<WorksetKind>>;

    fn linked_model_count(&self) -> HostResult<u32>;

    fn imported_image_count(&self) -> HostResult<u32>;

    fn views(&self) -> HostResult<Vec<ViewSummary>>;

    /// Instances of model-category elements (types excluded)
    fn model_element_count(&self) -> HostResult<u64>;

    fn groups(&self) -> HostResult<Vec<GroupKind>>;

    fn design_option_count(&self) -> HostResult<u32>;

    fn cad_instances(&self) -> HostResult<Vec<CadInstanceSummary>>;
}
