//! Schema submissions and upload summaries

use serde::{Deserialize, Serialize};

/// A versioned schema revision proposed for review.
///
/// Submissions are never mutated; a revision is a new `Submission` with a
/// strictly greater `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub schema_id: String,
    pub version: u32,
    pub body: String,
    pub submitted_by: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl Submission {
    pub fn new(
        schema_id: impl Into<String>,
        version: u32,
        body: impl Into<String>,
        submitted_by: impl Into<String>,
    ) -> Self {
        Self {
            schema_id: schema_id.into(),
            version,
            body: body.into(),
            submitted_by: submitted_by.into(),
            description: None,
            uri: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether this submission supersedes `other`
    pub fn supersedes(&self, other: &Submission) -> bool {
        self.version > other.version
    }
}

/// Storage summary returned by the upload collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub schema_id: String,
    pub version: u32,
    pub storage_location: String,
    pub uploaded_by: String,
}
