//! Finding types
//!
//! A finding is one reviewable text unit pulled out of an uploaded
//! document. Findings live only in request/response payloads; nothing
//! here is persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stage a finding reaches once the refinement transform has completed
pub const TERMINAL_STAGE: u8 = 6;

/// Mapping of finding id to finding, ordered by id for stable responses
pub type FindingsMap = BTreeMap<String, Finding>;

/// Progress of a finding through the refinement pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    /// Extracted, refinement not finished
    Processing,
    /// Refinement completed
    Done,
    /// Refinement failed for this finding only
    Failed,
}

/// Reviewer decision; never set by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A discovered reviewable text unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Position-derived identifier, unique within one document
    pub id: String,
    /// Extracted text, trimmed and whitespace-collapsed
    pub original: String,
    /// Refined text (equal to `original` until refinement completes)
    pub refined: String,
    /// Refinement stage, 0 until started, [`TERMINAL_STAGE`] when done
    pub stage: u8,
    /// Refinement status
    pub status: FindingStatus,
    /// Reviewer decision
    pub decision: Decision,
    /// Refinement error message (only when `status == Failed`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Finding {
    /// Create a freshly extracted finding
    pub fn new(id: impl Into<String>, original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            id: id.into(),
            refined: original.clone(),
            original,
            stage: 0,
            status: FindingStatus::Processing,
            decision: Decision::Pending,
            error: None,
        }
    }

    /// Record a completed refinement
    pub fn complete(&mut self, refined: String) {
        self.refined = refined;
        self.stage = TERMINAL_STAGE;
        self.status = FindingStatus::Done;
        self.error = None;
    }

    /// Record a failed refinement; `refined` keeps its previous value
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = FindingStatus::Failed;
        self.error = Some(error.into());
    }

    /// Whether refinement has finished successfully
    pub fn is_done(&self) -> bool {
        self.status == FindingStatus::Done
    }
}
