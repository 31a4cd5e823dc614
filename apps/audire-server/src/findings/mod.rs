//! Findings: identification, collection and refinement
//!
//! Shared by the PDF and DOCX pipelines:
//!
//! - `classifier`: which table column holds findings
//! - `collector`: length / prefix heuristics for candidates
//! - `ids`: position-derived, reproducible identifiers
//! - `refine`: concurrent refinement of a findings map

pub mod classifier;
pub mod collector;
pub mod ids;
pub mod refine;
mod types;

pub use classifier::{classify, contains_keyword, header_keyword_column, Classification};
pub use collector::{collapse_whitespace, FindingCollector};
pub use ids::FindingId;
pub use refine::{
    FailurePolicy, RefineError, RefinementOrchestrator, RefinementSummary, Refiner, StubRefiner,
};
pub use types::{Decision, Finding, FindingStatus, FindingsMap, TERMINAL_STAGE};
