//! Refinement orchestration
//!
//! Fans every finding of a document out to the refinement transform
//! concurrently and waits for all of them (a barrier, not a race).
//! Each future owns a mutable borrow of exactly one finding, so no
//! locking is needed and nothing is held across an await point.
//!
//! In-flight refinements are never cancelled: once a batch starts it
//! runs to completion even if the client has gone away.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;

use super::types::FindingsMap;

/// Refinement errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefineError {
    /// The transform itself reported a failure
    #[error("Refinement failed: {0}")]
    Transform(String),

    /// The transform did not answer within its latency budget
    #[error("Refinement timed out after {0} ms")]
    Timeout(u64),

    /// A batch aborted because at least one item failed
    #[error("Refinement batch aborted: {failed} of {total} findings failed ({first_error})")]
    BatchAborted {
        failed: usize,
        total: usize,
        first_error: String,
    },
}

/// The refinement transform: original text in, refined text out
#[async_trait]
pub trait Refiner: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Refine one finding's text
    async fn refine(&self, original: &str) -> Result<String, RefineError>;
}

/// Placeholder transform that simulates model latency
pub struct StubRefiner {
    latency: Duration,
    suffix: String,
}

impl StubRefiner {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            suffix: " [Refined by AI]".to_string(),
        }
    }
}

#[async_trait]
impl Refiner for StubRefiner {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn refine(&self, original: &str) -> Result<String, RefineError> {
        tokio::time::sleep(self.latency).await;
        Ok(format!("{}{}", original, self.suffix))
    }
}

/// What a single failing refinement does to the rest of its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the whole batch; no finding is marked done
    #[default]
    Abort,
    /// Mark only the failing finding; the others complete normally
    Isolate,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "isolate" => Ok(Self::Isolate),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown refinement failure policy: {}", other)),
        }
    }
}

/// Counts reported after a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefinementSummary {
    pub refined: usize,
    pub failed: usize,
}

/// Runs the refinement transform over a findings map
#[derive(Clone)]
pub struct RefinementOrchestrator {
    refiner: Arc<dyn Refiner>,
    policy: FailurePolicy,
    item_timeout: Option<Duration>,
}

impl RefinementOrchestrator {
    pub fn new(refiner: Arc<dyn Refiner>, policy: FailurePolicy) -> Self {
        Self {
            refiner,
            policy,
            item_timeout: None,
        }
    }

    /// Bound every individual refinement call
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    async fn refine_one(&self, original: &str) -> Result<String, RefineError> {
        match self.item_timeout {
            Some(limit) => tokio::time::timeout(limit, self.refiner.refine(original))
                .await
                .map_err(|_| RefineError::Timeout(limit.as_millis() as u64))?,
            None => self.refiner.refine(original).await,
        }
    }

    /// Refine every finding in place and wait for all of them
    pub async fn refine_all(
        &self,
        findings: &mut FindingsMap,
    ) -> Result<RefinementSummary, RefineError> {
        let total = findings.len();
        if total == 0 {
            return Ok(RefinementSummary::default());
        }

        let started = Instant::now();
        let outcomes = join_all(findings.values_mut().map(|finding| async move {
            let outcome = self.refine_one(&finding.original).await;
            (finding, outcome)
        }))
        .await;

        let failed = outcomes.iter().filter(|(_, o)| o.is_err()).count();

        if failed > 0 && self.policy == FailurePolicy::Abort {
            let first_error = outcomes
                .iter()
                .find_map(|(_, o)| o.as_ref().err())
                .map(|e| e.to_string())
                .unwrap_or_default();
            tracing::error!(
                refiner = self.refiner.name(),
                failed,
                total,
                "Refinement batch aborted"
            );
            return Err(RefineError::BatchAborted {
                failed,
                total,
                first_error,
            });
        }

        for (finding, outcome) in outcomes {
            match outcome {
                Ok(refined) => finding.complete(refined),
                Err(e) => {
                    tracing::warn!(id = %finding.id, error = %e, "Refinement failed for finding");
                    finding.fail(e.to_string());
                }
            }
        }

        tracing::info!(
            refiner = self.refiner.name(),
            total,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refinement batch complete"
        );

        Ok(RefinementSummary {
            refined: total - failed,
            failed,
        })
    }
}
