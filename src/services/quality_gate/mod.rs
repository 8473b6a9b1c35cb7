//! Quality gate: independent checkers scored into one pass/fail decision.

mod citation;
mod coherence;
mod duplicate;
mod fabrication;
mod grounding;
mod injection;
mod integrity;
mod pipeline;
pub mod text;

pub use citation::CitationChecker;
pub use coherence::CoherenceChecker;
pub use duplicate::DuplicateChecker;
pub use fabrication::FabricationChecker;
pub use grounding::GroundingChecker;
pub use injection::InjectionChecker;
pub use integrity::IntegrityChecker;
pub use pipeline::QualityGatePipeline;

use crate::domain::models::{CheckOutcome, GateContext};

/// One independent check over a candidate response.
///
/// Checkers are synchronous and must not rely on each other. An `Err` or a
/// panic is contained by the pipeline.
pub trait Checker: Send + Sync {
    /// Stable name used in issues and reports.
    fn name(&self) -> &str;

    /// Inspect `candidate` against the evidence in `ctx`.
    fn check(&self, candidate: &str, ctx: &GateContext) -> anyhow::Result<CheckOutcome>;
}
