//! Convergence Policy: decides, once per cycle, whether to loop again or finalize.
//!
//! Default: `FixedIterationPolicy` (stop after N completed revisions).
//! The policy sees the whole state, so a feedback-driven implementation (e.g. parsing a
//! score out of `cover_letter_feedback`) can replace it without touching the engine.

use crate::refinement::state::ArtifactState;

/// Default number of revision cycles before finalizing.
pub const DEFAULT_MAX_ITERATIONS: u32 = 2;

/// Cycle cap for policies that cannot say when they will stop.
pub const DEFAULT_MAX_CYCLES: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// Run another critique/revise cycle.
    Running,
    /// Freeze the current drafts as final output.
    Done,
}

/// Carried by the engine as `Arc<dyn ConvergencePolicy>`.
pub trait ConvergencePolicy: Send + Sync {
    fn evaluate(&self, state: &ArtifactState) -> Convergence;

    fn describe(&self) -> String;

    /// Cycles the engine allows before treating the policy as stuck.
    /// Must be at least the number of cycles the policy needs to reach `Done`.
    fn max_cycles(&self) -> u32 {
        DEFAULT_MAX_CYCLES
    }
}

/// Stops once `iteration >= max_iterations`. Ignores feedback content.
#[derive(Debug, Clone, Copy)]
pub struct FixedIterationPolicy {
    max_iterations: u32,
}

impl FixedIterationPolicy {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }
}

impl Default for FixedIterationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl ConvergencePolicy for FixedIterationPolicy {
    fn evaluate(&self, state: &ArtifactState) -> Convergence {
        if state.iteration() >= self.max_iterations {
            Convergence::Done
        } else {
            Convergence::Running
        }
    }

    fn describe(&self) -> String {
        format!("fixed-iterations(max={})", self.max_iterations)
    }

    /// Each cycle completes exactly one revision, so `max_iterations` cycles always suffice.
    fn max_cycles(&self) -> u32 {
        self.max_iterations.max(1)
    }
}
