//! Workflow Engine: walks the stage graph from Initialize to convergence.
//!
//! Graph (one back-edge, taken only at the checkpoint after ReviseCv):
//!
//! ```text
//! Initialize → CritiqueCoverLetter → ReviseCoverLetter → CritiqueCv → ReviseCv ─┐
//!                      ▲                                                        │
//!                      └──────────── Running ◄── policy ──► Done → finalize ◄───┘
//! ```
//!
//! A run is single-shot: no pause, no resume, no retries. Any stage failure aborts the
//! run and nothing is returned.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::documents::{render_cover_letter, render_document, CvFormat, RenderedDocument};
use crate::errors::AppError;
use crate::llm_client::ModelRoles;
use crate::refinement::policy::{Convergence, ConvergencePolicy};
use crate::refinement::stages;
use crate::refinement::state::{ArtifactState, RunInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Initialize,
    CritiqueCoverLetter,
    ReviseCoverLetter,
    CritiqueCv,
    ReviseCv,
}

/// Outgoing edge of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Unconditional.
    To(Stage),
    /// Ask the convergence policy: `Running` → `Stage::CYCLE_START`, `Done` → finalize.
    Checkpoint,
}

impl Stage {
    pub const ENTRY: Stage = Stage::Initialize;
    pub const CYCLE_START: Stage = Stage::CritiqueCoverLetter;

    /// The transition table.
    pub fn edge(self) -> Edge {
        match self {
            Stage::Initialize => Edge::To(Stage::CritiqueCoverLetter),
            Stage::CritiqueCoverLetter => Edge::To(Stage::ReviseCoverLetter),
            Stage::ReviseCoverLetter => Edge::To(Stage::CritiqueCv),
            Stage::CritiqueCv => Edge::To(Stage::ReviseCv),
            Stage::ReviseCv => Edge::Checkpoint,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Initialize => "initialize",
            Stage::CritiqueCoverLetter => "critique-cover-letter",
            Stage::ReviseCoverLetter => "revise-cover-letter",
            Stage::CritiqueCv => "critique-cv",
            Stage::ReviseCv => "revise-cv",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final output of a successful run.
#[derive(Debug, Clone)]
pub struct RefinedArtifacts {
    pub run_id: Uuid,
    pub cover_letter: String,
    pub cv: String,
    pub cv_format: CvFormat,
    pub cv_filename: String,
    pub iterations: u32,
}

impl RefinedArtifacts {
    pub fn render_cover_letter(&self) -> Result<RenderedDocument, AppError> {
        render_cover_letter(&self.cover_letter)
    }

    /// Rendered in the format the CV was uploaded in.
    pub fn render_cv(&self) -> Result<RenderedDocument, AppError> {
        render_document(&self.cv, self.cv_format, &self.cv_filename)
    }
}

/// Stateless between runs: safe to share behind an `Arc` and drive concurrently.
pub struct WorkflowEngine {
    models: ModelRoles,
    policy: Arc<dyn ConvergencePolicy>,
}

impl WorkflowEngine {
    pub fn new(models: ModelRoles, policy: Arc<dyn ConvergencePolicy>) -> Self {
        Self { models, policy }
    }

    pub fn policy(&self) -> &dyn ConvergencePolicy {
        self.policy.as_ref()
    }

    /// Runs one refinement from validated inputs to final artifacts.
    pub async fn run(&self, input: RunInput) -> Result<RefinedArtifacts, AppError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("refinement_run", %run_id);

        async move {
            let mut state = ArtifactState::from_input(input)?;
            info!(
                "Starting refinement: cv_format={}, policy={}",
                state.source_cv_format(),
                self.policy.describe()
            );

            let path = self.drive(&mut state).await?;

            let (cover_letter, cv) = match (state.cover_letter_final(), state.cv_final()) {
                (Some(letter), Some(cv)) => (letter.to_string(), cv.to_string()),
                _ => {
                    return Err(AppError::Internal(anyhow!(
                        "run {run_id} ended without final artifacts"
                    )))
                }
            };

            info!(
                "Refinement finished: iterations={}, stages_executed={}",
                state.iteration(),
                path.len()
            );

            Ok(RefinedArtifacts {
                run_id,
                cover_letter,
                cv,
                cv_format: state.source_cv_format(),
                cv_filename: state.source_cv_filename().to_string(),
                iterations: state.iteration(),
            })
        }
        .instrument(span)
        .await
    }

    /// Walks the graph from `Stage::ENTRY` until the policy says `Done`, then finalizes.
    /// Returns the stages in execution order.
    pub(crate) async fn drive(&self, state: &mut ArtifactState) -> Result<Vec<Stage>, AppError> {
        let mut path = Vec::new();
        let mut cycles = 0u32;
        let mut stage = Stage::ENTRY;

        loop {
            self.execute(stage, state).await?;
            path.push(stage);

            stage = match stage.edge() {
                Edge::To(next) => next,
                Edge::Checkpoint => {
                    cycles += 1;
                    match self.policy.evaluate(state) {
                        Convergence::Done => {
                            state.finalize();
                            info!("Converged after {cycles} cycle(s)");
                            return Ok(path);
                        }
                        // A policy that never converges is a bug: fail instead of looping forever.
                        Convergence::Running if cycles >= self.policy.max_cycles() => {
                            return Err(AppError::Internal(anyhow!(
                                "convergence policy {} did not converge within {} cycles",
                                self.policy.describe(),
                                self.policy.max_cycles()
                            )));
                        }
                        Convergence::Running => Stage::CYCLE_START,
                    }
                }
            };
        }
    }

    async fn execute(&self, stage: Stage, state: &mut ArtifactState) -> Result<(), AppError> {
        info!("Stage {stage} (iteration {})", state.iteration());
        match stage {
            Stage::Initialize => stages::initialize(&self.models, state).await,
            Stage::CritiqueCoverLetter => stages::critique_cover_letter(&self.models, state).await,
            Stage::ReviseCoverLetter => stages::revise_cover_letter(&self.models, state).await,
            Stage::CritiqueCv => stages::critique_cv(&self.models, state).await,
            Stage::ReviseCv => stages::revise_cv(&self.models, state).await,
        }
    }
}
