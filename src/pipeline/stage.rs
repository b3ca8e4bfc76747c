//! Stages and the pipeline that runs them in order

use crate::crawler::ProcessingContext;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Terminal result of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
    /// The task is fully processed
    Done,

    /// Continue processing the same task with the route of this id
    Route(String),
}

/// What a stage tells the pipeline after it ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Run the next stage
    Continue,

    /// Stop here with the given result
    Finish(PipelineResult),
}

/// One step of a pipeline
///
/// Stages may fail with any error; the engine hands it to the retry policy.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Identifier recorded in retries and dead letters
    fn id(&self) -> &str;

    async fn process(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StageOutcome>;
}

/// A stage error together with the stage that raised it
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage_id: String,
    pub error: anyhow::Error,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} failed: {}", self.stage_id, self.error)
    }
}

/// Ordered list of stages
///
/// Running past the last stage without a [`StageOutcome::Finish`] counts as
/// [`PipelineResult::Done`].
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage
    pub fn then(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage in order against `ctx`
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineResult)` - The first `Finish` result, or `Done`
    /// * `Err(PipelineFailure)` - The first stage error
    pub async fn execute(
        &self,
        ctx: &mut ProcessingContext,
    ) -> Result<PipelineResult, PipelineFailure> {
        for stage in &self.stages {
            ctx.set_stage(Some(stage.id()));
            tracing::trace!("Stage {} on {}", stage.id(), ctx.task().url());

            match stage.process(ctx).await {
                Ok(StageOutcome::Continue) => {}
                Ok(StageOutcome::Finish(result)) => return Ok(result),
                Err(error) => {
                    return Err(PipelineFailure {
                        stage_id: stage.id().to_string(),
                        error,
                    })
                }
            }
        }

        Ok(PipelineResult::Done)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| s.id()))
            .finish()
    }
}
