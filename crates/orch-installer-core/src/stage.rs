//! Stages: named, ordered groups of steps

use crate::error::{ErrorKind, StageError, StepError};
use crate::label::{Labeled, filter_by_labels};
use crate::persister::StatePersister;
use crate::step::Step;
use async_trait::async_trait;
use orch_installer_config::{Config, RuntimeState, merge_runtime_state};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Stage: Send {
    fn name(&self) -> &str;

    fn labels(&self) -> &[String];

    async fn pre_stage(
        &mut self,
        ctx: &CancellationToken,
        config: &Config,
        rs: &mut RuntimeState,
    ) -> Result<(), StageError>;

    async fn run_stage(
        &mut self,
        ctx: &CancellationToken,
        config: &Config,
        rs: &mut RuntimeState,
    ) -> Result<(), StageError>;

    /// Always invoked after `pre_stage`, with the error from `pre_stage` or
    /// `run_stage` if either failed.
    async fn post_stage(
        &mut self,
        ctx: &CancellationToken,
        config: &Config,
        rs: &mut RuntimeState,
        prev: Option<StageError>,
    ) -> Result<(), StageError>;
}

impl Labeled for dyn Stage {
    fn labels(&self) -> &[String] {
        Stage::labels(self)
    }
}

/// Stage that runs the four step phases for each of its steps, merging and
/// persisting the runtime state after every phase.
///
/// Step errors never abort the stage; every entered step sees its
/// `post_step`. A failed state write does: the current step still gets its
/// `post_step`, then no further step starts.
pub struct StepStage {
    name: String,
    labels: Vec<String>,
    steps: Vec<Box<dyn Step>>,
    persister: Arc<dyn StatePersister>,
}

impl StepStage {
    /// The stage is labeled with the union of its step labels so step-level
    /// targeting reaches it.
    pub fn new(
        name: impl Into<String>,
        steps: Vec<Box<dyn Step>>,
        persister: Arc<dyn StatePersister>,
    ) -> Self {
        let mut labels: Vec<String> = steps
            .iter()
            .flat_map(|step| Step::labels(step.as_ref()).iter().cloned())
            .collect();
        labels.sort();
        labels.dedup();
        Self {
            name: name.into(),
            labels,
            steps,
            persister,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for label in labels {
            let label = label.into();
            if !self.labels.contains(&label) {
                self.labels.push(label);
            }
        }
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }
}

/// Merge a phase result into the runtime state. The action is fixed by the
/// installer before any stage runs, so whatever a step returns for it is
/// dropped.
fn merge_update(rs: &mut RuntimeState, update: &RuntimeState) -> Result<(), StepError> {
    let action = std::mem::take(&mut rs.action);
    let merged = merge_runtime_state(rs, update)
        .map_err(|e| StepError::internal(format!("failed to update runtime state: {e}")));
    if !update.action.is_empty() && update.action != action {
        tracing::warn!(
            "Ignoring action {} returned by a step, keeping {action}",
            update.action
        );
    }
    rs.action = action;
    merged
}

/// Merge a phase result into the runtime state and persist it.
async fn commit(
    persister: &dyn StatePersister,
    config: &Config,
    rs: &mut RuntimeState,
    update: &RuntimeState,
) -> Result<(), StepError> {
    merge_update(rs, update)?;
    persister.persist(config, rs).await
}

#[async_trait]
impl Stage for StepStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    async fn pre_stage(
        &mut self,
        _ctx: &CancellationToken,
        _config: &Config,
        _rs: &mut RuntimeState,
    ) -> Result<(), StageError> {
        Ok(())
    }

    async fn run_stage(
        &mut self,
        ctx: &CancellationToken,
        config: &Config,
        rs: &mut RuntimeState,
    ) -> Result<(), StageError> {
        let persister = Arc::clone(&self.persister);
        let steps = filter_by_labels(self.steps.iter_mut(), &config.advanced.target_labels);
        if steps.is_empty() {
            tracing::debug!("No steps selected in stage {}", self.name);
            return Ok(());
        }

        let mut step_errors = BTreeMap::new();
        let mut first_kind = None;

        for step in steps {
            let name = step.name().to_string();

            let prev_err = async {
                tracing::debug!("ConfigStep {name}");
                let update = step.config_step(ctx, config, rs).await?;
                commit(persister.as_ref(), config, rs, &update).await?;

                tracing::debug!("PreStep {name}");
                let update = step.pre_step(ctx, config, rs).await?;
                commit(persister.as_ref(), config, rs, &update).await?;

                tracing::debug!("RunStep {name}");
                let update = step.run_step(ctx, config, rs).await?;
                commit(persister.as_ref(), config, rs, &update).await?;

                Ok::<(), StepError>(())
            }
            .await
            .err();

            let persist_failed = prev_err
                .as_ref()
                .is_some_and(|e| e.kind == ErrorKind::StatePersistenceFailed);

            tracing::debug!("PostStep {name}");
            let post_err = match step.post_step(ctx, config, rs, prev_err.clone()).await {
                Ok(update) if persist_failed => merge_update(rs, &update).err(),
                Ok(update) => match commit(persister.as_ref(), config, rs, &update).await {
                    Err(e) if e.kind == ErrorKind::StatePersistenceFailed => {
                        return Err(StageError::persistence(&name, e));
                    }
                    result => result.err(),
                },
                Err(e) => Some(e),
            };

            if let Some(err) = prev_err.filter(|_| persist_failed) {
                if let Some(post_err) = &post_err {
                    tracing::warn!("Step {name} post phase failed after state write failure: {post_err}");
                }
                return Err(StageError::persistence(&name, err));
            }

            if let Some(err) = post_err {
                tracing::warn!("Step {name} failed: {err}");
                first_kind.get_or_insert(err.kind);
                step_errors.insert(name, err);
            }
        }

        match first_kind {
            Some(kind) => Err(StageError::from_step_errors(kind, step_errors)),
            None => Ok(()),
        }
    }

    async fn post_stage(
        &mut self,
        _ctx: &CancellationToken,
        _config: &Config,
        _rs: &mut RuntimeState,
        prev: Option<StageError>,
    ) -> Result<(), StageError> {
        match prev {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
