use async_trait::async_trait;
use orch_installer_config::{Config, RuntimeState};
use orch_installer_core::{
    CancellationToken, Stage, StageError, StatePersister, Step, StepError, StepStage,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared, ordered log of every phase call.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
    post_errors: Arc<Mutex<HashMap<String, Option<StepError>>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// `prev_err` the post phase of `step` received.
    pub fn post_error(&self, step: &str) -> Option<StepError> {
        self.post_errors
            .lock()
            .unwrap()
            .get(step)
            .cloned()
            .flatten()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[allow(dead_code)]
pub enum Phase {
    Config,
    Pre,
    Run,
    Post,
}

/// Step that records its phases and can be told to fail one of them.
pub struct MockStep {
    name: String,
    labels: Vec<String>,
    recorder: Recorder,
    fail: Option<(Phase, StepError)>,
    swallow_in_post: bool,
    update: Option<(Phase, RuntimeState)>,
}

#[allow(dead_code)]
impl MockStep {
    pub fn new(name: &str, labels: &[&str], recorder: &Recorder) -> Self {
        Self {
            name: name.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            recorder: recorder.clone(),
            fail: None,
            swallow_in_post: false,
            update: None,
        }
    }

    pub fn failing(mut self, phase: Phase, err: StepError) -> Self {
        self.fail = Some((phase, err));
        self
    }

    /// Post returns `Ok` even when an earlier phase failed.
    pub fn swallowing(mut self) -> Self {
        self.swallow_in_post = true;
        self
    }

    pub fn returning(mut self, phase: Phase, update: RuntimeState) -> Self {
        self.update = Some((phase, update));
        self
    }

    pub fn boxed(self) -> Box<dyn Step> {
        Box::new(self)
    }

    fn phase(&self, phase: Phase, tag: &str) -> Result<RuntimeState, StepError> {
        self.recorder.record(format!("{}.{tag}", self.name));
        if let Some((failing, err)) = &self.fail {
            if *failing == phase {
                return Err(err.clone());
            }
        }
        match &self.update {
            Some((p, update)) if *p == phase => Ok(update.clone()),
            _ => Ok(RuntimeState::default()),
        }
    }
}

#[async_trait]
impl Step for MockStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    async fn config_step(
        &mut self,
        _ctx: &CancellationToken,
        _config: &Config,
        _rs: &RuntimeState,
    ) -> Result<RuntimeState, StepError> {
        self.phase(Phase::Config, "config")
    }

    async fn pre_step(
        &mut self,
        _ctx: &CancellationToken,
        _config: &Config,
        _rs: &RuntimeState,
    ) -> Result<RuntimeState, StepError> {
        self.phase(Phase::Pre, "pre")
    }

    async fn run_step(
        &mut self,
        _ctx: &CancellationToken,
        _config: &Config,
        _rs: &RuntimeState,
    ) -> Result<RuntimeState, StepError> {
        self.phase(Phase::Run, "run")
    }

    async fn post_step(
        &mut self,
        _ctx: &CancellationToken,
        _config: &Config,
        _rs: &RuntimeState,
        prev_err: Option<StepError>,
    ) -> Result<RuntimeState, StepError> {
        self.recorder
            .post_errors
            .lock()
            .unwrap()
            .insert(self.name.clone(), prev_err.clone());
        let update = self.phase(Phase::Post, "post")?;
        match prev_err {
            Some(err) if !self.swallow_in_post => Err(err),
            _ => Ok(update),
        }
    }
}

/// Persister that keeps every written state in memory and can start failing
/// after a number of successful writes.
#[derive(Clone, Default)]
pub struct MemoryPersister {
    writes: Arc<Mutex<Vec<RuntimeState>>>,
    attempts: Arc<AtomicUsize>,
    fail_after: Option<usize>,
}

#[allow(dead_code)]
impl MemoryPersister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<RuntimeState> {
        self.writes.lock().unwrap().clone()
    }

    pub fn arc(&self) -> Arc<dyn StatePersister> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl StatePersister for MemoryPersister {
    async fn persist(&self, _config: &Config, rs: &RuntimeState) -> Result<(), StepError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|n| attempt >= n) {
            return Err(StepError::persistence("bucket unreachable"));
        }
        self.writes.lock().unwrap().push(rs.clone());
        Ok(())
    }
}

#[allow(dead_code)]
pub fn stage(name: &str, steps: Vec<Box<dyn Step>>, persister: &MemoryPersister) -> Box<dyn Stage> {
    Box::new(StepStage::new(name, steps, persister.arc()))
}

/// Stage that only records that it ran, optionally cancelling the installer
/// or failing.
#[allow(dead_code)]
pub struct RecordingStage {
    pub name: String,
    pub labels: Vec<String>,
    pub recorder: Recorder,
    pub on_run: Option<Box<dyn Fn() + Send>>,
    pub fail: Option<StageError>,
}

#[allow(dead_code)]
impl RecordingStage {
    pub fn new(name: &str, recorder: &Recorder) -> Self {
        Self {
            name: name.to_string(),
            labels: Vec::new(),
            recorder: recorder.clone(),
            on_run: None,
            fail: None,
        }
    }

    pub fn boxed(self) -> Box<dyn Stage> {
        Box::new(self)
    }
}

#[async_trait]
impl Stage for RecordingStage {
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
        self.recorder.record(format!("{}.pre_stage", self.name));
        Ok(())
    }

    async fn run_stage(
        &mut self,
        _ctx: &CancellationToken,
        _config: &Config,
        _rs: &mut RuntimeState,
    ) -> Result<(), StageError> {
        self.recorder.record(format!("{}.run_stage", self.name));
        if let Some(hook) = &self.on_run {
            hook();
        }
        match &self.fail {
            Some(err) => Err(err.clone()),
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
        self.recorder.record(format!("{}.post_stage", self.name));
        match prev {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
