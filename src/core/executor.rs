/// Execution façade
///
/// Validates a request, resolves its language plan, allocates a workspace,
/// drives the compile/run pipeline, and releases the workspace on every
/// path. Safe to share across threads; each call owns its own workspace
/// and child processes.
use crate::config::settings::ExecutorConfig;
use crate::config::types::{CodeboxError, Result};
use crate::core::types::{fingerprint, ExecutionRequest};
use crate::exec::{Pipeline, Step};
use crate::judge::toolchain::LanguageStatus;
use crate::judge::{materialize, LanguagePlan, MaterializeError, PlanRegistry, Toolchain};
use crate::observability::ExecutionMetrics;
use crate::safety::{Workspace, WorkspaceManager};
use crate::verdict::ExecutionResult;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub struct Executor {
    registry: Arc<PlanRegistry>,
    workspaces: WorkspaceManager,
    toolchain: Toolchain,
    config: ExecutorConfig,
    metrics: Arc<ExecutionMetrics>,
}

impl Executor {
    /// Executor over the built-in languages.
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(PlanRegistry::builtin()))
    }

    pub fn with_registry(config: ExecutorConfig, registry: Arc<PlanRegistry>) -> Result<Self> {
        config.validate()?;
        let workspaces = WorkspaceManager::new(config.workspace_root())?;
        let toolchain = Toolchain::new(config.toolchain_path());
        log::debug!(
            "Executor ready: {} languages, workspace root {}",
            registry.len(),
            workspaces.root().display()
        );

        Ok(Self {
            registry,
            workspaces,
            toolchain,
            config,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Share a metrics registry with other executors.
    pub fn with_metrics(mut self, metrics: Arc<ExecutionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &PlanRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ExecutionMetrics> {
        &self.metrics
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Run `code` as `language`, feeding `stdin` if given.
    ///
    /// Every expected failure (bad input, missing tools, compile and runtime
    /// errors, timeouts) is an `Ok` result. `Err` is reserved for faults of
    /// the executor itself, such as an unwritable workspace root.
    pub fn execute(
        &self,
        language: &str,
        code: &str,
        stdin: Option<&str>,
    ) -> Result<ExecutionResult> {
        let started = Instant::now();
        let _in_flight = self.metrics.track_in_flight();

        let outcome = self.execute_inner(language, code, stdin);
        if let Ok(result) = &outcome {
            self.metrics.record_result(result.kind, started.elapsed());
        }
        outcome.map(|mut result| {
            result.elapsed_ms = started.elapsed().as_millis() as u64;
            result
        })
    }

    pub fn execute_request(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        self.execute(&request.language, &request.code, request.stdin.as_deref())
    }

    /// Execute independent requests concurrently.
    ///
    /// Results come back in request order.
    pub fn execute_all(&self, requests: &[ExecutionRequest]) -> Vec<Result<ExecutionResult>> {
        thread::scope(|scope| {
            let handles: Vec<_> = requests
                .iter()
                .map(|request| scope.spawn(move || self.execute_request(request)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(CodeboxError::Process(
                            "execution worker panicked".to_string(),
                        ))
                    })
                })
                .collect()
        })
    }

    /// Probe every registered language's toolchain.
    pub fn check_toolchains(&self) -> Vec<LanguageStatus> {
        self.toolchain.check_all(&self.registry)
    }

    /// Remove workspaces left behind by crashed processes.
    pub fn sweep_stale(&self, max_age: Duration) -> Result<usize> {
        self.workspaces.sweep_stale(max_age)
    }

    fn execute_inner(
        &self,
        language: &str,
        code: &str,
        stdin: Option<&str>,
    ) -> Result<ExecutionResult> {
        if language.trim().is_empty() {
            return Ok(ExecutionResult::invalid_input("language must not be empty"));
        }

        let Some(plan) = self.registry.resolve(language) else {
            log::info!("Rejected unsupported language '{}'", language.trim());
            return Ok(ExecutionResult::unsupported_language(
                language,
                &self.registry.languages(),
            ));
        };

        if code.trim().is_empty() {
            return Ok(ExecutionResult::invalid_input("code must not be empty"));
        }

        let workspace = self.workspaces.acquire()?;
        log::info!(
            "Run {}: language={} code={}",
            workspace.run_id(),
            plan.id(),
            fingerprint(code)
        );

        let outcome = self.run_in_workspace(plan, &workspace, code, stdin);

        let run_id = workspace.run_id().to_string();
        let removed = workspace.release();
        self.metrics.record_cleanup(removed);

        match &outcome {
            Ok(result) => log::info!(
                "Run {}: {} in {}ms",
                run_id,
                result.kind,
                result.elapsed_ms
            ),
            Err(e) => log::error!("Run {}: executor fault: {}", run_id, e),
        }
        outcome
    }

    fn run_in_workspace(
        &self,
        plan: &LanguagePlan,
        workspace: &Workspace,
        code: &str,
        stdin: Option<&str>,
    ) -> Result<ExecutionResult> {
        let unit = match materialize(plan, workspace.path(), code) {
            Ok(unit) => unit,
            Err(MaterializeError::Rejected(reason)) => {
                log::info!("Run {}: source rejected: {}", workspace.run_id(), reason);
                return Ok(ExecutionResult::rejected_source(reason));
            }
            Err(MaterializeError::Io(e)) => return Err(CodeboxError::Io(e)),
        };

        let limits = self.config.limits_for(plan.id());
        let pipeline = Pipeline::new(plan, &unit, &self.toolchain, limits);

        let result = match pipeline.compile()? {
            Step::Done(result) => result,
            Step::Continue(compiled) => compiled.run(stdin)?,
        };

        for timing in &result.timings {
            self.metrics
                .record_stage(timing.stage, Duration::from_millis(timing.elapsed_ms));
        }
        Ok(result)
    }
}
