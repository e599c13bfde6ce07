/// Compile-then-run pipeline with type-state enforcement
///
/// A `Pipeline<Materialized>` can only be compiled; only the
/// `Pipeline<Compiled>` it yields can be run. A failed compile ends the
/// pipeline with a result, so a run step never sees a missing artifact.
/// Compiler diagnostics and step timings of a successful compile travel
/// with the pipeline into the final result.
use crate::config::settings::StageLimits;
use crate::config::types::Result;
use crate::exec::process::{self, SpawnOutcome, StageCommand};
use crate::judge::{CommandTemplate, CompilationUnit, LanguagePlan, Toolchain};
use crate::verdict::{
    ExecutionResult, ResultKind, Stage, StageReport, StageTiming, VerdictClassifier,
};
use std::marker::PhantomData;
use std::time::Duration;

/// Source written, nothing built yet
pub struct Materialized;

/// Ready to run
pub struct Compiled;

pub struct Pipeline<'a, S> {
    plan: &'a LanguagePlan,
    unit: &'a CompilationUnit,
    toolchain: &'a Toolchain,
    limits: StageLimits,
    timings: Vec<StageTiming>,
    compile_stderr: String,
    _state: PhantomData<S>,
}

/// Outcome of a step that may end the pipeline early
pub enum Step<T> {
    Continue(T),
    Done(ExecutionResult),
}

impl<'a> Pipeline<'a, Materialized> {
    pub fn new(
        plan: &'a LanguagePlan,
        unit: &'a CompilationUnit,
        toolchain: &'a Toolchain,
        limits: StageLimits,
    ) -> Self {
        Self {
            plan,
            unit,
            toolchain,
            limits,
            timings: Vec::new(),
            compile_stderr: String::new(),
            _state: PhantomData,
        }
    }

    /// Run the compile step, if the plan has one.
    pub fn compile(mut self) -> Result<Step<Pipeline<'a, Compiled>>> {
        let Some(template) = self.plan.compile_command() else {
            return Ok(Step::Continue(self.advance()));
        };

        let result = self.run_step(Stage::Compile, template, None, self.limits.compile_timeout)?;
        if result.kind != ResultKind::Success {
            log::debug!("{} compile step ended with {}", self.plan.id(), result.kind);
            return Ok(Step::Done(result));
        }
        if !result.stderr.trim().is_empty() {
            log::debug!("{} compiler emitted warnings", self.plan.id());
        }
        self.timings = result.timings;
        self.compile_stderr = result.stderr;
        Ok(Step::Continue(self.advance()))
    }

    fn advance(self) -> Pipeline<'a, Compiled> {
        Pipeline {
            plan: self.plan,
            unit: self.unit,
            toolchain: self.toolchain,
            limits: self.limits,
            timings: self.timings,
            compile_stderr: self.compile_stderr,
            _state: PhantomData,
        }
    }
}

impl<'a> Pipeline<'a, Compiled> {
    /// Run the program, feeding `stdin` if given.
    pub fn run(self, stdin: Option<&str>) -> Result<ExecutionResult> {
        let mut result = self.run_step(
            Stage::Run,
            self.plan.run_command(),
            stdin,
            self.limits.run_timeout,
        )?;

        let mut timings = self.timings;
        timings.append(&mut result.timings);
        result.timings = timings;
        result.compile_stderr = self.compile_stderr;
        Ok(result)
    }
}

impl<'a, S> Pipeline<'a, S> {
    fn run_step(
        &self,
        stage: Stage,
        template: &CommandTemplate,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let mut argv = template.expand(self.unit).into_iter();
        let program = argv.next().unwrap_or_default();

        let Some(resolved) = self.toolchain.resolve(&program) else {
            log::info!("{} step: '{}' not found on search path", stage, program);
            return Ok(VerdictClassifier::classify(
                stage,
                StageReport {
                    tool_missing: Some(program),
                    limit: timeout,
                    ..Default::default()
                },
            ));
        };

        let cmd = StageCommand {
            program: resolved,
            args: argv.collect(),
            workdir: self.unit.workdir().to_path_buf(),
            stdin: stdin.map(str::to_string),
            search_path: self.toolchain.search_path().to_os_string(),
            timeout,
            kill_grace: self.limits.kill_grace,
            drain_timeout: self.limits.drain_timeout,
        };

        let report = match process::run_stage(&cmd)? {
            SpawnOutcome::NotLaunched(e) => {
                log::info!("{} step: failed to launch '{}': {}", stage, program, e);
                StageReport {
                    tool_missing: Some(program),
                    limit: timeout,
                    ..Default::default()
                }
            }
            SpawnOutcome::Finished(output) => StageReport {
                exit_code: output.exit_code,
                signal: output.signal,
                stdout: output.stdout,
                stderr: output.stderr,
                timed_out: output.timed_out,
                tool_missing: None,
                output_truncated: !output.output_complete,
                limit: timeout,
                elapsed: output.elapsed,
            },
        };

        let spawned = report.tool_missing.is_none();
        let elapsed_ms = report.elapsed.as_millis() as u64;
        let mut result = VerdictClassifier::classify(stage, report);
        if spawned {
            result.timings.push(StageTiming { stage, elapsed_ms });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::{materialize, SourceNaming};

    fn limits(timeout: Duration) -> StageLimits {
        StageLimits {
            compile_timeout: timeout,
            run_timeout: timeout,
            kill_grace: Duration::from_millis(100),
            drain_timeout: Duration::from_secs(2),
        }
    }

    fn shell_compiled() -> LanguagePlan {
        LanguagePlan::compiled(
            "shellc",
            SourceNaming::Fixed("solution.sh"),
            "sh",
            CommandTemplate::new(["sh", "-c", "sh -n {source} && cp {source} {artifact}"]),
            CommandTemplate::new(["sh", "{artifact}"]),
        )
    }

    fn run_all(plan: &LanguagePlan, code: &str, stdin: Option<&str>) -> ExecutionResult {
        let dir = tempfile::tempdir().unwrap();
        let unit = materialize(plan, dir.path(), code).unwrap();
        let toolchain = Toolchain::from_host();
        let pipeline = Pipeline::new(plan, &unit, &toolchain, limits(Duration::from_secs(5)));
        match pipeline.compile().unwrap() {
            Step::Done(result) => result,
            Step::Continue(compiled) => compiled.run(stdin).unwrap(),
        }
    }

    #[test]
    fn compiled_plan_runs_artifact() {
        let result = run_all(&shell_compiled(), "read name\necho \"hi $name\"\n", Some("bob\n"));
        assert_eq!(result.kind, ResultKind::Success);
        assert_eq!(result.payload, "hi bob");
        assert_eq!(result.stage, Some(Stage::Run));
    }

    #[test]
    fn compile_step_carries_warnings_and_timing_into_run() {
        let plan = LanguagePlan::compiled(
            "noisyc",
            SourceNaming::Fixed("solution.sh"),
            "sh",
            CommandTemplate::new([
                "sh",
                "-c",
                "echo 'warning: shadowed name' >&2; cp {source} {artifact}",
            ]),
            CommandTemplate::new(["sh", "{artifact}"]),
        );
        let result = run_all(&plan, "echo 7\n", None);
        assert_eq!(result.kind, ResultKind::Success);
        assert_eq!(result.stderr, "");
        assert_eq!(result.compile_stderr, "warning: shadowed name\n");
        assert_eq!(
            result.render(),
            "Code executed successfully.\nOutput:\n7\nWarnings:\nwarning: shadowed name"
        );

        let stages: Vec<Stage> = result.timings.iter().map(|t| t.stage).collect();
        assert_eq!(stages, vec![Stage::Compile, Stage::Run]);
    }

    #[test]
    fn compile_failure_stops_before_run() {
        let dir = tempfile::tempdir().unwrap();
        let plan = shell_compiled();
        let unit = materialize(&plan, dir.path(), "if then fi (\n").unwrap();
        let toolchain = Toolchain::from_host();
        let pipeline = Pipeline::new(&plan, &unit, &toolchain, limits(Duration::from_secs(5)));

        match pipeline.compile().unwrap() {
            Step::Done(result) => {
                assert_eq!(result.kind, ResultKind::CompileError);
                assert_eq!(result.stage, Some(Stage::Compile));
                assert!(!result.payload.is_empty());
            }
            Step::Continue(_) => panic!("syntax error must end the pipeline"),
        }
        assert!(!unit.artifact_path().exists());
    }

    #[test]
    fn unresolvable_tool_is_reported_without_spawning() {
        let plan = LanguagePlan::interpreted(
            "ghost",
            SourceNaming::Fixed("main.gh"),
            "gh",
            CommandTemplate::new(["ghost-interpreter-that-does-not-exist", "{source}"]),
        );
        let result = run_all(&plan, "print 1", None);
        assert_eq!(result.kind, ResultKind::ToolMissing);
        assert_eq!(result.tool.as_deref(), Some("ghost-interpreter-that-does-not-exist"));
        assert_eq!(result.stage, Some(Stage::Run));
        assert!(result.timings.is_empty());
    }

    #[test]
    fn compile_timeout_is_reported_for_compile_stage() {
        let dir = tempfile::tempdir().unwrap();
        let plan = LanguagePlan::compiled(
            "slowc",
            SourceNaming::Fixed("main.slow"),
            "slow",
            CommandTemplate::new(["sh", "-c", "sleep 30"]),
            CommandTemplate::new(["sh", "{artifact}"]),
        );
        let unit = materialize(&plan, dir.path(), "anything").unwrap();
        let toolchain = Toolchain::from_host();
        let pipeline = Pipeline::new(&plan, &unit, &toolchain, limits(Duration::from_millis(300)));

        match pipeline.compile().unwrap() {
            Step::Done(result) => {
                assert_eq!(result.kind, ResultKind::Timeout);
                assert_eq!(result.stage, Some(Stage::Compile));
            }
            Step::Continue(_) => panic!("compile step should have timed out"),
        }
    }
}
