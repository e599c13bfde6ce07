/// Result classification
///
/// Maps the raw outcome of a pipeline stage to exactly one result kind.
/// Pure over its input: no I/O, no clocks.
use crate::verdict::result::{describe_signal, ExecutionResult, ResultKind, Stage};
use std::time::Duration;

/// Raw evidence gathered from one stage
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Stage was stopped for exceeding its bound
    pub timed_out: bool,
    /// Executable that could not be resolved or launched
    pub tool_missing: Option<String>,
    /// An output stream did not reach EOF before the drain deadline
    pub output_truncated: bool,
    /// Bound applied to the stage
    pub limit: Duration,
    pub elapsed: Duration,
}

pub struct VerdictClassifier;

impl VerdictClassifier {
    /// Classify a stage outcome.
    ///
    /// Precedence: ToolMissing, then Timeout, then a failed exit, then Success.
    pub fn classify(stage: Stage, report: StageReport) -> ExecutionResult {
        if let Some(tool) = report.tool_missing.clone() {
            return Self::classify_tool_missing(stage, report, tool);
        }

        if report.timed_out {
            return Self::classify_timeout(stage, report);
        }

        if report.exit_code == Some(0) && report.signal.is_none() {
            return Self::classify_ok(stage, report);
        }

        match stage {
            Stage::Compile => Self::classify_compile_error(report),
            Stage::Run => Self::classify_runtime_error(report),
        }
    }

    fn classify_tool_missing(stage: Stage, report: StageReport, tool: String) -> ExecutionResult {
        let payload = format!(
            "Error: '{}' was not found. Make sure the required interpreter or compiler is installed and available in your PATH.",
            tool
        );
        let mut result = Self::with_evidence(ResultKind::ToolMissing, stage, payload, report);
        result.tool = Some(tool);
        result
    }

    fn classify_timeout(stage: Stage, report: StageReport) -> ExecutionResult {
        let limit = report.limit;
        let payload = format!(
            "Time Limit Exceeded: {} step exceeded {}",
            stage,
            format_limit(limit)
        );
        let mut result = Self::with_evidence(ResultKind::Timeout, stage, payload, report);
        result.timeout_ms = Some(limit.as_millis() as u64);
        result
    }

    fn classify_ok(stage: Stage, report: StageReport) -> ExecutionResult {
        let payload = report.stdout.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string();
        Self::with_evidence(ResultKind::Success, stage, payload, report)
    }

    fn classify_compile_error(report: StageReport) -> ExecutionResult {
        // Some compilers write diagnostics to stdout only.
        let payload = if !report.stderr.trim().is_empty() {
            report.stderr.clone()
        } else if !report.stdout.trim().is_empty() {
            report.stdout.clone()
        } else {
            exit_description(&report)
        };
        Self::with_evidence(ResultKind::CompileError, Stage::Compile, payload, report)
    }

    fn classify_runtime_error(report: StageReport) -> ExecutionResult {
        let payload = if report.stderr.trim().is_empty() {
            exit_description(&report)
        } else {
            report.stderr.clone()
        };
        Self::with_evidence(ResultKind::RuntimeError, Stage::Run, payload, report)
    }

    fn with_evidence(
        kind: ResultKind,
        stage: Stage,
        payload: String,
        report: StageReport,
    ) -> ExecutionResult {
        let mut result = ExecutionResult::from_stage(kind, stage, payload);
        result.stdout = report.stdout;
        result.stderr = report.stderr;
        result.output_truncated = report.output_truncated;
        result.exit_code = report.exit_code;
        result.signal = report.signal;
        result.elapsed_ms = report.elapsed.as_millis() as u64;
        result
    }
}

fn exit_description(report: &StageReport) -> String {
    match (report.signal, report.exit_code) {
        (Some(signal), _) => describe_signal(signal),
        (None, Some(code)) => format!("process exited with status {}", code),
        (None, None) => "process exited abnormally".to_string(),
    }
}

fn format_limit(limit: Duration) -> String {
    if limit.subsec_millis() == 0 {
        format!("{}s", limit.as_secs())
    } else {
        format!("{}ms", limit.as_millis())
    }
}
