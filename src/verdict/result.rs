use crate::judge::MaterializationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome category. Exactly one is assigned per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Success,
    CompileError,
    RuntimeError,
    ToolMissing,
    Timeout,
    UnsupportedLanguage,
    InvalidInput,
}

impl ResultKind {
    pub const ALL: [ResultKind; 7] = [
        ResultKind::Success,
        ResultKind::CompileError,
        ResultKind::RuntimeError,
        ResultKind::ToolMissing,
        ResultKind::Timeout,
        ResultKind::UnsupportedLanguage,
        ResultKind::InvalidInput,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Success => "success",
            ResultKind::CompileError => "compile_error",
            ResultKind::RuntimeError => "runtime_error",
            ResultKind::ToolMissing => "tool_missing",
            ResultKind::Timeout => "timeout",
            ResultKind::UnsupportedLanguage => "unsupported_language",
            ResultKind::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage a result was produced in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Compile,
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Compile => f.write_str("compile"),
            Stage::Run => f.write_str("run"),
        }
    }
}

/// Wall time of one step that launched a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed_ms: u64,
}

/// Result of one `execute` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub kind: ResultKind,
    /// Kind-specific text: program output, diagnostics, or a message
    pub payload: String,
    /// Stage that produced the result; `None` when rejected before any spawn
    pub stage: Option<Stage>,
    /// Full captured standard output of the deciding stage
    pub stdout: String,
    /// Full captured standard error of the deciding stage
    pub stderr: String,
    /// Diagnostics of a successful compile step that preceded the run
    pub compile_stderr: String,
    /// A stream was still held open after the drain deadline, so the
    /// captured output stops at what had arrived by then
    pub output_truncated: bool,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    /// Executable that could not be resolved (ToolMissing)
    pub tool: Option<String>,
    /// Bound that was exceeded (Timeout)
    pub timeout_ms: Option<u64>,
    /// Set when the source was rejected during materialization
    pub materialization: Option<MaterializationError>,
    /// Steps that spawned a process, in execution order
    pub timings: Vec<StageTiming>,
    pub elapsed_ms: u64,
}

impl ExecutionResult {
    fn message(kind: ResultKind, payload: String) -> Self {
        Self {
            kind,
            payload,
            stage: None,
            stdout: String::new(),
            stderr: String::new(),
            compile_stderr: String::new(),
            output_truncated: false,
            exit_code: None,
            signal: None,
            tool: None,
            timeout_ms: None,
            materialization: None,
            timings: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::message(ResultKind::InvalidInput, reason.into())
    }

    pub fn unsupported_language(language: &str, supported: &[&str]) -> Self {
        Self::message(
            ResultKind::UnsupportedLanguage,
            format!(
                "Unsupported language '{}'. Supported languages: {}",
                language.trim(),
                supported.join(", ")
            ),
        )
    }

    pub fn rejected_source(error: MaterializationError) -> Self {
        let mut result = Self::message(ResultKind::InvalidInput, error.to_string());
        result.materialization = Some(error);
        result
    }

    pub(crate) fn from_stage(kind: ResultKind, stage: Stage, payload: String) -> Self {
        let mut result = Self::message(kind, payload);
        result.stage = Some(stage);
        result
    }

    pub fn is_success(&self) -> bool {
        self.kind == ResultKind::Success
    }

    /// Canonical human-readable rendering.
    pub fn render(&self) -> String {
        let mut text = self.render_kind();
        if self.output_truncated {
            text.push_str(
                "\nNote: output may be incomplete; a background process kept the output streams open.",
            );
        }
        text
    }

    fn render_kind(&self) -> String {
        match self.kind {
            ResultKind::Success => {
                let mut text = format!("Code executed successfully.\nOutput:\n{}", self.payload);
                let warnings: Vec<&str> = [self.compile_stderr.trim_end(), self.stderr.trim_end()]
                    .into_iter()
                    .filter(|w| !w.is_empty())
                    .collect();
                if !warnings.is_empty() {
                    text.push_str("\nWarnings:\n");
                    text.push_str(&warnings.join("\n"));
                }
                text
            }
            ResultKind::CompileError => format!("Compilation Error:\n{}", self.payload),
            ResultKind::RuntimeError => {
                let mut text = format!("Runtime Error:\n{}", self.payload);
                if let (Some(signal), false) = (self.signal, self.stderr.trim().is_empty()) {
                    text.push_str(&format!("\n{}", describe_signal(signal)));
                }
                text
            }
            ResultKind::ToolMissing
            | ResultKind::Timeout
            | ResultKind::UnsupportedLanguage
            | ResultKind::InvalidInput => self.payload.clone(),
        }
    }
}

pub(crate) fn describe_signal(signal: i32) -> String {
    match nix::sys::signal::Signal::try_from(signal) {
        Ok(sig) => format!("terminated by signal {} ({})", signal, sig.as_str()),
        Err(_) => format!("terminated by signal {}", signal),
    }
}
