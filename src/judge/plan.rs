use std::path::{Path, PathBuf};

/// How a plan names its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceNaming {
    /// Always the same file name, e.g. `solution.py`.
    Fixed(&'static str),
    /// Named after the first public top-level type in the source (Java).
    PublicType,
}

/// Ordered argument list with placeholders.
///
/// Recognised placeholders: `{source}`, `{unit}`, `{artifact}`, `{workdir}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Executable as written in the template (before expansion).
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn expand(&self, unit: &CompilationUnit) -> Vec<String> {
        let workdir = unit.workdir.to_string_lossy();
        let artifact = unit.artifact_path().to_string_lossy().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{source}", &unit.source_name)
                    .replace("{unit}", &unit.unit_name)
                    .replace("{artifact}", &artifact)
                    .replace("{workdir}", &workdir)
            })
            .collect()
    }
}

/// Immutable per-language pipeline descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePlan {
    id: &'static str,
    naming: SourceNaming,
    extension: &'static str,
    artifact_name: &'static str,
    compile: Option<CommandTemplate>,
    run: CommandTemplate,
}

impl LanguagePlan {
    /// Interpreted pipeline: run step only.
    pub fn interpreted(
        id: &'static str,
        naming: SourceNaming,
        extension: &'static str,
        run: CommandTemplate,
    ) -> Self {
        Self {
            id,
            naming,
            extension,
            artifact_name: "solution",
            compile: None,
            run,
        }
    }

    /// Compiled pipeline: compile step, then run step.
    pub fn compiled(
        id: &'static str,
        naming: SourceNaming,
        extension: &'static str,
        compile: CommandTemplate,
        run: CommandTemplate,
    ) -> Self {
        Self {
            id,
            naming,
            extension,
            artifact_name: "solution",
            compile: Some(compile),
            run,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn naming(&self) -> SourceNaming {
        self.naming
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }

    /// Fixed source file name, `None` when derived from the source text.
    pub fn source_file_name(&self) -> Option<&'static str> {
        match self.naming {
            SourceNaming::Fixed(name) => Some(name),
            SourceNaming::PublicType => None,
        }
    }

    pub fn artifact_name(&self) -> &'static str {
        self.artifact_name
    }

    pub fn compile_command(&self) -> Option<&CommandTemplate> {
        self.compile.as_ref()
    }

    pub fn run_command(&self) -> &CommandTemplate {
        &self.run
    }

    /// Executables this plan needs, compile tool first.
    pub fn executables(&self) -> Vec<&str> {
        self.compile
            .iter()
            .chain(std::iter::once(&self.run))
            .filter_map(CommandTemplate::program)
            .filter(|program| !program.contains('{'))
            .collect()
    }
}

/// Source materialized into a workspace, ready for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub workdir: PathBuf,
    pub source_name: String,
    pub unit_name: String,
    pub artifact_name: String,
}

impl CompilationUnit {
    pub fn source_path(&self) -> PathBuf {
        self.workdir.join(&self.source_name)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.workdir.join(&self.artifact_name)
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}
