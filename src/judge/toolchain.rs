/// Toolchain lookup against the configured search path
use crate::judge::plan::LanguagePlan;
use crate::judge::registry::PlanRegistry;
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Resolves compiler and interpreter names to executables.
#[derive(Debug, Clone)]
pub struct Toolchain {
    search_path: OsString,
}

impl Toolchain {
    pub fn new(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: search_path.into(),
        }
    }

    /// Toolchain using the host `PATH`.
    pub fn from_host() -> Self {
        Self::new(std::env::var_os("PATH").unwrap_or_default())
    }

    /// Value handed to children as `PATH`.
    pub fn search_path(&self) -> &OsStr {
        &self.search_path
    }

    /// Locate `program`. Names containing `/` are taken as paths.
    pub fn resolve(&self, program: &str) -> Option<PathBuf> {
        if program.is_empty() {
            return None;
        }
        if program.contains('/') {
            let path = PathBuf::from(program);
            return is_executable(&path).then_some(path);
        }
        std::env::split_paths(&self.search_path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }

    /// Probe every executable a plan depends on.
    pub fn check_plan(&self, plan: &LanguagePlan) -> LanguageStatus {
        let tools: Vec<ToolStatus> = plan
            .executables()
            .into_iter()
            .map(|program| self.probe(program))
            .collect();
        LanguageStatus {
            language: plan.id().to_string(),
            available: tools.iter().all(|t| t.path.is_some()),
            tools,
        }
    }

    /// Probe all registered languages.
    pub fn check_all(&self, registry: &PlanRegistry) -> Vec<LanguageStatus> {
        registry.plans().map(|plan| self.check_plan(plan)).collect()
    }

    fn probe(&self, program: &str) -> ToolStatus {
        let Some(path) = self.resolve(program) else {
            return ToolStatus {
                program: program.to_string(),
                path: None,
                version: None,
            };
        };

        // JDK tools only understand the single-dash form.
        let version_flag = if matches!(program, "java" | "javac") {
            "-version"
        } else {
            "--version"
        };
        let version = Command::new(&path)
            .arg(version_flag)
            .env("PATH", &self.search_path)
            .stdin(Stdio::null())
            .output()
            .ok()
            .filter(|output| output.status.success())
            .and_then(|output| {
                let text = if output.stdout.is_empty() {
                    output.stderr
                } else {
                    output.stdout
                };
                String::from_utf8_lossy(&text)
                    .lines()
                    .next()
                    .map(|line| line.trim().to_string())
            });

        ToolStatus {
            program: program.to_string(),
            path: Some(path),
            version,
        }
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::from_host()
    }
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub program: String,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageStatus {
    pub language: String,
    pub available: bool,
    pub tools: Vec<ToolStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_tool(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\necho fake 1.0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn resolves_executables_in_search_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fake_tool(second.path(), "python3", 0o755);
        let expected = fake_tool(first.path(), "python3", 0o755);

        let search = std::env::join_paths([first.path(), second.path()]).unwrap();
        let toolchain = Toolchain::new(search);
        assert_eq!(toolchain.resolve("python3"), Some(expected));
    }

    #[test]
    fn non_executable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fake_tool(dir.path(), "javac", 0o644);
        let toolchain = Toolchain::new(dir.path().as_os_str());
        assert_eq!(toolchain.resolve("javac"), None);
    }

    #[test]
    fn empty_search_path_resolves_nothing() {
        let toolchain = Toolchain::new("");
        assert_eq!(toolchain.resolve("sh"), None);
        assert_eq!(toolchain.resolve(""), None);
    }

    #[test]
    fn check_plan_reports_missing_tools() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Toolchain::new(dir.path().as_os_str());
        let status = toolchain.check_plan(&crate::judge::languages::java::plan());
        assert!(!status.available);
        assert_eq!(status.tools.len(), 2);
        assert!(status.tools.iter().all(|t| t.path.is_none()));
    }

    #[test]
    fn check_plan_reports_version_line() {
        let dir = tempfile::tempdir().unwrap();
        fake_tool(dir.path(), "node", 0o755);
        let search = std::env::join_paths([dir.path(), Path::new("/bin"), Path::new("/usr/bin")])
            .unwrap();
        let toolchain = Toolchain::new(search);
        let status = toolchain.check_plan(&crate::judge::languages::javascript::plan());
        assert!(status.available);
        // A concurrent fork elsewhere in the test binary can make the fresh
        // script briefly unexecutable (ETXTBSY); only check the line if it ran.
        if let Some(version) = status.tools[0].version.as_deref() {
            assert_eq!(version, "fake 1.0");
        }
    }
}
