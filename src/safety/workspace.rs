/// Workspace management for per-request build artifacts
///
/// Every request gets its own freshly allocated directory under the
/// workspace root. The directory is removed when the handle is released,
/// or on drop if the owning request unwinds before it gets that far.
use crate::config::types::{CodeboxError, Result};
use crate::safety::cleanup;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use uuid::Uuid;

/// Directory name prefix for every run workspace
pub const WORKSPACE_PREFIX: &str = "codebox-";

/// Exclusive handle on one run directory
#[derive(Debug)]
pub struct Workspace {
    /// Unique run ID
    run_id: String,
    /// Run directory path
    path: PathBuf,
    /// Allocation guard; `None` once released
    dir: Option<TempDir>,
}

impl Workspace {
    fn allocate(root: &Path) -> Result<Self> {
        let run_id = Uuid::new_v4().to_string();
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)
            .map_err(|e| {
                CodeboxError::Workspace(format!(
                    "Failed to create workspace directory under {}: {}",
                    root.display(),
                    e
                ))
            })?;
        let path = dir.path().to_path_buf();
        log::debug!("Acquired workspace {} for run {}", path.display(), run_id);

        Ok(Self {
            run_id,
            path,
            dir: Some(dir),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and everything in it.
    ///
    /// Never fails: a leftover directory is logged and reported as `false`
    /// so it cannot mask the execution result.
    pub fn release(mut self) -> bool {
        self.remove()
    }

    fn remove(&mut self) -> bool {
        let Some(dir) = self.dir.take() else {
            return true;
        };

        if dir.close().is_ok() {
            log::debug!("Released workspace {}", self.path.display());
            return true;
        }

        match cleanup::remove_tree(&self.path) {
            Ok(()) => {
                log::debug!("Released workspace {} on retry", self.path.display());
                true
            }
            Err(e) => {
                log::warn!(
                    "Failed to remove workspace {} for run {}: {}",
                    self.path.display(),
                    self.run_id,
                    e
                );
                false
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Allocates run workspaces under a common root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Create a manager, creating the root directory if needed
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root).map_err(|e| {
            CodeboxError::Workspace(format!(
                "Failed to create workspace root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh, empty, uniquely named directory
    pub fn acquire(&self) -> Result<Workspace> {
        Workspace::allocate(&self.root)
    }

    /// Remove run directories older than `max_age`.
    ///
    /// Only entries carrying the workspace prefix are touched, so a shared
    /// root such as `/tmp` is safe to sweep.
    pub fn sweep_stale(&self, max_age: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut cleaned = 0;

        let entries = fs::read_dir(&self.root).map_err(|e| {
            CodeboxError::Workspace(format!(
                "Failed to read workspace root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            if !entry.file_name().to_string_lossy().starts_with(WORKSPACE_PREFIX) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) if m.is_dir() => m,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("Failed to get metadata for {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            let Some(age) = age else {
                continue;
            };

            if age >= max_age {
                let path = entry.path();
                log::info!("Sweeping stale workspace: {}", path.display());
                match cleanup::remove_tree(&path) {
                    Ok(()) => cleaned += 1,
                    Err(e) => log::warn!("Failed to remove stale workspace {}: {}", path.display(), e),
                }
            }
        }

        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_unique_empty_directories() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().to_path_buf()).unwrap();

        let a = manager.acquire().unwrap();
        let b = manager.acquire().unwrap();
        assert!(a.path().is_dir());
        assert!(b.path().is_dir());
        assert_ne!(a.path(), b.path());
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(fs::read_dir(a.path()).unwrap().count(), 0);
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(WORKSPACE_PREFIX));
    }

    #[test]
    fn release_removes_contents() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().to_path_buf()).unwrap();

        let workspace = manager.acquire().unwrap();
        let path = workspace.path().to_path_buf();
        fs::create_dir_all(path.join("nested/deeper")).unwrap();
        fs::write(path.join("nested/deeper/out.bin"), b"\x7fELF").unwrap();

        assert!(workspace.release());
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_directory_on_unwind() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().to_path_buf()).unwrap();
        let mut leaked_path = None;

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let workspace = manager.acquire().unwrap();
            leaked_path = Some(workspace.path().to_path_buf());
            panic!("simulated fault mid-pipeline");
        }));

        assert!(outcome.is_err());
        assert!(!leaked_path.unwrap().exists());
    }

    #[test]
    fn release_tolerates_externally_removed_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().to_path_buf()).unwrap();

        let workspace = manager.acquire().unwrap();
        fs::remove_dir_all(workspace.path()).unwrap();
        assert!(workspace.release());
    }

    #[test]
    fn sweep_only_touches_prefixed_directories() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().to_path_buf()).unwrap();

        let stale = root.path().join(format!("{}leftover", WORKSPACE_PREFIX));
        let unrelated = root.path().join("someone-else");
        fs::create_dir(&stale).unwrap();
        fs::create_dir(&unrelated).unwrap();

        let cleaned = manager.sweep_stale(Duration::ZERO).unwrap();
        assert_eq!(cleaned, 1);
        assert!(!stale.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn sweep_keeps_fresh_workspaces() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().to_path_buf()).unwrap();

        let live = manager.acquire().unwrap();
        let cleaned = manager.sweep_stale(Duration::from_secs(3600)).unwrap();
        assert_eq!(cleaned, 0);
        assert!(live.path().exists());
    }
}
