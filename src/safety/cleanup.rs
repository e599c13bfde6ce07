/// Best-effort recursive removal for workspace directories.
///
/// Submitted programs can leave behind read-only or mode-000 directories,
/// which make a plain `remove_dir_all` fail. On the first failure the tree
/// is walked (without following symlinks), owner permissions are restored,
/// and removal is retried once.
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(first) => {
            log::debug!(
                "Retrying removal of {} after restoring permissions: {}",
                path.display(),
                first
            );
            restore_owner_permissions(path);
            match fs::remove_dir_all(path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        }
    }
}

fn restore_owner_permissions(dir: &Path) {
    let Ok(meta) = fs::symlink_metadata(dir) else {
        return;
    };
    if !meta.is_dir() {
        return;
    }

    let mode = meta.permissions().mode();
    if mode & 0o700 != 0o700 {
        let _ = fs::set_permissions(dir, fs::Permissions::from_mode(mode | 0o700));
    }

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            restore_owner_permissions(&entry.path());
        }
    }
}
