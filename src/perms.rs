//! Permission fix-ups run before a backup.
//!
//! - [`normalize_modes`] walks the source tree and sets directories to
//!   `rwxr-xr-x` and regular files to `rw-r--r--`.  Symlinks are left alone.
//! - [`chown_invocation`] builds `chown -R <owner> <path>`; ownership changes
//!   need names resolved by the system, so this stays a subprocess.

use std::{fs, os::unix::fs::PermissionsExt, path::Path};

use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    runner::Invocation,
};

pub const DIR_MODE: u32 = 0o755;
pub const FILE_MODE: u32 = 0o644;

/// Normalise modes under `root`.  Returns the number of entries changed.
pub fn normalize_modes(root: &Path) -> Result<usize> {
    let mut changed = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::Permissions {
                path,
                source: e.into(),
            }
        })?;
        let file_type = entry.file_type();
        let mode = if file_type.is_dir() {
            DIR_MODE
        } else if file_type.is_file() {
            FILE_MODE
        } else {
            continue;
        };

        let meta = entry.metadata().map_err(|e| Error::Permissions {
            path: entry.path().to_path_buf(),
            source: e.into(),
        })?;
        if meta.permissions().mode() & 0o7777 == mode {
            continue;
        }
        fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode)).map_err(|source| {
            Error::Permissions {
                path: entry.path().to_path_buf(),
                source,
            }
        })?;
        changed += 1;
    }
    tracing::debug!(root = %root.display(), changed, "normalised permissions");
    Ok(changed)
}

/// `chown -R <owner> <path>`.
pub fn chown_invocation(path: &Path, owner: &str) -> Invocation {
    Invocation::new(
        "chown",
        vec!["-R".into(), owner.into(), path.display().to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn normalises_dirs_and_files() {
        let root = tempfile::tempdir().unwrap();
        let sub = root.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let file = sub.join("data.txt");
        fs::write(&file, "x").unwrap();
        let script = root.path().join("run.sh");
        fs::write(&script, "#!/bin/sh").unwrap();

        fs::set_permissions(&sub, fs::Permissions::from_mode(0o700)).unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o600)).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o777)).unwrap();

        normalize_modes(root.path()).unwrap();

        assert_eq!(mode(root.path()), DIR_MODE);
        assert_eq!(mode(&sub), DIR_MODE);
        assert_eq!(mode(&file), FILE_MODE);
        assert_eq!(mode(&script), FILE_MODE);
    }

    #[test]
    fn already_normal_tree_changes_nothing() {
        let root = tempfile::tempdir().unwrap();
        fs::set_permissions(root.path(), fs::Permissions::from_mode(DIR_MODE)).unwrap();
        let file = root.path().join("a");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(FILE_MODE)).unwrap();

        assert_eq!(normalize_modes(root.path()).unwrap(), 0);
    }

    #[test]
    fn single_file_root() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("only");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o600)).unwrap();

        assert_eq!(normalize_modes(&file).unwrap(), 1);
        assert_eq!(mode(&file), FILE_MODE);
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = normalize_modes(Path::new("/nonexistent/rf-perms-test")).unwrap_err();
        assert!(matches!(err, Error::Permissions { .. }));
        assert!(err.to_string().contains("/nonexistent/rf-perms-test"));
    }

    #[test]
    fn chown_args() {
        let inv = chown_invocation(Path::new("/srv/data"), "backup:backup");
        assert_eq!(inv.program, "chown");
        assert_eq!(inv.args, vec!["-R", "backup:backup", "/srv/data"]);
    }
}
