//! Job-scoped transient storage for in-progress fragment downloads.
//!
//! Each job gets a uniquely named directory under the workspace root. The
//! name carries a random token from `tempfile`, so two jobs started in the
//! same second can never collide. `release` removes the directory and all
//! fragment files; dropping an unreleased `Workspace` (panic, early return)
//! removes it best-effort.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Directory name under the system temp dir used as the default root.
const DEFAULT_ROOT: &str = "vodfetch";

/// Exclusively-owned transient directory for one retrieval job.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates a job directory under `<system-temp>/vodfetch/`.
    pub fn acquire() -> io::Result<Workspace> {
        Self::acquire_in(&std::env::temp_dir().join(DEFAULT_ROOT))
    }

    /// Creates a job directory under `root` (created if missing).
    pub fn acquire_in(root: &Path) -> io::Result<Workspace> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("job-").tempdir_in(root)?;
        let ws = Workspace { dir };
        tracing::debug!(id = ws.id(), "workspace acquired");
        Ok(ws)
    }

    /// Directory fragment files are written into.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Opaque unique identifier (the directory name).
    pub fn id(&self) -> &str {
        self.dir
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    /// Recursively removes the directory and everything in it. Errors are
    /// reported to the caller; the `Drop` backstop has already been disarmed
    /// by then, so this is the one chance to observe a cleanup failure.
    pub fn release(self) -> io::Result<()> {
        let path: PathBuf = self.dir.path().to_path_buf();
        let result = self.dir.close();
        if result.is_ok() {
            tracing::debug!(path = %path.display(), "workspace released");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_unique_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::acquire_in(root.path()).unwrap();
        let b = Workspace::acquire_in(root.path()).unwrap();
        assert!(a.path().is_dir());
        assert!(b.path().is_dir());
        assert_ne!(a.path(), b.path());
        assert_ne!(a.id(), b.id());
        assert!(a.id().starts_with("job-"));
    }

    #[test]
    fn release_removes_directory_and_contents() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire_in(root.path()).unwrap();
        let path = ws.path().to_path_buf();
        fs::write(path.join("00000000.ts"), b"abc").unwrap();
        ws.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_directory_best_effort() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::acquire_in(root.path()).unwrap();
            fs::write(ws.path().join("00000000.ts"), b"abc").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
