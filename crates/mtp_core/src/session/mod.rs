//! Per-file session storage.
//!
//! Each opened file owns one temp directory holding its decoded tracks. The
//! directory is removed when the session closes (new file, cleanup, quit).

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// File name of a decoded track inside the session directory.
pub fn track_file_name(audio_index: usize) -> String {
    format!("track_{}.wav", audio_index)
}

/// Temp directory owned by one file session.
#[derive(Debug)]
pub struct SessionDir {
    dir: TempDir,
    generation: u64,
}

impl SessionDir {
    /// Create a new session directory under `root` with the given name prefix.
    pub fn create(root: &Path, prefix: &str, generation: u64) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(root)?;
        tracing::debug!("Created session dir {}", dir.path().display());
        Ok(Self { dir, generation })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Generation number of the session that owns this directory.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deterministic decoded-output path for a track.
    pub fn track_output_path(&self, audio_index: usize) -> PathBuf {
        self.dir.path().join(track_file_name(audio_index))
    }

    /// Remove the directory recursively. Failures are logged, not returned.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!("Removed session dir {}", path.display()),
            Err(e) => tracing::warn!("Failed to remove session dir {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_uses_prefix_and_root() {
        let root = tempdir().unwrap();
        let session = SessionDir::create(root.path(), "mtp-session-", 4).unwrap();

        assert!(session.path().starts_with(root.path()));
        let name = session.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("mtp-session-"));
        assert_eq!(session.generation(), 4);
    }

    #[test]
    fn track_output_path_is_deterministic() {
        let root = tempdir().unwrap();
        let session = SessionDir::create(root.path(), "s-", 1).unwrap();

        assert_eq!(
            session.track_output_path(0),
            session.path().join("track_0.wav")
        );
        assert_eq!(track_file_name(12), "track_12.wav");
    }

    #[test]
    fn close_removes_directory_with_contents() {
        let root = tempdir().unwrap();
        let session = SessionDir::create(root.path(), "s-", 1).unwrap();
        let dir = session.path().to_path_buf();
        std::fs::write(session.track_output_path(0), b"RIFF").unwrap();

        session.close();
        assert!(!dir.exists());
    }

    #[test]
    fn missing_root_is_created() {
        let root = tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let session = SessionDir::create(&nested, "s-", 1).unwrap();
        assert!(session.path().starts_with(&nested));
    }
}
