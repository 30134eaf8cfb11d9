//! Atomic "write to a temp file, then rename" persistence primitive.
//!
//! Every durable-state writer in the workspace (the sync-state manifest,
//! the cluster's Raft snapshots) needs the same guarantee: a partial write
//! must never leave a readable file corrupted. This crate centralizes that
//! pattern instead of letting each caller re-implement `NamedTempFile` +
//! `persist` with slightly different error handling.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Atomically writes `contents` to `path`.
///
/// Creates a temp file in the same directory as `path` (so the rename is
/// guaranteed to be on the same filesystem and therefore atomic), writes
/// `contents` to it, flushes, and renames it over `path`. If the process
/// crashes at any point before the rename completes, `path` is left
/// untouched; the old contents remain readable.
pub fn atomic_write(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = parent_or_cwd(path);
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    {
        use std::io::Write;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
    }
    tmp.persist(path)?;
    Ok(())
}

fn parent_or_cwd(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn writes_and_reads_back_exactly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        atomic_write(&path, b"{\"a\":1}").unwrap();

        let mut buf = String::new();
        std::fs::File::open(&path).unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "{\"a\":1}");
    }

    #[test]
    fn second_write_replaces_the_first_atomically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        let mut buf = String::new();
        std::fs::File::open(&path).unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "second");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("manifest.json");
        atomic_write(&path, b"x").unwrap();
        assert!(path.exists());
    }
}
