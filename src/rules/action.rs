//! Sort actions - creating destination folders and moving files into them

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::{SortingRule, file_extension, split_name};

/// Upper bound on `name (n).ext` attempts before giving up on a file
pub const MAX_DUPLICATE_SUFFIX: u32 = 10_000;

/// Why a single sort attempt failed
#[derive(Debug, Error)]
pub enum SortError {
    /// The source disappeared between the event and the move
    #[error("file vanished: {}", .0.display())]
    Vanished(PathBuf),

    /// Another process still holds the source open
    #[error("file is locked by another process: {}", .0.display())]
    Locked(PathBuf),

    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no free name for {} after {} attempts", .0.display(), MAX_DUPLICATE_SUFFIX)]
    NoFreeName(PathBuf),

    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Create the rule's folder under `root` if needed and return its path
pub fn ensure_destination(root: &Path, rule: &SortingRule) -> Result<PathBuf, SortError> {
    let dir = root.join(&rule.folder_name);
    if !dir.is_dir() {
        debug!("Creating destination {}", dir.display());
        std::fs::create_dir_all(&dir).map_err(|source| SortError::CreateDir {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(dir)
}

/// First path in `dir` not already taken, starting from `file_name` itself
/// and then trying `stem (1).ext`, `stem (2).ext`, ...
///
/// Best effort only: nothing stops another process from claiming the name
/// between this check and the move.
pub fn unique_destination(dir: &Path, file_name: &Path) -> Result<PathBuf, SortError> {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    // Numbered names carry the lower-cased extension: `Scan.PDF` -> `Scan (1).pdf`
    let extension = file_extension(file_name);
    let stem: OsString = match file_name.to_str() {
        Some(name) => split_name(name).0.into(),
        None => file_name
            .file_stem()
            .unwrap_or(file_name.as_os_str())
            .to_os_string(),
    };

    for n in 1..=MAX_DUPLICATE_SUFFIX {
        let mut name = stem.clone();
        name.push(format!(" ({})", n));
        name.push(&extension);

        let candidate = dir.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(SortError::NoFreeName(dir.join(file_name)))
}

/// Rename `from` to `to`, classifying the failure modes the engine cares about
pub fn move_file(from: &Path, to: &Path) -> Result<(), SortError> {
    match std::fs::rename(from, to) {
        Ok(()) => {
            info!("Moved {} -> {}", from.display(), to.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && !from.exists() => {
            Err(SortError::Vanished(from.to_path_buf()))
        }
        Err(e) if is_locked(&e) => Err(SortError::Locked(from.to_path_buf())),
        Err(source) => Err(SortError::Io {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }),
    }
}

/// Whether an I/O error means the file is held open by someone else
fn is_locked(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::ResourceBusy {
        return true;
    }

    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    if matches!(e.raw_os_error(), Some(32) | Some(33)) {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rule(folder: &str) -> SortingRule {
        SortingRule::new(".pdf", folder).unwrap()
    }

    #[test]
    fn test_ensure_destination_creates_nested() {
        let tmp = TempDir::new().unwrap();
        let dir = ensure_destination(tmp.path(), &rule("Documents/PDFs")).unwrap();
        assert_eq!(dir, tmp.path().join("Documents").join("PDFs"));
        assert!(dir.is_dir());

        // Existing directory is fine
        assert!(ensure_destination(tmp.path(), &rule("Documents/PDFs")).is_ok());
    }

    #[test]
    fn test_ensure_destination_blocked_by_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Documents"), b"not a dir").unwrap();

        let err = ensure_destination(tmp.path(), &rule("Documents")).unwrap_err();
        assert!(matches!(err, SortError::CreateDir { .. }));
    }

    #[test]
    fn test_unique_destination_free_name() {
        let tmp = TempDir::new().unwrap();
        let dest = unique_destination(tmp.path(), Path::new("report.pdf")).unwrap();
        assert_eq!(dest, tmp.path().join("report.pdf"));
    }

    #[test]
    fn test_unique_destination_counts_up() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("report.pdf"), b"1").unwrap();
        std::fs::write(tmp.path().join("report (1).pdf"), b"2").unwrap();

        let dest = unique_destination(tmp.path(), Path::new("report.pdf")).unwrap();
        assert_eq!(dest, tmp.path().join("report (2).pdf"));
    }

    #[test]
    fn test_unique_destination_lowercases_numbered_extension() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Scan.PDF"), b"1").unwrap();

        let dest = unique_destination(tmp.path(), Path::new("Scan.PDF")).unwrap();
        assert_eq!(dest, tmp.path().join("Scan (1).pdf"));

        // The free original name keeps its case
        let dest = unique_destination(tmp.path(), Path::new("Other.PDF")).unwrap();
        assert_eq!(dest, tmp.path().join("Other.PDF"));
    }

    #[test]
    fn test_unique_destination_dotfile() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".gitignore"), b"1").unwrap();

        let dest = unique_destination(tmp.path(), Path::new(".gitignore")).unwrap();
        assert_eq!(dest, tmp.path().join(" (1).gitignore"));
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes"), b"1").unwrap();

        let dest = unique_destination(tmp.path(), Path::new("notes")).unwrap();
        assert_eq!(dest, tmp.path().join("notes (1)"));
    }

    #[test]
    fn test_move_file() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a.pdf");
        let to = tmp.path().join("b.pdf");
        std::fs::write(&from, b"data").unwrap();

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"data");
    }

    #[test]
    fn test_move_vanished_source() {
        let tmp = TempDir::new().unwrap();
        let err = move_file(&tmp.path().join("gone.pdf"), &tmp.path().join("x.pdf")).unwrap_err();
        assert!(matches!(err, SortError::Vanished(_)));
    }

    #[test]
    fn test_move_into_missing_directory_is_io() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a.pdf");
        std::fs::write(&from, b"data").unwrap();

        let err = move_file(&from, &tmp.path().join("missing").join("a.pdf")).unwrap_err();
        assert!(matches!(err, SortError::Io { .. }));
        assert!(from.exists());
    }
}
