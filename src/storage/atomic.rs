use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::errors::{FeederError, FeederResult};

/// Directory a temp file must live in so that renaming it onto `path`
/// stays on the same filesystem
pub fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Replace `path` with `contents`; readers see either the old file or the
/// new one, never a partial write
pub fn write_atomic(path: &Path, contents: &[u8]) -> FeederResult<()> {
    write_atomic_with(path, |file| {
        file.write_all(contents)
            .map_err(|e| FeederError::Persistence(e.to_string()))
    })
}

/// Like [`write_atomic`], but the caller fills the temp file. Errors from
/// `fill` are returned unchanged and the target is left untouched.
pub fn write_atomic_with<F>(path: &Path, fill: F) -> FeederResult<()>
where
    F: FnOnce(&mut File) -> FeederResult<()>,
{
    let persistence = |e: std::io::Error| {
        FeederError::Persistence(format!("{}: {}", path.display(), e))
    };

    let mut tmp = NamedTempFile::new_in(parent_dir(path)).map_err(persistence)?;

    fill(tmp.as_file_mut())?;
    tmp.as_file().sync_all().map_err(persistence)?;

    // Temp files are created owner-only; keep the target readable
    match fs::metadata(path) {
        Ok(meta) => fs::set_permissions(tmp.path(), meta.permissions()).map_err(persistence)?,
        Err(_) => set_default_permissions(tmp.path()).map_err(persistence)?,
    }

    tmp.persist(path).map_err(|e| persistence(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_default_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parent_dir_of_bare_filename() {
        assert_eq!(parent_dir(Path::new("feed.xml")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/srv/feed.xml")), Path::new("/srv"));
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.xml");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_failed_fill_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.xml");
        fs::write(&path, "old").unwrap();

        let result = write_atomic_with(&path, |file| {
            file.write_all(b"partial").unwrap();
            Err(FeederError::Persistence("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
        // Temp file is cleaned up on drop
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unwritable_directory_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("feed.xml");

        let err = write_atomic(&path, b"data").unwrap_err();
        assert!(matches!(err, FeederError::Persistence(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_permissions_kept() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.xml");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&path, b"new").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
