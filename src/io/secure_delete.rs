// Directory-entry scrubbing for an already overwritten file.
//
// The file is renamed to random names a few times, cut to zero length and only
// then unlinked, so neither its original name nor its extent map survive in
// the directory.

use rand::Rng;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Number of random renames before the final unlink
pub const RENAME_ROUNDS: usize = 3;

/// Length of every generated name
pub const RANDOM_NAME_LEN: usize = 16;

const NAME_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Rename, truncate and unlink `path`.
///
/// On error the file may remain under its original name (the first rename
/// failed) or under one of the random names.
pub fn secure_delete(path: &Path) -> io::Result<()> {
    let mut current = path.to_path_buf();
    for _ in 0..RENAME_ROUNDS {
        current = rename_to_random(&current)?;
    }
    sync_parent(&current);

    let file = OpenOptions::new().write(true).open(&current)?;
    file.set_len(0)?;
    file.sync_all()?;
    drop(file);

    fs::remove_file(&current)?;
    sync_parent(&current);

    tracing::debug!(path = %path.display(), "directory entry scrubbed");
    Ok(())
}

/// Move `path` to a fresh random name in the same directory
pub fn rename_to_random(path: &Path) -> io::Result<PathBuf> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut rng = rand::thread_rng();

    // rename(2) replaces an existing destination, so never pick a taken name
    let next = loop {
        let candidate = parent.join(random_name(&mut rng));
        if fs::symlink_metadata(&candidate).is_err() {
            break candidate;
        }
    };

    fs::rename(path, &next)?;
    Ok(next)
}

fn random_name(rng: &mut impl Rng) -> String {
    (0..RANDOM_NAME_LEN)
        .map(|_| NAME_CHARS[rng.gen_range(0..NAME_CHARS.len())] as char)
        .collect()
}

// Commit renames to the directory itself; not every filesystem supports it
#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
            tracing::debug!(dir = %parent.display(), error = %e, "directory sync skipped");
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names_in(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_rename_moves_within_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tax-return-2025.pdf");
        fs::write(&path, b"zeroed").unwrap();

        let renamed = rename_to_random(&path).unwrap();

        assert!(!path.exists());
        assert_eq!(renamed.parent(), Some(dir.path()));
        assert_eq!(fs::read(&renamed).unwrap(), b"zeroed");

        let name = renamed.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name.len(), RANDOM_NAME_LEN);
        assert!(name.bytes().all(|b| NAME_CHARS.contains(&b)));
    }

    #[test]
    fn test_rename_never_replaces_a_sibling() {
        let dir = TempDir::new().unwrap();
        for i in 0..50 {
            fs::write(dir.path().join(format!("f{i}")), [i as u8]).unwrap();
        }

        let mut current = dir.path().join("f0");
        for _ in 0..20 {
            current = rename_to_random(&current).unwrap();
        }

        assert_eq!(names_in(dir.path()).len(), 50);
    }

    #[test]
    fn test_secure_delete_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.txt");
        fs::write(&path, vec![0u8; 4096]).unwrap();
        fs::write(dir.path().join("neighbour.txt"), b"stay").unwrap();

        secure_delete(&path).unwrap();

        assert_eq!(names_in(dir.path()), vec!["neighbour.txt".to_string()]);
    }

    #[test]
    fn test_secure_delete_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = secure_delete(&dir.path().join("gone")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_keeps_original_name() {
        use std::os::unix::fs::PermissionsExt;

        if nix::unistd::geteuid().is_root() {
            return;
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pinned.bin");
        fs::write(&path, b"x").unwrap();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();

        let result = secure_delete(&path);
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(names_in(dir.path()), vec!["pinned.bin".to_string()]);
    }
}
