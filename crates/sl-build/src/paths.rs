//! Path identity for documents.

use std::path::{Component, Path, PathBuf};

/// Turn `path` into the absolute, canonical form used as a document's identity.
///
/// Existing files are canonicalized (symlinks resolved). For paths that do not
/// exist, such as a missing include or a deleted root, the longest existing
/// ancestor is canonicalized and the missing components are appended after
/// lexical cleaning, so the path names the same document it did while it existed.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let cleaned = clean(&absolute);

    let mut missing = Vec::new();
    let mut existing = cleaned.as_path();
    loop {
        if let Ok(base) = existing.canonicalize() {
            return missing.iter().rev().fold(base, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return cleaned,
        }
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_paths_are_cleaned() {
        let path = normalize_path(Path::new("/no/such/dir/../story/./main.tale"));
        assert_eq!(path, PathBuf::from("/no/such/story/main.tale"));
    }

    #[test]
    fn relative_paths_become_absolute() {
        let path = normalize_path(Path::new("definitely-missing.tale"));
        assert!(path.is_absolute());
        assert!(path.ends_with("definitely-missing.tale"));
    }

    #[cfg(unix)]
    #[test]
    fn missing_files_under_symlinks_resolve_like_existing_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let missing = normalize_path(&dir.path().join("link/later.part"));
        std::fs::write(dir.path().join("real/later.part"), "").unwrap();
        let existing = normalize_path(&dir.path().join("link/later.part"));

        assert_eq!(missing, existing);
        assert!(missing.ends_with("real/later.part"));
    }

    #[test]
    fn existing_files_are_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("main.tale"), "").unwrap();

        let via_parent = normalize_path(&dir.path().join("sub/../main.tale"));
        let direct = normalize_path(&dir.path().join("main.tale"));
        assert_eq!(via_parent, direct);
    }
}
