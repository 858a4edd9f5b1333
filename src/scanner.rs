//! Dependency-file discovery.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazily enumerate every dependency file under `root`.
///
/// Symlinks are not followed and unreadable entries are skipped, so a missing
/// root simply yields nothing.
pub fn find_artifacts<'a>(root: &Path, suffix: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(move |entry| is_artifact_name(entry.path(), suffix))
        .map(walkdir::DirEntry::into_path)
}

/// Lazily enumerate dependency files under `root` whose contents mention `token`.
///
/// This is a plain substring match on the file contents, not a path match: a
/// bare file name also matches same-named files from other directories. Files
/// that cannot be read are treated as not matching.
pub fn find_artifacts_referencing<'a>(
    root: &Path,
    suffix: &'a str,
    token: &'a str,
) -> impl Iterator<Item = PathBuf> + 'a {
    find_artifacts(root, suffix).filter(move |path| references(path, token))
}

/// Check whether a file name carries the dependency suffix (and something before it)
pub fn is_artifact_name(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.len() > suffix.len() && name.ends_with(suffix))
}

fn references(path: &Path, token: &str) -> bool {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "cannot read dependency file");
            return false;
        }
    };

    let needle = token.as_bytes();
    needle.is_empty() || contents.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn collect(iter: impl Iterator<Item = PathBuf>) -> BTreeSet<PathBuf> {
        iter.collect()
    }

    #[test]
    fn test_find_artifacts_recurses_and_filters_by_suffix() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("top.C.dep"), "").unwrap();
        fs::write(root.join("a/b/deep.H.dep"), "").unwrap();
        fs::write(root.join("a/obj.o"), "").unwrap();
        fs::write(root.join("a/dep"), "").unwrap();
        fs::write(root.join(".dep"), "").unwrap();

        let found = collect(find_artifacts(root, ".dep"));
        let expected: BTreeSet<PathBuf> = [root.join("top.C.dep"), root.join("a/b/deep.H.dep")]
            .into_iter()
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_find_artifacts_skips_directories_with_suffix() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("weird.dep")).unwrap();
        fs::write(dir.path().join("weird.dep/real.C.dep"), "").unwrap();

        let found = collect(find_artifacts(dir.path(), ".dep"));
        assert_eq!(found.len(), 1);
        assert!(found.contains(&dir.path().join("weird.dep/real.C.dep")));
    }

    #[test]
    fn test_find_artifacts_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        assert_eq!(find_artifacts(&dir.path().join("nope"), ".dep").count(), 0);
    }

    #[test]
    fn test_find_artifacts_referencing_matches_contents() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("a.C.dep"),
            "a.o: a.C \\\n  /project/src/lib/foo.H \\\n  bar.H\n",
        )
        .unwrap();
        fs::write(root.join("b.C.dep"), "b.o: b.C baz.H\n").unwrap();
        fs::write(root.join("foo.H.txt"), "foo.H\n").unwrap();

        let found = collect(find_artifacts_referencing(root, ".dep", "foo.H"));
        assert_eq!(found.len(), 1);
        assert!(found.contains(&root.join("a.C.dep")));
    }

    #[test]
    fn test_find_artifacts_referencing_is_loose() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        // A longer name containing the token also matches
        fs::write(root.join("a.C.dep"), "a.o: a.C myfoo.H\n").unwrap();

        assert_eq!(find_artifacts_referencing(root, ".dep", "foo.H").count(), 1);
    }

    #[test]
    fn test_is_artifact_name() {
        assert!(is_artifact_name(Path::new("x/levelSet.C.dep"), ".dep"));
        assert!(!is_artifact_name(Path::new("x/.dep"), ".dep"));
        assert!(!is_artifact_name(Path::new("x/levelSet.o"), ".dep"));
    }
}
