//! Resolution of file patterns to matching local files.
//!
//! Patterns use standard glob syntax (`*`, `?`, `[abc]`, `{a,b}`, `**`).
//! A comma-separated string expands every pattern in it. Resolution never
//! fails: unreadable directories and invalid patterns degrade to an empty
//! result with a logged warning, so callers loading optional cache files
//! keep making forward progress.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

/// Glob metacharacters that trigger directory walking.
const GLOB_META_CHARS: &[char] = &['*', '?', '[', ']', '{', '}'];

/// Check whether a pattern contains glob metacharacters.
///
/// # Arguments
/// * `pattern` - Pattern string to inspect
pub fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(GLOB_META_CHARS)
}

/// Resolve a file pattern to the sorted list of matching files.
///
/// # Arguments
/// * `pattern` - A path, a glob pattern, or a comma-separated list of either
///
/// # Returns
/// Deduplicated, lexicographically sorted list of matching files. Empty
/// when nothing matches or the pattern is empty.
pub fn resolve_matching(pattern: &str) -> Vec<PathBuf> {
    let mut matches: BTreeSet<PathBuf> = BTreeSet::new();
    for part in pattern.split(',') {
        let part: &str = part.trim();
        if !part.is_empty() {
            expand_pattern(part, &mut matches);
        }
    }
    matches.into_iter().collect()
}

/// Resolve the file a cache should be saved to: the last (newest-sorting)
/// existing match for the pattern, or the literal pattern itself when
/// nothing matches yet.
///
/// # Arguments
/// * `pattern` - The configured backing-file pattern
///
/// # Returns
/// Path to write to, or None when the pattern is empty.
pub fn resolve_save_path(pattern: &str) -> Option<PathBuf> {
    if pattern.trim().is_empty() {
        return None;
    }
    if let Some(last) = resolve_matching(pattern).pop() {
        return Some(last);
    }
    // No existing match: fall back to the first literal pattern.
    let first: &str = pattern
        .split(',')
        .map(str::trim)
        .find(|p| !p.is_empty())?;
    Some(PathBuf::from(first))
}

/// Expand one pattern into the match set.
///
/// # Arguments
/// * `pattern` - Single pattern (no commas)
/// * `matches` - Set collecting the matched files
fn expand_pattern(pattern: &str, matches: &mut BTreeSet<PathBuf>) {
    if !has_glob_meta(pattern) {
        let path: &Path = Path::new(pattern);
        if path.is_file() {
            matches.insert(path.to_path_buf());
        }
        return;
    }

    // `*` must not cross directory separators; `**` still recurses.
    let matcher: GlobMatcher = match GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(glob) => glob.compile_matcher(),
        Err(e) => {
            log::warn!("Ignoring invalid file pattern {}: {}", pattern, e);
            return;
        }
    };

    let base: PathBuf = glob_base_dir(pattern);
    for entry in WalkDir::new(&base).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable path under {}: {}", base.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let candidate: String = entry.path().to_string_lossy().into_owned();
        // WalkDir prefixes "./" when walking the current directory.
        let candidate: &str = candidate.strip_prefix("./").unwrap_or(&candidate);
        if matcher.is_match(candidate) {
            matches.insert(PathBuf::from(candidate));
        }
    }
}

/// Get the deepest ancestor directory of a pattern that contains no glob
/// metacharacters; walking starts there.
///
/// # Arguments
/// * `pattern` - Pattern with at least one metacharacter
fn glob_base_dir(pattern: &str) -> PathBuf {
    let mut base: PathBuf = PathBuf::new();
    for component in Path::new(pattern).components() {
        let part: String = component.as_os_str().to_string_lossy().into_owned();
        if has_glob_meta(&part) {
            break;
        }
        base.push(part);
    }
    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str) -> PathBuf {
        let path: PathBuf = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "x").unwrap();
        path
    }

    #[test]
    fn test_empty_pattern() {
        assert!(resolve_matching("").is_empty());
        assert!(resolve_matching("  ,  ").is_empty());
    }

    #[test]
    fn test_literal_path() {
        let dir: TempDir = TempDir::new().unwrap();
        let file: PathBuf = write_file(dir.path(), "cache.csv");
        let matches: Vec<PathBuf> = resolve_matching(file.to_str().unwrap());
        assert_eq!(matches, vec![file]);
    }

    #[test]
    fn test_literal_path_missing() {
        let dir: TempDir = TempDir::new().unwrap();
        let missing: PathBuf = dir.path().join("missing.csv");
        assert!(resolve_matching(missing.to_str().unwrap()).is_empty());
    }

    #[test]
    fn test_star_pattern_sorted() {
        let dir: TempDir = TempDir::new().unwrap();
        write_file(dir.path(), "b.csv");
        write_file(dir.path(), "a.csv");
        write_file(dir.path(), "c.txt");
        let pattern: String = format!("{}/*.csv", dir.path().display());
        let matches: Vec<PathBuf> = resolve_matching(&pattern);
        assert_eq!(matches.len(), 2);
        assert!(matches[0].ends_with("a.csv"));
        assert!(matches[1].ends_with("b.csv"));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let dir: TempDir = TempDir::new().unwrap();
        write_file(dir.path(), "top.csv");
        write_file(dir.path(), "sub/nested.csv");
        let pattern: String = format!("{}/*.csv", dir.path().display());
        let matches: Vec<PathBuf> = resolve_matching(&pattern);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].ends_with("top.csv"));
    }

    #[test]
    fn test_recursive_pattern() {
        let dir: TempDir = TempDir::new().unwrap();
        write_file(dir.path(), "top.csv");
        write_file(dir.path(), "sub/nested.csv");
        let pattern: String = format!("{}/**/*.csv", dir.path().display());
        let matches: Vec<PathBuf> = resolve_matching(&pattern);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_comma_separated_patterns() {
        let dir: TempDir = TempDir::new().unwrap();
        let a: PathBuf = write_file(dir.path(), "a.csv");
        let b: PathBuf = write_file(dir.path(), "b.txt");
        let pattern: String = format!("{},{}", a.display(), b.display());
        let matches: Vec<PathBuf> = resolve_matching(&pattern);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_duplicate_matches_removed() {
        let dir: TempDir = TempDir::new().unwrap();
        let a: PathBuf = write_file(dir.path(), "a.csv");
        let pattern: String = format!("{},{}/*.csv", a.display(), dir.path().display());
        let matches: Vec<PathBuf> = resolve_matching(&pattern);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_invalid_pattern_ignored() {
        assert!(resolve_matching("[invalid").is_empty());
    }

    #[test]
    fn test_save_path_uses_last_match() {
        let dir: TempDir = TempDir::new().unwrap();
        write_file(dir.path(), "cache-01.csv");
        write_file(dir.path(), "cache-02.csv");
        let pattern: String = format!("{}/cache-*.csv", dir.path().display());
        let save: PathBuf = resolve_save_path(&pattern).unwrap();
        assert!(save.ends_with("cache-02.csv"));
    }

    #[test]
    fn test_save_path_falls_back_to_literal() {
        let dir: TempDir = TempDir::new().unwrap();
        let missing: PathBuf = dir.path().join("new-cache.csv");
        let save: PathBuf = resolve_save_path(missing.to_str().unwrap()).unwrap();
        assert_eq!(save, missing);
    }

    #[test]
    fn test_save_path_empty_pattern() {
        assert!(resolve_save_path("").is_none());
        assert!(resolve_save_path("   ").is_none());
    }
}
