//! Directory listing used by the selector and by source enumeration.

use std::path::{Path, PathBuf};

use reelsmith_common::error::ReelsmithResult;

/// Whether `path` ends in one of `allowed` (".mp4" or "mp4"), ignoring case.
/// An empty `allowed` list matches everything.
pub fn matches_extension(path: &Path, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    allowed
        .iter()
        .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Regular files in `dir` matching `extensions`, sorted by path.
///
/// A directory that does not exist lists as empty.
pub fn list_files(dir: &Path, extensions: &[String]) -> ReelsmithResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && matches_extension(&path, extensions) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Names of the immediate subdirectories of `dir`, sorted, skipping `ignore`
/// and hidden entries.
pub fn list_subdirectories(dir: &Path, ignore: &[&str]) -> ReelsmithResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || ignore.contains(&name.as_str()) {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}
