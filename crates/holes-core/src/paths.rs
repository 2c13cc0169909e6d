use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const HOLES_DIR: &str = ".holes";
pub const CONFIG_FILE: &str = ".holes/config.yaml";

pub const DEFAULT_DOCUMENT: &str = "REFACTOR_IR.md";
pub const DEFAULT_REPORT: &str = "REFACTOR_REPORT.md";
pub const DEFAULT_BASELINE_TESTS: &str = "tests/characterization";
pub const DEFAULT_RESOLUTION_TESTS: &str = "tests/resolution";
pub const DEFAULT_TEST_PREFIX: &str = "test_";
pub const DEFAULT_TEST_SUFFIX: &str = ".py";

pub const DEFAULT_PROTECTED_BRANCH: &str = "main";
pub const DEFAULT_PROTECTED_PATH: &str = ".beads";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a possibly-relative path against the project root.
pub fn under_root(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// List test modules directly inside `dir`: regular files whose name starts
/// with `prefix` and ends with `suffix`. Sorted by file name. A missing
/// directory yields an empty list.
pub fn list_test_modules(
    dir: &Path,
    prefix: &str,
    suffix: &str,
) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut modules = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(prefix) && name.ends_with(suffix) {
            modules.push(entry.path());
        }
    }
    modules.sort();
    Ok(modules)
}

/// Resolution tests for a hole: `<prefix><lowercased id>` followed by `_`,
/// `.` or the end of the file name. `test_r1.py` matches R1, `test_r10.py`
/// does not.
pub fn is_resolution_test_for(file_name: &str, prefix: &str, hole_id: &str) -> bool {
    let stem = format!("{prefix}{}", hole_id.to_lowercase());
    match file_name.strip_prefix(&stem) {
        Some(rest) => rest.is_empty() || rest.starts_with('_') || rest.starts_with('.'),
        None => false,
    }
}

pub fn list_resolution_tests(
    dir: &Path,
    prefix: &str,
    suffix: &str,
    hole_id: &str,
) -> std::io::Result<Vec<PathBuf>> {
    let all = list_test_modules(dir, prefix, suffix)?;
    Ok(all
        .into_iter()
        .filter(|p| {
            p.file_name()
                .map(|n| is_resolution_test_for(&n.to_string_lossy(), prefix, hole_id))
                .unwrap_or(false)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
