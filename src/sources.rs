//! Source file discovery

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const JAVA_EXTENSION: &str = "java";

/// Directories that never hold sources worth checking
fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| {
            matches!(name, ".git" | "target" | "build" | "out" | "node_modules" | ".gradle" | ".idea")
        })
}

fn is_java_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(JAVA_EXTENSION))
}

/// Expand the given paths into Java files. Files are taken as given,
/// directories are walked. Output is sorted and deduplicated.
pub fn collect_java_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in paths {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        if !root.is_dir() {
            log::warn!("Skipping {}: no such file or directory", root.display());
            continue;
        }
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_ignored(e.path()))
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if entry.file_type().is_file() && is_java_file(path) {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}
