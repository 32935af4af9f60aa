//! Small helpers shared by the file front end.

use std::path::PathBuf;

use crate::error::{PdfError, Result};

/// Expand input arguments into file paths, keeping argument order.
///
/// Arguments containing glob metacharacters (`*`, `?`, `[`) are expanded and
/// their matches sorted; anything else is taken literally so that a missing
/// file is reported by the loader rather than silently dropped.
///
/// # Errors
///
/// Returns an error for malformed patterns, unreadable directories met while
/// expanding, or a pattern that matches nothing.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if is_pattern(pattern) {
            let matches = collect_paths_for_pattern(pattern)?;
            if matches.is_empty() {
                return Err(PdfError::other(format!(
                    "Pattern matched no files: {pattern}"
                )));
            }
            resolved.extend(matches);
        } else {
            resolved.push(PathBuf::from(pattern));
        }
    }
    Ok(resolved)
}

fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

fn collect_paths_for_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|err| PdfError::other(err.to_string()))?;

    let mut resolved = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| PdfError::other(err.to_string()))?;
        if path.is_file() {
            resolved.push(path);
        }
    }
    resolved.sort();
    Ok(resolved)
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
