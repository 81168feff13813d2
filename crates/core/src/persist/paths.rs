//! Folder spec validation and normalization.
//!
//! Persistent folder specs are user-supplied relative paths. Every spec is
//! normalized to one canonical form (`frontend/node_modules`) so that
//! backup and restore are idempotent and overlapping specs deduplicate
//! deterministically.

use crate::persist::error::PersistError;
use crate::persist::error::PersistResult;

/// Validate a folder spec and return its canonical relative form.
///
/// Normalization order matters: trim whitespace, strip leading and trailing
/// separators (both `/` and `\`), collapse `.` segments, then reject any
/// remaining `..` segment. Separators are unified to `/`.
///
/// # Errors
///
/// Returns `PersistError::InvalidPath` when the input is empty or
/// whitespace-only, carries a Windows drive letter or UNC prefix, contains
/// a `..` segment, or normalizes to nothing.
///
/// # Examples
///
/// ```
/// use dk_core::persist::paths::validate_folder_path;
///
/// assert_eq!(validate_folder_path("/uploads/").unwrap(), "uploads");
/// assert_eq!(
///     validate_folder_path("frontend\\node_modules").unwrap(),
///     "frontend/node_modules"
/// );
/// assert!(validate_folder_path("../uploads").is_err());
/// ```
pub fn validate_folder_path(raw: &str) -> PersistResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(raw, "path must be a non-empty string"));
    }

    // Windows absolute forms cannot be normalized into a safe relative
    // path, so they are rejected outright rather than stripped.
    if has_drive_prefix(trimmed) {
        return Err(invalid(raw, "drive-letter paths are not allowed"));
    }
    if trimmed.starts_with("\\\\") {
        return Err(invalid(raw, "UNC paths are not allowed"));
    }

    let stripped = trimmed.trim_matches(['/', '\\']);
    if stripped.is_empty() {
        return Err(invalid(raw, "path is empty after normalization"));
    }

    let mut segments = Vec::new();
    for segment in stripped.split(['/', '\\']) {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            return Err(invalid(raw, "path must not contain '..' components"));
        }
        segments.push(segment);
    }

    if segments.is_empty() {
        return Err(invalid(raw, "path is empty after normalization"));
    }

    Ok(segments.join("/"))
}

/// Parse a comma-separated folder spec string into canonical specs.
///
/// Entries are trimmed, empty entries are dropped, each remaining entry is
/// validated, and duplicates (after normalization) are removed preserving
/// first-seen order.
///
/// # Errors
///
/// Returns `PersistError::InvalidPath` for the first entry that fails
/// validation.
pub fn parse_folder_specs(raw: &str) -> PersistResult<Vec<String>> {
    let mut specs = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let canonical = validate_folder_path(entry)?;
        if !specs.contains(&canonical) {
            specs.push(canonical);
        }
    }
    Ok(specs)
}

fn has_drive_prefix(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

fn invalid(path: &str, reason: &str) -> PersistError {
    PersistError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
