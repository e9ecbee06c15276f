//! the `V:` anchored, backslash separated path grammar

use crate::error::{Result, VolumeError};
use crate::fs::geometry::Geometry;

/// every path starts with the root volume designator
pub const ROOT_NAME: &str = "V:";
/// path separator
pub const SEPARATOR: char = '\\';

/// Splits a path into its segments below the root.
///
/// `V:` and `V:\` both name the root and yield no segments; one trailing
/// separator is tolerated anywhere. Empty segments and NUL bytes are grammar
/// violations.
pub fn split(path: &str) -> Result<Vec<&str>> {
    let mut parts = path.split(SEPARATOR);
    if parts.next() != Some(ROOT_NAME) {
        return Err(VolumeError::InvalidPath(path.to_string()));
    }
    let mut segments: Vec<&str> = parts.collect();
    if segments.last() == Some(&"") {
        segments.pop();
    }
    if segments
        .iter()
        .any(|segment| segment.is_empty() || segment.contains('\0'))
    {
        return Err(VolumeError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Splits a path into the segments of its parent directory and its leaf
/// name. The bare root has no leaf.
pub fn parent_and_leaf(path: &str) -> Result<(Vec<&str>, &str)> {
    let mut segments = split(path)?;
    match segments.pop() {
        Some(leaf) => Ok((segments, leaf)),
        None => Err(VolumeError::InvalidPath(path.to_string())),
    }
}

/// Canonical display form of a segment list: `V:\` for the root, otherwise
/// `V:` with one separator before every segment.
pub fn display(segments: &[&str]) -> String {
    if segments.is_empty() {
        return format!("{}{}", ROOT_NAME, SEPARATOR);
    }
    let mut path = String::from(ROOT_NAME);
    for segment in segments {
        path.push(SEPARATOR);
        path.push_str(segment);
    }
    path
}

/// Appends a child name to an already canonical directory path.
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with(SEPARATOR) {
        format!("{}{}", parent, name)
    } else {
        format!("{}{}{}", parent, SEPARATOR, name)
    }
}

/// A usable child name: non-empty, NUL free and within the name field.
pub fn validate_name(name: &str, geometry: &Geometry) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(VolumeError::InvalidPath(name.to_string()));
    }
    if name.len() > geometry.max_name_length() {
        return Err(VolumeError::NameTooLong {
            name: name.to_string(),
            limit: geometry.max_name_length(),
        });
    }
    Ok(())
}
