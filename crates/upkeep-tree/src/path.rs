//! Tree-relative path normalization.

use std::path::{Component, Path};

use crate::error::{TreeError, TreeResult};

/// Normalize a tree-relative path to `/`-separated form.
///
/// Backslashes are treated as separators, `.` segments are dropped, and
/// anything that would climb out of the tree (`..`, a root, a drive prefix)
/// is rejected.
pub fn normalize(rel: &str) -> TreeResult<String> {
    let unified = rel.replace('\\', "/");
    let mut parts = Vec::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(TreeError::OutsideTree(rel.to_string()))
            }
        }
    }
    Ok(parts.join("/"))
}

/// Last segment of a normalized path.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
