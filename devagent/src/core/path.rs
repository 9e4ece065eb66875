//! Lexical path handling for the generated project root.
//!
//! Nothing here touches the filesystem: symlinks are not followed, so callers
//! canonicalize the root once up front.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("attempt to access '{requested}' outside project root {}", root.display())]
pub struct PathEscapeError {
    pub requested: String,
    pub root: PathBuf,
}

/// Resolve `requested` against `root`, rejecting anything that lands outside it.
///
/// Relative paths are joined onto `root`. Absolute paths are accepted only when
/// they already point inside `root`. `.` segments are dropped and `..` pops one
/// component.
pub fn resolve_in_project(root: &Path, requested: &str) -> Result<PathBuf, PathEscapeError> {
    let requested_path = Path::new(requested);
    let mut resolved = if requested_path.is_absolute() {
        PathBuf::new()
    } else {
        root.to_path_buf()
    };

    for component in requested_path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => resolved.push(part),
        }
    }

    if !resolved.starts_with(root) {
        return Err(PathEscapeError {
            requested: requested.to_string(),
            root: root.to_path_buf(),
        });
    }
    Ok(resolved)
}

/// Render `path` relative to `root` with `/` separators (archive and UI form).
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
