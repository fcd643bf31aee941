//! Filesystem path validation (path-traversal protection)

use crate::security::{BlockReason, Verdict};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Checks that `path` resolves inside one of `allowed_roots`
///
/// The path is made absolute against the current directory and resolved one
/// component at a time: every existing component is canonicalized before the
/// next `..` is applied, so `..` after a symlink climbs out of the link's
/// target. Components that do not exist yet are
/// resolved lexically. Roots are canonicalized the same way.
///
/// # Examples
///
/// ```
/// use doc_harvest::security::check_output_path;
///
/// let root = std::env::temp_dir();
/// let escape = root.join("../../etc/passwd");
/// assert!(check_output_path(&escape, &[root.clone()]).is_blocked());
/// assert!(check_output_path(&root.join("out.json"), &[root]).is_allowed());
/// ```
pub fn check_output_path(path: &Path, allowed_roots: &[PathBuf]) -> Verdict {
    match resolve_output_path(path, allowed_roots) {
        Ok(_) => Verdict::Allow,
        Err(reason) => Verdict::Block(reason),
    }
}

/// Like [`check_output_path`], but returns the resolved path
///
/// Callers must write to the returned path, not to the path they passed in.
pub fn resolve_output_path(
    path: &Path,
    allowed_roots: &[PathBuf],
) -> Result<PathBuf, BlockReason> {
    let resolved = match resolve_path(path) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::debug!("Failed to resolve {}: {}", path.display(), e);
            return Err(BlockReason::PathOutsideRoots(path.to_path_buf()));
        }
    };

    let inside = allowed_roots
        .iter()
        .filter_map(|root| resolve_path(root).ok())
        .any(|root| resolved.starts_with(&root));

    if inside {
        Ok(resolved)
    } else {
        Err(BlockReason::PathOutsideRoots(resolved))
    }
}

/// Resolves a possibly non-existent path to an absolute canonical form
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                match std::fs::symlink_metadata(&resolved) {
                    Ok(_) => resolved = resolved.canonicalize()?,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(resolved)
}

/// The default allowed roots: current directory and user home
pub fn default_allowed_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(home) = dirs::home_dir() {
        roots.push(home);
    }
    roots
}
