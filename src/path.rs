//! Path argument validation.
//!
//! Every caller-facing operation checks its path arguments here before the
//! driver is touched. Only `dirname` is applied to paths; there is no other
//! normalization.

use std::path::Path;

use crate::FsError;

/// Fail with [`FsError::InvalidPath`] unless `path` begins with `/`.
pub fn validate(path: &Path) -> Result<(), FsError> {
    if path.as_os_str().as_encoded_bytes().first() == Some(&b'/') {
        Ok(())
    } else {
        Err(FsError::InvalidPath {
            path: path.to_path_buf(),
        })
    }
}

/// Validate several path arguments, reporting the first bad one.
pub fn validate_all(paths: &[&Path]) -> Result<(), FsError> {
    paths.iter().try_for_each(|p| validate(p))
}

/// Fail with [`FsError::Driver`] if `to` is `from` or lies beneath it.
///
/// Moving or copying a directory into its own subtree is rejected.
pub fn ensure_outside(from: &Path, to: &Path, operation: &'static str) -> Result<(), FsError> {
    if to.starts_with(from) {
        return Err(FsError::Driver(format!(
            "{operation}: cannot place {} inside itself at {}",
            from.display(),
            to.display()
        )));
    }
    Ok(())
}

/// Parent directory of `path`. The root is its own parent.
pub fn dirname(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}
