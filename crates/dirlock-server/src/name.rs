//! Lock name validation and lock file paths.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// File extension of on-disk lock files.
pub const LOCK_EXT: &str = ".lck";

static VALID_LOCK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.\-]+$").expect("invalid lock name regex"));

/// Reports whether `name` is an acceptable lock name.
///
/// The pattern is the full validation surface: path separators,
/// whitespace, underscores and control characters are all rejected, as is
/// the empty string.
pub fn is_valid_lock_name(name: &str) -> bool {
    VALID_LOCK_NAME.is_match(name)
}

/// Path of the lock file backing `name` inside `directory`.
pub fn lock_file_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{name}{LOCK_EXT}"))
}
