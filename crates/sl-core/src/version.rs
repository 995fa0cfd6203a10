//! Migration versions and their ordering.
//!
//! A version is the file name of a migration script with its extension
//! removed, e.g. `001_init` for `001_init.sql`. Versions sort by their
//! leading decimal number first and by plain string comparison second, so
//! `9_a` runs before `10_a` even though it sorts after it lexically.

use crate::newtype_string::define_newtype_string;
use std::cmp::Ordering;
use std::path::Path;

define_newtype_string! {
    /// Identity of a migration script, used as the ledger primary key.
    ///
    /// `Version` deliberately has no `Ord`: sort with [`compare_versions`].
    pub struct Version;
}

impl Version {
    /// Derive the version from a script path by stripping `extension`.
    ///
    /// Returns `None` when the file name is not UTF-8, does not carry the
    /// extension, or would leave an empty version (a file named `.sql`).
    pub fn from_script_path(path: &Path, extension: &str) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
        Self::try_new(stem)
    }

    /// The leading numeric prefix of this version; see [`numeric_prefix`].
    pub fn number(&self) -> u64 {
        numeric_prefix(&self.0)
    }
}

/// Parse the run of ASCII digits at the start of `version`.
///
/// Versions without a leading digit yield `0`. Digit runs too long for a
/// `u64` saturate at `u64::MAX` instead of wrapping.
pub fn numeric_prefix(version: &str) -> u64 {
    version
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, b| {
            acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
        })
}

/// Order two versions: numeric prefix ascending, then full string comparison.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    numeric_prefix(a)
        .cmp(&numeric_prefix(b))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
