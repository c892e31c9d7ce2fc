// src/watch/patterns.rs

//! Glob compilation and filesystem expansion.
//!
//! Discovery is polling-based: every tick each pattern is re-expanded
//! against the filesystem. A pattern is split into a literal base directory
//! and a glob remainder; the base is walked and candidate paths are matched
//! against the compiled remainder. `*` does not cross path separators
//! (use `**` for recursive matches), mirroring conventional shell globbing.

use std::collections::BTreeSet;
use std::path::PathBuf;

use globset::{Glob, GlobBuilder, GlobMatcher};
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{MonitorError, Result};

const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}'];

/// Compile a single glob pattern, with `*` stopping at path separators.
///
/// Used both for eager validation at registration time and for matching
/// during expansion.
pub(crate) fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| MonitorError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Expand a set of glob patterns to the files currently matching on the
/// filesystem. Paths are canonicalised so the same file discovered through
/// different spellings dedupes to one entry.
pub(crate) fn expand(patterns: &[String]) -> Result<BTreeSet<PathBuf>> {
    let mut out = BTreeSet::new();
    for pattern in patterns {
        expand_one(pattern, &mut out)?;
    }
    Ok(out)
}

fn expand_one(pattern: &str, out: &mut BTreeSet<PathBuf>) -> Result<()> {
    let (base, remainder) = split_pattern(pattern);

    let Some(remainder) = remainder else {
        // No metacharacters at all: the pattern is a literal path.
        if base.is_file() {
            if let Ok(canonical) = base.canonicalize() {
                out.insert(canonical);
            }
        }
        return Ok(());
    };

    let matcher = compile_remainder(pattern, &remainder)?;

    if !base.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(&base)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&base) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if matcher.is_match(relative.as_str()) {
            match entry.path().canonicalize() {
                Ok(canonical) => {
                    out.insert(canonical);
                }
                // The entry vanished between the walk and the stat.
                Err(err) => debug!(path = ?entry.path(), error = %err, "skipping match"),
            }
        }
    }

    Ok(())
}

fn compile_remainder(pattern: &str, remainder: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(remainder)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| MonitorError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Split a pattern into its longest literal directory prefix and the glob
/// remainder. Returns `None` for the remainder when the pattern contains no
/// metacharacters.
fn split_pattern(pattern: &str) -> (PathBuf, Option<String>) {
    let mut base = PathBuf::new();
    if pattern.starts_with('/') {
        base.push("/");
    }

    let mut remainder: Vec<&str> = Vec::new();
    for part in pattern.split('/') {
        if part.is_empty() {
            continue;
        }
        if !remainder.is_empty() || part.contains(GLOB_META) {
            remainder.push(part);
        } else {
            base.push(part);
        }
    }

    if remainder.is_empty() {
        (base, None)
    } else {
        if base.as_os_str().is_empty() {
            base.push(".");
        }
        (base, Some(remainder.join("/")))
    }
}
