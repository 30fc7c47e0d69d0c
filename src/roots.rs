//! Ordered registry of named physical storage roots.
//!
//! Detector data is written under one mount and routinely relocated to
//! another after acquisition. The registry maps an absolute path back to
//! the root it was written under and rewrites it against the root it should
//! be read from now. Prefixes are compared as exact strings, no path
//! normalization, so the suffix round-trips byte-for-byte, separators
//! included. Matching is first-match over registration order.

use serde::{Deserialize, Serialize};

use crate::error::{HandlerError, Result};

/// A named absolute path prefix, e.g. `gpfs -> /GPFS/xf16id/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootEntry {
    /// Symbolic name the root is referred to by.
    pub name: String,
    /// Absolute path prefix, stored verbatim.
    pub prefix: String,
}

/// Outcome of a successful prefix match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMatch<'a> {
    /// Name of the root whose prefix matched.
    pub name: &'a str,
    /// The matched prefix.
    pub prefix: &'a str,
    /// The remainder of the path after the matched prefix.
    pub suffix: &'a str,
}

/// Ordered set of storage roots.
///
/// Overlapping prefixes are resolved by registration order, not by longest
/// prefix: the first registered root that matches wins. Deployments keep the
/// canonical write root first, followed by any relocated read roots.
#[derive(Debug, Clone, Default)]
pub struct RootRegistry {
    entries: Vec<RootEntry>,
}

impl RootRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from pre-assembled entries, preserving their order.
    pub fn from_entries(entries: Vec<RootEntry>) -> Self {
        Self { entries }
    }

    /// Append a root. Order of registration is the order of matching.
    pub fn register(&mut self, name: impl Into<String>, prefix: impl Into<String>) {
        self.entries.push(RootEntry {
            name: name.into(),
            prefix: prefix.into(),
        });
    }

    /// Look up a root by name.
    pub fn get(&self, name: &str) -> Option<&RootEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Registered entries in matching order.
    pub fn entries(&self) -> &[RootEntry] {
        &self.entries
    }

    /// Find the first registered root whose prefix starts `path`.
    ///
    /// # Errors
    ///
    /// [`HandlerError::UnknownRoot`] when no prefix matches. Callers must
    /// treat this as a fatal configuration error, not a per-frame one.
    pub fn match_path<'a>(&'a self, path: &'a str) -> Result<RootMatch<'a>> {
        for entry in &self.entries {
            if let Some(suffix) = path.strip_prefix(entry.prefix.as_str()) {
                return Ok(RootMatch {
                    name: &entry.name,
                    prefix: &entry.prefix,
                    suffix,
                });
            }
        }
        Err(HandlerError::UnknownRoot {
            path: path.to_string(),
        })
    }

    /// Rewrite `path` so it points under the root named `target_name`,
    /// preserving the suffix after the matched prefix exactly.
    ///
    /// # Errors
    ///
    /// [`HandlerError::UnknownRoot`] when `path` matches no registered
    /// prefix, [`HandlerError::UnknownRootName`] when `target_name` is not
    /// registered.
    pub fn rewrite(&self, path: &str, target_name: &str) -> Result<String> {
        let matched = self.match_path(path)?;
        let target = self.get(target_name).ok_or_else(|| HandlerError::UnknownRootName {
            name: target_name.to_string(),
        })?;
        Ok(format!("{}{}", target.prefix, matched.suffix))
    }
}
