//! Path parsing and normalization.
//!
//! Paths look like `/users/alice/settings`. Trailing separators are
//! stripped, so `/users/` and `/users` name the same node, and an empty
//! string (or `/`) names the root.

use crate::error::{Result, StoreError};
use std::fmt;
use std::str::FromStr;

/// The path separator, also the prefix reserved for child nodes.
pub const SEPARATOR: char = '/';

/// A normalized path: an ordered list of non-empty segments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse and normalize a path string.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim_end_matches(SEPARATOR);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let rest = trimmed
            .strip_prefix(SEPARATOR)
            .ok_or_else(|| StoreError::InvalidPath(input.to_string()))?;

        let mut segments = Vec::new();
        for segment in rest.split(SEPARATOR) {
            if segment.is_empty() {
                return Err(StoreError::InvalidPath(input.to_string()));
            }
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    /// Build a path directly from segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || s.contains(SEPARATOR))
        {
            return Err(StoreError::InvalidPath(bad.clone()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments (the root has depth 0).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The final segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    /// Append one segment.
    pub fn child(&self, segment: &str) -> Result<NodePath> {
        if segment.is_empty() || segment.contains(SEPARATOR) {
            return Err(StoreError::InvalidPath(segment.to_string()));
        }
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Strict ancestors, nearest first, ending with the root.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.parent(),
        }
    }

    /// True if `self` is `other` or lies beneath it.
    pub fn starts_with(&self, other: &NodePath) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

/// Iterator over the strict ancestors of a path.
pub struct Ancestors {
    next: Option<NodePath>,
}

impl Iterator for Ancestors {
    type Item = NodePath;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "{}", SEPARATOR);
        }
        for segment in &self.segments {
            write!(f, "{}{}", SEPARATOR, segment)?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
