//! Coding path: the key/index trail from the root value to the current
//! container, carried by every error for diagnosis.

use std::fmt;

/// One step of a coding path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEntry {
    Key(String),
    Index(usize),
}

/// Ordered trail of [`PathEntry`] steps. Used only for error context, never
/// for control flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodingPath(Vec<PathEntry>);

impl CodingPath {
    pub fn root() -> Self {
        CodingPath(Vec::new())
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn child_key(&self, key: &str) -> Self {
        let mut entries = self.0.clone();
        entries.push(PathEntry::Key(key.to_owned()));
        CodingPath(entries)
    }

    pub(crate) fn child_index(&self, index: usize) -> Self {
        let mut entries = self.0.clone();
        entries.push(PathEntry::Index(index));
        CodingPath(entries)
    }
}

impl fmt::Display for CodingPath {
    /// Renders as `$`, `$.user.tags[3]`, etc.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for entry in &self.0 {
            match entry {
                PathEntry::Key(key) => write!(f, ".{key}")?,
                PathEntry::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
