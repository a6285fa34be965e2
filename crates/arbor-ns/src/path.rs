//! Slash-separated namespace paths and entry-name rules.
//!
//! Paths are split on `/` with empty fragments dropped, so `""`, `"/"` and
//! `"//"` all name the root, and `"a//b/"` is the same as `"/a/b"`.
//!
//! Entry names created in a directory must be non-empty, must not contain
//! `/` or NUL, and must not be `.` or `..`.

use std::fmt;

use arbor_store::TreeEntry;

use crate::error::{NamespaceError, NamespaceResult};

/// A parsed namespace path: the list of names walked from the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NsPath {
    components: Vec<String>,
}

impl NsPath {
    pub fn parse(path: &str) -> Self {
        Self {
            components: path
                .split('/')
                .filter(|frag| !frag.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The parent's components and the final name; `None` for the root.
    pub fn split_last(&self) -> Option<(&[String], &str)> {
        self.components
            .split_last()
            .map(|(name, parent)| (parent, name.as_str()))
    }

    /// The path made of the first `len` components, rendered for messages.
    pub fn display_prefix(&self, len: usize) -> String {
        render(&self.components[..len.min(self.components.len())])
    }
}

fn render(components: &[String]) -> String {
    format!("/{}", components.join("/"))
}

impl fmt::Display for NsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.components))
    }
}

impl From<&str> for NsPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

/// Check that `name` may be used as a directory entry.
pub fn validate_name(name: &str) -> NamespaceResult<()> {
    match TreeEntry::invalid_name_reason(name) {
        Some(reason) => Err(NamespaceError::InvalidPath {
            path: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
