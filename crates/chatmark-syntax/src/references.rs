//! Link reference definitions for `[text][label]` and `[label]` links.
//!
//! The parser never reads definitions out of the message itself; callers
//! that want reference links supply the table up front.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::token::SourceLocation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl LinkReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            location: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Label → reference table. Labels match case-insensitively, ignoring
/// surrounding whitespace and the width of inner whitespace runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReferences {
    entries: HashMap<String, LinkReference>,
}

impl LinkReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: &str, reference: LinkReference) -> Option<LinkReference> {
        self.entries.insert(normalize_label(label), reference)
    }

    pub fn get(&self, label: &str) -> Option<&LinkReference> {
        self.entries.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, LinkReference)> for LinkReferences {
    fn from_iter<I: IntoIterator<Item = (S, LinkReference)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (label, reference) in iter {
            table.insert(label.as_ref(), reference);
        }
        table
    }
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
