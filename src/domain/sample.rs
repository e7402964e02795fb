// ============================================================
// Layer 3: Labelled Text
// ============================================================
// A raw example as read from disk, and the mapping between
// label names and the class indices the model predicts.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One raw labelled example, before cleaning or tokenisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledText {
    pub label: String,
    pub text: String,
}

impl LabeledText {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Sorted, de-duplicated label names. Class `i` is `names[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    /// Collect the distinct labels of a corpus in sorted order.
    pub fn from_samples(samples: &[LabeledText]) -> Self {
        let names: BTreeSet<&str> = samples.iter().map(|s| s.label.as_str()).collect();
        Self {
            names: names.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Class index of `label`, or an error for a label unseen at training time.
    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.names
            .binary_search_by(|n| n.as_str().cmp(label))
            .map_err(|_| anyhow!("unknown label '{label}' (known: {:?})", self.names))
    }
}
