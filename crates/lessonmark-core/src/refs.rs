//! Link and image reference definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::escape::normalize_ref_label;

/// Target of a `[label]: href "title"` definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefDef {
    /// Link destination, as written.
    pub href: String,
    /// Optional title; empty when absent.
    pub title: String,
}

impl RefDef {
    pub fn new(href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: title.into(),
        }
    }
}

/// Reference definitions keyed by normalized label.
///
/// Keys are always produced by [`normalize_ref_label`], so lookups ignore
/// case and whitespace differences.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefDefs {
    defs: BTreeMap<String, RefDef>,
}

impl RefDefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `label`, replacing any earlier definition of the same label.
    pub fn insert(&mut self, label: &str, def: RefDef) {
        self.defs.insert(normalize_ref_label(label), def);
    }

    /// Resolve a label as written in the text.
    pub fn get(&self, label: &str) -> Option<&RefDef> {
        self.defs.get(&normalize_ref_label(label))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Iterate over `(normalized label, definition)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RefDef)> {
        self.defs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Outer definitions with `inner` laid on top; inner wins on collision.
    pub fn overlay(outer: &RefDefs, inner: &RefDefs) -> RefDefs {
        let mut merged = outer.clone();
        merged
            .defs
            .extend(inner.defs.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}
