//! Placeholder → original mapping and the unmasking restorer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::PlaceholderError;
use crate::placeholder::{Placeholder, PLACEHOLDER_PATTERN};

/// Mapping built by one masking operation.
///
/// Resolved entries carry the real original value. Unresolved placeholders
/// were recovered from a truncated detection response and have no known
/// original; the restorer leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskMapping {
    resolved: BTreeMap<Placeholder, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    unresolved: BTreeSet<Placeholder>,
}

impl MaskMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a placeholder to its original value.
    ///
    /// Rebinding the same pair is a no-op. A placeholder cannot point at two
    /// values and a value cannot own two placeholders.
    pub fn insert(&mut self, placeholder: Placeholder, original: &str) -> Result<(), PlaceholderError> {
        if let Some(existing) = self.resolved.get(&placeholder) {
            if existing == original {
                return Ok(());
            }
            return Err(PlaceholderError::Conflict(placeholder.token()));
        }
        if let Some(owner) = self.placeholder_for(original) {
            return Err(PlaceholderError::DuplicateOriginal {
                existing: owner.token(),
                incoming: placeholder.token(),
            });
        }
        self.unresolved.remove(&placeholder);
        self.resolved.insert(placeholder, original.to_string());
        Ok(())
    }

    /// Record a placeholder whose original is unknown
    pub fn mark_unresolved(&mut self, placeholder: Placeholder) {
        if !self.resolved.contains_key(&placeholder) {
            self.unresolved.insert(placeholder);
        }
    }

    /// Merge entries recovered from another partial mapping.
    ///
    /// Resolved entries of `other` upgrade matching unresolved placeholders.
    /// Conflicting entries are skipped and returned.
    pub fn merge(&mut self, other: MaskMapping) -> Vec<PlaceholderError> {
        let mut rejected = Vec::new();
        for (placeholder, original) in other.resolved {
            if let Err(e) = self.insert(placeholder, &original) {
                rejected.push(e);
            }
        }
        for placeholder in other.unresolved {
            self.mark_unresolved(placeholder);
        }
        rejected
    }

    pub fn get(&self, placeholder: &Placeholder) -> Option<&str> {
        self.resolved.get(placeholder).map(String::as_str)
    }

    /// Look up by raw token text, e.g. `"[PERSON_1]"`
    pub fn get_token(&self, token: &str) -> Option<&str> {
        Placeholder::parse(token).ok().and_then(|p| self.get(&p))
    }

    pub fn placeholder_for(&self, original: &str) -> Option<&Placeholder> {
        self.resolved
            .iter()
            .find(|(_, value)| value.as_str() == original)
            .map(|(p, _)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Placeholder, &str)> {
        self.resolved.iter().map(|(p, v)| (p, v.as_str()))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Placeholder> {
        self.unresolved.iter()
    }

    pub fn contains(&self, placeholder: &Placeholder) -> bool {
        self.resolved.contains_key(placeholder) || self.unresolved.contains(placeholder)
    }

    /// Number of resolved entries
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.unresolved.is_empty()
    }

    /// True when some placeholders have no known original
    pub fn is_degraded(&self) -> bool {
        !self.unresolved.is_empty()
    }

    /// Resolved entries as plain token → value pairs
    pub fn to_token_map(&self) -> BTreeMap<String, String> {
        self.resolved
            .iter()
            .map(|(p, v)| (p.token(), v.clone()))
            .collect()
    }

    pub fn restore(&self, text: &str) -> String {
        unmask(text, self)
    }
}

/// Replace every resolved placeholder in `text` with its original value.
///
/// Single left-to-right pass over placeholder tokens: restored values are
/// never rescanned, so the result does not depend on key order and a second
/// application is a no-op.
pub fn unmask(text: &str, mapping: &MaskMapping) -> String {
    if mapping.resolved.is_empty() {
        return text.to_string();
    }

    PLACEHOLDER_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            let token = &caps[0];
            match mapping.get_token(token) {
                Some(original) => original.to_string(),
                None => token.to_string(),
            }
        })
        .into_owned()
}
