//! Placeholder token grammar.
//!
//! A placeholder is `[` + category (`[A-Z_]+`) + `_` + 1-based index + `]`,
//! for example `[PERSON_1]` or `[ID_NUMBER_2]`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::PlaceholderError;

/// Matches every placeholder-shaped token inside free text
pub static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Z_]+)_([0-9]+)\]").unwrap());

/// A validated `[CATEGORY_N]` token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Placeholder {
    category: String,
    index: u32,
}

impl Placeholder {
    pub fn new(category: &str, index: u32) -> Result<Self, PlaceholderError> {
        if category.is_empty() {
            return Err(PlaceholderError::EmptyCategory);
        }
        if !category.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            return Err(PlaceholderError::InvalidCategory(category.to_string()));
        }
        if index == 0 {
            return Err(PlaceholderError::ZeroIndex);
        }
        Ok(Self {
            category: category.to_string(),
            index,
        })
    }

    /// Parse a complete token. Surrounding whitespace is not accepted.
    pub fn parse(token: &str) -> Result<Self, PlaceholderError> {
        let caps = PLACEHOLDER_PATTERN
            .captures(token)
            .filter(|c| c.get(0).map(|m| m.as_str().len()) == Some(token.len()))
            .ok_or_else(|| PlaceholderError::Malformed(token.to_string()))?;

        let index = caps[2]
            .parse::<u32>()
            .map_err(|_| PlaceholderError::Malformed(token.to_string()))?;
        Self::new(&caps[1], index)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn token(&self) -> String {
        format!("[{}_{}]", self.category, self.index)
    }

    /// All distinct placeholders in `text`, in order of first appearance.
    pub fn find_all(text: &str) -> Vec<Placeholder> {
        let mut found: Vec<Placeholder> = Vec::new();
        for m in PLACEHOLDER_PATTERN.find_iter(text) {
            if let Ok(p) = Placeholder::parse(m.as_str()) {
                if !found.contains(&p) {
                    found.push(p);
                }
            }
        }
        found
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}_{}]", self.category, self.index)
    }
}

impl FromStr for Placeholder {
    type Err = PlaceholderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Placeholder::parse(s)
    }
}

impl TryFrom<String> for Placeholder {
    type Error = PlaceholderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Placeholder::parse(&value)
    }
}

impl From<Placeholder> for String {
    fn from(p: Placeholder) -> Self {
        p.token()
    }
}

/// Check whether a whole string is a single well-formed placeholder
pub fn is_placeholder(token: &str) -> bool {
    Placeholder::parse(token).is_ok()
}
