//! Entity categories.
//!
//! The detection model returns free-text labels. Known labels map onto a
//! closed set; anything else is kept as `Other` so new categories never
//! break the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Person,
    Email,
    Phone,
    Iban,
    Bic,
    Address,
    IdNumber,
    Company,
    Project,
    Product,
    Financial,
    Technical,
    Client,
    Health,
    DateOfBirth,
    Strategy,
    Other(String),
}

impl Category {
    /// Map a model-supplied label onto a category.
    ///
    /// The label is normalized to the placeholder alphabet first, so
    /// `"date of birth"` and `"DATE_OF_BIRTH"` land on the same variant.
    pub fn from_label(label: &str) -> Self {
        let code = normalize_label(label);
        match code.as_str() {
            "PERSON" | "NAME" | "PERSON_NAME" => Category::Person,
            "EMAIL" | "E_MAIL" | "EMAIL_ADDRESS" => Category::Email,
            "PHONE" | "PHONE_NUMBER" | "TELEPHONE" => Category::Phone,
            "IBAN" | "IBAN_BIC" => Category::Iban,
            "BIC" => Category::Bic,
            "ADDRESS" => Category::Address,
            "ID_NUMBER" => Category::IdNumber,
            "COMPANY" | "ORGANIZATION" => Category::Company,
            "PROJECT" => Category::Project,
            "PRODUCT" => Category::Product,
            "FINANCIAL" => Category::Financial,
            "TECHNICAL" => Category::Technical,
            "CLIENT" | "CUSTOMER" => Category::Client,
            "HEALTH" => Category::Health,
            "DATE_OF_BIRTH" => Category::DateOfBirth,
            "STRATEGY" => Category::Strategy,
            _ => Category::Other(code),
        }
    }

    /// Category code as used inside placeholder tokens
    pub fn code(&self) -> &str {
        match self {
            Category::Person => "PERSON",
            Category::Email => "EMAIL",
            Category::Phone => "PHONE",
            Category::Iban => "IBAN",
            Category::Bic => "BIC",
            Category::Address => "ADDRESS",
            Category::IdNumber => "ID_NUMBER",
            Category::Company => "COMPANY",
            Category::Project => "PROJECT",
            Category::Product => "PRODUCT",
            Category::Financial => "FINANCIAL",
            Category::Technical => "TECHNICAL",
            Category::Client => "CLIENT",
            Category::Health => "HEALTH",
            Category::DateOfBirth => "DATE_OF_BIRTH",
            Category::Strategy => "STRATEGY",
            Category::Other(code) => code,
        }
    }

    /// Human-readable label for entity summaries
    pub fn display_label(&self) -> &str {
        match self {
            Category::Person => "Personen",
            Category::Email => "E-Mail-Adressen",
            Category::Phone => "Telefonnummern",
            Category::Iban => "Bankverbindungen",
            Category::Bic => "BIC-Codes",
            Category::Address => "Adressen",
            Category::IdNumber => "ID-Nummern",
            Category::Company => "Firmen",
            Category::Project => "Projekte",
            Category::Product => "Produkte",
            Category::Financial => "Finanzdaten",
            Category::Technical => "Technische Daten",
            Category::Client => "Kunden",
            Category::Health => "Gesundheitsdaten",
            Category::DateOfBirth => "Geburtsdaten",
            Category::Strategy => "Strategien",
            Category::Other(code) => code,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

/// Upper-case the label and replace everything outside `[A-Z_]` with `_`.
/// Empty or all-underscore results become `OTHER`.
pub fn normalize_label(label: &str) -> String {
    let code: String = label
        .trim()
        .chars()
        .map(|c| {
            let u = c.to_ascii_uppercase();
            if u.is_ascii_uppercase() {
                u
            } else {
                '_'
            }
        })
        .collect();

    if code.chars().all(|c| c == '_') {
        "OTHER".to_string()
    } else {
        code
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.code().to_string()
    }
}
