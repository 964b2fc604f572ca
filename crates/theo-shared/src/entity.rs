//! Detected sensitive entities.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::category::Category;
use crate::placeholder::Placeholder;

/// A detected sensitive span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Exact substring of the source text, or a sentinel when unknown
    pub original: String,
    pub masked: Placeholder,
    pub category: Category,
    pub confidence: f32,
    /// False for placeholders recovered without their original value
    pub resolved: bool,
}

impl Entity {
    pub fn new(original: &str, masked: Placeholder, category: Category, confidence: f32) -> Self {
        Self {
            original: original.to_string(),
            masked,
            category,
            confidence: confidence.clamp(0.0, 1.0),
            resolved: true,
        }
    }

    /// Placeholder-only entity for a token whose original is unknown.
    ///
    /// The sentinel (`<person_1>`) is for display only and must never be
    /// substituted back into text.
    pub fn sentinel(masked: Placeholder, confidence: f32) -> Self {
        let original = sentinel_for(&masked);
        Self {
            original,
            category: Category::from_label(masked.category()),
            masked,
            confidence: confidence.clamp(0.0, 1.0),
            resolved: false,
        }
    }
}

/// Sentinel text shown in place of an unknown original
pub fn sentinel_for(placeholder: &Placeholder) -> String {
    format!(
        "<{}_{}>",
        placeholder.category().to_lowercase(),
        placeholder.index()
    )
}

/// Entities grouped by category.
///
/// Categories keep the order in which they were first seen, and each group
/// keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedEntities {
    groups: Vec<(Category, Vec<Entity>)>,
}

impl DetectedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: Entity) {
        match self.groups.iter_mut().find(|(c, _)| *c == entity.category) {
            Some((_, list)) => list.push(entity),
            None => self.groups.push((entity.category.clone(), vec![entity])),
        }
    }

    pub fn get(&self, category: &Category) -> Option<&[Entity]> {
        self.groups
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, list)| list.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, &[Entity])> {
        self.groups.iter().map(|(c, list)| (c, list.as_slice()))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.groups.iter().flat_map(|(_, list)| list.iter())
    }

    pub fn categories(&self) -> Vec<&Category> {
        self.groups.iter().map(|(c, _)| c).collect()
    }

    /// Total number of entities across all categories
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, list)| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for DetectedEntities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (category, list) in &self.groups {
            map.serialize_entry(category.code(), list)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ph(token: &str) -> Placeholder {
        Placeholder::parse(token).unwrap()
    }

    #[test]
    fn test_grouping_preserves_order() {
        let mut detected = DetectedEntities::new();
        detected.push(Entity::new("Hans", ph("[PERSON_1]"), Category::Person, 0.9));
        detected.push(Entity::new("a@b.de", ph("[EMAIL_1]"), Category::Email, 0.99));
        detected.push(Entity::new("Eva", ph("[PERSON_2]"), Category::Person, 0.8));

        assert_eq!(detected.len(), 3);
        assert_eq!(detected.categories(), vec![&Category::Person, &Category::Email]);
        let people: Vec<&str> = detected
            .get(&Category::Person)
            .unwrap()
            .iter()
            .map(|e| e.original.as_str())
            .collect();
        assert_eq!(people, vec!["Hans", "Eva"]);
    }

    #[test]
    fn test_sentinel_entity() {
        let e = Entity::sentinel(ph("[COMPANY_2]"), 0.8);
        assert_eq!(e.original, "<company_2>");
        assert_eq!(e.category, Category::Company);
        assert!(!e.resolved);
    }

    #[test]
    fn test_confidence_clamped() {
        let e = Entity::new("x", ph("[PERSON_1]"), Category::Person, 1.7);
        assert_eq!(e.confidence, 1.0);
    }

    #[test]
    fn test_serialize_as_ordered_map() {
        let mut detected = DetectedEntities::new();
        detected.push(Entity::new("Hans", ph("[PERSON_1]"), Category::Person, 0.9));
        let json = serde_json::to_value(&detected).unwrap();
        assert_eq!(json["PERSON"][0]["masked"], "[PERSON_1]");
    }
}
