//! Named entity types.

use serde::{Deserialize, Serialize};

/// A named entity span as produced by a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Surface text of the span
    pub text: String,

    /// Category label (e.g., "PERSON", "ORG")
    pub label: String,
}

impl EntitySpan {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// A ranked entity: unique text, first-seen label, occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub count: usize,
    pub label: String,

    /// Human-readable description of the label, if the label is known
    pub label_desc: Option<String>,
}

impl Entity {
    /// Create an entity with a count of one.
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            text: text.into(),
            count: 1,
            label_desc: describe_label(&label).map(str::to_string),
            label,
        }
    }
}

/// Describe an entity label (OntoNotes scheme plus MISC).
pub fn describe_label(label: &str) -> Option<&'static str> {
    let desc = match label {
        "PERSON" => "People, including fictional",
        "NORP" => "Nationalities or religious or political groups",
        "FAC" => "Buildings, airports, highways, bridges, etc.",
        "ORG" => "Companies, agencies, institutions, etc.",
        "GPE" => "Countries, cities, states",
        "LOC" => "Non-GPE locations, mountain ranges, bodies of water",
        "PRODUCT" => "Objects, vehicles, foods, etc. (not services)",
        "EVENT" => "Named hurricanes, battles, wars, sports events, etc.",
        "WORK_OF_ART" => "Titles of books, songs, etc.",
        "LAW" => "Named documents made into laws.",
        "LANGUAGE" => "Any named language",
        "DATE" => "Absolute or relative dates or periods",
        "TIME" => "Times smaller than a day",
        "PERCENT" => "Percentage, including \"%\"",
        "MONEY" => "Monetary values, including unit",
        "QUANTITY" => "Measurements, as of weight or distance",
        "ORDINAL" => "\"first\", \"second\", etc.",
        "CARDINAL" => "Numerals that do not fall under another type",
        "MISC" => "Miscellaneous entities, e.g. events, nationalities, products or works of art",
        _ => return None,
    };
    Some(desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_serializes_label_desc() {
        let entity = Entity::new("Minneapolis", "GPE");
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["text"], "Minneapolis");
        assert_eq!(json["count"], 1);
        assert_eq!(json["label"], "GPE");
        assert_eq!(json["label_desc"], "Countries, cities, states");
    }

    #[test]
    fn test_unknown_label_has_no_description() {
        let entity = Entity::new("thing", "WIDGET");
        assert_eq!(entity.label_desc, None);
        assert!(serde_json::to_value(&entity).unwrap()["label_desc"].is_null());
    }
}
