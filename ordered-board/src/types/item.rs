//! The item being placed on the board.

use super::ids::{ItemId, PartitionKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Domain payload of an item: title, priority, story points, assignee,
/// status and whatever else the server sends. Opaque to the engine except
/// for discriminator attributes.
pub type Attributes = Map<String, Value>;

/// A backlog item or board card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedItem {
    pub id: ItemId,
    /// Cached placement. Partition membership is authoritative; the engine
    /// keeps this field in step with it.
    pub partition_key: PartitionKey,
    #[serde(default)]
    pub attributes: Attributes,
}

impl OrderedItem {
    /// Create an item with no attributes
    pub fn new(id: impl Into<ItemId>, partition_key: impl Into<PartitionKey>) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key.into(),
            attributes: Attributes::new(),
        }
    }

    /// Set one attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Replace all attributes
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Look up an attribute
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Read an attribute as a number.
    ///
    /// Numeric strings such as `"5"` count, since server payloads are not
    /// always consistent about it. Anything else, including `"NaN"` and
    /// `"inf"`, is `None`.
    pub fn number(&self, name: &str) -> Option<f64> {
        let value = match self.attributes.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_creation() {
        let item = OrderedItem::new("a", "product").with_attribute("title", "Login page");
        assert_eq!(item.id.as_str(), "a");
        assert_eq!(item.partition_key.as_str(), "product");
        assert_eq!(item.attribute("title"), Some(&json!("Login page")));
    }

    #[test]
    fn test_number_attribute() {
        let item = OrderedItem::new("a", "sprint")
            .with_attribute("storyPoints", 5)
            .with_attribute("estimate", "3.5")
            .with_attribute("title", "not a number");

        assert_eq!(item.number("storyPoints"), Some(5.0));
        assert_eq!(item.number("estimate"), Some(3.5));
        assert_eq!(item.number("title"), None);
        assert_eq!(item.number("missing"), None);
    }

    #[test]
    fn test_non_finite_strings_are_not_numbers() {
        let item = OrderedItem::new("a", "sprint")
            .with_attribute("nan", "NaN")
            .with_attribute("inf", "inf")
            .with_attribute("negInf", "-infinity")
            .with_attribute("padded", " 8 ");

        assert_eq!(item.number("nan"), None);
        assert_eq!(item.number("inf"), None);
        assert_eq!(item.number("negInf"), None);
        assert_eq!(item.number("padded"), Some(8.0));
    }

    #[test]
    fn test_item_serialization_uses_camel_case() {
        let item = OrderedItem::new("a", "todo");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["partitionKey"], "todo");
        assert!(value["attributes"].as_object().unwrap().is_empty());
    }
}
