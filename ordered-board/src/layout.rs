//! Board layouts: which partitions a view has, in what order, and which
//! item attribute each partition pins.
//!
//! Two layouts ship built in as YAML (`kanban` and `backlog`). Hosts with
//! custom workflows can parse their own with [`BoardLayout::from_yaml`].

use crate::error::{BoardError, Result};
use crate::types::{Attributes, PartitionKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

const KANBAN_YAML: &str = include_str!("builtin/kanban.yaml");
const BACKLOG_YAML: &str = include_str!("builtin/backlog.yaml");

/// An attribute whose value is tied to partition membership.
///
/// Moving an item into a partition with a discriminator sets the attribute
/// in the same mutation as the placement change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    pub attribute: String,
    pub value: Value,
}

impl Discriminator {
    /// Create a discriminator binding
    pub fn new(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Set the bound attribute on `attributes`.
    ///
    /// Returns the change that was made, or `None` if the attribute already
    /// held the bound value.
    pub fn apply(&self, attributes: &mut Attributes) -> Option<(String, Value)> {
        if attributes.get(&self.attribute) == Some(&self.value) {
            return None;
        }
        attributes.insert(self.attribute.clone(), self.value.clone());
        Some((self.attribute.clone(), self.value.clone()))
    }
}

/// One partition of a layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionDef {
    pub key: PartitionKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,
}

impl PartitionDef {
    /// Create a partition definition without a discriminator
    pub fn new(key: impl Into<PartitionKey>) -> Self {
        Self {
            key: key.into(),
            label: None,
            discriminator: None,
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Bind an attribute to membership in this partition
    pub fn with_discriminator(
        mut self,
        attribute: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.discriminator = Some(Discriminator::new(attribute, value));
        self
    }
}

/// The fixed set of partitions for one view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardLayout {
    pub name: String,
    pub partitions: Vec<PartitionDef>,
}

impl BoardLayout {
    /// Create a layout from partition definitions, validating it
    pub fn new(name: impl Into<String>, partitions: Vec<PartitionDef>) -> Result<Self> {
        let layout = Self {
            name: name.into(),
            partitions,
        };
        layout.check()?;
        Ok(layout)
    }

    /// Parse a layout from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let layout: BoardLayout = serde_yaml_ng::from_str(yaml)?;
        layout.check()?;
        Ok(layout)
    }

    /// The five-column kanban layout. Each column pins `status` to its key.
    pub fn kanban() -> Self {
        Self::builtin(KANBAN_YAML)
    }

    /// The product/sprint backlog layout. `sprint` pins `sprintId` to
    /// `sprint_id`; `product` clears it.
    pub fn backlog(sprint_id: impl Into<Value>) -> Self {
        let mut layout = Self::builtin(BACKLOG_YAML);
        let sprint_id = sprint_id.into();
        for def in &mut layout.partitions {
            if def.key.as_str() == "sprint" {
                if let Some(disc) = def.discriminator.as_mut() {
                    disc.value = sprint_id.clone();
                }
            }
        }
        layout
    }

    fn builtin(yaml: &str) -> Self {
        // Built-in layouts are covered by tests; a parse failure is a build defect.
        serde_yaml_ng::from_str(yaml).expect("invalid built-in layout")
    }

    /// Look up a partition definition
    pub fn partition(&self, key: &PartitionKey) -> Option<&PartitionDef> {
        self.partitions.iter().find(|p| &p.key == key)
    }

    /// Discriminator bound to a partition, if any
    pub fn discriminator(&self, key: &PartitionKey) -> Option<&Discriminator> {
        self.partition(key).and_then(|p| p.discriminator.as_ref())
    }

    /// Partition keys in display order
    pub fn keys(&self) -> impl Iterator<Item = &PartitionKey> {
        self.partitions.iter().map(|p| &p.key)
    }

    fn check(&self) -> Result<()> {
        if self.partitions.is_empty() {
            return Err(BoardError::invalid_layout(format!(
                "layout '{}' has no partitions",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for def in &self.partitions {
            if !seen.insert(&def.key) {
                return Err(BoardError::invalid_layout(format!(
                    "partition '{}' declared twice",
                    def.key
                )));
            }
        }
        Ok(())
    }
}
