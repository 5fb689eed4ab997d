use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ValidationError;
use crate::format::{Format, FormatRegistry, FormatValue, RawValues};
use crate::path::ItemPath;
use crate::slots::{SlotItem, Slots};
use crate::values::Values;

/// A concrete block instance with every nested child fully resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTree {
    /// Explicit UI name. Untagged nodes are classified by structural probing.
    pub kind: Option<String>,
    pub values: Values,
    pub slots: Slots<DataTree>,
}

impl DataTree {
    pub fn new() -> Self {
        DataTree::default()
    }

    pub fn tagged(kind: &str) -> Self {
        DataTree {
            kind: Some(kind.to_string()),
            ..DataTree::default()
        }
    }

    pub fn value(mut self, field: &str, format: &Format, value: FormatValue) -> Self {
        self.values.insert(field, format.id, value);
        self
    }

    pub fn text(self, field: &str, format: &Format, text: &str) -> Self {
        self.value(field, format, FormatValue::text(text))
    }

    /// Declare a slot even when it stays empty.
    pub fn slot(mut self, name: &str) -> Self {
        self.slots.entry(name.to_string()).or_default();
        self
    }

    pub fn item(mut self, slot: &str, id: &str, standoff: Values, child: DataTree) -> Self {
        self.slots
            .entry(slot.to_string())
            .or_default()
            .push(SlotItem::new(id, standoff, child));
        self
    }

    pub fn slot_items(&self, slot: &str) -> &[SlotItem<DataTree>] {
        self.slots.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Visit every node depth-first, parents before children.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&ItemPath, &'a DataTree)) {
        fn go<'a>(
            node: &'a DataTree,
            path: &ItemPath,
            f: &mut dyn FnMut(&ItemPath, &'a DataTree),
        ) {
            f(path, node);
            for (slot, items) in &node.slots {
                for item in items {
                    go(&item.item, &path.child(slot, &item.id), f);
                }
            }
        }
        go(self, &ItemPath::root(), f);
    }
}

// ---------------------------------------------------------------------------
// Authored (serde) form
// ---------------------------------------------------------------------------

/// A data tree as authored, before values went through their formats.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDataTree {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub values: RawValues,
    #[serde(default)]
    pub slots: BTreeMap<String, Vec<RawSlotItem>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSlotItem {
    pub id: String,
    #[serde(default)]
    pub standoff: RawValues,
    #[serde(default)]
    pub block: RawDataTree,
}

/// A value in an authored tree failed to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeValueError {
    pub path: ItemPath,
    /// Set when the failing value is a standoff value of the item at `path`.
    pub standoff: bool,
    pub error: ValidationError,
}

impl std::fmt::Display for TreeValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = if self.standoff { "standoff" } else { "values" };
        write!(f, "{} of {}: {}", what, self.path, self.error)
    }
}

impl std::error::Error for TreeValueError {}

impl FormatRegistry {
    /// Parse every value of an authored tree. Reports the first failure.
    pub fn parse_tree(&self, raw: &RawDataTree) -> Result<DataTree, TreeValueError> {
        self.parse_tree_at(raw, &ItemPath::root())
    }

    fn parse_tree_at(&self, raw: &RawDataTree, path: &ItemPath) -> Result<DataTree, TreeValueError> {
        let values = self.parse_values(&raw.values).map_err(|error| TreeValueError {
            path: path.clone(),
            standoff: false,
            error,
        })?;
        let mut slots = Slots::new();
        for (name, items) in &raw.slots {
            let mut parsed = Vec::with_capacity(items.len());
            for item in items {
                let item_path = path.child(name, &item.id);
                let standoff =
                    self.parse_values(&item.standoff)
                        .map_err(|error| TreeValueError {
                            path: item_path.clone(),
                            standoff: true,
                            error,
                        })?;
                let child = self.parse_tree_at(&item.block, &item_path)?;
                parsed.push(SlotItem::new(item.id.clone(), standoff, child));
            }
            slots.insert(name.clone(), parsed);
        }
        Ok(DataTree {
            kind: raw.kind.clone(),
            values,
            slots,
        })
    }
}
