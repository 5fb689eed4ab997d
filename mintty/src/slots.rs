use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::values::{Values, ValuesConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// An ordered list of items with ids unique within the slot.
    Many,
}

/// A named slot: the standoff fields the parent keeps per child.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotConfig {
    pub standoff: ValuesConfig,
    pub multiplicity: Multiplicity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotsConfig {
    slots: BTreeMap<String, SlotConfig>,
}

impl SlotsConfig {
    pub fn new() -> Self {
        SlotsConfig::default()
    }

    pub fn slot(mut self, name: &str, standoff: ValuesConfig) -> Self {
        self.slots.insert(
            name.to_string(),
            SlotConfig {
                standoff,
                multiplicity: Multiplicity::Many,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&SlotConfig> {
        self.slots.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, SlotConfig> {
        self.slots.iter()
    }
}

/// One entry of a slot list.
///
/// `X` is whatever the current stage attaches to each child: the nested data
/// tree for fixtures, rendered markup for the markup stage, a deferred mount
/// function for the editing stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotItem<X> {
    pub id: String,
    /// Metadata the parent keeps about this child.
    pub standoff: Values,
    pub item: X,
}

impl<X> SlotItem<X> {
    pub fn new(id: impl Into<String>, standoff: Values, item: X) -> Self {
        SlotItem {
            id: id.into(),
            standoff,
            item,
        }
    }
}

/// Slot name -> ordered items. Order is significant and always preserved.
pub type Slots<X> = BTreeMap<String, Vec<SlotItem<X>>>;

/// Transform every item of every slot, keeping slot names and item order.
pub fn map_slots<X, Y>(
    slots: &Slots<X>,
    mut f: impl FnMut(&str, &SlotItem<X>) -> Y,
) -> Slots<Y> {
    slots
        .iter()
        .map(|(name, items)| {
            let mapped = items
                .iter()
                .map(|item| SlotItem {
                    id: item.id.clone(),
                    standoff: item.standoff.clone(),
                    item: f(name, item),
                })
                .collect();
            (name.clone(), mapped)
        })
        .collect()
}
