//! Block schema declarations and the two implementation shapes derived
//! from them.
//!
//! A [`BlockSchema`] is declared once, then used to register a markup
//! implementation ([`BlockSchema::for_markup`]) and an editing implementation
//! ([`BlockSchema::for_editing`]). Both receive the block's own values plus
//! its slot items, with a stage-specific attachment per item: rendered
//! [`Markup`] for the markup stage, a deferred [`MountFn`] for the editing
//! stage.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::data::DataTree;
use crate::error::{SchemaError, SchemaErrorKind};
use crate::mount::{Editor, MountFn, Saver};
use crate::path::ItemPath;
use crate::slots::{Multiplicity, SlotItem, Slots, SlotsConfig};
use crate::values::{Values, ValuesConfig};

#[derive(Debug)]
struct Declaration {
    name: String,
    values: ValuesConfig,
    slots: SlotsConfig,
}

/// Immutable declaration of a block's value fields and child slots.
/// Cheap to clone; clones share the declaration.
#[derive(Debug, Clone)]
pub struct BlockSchema {
    decl: Rc<Declaration>,
}

impl PartialEq for BlockSchema {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.decl, &other.decl)
    }
}

impl BlockSchema {
    /// `name` is the stable identifier selectors and data trees refer to.
    pub fn define(name: &str, values: ValuesConfig, slots: SlotsConfig) -> Self {
        BlockSchema {
            decl: Rc::new(Declaration {
                name: name.to_string(),
                values,
                slots,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn values(&self) -> &ValuesConfig {
        &self.decl.values
    }

    pub fn slots(&self) -> &SlotsConfig {
        &self.decl.slots
    }

    pub fn for_markup(&self, render: impl Fn(&MarkupInput<'_>) -> Markup + 'static) -> MarkupUi {
        MarkupUi {
            schema: self.clone(),
            render: Rc::new(render),
        }
    }

    pub fn for_editing(&self, build: impl Fn(EditingInput) -> Editor + 'static) -> EditingUi {
        EditingUi {
            schema: self.clone(),
            build: Rc::new(build),
        }
    }

    /// Check a fixture tree's top node against this schema and hand it back.
    /// Nested children are checked against their own schemas by
    /// [`Selector::validate`](crate::select::Selector::validate).
    pub fn fixture(&self, data: DataTree) -> Result<DataTree, Vec<SchemaError>> {
        let errors = self.check(&data, &ItemPath::root());
        if errors.is_empty() {
            Ok(data)
        } else {
            Err(errors)
        }
    }

    /// Values, slot names, standoff records and item id uniqueness of one node.
    pub fn check(&self, data: &DataTree, path: &ItemPath) -> Vec<SchemaError> {
        let error = |kind| SchemaError {
            schema: self.name().to_string(),
            path: path.clone(),
            kind,
        };
        let mut errors: Vec<SchemaError> = self
            .values()
            .check(&data.values)
            .into_iter()
            .map(error)
            .collect();

        for (slot, items) in &data.slots {
            let Some(config) = self.slots().get(slot) else {
                errors.push(error(SchemaErrorKind::UnknownSlot(slot.clone())));
                continue;
            };
            let unique_ids = match config.multiplicity {
                Multiplicity::Many => true,
            };
            let mut seen = HashSet::new();
            for item in items {
                if unique_ids && !seen.insert(item.id.as_str()) {
                    errors.push(error(SchemaErrorKind::DuplicateItem {
                        slot: slot.clone(),
                        id: item.id.clone(),
                    }));
                }
                for reason in config.standoff.check(&item.standoff) {
                    errors.push(error(SchemaErrorKind::InvalidStandoff {
                        slot: slot.clone(),
                        id: item.id.clone(),
                        reason: Box::new(reason),
                    }));
                }
            }
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// Markup stage
// ---------------------------------------------------------------------------

/// Static rendering of one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Markup {
    pub html: String,
    pub css: Option<String>,
}

impl Markup {
    pub fn new(html: impl Into<String>) -> Self {
        Markup {
            html: html.into(),
            css: None,
        }
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    pub fn css(&self) -> &str {
        self.css.as_deref().unwrap_or("")
    }
}

pub struct MarkupInput<'a> {
    pub values: &'a Values,
    /// Children already rendered, in slot order.
    pub slots: &'a Slots<Markup>,
}

impl MarkupInput<'_> {
    pub fn slot(&self, name: &str) -> &[SlotItem<Markup>] {
        self.slots.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub type MarkupFn = Rc<dyn Fn(&MarkupInput<'_>) -> Markup>;

#[derive(Clone)]
pub struct MarkupUi {
    schema: BlockSchema,
    render: MarkupFn,
}

impl MarkupUi {
    pub fn schema(&self) -> &BlockSchema {
        &self.schema
    }

    pub fn render(&self, input: &MarkupInput<'_>) -> Markup {
        (self.render)(input)
    }
}

// ---------------------------------------------------------------------------
// Editing stage
// ---------------------------------------------------------------------------

pub struct EditingInput {
    pub values: Values,
    /// Children as deferred mount functions; the block decides when to call them.
    pub slots: Slots<MountFn>,
    /// Reports committed edits upward.
    pub save: Saver,
}

impl EditingInput {
    pub fn slot(&self, name: &str) -> &[SlotItem<MountFn>] {
        self.slots.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub type EditingFn = Rc<dyn Fn(EditingInput) -> Editor>;

#[derive(Clone)]
pub struct EditingUi {
    schema: BlockSchema,
    build: EditingFn,
}

impl EditingUi {
    pub fn schema(&self) -> &BlockSchema {
        &self.schema
    }

    pub fn build(&self, input: EditingInput) -> Editor {
        (self.build)(input)
    }
}

// ---------------------------------------------------------------------------
// Both stages
// ---------------------------------------------------------------------------

/// A schema with both implementations registered.
#[derive(Clone)]
pub struct BlockUi {
    markup: MarkupUi,
    editing: EditingUi,
}

impl BlockUi {
    pub fn new(markup: MarkupUi, editing: EditingUi) -> Self {
        debug_assert!(
            markup.schema == editing.schema,
            "markup and editing implementations of different schemas"
        );
        BlockUi { markup, editing }
    }

    pub fn name(&self) -> &str {
        self.markup.schema.name()
    }

    pub fn schema(&self) -> &BlockSchema {
        &self.markup.schema
    }

    pub fn markup(&self) -> &MarkupUi {
        &self.markup
    }

    pub fn editing(&self) -> &EditingUi {
        &self.editing
    }
}

impl fmt::Debug for BlockUi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockUi").field("name", &self.name()).finish()
    }
}
