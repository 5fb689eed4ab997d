//! Typed content-block schemas with two renderings: static markup, and live
//! editable mounts.
//!
//! A block declares its value fields ([`ValuesConfig`]) and child slots
//! ([`SlotsConfig`]) once as a [`BlockSchema`]. From that declaration it
//! registers a markup implementation and an editing implementation. The
//! orchestrators in [`render`] and [`mount`] walk a [`DataTree`], pick each
//! child's implementation with a [`Selector`], and hand parents their
//! children already rendered (or ready to mount).

pub mod data;
pub mod dom;
pub mod editor;
pub mod error;
pub mod format;
pub mod html;
pub mod mount;
pub mod path;
pub mod render;
pub mod schema;
pub mod select;
pub mod slots;
pub mod values;

pub use data::{DataTree, RawDataTree};
pub use error::{MountError, SchemaError, SchemaErrorKind, UnclassifiedData, ValidationError};
pub use format::{Format, FormatRegistry, FormatValue, RawValue};
pub use mount::{Editor, MountFn, MountedHandle, SaveEvent, SaveHost, SaveLog, Saver};
pub use path::ItemPath;
pub use render::{render_document, render_markup};
pub use schema::{BlockSchema, BlockUi, EditingInput, Markup, MarkupInput};
pub use select::{Picked, Selection, Selector};
pub use slots::{SlotItem, Slots, SlotsConfig};
pub use values::{Values, ValuesConfig};
