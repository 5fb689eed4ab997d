use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::data::DataTree;
use crate::dom::Element;
use crate::error::MountError;
use crate::path::ItemPath;
use crate::schema::{BlockUi, EditingInput};
use crate::select::Selector;
use crate::slots::{Slots, map_slots};
use crate::values::Values;

/// Mounts a block into a container the caller owns. May be called again
/// after the previous mount was destroyed.
pub type MountFn = Rc<dyn Fn(&Element) -> Result<MountedHandle, MountError>>;

/// Pushes external value updates into a live block.
pub type ApplyFn = Rc<dyn Fn(&Values)>;

type Teardown = Box<dyn FnOnce() -> Result<(), MountError>>;

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// What an editing implementation returns: a way to mount, and a way to
/// apply outside updates (before or after mounting).
pub struct Editor {
    mount: Box<dyn Fn(&Element) -> Result<MountedHandle, MountError>>,
    apply: ApplyFn,
}

impl Editor {
    pub fn new(
        mount: impl Fn(&Element) -> Result<MountedHandle, MountError> + 'static,
        apply: impl Fn(&Values) + 'static,
    ) -> Self {
        Editor {
            mount: Box::new(mount),
            apply: Rc::new(apply),
        }
    }

    /// Mount into `container`. The returned handle also carries this
    /// editor's `apply`.
    pub fn mount(&self, container: &Element) -> Result<MountedHandle, MountError> {
        let mut handle = (self.mount)(container)?;
        if handle.apply.is_none() {
            handle.apply = Some(self.apply.clone());
        }
        Ok(handle)
    }

    pub fn apply(&self, values: &Values) {
        (self.apply)(values)
    }
}

// ---------------------------------------------------------------------------
// Mounted handle
// ---------------------------------------------------------------------------

/// A live mount. Destroying it tears down every descendant mount it owns,
/// children first. Dropping an undestroyed handle destroys it.
pub struct MountedHandle {
    block: String,
    teardown: Option<Teardown>,
    children: Vec<MountedHandle>,
    apply: Option<ApplyFn>,
    destroyed: bool,
}

impl MountedHandle {
    pub fn new(block: &str, teardown: impl FnOnce() -> Result<(), MountError> + 'static) -> Self {
        MountedHandle {
            block: block.to_string(),
            teardown: Some(Box::new(teardown)),
            children: Vec::new(),
            apply: None,
            destroyed: false,
        }
    }

    pub fn with_children(mut self, children: Vec<MountedHandle>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn block(&self) -> &str {
        &self.block
    }

    pub fn children(&self) -> &[MountedHandle] {
        &self.children
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Forward outside updates to the live block. Ignored after destroy.
    pub fn apply(&self, values: &Values) {
        if self.destroyed {
            tracing::debug!(block = %self.block, "apply after destroy ignored");
            return;
        }
        if let Some(apply) = &self.apply {
            apply(values);
        }
    }

    /// Release everything this mount created. Every child and the own
    /// teardown are attempted even when some fail; all failures are logged
    /// and returned together. Calling again is a no-op.
    pub fn destroy(&mut self) -> Result<(), MountError> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        self.apply = None;

        let mut errors = Vec::new();
        for mut child in self.children.drain(..) {
            if let Err(error) = child.destroy() {
                match error {
                    MountError::Many(many) => errors.extend(many),
                    other => errors.push(other),
                }
            }
        }
        if let Some(teardown) = self.teardown.take() {
            let outcome = catch_unwind(AssertUnwindSafe(teardown))
                .unwrap_or_else(|payload| {
                    Err(MountError::teardown(&self.block, panic_message(&payload)))
                });
            if let Err(error) = outcome {
                tracing::error!(block = %self.block, %error, "teardown failed");
                errors.push(error);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(MountError::Many(errors)),
        }
    }
}

impl Drop for MountedHandle {
    fn drop(&mut self) {
        if !self.destroyed {
            let _ = self.destroy();
        }
    }
}

impl fmt::Debug for MountedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedHandle")
            .field("block", &self.block)
            .field("children", &self.children)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

pub(crate) fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Saving
// ---------------------------------------------------------------------------

/// A committed edit reported by a live block.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    /// New values for the block at `path`.
    Values { path: ItemPath, values: Values },
    /// New standoff values the container at `path` keeps for one child.
    Standoff {
        path: ItemPath,
        slot: String,
        id: String,
        values: Values,
    },
}

impl fmt::Display for SaveEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let describe = |values: &Values| {
            values
                .iter()
                .flat_map(|(field, formats)| {
                    formats
                        .iter()
                        .map(move |(id, value)| format!("{}[{}]={}", field, id, value))
                })
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self {
            SaveEvent::Values { path, values } => write!(f, "save {} {}", path, describe(values)),
            SaveEvent::Standoff {
                path,
                slot,
                id,
                values,
            } => write!(
                f,
                "save {} {}/{} standoff {}",
                path,
                slot,
                id,
                describe(values)
            ),
        }
    }
}

/// Receives save events. Delivery is fire-and-forget: hosts that persist
/// asynchronously start that work and return; the caller never waits.
pub trait SaveHost {
    fn save(&self, event: SaveEvent);
}

impl<F: Fn(SaveEvent)> SaveHost for F {
    fn save(&self, event: SaveEvent) {
        self(event)
    }
}

/// A block's handle on its host, bound to the block's path.
#[derive(Clone)]
pub struct Saver {
    path: ItemPath,
    host: Rc<dyn SaveHost>,
}

impl Saver {
    pub fn new(host: Rc<dyn SaveHost>) -> Self {
        Saver {
            path: ItemPath::root(),
            host,
        }
    }

    pub fn path(&self) -> &ItemPath {
        &self.path
    }

    pub fn child(&self, slot: &str, id: &str) -> Saver {
        Saver {
            path: self.path.child(slot, id),
            host: self.host.clone(),
        }
    }

    /// Report edited values. One call per edit, in edit order.
    pub fn save(&self, values: Values) {
        self.host.save(SaveEvent::Values {
            path: self.path.clone(),
            values,
        });
    }

    pub fn save_standoff(&self, slot: &str, id: &str, values: Values) {
        self.host.save(SaveEvent::Standoff {
            path: self.path.clone(),
            slot: slot.to_string(),
            id: id.to_string(),
            values,
        });
    }
}

/// Records every save event in delivery order.
#[derive(Debug, Clone, Default)]
pub struct SaveLog {
    events: Rc<RefCell<Vec<SaveEvent>>>,
}

impl SaveLog {
    pub fn new() -> Self {
        SaveLog::default()
    }

    pub fn saver(&self) -> Saver {
        Saver::new(Rc::new(self.clone()))
    }

    pub fn events(&self) -> Vec<SaveEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn take(&self) -> Vec<SaveEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl SaveHost for SaveLog {
    fn save(&self, event: SaveEvent) {
        tracing::debug!(%event, "save");
        self.events.borrow_mut().push(event);
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Build the editor for `data` using `ui`, with every descendant prepared as
/// a deferred mount function picked through `selector`.
pub fn prepare_editing(ui: &BlockUi, selector: &Selector, data: &DataTree, save: Saver) -> Editor {
    let slots = child_mounts(selector, data, &save);
    ui.editing().build(EditingInput {
        values: data.values.clone(),
        slots,
        save,
    })
}

/// Like [`prepare_editing`], with the root's implementation picked too.
pub fn prepare_document(selector: &Selector, data: &DataTree, save: Saver) -> Editor {
    let picked = selector.pick(data);
    prepare_editing(picked.ui, selector, data, save)
}

fn child_mounts(selector: &Selector, data: &DataTree, save: &Saver) -> Slots<MountFn> {
    map_slots(&data.slots, |slot, item| {
        let ui = selector.pick(&item.item).ui.clone();
        let child_save = save.child(slot, &item.id);
        let grandchildren = child_mounts(selector, &item.item, &child_save);
        let values = item.item.values.clone();

        let mount: MountFn = Rc::new(move |container: &Element| {
            let input = EditingInput {
                values: values.clone(),
                slots: grandchildren.clone(),
                save: child_save.clone(),
            };
            catch_unwind(AssertUnwindSafe(|| ui.editing().build(input).mount(container)))
                .unwrap_or_else(|payload| {
                    Err(MountError::failed(ui.name(), panic_message(&payload)))
                })
        });
        mount
    })
}
