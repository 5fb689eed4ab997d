//! A small in-memory element tree standing in for the host's DOM.
//!
//! Mount implementations only need a handful of operations from their
//! container: create elements, set attributes and styles, attach and detach
//! children, listen for events and watch attributes. Everything here is
//! single-threaded (`Rc`/`RefCell`); parents hold children strongly,
//! children point at parents weakly, and closures that need an element
//! should capture a [`WeakElement`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::html::{escape_attr, escape_text};

/// Events the host can deliver to an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    KeyDown { key: String, shift: bool },
    /// The user changed the content of an editable element.
    Input { html: String },
}

impl Event {
    pub fn key(key: &str) -> Self {
        Event::KeyDown {
            key: key.to_string(),
            shift: false,
        }
    }

    pub fn shift_key(key: &str) -> Self {
        Event::KeyDown {
            key: key.to_string(),
            shift: true,
        }
    }

    pub fn input(html: &str) -> Self {
        Event::Input {
            html: html.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::KeyDown { .. } => "keydown",
            Event::Input { .. } => "input",
        }
    }
}

/// Handle for a listener or watcher. Unsubscribes on [`Subscription::unsubscribe`]
/// or when dropped.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Subscription {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

type Listener = Rc<RefCell<dyn FnMut(&Event)>>;
type AttrWatcher = Rc<RefCell<dyn FnMut(Option<&str>)>>;

enum Child {
    Element(Element),
    /// Markup inserted verbatim (`innerHTML`).
    Markup(String),
}

struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    style: BTreeMap<String, String>,
    children: Vec<Child>,
    parent: Weak<RefCell<Node>>,
    listeners: Vec<(u64, &'static str, Listener)>,
    watchers: Vec<(u64, String, AttrWatcher)>,
    next_id: u64,
}

impl Node {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input"];

#[derive(Clone)]
pub struct Element {
    node: Rc<RefCell<Node>>,
}

#[derive(Clone)]
pub struct WeakElement {
    node: Weak<RefCell<Node>>,
}

impl WeakElement {
    pub fn upgrade(&self) -> Option<Element> {
        self.node.upgrade().map(|node| Element { node })
    }
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Element {
            node: Rc::new(RefCell::new(Node {
                tag: tag.to_string(),
                attrs: BTreeMap::new(),
                classes: Vec::new(),
                style: BTreeMap::new(),
                children: Vec::new(),
                parent: Weak::new(),
                listeners: Vec::new(),
                watchers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Create an element carrying one class.
    pub fn with_class(tag: &str, class: &str) -> Self {
        let element = Element::new(tag);
        element.add_class(class);
        element
    }

    pub fn downgrade(&self) -> WeakElement {
        WeakElement {
            node: Rc::downgrade(&self.node),
        }
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    pub fn tag(&self) -> String {
        self.node.borrow().tag.clone()
    }

    // -- attributes ---------------------------------------------------------

    pub fn attr(&self, name: &str) -> Option<String> {
        self.node.borrow().attrs.get(name).cloned()
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        let changed = {
            let mut node = self.node.borrow_mut();
            node.attrs.insert(name.to_string(), value.to_string()).as_deref() != Some(value)
        };
        if changed {
            self.notify_watchers(name, Some(value));
        }
    }

    pub fn remove_attr(&self, name: &str) {
        let removed = self.node.borrow_mut().attrs.remove(name).is_some();
        if removed {
            self.notify_watchers(name, None);
        }
    }

    /// Watch one attribute. `on_change` is called once with the current value,
    /// then after every change until the subscription ends.
    pub fn subscribe_attr(
        &self,
        name: &str,
        on_change: impl FnMut(Option<&str>) + 'static,
    ) -> Subscription {
        let watcher: AttrWatcher = Rc::new(RefCell::new(on_change));
        let id = {
            let mut node = self.node.borrow_mut();
            let id = node.next_id();
            node.watchers.push((id, name.to_string(), watcher.clone()));
            id
        };
        let current = self.attr(name);
        (&mut *watcher.borrow_mut())(current.as_deref());

        let weak = Rc::downgrade(&self.node);
        Subscription::new(move || {
            if let Some(node) = weak.upgrade() {
                node.borrow_mut().watchers.retain(|(wid, _, _)| *wid != id);
            }
        })
    }

    fn notify_watchers(&self, name: &str, value: Option<&str>) {
        let watchers: Vec<AttrWatcher> = self
            .node
            .borrow()
            .watchers
            .iter()
            .filter(|(_, attr, _)| attr == name)
            .map(|(_, _, w)| w.clone())
            .collect();
        for watcher in watchers {
            match watcher.try_borrow_mut() {
                Ok(mut w) => (&mut *w)(value),
                Err(_) => tracing::warn!(attr = name, "attribute watcher re-entered, skipped"),
            }
        }
    }

    // -- classes and style --------------------------------------------------

    pub fn add_class(&self, class: &str) {
        let mut node = self.node.borrow_mut();
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.node.borrow().classes.iter().any(|c| c == class)
    }

    pub fn set_style(&self, property: &str, value: &str) {
        self.node
            .borrow_mut()
            .style
            .insert(property.to_string(), value.to_string());
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.node.borrow().style.get(property).cloned()
    }

    // -- tree ---------------------------------------------------------------

    pub fn parent(&self) -> Option<Element> {
        self.node.borrow().parent.upgrade().map(|node| Element { node })
    }

    pub fn is_attached(&self) -> bool {
        self.parent().is_some()
    }

    pub fn children(&self) -> Vec<Element> {
        self.node
            .borrow()
            .children
            .iter()
            .filter_map(|c| match c {
                Child::Element(e) => Some(e.clone()),
                Child::Markup(_) => None,
            })
            .collect()
    }

    pub fn has_children(&self) -> bool {
        !self.node.borrow().children.is_empty()
    }

    /// Append `child`, detaching it from its current parent first.
    pub fn append(&self, child: &Element) {
        if self.ptr_eq(child) || self.has_ancestor(child) {
            tracing::warn!(tag = %child.tag(), "refusing to append an element into itself");
            return;
        }
        child.remove();
        child.node.borrow_mut().parent = Rc::downgrade(&self.node);
        self.node
            .borrow_mut()
            .children
            .push(Child::Element(child.clone()));
    }

    pub fn append_markup(&self, markup: &str) {
        self.node
            .borrow_mut()
            .children
            .push(Child::Markup(markup.to_string()));
    }

    /// Replace all children with verbatim markup.
    pub fn set_inner_html(&self, markup: &str) {
        self.clear();
        if !markup.is_empty() {
            self.append_markup(markup);
        }
    }

    /// Replace all children with escaped text.
    pub fn set_text(&self, text: &str) {
        self.set_inner_html(&escape_text(text));
    }

    pub fn clear(&self) {
        let children = std::mem::take(&mut self.node.borrow_mut().children);
        for child in children {
            if let Child::Element(e) = child {
                e.node.borrow_mut().parent = Weak::new();
            }
        }
    }

    /// Detach from the parent. No-op when already detached.
    pub fn remove(&self) {
        let parent = self.node.borrow().parent.upgrade();
        if let Some(parent) = parent {
            parent.borrow_mut().children.retain(|c| match c {
                Child::Element(e) => !Rc::ptr_eq(&e.node, &self.node),
                Child::Markup(_) => true,
            });
        }
        self.node.borrow_mut().parent = Weak::new();
    }

    fn has_ancestor(&self, candidate: &Element) -> bool {
        let mut current = self.parent();
        while let Some(el) = current {
            if el.ptr_eq(candidate) {
                return true;
            }
            current = el.parent();
        }
        false
    }

    /// First descendant (depth-first, excluding `self`) matching `pred`.
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<Element> {
        for child in self.children() {
            if pred(&child) {
                return Some(child);
            }
            if let Some(found) = child.find(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_all(&self, pred: &dyn Fn(&Element) -> bool) -> Vec<Element> {
        let mut found = Vec::new();
        for child in self.children() {
            if pred(&child) {
                found.push(child.clone());
            }
            found.extend(child.find_all(pred));
        }
        found
    }

    pub fn find_by_class(&self, class: &str) -> Option<Element> {
        self.find(&|e| e.has_class(class))
    }

    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<Element> {
        self.find(&|e| e.attr(name).as_deref() == Some(value))
    }

    // -- events -------------------------------------------------------------

    pub fn listen(&self, kind: &'static str, handler: impl FnMut(&Event) + 'static) -> Subscription {
        let listener: Listener = Rc::new(RefCell::new(handler));
        let id = {
            let mut node = self.node.borrow_mut();
            let id = node.next_id();
            node.listeners.push((id, kind, listener));
            id
        };
        let weak = Rc::downgrade(&self.node);
        Subscription::new(move || {
            if let Some(node) = weak.upgrade() {
                node.borrow_mut().listeners.retain(|(lid, _, _)| *lid != id);
            }
        })
    }

    /// Deliver `event` to this element's listeners in registration order.
    pub fn dispatch(&self, event: &Event) {
        let listeners: Vec<Listener> = self
            .node
            .borrow()
            .listeners
            .iter()
            .filter(|(_, kind, _)| *kind == event.kind())
            .map(|(_, _, l)| l.clone())
            .collect();
        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut l) => (&mut *l)(event),
                Err(_) => tracing::warn!(event = event.kind(), "listener re-entered, skipped"),
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        let node = self.node.borrow();
        node.listeners.len() + node.watchers.len()
    }

    // -- serialization ------------------------------------------------------

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        self.write_children(&mut out);
        out
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_outer(&mut out);
        out
    }

    fn write_children(&self, out: &mut String) {
        let node = self.node.borrow();
        for child in &node.children {
            match child {
                Child::Element(e) => e.write_outer(out),
                Child::Markup(m) => out.push_str(m),
            }
        }
    }

    fn write_outer(&self, out: &mut String) {
        let tag = {
            let node = self.node.borrow();
            out.push('<');
            out.push_str(&node.tag);
            if !node.classes.is_empty() {
                out.push_str(&format!(" class=\"{}\"", escape_attr(&node.classes.join(" "))));
            }
            for (name, value) in &node.attrs {
                out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
            }
            if !node.style.is_empty() {
                let style: Vec<String> = node
                    .style
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                out.push_str(&format!(" style=\"{}\"", escape_attr(&style.join("; "))));
            }
            node.tag.clone()
        };
        if VOID_TAGS.contains(&tag.as_str()) {
            out.push_str("/>");
            return;
        }
        out.push('>');
        self.write_children(out);
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node.borrow();
        f.debug_struct("Element")
            .field("tag", &node.tag)
            .field("classes", &node.classes)
            .field("attrs", &node.attrs)
            .finish()
    }
}
