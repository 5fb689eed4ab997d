//! Boundary with the rich-text editing capability.
//!
//! Blocks never hold capability-native content. They hand a surface an html
//! string, and get html strings back from its change notifications.

use std::cell::RefCell;

use crate::dom::{Element, Event, Subscription};
use crate::html::sanitize;

/// Creates editable surfaces inside host containers.
pub trait RichText {
    fn create(&self, container: &Element, initial_html: &str) -> Box<dyn Surface>;
}

/// One live editable surface.
pub trait Surface {
    /// Root element the surface created inside its container.
    fn element(&self) -> Element;

    /// Current content as html.
    fn html(&self) -> String;

    /// Replace the content from outside. Observers are not notified.
    fn replace(&self, html: &str);

    /// Called with the new html after every user edit, in edit order.
    fn observe(&self, on_change: Box<dyn FnMut(&str)>) -> Subscription;

    /// Detach from the container and release listeners. Idempotent.
    fn destroy(&self);
}

/// Default capability: a `contenteditable` element that takes `input`
/// events as user edits.
#[derive(Debug, Clone, Default)]
pub struct ContentEditable {
    tag: Option<&'static str>,
}

impl ContentEditable {
    pub fn new() -> Self {
        ContentEditable::default()
    }

    /// Use `tag` instead of `div` for the surface root.
    pub fn with_tag(tag: &'static str) -> Self {
        ContentEditable { tag: Some(tag) }
    }
}

impl RichText for ContentEditable {
    fn create(&self, container: &Element, initial_html: &str) -> Box<dyn Surface> {
        let element = Element::new(self.tag.unwrap_or("div"));
        element.set_attr("contenteditable", "true");
        element.set_inner_html(&sanitize(initial_html));
        container.append(&element);

        // Registered first so observers see the updated content.
        let weak = element.downgrade();
        let sync = element.listen("input", move |event| {
            if let (Event::Input { html }, Some(el)) = (event, weak.upgrade()) {
                el.set_inner_html(&sanitize(html));
            }
        });

        Box::new(ContentEditableSurface {
            element,
            subscriptions: RefCell::new(vec![sync]),
        })
    }
}

struct ContentEditableSurface {
    element: Element,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl Surface for ContentEditableSurface {
    fn element(&self) -> Element {
        self.element.clone()
    }

    fn html(&self) -> String {
        self.element.inner_html()
    }

    fn replace(&self, html: &str) {
        self.element.set_inner_html(&sanitize(html));
    }

    fn observe(&self, mut on_change: Box<dyn FnMut(&str)>) -> Subscription {
        let weak = self.element.downgrade();
        self.element.listen("input", move |event| {
            if let (Event::Input { .. }, Some(el)) = (event, weak.upgrade()) {
                on_change(&el.inner_html());
            }
        })
    }

    fn destroy(&self) {
        for mut subscription in self.subscriptions.borrow_mut().drain(..) {
            subscription.unsubscribe();
        }
        self.element.remove();
    }
}
