//! A single line of rich text.

use std::cell::RefCell;
use std::rc::Rc;

use mintty::data::DataTree;
use mintty::dom::Element;
use mintty::editor::{RichText, Surface};
use mintty::format::TEXT_HTML;
use mintty::html::{escape_text, sanitize};
use mintty::schema::{EditingUi, MarkupUi};
use mintty::{
    BlockSchema, BlockUi, Editor, FormatValue, Markup, MountError, MountedHandle, SlotsConfig,
    Values, ValuesConfig,
};

use crate::Env;

pub const NAME: &str = "line";

const CSS: &str = ".mintty-line-editor {
  background: whitesmoke;
  margin: 0;
  line-height: 1.7;
}
.mintty-unclassified {
  outline: 1px dashed crimson;
  color: crimson;
  white-space: pre;
}";

pub fn schema() -> BlockSchema {
    BlockSchema::define(
        NAME,
        ValuesConfig::new().field("text", TEXT_HTML),
        SlotsConfig::new(),
    )
}

pub fn ui(env: &Env) -> BlockUi {
    let schema = schema();
    BlockUi::new(markup(&schema), editing(&schema, env.rich_text.clone()))
}

/// Legacy probe: carries `text` as html.
pub fn is_line(data: &DataTree) -> bool {
    data.values.text("text", &TEXT_HTML).is_some()
}

pub fn markup(schema: &BlockSchema) -> MarkupUi {
    schema.for_markup(|input| {
        let html = match input.values.text("text", &TEXT_HTML) {
            Some("") => "<br/>".to_string(),
            Some(text) => sanitize(text),
            None => return placeholder_markup(input.values),
        };
        Markup::new(format!("<div class=\"mintty-line-editor\">{}</div>", html)).with_css(CSS)
    })
}

/// Used when this block renders data it was not made for.
fn placeholder_markup(values: &Values) -> Markup {
    Markup::new(format!(
        "<div class=\"mintty-line-editor mintty-unclassified\">{}</div>",
        escape_text(&placeholder_text(values))
    ))
    .with_css(CSS)
}

fn placeholder_text(values: &Values) -> String {
    format!(
        "unrecognized content (fields: {})",
        values.field_names().join(", ")
    )
}

pub fn editing(schema: &BlockSchema, rich_text: Rc<dyn RichText>) -> EditingUi {
    schema.for_editing(move |input| {
        let current = Rc::new(RefCell::new(
            input.values.text("text", &TEXT_HTML).map(str::to_string),
        ));
        let live: Rc<RefCell<Option<Rc<dyn Surface>>>> = Rc::new(RefCell::new(None));
        let placeholder = placeholder_text(&input.values);
        let save = input.save;

        let mount = {
            let current = current.clone();
            let live = live.clone();
            let rich_text = rich_text.clone();
            move |container: &Element| -> Result<MountedHandle, MountError> {
                let initial = current.borrow().clone();
                let Some(html) = initial else {
                    let el = Element::with_class("div", "mintty-line-editor");
                    el.add_class("mintty-unclassified");
                    el.set_text(&placeholder);
                    container.append(&el);
                    return Ok(MountedHandle::new(NAME, move || {
                        el.remove();
                        Ok(())
                    }));
                };

                let surface: Rc<dyn Surface> = Rc::from(rich_text.create(container, &html));
                surface.element().add_class("mintty-line-editor");

                let mut subscription = surface.observe(Box::new({
                    let current = current.clone();
                    let save = save.clone();
                    move |html: &str| {
                        *current.borrow_mut() = Some(html.to_string());
                        save.save(Values::new().with("text", &TEXT_HTML, FormatValue::text(html)));
                    }
                }));
                *live.borrow_mut() = Some(surface.clone());

                let live = live.clone();
                Ok(MountedHandle::new(NAME, move || {
                    subscription.unsubscribe();
                    surface.destroy();
                    live.borrow_mut().take();
                    Ok(())
                }))
            }
        };

        let apply = move |values: &Values| {
            let Some(html) = values.text("text", &TEXT_HTML) else {
                return;
            };
            *current.borrow_mut() = Some(html.to_string());
            if let Some(surface) = live.borrow().as_ref() {
                surface.replace(html);
            }
        };

        Editor::new(mount, apply)
    })
}
