use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::data::DataTree;
use crate::html::escape_text;
use crate::mount::panic_message;
use crate::schema::{BlockUi, Markup, MarkupInput};
use crate::select::Selector;
use crate::slots::{Slots, map_slots};

/// Render `data` with `ui`, children before parents.
///
/// Every slot item is rendered through the implementation `selector` picks
/// for it, in slot order, and handed to the parent as resolved markup next
/// to its id and standoff values. Child css is not concatenated here; a
/// parent inlines whatever child css it embeds.
///
/// A child whose implementation panics is replaced by a flagged
/// `mintty-render-failed` placeholder; its siblings still render.
pub fn render_markup(ui: &BlockUi, selector: &Selector, data: &DataTree) -> Markup {
    let slots = render_slots(selector, data);
    ui.markup().render(&MarkupInput {
        values: &data.values,
        slots: &slots,
    })
}

/// Like [`render_markup`], with the root's implementation picked too.
pub fn render_document(selector: &Selector, data: &DataTree) -> Markup {
    let picked = selector.pick(data);
    render_markup(picked.ui, selector, data)
}

fn render_slots(selector: &Selector, data: &DataTree) -> Slots<Markup> {
    map_slots(&data.slots, |slot, item| {
        let picked = selector.pick(&item.item);
        catch_unwind(AssertUnwindSafe(|| {
            render_markup(picked.ui, selector, &item.item)
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(&payload);
            tracing::warn!(slot, id = %item.id, ui = picked.ui.name(), "render failed: {}", message);
            Markup::new(format!(
                "<div class=\"mintty-render-failed\">could not render {}: {}</div>",
                escape_text(&item.id),
                escape_text(&message)
            ))
        })
    })
}
