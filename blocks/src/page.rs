//! A page: an html title, an ordered list of child blocks with indentation,
//! and comment threads attached to those blocks.
//!
//! Comments live in their own slot. Each comment's standoff `targetId`
//! names either a child block or another comment (a reply), so any block
//! UI can serve as a comment body.

use std::cell::RefCell;
use std::rc::Rc;

use mintty::data::DataTree;
use mintty::dom::{Element, Event, Subscription};
use mintty::editor::{RichText, Surface};
use mintty::format::{ITEM_ID, NUMBER_DECIMAL, NUMBER_NATURAL, SIGNER, TEXT_HTML, UNIX_SECS};
use mintty::html::{escape_attr, escape_text, sanitize};
use mintty::schema::{EditingUi, MarkupUi};
use mintty::{
    BlockSchema, BlockUi, Editor, FormatValue, Markup, MountError, MountFn, MountedHandle,
    Saver, SlotItem, SlotsConfig, Values, ValuesConfig,
};

use crate::relative_time::from_now;
use crate::threads::{Thread, threads_for};
use crate::{Clock, Env};

pub const NAME: &str = "page";

pub const CHILDREN: &str = "children";
pub const COMMENTS: &str = "comments";

/// Deepest indentation reachable with Tab.
pub const MAX_INDENT: f64 = 6.0;

const CSS: &str = "
.page-content { padding: 8px 0; }
.page-block { position: relative; white-space: normal; padding-left: 1rem; transition: all 0.2s; }
.page-title { font-size: 36px; font-weight: bold; letter-spacing: -0.01pt; margin-bottom: 1rem; }
.comment-group { padding: 0.2rem; border: 1px solid #ddd }
.page-comment--meta { font-size: .85em; }
.reply-comment-list::before { content: \"↪︎\"; position: absolute; left: 1rem }
.reply-comment-list { padding-left: 1rem; }
.mintty-mount-failed, .mintty-render-failed { outline: 1px dashed crimson; color: crimson; white-space: pre; }
";

pub fn schema() -> BlockSchema {
    BlockSchema::define(
        NAME,
        ValuesConfig::new().field("title", TEXT_HTML),
        SlotsConfig::new()
            .slot(
                CHILDREN,
                ValuesConfig::new()
                    .field("fractionalIndex", NUMBER_DECIMAL)
                    .field("indentation", NUMBER_NATURAL),
            )
            .slot(
                COMMENTS,
                ValuesConfig::new()
                    .field("postedAt", UNIX_SECS)
                    .field("postedBy", SIGNER)
                    // the subject of this comment: a block on the page or another comment
                    .field("targetId", ITEM_ID),
            ),
    )
}

pub fn ui(env: &Env) -> BlockUi {
    let schema = schema();
    BlockUi::new(
        markup(&schema, env.clock.clone()),
        editing(&schema, env.rich_text.clone(), env.clock.clone()),
    )
}

/// Legacy probe: an html title plus both slots.
pub fn is_page(data: &DataTree) -> bool {
    data.values.text("title", &TEXT_HTML).is_some()
        && data.slots.contains_key(CHILDREN)
        && data.slots.contains_key(COMMENTS)
}

/// Standoff record for an item of the children slot.
pub fn child_standoff(fractional_index: f64, indentation: f64) -> Values {
    Values::new()
        .with("fractionalIndex", &NUMBER_DECIMAL, FormatValue::Number(fractional_index))
        .with("indentation", &NUMBER_NATURAL, FormatValue::Number(indentation))
}

/// Standoff record for an item of the comments slot.
pub fn comment_standoff(target_id: &str, posted_by: &str, posted_at: u64) -> Values {
    Values::new()
        .with("targetId", &ITEM_ID, FormatValue::text(target_id))
        .with("postedBy", &SIGNER, FormatValue::text(posted_by))
        .with("postedAt", &UNIX_SECS, FormatValue::Number(posted_at as f64))
}

fn indentation<X>(item: &SlotItem<X>) -> f64 {
    item.standoff
        .number("indentation", &NUMBER_NATURAL)
        .unwrap_or(0.0)
}

/// The part of a signer after its provider prefix ("GITHUB.COM:someone").
fn byline(signer: &str) -> &str {
    signer.split_once(':').map(|(_, who)| who).unwrap_or(signer)
}

fn posted_at<X>(comment: &SlotItem<X>) -> u64 {
    comment
        .standoff
        .number("postedAt", &UNIX_SECS)
        .unwrap_or(0.0) as u64
}

fn signer_of<X>(comment: &SlotItem<X>) -> &str {
    comment.standoff.text("postedBy", &SIGNER).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Markup
// ---------------------------------------------------------------------------

pub fn markup(schema: &BlockSchema, clock: Clock) -> MarkupUi {
    schema.for_markup(move |input| {
        let now = clock();
        let comments = input.slot(COMMENTS);
        let mut blocks = String::new();
        for child in input.slot(CHILDREN) {
            let threads = threads_for(&child.id, comments);
            blocks.push_str(&format!(
                "
<div class=\"page-block\" style=\"margin-left: {}rem\" data-miid=\"{}\">
  <style>{}</style>
  {}
  {}
</div>",
                indentation(child),
                escape_attr(&child.id),
                child.item.css(),
                child.item.html,
                wrap_comments("page-block-comment", render_threads(&threads, now)),
            ));
        }

        let title = sanitize(input.values.text("title", &TEXT_HTML).unwrap_or(""));
        Markup::new(format!(
            "
<div class=\"page-title\">{}</div>
<div class=\"page-content\">{}
</div>
",
            title, blocks
        ))
        .with_css(CSS)
    })
}

fn render_threads(threads: &[Thread<'_, Markup>], now: u64) -> Vec<String> {
    threads
        .iter()
        .map(|thread| render_comment(thread, now))
        .collect()
}

fn render_comment(thread: &Thread<'_, Markup>, now: u64) -> String {
    let comment = thread.comment;
    let posted = posted_at(comment);
    format!(
        "
<div class=\"page-comment\" data-miid=\"{}\">
  <style>{}</style>
  <div class=\"page-comment--body\" data-mount-target>{}</div>
  <div class=\"page-comment--meta\">
  <span class=\"page-comment--poster\">{}</span>&nbsp;
  <time class=\"page-comment--time\" datetime=\"{}\">{}</time>
  </div>
  {}
</div>",
        escape_attr(&comment.id),
        comment.item.css(),
        comment.item.html,
        escape_text(byline(signer_of(comment))),
        posted,
        from_now(posted, now),
        wrap_comments("reply-comment-list", render_threads(&thread.replies, now)),
    )
}

fn wrap_comments(class: &str, comments: Vec<String>) -> String {
    if comments.is_empty() {
        return String::new();
    }
    format!(
        "<div class=\"{} comment-group\">{}</div>",
        class,
        comments.join("")
    )
}

// ---------------------------------------------------------------------------
// Editing
// ---------------------------------------------------------------------------

pub fn editing(schema: &BlockSchema, rich_text: Rc<dyn RichText>, clock: Clock) -> EditingUi {
    schema.for_editing(move |input| {
        let title = Rc::new(RefCell::new(
            input
                .values
                .text("title", &TEXT_HTML)
                .unwrap_or("")
                .to_string(),
        ));
        let live: Rc<RefCell<Option<Rc<dyn Surface>>>> = Rc::new(RefCell::new(None));
        let children = input.slot(CHILDREN).to_vec();
        let comments = input.slot(COMMENTS).to_vec();
        let save = input.save;

        let mount = {
            let title = title.clone();
            let live = live.clone();
            let rich_text = rich_text.clone();
            let clock = clock.clone();
            move |container: &Element| -> Result<MountedHandle, MountError> {
                let mut subscriptions = Vec::new();
                let mut handles = Vec::new();

                let initial = title.borrow().clone();
                let surface: Rc<dyn Surface> = Rc::from(rich_text.create(container, &initial));
                surface.element().add_class("page-title");
                subscriptions.push(surface.observe(Box::new({
                    let title = title.clone();
                    let save = save.clone();
                    move |html: &str| {
                        *title.borrow_mut() = html.to_string();
                        save.save(Values::new().with("title", &TEXT_HTML, FormatValue::text(html)));
                    }
                })));
                *live.borrow_mut() = Some(surface.clone());

                let content = Element::with_class("div", "page-content");
                container.append(&content);

                let now = clock();
                for child in &children {
                    let wrapper = block_wrapper(child, &save, &mut subscriptions);
                    content.append(&wrapper);
                    mount_child(child, &wrapper, &mut handles);

                    let threads = threads_for(&child.id, &comments);
                    if let Some(group) =
                        mount_threads("page-block-comment", &threads, now, &mut handles)
                    {
                        wrapper.append(&group);
                    }
                }

                let live = live.clone();
                let handle = MountedHandle::new(NAME, move || {
                    for mut subscription in subscriptions {
                        subscription.unsubscribe();
                    }
                    surface.destroy();
                    live.borrow_mut().take();
                    content.remove();
                    Ok(())
                });
                Ok(handle.with_children(handles))
            }
        };

        let apply = move |values: &Values| {
            let Some(html) = values.text("title", &TEXT_HTML) else {
                return;
            };
            *title.borrow_mut() = html.to_string();
            if let Some(surface) = live.borrow().as_ref() {
                surface.replace(html);
            }
        };

        Editor::new(mount, apply)
    })
}

/// The element a child block mounts into. Its `data-indent` attribute drives
/// the margin; Tab and Shift+Tab change it and report the new standoff value.
fn block_wrapper(
    child: &SlotItem<MountFn>,
    save: &Saver,
    subscriptions: &mut Vec<Subscription>,
) -> Element {
    let wrapper = Element::with_class("div", "page-block");
    wrapper.set_attr("data-miid", &child.id);
    wrapper.set_attr("data-indent", &indentation(child).to_string());

    let weak = wrapper.downgrade();
    subscriptions.push(wrapper.subscribe_attr("data-indent", move |value| {
        if let Some(el) = weak.upgrade() {
            el.set_style("margin-left", &format!("{}rem", value.unwrap_or("0")));
        }
    }));

    let weak = wrapper.downgrade();
    let save = save.clone();
    let id = child.id.clone();
    subscriptions.push(wrapper.listen("keydown", move |event| {
        let Event::KeyDown { key, shift } = event else {
            return;
        };
        if key != "Tab" {
            return;
        }
        let Some(el) = weak.upgrade() else {
            return;
        };
        let current: f64 = el
            .attr("data-indent")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);
        let next = if *shift {
            (current - 1.0).max(0.0)
        } else if current >= MAX_INDENT {
            // stored deeper than Tab reaches; never outdent on Tab
            current
        } else {
            (current + 1.0).min(MAX_INDENT)
        };
        if next == current {
            return;
        }
        el.set_attr("data-indent", &next.to_string());
        save.save_standoff(
            CHILDREN,
            &id,
            Values::new().with("indentation", &NUMBER_NATURAL, FormatValue::Number(next)),
        );
    }));

    wrapper
}

/// Mount one slot item. A failure leaves a flagged placeholder in its place
/// and does not stop the caller from mounting the rest.
fn mount_child(item: &SlotItem<MountFn>, container: &Element, handles: &mut Vec<MountedHandle>) {
    match (item.item)(container) {
        Ok(handle) => handles.push(handle),
        Err(error) => {
            tracing::warn!(id = %item.id, %error, "child mount failed");
            let placeholder = Element::with_class("div", "mintty-mount-failed");
            placeholder.set_text(&format!("could not mount {}: {}", item.id, error));
            container.append(&placeholder);
        }
    }
}

fn mount_threads(
    class: &str,
    threads: &[Thread<'_, MountFn>],
    now: u64,
    handles: &mut Vec<MountedHandle>,
) -> Option<Element> {
    if threads.is_empty() {
        return None;
    }
    let group = Element::with_class("div", class);
    group.add_class("comment-group");
    for thread in threads {
        let comment = thread.comment;
        let el = Element::with_class("div", "page-comment");
        el.set_attr("data-miid", &comment.id);

        let body = Element::with_class("div", "page-comment--body");
        el.append(&body);
        mount_child(comment, &body, handles);

        let meta = Element::with_class("div", "page-comment--meta");
        let poster = Element::with_class("span", "page-comment--poster");
        poster.set_text(byline(signer_of(comment)));
        let time = Element::with_class("time", "page-comment--time");
        let posted = posted_at(comment);
        time.set_attr("datetime", &posted.to_string());
        time.set_text(&from_now(posted, now));
        meta.append(&poster);
        meta.append(&time);
        el.append(&meta);

        if let Some(replies) = mount_threads("reply-comment-list", &thread.replies, now, handles) {
            el.append(&replies);
        }
        group.append(&el);
    }
    Some(group)
}
