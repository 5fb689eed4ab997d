use std::io::Write;

use blocks::relative_time::from_now;
use blocks::threads::{Thread, threads_for};
use blocks::{Env, demo_page, load_fixture, page, parse_fixture, standard_selector};
use mintty::dom::{Element, Event};
use mintty::format::{DATA_URI, ITEM_ID, NUMBER_NATURAL, TEXT_HTML};
use mintty::mount::prepare_document;
use mintty::{
    BlockSchema, BlockUi, DataTree, Editor, FormatRegistry, FormatValue, ItemPath, Markup,
    MountError, SaveEvent, SaveLog, Selection, SlotItem, SlotsConfig, Values, ValuesConfig,
    render_document,
};

const NOW: u64 = 1_700_000_000;

fn render(data: &DataTree) -> String {
    let env = Env::at(NOW);
    render_document(&standard_selector(&env), data).html
}

fn line(text: &str) -> DataTree {
    DataTree::new().text("text", &TEXT_HTML, text)
}

/// Number of comments in `threads`, replies included.
fn count<X>(threads: &[Thread<'_, X>]) -> usize {
    threads.iter().map(|t| 1 + count(&t.replies)).sum()
}

fn indent_event(id: &str, indentation: f64) -> SaveEvent {
    SaveEvent::Standoff {
        path: ItemPath::root(),
        slot: "children".to_string(),
        id: id.to_string(),
        values: Values::new().with("indentation", &NUMBER_NATURAL, FormatValue::Number(indentation)),
    }
}

/// Mounts the demo page into a fresh root.
struct Mounted {
    root: Element,
    log: SaveLog,
    handle: mintty::MountedHandle,
}

fn mount_demo() -> Mounted {
    let env = Env::at(NOW);
    let log = SaveLog::new();
    let root = Element::new("div");
    let editor = prepare_document(&standard_selector(&env), &demo_page(NOW), log.saver());
    let handle = editor.mount(&root).expect("mount failed");
    Mounted { root, log, handle }
}

fn wrapper(root: &Element, id: &str) -> Element {
    root.find_by_attr("data-miid", id).expect("no element for id")
}

fn editable(el: &Element) -> Element {
    el.find(&|e| e.attr("contenteditable").is_some())
        .expect("no editable surface")
}

// ---------------------------------------------------------------------------
// Line and image
// ---------------------------------------------------------------------------

#[test]
fn line_wraps_sanitized_html() {
    assert_eq!(
        render(&line("Hello <strong>World</strong>!")),
        "<div class=\"mintty-line-editor\">Hello <strong>World</strong>!</div>"
    );
    assert_eq!(
        render(&line("<img src=x>")),
        "<div class=\"mintty-line-editor\">&lt;img src=x&gt;</div>"
    );
}

#[test]
fn empty_line_is_a_break() {
    assert_eq!(render(&line("")), "<div class=\"mintty-line-editor\"><br/></div>");
}

#[test]
fn unrecognized_data_is_flagged() {
    let data = DataTree::new().text("color", &TEXT_HTML, "red");
    let env = Env::at(NOW);
    let selector = standard_selector(&env);
    assert_eq!(selector.pick(&data).via, Selection::Fallback);
    assert_eq!(
        render(&data),
        "<div class=\"mintty-line-editor mintty-unclassified\">unrecognized content (fields: color)</div>"
    );
}

#[test]
fn image_escapes_src_and_sanitizes_caption() {
    let data = DataTree::new()
        .text("imageSrc", &DATA_URI, "data:x'\"y")
        .text("title", &TEXT_HTML, "A <em>cat</em><script>");
    let html = render(&data);
    assert!(html.contains("src=\"data:x&#39;&quot;y\""), "{}", html);
    assert!(html.contains("A <em>cat</em>&lt;script&gt;"), "{}", html);
}

#[test]
fn image_apply_updates_in_place() {
    let data = DataTree::new()
        .text("imageSrc", &DATA_URI, "data:one")
        .text("title", &TEXT_HTML, "first");
    let env = Env::at(NOW);
    let root = Element::new("div");
    let editor = prepare_document(&standard_selector(&env), &data, SaveLog::new().saver());
    let mut handle = editor.mount(&root).unwrap();
    assert_eq!(handle.block(), "image");

    handle.apply(
        &Values::new()
            .with("imageSrc", &DATA_URI, FormatValue::text("data:two"))
            .with("title", &TEXT_HTML, FormatValue::text("<b>second</b>")),
    );
    let img = root.find(&|e| e.tag() == "img").unwrap();
    assert_eq!(img.attr("src").as_deref(), Some("data:two"));
    let caption = root.find_by_class("mintty-image--caption").unwrap();
    assert_eq!(caption.inner_html(), "<b>second</b>");

    handle.destroy().unwrap();
    assert!(!root.has_children());
}

// ---------------------------------------------------------------------------
// Page markup
// ---------------------------------------------------------------------------

#[test]
fn page_renders_children_with_indentation() {
    let html = render(&demo_page(NOW));
    assert!(html.contains("<div class=\"page-title\">Mintty Editor <sup>experiment</sup></div>"));
    assert!(html.contains(
        "<div class=\"page-block\" style=\"margin-left: 0rem\" data-miid=\"MIID-LINE-001\">"
    ));
    assert!(html.contains(
        "<div class=\"page-block\" style=\"margin-left: 1rem\" data-miid=\"MIID-LINE-002\">"
    ));
    assert!(html.contains("<style>.mintty-image {"));

    let order: Vec<usize> = ["MIID-LINE-001", "MIID-IMAGE-001", "MIID-LINE-002", "MIID-LINE-003"]
        .iter()
        .map(|id| html.find(&format!("data-miid=\"{}\"", id)).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{:?}", order);
}

#[test]
fn page_renders_comment_threads() {
    let html = render(&demo_page(NOW));
    assert!(html.contains("<span class=\"page-comment--poster\">colelawrence</span>"));
    assert!(html.contains("<span class=\"page-comment--poster\">hhg2288</span>"));
    assert!(html.contains(&format!(
        "<time class=\"page-comment--time\" datetime=\"{}\">5 minutes ago</time>",
        NOW - 300
    )));
    assert!(html.contains(">a minute ago</time>"));
    assert!(html.contains(">2 hours ago</time>"));

    // the reply sits inside its parent comment
    let parent = html.find("data-miid=\"MIID-COMMENT-001\"").unwrap();
    let replies = html.find("reply-comment-list comment-group").unwrap();
    let reply = html.find("data-miid=\"MIID-COMMENT-002\"").unwrap();
    assert!(parent < replies && replies < reply);

    // both comments on line 3 follow it, before the end of the page
    let line3 = html.find("data-miid=\"MIID-LINE-003\"").unwrap();
    let c3 = html.find("data-miid=\"MIID-COMMENT-003\"").unwrap();
    let c4 = html.find("data-miid=\"MIID-COMMENT-004\"").unwrap();
    assert!(line3 < c3 && c3 < c4);
    assert_eq!(html.matches("page-block-comment comment-group").count(), 2);
}

#[test]
fn page_without_comments_has_no_comment_groups() {
    let data = DataTree::tagged(page::NAME)
        .text("title", &TEXT_HTML, "Plain")
        .item("children", "MIID-LINE-001", page::child_standoff(0.5, 0.0), line("x"))
        .slot("comments");
    let html = render(&data);
    assert!(!html.contains("comment-group"));
    assert!(html.contains("<div class=\"mintty-line-editor\">x</div>"));
}

// ---------------------------------------------------------------------------
// Threads and times
// ---------------------------------------------------------------------------

fn comment(id: &str, target: &str) -> SlotItem<()> {
    let standoff = Values::new().with("targetId", &ITEM_ID, FormatValue::text(target));
    SlotItem::new(id, standoff, ())
}

#[test]
fn threads_nest_replies_in_order() {
    let comments = vec![
        comment("C-000001", "BLOCK-1"),
        comment("C-000002", "C-000001"),
        comment("C-000003", "BLOCK-1"),
        comment("C-000004", "C-000001"),
        comment("C-000005", "BLOCK-2"),
    ];
    let threads = threads_for("BLOCK-1", &comments);
    let top: Vec<&str> = threads.iter().map(|t| t.comment.id.as_str()).collect();
    assert_eq!(top, vec!["C-000001", "C-000003"]);
    let replies: Vec<&str> = threads[0].replies.iter().map(|t| t.comment.id.as_str()).collect();
    assert_eq!(replies, vec!["C-000002", "C-000004"]);
    assert_eq!(count(&threads), 4);
    assert!(threads_for("BLOCK-3", &comments).is_empty());
}

#[test]
fn reply_cycles_terminate() {
    let comments = vec![
        comment("C-000001", "BLOCK-1"),
        comment("C-000002", "C-000003"),
        comment("C-000003", "C-000002"),
        comment("C-000004", "C-000004"),
    ];
    assert_eq!(count(&threads_for("BLOCK-1", &comments)), 1);
    // each comment at most once, even when entered through the cycle
    assert_eq!(count(&threads_for("C-000002", &comments)), 2);
    assert_eq!(count(&threads_for("C-000004", &comments)), 1);
}

#[test]
fn relative_times() {
    let day = 86_400;
    assert_eq!(from_now(NOW - 10, NOW), "a few seconds ago");
    assert_eq!(from_now(NOW - 60, NOW), "a minute ago");
    assert_eq!(from_now(NOW - 300, NOW), "5 minutes ago");
    assert_eq!(from_now(NOW + 3600, NOW), "in an hour");
    assert_eq!(from_now(NOW - 3 * day, NOW), "3 days ago");
    assert_eq!(from_now(NOW - 40 * day, NOW), "a month ago");
    assert_eq!(from_now(NOW - 100 * day, NOW), "3 months ago");
    assert_eq!(from_now(NOW - 400 * day, NOW), "a year ago");
    assert_eq!(from_now(NOW - 1000 * day, NOW), "3 years ago");
}

// ---------------------------------------------------------------------------
// Page editing
// ---------------------------------------------------------------------------

#[test]
fn tab_indents_and_saves_standoff() {
    let Mounted { root, log, mut handle } = mount_demo();
    let block = wrapper(&root, "MIID-LINE-002");
    assert_eq!(block.attr("data-indent").as_deref(), Some("1"));
    assert_eq!(block.style("margin-left").as_deref(), Some("1rem"));

    block.dispatch(&Event::key("Tab"));
    assert_eq!(block.attr("data-indent").as_deref(), Some("2"));
    assert_eq!(block.style("margin-left").as_deref(), Some("2rem"));

    block.dispatch(&Event::shift_key("Tab"));
    block.dispatch(&Event::key("Enter"));
    assert_eq!(block.style("margin-left").as_deref(), Some("1rem"));

    assert_eq!(
        log.events(),
        vec![indent_event("MIID-LINE-002", 2.0), indent_event("MIID-LINE-002", 1.0)]
    );
    handle.destroy().unwrap();
}

#[test]
fn indentation_is_clamped() {
    let Mounted { root, log, mut handle } = mount_demo();
    let block = wrapper(&root, "MIID-LINE-001");

    block.dispatch(&Event::shift_key("Tab"));
    assert!(log.is_empty());

    for _ in 0..10 {
        block.dispatch(&Event::key("Tab"));
    }
    assert_eq!(block.attr("data-indent").as_deref(), Some("6"));
    assert_eq!(log.len(), 6);
    assert_eq!(log.events().last(), Some(&indent_event("MIID-LINE-001", 6.0)));
    handle.destroy().unwrap();
}

#[test]
fn tab_never_outdents_a_deep_block() {
    let env = Env::at(NOW);
    let log = SaveLog::new();
    let data = DataTree::tagged(page::NAME)
        .text("title", &TEXT_HTML, "Deep")
        .item("children", "MIID-DEEP-1", page::child_standoff(1.0, 10.0), line("deep"))
        .slot("comments");
    let root = Element::new("div");
    let mut handle = prepare_document(&standard_selector(&env), &data, log.saver())
        .mount(&root)
        .unwrap();
    let block = wrapper(&root, "MIID-DEEP-1");

    block.dispatch(&Event::key("Tab"));
    assert_eq!(block.attr("data-indent").as_deref(), Some("10"));
    assert!(log.is_empty());

    block.dispatch(&Event::shift_key("Tab"));
    assert_eq!(log.events(), vec![indent_event("MIID-DEEP-1", 9.0)]);
    handle.destroy().unwrap();
}

#[test]
fn edits_route_to_their_block_path() {
    let Mounted { root, log, mut handle } = mount_demo();

    let title = root.find_by_class("page-title").unwrap();
    title.dispatch(&Event::input("New <b>title</b>"));
    editable(&wrapper(&root, "MIID-LINE-001")).dispatch(&Event::input("Hi"));
    editable(&wrapper(&root, "MIID-COMMENT-001")).dispatch(&Event::input("Edited comment"));

    let events = log.take();
    assert_eq!(
        events,
        vec![
            SaveEvent::Values {
                path: ItemPath::root(),
                values: Values::new().with("title", &TEXT_HTML, FormatValue::text("New <b>title</b>")),
            },
            SaveEvent::Values {
                path: ItemPath::root().child("children", "MIID-LINE-001"),
                values: Values::new().with("text", &TEXT_HTML, FormatValue::text("Hi")),
            },
            SaveEvent::Values {
                path: ItemPath::root().child("comments", "MIID-COMMENT-001"),
                values: Values::new().with("text", &TEXT_HTML, FormatValue::text("Edited comment")),
            },
        ]
    );
    handle.destroy().unwrap();
}

#[test]
fn comments_mount_next_to_their_target() {
    let Mounted { root, mut handle, .. } = mount_demo();

    let block = wrapper(&root, "MIID-LINE-001");
    let comment = wrapper(&block, "MIID-COMMENT-001");
    assert_eq!(editable(&comment).inner_html(), "A comment");
    let reply = wrapper(&comment, "MIID-COMMENT-002");
    assert_eq!(
        reply.find_by_class("page-comment--poster").unwrap().inner_html(),
        "hhg2288"
    );
    assert_eq!(
        reply.find_by_class("page-comment--time").unwrap().inner_html(),
        "a minute ago"
    );

    let image_comment = wrapper(&root, "MIID-COMMENT-004");
    assert!(image_comment.find_by_class("mintty-image").is_some());
    handle.destroy().unwrap();
}

#[test]
fn title_apply_replaces_surface_content() {
    let Mounted { root, log, mut handle } = mount_demo();
    handle.apply(&Values::new().with("title", &TEXT_HTML, FormatValue::text("Renamed")));
    assert_eq!(root.find_by_class("page-title").unwrap().inner_html(), "Renamed");
    assert!(log.is_empty());
    handle.destroy().unwrap();
}

#[test]
fn destroy_leaves_root_empty() {
    let Mounted { root, log, mut handle } = mount_demo();
    let block = wrapper(&root, "MIID-LINE-002");
    let title = root.find_by_class("page-title").unwrap();

    handle.destroy().unwrap();
    handle.destroy().unwrap();
    assert!(!root.has_children());

    // listeners are gone with the mount
    block.dispatch(&Event::key("Tab"));
    title.dispatch(&Event::input("late"));
    assert!(log.is_empty());
    assert_eq!(block.listener_count(), 0);
}

fn broken_ui() -> BlockUi {
    let schema = BlockSchema::define("broken", ValuesConfig::new(), SlotsConfig::new());
    BlockUi::new(
        schema.for_markup(|_| Markup::new("")),
        schema.for_editing(|_| {
            Editor::new(
                |_: &Element| Err(MountError::failed("broken", "nope")),
                |_: &Values| {},
            )
        }),
    )
}

#[test]
fn failed_child_leaves_flagged_placeholder() {
    let env = Env::at(NOW);
    let selector = standard_selector(&env).register(broken_ui());
    let data = DataTree::tagged(page::NAME)
        .text("title", &TEXT_HTML, "t")
        .item("children", "MIID-BROKEN-1", page::child_standoff(1.0, 0.0), DataTree::tagged("broken"))
        .item("children", "MIID-LINE-001", page::child_standoff(2.0, 0.0), line("fine"))
        .slot("comments");

    let root = Element::new("div");
    let editor = prepare_document(&selector, &data, SaveLog::new().saver());
    let mut handle = editor.mount(&root).unwrap();

    let placeholder = wrapper(&root, "MIID-BROKEN-1")
        .find_by_class("mintty-mount-failed")
        .unwrap();
    assert_eq!(
        placeholder.inner_html(),
        "could not mount MIID-BROKEN-1: mount of broken failed: nope"
    );
    assert_eq!(editable(&wrapper(&root, "MIID-LINE-001")).inner_html(), "fine");

    handle.destroy().unwrap();
    assert!(!root.has_children());
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[test]
fn demo_page_is_valid() {
    let env = Env::at(NOW);
    let selector = standard_selector(&env);
    let demo = demo_page(NOW);
    let report = selector.validate(&demo);
    assert!(report.is_clean(), "{:?}", report);
    assert!(page::schema().fixture(demo.clone()).is_ok());

    let kinds: Vec<&str> = demo
        .slot_items("children")
        .iter()
        .map(|item| selector.pick(&item.item).ui.name())
        .collect();
    assert_eq!(kinds, vec!["line", "image", "line", "line"]);
}

#[test]
fn bundled_fixture_matches_demo_shape() {
    let source = include_str!("../../demos/page.toml");
    let data = parse_fixture(source, &FormatRegistry::standard()).unwrap();
    let demo = demo_page(NOW);

    assert_eq!(data.kind.as_deref(), Some("page"));
    assert_eq!(data.values, demo.values);
    for slot in ["children", "comments"] {
        let ids: Vec<&str> = data.slot_items(slot).iter().map(|i| i.id.as_str()).collect();
        let demo_ids: Vec<&str> = demo.slot_items(slot).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, demo_ids);
    }
    assert_eq!(data.slot_items("children"), demo.slot_items("children"));

    let env = Env::at(NOW);
    assert!(standard_selector(&env).validate(&data).is_clean());
}

#[test]
fn fixture_markdown_is_derived() {
    let source = r#"
values.text."text/markdown" = "Hello **there**"
"#;
    let data = parse_fixture(source, &FormatRegistry::standard()).unwrap();
    assert_eq!(render(&data), "<div class=\"mintty-line-editor\">Hello <strong>there</strong></div>");
}

#[test]
fn invalid_value_points_at_its_item() {
    let source = r#"kind = "page"
values.title."text/html" = "t"

[[slots.children]]
id = "MIID-LINE-001"
standoff.fractionalIndex."number/decimal" = 1
standoff.indentation."number/natural" = -1
block.values.text."text/html" = "x"
"#;
    let error = parse_fixture(source, &FormatRegistry::standard()).unwrap_err();
    assert_eq!(
        error.message,
        "invalid number/natural: number (-1) cannot be natural if it's negative"
    );
    let span = error.span.clone().unwrap();
    assert_eq!(&source[span], "id = \"MIID-LINE-001\"");
    assert_eq!(
        error.notes,
        vec!["in the standoff of the block at /children/MIID-LINE-001".to_string()]
    );
    assert_eq!(error.to_diagnostic(0).labels.len(), 1);
}

#[test]
fn syntax_errors_carry_a_span() {
    let error = parse_fixture("kind = ", &FormatRegistry::standard()).unwrap_err();
    assert!(error.span.is_some());

    let error =
        parse_fixture("kind = \"line\"\ncolour = 1\n", &FormatRegistry::standard()).unwrap_err();
    assert!(error.message.contains("unknown field"), "{}", error.message);
}

#[test]
fn unknown_formats_are_rejected() {
    let error = parse_fixture(
        "values.text.\"text/rtf\" = \"x\"\n",
        &FormatRegistry::standard(),
    )
    .unwrap_err();
    assert_eq!(error.message, "unknown format: text/rtf");
    assert_eq!(error.span, None);
    assert_eq!(error.notes, vec!["in the values of the block at /".to_string()]);
}

#[test]
fn load_fixture_from_disk() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    let path = dir.path().join("line.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "kind = \"line\"\nvalues.text.\"text/html\" = \"From disk\"\n").unwrap();

    let data = load_fixture(&path, &FormatRegistry::standard()).unwrap();
    assert_eq!(data.kind.as_deref(), Some("line"));
    assert_eq!(data.values.text("text", &TEXT_HTML), Some("From disk"));

    let missing = load_fixture(&dir.path().join("nope.toml"), &FormatRegistry::standard())
        .unwrap_err();
    assert!(missing.message.starts_with("cannot read"), "{}", missing.message);
    assert_eq!(missing.span, None);
}
