use mintty::format::{ITEM_ID, NUMBER_DECIMAL, NUMBER_NATURAL, TEXT_HTML, TEXT_MARKDOWN};
use mintty::slots::Multiplicity;
use mintty::{
    BlockSchema, DataTree, FormatValue, ItemPath, SchemaErrorKind, SlotsConfig, Values,
    ValuesConfig,
};

fn list_schema() -> BlockSchema {
    BlockSchema::define(
        "list",
        ValuesConfig::new().field("title", TEXT_HTML),
        SlotsConfig::new()
            .slot("items", ValuesConfig::new().field("position", NUMBER_DECIMAL))
            .slot("notes", ValuesConfig::new().field("targetId", ITEM_ID)),
    )
}

fn at(position: f64) -> Values {
    Values::new().with("position", &NUMBER_DECIMAL, FormatValue::Number(position))
}

fn line(text: &str) -> DataTree {
    DataTree::new().text("text", &TEXT_HTML, text)
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[test]
fn values_hold_several_encodings_per_field() {
    let values = Values::new()
        .with("text", &TEXT_MARKDOWN, FormatValue::text("*hi*"))
        .with("text", &TEXT_HTML, FormatValue::text("<em>hi</em>"));
    assert_eq!(values.field("text").map(|f| f.len()), Some(2));
    assert_eq!(values.text("text", &TEXT_HTML), Some("<em>hi</em>"));
    assert_eq!(values.number("text", &TEXT_HTML), None);
    assert_eq!(values.field_names(), vec!["text".to_string()]);
}

#[test]
fn merge_overrides_per_encoding() {
    let base = Values::new()
        .with("text", &TEXT_HTML, FormatValue::text("old"))
        .with("text", &TEXT_MARKDOWN, FormatValue::text("md"))
        .with("title", &TEXT_HTML, FormatValue::text("kept"));
    let update = Values::new().with("text", &TEXT_HTML, FormatValue::text("new"));

    let merged = Values::merged(&[&base, &update]);
    assert_eq!(merged.text("text", &TEXT_HTML), Some("new"));
    assert_eq!(merged.text("text", &TEXT_MARKDOWN), Some("md"));
    assert_eq!(merged.text("title", &TEXT_HTML), Some("kept"));
    // inputs untouched
    assert_eq!(base.text("text", &TEXT_HTML), Some("old"));
}

#[test]
fn values_config_reports_each_problem() {
    let config = ValuesConfig::new()
        .field("title", TEXT_HTML)
        .field("indentation", NUMBER_NATURAL);
    let values = Values::new()
        .with("title", &TEXT_MARKDOWN, FormatValue::text("wrong encoding"))
        .with("indentation", &NUMBER_NATURAL, FormatValue::Number(-1.0))
        .with("color", &TEXT_HTML, FormatValue::text("red"));

    let errors = config.check(&values);
    assert_eq!(errors.len(), 3, "{:?}", errors);
    assert!(errors.contains(&SchemaErrorKind::MissingField {
        field: "title".to_string(),
        format: "text/html".to_string(),
    }));
    assert!(errors.contains(&SchemaErrorKind::UnexpectedField("color".to_string())));
    assert!(errors.iter().any(|e| matches!(
        e,
        SchemaErrorKind::InvalidValue { field, .. } if field == "indentation"
    )));
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[test]
fn valid_fixture_passes() {
    let data = DataTree::new()
        .text("title", &TEXT_HTML, "Groceries")
        .item("items", "ITEM-0001", at(1.0), line("milk"))
        .item("items", "ITEM-0002", at(2.0), line("eggs"));
    let fixture = list_schema().fixture(data.clone()).unwrap();
    assert_eq!(fixture, data);
}

#[test]
fn declared_slot_may_be_absent() {
    let data = DataTree::new().text("title", &TEXT_HTML, "Empty");
    assert!(list_schema().fixture(data).is_ok());
}

#[test]
fn empty_values_are_still_valid() {
    let data = DataTree::new().text("title", &TEXT_HTML, "").slot("items");
    assert!(list_schema().fixture(data).is_ok());
}

#[test]
fn unknown_slot_is_rejected() {
    let data = DataTree::new()
        .text("title", &TEXT_HTML, "t")
        .item("extras", "ITEM-0001", Values::new(), line("x"));
    let errors = list_schema().fixture(data).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, SchemaErrorKind::UnknownSlot("extras".to_string()));
    assert_eq!(errors[0].schema, "list");
    assert!(errors[0].path.is_root());
}

#[test]
fn duplicate_ids_within_a_slot_are_rejected() {
    let data = DataTree::new()
        .text("title", &TEXT_HTML, "t")
        .item("items", "ITEM-0001", at(1.0), line("a"))
        .item("items", "ITEM-0001", at(2.0), line("b"));
    let errors = list_schema().fixture(data).unwrap_err();
    assert_eq!(
        errors[0].kind,
        SchemaErrorKind::DuplicateItem {
            slot: "items".to_string(),
            id: "ITEM-0001".to_string(),
        }
    );
}

#[test]
fn same_id_in_different_slots_is_fine() {
    let note = Values::new().with("targetId", &ITEM_ID, FormatValue::text("ITEM-0001"));
    let data = DataTree::new()
        .text("title", &TEXT_HTML, "t")
        .item("items", "ITEM-0001", at(1.0), line("a"))
        .item("notes", "ITEM-0001", note, line("b"));
    assert!(list_schema().fixture(data).is_ok());
}

#[test]
fn standoff_is_checked_against_its_slot() {
    let data = DataTree::new()
        .text("title", &TEXT_HTML, "t")
        .item("items", "ITEM-0001", Values::new(), line("a"));
    let errors = list_schema().fixture(data).unwrap_err();
    match &errors[0].kind {
        SchemaErrorKind::InvalidStandoff { slot, id, reason } => {
            assert_eq!(slot, "items");
            assert_eq!(id, "ITEM-0001");
            assert!(matches!(**reason, SchemaErrorKind::MissingField { .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn schema_error_names_schema_and_path() {
    let data = DataTree::new();
    let path = ItemPath::root().child("items", "ITEM-0001");
    let errors = list_schema().check(&data, &path);
    assert_eq!(
        errors[0].to_string(),
        "list at /items/ITEM-0001: missing field `title` in format text/html"
    );
}

#[test]
fn clones_share_one_declaration() {
    let a = list_schema();
    let b = a.clone();
    assert_eq!(a, b);
    assert_ne!(a, list_schema());
    assert_eq!(b.slots().names().collect::<Vec<_>>(), vec!["items", "notes"]);
    assert_eq!(
        b.slots().get("items").map(|slot| slot.multiplicity),
        Some(Multiplicity::Many)
    );
}
