//! Integration tests for record composition through the public API.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clear failure messages"
)]

use std::sync::Arc;

use camino::Utf8PathBuf;
use record_synth::{
    CompositionPlan, CountPolicy, Element, GenderLeaf, GenerationContext, GenerationError,
    KeyedTableLeaf, OptionalLeaf, Record, RecordComposer, Value, WeightedTable,
};
use rstest::{fixture, rstest};

struct NameTables {
    male: Arc<WeightedTable>,
    female: Arc<WeightedTable>,
}

#[fixture]
fn tables() -> NameTables {
    NameTables {
        male: Arc::new(
            WeightedTable::from_entries([("JAMES", 3.318), ("JOHN", 3.271)], false)
                .expect("male table"),
        ),
        female: Arc::new(
            WeightedTable::from_entries([("MARY", 2.629), ("PATRICIA", 1.073)], false)
                .expect("female table"),
        ),
    }
}

fn gender() -> Element {
    Element::leaf(GenderLeaf::new(0.5).expect("probability"))
}

fn first_name(tables: &NameTables) -> Element {
    Element::leaf(
        KeyedTableLeaf::new(
            "/gender",
            [("M", Arc::clone(&tables.male)), ("F", Arc::clone(&tables.female))],
        )
        .expect("tables"),
    )
}

fn text<'r>(record: &'r Record, label: &str) -> &'r str {
    record
        .get(label)
        .and_then(Value::as_text)
        .expect("text field")
}

#[rstest]
fn names_follow_the_gender_produced_first(tables: NameTables) {
    let mut composer = RecordComposer::new(2026);
    composer.add_field("gender", gender()).expect("label");
    composer
        .add_field("first_name", first_name(&tables))
        .expect("label");

    let records = composer.generate_batch(200).expect("generate");

    for record in &records {
        let name = text(record, "first_name");
        match text(record, "gender") {
            "M" => assert!(["JAMES", "JOHN"].contains(&name), "male name {name}"),
            "F" => assert!(["MARY", "PATRICIA"].contains(&name), "female name {name}"),
            other => panic!("unexpected gender {other}"),
        }
    }
    let genders: Vec<&str> = records.iter().map(|record| text(record, "gender")).collect();
    assert!(genders.contains(&"M") && genders.contains(&"F"));
}

#[rstest]
fn reading_a_later_field_fails(tables: NameTables) {
    let mut composer = RecordComposer::new(2026);
    composer
        .add_field("first_name", first_name(&tables))
        .expect("label");
    composer.add_field("gender", gender()).expect("label");

    let result = composer.generate();

    assert_eq!(
        result,
        Err(GenerationError::PathNotFound {
            path: "/gender".to_owned(),
            segment: "gender".to_owned(),
        })
    );
}

#[rstest]
fn composers_with_equal_seeds_agree(tables: NameTables) {
    let build = |seed| {
        let mut composer = RecordComposer::new(seed);
        composer.add_field("gender", gender()).expect("label");
        composer
            .add_field("first_name", first_name(&tables))
            .expect("label");
        composer
            .add_field(
                "kids",
                Element::list(
                    Element::leaf(GenderLeaf::new(0.5).expect("probability")),
                    CountPolicy::normal(2.0, 1.5, true).expect("policy"),
                ),
            )
            .expect("label");
        composer
    };

    let first = build(77).generate_batch(25).expect("generate");
    let second = build(77).generate_batch(25).expect("generate");
    let other = build(78).generate_batch(25).expect("generate");

    assert_eq!(first, second);
    assert_ne!(first, other);
}

#[test]
fn nested_fields_read_their_enclosing_record() {
    let mut name = Element::map();
    name.add_field("first", Element::constant(Value::from("ADA")))
        .expect("label");
    name.add_field(
        "initial",
        Element::leaf_fn(|ctx: &mut GenerationContext<'_>| {
            let first = ctx.resolve_text("/name/first")?;
            Ok(first.chars().next().map(|c| Value::from(c.to_string())))
        }),
    )
    .expect("label");
    let mut composer = RecordComposer::new(0);
    composer.add_field("name", name).expect("label");

    let record = composer.generate().expect("generate");

    let nested = record
        .get("name")
        .and_then(Value::as_record)
        .expect("name record");
    assert_eq!(nested.get("initial"), Some(&Value::from("A")));
}

#[test]
fn optional_fields_are_omitted_rather_than_null() {
    let mut composer = RecordComposer::new(4);
    composer
        .add_field(
            "nickname",
            Element::leaf(
                OptionalLeaf::new(Element::constant(Value::from("Ace")), 0.5)
                    .expect("probability"),
            ),
        )
        .expect("label");

    let records = composer.generate_batch(100).expect("generate");

    let present = records
        .iter()
        .filter(|record| record.contains_key("nickname"))
        .count();
    assert!(present > 0 && present < 100, "present in {present} records");
    assert!(records.iter().all(|record| {
        record
            .get("nickname")
            .is_none_or(|value| *value == Value::from("Ace"))
    }));
}

#[test]
fn demo_plan_generates_people() {
    let plan_path = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/person/plan.json");
    let plan = CompositionPlan::from_file(&plan_path).expect("demo plan");
    let base_dir = plan_path.parent().expect("plan directory");

    let mut built = plan.build(base_dir).expect("build demo plan");
    let records = built.composer_mut().generate_batch(50).expect("generate");

    assert_eq!(built.skipped_rows(), 0);
    for record in &records {
        let keys: Vec<&str> = record
            .keys()
            .map(String::as_str)
            .filter(|key| *key != "email")
            .collect();
        assert_eq!(keys, ["id", "gender", "name", "addresses"]);
        let addresses = record
            .get("addresses")
            .and_then(Value::as_list)
            .expect("addresses");
        assert!((1..3).contains(&addresses.len()));
        let first = record
            .get("name")
            .and_then(Value::as_record)
            .and_then(|name| name.get("first"))
            .and_then(Value::as_text)
            .expect("first name");
        assert_eq!(first, first.to_uppercase());
    }
}
