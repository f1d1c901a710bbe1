use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use query_composer::Configuration;
use query_composer::Mapping;
use query_composer::NormalizeError;
use query_composer::Normalizer;
use query_composer::Value;
use query_composer::normalize;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct Address {
    street: Option<String>,
    city: String,
}

#[derive(Serialize)]
struct Person {
    name: String,
    address: Address,
    extra: HashMap<String, Option<u32>>,
}

#[test]
fn nested_null_properties_keep_their_keys() {
    let person = Person {
        name: "Ada".to_string(),
        address: Address {
            street: None,
            city: "London".to_string(),
        },
        extra: HashMap::from([("age".to_string(), None)]),
    };

    let value = normalize(&person).unwrap();
    let address = value.get("address").and_then(Value::as_mapping).unwrap();
    assert_eq!(address.keys().collect::<Vec<_>>(), ["street", "city"]);
    assert_eq!(address.get("street"), Some(&Value::Null));
    assert_eq!(
        value.get("extra").and_then(|extra| extra.get("age")),
        Some(&Value::Null)
    );
}

#[test]
fn case_insensitive_duplicates_collapse() {
    let value = normalize(&json!({"Email": "first", "email": "second", "EMAIL": null})).unwrap();
    let mapping = value.as_mapping().unwrap();
    assert_eq!(mapping.len(), 1);
    assert_eq!(mapping.iter().collect::<Vec<_>>(), [("Email", &Value::from("first"))]);
}

#[test]
fn sequences_keep_their_order() {
    let value = normalize(&(3, "two", [1.5])).unwrap();
    assert_eq!(
        value,
        Value::from(vec![
            Value::from(3),
            Value::from("two"),
            Value::from(vec![Value::from(1.5)]),
        ])
    );
}

#[derive(Serialize)]
struct Link {
    next: RefCell<Option<Rc<Link>>>,
}

#[test_log::test]
fn self_referential_input_fails_with_a_defined_error() {
    let link = Rc::new(Link {
        next: RefCell::new(None),
    });
    *link.next.borrow_mut() = Some(Rc::clone(&link));

    let configuration = Configuration::from_yaml("normalization:\n  max_depth: 16\n").unwrap();
    let result = configuration.normalizer().normalize(&link);
    link.next.borrow_mut().take();

    let error = result.unwrap_err();
    assert_eq!(error, NormalizeError::RecursionLimitExceeded { limit: 16 });
    assert_eq!(error.extension_code(), "RECURSION_LIMIT_EXCEEDED");
}

#[test]
fn normalizing_a_canonical_value_is_the_identity() {
    let value = Value::from(Mapping::from_iter([
        ("list", Value::from(vec![Value::Null, Value::from(false)])),
        ("nested", Value::from(Mapping::from_iter([("k", Value::from(-1))]))),
    ]));
    let normalizer = Normalizer::default().with_max_depth(3);
    assert_eq!(normalizer.normalize(&value).unwrap(), value);
}

#[test]
fn struct_fields_keep_declaration_order() {
    let address = Address {
        street: Some("Baker Street".to_string()),
        city: "London".to_string(),
    };
    let in_order = Value::from(Mapping::from_iter([
        ("street", Value::from("Baker Street")),
        ("city", Value::from("London")),
    ]));
    let reversed = Value::from(Mapping::from_iter([
        ("city", Value::from("London")),
        ("street", Value::from("Baker Street")),
    ]));

    let value = normalize(&address).unwrap();
    assert_eq!(value, in_order);
    assert_ne!(value, reversed);
}
