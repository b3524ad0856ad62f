use compat_avro::AvroSchema;
use compat_core::{DiffKind, Error, Format, ParsedSchema, RuleSet};

fn user(extra_fields: &str) -> AvroSchema {
    let text = format!(
        r#"{{"type": "record", "name": "User", "namespace": "acme",
            "fields": [{{"name": "id", "type": "long"}}{extra_fields}]}}"#
    );
    AvroSchema::parse(text.as_bytes()).unwrap()
}

#[test]
fn field_without_default_breaks_backward_only() {
    let v1 = user("");
    let v2 = user(r#", {"name": "email", "type": "string"}"#);

    let err = v2.is_backward_compatible(&v1).unwrap_err();
    assert!(err.is_incompatible());
    assert_eq!(err.diffs().len(), 1);
    assert_eq!(err.diffs()[0].kind, DiffKind::AvroIncompatible);

    assert!(v2.is_forward_compatible(&v1).is_ok());
}

#[test]
fn field_with_default_is_fully_compatible() {
    let v1 = user("");
    let v2 = user(r#", {"name": "email", "type": ["null", "string"], "default": null}"#);

    assert!(v2.is_full_compatible(&v1).is_ok());
}

#[test]
fn type_promotion_is_one_directional() {
    let narrow = AvroSchema::parse(br#""int""#).unwrap();
    let wide = AvroSchema::parse(br#""long""#).unwrap();

    assert!(wide.is_backward_compatible(&narrow).is_ok());
    assert!(wide.is_forward_compatible(&narrow).is_err());
    assert!(matches!(wide.is_full_compatible(&narrow), Err(Error::Incompatible(_))));
}

#[test]
fn forward_rule_set_still_reports_resolution_failure() {
    let v1 = user("");
    let v2 = user(r#", {"name": "email", "type": "string"}"#);

    assert!(v2.compare(&v1, &RuleSet::FORWARD).contains(DiffKind::AvroIncompatible));
}

#[test]
fn canonical_value_uses_full_names() {
    let schema = user(r#", {"name": "email", "type": "string", "doc": "contact"}"#);
    let file = schema.canonical_value();

    assert_eq!(schema.format(), Format::Avro);
    assert_eq!(file.types, vec!["acme.User"]);
    assert_eq!(file.fields, vec!["acme.User.email", "acme.User.id"]);
    // doc attributes are stripped from the canonical form
    assert_eq!(
        file.id,
        user(r#", {"name": "email", "type": "string"}"#).canonical_value().id
    );
}
