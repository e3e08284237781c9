use crate::error::ValidationError;
use crate::model::{Document, Entity, EntityType, Span, Style};
use serde_json::{Map, Value};
use std::ops::Deref;

/// A document that passed validation.
///
/// Every inline span lies within the text and every entity key resolves, so
/// rendering and previewing can index without further checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDocument {
    doc: Document,
    text_len: usize,
}

impl ValidatedDocument {
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_inner(self) -> Document {
        self.doc
    }

    /// Length of the text in codepoints.
    pub fn text_len(&self) -> usize {
        self.text_len
    }

    /// Entity referenced by `span`, if any.
    pub fn entity_for(&self, span: &Span) -> Option<&Entity> {
        let key = usize::try_from(span.entity_key()?).ok()?;
        self.doc.entities.get(key)
    }
}

impl Deref for ValidatedDocument {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.doc
    }
}

impl TryFrom<Document> for ValidatedDocument {
    type Error = ValidationError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let text_len = doc.text.chars().count();
        for (idx, span) in doc.spans.iter().enumerate() {
            check_span(idx, span, text_len, doc.entities.len())
                .inspect_err(|err| tracing::debug!(%err, "rejected drafty document"))?;
        }
        Ok(Self { doc, text_len })
    }
}

/// Decode and validate a document from its JSON value.
///
/// Checks run in document order (text, then each span, then each entity) and
/// the first violation is returned.
#[tracing::instrument(level = "debug", skip_all)]
pub fn validate(value: &Value) -> Result<ValidatedDocument, ValidationError> {
    decode(value).inspect_err(|err| tracing::debug!(%err, "rejected drafty document"))
}

fn decode(value: &Value) -> Result<ValidatedDocument, ValidationError> {
    let root = value
        .as_object()
        .ok_or_else(|| ValidationError::type_mismatch("document", "an object"))?;

    let text = match root.get("txt") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(_) => return Err(ValidationError::type_mismatch("txt", "a string")),
    };
    let text_len = text.chars().count();

    let raw_spans = array_field(root, "fmt")?;
    let raw_entities = array_field(root, "ent")?;

    let mut spans = Vec::with_capacity(raw_spans.len());
    for (idx, raw) in raw_spans.iter().enumerate() {
        let span = decode_span(idx, raw)?;
        check_span(idx, &span, text_len, raw_entities.len())?;
        spans.push(span);
    }

    let entities = raw_entities
        .iter()
        .enumerate()
        .map(|(idx, raw)| decode_entity(idx, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedDocument {
        doc: Document {
            text,
            spans,
            entities,
        },
        text_len,
    })
}

fn array_field<'v>(root: &'v Map<String, Value>, name: &str) -> Result<&'v [Value], ValidationError> {
    match root.get(name) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(ValidationError::type_mismatch(name, "an array")),
    }
}

/// Integral JSON number. Decoders that map every number to a float are common,
/// so `3.0` is accepted as `3`.
fn integer(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    number
        .as_i64()
        .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
}

fn integer_field(
    obj: &Map<String, Value>,
    name: &str,
    path: impl FnOnce() -> String,
) -> Result<Option<i64>, ValidationError> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => integer(value)
            .map(Some)
            .ok_or_else(|| ValidationError::type_mismatch(path(), "an integer")),
    }
}

fn decode_span(idx: usize, raw: &Value) -> Result<Span, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::type_mismatch(format!("fmt[{idx}]"), "an object"))?;

    let start = integer_field(obj, "at", || format!("fmt[{idx}].at"))?.unwrap_or(0);
    let length = integer_field(obj, "len", || format!("fmt[{idx}].len"))?.unwrap_or(0);
    let key = integer_field(obj, "key", || format!("fmt[{idx}].key"))?;
    let style = match obj.get("tp") {
        None | Some(Value::Null) => None,
        Some(Value::String(tag)) => Some(Style::from(tag.as_str())),
        Some(_) => {
            return Err(ValidationError::type_mismatch(
                format!("fmt[{idx}].tp"),
                "a string",
            ));
        }
    };

    Ok(Span {
        start,
        length,
        style,
        key,
    })
}

fn check_span(
    idx: usize,
    span: &Span,
    text_len: usize,
    entities: usize,
) -> Result<(), ValidationError> {
    if span.length < 0 {
        return Err(ValidationError::NegativeLength {
            span: idx,
            len: span.length,
        });
    }

    if !span.is_attachment() {
        let limit = i64::try_from(text_len).unwrap_or(i64::MAX);
        let in_bounds = span.start >= 0
            && span
                .start
                .checked_add(span.length)
                .is_some_and(|end| end <= limit);
        if !in_bounds {
            return Err(ValidationError::OutOfBounds {
                span: idx,
                at: span.start,
                len: span.length,
                text_len,
            });
        }
    }

    if let Some(key) = span.entity_key() {
        let resolves = usize::try_from(key).is_ok_and(|key| key < entities);
        if !resolves {
            return Err(ValidationError::DanglingEntityReference {
                span: idx,
                key,
                entities,
            });
        }
    }

    Ok(())
}

fn decode_entity(idx: usize, raw: &Value) -> Result<Entity, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::type_mismatch(format!("ent[{idx}]"), "an object"))?;

    let kind = match obj.get("tp") {
        Some(Value::String(tag)) => EntityType::from(tag.as_str()),
        _ => {
            return Err(ValidationError::type_mismatch(
                format!("ent[{idx}].tp"),
                "a string",
            ));
        }
    };

    let data = match obj.get("data") {
        None | Some(Value::Null) => None,
        Some(Value::Object(data)) => Some(data.clone()),
        Some(_) => return Err(ValidationError::InvalidEntityData { entity: idx }),
    };

    Ok(Entity { kind, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attachment_only() {
        let doc = validate(&json!({
            "ent": [{"data": {"mime": "image/jpeg", "name": "hello.jpg"}, "tp": "EX"}],
            "fmt": [{"at": -1, "key": 0}]
        }))
        .unwrap();

        assert_eq!(doc.text_len(), 0);
        assert!(doc.spans[0].is_attachment());
        assert_eq!(doc.entities[0].kind, EntityType::File);
    }

    #[test]
    fn test_counts_codepoints() {
        let doc = validate(&json!({
            "txt": "мультибайтовый юникод",
            "fmt": [{"len": 14, "tp": "ST"}, {"at": 15, "len": 6, "tp": "EM"}]
        }))
        .unwrap();
        assert_eq!(doc.text_len(), 21);
    }

    #[test]
    fn test_integral_floats_accepted() {
        let doc = validate(&json!({"txt": "abc", "fmt": [{"at": 1.0, "len": 2.0, "tp": "ST"}]}))
            .unwrap();
        assert_eq!(doc.spans[0].start, 1);
        assert_eq!(doc.spans[0].length, 2);
    }

    #[test]
    fn test_text_must_be_string() {
        let err = validate(&json!({"txt": true})).unwrap_err();
        assert_eq!(err, ValidationError::type_mismatch("txt", "a string"));
    }

    #[test]
    fn test_fractional_offset_rejected() {
        let err = validate(&json!({"txt": "abc", "fmt": [{"at": 0.5, "tp": "ST"}]})).unwrap_err();
        assert_eq!(err, ValidationError::type_mismatch("fmt[0].at", "an integer"));
    }

    #[test]
    fn test_negative_length() {
        let err = validate(&json!({
            "txt": "This should fail",
            "fmt": [{"at": 50, "len": -45, "tp": "ST"}]
        }))
        .unwrap_err();
        assert_eq!(err, ValidationError::NegativeLength { span: 0, len: -45 });
    }

    #[test]
    fn test_negative_length_on_attachment() {
        let err = validate(&json!({
            "ent": [{"tp": "EX"}],
            "fmt": [{"at": -1, "len": -1, "key": 0}]
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::NegativeLength { .. }));
    }

    #[test]
    fn test_out_of_bounds() {
        let err = validate(&json!({
            "txt": "This should fail",
            "fmt": [{"at": 0, "len": 50, "tp": "ST"}]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutOfBounds {
                span: 0,
                at: 0,
                len: 50,
                text_len: 16
            }
        );
    }

    #[test]
    fn test_start_below_sentinel() {
        let err = validate(&json!({"txt": "abc", "fmt": [{"at": -2, "len": 1, "tp": "ST"}]}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfBounds { at: -2, .. }));
    }

    #[test]
    fn test_overflowing_end() {
        let err = validate(&json!({"txt": "abc", "fmt": [{"at": 1, "len": i64::MAX, "tp": "ST"}]}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfBounds { .. }));
    }

    #[test]
    fn test_dangling_reference() {
        let err = validate(&json!({
            "ent": [],
            "fmt": [{"at": 0, "len": 1, "tp": "ST", "key": 1}]
        }))
        .unwrap_err();
        // Empty text: bounds are checked before the key.
        assert!(matches!(err, ValidationError::OutOfBounds { .. }));

        let err = validate(&json!({"txt": "x", "fmt": [{"len": 1, "tp": "ST", "key": 1}]}))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::DanglingEntityReference {
                span: 0,
                key: 1,
                entities: 0
            }
        );
    }

    #[test]
    fn test_negative_key() {
        let err = validate(&json!({
            "ent": [{"xy": true, "tp": "XY"}],
            "fmt": [{"len": 1, "key": -2}],
            "txt": " "
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::DanglingEntityReference { key: -2, .. }
        ));
    }

    #[test]
    fn test_implicit_key_needs_entity() {
        let err = validate(&json!({"txt": "abc", "fmt": [{"len": 3}]})).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::DanglingEntityReference { key: 0, .. }
        ));
    }

    #[test]
    fn test_spans_checked_before_entities() {
        let err = validate(&json!({
            "ent": [{"data": true, "tp": "ST"}],
            "fmt": [{"len": 1, "key": 42}],
            "txt": "123"
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::DanglingEntityReference { key: 42, .. }
        ));
    }

    #[test]
    fn test_entity_data_must_be_mapping() {
        let err = validate(&json!({
            "ent": [{"tp": "LN", "data": {"url": "x"}}, {"tp": "IM", "data": "payload"}],
            "fmt": [{"len": 1}],
            "txt": "1"
        }))
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidEntityData { entity: 1 });
    }

    #[test]
    fn test_try_from_document() {
        let ok = Document::new("hello").with_span(Span::styled(0, 5, Style::Strong));
        assert_eq!(ValidatedDocument::try_from(ok).unwrap().text_len(), 5);

        let bad = Document::new("hello").with_span(Span::entity(0, 2, 0));
        assert!(matches!(
            ValidatedDocument::try_from(bad),
            Err(ValidationError::DanglingEntityReference { .. })
        ));
    }
}
