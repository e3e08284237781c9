// End-to-end checks over decoded JSON documents: validate, then render or preview.

use drafty::{
    ValidatedDocument, ValidationError, preview, render, to_plain_text, to_preview, validate,
};
use serde_json::{Value, json};

fn valid_inputs() -> Vec<Value> {
    vec![
        json!({
            "ent": [{"data": {"mime": "image/jpeg", "name": "hello.jpg", "val": "<38992, bytes: ...>"}, "tp": "EX"}],
            "fmt": [{"at": -1, "key": 0}]
        }),
        json!({
            "ent": [{"data": {"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}, "tp": "LN"}],
            "fmt": [{"len": 22}],
            "txt": "https://api.tinode.co/"
        }),
        json!({
            "ent": [{"data": {"url": "https://api.tinode.co/"}, "tp": "LN"}],
            "fmt": [{"len": 22}],
            "txt": "https://api.tinode.co/"
        }),
        json!({
            "ent": [{"data": {"height": 213, "mime": "image/jpeg", "name": "roses.jpg", "val": "<38992, bytes: ...>", "width": 638}, "tp": "IM"}],
            "fmt": [{"len": 1}],
            "txt": " "
        }),
        json!({
            "txt": "This text is formatted and deleted too",
            "fmt": [{"at": 5, "len": 4, "tp": "ST"}, {"at": 13, "len": 9, "tp": "EM"}, {"at": 35, "len": 3, "tp": "ST"}, {"at": 27, "len": 11, "tp": "DL"}]
        }),
        json!({
            "txt": "мультибайтовый юникод",
            "fmt": [{"len": 14, "tp": "ST"}, {"at": 15, "len": 6, "tp": "EM"}]
        }),
        json!({
            "txt": "Hello @alice, see #rust and these docs",
            "fmt": [
                {"at": 6, "len": 6, "key": 0},
                {"at": 18, "len": 5, "key": 1},
                {"at": 34, "len": 4, "key": 2},
                {"at": 0, "len": 38, "tp": "EM"},
                {"at": 24, "len": 14, "tp": "ST"},
                {"at": -1, "key": 3}
            ],
            "ent": [
                {"tp": "MN", "data": {"val": "usr123"}},
                {"tp": "HT", "data": {"val": "rust"}},
                {"tp": "LN", "data": {"url": "https://docs.rs"}},
                {"tp": "EX", "data": {"name": "notes.txt", "mime": "text/plain", "val": "aGVsbG8="}}
            ]
        }),
    ]
}

fn invalid_inputs() -> Vec<Value> {
    vec![
        json!({"txt": "This should fail", "fmt": [{"at": 50, "len": -45, "tp": "ST"}]}),
        json!({"txt": "This should fail", "fmt": [{"at": 0, "len": 50, "tp": "ST"}]}),
        json!({"ent": [], "fmt": [{"at": 0, "len": 1, "tp": "ST", "key": 1}]}),
        json!({"ent": [{"xy": true, "tp": "XY"}], "fmt": [{"len": 1, "key": -2}], "txt": " "}),
        json!({"ent": [{"data": true, "tp": "ST"}], "fmt": [{"len": 1, "key": 42}], "txt": "123"}),
        json!({"txt": true}),
        json!({"txt": "x", "ent": [{"tp": "IM", "data": 7}]}),
    ]
}

#[test]
fn renders_valid_documents() {
    let expected = [
        "[FILE 'hello.jpg']",
        "[https://api.tinode.co/](https://www.youtube.com/watch?v=dQw4w9WgXcQ)",
        "https://api.tinode.co/",
        "[IMAGE 'roses.jpg']",
        "This *text* is _formatted_ and ~deleted *too*~",
        "*мультибайтовый* _юникод_",
        "_Hello @alice, see #rust _*_and these [docs](https://docs.rs)_*[FILE 'notes.txt']",
    ];

    for (idx, (input, expected)) in valid_inputs().iter().zip(expected).enumerate() {
        let output = to_plain_text(input).unwrap_or_else(|err| panic!("input {idx}: {err}"));
        assert_eq!(output, expected, "input {idx}");
    }
}

#[test]
fn rejects_invalid_documents() {
    let errors: Vec<_> = invalid_inputs()
        .iter()
        .map(|input| validate(input).unwrap_err())
        .collect();

    assert!(matches!(errors[0], ValidationError::NegativeLength { .. }));
    assert!(matches!(errors[1], ValidationError::OutOfBounds { .. }));
    assert!(matches!(errors[2], ValidationError::OutOfBounds { .. }));
    assert!(matches!(
        errors[3],
        ValidationError::DanglingEntityReference { key: -2, .. }
    ));
    assert!(matches!(
        errors[4],
        ValidationError::DanglingEntityReference { key: 42, .. }
    ));
    assert!(matches!(errors[5], ValidationError::TypeMismatch { .. }));
    assert_eq!(errors[6], ValidationError::InvalidEntityData { entity: 0 });
}

#[test]
fn dangling_key_without_entities() {
    let err = validate(&json!({"txt": "x", "fmt": [{"len": 1, "key": 1}]})).unwrap_err();
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
fn preview_properties_hold() {
    for input in valid_inputs() {
        let doc = validate(&input).unwrap();
        for max_length in [0, 1, 5, 15, 40] {
            let short = preview(&doc, max_length);
            assert!(short.text.chars().count() <= max_length);

            // Keys are dense and every entity is referenced.
            let mut seen = vec![false; short.entities.len()];
            for span in &short.spans {
                if let Some(key) = span.entity_key() {
                    seen[key as usize] = true;
                }
            }
            assert!(seen.iter().all(|referenced| *referenced));

            // The preview is itself valid and renders without dangling references.
            let reparsed = validate(&serde_json::to_value(&short).unwrap()).unwrap();
            let again = ValidatedDocument::try_from(short).unwrap();
            assert_eq!(render(&reparsed), render(&again));
        }
    }
}

#[test]
fn preview_strips_image_payload() {
    let doc = validate(&valid_inputs()[3]).unwrap();
    let short = preview(&doc, 15);
    let data = short.entities[0].data.as_ref().unwrap();

    assert!(data.get("val").is_none());
    for field in ["width", "height", "mime", "name"] {
        assert!(data.contains_key(field), "missing {field}");
    }
    insta::assert_snapshot!(render(&ValidatedDocument::try_from(short).unwrap()), @"[IMAGE 'roses.jpg']");
}

#[test]
fn preview_then_render() {
    let doc = validate(&valid_inputs()[4]).unwrap();
    let short = ValidatedDocument::try_from(preview(&doc, 15)).unwrap();
    insta::assert_snapshot!(render(&short), @"This *text* is _fo_");
}

#[test]
fn span_order_does_not_change_output() {
    let forward = json!({
        "txt": "aaaaabbbbbcccccddddd",
        "fmt": [{"at": 0, "len": 15, "tp": "DL"}, {"at": 5, "len": 15, "tp": "ST"}, {"at": 3, "len": 10, "tp": "EM"}]
    });
    let mut backward = forward.clone();
    if let Some(spans) = backward["fmt"].as_array_mut() {
        spans.reverse();
    }

    let expected = to_plain_text(&forward).unwrap();
    assert_eq!(to_plain_text(&backward).unwrap(), expected);
    insta::assert_snapshot!(expected, @"~aaa_aa_*_bbbbbccc_cc*~*ddddd*");
}

#[test]
fn to_preview_validates_first() {
    let short = to_preview(&valid_inputs()[5], 15).unwrap();
    assert_eq!(
        serde_json::to_value(&short).unwrap(),
        json!({"txt": "мультибайтовый ", "fmt": [{"len": 14, "tp": "ST"}]})
    );

    for idx in [0, 3, 5] {
        assert!(to_preview(&invalid_inputs()[idx], 15).is_err(), "input {idx}");
    }
}
