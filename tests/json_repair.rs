use llm_stream_parser::StreamError;
use llm_stream_parser::json::{
    Completion, Limits, PendingScalars, TRIVIAL_DOCUMENT, complete, complete_into, repair,
    repair_into, repair_with,
};
use serde_json::{Value, json};

const SAMPLES: &[&str] = &[
    r#"{"name":"Alice","age":30,"tags":["a","b"],"nested":{"x":[1,2.5e-3,{"y":null}],"ok":true}}"#,
    r#"[{"id":1,"text":"line\nbreak \"quoted\" \u00e9 \ud83d\ude00"},{"id":-0.5,"empty":{}},[],false]"#,
    r#"  { "spaced" : [ 1 , 2 ] , "s" : "x" }  "#,
    r#""just a string""#,
    "-12.75E+2",
    r#"{"unicode":"日本語","emoji":"😀"}"#,
];

fn limits() -> Limits {
    Limits::default()
}

fn char_prefixes(doc: &str) -> impl Iterator<Item = &str> {
    doc.char_indices()
        .map(|(i, _)| &doc[..i])
        .chain(std::iter::once(doc))
}

#[test]
fn test_dangling_key_removal() {
    assert_eq!(repair(r#"{"a":1,"b":"#, &limits()).unwrap().text, r#"{"a":1}"#);
}

#[test]
fn test_string_closure() {
    assert_eq!(repair(r#"{"a":"hel"#, &limits()).unwrap().text, r#"{"a":"hel"}"#);
}

#[test]
fn test_prefix_safety_repair() {
    for doc in SAMPLES {
        for prefix in char_prefixes(doc) {
            for pending in [PendingScalars::Close, PendingScalars::Omit] {
                let repaired = repair_with(prefix, pending, &limits()).unwrap();
                assert!(
                    serde_json::from_str::<Value>(&repaired.text).is_ok(),
                    "repair({:?}, {}) = {:?} does not parse",
                    prefix,
                    pending,
                    repaired.text
                );
            }
        }
    }
}

#[test]
fn test_prefix_safety_complete() {
    for doc in SAMPLES {
        for prefix in char_prefixes(doc) {
            let completion = complete(prefix, &limits()).unwrap();
            let text = completion.apply(prefix);
            if completion == Completion::NotNeeded {
                assert_eq!(text, prefix);
            }
            assert!(
                serde_json::from_str::<Value>(text).is_ok(),
                "complete({:?}) = {:?} does not parse",
                prefix,
                text
            );
        }
    }
}

#[test]
fn test_completion_only_appends() {
    for doc in SAMPLES {
        for prefix in char_prefixes(doc) {
            if let Completion::Completed(text) = complete(prefix, &limits()).unwrap()
                && text != TRIVIAL_DOCUMENT
            {
                let kept = text.trim_end_matches(['"', '}', ']']);
                assert!(
                    prefix.starts_with(kept),
                    "{:?} is not a cut of {:?}",
                    text,
                    prefix
                );
            }
        }
    }
}

#[test]
fn test_idempotence_on_valid_json() {
    for doc in SAMPLES {
        let once = repair(doc, &limits()).unwrap().text;
        let twice = repair(&once, &limits()).unwrap().text;
        assert_eq!(once, twice);
        assert_eq!(
            serde_json::from_str::<Value>(&once).unwrap(),
            serde_json::from_str::<Value>(doc).unwrap()
        );
        assert_eq!(complete(doc, &limits()).unwrap(), Completion::NotNeeded);
    }
}

#[test]
fn test_repair_is_deterministic() {
    let doc = SAMPLES[0];
    for prefix in char_prefixes(doc) {
        assert_eq!(
            repair(prefix, &limits()).unwrap(),
            repair(prefix, &limits()).unwrap()
        );
    }
}

#[test]
fn test_depth_safety() {
    let bomb = "{".repeat(10_000);
    let repaired = repair(&bomb, &Limits::new(64, 1 << 20)).unwrap();
    assert_eq!(repaired.text, "{}");

    let bomb = "[".repeat(10_000);
    let repaired = repair(&bomb, &Limits::new(64, 1 << 20)).unwrap();
    assert!(repaired.depth_exceeded);
    let value: Value = serde_json::from_str(&repaired.text).unwrap();
    let mut depth = 0;
    let mut current = &value;
    while let Some(inner) = current.as_array().and_then(|a| a.first()) {
        depth += 1;
        current = inner;
    }
    assert_eq!(depth, 63);

    let mixed = r#"{"a":["#.repeat(5_000);
    let repaired = repair(&mixed, &Limits::new(32, 1 << 20)).unwrap();
    assert!(repaired.depth_exceeded);
    assert!(serde_json::from_str::<Value>(&repaired.text).is_ok());
}

#[test]
fn test_buffer_exhausted_then_retry() {
    let input = br#"{"items":[1,2,3],"next":"#;
    let mut small = vec![0u8; 8];
    let needed = match repair_into(input, 16, &mut small) {
        Err(StreamError::BufferExhausted { needed, capacity }) => {
            assert_eq!(capacity, 8);
            needed
        }
        other => panic!("expected BufferExhausted, got {:?}", other),
    };

    let mut out = vec![0u8; needed];
    let outcome = repair_into(input, 16, &mut out).unwrap();
    assert_eq!(outcome.len, needed);
    assert_eq!(
        serde_json::from_slice::<Value>(&out[..outcome.len]).unwrap(),
        json!({"items":[1,2,3]})
    );
}

#[test]
fn test_complete_into_zero_means_use_original() {
    let mut out = vec![0u8; 64];
    assert_eq!(complete_into(br#"{"a":1}"#, 8, &mut out).unwrap(), 0);
    let len = complete_into(br#"{"a":"x"#, 8, &mut out).unwrap();
    assert_eq!(&out[..len], br#"{"a":"x"}"#);
}

#[test]
fn test_garbage_never_panics() {
    let inputs = [
        "",
        "}",
        "]]]",
        ",",
        ":",
        "\"",
        "\\",
        "{\"a\"::1}",
        "[1 2]",
        "{'single':1}",
        "nul",
        "[\"\\x\"]",
        "\u{0}",
        "{\"a\":1}{\"b\":2}",
    ];
    for input in inputs {
        let repaired = repair(input, &limits()).unwrap();
        assert!(
            serde_json::from_str::<Value>(&repaired.text).is_ok(),
            "repair({:?}) = {:?}",
            input,
            repaired.text
        );
    }
    assert_eq!(repair("}", &limits()).unwrap().text, TRIVIAL_DOCUMENT);
    assert_eq!(repair("nul", &limits()).unwrap().text, "null");
    assert_eq!(
        repair("{\"a\":1}{\"b\":2}", &limits()).unwrap().text,
        "{\"a\":1}"
    );
}
