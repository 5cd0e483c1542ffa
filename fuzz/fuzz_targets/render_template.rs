#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value, json};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut vars = Map::new();
        vars.insert("host".to_owned(), json!("localhost"));
        vars.insert("user".to_owned(), json!({"id": 7, "tags": ["a", "b"]}));
        vars.insert("blank".to_owned(), Value::String(String::new()));
        let seed = input.chars().take(32).collect::<String>();
        vars.insert("input".to_owned(), Value::String(seed));

        let (rendered, meta) = reqpilot::fuzzing::render_template_input(input, &vars);
        debug_assert!(meta.missing.is_subset(&meta.used));
        debug_assert!(meta.resolved.is_subset(&meta.used));
        if meta.used.is_empty() {
            debug_assert_eq!(rendered, input);
        }
    }
});
