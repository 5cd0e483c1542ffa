#![no_main]

use libfuzzer_sys::fuzz_target;

const DOCUMENT: &str = r#"{"data":[{"id":1,"name":"ada"},{"id":2}],"meta":{"total":2,"empty":null}}"#;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = reqpilot::fuzzing::lookup_path_input(DOCUMENT, input);
        if let Some((json, path)) = input.split_once('\n') {
            let _ = reqpilot::fuzzing::lookup_path_input(json, path);
        }
    }
});
