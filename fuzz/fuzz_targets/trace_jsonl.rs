#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok((events, groups)) = reqpilot::fuzzing::correlate_jsonl_input(input) {
            debug_assert!(groups <= events);
        }
    }
});
