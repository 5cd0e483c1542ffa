#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let (code, rest) = data.split_at(2);
    let status = u16::from_le_bytes([code[0], code[1]]);
    if let Ok(input) = std::str::from_utf8(rest) {
        let (accepted, fallback) = reqpilot::fuzzing::status_spec_input(input, status);
        if fallback {
            debug_assert_eq!(accepted, status == 200);
        }
    }
});
