#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(collection) = reqpilot::fuzzing::collection_from_toml(input) {
            let _ = collection.environment(None);
            let _ = collection.select_requests(&[]);
            for request in &collection.requests {
                let _ = request.validate();
            }
        }
    }
});
