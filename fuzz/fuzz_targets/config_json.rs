#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(collection) = reqpilot::fuzzing::collection_from_json(input) {
            if let Ok(snapshot) = collection.environment(None) {
                debug_assert!(snapshot.values().keys().all(|key| !key.is_empty()));
            }
            for request in &collection.requests {
                let _ = request.validate();
            }
        }
    }
});
