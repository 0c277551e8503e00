#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Compilation must reject bad input with an error, never a panic
    let normalized = meshfind::query::normalize(data);
    if let Ok(Some(query)) = meshfind::query::compile(data) {
        assert_eq!(query.expression, normalized);
        let _ = query.to_string();
    }
});
