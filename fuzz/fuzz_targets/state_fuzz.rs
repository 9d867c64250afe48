#![no_main]

use libfuzzer_sys::fuzz_target;
use lodeb::PersistedState;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Parsing never fails, and whatever was parsed survives a write/read cycle
        let state = PersistedState::parse(text);
        let reparsed = PersistedState::parse(&state.to_string());
        assert_eq!(reparsed.target_settings, state.target_settings);
        assert_eq!(reparsed.source_path, state.source_path);
    }
});
