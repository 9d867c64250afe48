#![no_main]

use libfuzzer_sys::fuzz_target;
use lodeb::{parse_command, ParsedCommand};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let parsed = parse_command(s);

        // The search text is always a suffix of the input
        assert!(s.ends_with(parsed.text()));
        if let ParsedCommand::LookForSymbol(text) = parsed {
            assert_eq!(text.len() + 1, s.len());
        }
    }
});
