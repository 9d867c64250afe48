#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lodeb::{FileLocation, SymbolLocIndex};

#[derive(Arbitrary, Debug)]
struct SymbolIndexFuzzInput {
    // Symbol names, including empty and non-ASCII ones
    names: Vec<String>,
    needle: String,
    limit: u8,
}

fuzz_target!(|input: SymbolIndexFuzzInput| {
    let index: SymbolLocIndex = input
        .names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), FileLocation::new(format!("f{}.c", i % 7), i as u32)))
        .collect();

    let needle = input.needle.to_ascii_lowercase();
    let limit = usize::from(input.limit);
    let matches = index.matches(&input.needle, limit);

    assert!(matches.len() <= limit);
    for m in &matches {
        assert!(m.name.to_ascii_lowercase().contains(&needle));
    }

    let all = index.matches("", usize::MAX);
    assert_eq!(all.len(), input.names.iter().filter(|n| !n.is_empty()).count());
});
