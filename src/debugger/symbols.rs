//! Symbol -> source location index for interactive search
//!
//! Every indexed symbol name is appended to one packed buffer with no
//! separators, and an ASCII-lowercased copy of that buffer is kept next to
//! it. A search is a plain substring scan over the lowercase copy; each hit
//! is mapped back to its symbol by binary searching the spans, which are
//! sorted by start offset because they are produced by a single append pass.
//!
//! Lowercasing is ASCII-only so the mirror has exactly the same byte offsets
//! as the original names. Non-ASCII characters match case-sensitively.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};

use crate::debugger::engine::{EngineSymbol, EngineTarget, SymbolKind};
use crate::debugger::location::FileLocation;

/// Byte range of one symbol name inside the packed buffer
#[derive(Debug, Clone)]
struct NameSpan {
    start: usize,
    len: usize,
    location: FileLocation,
}

impl NameSpan {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// A search hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolMatch<'a> {
    /// Symbol name, borrowed from the packed buffer
    pub name: &'a str,
    /// Source location of the symbol's start address
    pub location: &'a FileLocation,
}

/// Immutable symbol location index
///
/// Built once (see [`SymbolLocIndex::load`] and [`SymbolIndexBuilder`]) and
/// never modified afterwards.
#[derive(Debug, Default)]
pub struct SymbolLocIndex {
    names: String,
    lower_names: String,
    paths: HashSet<Arc<str>>,
    spans: Vec<NameSpan>,
}

impl SymbolLocIndex {
    /// Index every code symbol of `target` that resolves to a source location
    ///
    /// Symbols without line information (typically library code built
    /// without debug info) are skipped entirely.
    pub fn load(target: &dyn EngineTarget) -> Self {
        let start = Instant::now();
        let mut builder = SymbolIndexBuilder::new();
        let mut skipped = 0usize;

        for module in 0..target.module_count() {
            for symbol in target.module_symbols(module) {
                if symbol.kind != SymbolKind::Code {
                    continue;
                }

                match symbol_location(target, &symbol) {
                    Some(location) => {
                        builder.push(&symbol.name, location);
                    }
                    None => skipped += 1,
                }
            }
        }

        let index = builder.finish();
        info!(
            "Indexed {} symbols from {} files in {:.2?}",
            index.len(),
            index.path_count(),
            start.elapsed()
        );
        debug!("Skipped {} code symbols without a source location", skipped);
        index
    }

    /// Number of indexed symbols
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if no symbols are indexed
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Number of distinct source files referenced by the index
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Call `f` for up to `limit` symbols whose name contains `needle`
    ///
    /// Matching is ASCII case-insensitive. An empty needle matches every
    /// symbol. Each symbol is reported at most once, in the order the
    /// symbols were indexed.
    pub fn for_each_match<'a, F>(&'a self, needle: &str, limit: usize, mut f: F)
    where
        F: FnMut(SymbolMatch<'a>),
    {
        if self.spans.is_empty() || limit == 0 {
            return;
        }

        let needle = needle.to_ascii_lowercase();

        if needle.is_empty() {
            for span in self.spans.iter().take(limit) {
                f(self.to_match(span));
            }
            return;
        }

        let mut emitted = 0;
        let mut pos = 0;

        while let Some(offset) = self.lower_names[pos..].find(needle.as_str()) {
            let at = pos + offset;
            let span = self.span_containing(at);

            // The hit runs past the end of this name into the next one.
            if at + needle.len() > span.end() {
                pos = at + self.lower_names[at..].chars().next().map_or(1, char::len_utf8);
                continue;
            }

            f(self.to_match(span));

            emitted += 1;
            if emitted == limit {
                return;
            }

            pos = span.end();
        }
    }

    /// Collect up to `limit` matches for `needle`
    pub fn matches(&self, needle: &str, limit: usize) -> Vec<SymbolMatch<'_>> {
        let mut matches = Vec::new();
        self.for_each_match(needle, limit, |m| matches.push(m));
        matches
    }

    fn to_match<'a>(&'a self, span: &'a NameSpan) -> SymbolMatch<'a> {
        SymbolMatch {
            name: &self.names[span.start..span.end()],
            location: &span.location,
        }
    }

    /// Find the span containing byte offset `at`
    ///
    /// The spans tile the buffer exactly, so some span always contains any
    /// valid offset.
    fn span_containing(&self, at: usize) -> &NameSpan {
        let idx = self.spans.partition_point(|span| span.start <= at);
        &self.spans[idx.saturating_sub(1)]
    }
}

/// Append-only builder for [`SymbolLocIndex`]
#[derive(Debug, Default)]
pub struct SymbolIndexBuilder {
    index: SymbolLocIndex,
}

impl SymbolIndexBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a symbol
    ///
    /// Returns `false` (and indexes nothing) for an empty name.
    pub fn push(&mut self, name: &str, location: FileLocation) -> bool {
        if name.is_empty() {
            return false;
        }

        let index = &mut self.index;
        let start = index.names.len();
        index.names.push_str(name);
        index.lower_names.push_str(&name.to_ascii_lowercase());

        let path = match index.paths.get(location.path()) {
            Some(existing) => Arc::clone(existing),
            None => {
                index.paths.insert(Arc::clone(&location.path));
                location.path
            }
        };

        index.spans.push(NameSpan {
            start,
            len: name.len(),
            location: FileLocation {
                path,
                line: location.line,
            },
        });

        true
    }

    /// Number of symbols pushed so far
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if nothing has been pushed
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Finish building
    pub fn finish(self) -> SymbolLocIndex {
        self.index
    }
}

impl<S: AsRef<str>> FromIterator<(S, FileLocation)> for SymbolLocIndex {
    fn from_iter<I: IntoIterator<Item = (S, FileLocation)>>(iter: I) -> Self {
        let mut builder = SymbolIndexBuilder::new();
        for (name, location) in iter {
            builder.push(name.as_ref(), location);
        }
        builder.finish()
    }
}

/// Resolve a symbol's start address to a source location
pub fn symbol_location(target: &dyn EngineTarget, symbol: &EngineSymbol) -> Option<FileLocation> {
    symbol
        .start_address
        .and_then(|address| target.address_location(address))
}
