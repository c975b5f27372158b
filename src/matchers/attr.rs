//! attr_reader / attr_writer / attr_accessor matcher

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, ParseContext};
use crate::models::{Symbol, SymbolKind};

// attr_reader :name
// attr_accessor :first_name, :last_name
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*attr_(reader|writer|accessor)\s+(:[a-z_][a-z0-9_]*(?:\s*,\s*:[a-z_][a-z0-9_]*)*)")
        .expect("attr pattern")
});

/// Extracts attribute declarations; each listed name becomes one symbol
/// with the method-style full name (readers and writers are methods).
pub struct AttrMatcher;

impl Matcher for AttrMatcher {
    fn name(&self) -> &'static str {
        "attr"
    }

    fn priority(&self) -> i32 {
        75
    }

    fn try_match(&self, line: &str, ctx: &ParseContext) -> Option<MatchResult> {
        let caps = ATTR_RE.captures(line)?;

        let kind = match caps.get(1)?.as_str() {
            "reader" => SymbolKind::AttrReader,
            "writer" => SymbolKind::AttrWriter,
            _ => SymbolKind::AttrAccessor,
        };

        let symbols: Vec<Symbol> = caps
            .get(2)?
            .as_str()
            .split(',')
            .filter_map(|part| {
                let name = part.trim().strip_prefix(':')?;
                if name.is_empty() {
                    return None;
                }

                let needle = format!(":{}", name);
                let column = line.find(&needle).map(|i| i + 1).unwrap_or(0);

                let mut sym = Symbol {
                    name: name.to_string(),
                    kind,
                    file_path: ctx.file_path.to_string(),
                    line: ctx.line_num,
                    column,
                    scope: ctx.current_scope.to_vec(),
                    ..Default::default()
                };
                sym.full_name = sym.compute_full_name();
                Some(sym)
            })
            .collect();

        if symbols.is_empty() {
            return None;
        }

        Some(MatchResult {
            symbols,
            ..Default::default()
        })
    }
}
