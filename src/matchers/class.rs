//! Class definition matcher

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, ParseContext};
use crate::models::{Symbol, SymbolKind};

// class MyClass < BaseClass
// class MyModule::MyClass
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*class\s+([A-Z]\w*(?:::[A-Z]\w*)*)(?:\s*<\s*\S+)?").expect("class pattern")
});

/// Extracts class definitions and opens their namespace scope
pub struct ClassMatcher;

impl Matcher for ClassMatcher {
    fn name(&self) -> &'static str {
        "class"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn try_match(&self, line: &str, ctx: &ParseContext) -> Option<MatchResult> {
        let caps = CLASS_RE.captures(line)?;
        let class_name = caps.get(1)?.as_str();
        let column = line.find(class_name).unwrap_or(0);

        // class Foo::Bar nests Bar under Foo in addition to the current scope
        let parts: Vec<&str> = class_name.split("::").collect();
        let short_name = parts[parts.len() - 1];

        let mut scope: Vec<String> = ctx.current_scope.to_vec();
        scope.extend(parts[..parts.len() - 1].iter().map(|p| p.to_string()));

        let mut sym = Symbol {
            name: short_name.to_string(),
            kind: SymbolKind::Class,
            file_path: ctx.file_path.to_string(),
            line: ctx.line_num,
            column,
            scope,
            ..Default::default()
        };
        sym.full_name = sym.compute_full_name();

        Some(MatchResult {
            symbols: vec![sym],
            push_scope: Some(short_name.to_string()),
            opens_block: true,
            ..Default::default()
        })
    }
}
