//! Module definition matcher

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, ParseContext};
use crate::models::{Symbol, SymbolKind};

// module MyModule
// module MyParent::MyModule
static MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*module\s+([A-Z]\w*(?:::[A-Z]\w*)*)").expect("module pattern"));

/// Extracts module definitions and opens their namespace scope
pub struct ModuleMatcher;

impl Matcher for ModuleMatcher {
    fn name(&self) -> &'static str {
        "module"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn try_match(&self, line: &str, ctx: &ParseContext) -> Option<MatchResult> {
        let caps = MODULE_RE.captures(line)?;
        let module_name = caps.get(1)?.as_str();
        let column = line.find(module_name).unwrap_or(0);

        let parts: Vec<&str> = module_name.split("::").collect();
        let short_name = parts[parts.len() - 1];

        let mut scope: Vec<String> = ctx.current_scope.to_vec();
        scope.extend(parts[..parts.len() - 1].iter().map(|p| p.to_string()));

        let mut sym = Symbol {
            name: short_name.to_string(),
            kind: SymbolKind::Module,
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
