//! Method definition matcher

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, MethodContext, ParseContext};
use crate::models::{Symbol, SymbolKind};

// def my_method
// def my_method(args)
// def self.my_class_method
// Ruby method names may end in ? ! or =
static METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*def\s+(self\.)?(\w+[?!=]?)").expect("method pattern"));

/// Extracts instance and singleton method definitions
pub struct MethodMatcher;

impl Matcher for MethodMatcher {
    fn name(&self) -> &'static str {
        "method"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn try_match(&self, line: &str, ctx: &ParseContext) -> Option<MatchResult> {
        let caps = METHOD_RE.captures(line)?;
        let is_singleton = caps.get(1).is_some();
        let method_name = caps.get(2)?.as_str();
        let column = line.find(method_name).unwrap_or(0);

        let kind = if is_singleton {
            SymbolKind::SingletonMethod
        } else {
            SymbolKind::Method
        };

        let mut sym = Symbol {
            name: method_name.to_string(),
            kind,
            file_path: ctx.file_path.to_string(),
            line: ctx.line_num,
            column,
            scope: ctx.current_scope.to_vec(),
            ..Default::default()
        };
        sym.full_name = sym.compute_full_name();

        let enter_method = MethodContext {
            full_name: sym.full_name.clone(),
            start_line: ctx.line_num,
            // nesting_depth is assigned by the scanner once the block opens
            nesting_depth: 0,
        };

        Some(MatchResult {
            symbols: vec![sym],
            enter_method: Some(enter_method),
            opens_block: true,
            ..Default::default()
        })
    }
}
