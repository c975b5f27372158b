//! Local variable assignment matcher

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, ParseContext};
use crate::models::{Symbol, SymbolKind};

// x = 1
static SINGLE_ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([a-z_][a-z0-9_]*)\s*=").expect("single assign pattern"));

// x, y = 1, 2
static MULTI_ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-z_][a-z0-9_]*(?:\s*,\s*[a-z_][a-z0-9_]*)+)\s*=")
        .expect("multi assign pattern")
});

// Comparison operators are not assignments (==, ===, =~)
static COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[a-z_][a-z0-9_]*\s*(?:={2,3}|=~)").expect("local comparison pattern")
});

/// Extracts local variable assignments inside method bodies.
///
/// Only fires when the scanner has a current method; top-level assignments
/// are not tracked.
pub struct LocalVariableMatcher;

impl Matcher for LocalVariableMatcher {
    fn name(&self) -> &'static str {
        "localvar"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn try_match(&self, line: &str, ctx: &ParseContext) -> Option<MatchResult> {
        let method = ctx.current_method?;

        if COMPARISON_RE.is_match(line) {
            return None;
        }

        // Multiple assignment is the more specific pattern; try it first
        if let Some(caps) = MULTI_ASSIGN_RE.captures(line) {
            let var_list = caps.get(1)?.as_str();
            let symbols: Vec<Symbol> = var_list
                .split(',')
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|var_name| make_symbol(var_name, line, ctx, &method.full_name))
                .collect();

            if symbols.is_empty() {
                return None;
            }

            return Some(MatchResult {
                symbols,
                ..Default::default()
            });
        }

        let caps = SINGLE_ASSIGN_RE.captures(line)?;
        let var_name = caps.get(1)?.as_str();

        Some(MatchResult {
            symbols: vec![make_symbol(var_name, line, ctx, &method.full_name)],
            ..Default::default()
        })
    }
}

fn make_symbol(var_name: &str, line: &str, ctx: &ParseContext, method_full_name: &str) -> Symbol {
    let column = line.find(var_name).unwrap_or(0);

    let mut sym = Symbol {
        name: var_name.to_string(),
        kind: SymbolKind::LocalVariable,
        file_path: ctx.file_path.to_string(),
        line: ctx.line_num,
        column,
        scope: ctx.current_scope.to_vec(),
        method_full_name: Some(method_full_name.to_string()),
        ..Default::default()
    };
    sym.full_name = sym.compute_full_name();
    sym
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::MethodContext;

    fn method() -> MethodContext {
        MethodContext {
            full_name: "W#perform".to_string(),
            start_line: 2,
            nesting_depth: 2,
        }
    }

    fn ctx<'a>(scope: &'a [String], method: Option<&'a MethodContext>) -> ParseContext<'a> {
        ParseContext {
            file_path: "/test/worker.rb",
            current_scope: scope,
            line_num: 3,
            current_method: method,
        }
    }

    #[test]
    fn test_single_assignment() {
        let m = method();
        let scope = vec!["W".to_string()];
        let result = LocalVariableMatcher
            .try_match("    items = []", &ctx(&scope, Some(&m)))
            .unwrap();
        let sym = &result.symbols[0];

        assert_eq!(sym.name, "items");
        assert_eq!(sym.kind, SymbolKind::LocalVariable);
        assert_eq!(sym.method_full_name.as_deref(), Some("W#perform"));
        assert_eq!(sym.full_name, "W#perform@items");
        assert_eq!(sym.column, 4);
    }

    #[test]
    fn test_multiple_assignment() {
        let m = method();
        let result = LocalVariableMatcher
            .try_match("    a, b = 1, 2", &ctx(&[], Some(&m)))
            .unwrap();

        assert_eq!(result.symbols.len(), 2);
        assert_eq!(result.symbols[0].name, "a");
        assert_eq!(result.symbols[1].name, "b");
        assert!(result
            .symbols
            .iter()
            .all(|s| s.method_full_name.as_deref() == Some("W#perform")));
    }

    #[test]
    fn test_requires_current_method() {
        assert!(LocalVariableMatcher
            .try_match("items = []", &ctx(&[], None))
            .is_none());
    }

    #[test]
    fn test_rejects_comparisons() {
        let m = method();
        assert!(LocalVariableMatcher
            .try_match("  status == 'done'", &ctx(&[], Some(&m)))
            .is_none());
        assert!(LocalVariableMatcher
            .try_match("  kind === other", &ctx(&[], Some(&m)))
            .is_none());
        assert!(LocalVariableMatcher
            .try_match("  line =~ /end/", &ctx(&[], Some(&m)))
            .is_none());
    }

    #[test]
    fn test_no_match_for_method_calls() {
        let m = method();
        assert!(LocalVariableMatcher
            .try_match("  items.each do |x| process(x) end", &ctx(&[], Some(&m)))
            .is_none());
    }
}
