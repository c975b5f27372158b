//! Constant assignment matcher

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, ParseContext};
use crate::models::{Symbol, SymbolKind};

// MY_CONSTANT = value
static CONSTANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Z][A-Z0-9_]*)\s*=").expect("constant pattern"));

// Comparison operators are not assignments (==, ===, =~)
static COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[A-Z][A-Z0-9_]*\s*(?:={2,3}|=~)").expect("constant comparison pattern")
});

/// Extracts constant definitions
pub struct ConstantMatcher;

impl Matcher for ConstantMatcher {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn try_match(&self, line: &str, ctx: &ParseContext) -> Option<MatchResult> {
        if COMPARISON_RE.is_match(line) {
            return None;
        }

        let caps = CONSTANT_RE.captures(line)?;
        let const_name = caps.get(1)?.as_str();
        let column = line.find(const_name).unwrap_or(0);

        let mut sym = Symbol {
            name: const_name.to_string(),
            kind: SymbolKind::Constant,
            file_path: ctx.file_path.to_string(),
            line: ctx.line_num,
            column,
            scope: ctx.current_scope.to_vec(),
            ..Default::default()
        };
        sym.full_name = sym.compute_full_name();

        Some(MatchResult {
            symbols: vec![sym],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(scope: &'a [String]) -> ParseContext<'a> {
        ParseContext {
            file_path: "/test/config.rb",
            current_scope: scope,
            line_num: 3,
            current_method: None,
        }
    }

    #[test]
    fn test_simple_constant() {
        let result = ConstantMatcher
            .try_match("MAX_RETRIES = 3", &ctx(&[]))
            .unwrap();
        let sym = &result.symbols[0];

        assert_eq!(sym.name, "MAX_RETRIES");
        assert_eq!(sym.kind, SymbolKind::Constant);
        assert_eq!(sym.full_name, "MAX_RETRIES");
        assert!(result.push_scope.is_none());
        assert!(!result.opens_block);
    }

    #[test]
    fn test_constant_in_scope() {
        let scope = vec!["Config".to_string()];
        let result = ConstantMatcher
            .try_match("  TIMEOUT = 30", &ctx(&scope))
            .unwrap();

        assert_eq!(result.symbols[0].full_name, "Config::TIMEOUT");
    }

    #[test]
    fn test_rejects_comparisons() {
        assert!(ConstantMatcher
            .try_match("STATUS == 'active'", &ctx(&[]))
            .is_none());
        assert!(ConstantMatcher
            .try_match("KIND === other", &ctx(&[]))
            .is_none());
        assert!(ConstantMatcher
            .try_match("NAME =~ /pattern/", &ctx(&[]))
            .is_none());
    }

    #[test]
    fn test_no_match_for_lowercase() {
        assert!(ConstantMatcher.try_match("result = 1", &ctx(&[])).is_none());
    }
}
