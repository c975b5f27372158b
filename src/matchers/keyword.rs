//! Block-opening keyword matcher

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, ParseContext};

// if, unless, case, while, until, for, begin at line start all require an
// `end`; tracking them keeps their `end` from over-decrementing the scope.
// Postfix forms ("return if x") don't start the line and don't match.
static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(if|unless|case|while|until|for|begin)\b").expect("keyword pattern")
});

/// Tracks anonymous `end`-terminated keyword blocks; emits no symbols
pub struct KeywordMatcher;

impl Matcher for KeywordMatcher {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn priority(&self) -> i32 {
        55
    }

    fn try_match(&self, line: &str, _ctx: &ParseContext) -> Option<MatchResult> {
        if !KEYWORD_RE.is_match(line) {
            return None;
        }

        Some(MatchResult {
            opens_block: true,
            ..Default::default()
        })
    }
}
