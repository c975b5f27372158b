//! `end` keyword matcher

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, ParseContext};

static END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*end\b").expect("end pattern"));

/// Tracks block and scope closing; emits no symbols
pub struct EndMatcher;

impl Matcher for EndMatcher {
    fn name(&self) -> &'static str {
        "end"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn try_match(&self, line: &str, _ctx: &ParseContext) -> Option<MatchResult> {
        if !END_RE.is_match(line) {
            return None;
        }

        Some(MatchResult {
            pops_scope: true,
            ..Default::default()
        })
    }
}
