//! `do ... end` block matcher

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, ParseContext};

// foo.each do |x|
// loop do
// Inline blocks that close on the same line (do |x| ... end) do not match:
// their end is balanced within the line, so neither side should count.
static DO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdo\s*(\|[^|]*\|)?\s*$").expect("do pattern"));

/// Tracks `do...end` block nesting; emits no symbols
pub struct DoMatcher;

impl Matcher for DoMatcher {
    fn name(&self) -> &'static str {
        "do"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn try_match(&self, line: &str, _ctx: &ParseContext) -> Option<MatchResult> {
        if !DO_RE.is_match(line) {
            return None;
        }

        Some(MatchResult {
            opens_block: true,
            ..Default::default()
        })
    }
}
