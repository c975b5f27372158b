//! Line-pattern matchers for extracting symbols from Ruby source
//!
//! Each matcher recognizes one construct on a single logical line: class and
//! module definitions, methods, constants, Rails relations, and the anonymous
//! `end`-terminated blocks that only matter for scope tracking. Matchers are
//! registered with a priority and tried in descending order; the first match
//! wins for a line.
//!
//! A matcher may also act as a multiline detector, claiming a line that opens
//! an unbalanced delimiter pair so the scanner folds the construct into one
//! logical line before matching.

pub mod attr;
pub mod class;
pub mod constant;
pub mod do_block;
pub mod end;
pub mod keyword;
pub mod localvar;
pub mod method;
pub mod module;
pub mod relation;

use crate::models::Symbol;

/// The method currently being parsed, tracked by the scanner so local
/// variables can be bound to it and its `end` line recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodContext {
    /// e.g. "MyClass#my_method"
    pub full_name: String,
    /// Line where the definition starts (1-indexed)
    pub start_line: usize,
    /// Nesting depth occupied by the method body; filled in by the scanner
    pub nesting_depth: usize,
}

/// Per-line context the scanner hands to matchers
#[derive(Debug)]
pub struct ParseContext<'a> {
    /// Absolute path of the file being parsed
    pub file_path: &'a str,
    /// Current namespace stack, outermost first
    pub current_scope: &'a [String],
    /// Current line number (1-indexed)
    pub line_num: usize,
    /// Method being parsed, if any
    pub current_method: Option<&'a MethodContext>,
}

/// Effects of a successful match, applied by the scanner in a fixed order:
/// symbols, push_scope, opens_block, closes_block, pops_scope.
#[derive(Debug, Default)]
pub struct MatchResult {
    pub symbols: Vec<Symbol>,
    /// Enter a named namespace (class/module short name)
    pub push_scope: Option<String>,
    /// Leave a namespace or anonymous block (the `end` keyword)
    pub pops_scope: bool,
    /// Enter an `end`-terminated construct without a named namespace
    pub opens_block: bool,
    /// Close a block without the `end` keyword (unused by built-ins)
    pub closes_block: bool,
    /// Start of a method definition
    pub enter_method: Option<MethodContext>,
}

/// A pluggable line classifier
pub trait Matcher: Send + Sync {
    /// Stable identifier for logging and diagnostics
    fn name(&self) -> &'static str;

    /// Ordering: higher priorities are tried first
    fn priority(&self) -> i32;

    /// Test a logical line; `None` means no match
    fn try_match(&self, line: &str, ctx: &ParseContext) -> Option<MatchResult>;

    /// Multiline detection: return the delimiter pair to balance when the
    /// line opens a construct that does not close on the same physical line.
    fn starts_multiline(&self, _line: &str) -> Option<(char, char)> {
        None
    }
}

/// Holds all registered matchers in priority order
pub struct Registry {
    matchers: Vec<Box<dyn Matcher>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Create a registry with the default Ruby matchers installed
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(class::ClassMatcher));
        registry.register(Box::new(module::ModuleMatcher));
        registry.register(Box::new(method::MethodMatcher));
        registry.register(Box::new(relation::RelationMatcher));
        registry.register(Box::new(constant::ConstantMatcher));
        registry.register(Box::new(attr::AttrMatcher));
        registry.register(Box::new(localvar::LocalVariableMatcher));
        registry.register(Box::new(do_block::DoMatcher));
        registry.register(Box::new(keyword::KeywordMatcher));
        registry.register(Box::new(end::EndMatcher));
        registry
    }

    /// Add a matcher; registration order does not matter
    pub fn register(&mut self, matcher: Box<dyn Matcher>) {
        self.matchers.push(matcher);
        self.matchers.sort_by_key(|m| std::cmp::Reverse(m.priority()));
    }

    /// All matchers, highest priority first
    pub fn matchers(&self) -> &[Box<dyn Matcher>] {
        &self.matchers
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
