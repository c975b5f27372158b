//! Line-by-line Ruby scanner
//!
//! The scanner walks a file's lines, folds unbalanced multi-line constructs
//! into logical lines, and dispatches each logical line to the matcher
//! registry. It owns the ephemeral parse state: the namespace scope stack,
//! the block nesting depth, and the current method.
//!
//! Scope and nesting are tracked separately. Every `end` decrements the
//! nesting depth, but the scope stack only pops when the depth would drop
//! below the stack's length, so `end`s closing `do`/`if`/`case` blocks
//! leave the namespace stack intact.
//!
//! All state is local to a single call, which makes the read-only scope
//! query safe to run concurrently with anything else.

use crate::matchers::{Matcher, MethodContext, ParseContext, Registry};
use crate::models::{Symbol, SymbolKind};

/// Parses Ruby files with a registry of line matchers
pub struct Scanner {
    registry: Registry,
}

/// Accumulator for a construct whose delimiters span physical lines
struct MultilineState {
    text: String,
    start_line: usize,
    open: char,
    close: char,
    balance: i64,
}

impl MultilineState {
    fn new(first_line: &str, start_line: usize, open: char, close: char) -> Self {
        let mut state = Self {
            text: String::new(),
            start_line,
            open,
            close,
            balance: 0,
        };
        state.text.push_str(first_line);
        state.balance = balance_of(first_line, open, close);
        state
    }

    fn push(&mut self, line: &str) {
        self.text.push(' ');
        self.text.push_str(line);
        self.balance += balance_of(line, self.open, self.close);
    }

    fn balanced(&self) -> bool {
        self.balance <= 0
    }
}

fn balance_of(line: &str, open: char, close: char) -> i64 {
    let opens = line.matches(open).count() as i64;
    let closes = line.matches(close).count() as i64;
    opens - closes
}

impl Scanner {
    /// Create a scanner with the given matcher registry
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Scan the file content and return all discovered symbols in order
    pub fn parse(&self, file_path: &str, content: &[u8]) -> Vec<Symbol> {
        self.scan(file_path, content, None).symbols
    }

    /// Replay the scan up to and including `line`, returning the namespace
    /// scope open at that point. Used to resolve partially qualified names.
    pub fn scope_at(&self, file_path: &str, content: &[u8], line: usize) -> Vec<String> {
        self.scan(file_path, content, Some(line)).scope
    }

    fn scan(&self, file_path: &str, content: &[u8], stop_after: Option<usize>) -> ScanOutcome {
        let text = String::from_utf8_lossy(content);

        let mut symbols: Vec<Symbol> = Vec::new();
        let mut scope_stack: Vec<String> = Vec::new();
        let mut nesting_depth: usize = 0;
        let mut current_method: Option<MethodContext> = None;
        // Index into `symbols` of the current method's entry, for end_line
        let mut method_symbol: Option<usize> = None;
        let mut multiline: Option<MultilineState> = None;

        let matchers = self.registry.matchers();

        for (i, raw_line) in text.split('\n').enumerate() {
            let line_num = i + 1;
            if let Some(stop) = stop_after {
                if line_num > stop {
                    break;
                }
            }

            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            // Fold pending multiline constructs before any matching
            let folded: Option<(String, usize)> = if let Some(state) = multiline.as_mut() {
                state.push(raw_line);
                if state.balanced() {
                    multiline.take().map(|s| (s.text, s.start_line))
                } else {
                    continue;
                }
            } else {
                if let Some(state) = self.start_multiline(raw_line, line_num) {
                    multiline = Some(state);
                    continue;
                }
                None
            };

            let (line, line_num) = match &folded {
                Some((text, start)) => (text.as_str(), *start),
                None => (raw_line, line_num),
            };

            let result = {
                let ctx = ParseContext {
                    file_path,
                    current_scope: &scope_stack,
                    line_num,
                    current_method: current_method.as_ref(),
                };
                matchers.iter().find_map(|m| m.try_match(line, &ctx))
            };

            let Some(result) = result else {
                continue;
            };

            let first_emitted = symbols.len();
            let emitted_method = result.symbols.iter().position(|s| {
                matches!(s.kind, SymbolKind::Method | SymbolKind::SingletonMethod)
            });
            symbols.extend(result.symbols);

            if let Some(name) = result.push_scope {
                scope_stack.push(name);
            }

            if result.opens_block {
                nesting_depth += 1;
            }

            if result.closes_block {
                nesting_depth = nesting_depth.saturating_sub(1);
            }

            // The method occupies the depth of the block this result opened
            if let Some(mut entered) = result.enter_method {
                entered.nesting_depth = nesting_depth;
                current_method = Some(entered);
                method_symbol = emitted_method.map(|offset| first_emitted + offset);
            }

            if result.pops_scope && nesting_depth > 0 {
                // Closing the method's own block: record its end before the
                // depth change becomes visible
                if let Some(method) = current_method.as_ref() {
                    if nesting_depth == method.nesting_depth {
                        if let Some(idx) = method_symbol.take() {
                            symbols[idx].end_line = line_num;
                        }
                        current_method = None;
                    }
                }

                nesting_depth -= 1;
                if nesting_depth < scope_stack.len() {
                    scope_stack.pop();
                }
            }
        }

        ScanOutcome {
            symbols,
            scope: scope_stack,
        }
    }

    fn start_multiline(&self, line: &str, line_num: usize) -> Option<MultilineState> {
        for matcher in self.registry.matchers() {
            if let Some((open, close)) = matcher.starts_multiline(line) {
                return Some(MultilineState::new(line, line_num, open, close));
            }
        }
        None
    }
}

struct ScanOutcome {
    symbols: Vec<Symbol>,
    scope: Vec<String>,
}
