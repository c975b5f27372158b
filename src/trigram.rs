//! Trigram-based inverted index for find-references
//!
//! A trigram is a sequence of 3 consecutive bytes, packed into a `u32` for
//! cheap hashing. The index maps each trigram to the set of files containing
//! it; a query intersects the sets for every trigram of the pattern, then
//! verifies candidates line by line with a word-boundary regex.
//!
//! The verifier is Ruby-aware: method names may end in `?`, `!` or `=`,
//! which the standard `\b` treats as already outside the word, so `\bfoo!\b`
//! never matches the call `foo!(bar)`. For those patterns the trailing `\b`
//! is replaced with an explicit "next char is not an identifier char or end
//! of line", and the sentinel char is excluded from the reported length.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::models::Reference;

/// A trigram is 3 consecutive bytes, packed into a u32
pub type Trigram = u32;

/// Inverted index from trigrams to file paths, plus a content cache for
/// match verification. Interior locking keeps writers (file updates) and
/// readers (searches) independent of the symbol index's lock.
pub struct TrigramIndex {
    inner: RwLock<TrigramState>,
}

#[derive(Default)]
struct TrigramState {
    /// trigram → set of files containing it
    trigrams: HashMap<Trigram, HashSet<String>>,
    /// file path → full content, for verification
    files: HashMap<String, String>,
}

impl TrigramIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TrigramState::default()),
        }
    }

    /// Index a file's content, replacing any previous entry for the path
    pub fn add_file(&self, path: &str, content: &[u8]) {
        let content = String::from_utf8_lossy(content).into_owned();
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());

        let bytes = content.as_bytes();
        for i in 0..bytes.len().saturating_sub(2) {
            let trigram = bytes_to_trigram(&bytes[i..i + 3]);
            state
                .trigrams
                .entry(trigram)
                .or_default()
                .insert(path.to_string());
        }

        state.files.insert(path.to_string(), content);
    }

    /// Drop a file from the index, pruning emptied trigram buckets
    pub fn remove_file(&self, path: &str) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());

        let Some(content) = state.files.remove(path) else {
            return;
        };

        let bytes = content.as_bytes();
        for i in 0..bytes.len().saturating_sub(2) {
            let trigram = bytes_to_trigram(&bytes[i..i + 3]);
            if let Some(paths) = state.trigrams.get_mut(&trigram) {
                paths.remove(path);
                if paths.is_empty() {
                    state.trigrams.remove(&trigram);
                }
            }
        }
    }

    /// Find all word-boundary occurrences of `pattern` across indexed files
    ///
    /// Results are sorted by (path, line, column) for determinism.
    pub fn search(&self, pattern: &str) -> Vec<Reference> {
        if pattern.is_empty() {
            return Vec::new();
        }

        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());

        let candidates = match find_candidates(&state, pattern) {
            Some(candidates) if !candidates.is_empty() => candidates,
            _ => return Vec::new(),
        };

        let pinfo = build_pattern_info(pattern);

        let mut refs = Vec::new();
        for path in candidates {
            if let Some(content) = state.files.get(&path) {
                verify_in_content(&path, content, &pinfo, pattern.len(), &mut refs);
            }
        }

        refs.sort_by(|a, b| {
            (a.file_path.as_str(), a.line, a.column).cmp(&(b.file_path.as_str(), b.line, b.column))
        });
        refs
    }

    /// Number of indexed files
    pub fn file_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .files
            .len()
    }

    /// Number of distinct trigrams in the index
    pub fn trigram_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .trigrams
            .len()
    }
}

impl Default for TrigramIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert 3 bytes to a packed trigram
#[inline]
fn bytes_to_trigram(bytes: &[u8]) -> Trigram {
    debug_assert_eq!(bytes.len(), 3);
    (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | (bytes[2] as u32)
}

/// Intersect posting sets for every trigram of the pattern.
///
/// Patterns shorter than 3 bytes can't be pre-filtered; every file is a
/// candidate. A trigram absent from the index means no file can match.
fn find_candidates(state: &TrigramState, pattern: &str) -> Option<HashSet<String>> {
    let bytes = pattern.as_bytes();

    if bytes.len() < 3 {
        return Some(state.files.keys().cloned().collect());
    }

    let mut candidates: Option<HashSet<String>> = None;

    for i in 0..=bytes.len() - 3 {
        let trigram = bytes_to_trigram(&bytes[i..i + 3]);
        let paths = state.trigrams.get(&trigram)?;

        candidates = Some(match candidates {
            None => paths.clone(),
            Some(current) => current.intersection(paths).cloned().collect(),
        });

        if candidates.as_ref().is_some_and(|c| c.is_empty()) {
            return None;
        }
    }

    candidates
}

/// Compiled verifier for one search pattern
struct PatternInfo {
    regex: Regex,
    /// Pattern ends in ? ! or =, so the regex consumes one sentinel char
    ends_with_special: bool,
}

/// Build the Ruby-aware word-boundary verifier for a pattern
fn build_pattern_info(pattern: &str) -> PatternInfo {
    let escaped = regex::escape(pattern);

    let ends_with_special = matches!(pattern.as_bytes().last(), Some(b'?' | b'!' | b'='));

    let regex_pattern = if ends_with_special {
        format!(r"\b{}(?:[^A-Za-z0-9_]|$)", escaped)
    } else {
        format!(r"\b{}\b", escaped)
    };

    PatternInfo {
        regex: Regex::new(&regex_pattern).expect("verifier pattern"),
        ends_with_special,
    }
}

/// Scan content line by line, recording every verified match
fn verify_in_content(
    path: &str,
    content: &str,
    pinfo: &PatternInfo,
    pattern_len: usize,
    refs: &mut Vec<Reference>,
) {
    for (i, line) in content.lines().enumerate() {
        for m in pinfo.regex.find_iter(line) {
            // The sentinel char after ? ! = is not part of the match
            let length = if pinfo.ends_with_special {
                pattern_len
            } else {
                m.end() - m.start()
            };

            refs.push(Reference {
                file_path: path.to_string(),
                line: i + 1,
                column: m.start(),
                length,
                line_text: line.to_string(),
            });
        }
    }
}
