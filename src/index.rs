//! Authoritative symbol index
//!
//! Three maps under one reader-writer lock: full name → definitions, short
//! name → full names, and file path → symbols. The trigram index hangs off
//! the side with its own lock since text ingest touches far more buckets
//! than symbol ingest; writers always take the symbol lock first.
//!
//! The short-name map is advisory: lookups resolve every full name through
//! the primary map, so a stale short-name entry can never surface a symbol
//! that was already removed.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::matchers::Registry;
use crate::models::{is_ruby_file, IndexConfig, Reference, Symbol, SymbolKind};
use crate::scanner::Scanner;
use crate::trigram::TrigramIndex;

/// Cancellation token observed during the initial build
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Error value surfaced when a build is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index build cancelled")
    }
}

impl std::error::Error for Cancelled {}

#[derive(Default)]
struct IndexState {
    /// Primary index: full name → definitions (duplicates across files kept)
    symbols: HashMap<String, Vec<Symbol>>,
    /// Short name → full names, deduplicated; advisory only
    short_names: HashMap<String, Vec<String>>,
    /// File path → symbols defined in that file
    by_file: HashMap<String, Vec<Symbol>>,
}

/// Symbol lookup and text search over a Ruby project
pub struct SymbolIndex {
    state: RwLock<IndexState>,
    trigram: TrigramIndex,
    root_path: PathBuf,
    scanner: Scanner,
    config: IndexConfig,
}

impl SymbolIndex {
    /// Create an empty index rooted at the given project path
    pub fn new(root_path: impl Into<PathBuf>, registry: Registry, config: IndexConfig) -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
            trigram: TrigramIndex::new(),
            root_path: root_path.into(),
            scanner: Scanner::new(registry),
            config,
        }
    }

    /// Project root this index covers
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Enumerate all Ruby files under the root and ingest them with a
    /// fixed-size worker pool. The token is checked at every traversal step.
    pub fn build(&self, cancel: &CancelToken) -> Result<()> {
        log::info!("building index for {}", self.root_path.display());

        let files = self.discover_files(cancel)?;
        log::info!("found {} Ruby files", files.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .build()
            .context("failed to create indexing thread pool")?;

        pool.install(|| {
            files.par_iter().for_each(|path| {
                if let Err(e) = self.add_file(path) {
                    log::warn!("failed to index {}: {}", path.display(), e);
                }
            });
        });

        log::info!("indexed {} symbols", self.symbol_count());
        Ok(())
    }

    fn discover_files(&self, cancel: &CancelToken) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkBuilder::new(&self.root_path)
            .standard_filters(false)
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry))
            .build();

        for entry in walker {
            if cancel.is_cancelled() {
                return Err(anyhow::Error::new(Cancelled));
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("walk error: {}", e);
                    continue;
                }
            };

            let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
            if is_file && is_ruby_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Parse and index a single file
    pub fn add_file(&self, path: &Path) -> Result<()> {
        let content = fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let path_str = path.to_string_lossy().to_string();

        let symbols = self.scanner.parse(&path_str, &content);

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        state.by_file.insert(path_str.clone(), symbols.clone());

        for sym in &symbols {
            state
                .symbols
                .entry(sym.full_name.clone())
                .or_default()
                .push(sym.clone());

            let short = state.short_names.entry(sym.name.clone()).or_default();
            if !short.contains(&sym.full_name) {
                short.push(sym.full_name.clone());
            }
        }

        // Symbol maps first, then text: writers keep this lock order
        self.trigram.add_file(&path_str, &content);

        Ok(())
    }

    /// Drop all symbols and text from a file
    pub fn remove_file(&self, path: &Path) {
        let path_str = path.to_string_lossy().to_string();

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        let symbols = state.by_file.remove(&path_str).unwrap_or_default();

        for sym in &symbols {
            let emptied = match state.symbols.get_mut(&sym.full_name) {
                Some(bucket) => {
                    bucket.retain(|s| s.file_path != path_str);
                    bucket.is_empty()
                }
                None => false,
            };

            if emptied {
                state.symbols.remove(&sym.full_name);

                // Garbage-collect the advisory short-name entry
                if let Some(full_names) = state.short_names.get_mut(&sym.name) {
                    full_names.retain(|fname| fname != &sym.full_name);
                    if full_names.is_empty() {
                        state.short_names.remove(&sym.name);
                    }
                }
            }
        }

        self.trigram.remove_file(&path_str);
    }

    /// Re-read a file from disk: remove then add
    pub fn update_file(&self, path: &Path) -> Result<()> {
        self.remove_file(path);
        self.add_file(path)
    }

    /// Find definitions matching a short name ("Checker") or full name
    /// ("Verification::Matcher::Checker"). A relation symbol redirects to
    /// its target class, one hop at most.
    pub fn find_definitions(&self, name: &str) -> Vec<Symbol> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Self::resolve(&state, name, 1)
    }

    fn resolve(state: &IndexState, name: &str, redirects_left: usize) -> Vec<Symbol> {
        let direct = Self::lookup(state, name);

        if redirects_left > 0 {
            let target = direct
                .iter()
                .find(|s| s.name == name && s.target_name.is_some())
                .and_then(|s| s.target_name.clone());

            if let Some(target) = target {
                let redirected = Self::resolve(state, &target, redirects_left - 1);
                if !redirected.is_empty() {
                    return redirected;
                }
            }
        }

        direct
    }

    fn lookup(state: &IndexState, name: &str) -> Vec<Symbol> {
        // Exact full-name match wins
        if let Some(bucket) = state.symbols.get(name) {
            return bucket.clone();
        }

        // Short-name entries are verified against the primary map
        let mut result = Vec::new();
        if let Some(full_names) = state.short_names.get(name) {
            for full_name in full_names {
                if let Some(bucket) = state.symbols.get(full_name) {
                    result.extend(bucket.iter().cloned());
                }
            }
        }
        result
    }

    /// As `find_definitions`, but symbols defined in `path` sort first
    pub fn find_definitions_in_file(&self, name: &str, path: &str) -> Vec<Symbol> {
        let all = self.find_definitions(name);
        if all.is_empty() {
            return all;
        }

        let (mut same_file, other_files): (Vec<Symbol>, Vec<Symbol>) =
            all.into_iter().partition(|s| s.file_path == path);

        same_file.extend(other_files);
        same_file
    }

    /// Resolve a possibly qualified name as written at `path:line`.
    ///
    /// `::Name` is absolute: exact full-name resolution only. A qualified
    /// `A::B` is tried against every enclosing scope prefix at that line,
    /// most specific first, before falling back to the global lookup.
    /// Unqualified names defer to the same-file preference.
    pub fn find_definitions_in_context(&self, name: &str, path: &str, line: usize) -> Vec<Symbol> {
        if name.is_empty() {
            return Vec::new();
        }

        if let Some(absolute) = name.strip_prefix("::") {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            return state.symbols.get(absolute).cloned().unwrap_or_default();
        }

        if name.contains("::") {
            let scope = match fs::read(path) {
                Ok(content) => self.scanner.scope_at(path, &content, line),
                Err(e) => {
                    log::debug!("scope query failed for {}: {}", path, e);
                    Vec::new()
                }
            };

            {
                let state = self.state.read().unwrap_or_else(|e| e.into_inner());
                for depth in (1..=scope.len()).rev() {
                    let candidate = format!("{}::{}", scope[..depth].join("::"), name);
                    if let Some(bucket) = state.symbols.get(&candidate) {
                        return bucket.clone();
                    }
                }
            }

            return self.find_definitions(name);
        }

        self.find_definitions_in_file(name, path)
    }

    /// Find the local variable definition visible at `cursor_line`.
    ///
    /// The variable must live in the method whose range contains the cursor;
    /// outside any method there is nothing to find.
    pub fn find_local_variable(
        &self,
        name: &str,
        path: &str,
        cursor_line: usize,
    ) -> Option<Symbol> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let symbols = state.by_file.get(path)?;

        let containing_method = symbols.iter().find(|s| {
            matches!(s.kind, SymbolKind::Method | SymbolKind::SingletonMethod)
                && s.line <= cursor_line
                && s.end_line >= cursor_line
        })?;

        symbols
            .iter()
            .find(|s| {
                s.kind == SymbolKind::LocalVariable
                    && s.name == name
                    && s.method_full_name.as_deref() == Some(containing_method.full_name.as_str())
                    && s.line > containing_method.line
                    && s.line <= containing_method.end_line
            })
            .cloned()
    }

    /// Every symbol whose target points at `target` (e.g. relations whose
    /// class is being renamed or searched for)
    pub fn find_targeting_symbols(&self, target: &str) -> Vec<Symbol> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());

        let mut result: Vec<Symbol> = state
            .by_file
            .values()
            .flatten()
            .filter(|s| s.target_name.as_deref() == Some(target))
            .cloned()
            .collect();

        result.sort_by(|a, b| {
            (a.file_path.as_str(), a.line, a.column).cmp(&(b.file_path.as_str(), b.line, b.column))
        });
        result
    }

    /// Textual occurrences of `name`, via trigram search
    pub fn find_references(&self, name: &str) -> Vec<Reference> {
        self.trigram.search(name)
    }

    /// All symbols defined in a file, in scan order
    pub fn symbols_in_file(&self, path: &str) -> Vec<Symbol> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.by_file.get(path).cloned().unwrap_or_default()
    }

    /// Total stored symbols across all files
    pub fn symbol_count(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.symbols.values().map(|bucket| bucket.len()).sum()
    }

    /// Every stored symbol, sorted by (file, line, column)
    pub fn all_symbols(&self) -> Vec<Symbol> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());

        let mut result: Vec<Symbol> = state.by_file.values().flatten().cloned().collect();
        result.sort_by(|a, b| {
            (a.file_path.as_str(), a.line, a.column).cmp(&(b.file_path.as_str(), b.line, b.column))
        });
        result
    }
}

fn is_skipped_dir(entry: &ignore::DirEntry) -> bool {
    if !entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "vendor" || name == "node_modules"
}
