//! Core data models for RubyLens
//!
//! These structures are the normalized output of the scanner and the unit of
//! storage in the symbol index. A `Symbol` is immutable once indexed; updates
//! to a file remove and re-insert its symbols wholesale.

use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumString};

/// Kind of Ruby symbol discovered by the scanner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Module,
    Method,
    SingletonMethod,
    Constant,
    LocalVariable,
    Relation,
    AttrReader,
    AttrWriter,
    AttrAccessor,
    /// Catch-all for matcher plugins that define their own symbol kinds
    Custom,
}

impl Default for SymbolKind {
    fn default() -> Self {
        SymbolKind::Custom
    }
}

/// A Ruby definition: class, module, method, constant, local variable, or
/// Rails relation.
///
/// Lines are 1-indexed, columns 0-indexed. `end_line` is filled in by the
/// scanner when it observes the closing `end`; it stays 0 for malformed
/// input that never closes the definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symbol {
    /// Short identifier, e.g. "MyClass" or "my_method"
    pub name: String,
    pub kind: SymbolKind,
    /// Absolute path of the defining file
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub end_column: usize,
    /// Enclosing namespaces, outermost first, e.g. ["MyModule", "MyClass"]
    pub scope: Vec<String>,
    /// Computed canonical name, e.g. "MyModule::MyClass#my_method"
    pub full_name: String,
    /// For local variables: full name of the containing method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_full_name: Option<String>,
    /// For relations: the class name this symbol resolves to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Symbol {
    /// Derive the fully qualified name for this symbol.
    ///
    /// Namespaces join with `::`, instance methods attach with `#`,
    /// singleton methods with `.`, and local variables with `@` after the
    /// containing method's full name.
    pub fn compute_full_name(&self) -> String {
        match self.kind {
            SymbolKind::Method
            | SymbolKind::AttrReader
            | SymbolKind::AttrWriter
            | SymbolKind::AttrAccessor => {
                if self.scope.is_empty() {
                    format!("#{}", self.name)
                } else {
                    format!("{}#{}", self.scope.join("::"), self.name)
                }
            }
            SymbolKind::SingletonMethod => {
                if self.scope.is_empty() {
                    format!(".{}", self.name)
                } else {
                    format!("{}.{}", self.scope.join("::"), self.name)
                }
            }
            SymbolKind::LocalVariable => match &self.method_full_name {
                Some(method) => format!("{}@{}", method, self.name),
                None => format!("@{}", self.name),
            },
            _ => {
                let mut parts = self.scope.clone();
                parts.push(self.name.clone());
                parts.join("::")
            }
        }
    }

    /// Check whether this symbol answers to `name`, short or fully qualified
    pub fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.full_name == name
    }
}

/// A textual occurrence of a name, produced by trigram search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub file_path: String,
    /// 1-indexed
    pub line: usize,
    /// 0-indexed byte column of the match
    pub column: usize,
    /// Length of the matched text in bytes
    pub length: usize,
    /// Full line text for display
    pub line_text: String,
}

/// Configuration for index construction and the update pipeline
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Worker threads for the initial parallel build
    pub worker_threads: usize,
    /// Quiescence window for the filesystem-event debouncer
    pub debounce_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            worker_threads: 8,
            debounce_ms: 100,
        }
    }
}

/// Check whether a path names a Ruby source file worth indexing
///
/// Matches by extension (`.rb`, `.rake`, `.gemspec`) or by well-known
/// basename (`Gemfile`, `Rakefile`, `Guardfile`, `Vagrantfile`).
pub fn is_ruby_file(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if matches!(ext, "rb" | "rake" | "gemspec") {
            return true;
        }
    }

    if let Some(base) = path.file_name().and_then(|b| b.to_str()) {
        return matches!(base, "Gemfile" | "Rakefile" | "Guardfile" | "Vagrantfile");
    }

    false
}
