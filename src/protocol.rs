//! Minimal LSP protocol types for definition and references
//!
//! Only the slice of the protocol the server actually speaks, plus the
//! helpers that bridge index symbols to LSP locations and extract the
//! Ruby-aware word under a cursor.

use serde::{Deserialize, Serialize};

use crate::models::Symbol;

/// Position in a text document (0-indexed, as LSP requires)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextDocumentIdentifier {
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentPositionParams {
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceContext {
    #[serde(default)]
    pub include_declaration: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceParams {
    #[serde(flatten)]
    pub position_params: TextDocumentPositionParams,
    #[serde(default)]
    pub context: ReferenceContext,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentItem {
    pub uri: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOpenParams {
    pub text_document: TextDocumentItem,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentChangeEvent {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidChangeParams {
    pub text_document: TextDocumentIdentifier,
    pub content_changes: Vec<ContentChangeEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidCloseParams {
    pub text_document: TextDocumentIdentifier,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentSyncOptions {
    pub open_close: bool,
    /// 1 = full document sync
    pub change: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    pub text_document_sync: TextDocumentSyncOptions,
    pub definition_provider: bool,
    pub references_provider: bool,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

impl InitializeResult {
    pub fn new() -> Self {
        Self {
            capabilities: ServerCapabilities {
                text_document_sync: TextDocumentSyncOptions {
                    open_close: true,
                    change: 1,
                },
                definition_provider: true,
                references_provider: true,
            },
            server_info: ServerInfo {
                name: "rubylens",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the file:// scheme from a URI
pub fn uri_to_path(uri: &str) -> String {
    uri.strip_prefix("file://").unwrap_or(uri).to_string()
}

/// Add the file:// scheme to a path
pub fn path_to_uri(path: &str) -> String {
    if path.starts_with("file://") {
        path.to_string()
    } else {
        format!("file://{}", path)
    }
}

/// Convert an index symbol to an LSP location spanning its name
pub fn symbol_to_location(sym: &Symbol) -> Location {
    Location {
        uri: path_to_uri(&sym.file_path),
        range: Range {
            start: Position {
                line: sym.line.saturating_sub(1) as u32,
                character: sym.column as u32,
            },
            end: Position {
                line: sym.line.saturating_sub(1) as u32,
                character: (sym.column + sym.name.len()) as u32,
            },
        },
    }
}

/// Extract the Ruby word at the given 0-indexed line and column.
///
/// Identifiers may end in `?`, `!` or `=`. Constant references extend left
/// across `::` segments, including a leading `::`. The cursor's own segment
/// is the rightmost one returned, so a cursor on `Foo` in `Top::Foo` yields
/// `Top::Foo` while a cursor on `Top` yields just `Top`.
pub fn extract_word_at(content: &str, line: usize, character: usize) -> String {
    let Some(line_text) = content.split('\n').nth(line) else {
        return String::new();
    };

    let bytes = line_text.as_bytes();
    if bytes.is_empty() {
        return String::new();
    }

    let mut pos = character;
    if pos >= bytes.len() {
        pos = bytes.len() - 1;
    }

    // Cursor on a method suffix: step back into the word
    if matches!(bytes[pos], b'?' | b'!' | b'=') && pos > 0 && is_word_char(bytes[pos - 1]) {
        pos -= 1;
    }

    let mut start = pos;
    while start > 0 && is_word_char(bytes[start - 1]) {
        start -= 1;
    }

    // Qualify leftward across :: separators
    loop {
        if start >= 2 && &bytes[start - 2..start] == b"::" {
            if start >= 3 && is_word_char(bytes[start - 3]) {
                let mut s = start - 2;
                while s > 0 && is_word_char(bytes[s - 1]) {
                    s -= 1;
                }
                start = s;
            } else {
                // Bare leading :: marks an absolute reference
                start -= 2;
                break;
            }
        } else {
            break;
        }
    }

    let mut end = pos;
    while end < bytes.len() && is_word_char(bytes[end]) {
        end += 1;
    }

    // Trailing ? ! = belongs to the method name
    if end < bytes.len() && matches!(bytes[end], b'?' | b'!' | b'=') {
        end += 1;
    }

    if start == end {
        return String::new();
    }

    line_text.get(start..end).unwrap_or_default().to_string()
}

/// Valid Ruby identifier byte (suffix chars handled separately)
fn is_word_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SymbolKind;

    #[test]
    fn test_uri_conversion() {
        assert_eq!(uri_to_path("file:///app/user.rb"), "/app/user.rb");
        assert_eq!(uri_to_path("/app/user.rb"), "/app/user.rb");
        assert_eq!(path_to_uri("/app/user.rb"), "file:///app/user.rb");
        assert_eq!(path_to_uri("file:///app/user.rb"), "file:///app/user.rb");
    }

    #[test]
    fn test_symbol_to_location() {
        let mut sym = Symbol {
            name: "Person".to_string(),
            kind: SymbolKind::Class,
            file_path: "/app/person.rb".to_string(),
            line: 3,
            column: 6,
            ..Default::default()
        };
        sym.full_name = sym.compute_full_name();

        let loc = symbol_to_location(&sym);
        assert_eq!(loc.uri, "file:///app/person.rb");
        assert_eq!(loc.range.start, Position { line: 2, character: 6 });
        assert_eq!(loc.range.end, Position { line: 2, character: 12 });
    }

    #[test]
    fn test_extract_simple_word() {
        assert_eq!(extract_word_at("  greet(name)", 0, 3), "greet");
        assert_eq!(extract_word_at("  greet(name)", 0, 2), "greet");
        assert_eq!(extract_word_at("  greet(name)", 0, 9), "name");
    }

    #[test]
    fn test_extract_word_with_suffix() {
        // Cursor inside the word picks up the suffix
        assert_eq!(extract_word_at("  valid?", 0, 4), "valid?");
        // Cursor on the suffix itself steps back into the word
        assert_eq!(extract_word_at("  valid?", 0, 7), "valid?");
        assert_eq!(extract_word_at("  save!(force)", 0, 6), "save!");
    }

    #[test]
    fn test_extract_namespaced_word() {
        // Cursor on the rightmost segment extends left
        assert_eq!(
            extract_word_at("    EinLetter::EinMatcher.new", 0, 18),
            "EinLetter::EinMatcher"
        );
        // Cursor on the left segment stays there
        assert_eq!(
            extract_word_at("    EinLetter::EinMatcher", 0, 6),
            "EinLetter"
        );
        assert_eq!(extract_word_at("A::B::C.new", 0, 6), "A::B::C");
    }

    #[test]
    fn test_extract_leading_double_colon() {
        assert_eq!(
            extract_word_at("  ::TopLevel::Foo.call", 0, 16),
            "::TopLevel::Foo"
        );
    }

    #[test]
    fn test_extract_out_of_range() {
        assert_eq!(extract_word_at("one line", 5, 0), "");
        assert_eq!(extract_word_at("", 0, 0), "");
        // Past end of line falls back to the last word
        assert_eq!(extract_word_at("greet", 0, 99), "greet");
    }

    #[test]
    fn test_extract_on_punctuation() {
        assert_eq!(extract_word_at("a . b", 0, 2), "");
    }
}
