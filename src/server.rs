//! LSP server over stdio
//!
//! Implements JSON-RPC 2.0 with Content-Length framing directly on the
//! given reader/writer pair. Requests dispatch to the symbol index;
//! notifications maintain the open-document overlay. Malformed frames and
//! unknown methods are logged and answered with protocol errors, never
//! crashes.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::index::SymbolIndex;
use crate::protocol::{
    extract_word_at, path_to_uri, symbol_to_location, uri_to_path, DidChangeParams,
    DidCloseParams, DidOpenParams, InitializeResult, Location, Position, Range, ReferenceParams,
    TextDocumentPositionParams,
};

/// JSON-RPC 2.0 request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

const METHOD_NOT_FOUND: i32 = -32601;
const INTERNAL_ERROR: i32 = -32603;

/// The language server: owns the open-document overlay and answers
/// definition/references queries from the shared index
pub struct Server {
    index: Arc<SymbolIndex>,
    /// URI → content for open documents; consulted before disk reads
    documents: HashMap<String, String>,
}

impl Server {
    pub fn new(index: Arc<SymbolIndex>) -> Self {
        Self {
            index,
            documents: HashMap::new(),
        }
    }

    /// Serve until EOF or an `exit` notification
    pub fn run(&mut self, mut input: impl BufRead, mut output: impl Write) -> Result<()> {
        log::info!("LSP server listening on stdio");

        loop {
            let payload = match read_message(&mut input) {
                Ok(Some(payload)) => payload,
                Ok(None) => break,
                Err(e) => {
                    log::error!("failed to read LSP frame: {}", e);
                    break;
                }
            };

            let request: JsonRpcRequest = match serde_json::from_slice(&payload) {
                Ok(request) => request,
                Err(e) => {
                    log::error!("failed to parse JSON-RPC request: {}", e);
                    continue;
                }
            };

            log::debug!("LSP request: {}", request.method);

            if request.method == "exit" {
                break;
            }

            if let Some(response) = self.process(request) {
                write_message(&mut output, &response)?;
            }
        }

        log::info!("LSP server stopped");
        Ok(())
    }

    /// Dispatch one request; notifications (no id) get no response
    fn process(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let result = match request.method.as_str() {
            "initialize" => serde_json::to_value(InitializeResult::new()).map_err(Into::into),
            "initialized" | "shutdown" => Ok(Value::Null),
            "textDocument/definition" => self.handle_definition(request.params),
            "textDocument/references" => self.handle_references(request.params),
            "textDocument/didOpen" => {
                self.handle_did_open(request.params);
                Ok(Value::Null)
            }
            "textDocument/didChange" => {
                self.handle_did_change(request.params);
                Ok(Value::Null)
            }
            "textDocument/didClose" => {
                self.handle_did_close(request.params);
                Ok(Value::Null)
            }
            _ => {
                let id = request.id?;
                return Some(error_response(
                    id,
                    METHOD_NOT_FOUND,
                    format!("method not supported: {}", request.method),
                ));
            }
        };

        let id = request.id?;
        Some(match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: "2.0",
                id: Some(id),
                result: Some(value),
                error: None,
            },
            Err(e) => {
                log::error!("{} failed: {}", request.method, e);
                error_response(id, INTERNAL_ERROR, e.to_string())
            }
        })
    }

    fn handle_definition(&self, params: Option<Value>) -> Result<Value> {
        let params: TextDocumentPositionParams = parse_params(params)?;
        let uri = params.text_document.uri;
        let path = uri_to_path(&uri);
        let line = params.position.line as usize;
        let character = params.position.character as usize;

        let Some(content) = self.document_content(&uri) else {
            return Ok(Value::Null);
        };

        let word = extract_word_at(&content, line, character);
        if word.is_empty() {
            return Ok(Value::Null);
        }

        log::debug!(
            "definition request for {} at {}:{}:{}",
            word,
            path,
            line,
            character
        );

        // Local variables shadow everything else for lowercase names;
        // the index speaks 1-indexed lines
        let first = word.as_bytes()[0];
        if first.is_ascii_lowercase() || first == b'_' {
            if let Some(sym) = self.index.find_local_variable(&word, &path, line + 1) {
                return Ok(serde_json::to_value(symbol_to_location(&sym))?);
            }
        }

        let symbols = self.index.find_definitions_in_context(&word, &path, line + 1);
        match symbols.as_slice() {
            [] => Ok(Value::Null),
            [only] => Ok(serde_json::to_value(symbol_to_location(only))?),
            many => {
                let locations: Vec<Location> = many.iter().map(symbol_to_location).collect();
                Ok(serde_json::to_value(locations)?)
            }
        }
    }

    fn handle_references(&self, params: Option<Value>) -> Result<Value> {
        let params: ReferenceParams = parse_params(params)?;
        let uri = params.position_params.text_document.uri;
        let line = params.position_params.position.line as usize;
        let character = params.position_params.position.character as usize;

        let Some(content) = self.document_content(&uri) else {
            return Ok(Value::Null);
        };

        let word = extract_word_at(&content, line, character);
        if word.is_empty() {
            return Ok(Value::Null);
        }

        log::debug!("references request for {}", word);

        // The same location can surface as a text match, a targeting symbol
        // and a declaration; deduplicate by (file, line, column)
        let mut seen: HashSet<(String, usize, usize)> = HashSet::new();
        let mut locations: Vec<Location> = Vec::new();

        for reference in self.index.find_references(&word) {
            if !seen.insert((
                reference.file_path.clone(),
                reference.line,
                reference.column,
            )) {
                continue;
            }
            locations.push(Location {
                uri: path_to_uri(&reference.file_path),
                range: Range {
                    start: Position {
                        line: reference.line.saturating_sub(1) as u32,
                        character: reference.column as u32,
                    },
                    end: Position {
                        line: reference.line.saturating_sub(1) as u32,
                        character: (reference.column + reference.length) as u32,
                    },
                },
            });
        }

        for sym in self.index.find_targeting_symbols(&word) {
            if seen.insert((sym.file_path.clone(), sym.line, sym.column)) {
                locations.push(symbol_to_location(&sym));
            }
        }

        if params.context.include_declaration {
            for sym in self.index.find_definitions(&word) {
                if seen.insert((sym.file_path.clone(), sym.line, sym.column)) {
                    locations.push(symbol_to_location(&sym));
                }
            }
        }

        Ok(serde_json::to_value(locations)?)
    }

    fn handle_did_open(&mut self, params: Option<Value>) {
        if let Ok(params) = parse_params::<DidOpenParams>(params) {
            self.documents
                .insert(params.text_document.uri, params.text_document.text);
        }
    }

    fn handle_did_change(&mut self, params: Option<Value>) {
        if let Ok(params) = parse_params::<DidChangeParams>(params) {
            // Full sync: the last change carries the whole document
            if let Some(change) = params.content_changes.into_iter().last() {
                self.documents.insert(params.text_document.uri, change.text);
            }
        }
    }

    fn handle_did_close(&mut self, params: Option<Value>) {
        if let Ok(params) = parse_params::<DidCloseParams>(params) {
            self.documents.remove(&params.text_document.uri);
        }
    }

    /// Open-document overlay first, disk second
    fn document_content(&self, uri: &str) -> Option<String> {
        if let Some(content) = self.documents.get(uri) {
            return Some(content.clone());
        }

        let path = uri_to_path(uri);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                log::warn!("failed to read {}: {}", path, e);
                None
            }
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T> {
    let params = params.ok_or_else(|| anyhow!("missing params"))?;
    serde_json::from_value(params).context("invalid params")
}

fn error_response(id: Value, code: i32, message: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id: Some(id),
        result: None,
        error: Some(JsonRpcError { code, message }),
    }
}

/// Read one Content-Length framed message; `None` on clean EOF
fn read_message(reader: &mut impl BufRead) -> Result<Option<Vec<u8>>> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }

        let line = line.trim_end();
        if line.is_empty() {
            break;
        }

        if let Some(value) = line.strip_prefix("Content-Length:") {
            content_length = Some(
                value
                    .trim()
                    .parse()
                    .with_context(|| format!("bad Content-Length: {}", value.trim()))?,
            );
        }
    }

    let length = content_length.ok_or_else(|| anyhow!("missing Content-Length header"))?;

    let mut payload = vec![0u8; length];
    reader
        .read_exact(&mut payload)
        .context("truncated LSP frame")?;
    Ok(Some(payload))
}

fn write_message(writer: &mut impl Write, response: &JsonRpcResponse) -> Result<()> {
    let body = serde_json::to_vec(response)?;
    write!(writer, "Content-Length: {}\r\n\r\n", body.len())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}
