//! WASM bindings for the cssgram parser.
//!
//! Exposes `parse()`, `query()` and `tokenize()` to JavaScript via
//! wasm-bindgen. Results are plain JS objects built with serde.

use cssgram_lexer::{Dialect, Scanner, Token};
use cssgram_parser::{Diagnostic, NodeRef, ParseResult, Parser, QueryError};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Parse output handed to JavaScript.
#[derive(Serialize)]
struct ParseOutput<'a> {
    dialect: Dialect,
    tree: NodeRef<'a>,
    diagnostics: Vec<DiagnosticOutput<'a>>,
}

#[derive(Serialize)]
struct DiagnosticOutput<'a> {
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
    line: usize,
    column: usize,
}

fn dialect(name: &str) -> Result<Dialect, JsError> {
    name.parse::<Dialect>()
        .map_err(|e| JsError::new(&e.to_string()))
}

fn parse_output(result: &ParseResult) -> ParseOutput<'_> {
    let diagnostics = result
        .diagnostics()
        .iter()
        .map(|diagnostic| {
            let (line, column) = result.line_column(diagnostic.from);
            DiagnosticOutput {
                diagnostic,
                line,
                column,
            }
        })
        .collect();
    ParseOutput {
        dialect: result.dialect(),
        tree: result.root(),
        diagnostics,
    }
}

/// Image of the first node matching `path`.
fn query_image<'a>(result: &'a ParseResult, path: &str) -> Result<Option<&'a str>, QueryError> {
    Ok(result.try_query(path)?.map(|node| node.image()))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsError::new(&e.to_string()))
}

/// Parse a stylesheet.
///
/// Returns `{ dialect, tree, diagnostics }`. Never throws for bad CSS, only
/// for an unknown dialect name.
#[wasm_bindgen]
pub fn parse(source: &str, dialect_name: &str) -> Result<JsValue, JsError> {
    let result = Parser::parse(source, dialect(dialect_name)?);
    to_js(&parse_output(&result))
}

/// Parse and return the source text of the first node matching `path`,
/// or `null`. Throws for a malformed path.
#[wasm_bindgen]
pub fn query(source: &str, dialect_name: &str, path: &str) -> Result<Option<String>, JsError> {
    let result = Parser::parse(source, dialect(dialect_name)?);
    let image = query_image(&result, path).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(image.map(str::to_string))
}

/// Tokenize a stylesheet into `[{ kind, span }]`.
#[wasm_bindgen]
pub fn tokenize(source: &str, dialect_name: &str) -> Result<JsValue, JsError> {
    let tokens: Vec<Token> = Scanner::tokenize(source, dialect(dialect_name)?);
    to_js(&tokens)
}

/// Get the parser version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
