//! Pigeon parser: converts a token stream into an AST.

mod parse_decl;
mod parse_expr;
mod parse_stmt;
mod parse_type;
mod parser;

pub use parser::{ParseResult, Parser, MAX_NESTING_DEPTH};

use pigeon_lexer::Lexer;
use pigeon_types::SourceFile;

/// Lexes and parses a source file, collecting errors from both stages.
///
/// Parsing is skipped when lexing fails.
pub fn parse_source(source: &SourceFile) -> ParseResult {
    let lexed = Lexer::new(source).lex();
    if lexed.errors.has_errors() {
        return ParseResult {
            program: None,
            errors: lexed.errors,
        };
    }
    Parser::new(lexed.tokens, source).parse()
}
