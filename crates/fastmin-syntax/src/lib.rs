//! fastmin-syntax: JavaScript front and back end for the minifier.
//!
//! # Design Principles
//!
//! 1. **Everything is an Expression, Binding, or Statement**
//!    - Expressions: `foo(1)`, `a + b`, `x.y`
//!    - Bindings: `a`, `[a, b]`, `{x: y}`
//!    - Statements: `var a = 1;`, `if (x) {}`, `return x;`
//!
//! 2. **Lexing on-demand**
//!    - Lexer is called during parsing, not upfront
//!    - Enables context-sensitive tokenization (regex vs division)
//!
//! 3. **One position space per program**
//!    - Each parsed unit is appended at a base offset past the previous one
//!    - A span alone identifies the unit and the position inside it
//!
//! 4. **Passes are visitors**
//!    - Scope analysis, renaming and member mangling all implement
//!      [`VisitMut`] over the same tree
//!
//! # Example
//!
//! ```
//! use fastmin_syntax::{parse, Codegen, CodegenOptions, ParseOptions};
//!
//! let program = parse("var x = 1 + 2;", ParseOptions::new("input.js")).unwrap();
//! let code = Codegen::new(&program, CodegenOptions::default()).generate();
//! assert_eq!(code, "var x=1+2");
//! ```

mod ast;
mod codegen;
mod lexer;
mod parser;
mod span;
mod token;
pub mod visit;

// Re-exports
pub use ast::*;
pub use codegen::{format_number, quote_string, Codegen, CodegenOptions, RawMapping};
pub use lexer::{is_identifier_name, Lexer};
pub use parser::{parse, ParseError, ParseOptions, Parser};
pub use span::{LineIndex, Span};
pub use token::{is_reserved_word, keyword_from_str, Token, TokenKind};
pub use visit::{DeclKind, ScopeKind, VisitMut};
