//! Front-end interface of the prism transpiler.
//!
//! The tokenizer and recursive-descent parser are external collaborators;
//! this crate defines what they produce: tokens with source spans, the
//! closed AST node set, top-level compilation entities, and the type
//! descriptor with its template unifier. The semantic pipeline in the
//! `compiler` crate consumes these types and rewrites them in place.

pub mod ast;
pub mod error;
pub mod token;
pub mod types;

pub use ast::{Expression, ExpressionKind, Program, Statement, StatementKind};
pub use error::{ErrorCategory, ParseResult, PositionalError};
pub use token::Token;
pub use types::{DeclaredTypes, TemplateMap, TypeCategory, TypeDescriptor};
