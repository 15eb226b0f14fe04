//! Positional errors for the semantic pipeline.
//!
//! Every violated invariant aborts the compilation of its unit immediately
//! with one of these. The category distinguishes malformed structure
//! (inheritance cycles, shadowing), type violations, and internal contract
//! violations indicating a malformed AST from upstream; backends have their
//! own unsupported-operation signal and never use this type for that.

use crate::token::Token;
use diagnostics::{Diagnostic, SourceSpan};
use std::fmt;

/// What kind of rule was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed declarations: inheritance cycles, field shadowing,
    /// duplicate names.
    Structural,
    /// Assignment/return/argument type mismatches.
    Type,
    /// Internal contract violations (malformed AST handed up from parsing).
    Invariant,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Structural => write!(f, "structural error"),
            ErrorCategory::Type => write!(f, "type error"),
            ErrorCategory::Invariant => write!(f, "invariant violation"),
        }
    }
}

/// A fail-fast compilation error carrying the offending token's span.
#[derive(Debug, Clone)]
pub struct PositionalError {
    pub category: ErrorCategory,
    pub message: String,
    pub span: SourceSpan,
}

pub type ParseResult<T> = Result<T, PositionalError>;

impl PositionalError {
    pub fn structural(token: &Token, message: impl Into<String>) -> Self {
        Self::at_span(ErrorCategory::Structural, token.span, message)
    }

    pub fn type_error(token: &Token, message: impl Into<String>) -> Self {
        Self::at_span(ErrorCategory::Type, token.span, message)
    }

    pub fn invariant(token: &Token, message: impl Into<String>) -> Self {
        Self::at_span(ErrorCategory::Invariant, token.span, message)
    }

    pub fn at_span(category: ErrorCategory, span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.span, self.message.clone()).with_note(self.category.to_string())
    }
}

impl fmt::Display for PositionalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}",
            self.category, self.message, self.span.start
        )
    }
}

impl std::error::Error for PositionalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_and_position() {
        let token = Token::synthetic("Point");
        let err = PositionalError::structural(&token, "This struct field hides an inherited definition of 'x'.");
        let text = err.to_string();
        assert!(text.starts_with("structural error:"));
        assert!(text.contains("hides an inherited definition"));
    }

    #[test]
    fn diagnostic_conversion_keeps_message() {
        let token = Token::synthetic("int");
        let err = PositionalError::type_error(&token, "Cannot assign this type to a string");
        let diag = err.to_diagnostic();
        assert_eq!(diag.message, "Cannot assign this type to a string");
        assert_eq!(diag.notes, vec!["type error".to_string()]);
    }
}
