//! Tokens as handed to the semantic pipeline by the tokenizer.
//!
//! The tokenizer itself lives upstream; the pipeline only relies on every
//! AST node retaining its originating token so that resolution errors can
//! point at a file, line, and column.

use diagnostics::{FileId, SourcePosition, SourceSpan};

/// A single token of source text with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub span: SourceSpan,
}

impl Token {
    pub fn new(value: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            value: value.into(),
            span,
        }
    }

    /// A token for nodes synthesized during resolution (constant folding,
    /// desugaring). These never surface in diagnostics for valid input.
    pub fn synthetic(value: impl Into<String>) -> Self {
        Self::new(
            value,
            SourceSpan::single_position(SourcePosition::start(), FileId::new(usize::MAX)),
        )
    }

    pub fn is_synthetic(&self) -> bool {
        self.span.file_id == FileId::new(usize::MAX)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}'", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_tokens_are_flagged() {
        let t = Token::synthetic("42");
        assert!(t.is_synthetic());
        assert_eq!(t.value, "42");
    }

    #[test]
    fn real_tokens_are_not_synthetic() {
        let span = SourceSpan::single_position(SourcePosition::new(3, 14), FileId::new(0));
        let t = Token::new("while", span);
        assert!(!t.is_synthetic());
        assert_eq!(t.to_string(), "'while'");
    }
}
