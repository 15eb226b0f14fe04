//! Statement nodes.

use crate::ast::expr::Expression;
use crate::error::{ParseResult, PositionalError};
use crate::token::Token;
use crate::types::TypeDescriptor;

#[derive(Debug, Clone)]
pub struct Statement {
    pub first_token: Token,
    pub kind: StatementKind,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Assignment {
        target: Box<Expression>,
        op_token: Token,
        value: Box<Expression>,
    },
    Break,
    ExpressionAsStatement(Box<Expression>),
    If {
        condition: Box<Expression>,
        if_code: Vec<Statement>,
        else_code: Vec<Statement>,
    },
    Return(Option<Box<Expression>>),
    Switch {
        condition: Box<Expression>,
        chunks: Vec<SwitchChunk>,
    },
    VariableDeclaration {
        declared_type: TypeDescriptor,
        name_token: Token,
        value: Option<Box<Expression>>,
    },
    While {
        condition: Box<Expression>,
        code: Vec<Statement>,
    },
    /// A group of statements spliced into the surrounding block; always
    /// flattened away by pass 1.
    StatementBatch(Vec<Statement>),
}

impl Statement {
    pub fn new(first_token: Token, kind: StatementKind) -> Self {
        Self { first_token, kind }
    }
}

/// One `case ...: case ...: { body }` group of a switch statement.
/// `None` in `cases` is the `default` marker.
#[derive(Debug, Clone)]
pub struct SwitchChunk {
    pub case_tokens: Vec<Token>,
    pub cases: Vec<Option<Expression>>,
    pub code: Vec<Statement>,
}

impl SwitchChunk {
    pub fn new(
        case_tokens: Vec<Token>,
        cases: Vec<Option<Expression>>,
        code: Vec<Statement>,
    ) -> ParseResult<Self> {
        assert_eq!(case_tokens.len(), cases.len());
        // default may only be the final case of a chunk.
        for i in 0..cases.len().saturating_sub(1) {
            if cases[i].is_none() {
                return Err(PositionalError::structural(
                    &case_tokens[i],
                    "default cannot appear before other cases.",
                ));
            }
        }
        Ok(Self {
            case_tokens,
            cases,
            code,
        })
    }

    pub fn has_default(&self) -> bool {
        matches!(self.cases.last(), Some(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_must_be_last_in_chunk() {
        let default_token = Token::synthetic("default");
        let case_token = Token::synthetic("case");
        let result = SwitchChunk::new(
            vec![default_token, case_token.clone()],
            vec![None, Some(Expression::integer(case_token, 1))],
            Vec::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn trailing_default_is_detected() {
        let chunk = SwitchChunk::new(
            vec![Token::synthetic("default")],
            vec![None],
            Vec::new(),
        )
        .unwrap();
        assert!(chunk.has_default());
    }
}
