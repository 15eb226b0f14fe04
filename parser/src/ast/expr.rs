//! Expression nodes.
//!
//! A closed set of node kinds: every resolution pass matches exhaustively,
//! so a newly added kind fails to compile until each pass handles it.
//! Passes take a node by value and return the (possibly replaced) node;
//! cross-entity references are by name, never by shared pointer.

use crate::ast::core::CoreFunction;
use crate::error::{ParseResult, PositionalError};
use crate::token::Token;
use crate::types::TypeDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    /// `!x`
    Not,
    /// `-x`
    Negative,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub first_token: Token,
    pub kind: ExpressionKind,
    /// Assigned during type resolution; present on every node handed to a
    /// backend.
    pub resolved_type: Option<TypeDescriptor>,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    IntegerConstant(i64),
    FloatConstant(f64),
    BooleanConstant(bool),
    CharConstant(char),
    StringConstant(String),
    NullConstant,
    /// A bare identifier; rewritten in pass 1 to a constant, function
    /// reference, or enum reference where one is in scope.
    Variable(String),
    /// Flat n-ary operator run from the parser; pass 1 folds it into a
    /// tree of `OpPair`s.
    OpChain {
        expressions: Vec<Expression>,
        ops: Vec<Token>,
    },
    OpPair {
        left: Box<Expression>,
        op: Token,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: Box<Expression>,
    },
    FunctionInvocation {
        root: Box<Expression>,
        open_paren: Token,
        args: Vec<Expression>,
    },
    /// Reference to a top-level function, by registry name.
    FunctionReference(String),
    CoreFunctionReference(CoreFunction),
    CoreFunctionInvocation {
        function: CoreFunction,
        args: Vec<Expression>,
    },
    /// `new Type` before the argument list attaches.
    ConstructorReference(TypeDescriptor),
    ConstructorInvocation {
        type_to_construct: TypeDescriptor,
        args: Vec<Expression>,
        /// Set in pass 3 for struct construction; backends use it with the
        /// struct's flattened field list.
        struct_name: Option<String>,
    },
    DotField {
        root: Box<Expression>,
        field_name: Token,
    },
    /// Struct field access resolved to a stable index into the flattened
    /// field list.
    StructFieldAccess {
        root: Box<Expression>,
        struct_name: String,
        field_name: Token,
        field_index: usize,
    },
    /// `value[index]`; desugared during type resolution into the matching
    /// container core operation.
    BracketIndex {
        root: Box<Expression>,
        bracket_token: Token,
        index: Box<Expression>,
    },
    Cast {
        target_type: TypeDescriptor,
        expression: Box<Expression>,
    },
    This,
    /// Parentheses the author wrote and wants kept in the output.
    ForcedParenthesis(Box<Expression>),
    InlineIncrement {
        operand: Box<Expression>,
        is_prefix: bool,
        is_addition: bool,
    },
    /// Flattened `+` run over strings, built during type resolution.
    StringConcatenation(Vec<Expression>),
    EnumReference(String),
}

impl Expression {
    pub fn new(first_token: Token, kind: ExpressionKind) -> Self {
        Self {
            first_token,
            kind,
            resolved_type: None,
        }
    }

    pub fn with_type(first_token: Token, kind: ExpressionKind, resolved: TypeDescriptor) -> Self {
        Self {
            first_token,
            kind,
            resolved_type: Some(resolved),
        }
    }

    pub fn integer(token: Token, value: i64) -> Self {
        Self::new(token, ExpressionKind::IntegerConstant(value))
    }

    pub fn float(token: Token, value: f64) -> Self {
        Self::new(token, ExpressionKind::FloatConstant(value))
    }

    pub fn boolean(token: Token, value: bool) -> Self {
        Self::new(token, ExpressionKind::BooleanConstant(value))
    }

    pub fn char_constant(token: Token, value: char) -> Self {
        Self::new(token, ExpressionKind::CharConstant(value))
    }

    pub fn string(token: Token, value: impl Into<String>) -> Self {
        Self::new(token, ExpressionKind::StringConstant(value.into()))
    }

    pub fn null(token: Token) -> Self {
        Self::new(token, ExpressionKind::NullConstant)
    }

    pub fn variable(token: Token) -> Self {
        let name = token.value.clone();
        Self::new(token, ExpressionKind::Variable(name))
    }

    /// The resolved type, required. Absence after pass 2 is a malformed-AST
    /// invariant, not a user error.
    pub fn require_type(&self) -> ParseResult<&TypeDescriptor> {
        self.resolved_type.as_ref().ok_or_else(|| {
            PositionalError::invariant(&self.first_token, "Expression was never type-resolved.")
        })
    }

    /// True for nodes that are compile-time constants after folding.
    pub fn is_inline_constant(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::IntegerConstant(_)
                | ExpressionKind::FloatConstant(_)
                | ExpressionKind::BooleanConstant(_)
                | ExpressionKind::CharConstant(_)
                | ExpressionKind::StringConstant(_)
                | ExpressionKind::NullConstant
        )
    }

    /// The comparable runtime value of an int or char constant, with chars
    /// widened to their code point. Used for switch-case uniqueness.
    pub fn constant_case_value(&self) -> Option<i64> {
        match self.kind {
            ExpressionKind::IntegerConstant(value) => Some(value),
            ExpressionKind::CharConstant(value) => Some(value as i64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_constants_are_recognized() {
        let token = Token::synthetic("x");
        assert!(Expression::integer(token.clone(), 1).is_inline_constant());
        assert!(Expression::null(token.clone()).is_inline_constant());
        assert!(!Expression::variable(Token::synthetic("x")).is_inline_constant());
    }

    #[test]
    fn case_values_widen_chars() {
        let a = Expression::char_constant(Token::synthetic("'a'"), 'a');
        assert_eq!(a.constant_case_value(), Some(97));
        let n = Expression::integer(Token::synthetic("97"), 97);
        assert_eq!(n.constant_case_value(), Some(97));
        let s = Expression::string(Token::synthetic("\"a\""), "a");
        assert_eq!(s.constant_case_value(), None);
    }

    #[test]
    fn require_type_flags_unresolved_nodes() {
        let expr = Expression::variable(Token::synthetic("x"));
        assert!(expr.require_type().is_err());
    }
}
