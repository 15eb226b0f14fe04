//! Pass 1: name resolution and dead-code culling.
//!
//! Bare identifiers are rewritten into what they actually refer to:
//! folded constant values (spliced in with the usage site's token),
//! function references, or enum references. `Core.Xyz` roots become
//! builtin references, enum dot-accesses become integer constants, and
//! flat operator chains are folded into pair trees. `if` statements with
//! a constant condition are replaced by the taken branch, and statements
//! after a `return` or `break` are a hard error.

use indexmap::IndexMap;
use parser::ast::{
    CoreFunction, EnumDefinition, FunctionDefinition, SwitchChunk, TopLevelVariable, UnaryOpKind,
};
use parser::error::{ParseResult, PositionalError};
use parser::{Expression, ExpressionKind, Statement, StatementKind};

/// Read-only registry views pass 1 resolves names against. Locals,
/// arguments, and globals are left alone; they wait for the typed scopes
/// of pass 2.
pub(crate) struct NameContext<'a> {
    pub functions: &'a IndexMap<String, FunctionDefinition>,
    pub enums: &'a IndexMap<String, EnumDefinition>,
    pub constants: &'a IndexMap<String, TopLevelVariable>,
}

/// Resolve a statement list, splicing batches flat and rejecting
/// unreachable or free-floating expressions.
pub(crate) fn resolve_block(
    statements: Vec<Statement>,
    cx: &NameContext,
) -> ParseResult<Vec<Statement>> {
    let mut output = Vec::with_capacity(statements.len());
    for statement in statements {
        let resolved = resolve_statement(statement, cx)?;
        match resolved.kind {
            StatementKind::StatementBatch(batch) => output.extend(batch),
            _ => output.push(resolved),
        }
    }

    for (i, statement) in output.iter().enumerate() {
        if let StatementKind::ExpressionAsStatement(expression) = &statement.kind {
            let is_executable = matches!(
                expression.kind,
                ExpressionKind::FunctionInvocation { .. }
                    | ExpressionKind::CoreFunctionInvocation { .. }
                    | ExpressionKind::InlineIncrement { .. }
            );
            if !is_executable {
                return Err(PositionalError::structural(
                    &expression.first_token,
                    "This expression is not allowed here.",
                ));
            }
        }
        let terminates = matches!(
            statement.kind,
            StatementKind::Return(_) | StatementKind::Break
        );
        if terminates && i + 1 < output.len() {
            return Err(PositionalError::structural(
                &output[i + 1].first_token,
                "Unreachable code detected.",
            ));
        }
    }
    Ok(output)
}

pub(crate) fn resolve_statement(statement: Statement, cx: &NameContext) -> ParseResult<Statement> {
    let Statement { first_token, kind } = statement;
    let kind = match kind {
        StatementKind::Assignment {
            target,
            op_token,
            value,
        } => StatementKind::Assignment {
            target: Box::new(resolve_expression(*target, cx)?),
            op_token,
            value: Box::new(resolve_expression(*value, cx)?),
        },
        StatementKind::Break => StatementKind::Break,
        StatementKind::ExpressionAsStatement(expression) => {
            StatementKind::ExpressionAsStatement(Box::new(resolve_expression(*expression, cx)?))
        }
        StatementKind::If {
            condition,
            if_code,
            else_code,
        } => {
            let condition = resolve_expression(*condition, cx)?;
            let if_code = resolve_block(if_code, cx)?;
            let else_code = resolve_block(else_code, cx)?;
            // A constant condition collapses to the taken branch.
            if let ExpressionKind::BooleanConstant(value) = condition.kind {
                let taken = if value { if_code } else { else_code };
                StatementKind::StatementBatch(taken)
            } else {
                StatementKind::If {
                    condition: Box::new(condition),
                    if_code,
                    else_code,
                }
            }
        }
        StatementKind::Return(value) => StatementKind::Return(match value {
            Some(expression) => Some(Box::new(resolve_expression(*expression, cx)?)),
            None => None,
        }),
        StatementKind::Switch { condition, chunks } => {
            let condition = Box::new(resolve_expression(*condition, cx)?);
            let mut resolved_chunks = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                let SwitchChunk {
                    case_tokens,
                    cases,
                    code,
                } = chunk;
                let mut resolved_cases = Vec::with_capacity(cases.len());
                for case in cases {
                    resolved_cases.push(match case {
                        Some(expression) => Some(resolve_expression(expression, cx)?),
                        None => None,
                    });
                }
                resolved_chunks.push(SwitchChunk {
                    case_tokens,
                    cases: resolved_cases,
                    code: resolve_block(code, cx)?,
                });
            }
            StatementKind::Switch {
                condition,
                chunks: resolved_chunks,
            }
        }
        StatementKind::VariableDeclaration {
            declared_type,
            name_token,
            value,
        } => {
            let value = value.ok_or_else(|| {
                PositionalError::structural(
                    &name_token,
                    "Cannot have a variable declaration without a value.",
                )
            })?;
            StatementKind::VariableDeclaration {
                declared_type,
                name_token,
                value: Some(Box::new(resolve_expression(*value, cx)?)),
            }
        }
        StatementKind::While { condition, code } => StatementKind::While {
            condition: Box::new(resolve_expression(*condition, cx)?),
            code: resolve_block(code, cx)?,
        },
        StatementKind::StatementBatch(batch) => {
            StatementKind::StatementBatch(resolve_block(batch, cx)?)
        }
    };
    Ok(Statement::new(first_token, kind))
}

pub(crate) fn resolve_expression(
    expression: Expression,
    cx: &NameContext,
) -> ParseResult<Expression> {
    let Expression {
        first_token, kind, ..
    } = expression;
    let resolved = match kind {
        ExpressionKind::IntegerConstant(_)
        | ExpressionKind::FloatConstant(_)
        | ExpressionKind::BooleanConstant(_)
        | ExpressionKind::CharConstant(_)
        | ExpressionKind::StringConstant(_)
        | ExpressionKind::NullConstant
        | ExpressionKind::This
        | ExpressionKind::FunctionReference(_)
        | ExpressionKind::CoreFunctionReference(_)
        | ExpressionKind::EnumReference(_)
        | ExpressionKind::ConstructorReference(_) => {
            Expression::new(first_token, kind)
        }
        ExpressionKind::Variable(name) => {
            if name == "Core" {
                return Err(PositionalError::structural(
                    &first_token,
                    "Core is a namespace and cannot be used like this.",
                ));
            }
            if let Some(constant) = cx.constants.get(&name) {
                // Splice the folded value, keeping the usage site's token.
                let mut value = constant.value.clone();
                value.first_token = first_token;
                value
            } else if cx.functions.contains_key(&name) {
                Expression::new(first_token, ExpressionKind::FunctionReference(name))
            } else if cx.enums.contains_key(&name) {
                Expression::new(first_token, ExpressionKind::EnumReference(name))
            } else {
                // Locals, arguments, and globals wait for type resolution.
                Expression::new(first_token, ExpressionKind::Variable(name))
            }
        }
        ExpressionKind::OpChain { expressions, ops } => {
            if expressions.len() != ops.len() + 1 || expressions.len() < 2 {
                return Err(PositionalError::invariant(
                    &first_token,
                    "Malformed operator chain.",
                ));
            }
            let mut resolved_operands = Vec::with_capacity(expressions.len());
            for operand in expressions {
                resolved_operands.push(resolve_expression(operand, cx)?);
            }
            fold_op_chain(resolved_operands, ops)
        }
        ExpressionKind::OpPair { left, op, right } => Expression::new(
            first_token,
            ExpressionKind::OpPair {
                left: Box::new(resolve_expression(*left, cx)?),
                op,
                right: Box::new(resolve_expression(*right, cx)?),
            },
        ),
        ExpressionKind::UnaryOp { op, operand } => {
            let operand = resolve_expression(*operand, cx)?;
            match (op, &operand.kind) {
                (UnaryOpKind::Not, ExpressionKind::BooleanConstant(value)) => {
                    Expression::boolean(first_token, !value)
                }
                (UnaryOpKind::Negative, ExpressionKind::IntegerConstant(value)) => {
                    Expression::integer(first_token, -value)
                }
                (UnaryOpKind::Negative, ExpressionKind::FloatConstant(value)) => {
                    Expression::float(first_token, -value)
                }
                _ => Expression::new(
                    first_token,
                    ExpressionKind::UnaryOp {
                        op,
                        operand: Box::new(operand),
                    },
                ),
            }
        }
        ExpressionKind::FunctionInvocation {
            root,
            open_paren,
            args,
        } => {
            let root = resolve_expression(*root, cx)?;
            let mut resolved_args = Vec::with_capacity(args.len());
            for arg in args {
                resolved_args.push(resolve_expression(arg, cx)?);
            }
            Expression::new(
                first_token,
                ExpressionKind::FunctionInvocation {
                    root: Box::new(root),
                    open_paren,
                    args: resolved_args,
                },
            )
        }
        ExpressionKind::CoreFunctionInvocation { function, args } => {
            let mut resolved_args = Vec::with_capacity(args.len());
            for arg in args {
                resolved_args.push(resolve_expression(arg, cx)?);
            }
            Expression::new(
                first_token,
                ExpressionKind::CoreFunctionInvocation {
                    function,
                    args: resolved_args,
                },
            )
        }
        ExpressionKind::ConstructorInvocation {
            type_to_construct,
            args,
            struct_name,
        } => {
            let mut resolved_args = Vec::with_capacity(args.len());
            for arg in args {
                resolved_args.push(resolve_expression(arg, cx)?);
            }
            Expression::new(
                first_token,
                ExpressionKind::ConstructorInvocation {
                    type_to_construct,
                    args: resolved_args,
                    struct_name,
                },
            )
        }
        ExpressionKind::DotField { root, field_name } => {
            if let ExpressionKind::Variable(root_name) = &root.kind {
                if root_name == "Core" {
                    let function =
                        CoreFunction::from_name(&field_name.value).ok_or_else(|| {
                            PositionalError::structural(
                                &field_name,
                                format!("'{}' is not a Core function.", field_name.value),
                            )
                        })?;
                    return Ok(Expression::new(
                        first_token,
                        ExpressionKind::CoreFunctionReference(function),
                    ));
                }
            }
            let root = resolve_expression(*root, cx)?;
            if let ExpressionKind::EnumReference(enum_name) = &root.kind {
                let enum_def = &cx.enums[enum_name];
                let value = enum_def.resolved_value(&field_name.value).ok_or_else(|| {
                    PositionalError::structural(
                        &field_name,
                        format!(
                            "The enum value '{}.{}' does not exist.",
                            enum_name, field_name.value
                        ),
                    )
                })?;
                return Ok(Expression::integer(first_token, value));
            }
            Expression::new(
                first_token,
                ExpressionKind::DotField {
                    root: Box::new(root),
                    field_name,
                },
            )
        }
        ExpressionKind::StructFieldAccess {
            root,
            struct_name,
            field_name,
            field_index,
        } => Expression::new(
            first_token,
            ExpressionKind::StructFieldAccess {
                root: Box::new(resolve_expression(*root, cx)?),
                struct_name,
                field_name,
                field_index,
            },
        ),
        ExpressionKind::BracketIndex {
            root,
            bracket_token,
            index,
        } => Expression::new(
            first_token,
            ExpressionKind::BracketIndex {
                root: Box::new(resolve_expression(*root, cx)?),
                bracket_token,
                index: Box::new(resolve_expression(*index, cx)?),
            },
        ),
        ExpressionKind::Cast {
            target_type,
            expression,
        } => Expression::new(
            first_token,
            ExpressionKind::Cast {
                target_type,
                expression: Box::new(resolve_expression(*expression, cx)?),
            },
        ),
        ExpressionKind::ForcedParenthesis(inner) => Expression::new(
            first_token,
            ExpressionKind::ForcedParenthesis(Box::new(resolve_expression(*inner, cx)?)),
        ),
        ExpressionKind::InlineIncrement {
            operand,
            is_prefix,
            is_addition,
        } => Expression::new(
            first_token,
            ExpressionKind::InlineIncrement {
                operand: Box::new(resolve_expression(*operand, cx)?),
                is_prefix,
                is_addition,
            },
        ),
        ExpressionKind::StringConcatenation(parts) => {
            let mut resolved_parts = Vec::with_capacity(parts.len());
            for part in parts {
                resolved_parts.push(resolve_expression(part, cx)?);
            }
            Expression::new(first_token, ExpressionKind::StringConcatenation(resolved_parts))
        }
    };
    Ok(resolved)
}

/// Fold a flat same-precedence operator run into a pair tree. Short
/// circuit operators group to the right so the left-most condition is the
/// outermost guard; everything else groups to the left.
fn fold_op_chain(mut operands: Vec<Expression>, ops: Vec<parser::Token>) -> Expression {
    let short_circuit = ops.iter().all(|op| op.value == "&&" || op.value == "||");
    if short_circuit {
        let mut accumulator = operands.pop().unwrap();
        for (operand, op) in operands.into_iter().zip(ops.into_iter()).rev() {
            let first_token = operand.first_token.clone();
            accumulator = Expression::new(
                first_token,
                ExpressionKind::OpPair {
                    left: Box::new(operand),
                    op,
                    right: Box::new(accumulator),
                },
            );
        }
        accumulator
    } else {
        let mut operands = operands.into_iter();
        let mut accumulator = operands.next().unwrap();
        for (op, operand) in ops.into_iter().zip(operands) {
            let first_token = accumulator.first_token.clone();
            accumulator = Expression::new(
                first_token,
                ExpressionKind::OpPair {
                    left: Box::new(accumulator),
                    op,
                    right: Box::new(operand),
                },
            );
        }
        accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::token::Token;
    use parser::types::TypeDescriptor;

    fn empty_registries() -> (
        IndexMap<String, FunctionDefinition>,
        IndexMap<String, EnumDefinition>,
        IndexMap<String, TopLevelVariable>,
    ) {
        (IndexMap::new(), IndexMap::new(), IndexMap::new())
    }

    macro_rules! cx {
        ($maps:expr) => {
            NameContext {
                functions: &$maps.0,
                enums: &$maps.1,
                constants: &$maps.2,
            }
        };
    }

    fn statement_expr(expression: Expression) -> Statement {
        Statement::new(
            expression.first_token.clone(),
            StatementKind::ExpressionAsStatement(Box::new(expression)),
        )
    }

    #[test]
    fn constant_conditions_cull_the_dead_branch() {
        let maps = empty_registries();
        let cx = cx!(maps);
        let kept = Statement::new(
            Token::synthetic("return"),
            StatementKind::Return(Some(Box::new(Expression::integer(
                Token::synthetic("1"),
                1,
            )))),
        );
        let dropped = Statement::new(
            Token::synthetic("return"),
            StatementKind::Return(Some(Box::new(Expression::integer(
                Token::synthetic("2"),
                2,
            )))),
        );
        let conditional = Statement::new(
            Token::synthetic("if"),
            StatementKind::If {
                condition: Box::new(Expression::boolean(Token::synthetic("true"), true)),
                if_code: vec![kept],
                else_code: vec![dropped],
            },
        );
        let block = resolve_block(vec![conditional], &cx).unwrap();
        assert_eq!(block.len(), 1);
        match &block[0].kind {
            StatementKind::Return(Some(value)) => {
                assert!(matches!(value.kind, ExpressionKind::IntegerConstant(1)))
            }
            other => panic!("expected the taken branch, got {:?}", other),
        }
    }

    #[test]
    fn unreachable_code_is_reported() {
        let maps = empty_registries();
        let cx = cx!(maps);
        let first = Statement::new(Token::synthetic("break"), StatementKind::Break);
        let second = Statement::new(Token::synthetic("break"), StatementKind::Break);
        let err = resolve_block(vec![first, second], &cx).unwrap_err();
        assert!(err.message.contains("Unreachable code"));
    }

    #[test]
    fn constants_splice_with_the_usage_token() {
        let mut maps = empty_registries();
        maps.2.insert(
            "LIMIT".to_string(),
            TopLevelVariable::constant(
                TypeDescriptor::int(),
                Token::synthetic("LIMIT"),
                Expression::integer(Token::synthetic("64"), 64),
            ),
        );
        let cx = cx!(maps);
        let usage = Token::synthetic("LIMIT");
        let resolved = resolve_expression(Expression::variable(usage), &cx).unwrap();
        assert!(matches!(resolved.kind, ExpressionKind::IntegerConstant(64)));
        assert_eq!(resolved.first_token.value, "LIMIT");
    }

    #[test]
    fn core_namespace_cannot_stand_alone() {
        let maps = empty_registries();
        let cx = cx!(maps);
        let err =
            resolve_expression(Expression::variable(Token::synthetic("Core")), &cx).unwrap_err();
        assert!(err.message.contains("namespace"));
    }

    #[test]
    fn core_dot_access_becomes_a_builtin_reference() {
        let maps = empty_registries();
        let cx = cx!(maps);
        let access = Expression::new(
            Token::synthetic("Core"),
            ExpressionKind::DotField {
                root: Box::new(Expression::variable(Token::synthetic("Core"))),
                field_name: Token::synthetic("ListAdd"),
            },
        );
        let resolved = resolve_expression(access, &cx).unwrap();
        assert!(matches!(
            resolved.kind,
            ExpressionKind::CoreFunctionReference(CoreFunction::ListAdd)
        ));

        let bogus = Expression::new(
            Token::synthetic("Core"),
            ExpressionKind::DotField {
                root: Box::new(Expression::variable(Token::synthetic("Core"))),
                field_name: Token::synthetic("Nonsense"),
            },
        );
        assert!(resolve_expression(bogus, &cx).is_err());
    }

    #[test]
    fn enum_members_fold_to_integers() {
        let mut maps = empty_registries();
        let mut enum_def = EnumDefinition::new(
            Token::synthetic("enum"),
            Token::synthetic("Op"),
            vec![Token::synthetic("ADD"), Token::synthetic("SUB")],
            vec![None, None],
        );
        let mut values = fxhash::FxHashMap::default();
        values.insert("ADD".to_string(), 0);
        values.insert("SUB".to_string(), 1);
        enum_def.set_resolved_values(values);
        maps.1.insert("Op".to_string(), enum_def);
        let cx = cx!(maps);

        let access = Expression::new(
            Token::synthetic("Op"),
            ExpressionKind::DotField {
                root: Box::new(Expression::variable(Token::synthetic("Op"))),
                field_name: Token::synthetic("SUB"),
            },
        );
        let resolved = resolve_expression(access, &cx).unwrap();
        assert!(matches!(resolved.kind, ExpressionKind::IntegerConstant(1)));
    }

    #[test]
    fn short_circuit_chains_fold_to_the_right() {
        let maps = empty_registries();
        let cx = cx!(maps);
        let chain = Expression::new(
            Token::synthetic("a"),
            ExpressionKind::OpChain {
                expressions: vec![
                    Expression::variable(Token::synthetic("a")),
                    Expression::variable(Token::synthetic("b")),
                    Expression::variable(Token::synthetic("c")),
                ],
                ops: vec![Token::synthetic("&&"), Token::synthetic("&&")],
            },
        );
        let folded = resolve_expression(chain, &cx).unwrap();
        match folded.kind {
            ExpressionKind::OpPair { left, right, .. } => {
                assert!(matches!(left.kind, ExpressionKind::Variable(ref n) if n == "a"));
                assert!(matches!(right.kind, ExpressionKind::OpPair { .. }));
            }
            other => panic!("expected a pair tree, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic_chains_fold_to_the_left() {
        let maps = empty_registries();
        let cx = cx!(maps);
        let chain = Expression::new(
            Token::synthetic("a"),
            ExpressionKind::OpChain {
                expressions: vec![
                    Expression::variable(Token::synthetic("a")),
                    Expression::variable(Token::synthetic("b")),
                    Expression::variable(Token::synthetic("c")),
                ],
                ops: vec![Token::synthetic("-"), Token::synthetic("-")],
            },
        );
        let folded = resolve_expression(chain, &cx).unwrap();
        match folded.kind {
            ExpressionKind::OpPair { left, right, .. } => {
                assert!(matches!(left.kind, ExpressionKind::OpPair { .. }));
                assert!(matches!(right.kind, ExpressionKind::Variable(ref n) if n == "c"));
            }
            other => panic!("expected a pair tree, got {:?}", other),
        }
    }

    #[test]
    fn declarations_require_an_initial_value() {
        let maps = empty_registries();
        let cx = cx!(maps);
        let declaration = Statement::new(
            Token::synthetic("int"),
            StatementKind::VariableDeclaration {
                declared_type: TypeDescriptor::int(),
                name_token: Token::synthetic("x"),
                value: None,
            },
        );
        let err = resolve_statement(declaration, &cx).unwrap_err();
        assert!(err.message.contains("without a value"));
    }

    #[test]
    fn bare_statement_expressions_are_rejected() {
        let maps = empty_registries();
        let cx = cx!(maps);
        let floating = statement_expr(Expression::integer(Token::synthetic("42"), 42));
        let err = resolve_block(vec![floating], &cx).unwrap_err();
        assert!(err.message.contains("not allowed here"));
    }
}
