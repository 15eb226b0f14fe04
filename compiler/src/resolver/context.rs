//! Pass 3: resolution with full type context.
//!
//! Runs after every node has a resolved type. Constant subexpressions are
//! folded, `if` statements whose condition folded down to a boolean are
//! replaced by the taken branch, switch cases are checked for constancy
//! and uniqueness, and constructor arguments are finally verified against
//! flattened struct fields or class constructor signatures.

use super::Resolver;
use fxhash::FxHashSet;
use parser::ast::{SwitchChunk, UnaryOpKind};
use parser::error::{ParseResult, PositionalError};
use parser::token::Token;
use parser::types::{TypeCategory, TypeDescriptor};
use parser::{Expression, ExpressionKind, Statement, StatementKind};

pub(crate) fn resolve_block(
    statements: Vec<Statement>,
    res: &Resolver,
) -> ParseResult<Vec<Statement>> {
    let mut output = Vec::with_capacity(statements.len());
    for statement in statements {
        let resolved = resolve_statement(statement, res)?;
        match resolved.kind {
            StatementKind::StatementBatch(batch) => output.extend(batch),
            _ => output.push(resolved),
        }
    }
    Ok(output)
}

fn resolve_statement(statement: Statement, res: &Resolver) -> ParseResult<Statement> {
    let Statement { first_token, kind } = statement;
    let kind = match kind {
        StatementKind::Assignment {
            target,
            op_token,
            value,
        } => StatementKind::Assignment {
            target: Box::new(resolve_expression(*target, res)?),
            op_token,
            value: Box::new(resolve_expression(*value, res)?),
        },
        StatementKind::Break => StatementKind::Break,
        StatementKind::ExpressionAsStatement(expression) => {
            StatementKind::ExpressionAsStatement(Box::new(resolve_expression(*expression, res)?))
        }
        StatementKind::If {
            condition,
            if_code,
            else_code,
        } => {
            let condition = resolve_expression(*condition, res)?;
            let if_code = resolve_block(if_code, res)?;
            let else_code = resolve_block(else_code, res)?;
            // Folding may only now have exposed a constant condition.
            if let ExpressionKind::BooleanConstant(value) = condition.kind {
                StatementKind::StatementBatch(if value { if_code } else { else_code })
            } else {
                StatementKind::If {
                    condition: Box::new(condition),
                    if_code,
                    else_code,
                }
            }
        }
        StatementKind::Return(value) => StatementKind::Return(match value {
            Some(expression) => Some(Box::new(resolve_expression(*expression, res)?)),
            None => None,
        }),
        StatementKind::Switch { condition, chunks } => {
            return resolve_switch(first_token, *condition, chunks, res)
        }
        StatementKind::VariableDeclaration {
            declared_type,
            name_token,
            value,
        } => StatementKind::VariableDeclaration {
            declared_type,
            name_token,
            value: match value {
                Some(expression) => Some(Box::new(resolve_expression(*expression, res)?)),
                None => None,
            },
        },
        StatementKind::While { condition, code } => StatementKind::While {
            condition: Box::new(resolve_expression(*condition, res)?),
            code: resolve_block(code, res)?,
        },
        StatementKind::StatementBatch(_) => {
            return Err(PositionalError::invariant(
                &first_token,
                "Statement batches must be flattened before this pass.",
            ))
        }
    };
    Ok(Statement::new(first_token, kind))
}

fn resolve_switch(
    first_token: Token,
    condition: Expression,
    chunks: Vec<SwitchChunk>,
    res: &Resolver,
) -> ParseResult<Statement> {
    let condition = resolve_expression(condition, res)?;
    let chunk_count = chunks.len();
    let mut seen_values: FxHashSet<i64> = FxHashSet::default();
    let mut resolved_chunks = Vec::with_capacity(chunk_count);
    for (chunk_index, chunk) in chunks.into_iter().enumerate() {
        let SwitchChunk {
            case_tokens,
            cases,
            code,
        } = chunk;
        let mut resolved_cases = Vec::with_capacity(cases.len());
        for (case_token, case) in case_tokens.iter().zip(cases.into_iter()) {
            resolved_cases.push(match case {
                Some(expression) => {
                    let expression = resolve_expression(expression, res)?;
                    if !expression.is_inline_constant() {
                        return Err(PositionalError::type_error(
                            &expression.first_token,
                            "Switch cases must be constant expressions.",
                        ));
                    }
                    let value = expression.constant_case_value().ok_or_else(|| {
                        PositionalError::invariant(
                            &expression.first_token,
                            "Switch cases must fold to int or char constants.",
                        )
                    })?;
                    if !seen_values.insert(value) {
                        return Err(PositionalError::structural(
                            &expression.first_token,
                            "This case appears multiple times.",
                        ));
                    }
                    Some(expression)
                }
                None => {
                    if chunk_index + 1 != chunk_count {
                        return Err(PositionalError::structural(
                            case_token,
                            "default cannot appear before other cases.",
                        ));
                    }
                    None
                }
            });
        }
        resolved_chunks.push(SwitchChunk {
            case_tokens,
            cases: resolved_cases,
            code: resolve_block(code, res)?,
        });
    }
    Ok(Statement::new(
        first_token,
        StatementKind::Switch {
            condition: Box::new(condition),
            chunks: resolved_chunks,
        },
    ))
}

pub(crate) fn resolve_expression(
    expression: Expression,
    res: &Resolver,
) -> ParseResult<Expression> {
    let Expression {
        first_token,
        kind,
        resolved_type,
    } = expression;
    let rebuilt = |kind| Expression {
        first_token: first_token.clone(),
        kind,
        resolved_type: resolved_type.clone(),
    };
    let resolved = match kind {
        ExpressionKind::IntegerConstant(_)
        | ExpressionKind::FloatConstant(_)
        | ExpressionKind::BooleanConstant(_)
        | ExpressionKind::CharConstant(_)
        | ExpressionKind::StringConstant(_)
        | ExpressionKind::NullConstant
        | ExpressionKind::Variable(_)
        | ExpressionKind::This
        | ExpressionKind::FunctionReference(_) => rebuilt(kind),
        ExpressionKind::OpPair { left, op, right } => {
            let left = resolve_expression(*left, res)?;
            let right = resolve_expression(*right, res)?;
            match fold_binary(&left, &op, &right)? {
                Some(folded_kind) => rebuilt(folded_kind),
                None => rebuilt(ExpressionKind::OpPair {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                }),
            }
        }
        ExpressionKind::UnaryOp { op, operand } => {
            let operand = resolve_expression(*operand, res)?;
            match (op, &operand.kind) {
                (UnaryOpKind::Not, ExpressionKind::BooleanConstant(value)) => {
                    rebuilt(ExpressionKind::BooleanConstant(!value))
                }
                (UnaryOpKind::Negative, ExpressionKind::IntegerConstant(value)) => {
                    rebuilt(ExpressionKind::IntegerConstant(-value))
                }
                (UnaryOpKind::Negative, ExpressionKind::FloatConstant(value)) => {
                    rebuilt(ExpressionKind::FloatConstant(-value))
                }
                _ => rebuilt(ExpressionKind::UnaryOp {
                    op,
                    operand: Box::new(operand),
                }),
            }
        }
        ExpressionKind::FunctionInvocation {
            root,
            open_paren,
            args,
        } => {
            match root.kind {
                ExpressionKind::FunctionReference(_) | ExpressionKind::DotField { .. } => {}
                _ => {
                    return Err(PositionalError::type_error(
                        &open_paren,
                        "Cannot invoke this expression like a function.",
                    ))
                }
            }
            let mut resolved_args = Vec::with_capacity(args.len());
            for arg in args {
                resolved_args.push(resolve_expression(arg, res)?);
            }
            rebuilt(ExpressionKind::FunctionInvocation {
                root,
                open_paren,
                args: resolved_args,
            })
        }
        ExpressionKind::CoreFunctionInvocation { function, args } => {
            let mut resolved_args = Vec::with_capacity(args.len());
            for arg in args {
                resolved_args.push(resolve_expression(arg, res)?);
            }
            rebuilt(ExpressionKind::CoreFunctionInvocation {
                function,
                args: resolved_args,
            })
        }
        ExpressionKind::ConstructorInvocation {
            type_to_construct,
            args,
            ..
        } => {
            let mut resolved_args = Vec::with_capacity(args.len());
            for arg in args {
                resolved_args.push(resolve_expression(arg, res)?);
            }
            let struct_name =
                check_construction(&first_token, &type_to_construct, &resolved_args, res)?;
            rebuilt(ExpressionKind::ConstructorInvocation {
                type_to_construct: type_to_construct.clone(),
                args: resolved_args,
                struct_name,
            })
        }
        ExpressionKind::DotField { root, field_name } => rebuilt(ExpressionKind::DotField {
            root: Box::new(resolve_expression(*root, res)?),
            field_name,
        }),
        ExpressionKind::StructFieldAccess {
            root,
            struct_name,
            field_name,
            field_index,
        } => rebuilt(ExpressionKind::StructFieldAccess {
            root: Box::new(resolve_expression(*root, res)?),
            struct_name,
            field_name,
            field_index,
        }),
        ExpressionKind::Cast {
            target_type,
            expression,
        } => rebuilt(ExpressionKind::Cast {
            target_type,
            expression: Box::new(resolve_expression(*expression, res)?),
        }),
        ExpressionKind::ForcedParenthesis(inner) => rebuilt(ExpressionKind::ForcedParenthesis(
            Box::new(resolve_expression(*inner, res)?),
        )),
        ExpressionKind::InlineIncrement {
            operand,
            is_prefix,
            is_addition,
        } => rebuilt(ExpressionKind::InlineIncrement {
            operand: Box::new(resolve_expression(*operand, res)?),
            is_prefix,
            is_addition,
        }),
        ExpressionKind::StringConcatenation(parts) => {
            let mut resolved_parts = Vec::with_capacity(parts.len());
            for part in parts {
                resolved_parts.push(resolve_expression(part, res)?);
            }
            rebuilt(ExpressionKind::StringConcatenation(resolved_parts))
        }
        ExpressionKind::OpChain { .. }
        | ExpressionKind::CoreFunctionReference(_)
        | ExpressionKind::ConstructorReference(_)
        | ExpressionKind::EnumReference(_)
        | ExpressionKind::BracketIndex { .. } => {
            return Err(PositionalError::invariant(
                &first_token,
                "This node must not survive type resolution.",
            ))
        }
    };
    Ok(resolved)
}

/// Verify constructor arguments now that flattened struct layouts exist.
/// Returns the struct name to record on the node, if the target is a
/// struct.
fn check_construction(
    first_token: &Token,
    constructed: &TypeDescriptor,
    args: &[Expression],
    res: &Resolver,
) -> ParseResult<Option<String>> {
    match constructed.category {
        TypeCategory::List | TypeCategory::Dictionary => {
            if !args.is_empty() {
                return Err(PositionalError::type_error(
                    first_token,
                    format!("A '{}' constructor takes no arguments.", constructed.root),
                ));
            }
            Ok(None)
        }
        TypeCategory::Primitive => {
            // Only StringBuilder reaches here; pass 2 rejected the rest.
            if !args.is_empty() {
                return Err(PositionalError::type_error(
                    first_token,
                    "A StringBuilder constructor takes no arguments.",
                ));
            }
            Ok(None)
        }
        TypeCategory::Array => {
            let length_is_int = args.len() == 1
                && args[0]
                    .require_type()?
                    .is_identical(&TypeDescriptor::int());
            if !length_is_int {
                return Err(PositionalError::type_error(
                    first_token,
                    "An Array constructor takes a single integer length.",
                ));
            }
            Ok(None)
        }
        TypeCategory::Named => {
            if let Some(struct_def) = res.structs.get(&constructed.root) {
                let expected = struct_def.flat_field_count();
                if args.len() != expected {
                    return Err(PositionalError::type_error(
                        first_token,
                        format!(
                            "Incorrect number of constructor arguments. Expected {} but found {}.",
                            expected,
                            args.len()
                        ),
                    ));
                }
                for (index, arg) in args.iter().enumerate() {
                    let field_type = struct_def
                        .flat_field_type(index)
                        .expect("arity was checked against the flattened count");
                    let actual = arg.require_type()?;
                    if !TypeDescriptor::check_assignment(field_type, actual) {
                        let field_name = &struct_def.flat_field_names.as_ref().unwrap()[index];
                        return Err(PositionalError::type_error(
                            &arg.first_token,
                            format!(
                                "Cannot use a '{}' for the field '{}'. Expected '{}'.",
                                actual, field_name.value, field_type
                            ),
                        ));
                    }
                }
                return Ok(Some(constructed.root.clone()));
            }
            if let Some(class_def) = res.classes.get(&constructed.root) {
                let constructor = class_def.constructor.as_ref().ok_or_else(|| {
                    PositionalError::structural(
                        first_token,
                        format!("The class '{}' has no constructor.", class_def.name()),
                    )
                })?;
                if args.len() != constructor.arg_types.len() {
                    return Err(PositionalError::type_error(
                        first_token,
                        format!(
                            "Incorrect number of constructor arguments. Expected {} but found {}.",
                            constructor.arg_types.len(),
                            args.len()
                        ),
                    ));
                }
                for (declared, arg) in constructor.arg_types.iter().zip(args.iter()) {
                    let actual = arg.require_type()?;
                    if !TypeDescriptor::check_assignment(declared, actual) {
                        return Err(PositionalError::type_error(
                            &arg.first_token,
                            format!(
                                "Incorrect argument type. Expected '{}' but found '{}'.",
                                declared, actual
                            ),
                        ));
                    }
                }
                return Ok(None);
            }
            Err(PositionalError::type_error(
                first_token,
                format!("Cannot instantiate the type '{}'.", constructed),
            ))
        }
        _ => Err(PositionalError::type_error(
            first_token,
            format!("Cannot instantiate the type '{}'.", constructed),
        )),
    }
}

/// Fold a binary operation over two constants, or return `None` to keep
/// the pair. The folded node reuses the pair's already-resolved type.
fn fold_binary(
    left: &Expression,
    op: &Token,
    right: &Expression,
) -> ParseResult<Option<ExpressionKind>> {
    use ExpressionKind::*;
    let folded = match (&left.kind, op.value.as_str(), &right.kind) {
        (IntegerConstant(a), _, IntegerConstant(b)) => {
            match super::constants::fold_int_op(*a, op, *b)? {
                Some(value) => IntegerConstant(value),
                // Comparisons and the like are left for the backend.
                None => return Ok(None),
            }
        }
        (FloatConstant(a), "+", FloatConstant(b)) => FloatConstant(a + b),
        (FloatConstant(a), "-", FloatConstant(b)) => FloatConstant(a - b),
        (FloatConstant(a), "*", FloatConstant(b)) => FloatConstant(a * b),
        (FloatConstant(a), "/", FloatConstant(b)) => FloatConstant(a / b),
        (BooleanConstant(a), "&&", BooleanConstant(b)) => BooleanConstant(*a && *b),
        (BooleanConstant(a), "||", BooleanConstant(b)) => BooleanConstant(*a || *b),
        _ => return Ok(None),
    };
    Ok(Some(folded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res() -> Resolver {
        Resolver::default()
    }

    fn typed_int(value: i64) -> Expression {
        Expression::with_type(
            Token::synthetic(&value.to_string()),
            ExpressionKind::IntegerConstant(value),
            TypeDescriptor::int(),
        )
    }

    fn typed_pair(left: Expression, op: &str, right: Expression) -> Expression {
        Expression::with_type(
            left.first_token.clone(),
            ExpressionKind::OpPair {
                left: Box::new(left),
                op: Token::synthetic(op),
                right: Box::new(right),
            },
            TypeDescriptor::int(),
        )
    }

    #[test]
    fn nested_arithmetic_folds_completely() {
        let expr = typed_pair(typed_pair(typed_int(2), "*", typed_int(3)), "+", typed_int(4));
        let folded = resolve_expression(expr, &res()).unwrap();
        assert!(matches!(folded.kind, ExpressionKind::IntegerConstant(10)));
        assert!(folded
            .require_type()
            .unwrap()
            .is_identical(&TypeDescriptor::int()));
    }

    #[test]
    fn constant_division_by_zero_is_an_error() {
        let expr = typed_pair(typed_int(1), "/", typed_int(0));
        let err = resolve_expression(expr, &res()).unwrap_err();
        assert!(err.message.contains("Division by zero"));
    }

    #[test]
    fn constant_overflow_is_an_error_not_a_panic() {
        let expr = typed_pair(typed_int(i64::MAX), "+", typed_int(1));
        let err = resolve_expression(expr, &res()).unwrap_err();
        assert!(err.message.contains("overflows"));

        let expr = typed_pair(typed_int(i64::MIN), "/", typed_int(-1));
        let err = resolve_expression(expr, &res()).unwrap_err();
        assert!(err.message.contains("overflows"));
    }

    #[test]
    fn out_of_range_shift_amounts_are_rejected() {
        let expr = typed_pair(typed_int(1), "<<", typed_int(64));
        let err = resolve_expression(expr, &res()).unwrap_err();
        assert!(err.message.contains("between 0 and 63"));

        let expr = typed_pair(typed_int(1), ">>", typed_int(-1));
        let err = resolve_expression(expr, &res()).unwrap_err();
        assert!(err.message.contains("between 0 and 63"));
    }

    #[test]
    fn duplicate_switch_cases_are_rejected_across_chunks() {
        let resolver = res();
        let chunk_a = SwitchChunk::new(
            vec![Token::synthetic("case")],
            vec![Some(typed_int(1))],
            Vec::new(),
        )
        .unwrap();
        let chunk_b = SwitchChunk::new(
            vec![Token::synthetic("case")],
            vec![Some(typed_int(1))],
            Vec::new(),
        )
        .unwrap();
        let err = resolve_switch(
            Token::synthetic("switch"),
            typed_int(0),
            vec![chunk_a, chunk_b],
            &resolver,
        )
        .unwrap_err();
        assert!(err.message.contains("appears multiple times"));
    }

    #[test]
    fn char_cases_collide_with_their_code_points() {
        let resolver = res();
        let char_case = Expression::with_type(
            Token::synthetic("'a'"),
            ExpressionKind::CharConstant('a'),
            TypeDescriptor::char_type(),
        );
        let chunk_a = SwitchChunk::new(
            vec![Token::synthetic("case")],
            vec![Some(char_case)],
            Vec::new(),
        )
        .unwrap();
        let chunk_b = SwitchChunk::new(
            vec![Token::synthetic("case")],
            vec![Some(typed_int(97))],
            Vec::new(),
        )
        .unwrap();
        let err = resolve_switch(
            Token::synthetic("switch"),
            typed_int(0),
            vec![chunk_a, chunk_b],
            &resolver,
        )
        .unwrap_err();
        assert!(err.message.contains("appears multiple times"));
    }

    #[test]
    fn default_must_be_in_the_final_chunk() {
        let resolver = res();
        let default_chunk = SwitchChunk::new(
            vec![Token::synthetic("default")],
            vec![None],
            Vec::new(),
        )
        .unwrap();
        let case_chunk = SwitchChunk::new(
            vec![Token::synthetic("case")],
            vec![Some(typed_int(1))],
            Vec::new(),
        )
        .unwrap();
        let err = resolve_switch(
            Token::synthetic("switch"),
            typed_int(0),
            vec![default_chunk, case_chunk],
            &resolver,
        )
        .unwrap_err();
        assert!(err.message.contains("default cannot appear"));
    }

    #[test]
    fn non_constant_cases_are_rejected() {
        let resolver = res();
        let variable_case = Expression::with_type(
            Token::synthetic("x"),
            ExpressionKind::Variable("x".to_string()),
            TypeDescriptor::int(),
        );
        let chunk = SwitchChunk::new(
            vec![Token::synthetic("case")],
            vec![Some(variable_case)],
            Vec::new(),
        )
        .unwrap();
        let err = resolve_switch(
            Token::synthetic("switch"),
            typed_int(0),
            vec![chunk],
            &resolver,
        )
        .unwrap_err();
        assert!(err.message.contains("must be constant"));
    }

    #[test]
    fn folded_conditions_replace_the_if() {
        let resolver = res();
        let condition = Expression::with_type(
            Token::synthetic("a"),
            ExpressionKind::OpPair {
                left: Box::new(Expression::with_type(
                    Token::synthetic("true"),
                    ExpressionKind::BooleanConstant(true),
                    TypeDescriptor::bool_type(),
                )),
                op: Token::synthetic("&&"),
                right: Box::new(Expression::with_type(
                    Token::synthetic("false"),
                    ExpressionKind::BooleanConstant(false),
                    TypeDescriptor::bool_type(),
                )),
            },
            TypeDescriptor::bool_type(),
        );
        let conditional = Statement::new(
            Token::synthetic("if"),
            StatementKind::If {
                condition: Box::new(condition),
                if_code: vec![Statement::new(Token::synthetic("break"), StatementKind::Break)],
                else_code: Vec::new(),
            },
        );
        let block = resolve_block(vec![conditional], &resolver).unwrap();
        assert!(block.is_empty());
    }
}
