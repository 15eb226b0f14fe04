//! Pass 2: type resolution.
//!
//! Every expression node gets its resolved type assigned here, through a
//! fresh scope chain rooted at the enclosing function or constructor.
//! Several rewrites happen along the way: bracket indexing desugars into
//! the matching container builtin, `+` over strings collapses into a flat
//! concatenation node, and `Core.*` invocations are checked against their
//! templated signatures. Struct constructor arguments are deliberately
//! not checked yet; that is pass 3's job.

use super::scope::VariableScope;
use super::Resolver;
use crate::core_fns;
use parser::ast::{CoreFunction, FunctionDefinition, SwitchChunk, UnaryOpKind};
use parser::error::{ParseResult, PositionalError};
use parser::token::Token;
use parser::types::{TypeCategory, TypeDescriptor};
use parser::{Expression, ExpressionKind, Statement, StatementKind};

/// Resolve one body against a scope seeded with the argument bindings.
pub(crate) fn resolve_body(
    body: Vec<Statement>,
    scope: &mut VariableScope,
    res: &Resolver,
) -> ParseResult<Vec<Statement>> {
    resolve_block(body, scope, res)
}

fn resolve_block(
    statements: Vec<Statement>,
    scope: &mut VariableScope,
    res: &Resolver,
) -> ParseResult<Vec<Statement>> {
    let mut output = Vec::with_capacity(statements.len());
    for statement in statements {
        output.push(resolve_statement(statement, scope, res)?);
    }
    Ok(output)
}

fn resolve_statement(
    statement: Statement,
    scope: &mut VariableScope,
    res: &Resolver,
) -> ParseResult<Statement> {
    let Statement { first_token, kind } = statement;
    let kind = match kind {
        StatementKind::Assignment {
            target,
            op_token,
            value,
        } => return resolve_assignment(first_token, *target, op_token, *value, scope, res),
        StatementKind::Break => StatementKind::Break,
        StatementKind::ExpressionAsStatement(expression) => StatementKind::ExpressionAsStatement(
            Box::new(resolve_expression(*expression, scope, res)?),
        ),
        StatementKind::If {
            condition,
            if_code,
            else_code,
        } => {
            let condition = resolve_expression(*condition, scope, res)?;
            require_boolean(&condition, "An if condition must be a boolean.")?;
            let if_code = {
                let mut child = scope.nested();
                resolve_block(if_code, &mut child, res)?
            };
            let else_code = {
                let mut child = scope.nested();
                resolve_block(else_code, &mut child, res)?
            };
            StatementKind::If {
                condition: Box::new(condition),
                if_code,
                else_code,
            }
        }
        StatementKind::Return(value) => {
            let root = scope.root();
            match value {
                None => {
                    if !root.is_constructor
                        && root.return_type.category != TypeCategory::Void
                    {
                        return Err(PositionalError::type_error(
                            &first_token,
                            format!(
                                "The function '{}' must return a value.",
                                root.entity_name
                            ),
                        ));
                    }
                    StatementKind::Return(None)
                }
                Some(expression) => {
                    if root.is_constructor {
                        return Err(PositionalError::type_error(
                            &first_token,
                            "Cannot return a value from a constructor.",
                        ));
                    }
                    let expected = root.return_type.clone();
                    let expression = resolve_expression(*expression, scope, res)?;
                    let actual = expression.require_type()?;
                    if !TypeDescriptor::check_return_type(&expected, actual) {
                        return Err(PositionalError::type_error(
                            &expression.first_token,
                            format!(
                                "Cannot return a '{}' from a function that returns '{}'.",
                                actual, expected
                            ),
                        ));
                    }
                    StatementKind::Return(Some(Box::new(expression)))
                }
            }
        }
        StatementKind::Switch { condition, chunks } => {
            let condition = resolve_expression(*condition, scope, res)?;
            let condition_type = condition.require_type()?.clone();
            if !matches!(condition_type.root.as_str(), "int" | "char") {
                return Err(PositionalError::type_error(
                    &condition.first_token,
                    "Switch conditions must be ints or chars.",
                ));
            }
            // The whole switch shares one scope on purpose; cases are not
            // independent lexical blocks.
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
                        Some(expression) => {
                            let expression = resolve_expression(expression, scope, res)?;
                            let case_type = expression.require_type()?;
                            if !case_type.is_identical(&condition_type) {
                                return Err(PositionalError::type_error(
                                    &expression.first_token,
                                    "Switch case type does not match the condition.",
                                ));
                            }
                            Some(expression)
                        }
                        None => None,
                    });
                }
                resolved_chunks.push(SwitchChunk {
                    case_tokens,
                    cases: resolved_cases,
                    code: resolve_block(code, scope, res)?,
                });
            }
            StatementKind::Switch {
                condition: Box::new(condition),
                chunks: resolved_chunks,
            }
        }
        StatementKind::VariableDeclaration {
            mut declared_type,
            name_token,
            value,
        } => {
            declared_type.finalize(res)?;
            let value = match value {
                Some(expression) => {
                    let expression = resolve_expression(*expression, scope, res)?;
                    let actual = expression.require_type()?;
                    if !TypeDescriptor::check_assignment(&declared_type, actual) {
                        return Err(PositionalError::type_error(
                            &expression.first_token,
                            format!("Cannot assign a '{}' to a '{}'.", actual, declared_type),
                        ));
                    }
                    Some(Box::new(expression))
                }
                None => {
                    return Err(PositionalError::invariant(
                        &name_token,
                        "Declarations without values must be rejected before type resolution.",
                    ))
                }
            };
            scope.declare(&name_token, declared_type.clone())?;
            StatementKind::VariableDeclaration {
                declared_type,
                name_token,
                value,
            }
        }
        StatementKind::While { condition, code } => {
            let condition = resolve_expression(*condition, scope, res)?;
            require_boolean(&condition, "A while condition must be a boolean.")?;
            let code = {
                let mut child = scope.nested();
                resolve_block(code, &mut child, res)?
            };
            StatementKind::While {
                condition: Box::new(condition),
                code,
            }
        }
        StatementKind::StatementBatch(_) => {
            return Err(PositionalError::invariant(
                &first_token,
                "Statement batches must be flattened before type resolution.",
            ))
        }
    };
    Ok(Statement::new(first_token, kind))
}

/// Assignments get their own path: indexed targets desugar into the
/// container's Set builtin, everything else is checked for assignability.
fn resolve_assignment(
    first_token: Token,
    target: Expression,
    op_token: Token,
    value: Expression,
    scope: &mut VariableScope,
    res: &Resolver,
) -> ParseResult<Statement> {
    if let ExpressionKind::BracketIndex {
        root,
        bracket_token,
        index,
    } = target.kind
    {
        if op_token.value != "=" {
            return Err(PositionalError::type_error(
                &op_token,
                "Only plain assignment is supported for indexed targets.",
            ));
        }
        let root = resolve_expression(*root, scope, res)?;
        let index = resolve_expression(*index, scope, res)?;
        let value = resolve_expression(value, scope, res)?;
        let root_type = root.require_type()?.clone();
        let value_type = value.require_type()?;
        let (function, item_type) = match root_type.category {
            TypeCategory::List => (CoreFunction::ListSet, root_type.generics[0].clone()),
            TypeCategory::Array => (CoreFunction::ArraySet, root_type.generics[0].clone()),
            TypeCategory::Dictionary => {
                let key_type = index.require_type()?;
                if !TypeDescriptor::check_assignment(&root_type.generics[0], key_type) {
                    return Err(PositionalError::type_error(
                        &index.first_token,
                        format!(
                            "Incorrect key type. Expected '{}' but found '{}'.",
                            root_type.generics[0], key_type
                        ),
                    ));
                }
                (CoreFunction::DictionarySet, root_type.generics[1].clone())
            }
            _ => {
                return Err(PositionalError::type_error(
                    &bracket_token,
                    format!("Cannot assign into an index of type '{}'.", root_type),
                ))
            }
        };
        if function != CoreFunction::DictionarySet {
            let index_type = index.require_type()?;
            if !index_type.is_identical(&TypeDescriptor::int()) {
                return Err(PositionalError::type_error(
                    &index.first_token,
                    "Container indexes must be integers.",
                ));
            }
        }
        if !TypeDescriptor::check_assignment(&item_type, value_type) {
            return Err(PositionalError::type_error(
                &value.first_token,
                format!("Cannot assign a '{}' to a '{}'.", value_type, item_type),
            ));
        }
        let invocation = Expression::with_type(
            first_token.clone(),
            ExpressionKind::CoreFunctionInvocation {
                function,
                args: vec![root, index, value],
            },
            TypeDescriptor::void(),
        );
        return Ok(Statement::new(
            first_token,
            StatementKind::ExpressionAsStatement(Box::new(invocation)),
        ));
    }

    let target = resolve_expression(target, scope, res)?;
    if !is_assignable_target(&target) {
        return Err(PositionalError::structural(
            &target.first_token,
            "Cannot assign to this expression.",
        ));
    }
    let value = resolve_expression(value, scope, res)?;
    let target_type = target.require_type()?.clone();
    let value_type = value.require_type()?;
    if op_token.value == "=" {
        if !TypeDescriptor::check_assignment(&target_type, value_type) {
            return Err(PositionalError::type_error(
                &value.first_token,
                format!("Cannot assign a '{}' to a '{}'.", value_type, target_type),
            ));
        }
    } else {
        let base_op = op_token.value.trim_end_matches('=');
        let base_token = Token::new(base_op, op_token.span);
        let combined = binary_result_type(&target_type, &base_token, value_type)?;
        if !TypeDescriptor::check_assignment(&target_type, &combined) {
            return Err(PositionalError::type_error(
                &op_token,
                format!(
                    "The '{}' operation produces a '{}', which cannot be assigned back to a '{}'.",
                    op_token.value, combined, target_type
                ),
            ));
        }
    }
    Ok(Statement::new(
        first_token,
        StatementKind::Assignment {
            target: Box::new(target),
            op_token,
            value: Box::new(value),
        },
    ))
}

fn is_assignable_target(target: &Expression) -> bool {
    matches!(
        target.kind,
        ExpressionKind::Variable(_)
            | ExpressionKind::StructFieldAccess { .. }
            | ExpressionKind::DotField { .. }
    )
}

fn require_boolean(expression: &Expression, message: &str) -> ParseResult<()> {
    let actual = expression.require_type()?;
    if actual.root != "bool" {
        return Err(PositionalError::type_error(
            &expression.first_token,
            message,
        ));
    }
    Ok(())
}

pub(crate) fn resolve_expression(
    expression: Expression,
    scope: &VariableScope,
    res: &Resolver,
) -> ParseResult<Expression> {
    let Expression {
        first_token, kind, ..
    } = expression;
    let resolved = match kind {
        ExpressionKind::IntegerConstant(v) => Expression::with_type(
            first_token,
            ExpressionKind::IntegerConstant(v),
            TypeDescriptor::int(),
        ),
        ExpressionKind::FloatConstant(v) => Expression::with_type(
            first_token,
            ExpressionKind::FloatConstant(v),
            TypeDescriptor::double(),
        ),
        ExpressionKind::BooleanConstant(v) => Expression::with_type(
            first_token,
            ExpressionKind::BooleanConstant(v),
            TypeDescriptor::bool_type(),
        ),
        ExpressionKind::CharConstant(v) => Expression::with_type(
            first_token,
            ExpressionKind::CharConstant(v),
            TypeDescriptor::char_type(),
        ),
        ExpressionKind::StringConstant(v) => Expression::with_type(
            first_token,
            ExpressionKind::StringConstant(v),
            TypeDescriptor::string(),
        ),
        ExpressionKind::NullConstant => Expression::with_type(
            first_token,
            ExpressionKind::NullConstant,
            TypeDescriptor::null(),
        ),
        ExpressionKind::Variable(name) => {
            let var_type = scope
                .lookup(&name)
                .cloned()
                .or_else(|| res.globals.get(&name).map(|g| g.declared_type.clone()))
                .ok_or_else(|| {
                    PositionalError::structural(
                        &first_token,
                        format!("The variable '{}' is not defined.", name),
                    )
                })?;
            Expression::with_type(first_token, ExpressionKind::Variable(name), var_type)
        }
        ExpressionKind::OpPair { left, op, right } => {
            let left = resolve_expression(*left, scope, res)?;
            let right = resolve_expression(*right, scope, res)?;
            let left_type = left.require_type()?.clone();
            let right_type = right.require_type()?.clone();
            let is_string_concat = op.value == "+"
                && (left_type.root == "string" || right_type.root == "string");
            if is_string_concat {
                for side in [&left, &right] {
                    if side.require_type()?.category == TypeCategory::Void {
                        return Err(PositionalError::type_error(
                            &side.first_token,
                            "Cannot concatenate a void expression into a string.",
                        ));
                    }
                }
                let mut parts = Vec::new();
                for side in [left, right] {
                    match side.kind {
                        ExpressionKind::StringConcatenation(nested) => parts.extend(nested),
                        _ => parts.push(side),
                    }
                }
                Expression::with_type(
                    first_token,
                    ExpressionKind::StringConcatenation(parts),
                    TypeDescriptor::string(),
                )
            } else {
                let result_type = binary_result_type(&left_type, &op, &right_type)?;
                Expression::with_type(
                    first_token,
                    ExpressionKind::OpPair {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                    result_type,
                )
            }
        }
        ExpressionKind::UnaryOp { op, operand } => {
            let operand = resolve_expression(*operand, scope, res)?;
            let operand_type = operand.require_type()?;
            let result_type = match op {
                UnaryOpKind::Not => {
                    if operand_type.root != "bool" {
                        return Err(PositionalError::type_error(
                            &operand.first_token,
                            "The '!' operator requires a boolean.",
                        ));
                    }
                    TypeDescriptor::bool_type()
                }
                UnaryOpKind::Negative => match operand_type.root.as_str() {
                    "int" => TypeDescriptor::int(),
                    "double" => TypeDescriptor::double(),
                    _ => {
                        return Err(PositionalError::type_error(
                            &operand.first_token,
                            "The '-' operator requires a number.",
                        ))
                    }
                },
            };
            Expression::with_type(
                first_token,
                ExpressionKind::UnaryOp {
                    op,
                    operand: Box::new(operand),
                },
                result_type,
            )
        }
        ExpressionKind::FunctionInvocation {
            root,
            open_paren,
            args,
        } => {
            let root = resolve_expression(*root, scope, res)?;
            let mut resolved_args = Vec::with_capacity(args.len());
            for arg in args {
                resolved_args.push(resolve_expression(arg, scope, res)?);
            }
            return resolve_invocation(first_token, root, open_paren, resolved_args, res);
        }
        ExpressionKind::FunctionReference(name) => {
            let definition = res.functions.get(&name).ok_or_else(|| {
                PositionalError::invariant(
                    &first_token,
                    format!("Reference to unknown function '{}'.", name),
                )
            })?;
            let reference_type = function_reference_type(definition);
            Expression::with_type(
                first_token,
                ExpressionKind::FunctionReference(name),
                reference_type,
            )
        }
        ExpressionKind::CoreFunctionReference(_) => {
            return Err(PositionalError::type_error(
                &first_token,
                "Core functions must be invoked directly.",
            ))
        }
        ExpressionKind::CoreFunctionInvocation { function, args } => {
            let mut resolved_args = Vec::with_capacity(args.len());
            for arg in args {
                resolved_args.push(resolve_expression(arg, scope, res)?);
            }
            let result_type = core_fns::resolve_invocation(&first_token, function, &resolved_args)?;
            Expression::with_type(
                first_token,
                ExpressionKind::CoreFunctionInvocation {
                    function,
                    args: resolved_args,
                },
                result_type,
            )
        }
        ExpressionKind::ConstructorReference(_) => {
            return Err(PositionalError::structural(
                &first_token,
                "A constructor must be invoked.",
            ))
        }
        ExpressionKind::ConstructorInvocation {
            mut type_to_construct,
            args,
            struct_name,
        } => {
            type_to_construct.finalize(res)?;
            let mut resolved_args = Vec::with_capacity(args.len());
            for arg in args {
                resolved_args.push(resolve_expression(arg, scope, res)?);
            }
            let resolved_type = type_to_construct.clone();
            Expression::with_type(
                first_token,
                ExpressionKind::ConstructorInvocation {
                    type_to_construct,
                    args: resolved_args,
                    struct_name,
                },
                resolved_type,
            )
        }
        ExpressionKind::DotField { root, field_name } => {
            let root = resolve_expression(*root, scope, res)?;
            let root_type = root.require_type()?.clone();
            return resolve_dot_field(first_token, root, root_type, field_name, res);
        }
        ExpressionKind::StructFieldAccess {
            root,
            struct_name,
            field_name,
            field_index,
        } => {
            let root = resolve_expression(*root, scope, res)?;
            let field_type = res
                .structs
                .get(&struct_name)
                .and_then(|s| s.flat_field_type(field_index))
                .cloned()
                .ok_or_else(|| {
                    PositionalError::invariant(&field_name, "Struct field index out of range.")
                })?;
            Expression::with_type(
                first_token,
                ExpressionKind::StructFieldAccess {
                    root: Box::new(root),
                    struct_name,
                    field_name,
                    field_index,
                },
                field_type,
            )
        }
        ExpressionKind::BracketIndex {
            root,
            bracket_token,
            index,
        } => {
            let root = resolve_expression(*root, scope, res)?;
            let index = resolve_expression(*index, scope, res)?;
            let root_type = root.require_type()?.clone();
            let (function, result_type) = match root_type.category {
                TypeCategory::List => (CoreFunction::ListGet, root_type.generics[0].clone()),
                TypeCategory::Array => (CoreFunction::ArrayGet, root_type.generics[0].clone()),
                TypeCategory::Dictionary => {
                    let key_type = index.require_type()?;
                    if !TypeDescriptor::check_assignment(&root_type.generics[0], key_type) {
                        return Err(PositionalError::type_error(
                            &index.first_token,
                            format!(
                                "Incorrect key type. Expected '{}' but found '{}'.",
                                root_type.generics[0], key_type
                            ),
                        ));
                    }
                    (CoreFunction::DictionaryGet, root_type.generics[1].clone())
                }
                TypeCategory::Primitive if root_type.root == "string" => {
                    (CoreFunction::StringCharAt, TypeDescriptor::char_type())
                }
                _ => {
                    return Err(PositionalError::type_error(
                        &bracket_token,
                        format!("Cannot index into type '{}'.", root_type),
                    ))
                }
            };
            if function != CoreFunction::DictionaryGet {
                let index_type = index.require_type()?;
                if !index_type.is_identical(&TypeDescriptor::int()) {
                    return Err(PositionalError::type_error(
                        &index.first_token,
                        "Container indexes must be integers.",
                    ));
                }
            }
            Expression::with_type(
                first_token,
                ExpressionKind::CoreFunctionInvocation {
                    function,
                    args: vec![root, index],
                },
                result_type,
            )
        }
        ExpressionKind::Cast {
            mut target_type,
            expression,
        } => {
            target_type.finalize(res)?;
            let expression = resolve_expression(*expression, scope, res)?;
            let from = expression.require_type()?;
            let numeric = |t: &TypeDescriptor| matches!(t.root.as_str(), "int" | "double" | "char");
            let allowed = from.is_identical(&target_type)
                || target_type.category == TypeCategory::Object
                || from.category == TypeCategory::Object
                || (numeric(from) && numeric(&target_type));
            if !allowed {
                return Err(PositionalError::type_error(
                    &first_token,
                    format!("Cannot cast a '{}' to a '{}'.", from, target_type),
                ));
            }
            let resolved_type = target_type.clone();
            Expression::with_type(
                first_token,
                ExpressionKind::Cast {
                    target_type,
                    expression: Box::new(expression),
                },
                resolved_type,
            )
        }
        ExpressionKind::This => {
            let class_name = scope.root().class_name.clone().ok_or_else(|| {
                PositionalError::structural(&first_token, "'this' is not valid here.")
            })?;
            let mut this_type =
                TypeDescriptor::new(Some(first_token.clone()), class_name, Vec::new())?;
            this_type.finalize(res)?;
            Expression::with_type(first_token, ExpressionKind::This, this_type)
        }
        ExpressionKind::ForcedParenthesis(inner) => {
            let inner = resolve_expression(*inner, scope, res)?;
            let inner_type = inner.require_type()?.clone();
            Expression::with_type(
                first_token,
                ExpressionKind::ForcedParenthesis(Box::new(inner)),
                inner_type,
            )
        }
        ExpressionKind::InlineIncrement {
            operand,
            is_prefix,
            is_addition,
        } => {
            let operand = resolve_expression(*operand, scope, res)?;
            if !is_assignable_target(&operand) {
                return Err(PositionalError::structural(
                    &operand.first_token,
                    "Cannot increment this expression.",
                ));
            }
            if !operand.require_type()?.is_identical(&TypeDescriptor::int()) {
                return Err(PositionalError::type_error(
                    &operand.first_token,
                    "Only integers can be incremented.",
                ));
            }
            Expression::with_type(
                first_token,
                ExpressionKind::InlineIncrement {
                    operand: Box::new(operand),
                    is_prefix,
                    is_addition,
                },
                TypeDescriptor::int(),
            )
        }
        ExpressionKind::StringConcatenation(parts) => {
            let mut resolved_parts = Vec::with_capacity(parts.len());
            for part in parts {
                resolved_parts.push(resolve_expression(part, scope, res)?);
            }
            Expression::with_type(
                first_token,
                ExpressionKind::StringConcatenation(resolved_parts),
                TypeDescriptor::string(),
            )
        }
        ExpressionKind::OpChain { .. } => {
            return Err(PositionalError::invariant(
                &first_token,
                "Operator chains must be folded before type resolution.",
            ))
        }
        ExpressionKind::EnumReference(_) => {
            return Err(PositionalError::type_error(
                &first_token,
                "An enum cannot be used as a value.",
            ))
        }
    };
    Ok(resolved)
}

/// Convert an invocation into its resolved form based on what the root
/// turned out to be.
fn resolve_invocation(
    first_token: Token,
    root: Expression,
    open_paren: Token,
    args: Vec<Expression>,
    res: &Resolver,
) -> ParseResult<Expression> {
    match root.kind {
        ExpressionKind::FunctionReference(ref name) => {
            let definition = res.functions.get(name).ok_or_else(|| {
                PositionalError::invariant(
                    &open_paren,
                    format!("Reference to unknown function '{}'.", name),
                )
            })?;
            verify_arguments(name, &open_paren, &definition.arg_types, &args)?;
            let return_type = definition.return_type.clone();
            Ok(Expression::with_type(
                first_token,
                ExpressionKind::FunctionInvocation {
                    root: Box::new(root),
                    open_paren,
                    args,
                },
                return_type,
            ))
        }
        ExpressionKind::CoreFunctionReference(function) => {
            let result_type = core_fns::resolve_invocation(&open_paren, function, &args)?;
            Ok(Expression::with_type(
                first_token,
                ExpressionKind::CoreFunctionInvocation { function, args },
                result_type,
            ))
        }
        ExpressionKind::ConstructorReference(mut type_to_construct) => {
            type_to_construct.finalize(res)?;
            match type_to_construct.category {
                TypeCategory::List
                | TypeCategory::Array
                | TypeCategory::Dictionary
                | TypeCategory::Named => {}
                TypeCategory::Primitive if type_to_construct.root == "StringBuilder" => {}
                _ => {
                    return Err(PositionalError::type_error(
                        &first_token,
                        format!("Cannot instantiate the type '{}'.", type_to_construct),
                    ))
                }
            }
            let resolved_type = type_to_construct.clone();
            // Struct and class argument checks wait for pass 3, after
            // every flattened field list is known.
            Ok(Expression::with_type(
                first_token,
                ExpressionKind::ConstructorInvocation {
                    type_to_construct,
                    args,
                    struct_name: None,
                },
                resolved_type,
            ))
        }
        ExpressionKind::DotField {
            root: instance,
            field_name,
        } => {
            // A method call on a class instance.
            let instance_type = instance.require_type()?.clone();
            let class = res.classes.get(&instance_type.root).ok_or_else(|| {
                PositionalError::type_error(
                    &open_paren,
                    "Cannot invoke this expression like a function.",
                )
            })?;
            let method = class.method(&field_name.value).ok_or_else(|| {
                PositionalError::type_error(
                    &field_name,
                    format!(
                        "The class '{}' does not have a method called '{}'.",
                        class.name(),
                        field_name.value
                    ),
                )
            })?;
            verify_arguments(&field_name.value, &open_paren, &method.arg_types, &args)?;
            let return_type = method.return_type.clone();
            let root = Expression::with_type(
                instance.first_token.clone(),
                ExpressionKind::DotField {
                    root: instance,
                    field_name,
                },
                function_reference_type(method),
            );
            Ok(Expression::with_type(
                first_token,
                ExpressionKind::FunctionInvocation {
                    root: Box::new(root),
                    open_paren,
                    args,
                },
                return_type,
            ))
        }
        _ => Err(PositionalError::type_error(
            &open_paren,
            "Cannot invoke this expression like a function.",
        )),
    }
}

fn resolve_dot_field(
    first_token: Token,
    root: Expression,
    root_type: TypeDescriptor,
    field_name: Token,
    res: &Resolver,
) -> ParseResult<Expression> {
    if root_type.category == TypeCategory::Named {
        if let Some(struct_def) = res.structs.get(&root_type.root) {
            let field_index = struct_def.flat_field_index(&field_name.value).ok_or_else(|| {
                PositionalError::type_error(
                    &field_name,
                    format!(
                        "The struct '{}' does not have a field called '{}'.",
                        struct_def.name(),
                        field_name.value
                    ),
                )
            })?;
            let field_type = struct_def
                .flat_field_type(field_index)
                .cloned()
                .expect("index came from the flattened lookup");
            return Ok(Expression::with_type(
                first_token,
                ExpressionKind::StructFieldAccess {
                    root: Box::new(root),
                    struct_name: root_type.root,
                    field_name,
                    field_index,
                },
                field_type,
            ));
        }
        if let Some(class_def) = res.classes.get(&root_type.root) {
            if let Some(field) = class_def.field(&field_name.value) {
                let field_type = field.field_type.clone();
                return Ok(Expression::with_type(
                    first_token,
                    ExpressionKind::DotField {
                        root: Box::new(root),
                        field_name,
                    },
                    field_type,
                ));
            }
            if let Some(method) = class_def.method(&field_name.value) {
                let method_type = function_reference_type(method);
                return Ok(Expression::with_type(
                    first_token,
                    ExpressionKind::DotField {
                        root: Box::new(root),
                        field_name,
                    },
                    method_type,
                ));
            }
            return Err(PositionalError::type_error(
                &field_name,
                format!(
                    "The class '{}' does not have a member called '{}'.",
                    class_def.name(),
                    field_name.value
                ),
            ));
        }
    }
    Err(PositionalError::type_error(
        &field_name,
        format!("Cannot access a field on type '{}'.", root_type),
    ))
}

fn verify_arguments(
    name: &str,
    open_paren: &Token,
    declared: &[TypeDescriptor],
    args: &[Expression],
) -> ParseResult<()> {
    if declared.len() != args.len() {
        return Err(PositionalError::type_error(
            open_paren,
            format!(
                "'{}' expects {} argument(s) but found {}.",
                name,
                declared.len(),
                args.len()
            ),
        ));
    }
    for (declared_type, arg) in declared.iter().zip(args.iter()) {
        let actual = arg.require_type()?;
        if !TypeDescriptor::check_assignment(declared_type, actual) {
            return Err(PositionalError::type_error(
                &arg.first_token,
                format!(
                    "Incorrect argument type. Expected '{}' but found '{}'.",
                    declared_type, actual
                ),
            ));
        }
    }
    Ok(())
}

pub(crate) fn function_reference_type(definition: &FunctionDefinition) -> TypeDescriptor {
    TypeDescriptor::function_of(
        definition.return_type.clone(),
        definition.arg_types.to_vec(),
    )
}

/// The result type of a binary operator application, or an error naming
/// the operator and both operand types.
pub(crate) fn binary_result_type(
    left: &TypeDescriptor,
    op: &Token,
    right: &TypeDescriptor,
) -> ParseResult<TypeDescriptor> {
    let roots = (left.root.as_str(), right.root.as_str());
    if op.value == "+"
        && (left.root == "string" || right.root == "string")
        && left.category != TypeCategory::Void
        && right.category != TypeCategory::Void
    {
        return Ok(TypeDescriptor::string());
    }
    let result = match op.value.as_str() {
        "+" | "-" | "*" | "/" | "%" => match roots {
            ("int", "int") => Some(TypeDescriptor::int()),
            ("int", "double") | ("double", "int") | ("double", "double") => {
                Some(TypeDescriptor::double())
            }
            _ => None,
        },
        "&" | "|" | "^" | "<<" | ">>" => match roots {
            ("int", "int") => Some(TypeDescriptor::int()),
            _ => None,
        },
        "<" | "<=" | ">" | ">=" => match roots {
            ("int" | "double", "int" | "double") => Some(TypeDescriptor::bool_type()),
            _ => None,
        },
        "==" | "!=" => {
            let comparable = left.is_identical(right)
                || matches!(roots, ("int", "char") | ("char", "int"))
                || (left.category == TypeCategory::Null && right.is_nullable())
                || (right.category == TypeCategory::Null && left.is_nullable())
                || left.category == TypeCategory::Object
                || right.category == TypeCategory::Object;
            comparable.then(TypeDescriptor::bool_type)
        }
        "&&" | "||" => match roots {
            ("bool", "bool") => Some(TypeDescriptor::bool_type()),
            _ => None,
        },
        _ => None,
    };
    result.ok_or_else(|| {
        PositionalError::type_error(
            op,
            format!(
                "The '{}' operator is not defined for types '{}' and '{}'.",
                op.value, left, right
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::scope::ScopeRoot;

    fn empty_resolver() -> Resolver {
        Resolver::default()
    }

    fn int_expr(value: i64) -> Expression {
        Expression::integer(Token::synthetic(&value.to_string()), value)
    }

    fn pair(left: Expression, op: &str, right: Expression) -> Expression {
        Expression::new(
            left.first_token.clone(),
            ExpressionKind::OpPair {
                left: Box::new(left),
                op: Token::synthetic(op),
                right: Box::new(right),
            },
        )
    }

    #[test]
    fn mixed_arithmetic_widens_to_double() {
        let res = empty_resolver();
        let root = ScopeRoot::function("f", TypeDescriptor::void());
        let scope = VariableScope::of_root(&root);
        let sum = pair(int_expr(1), "+", Expression::float(Token::synthetic("2.0"), 2.0));
        let resolved = resolve_expression(sum, &scope, &res).unwrap();
        assert!(resolved
            .require_type()
            .unwrap()
            .is_identical(&TypeDescriptor::double()));
    }

    #[test]
    fn string_plus_flattens_into_one_concatenation() {
        let res = empty_resolver();
        let root = ScopeRoot::function("f", TypeDescriptor::void());
        let scope = VariableScope::of_root(&root);
        let a = Expression::string(Token::synthetic("\"a\""), "a");
        let b = Expression::string(Token::synthetic("\"b\""), "b");
        let c = int_expr(3);
        let nested = pair(pair(a, "+", b), "+", c);
        let resolved = resolve_expression(nested, &scope, &res).unwrap();
        match resolved.kind {
            ExpressionKind::StringConcatenation(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected a flat concatenation, got {:?}", other),
        }
    }

    #[test]
    fn list_indexing_desugars_to_list_get() {
        let res = empty_resolver();
        let root = ScopeRoot::function("f", TypeDescriptor::void());
        let mut scope = VariableScope::of_root(&root);
        scope
            .declare(
                &Token::synthetic("items"),
                TypeDescriptor::list_of(TypeDescriptor::string()),
            )
            .unwrap();
        let indexed = Expression::new(
            Token::synthetic("items"),
            ExpressionKind::BracketIndex {
                root: Box::new(Expression::variable(Token::synthetic("items"))),
                bracket_token: Token::synthetic("["),
                index: Box::new(int_expr(0)),
            },
        );
        let resolved = resolve_expression(indexed, &scope, &res).unwrap();
        match &resolved.kind {
            ExpressionKind::CoreFunctionInvocation { function, args } => {
                assert_eq!(*function, CoreFunction::ListGet);
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected a ListGet call, got {:?}", other),
        }
        assert!(resolved
            .require_type()
            .unwrap()
            .is_identical(&TypeDescriptor::string()));
    }

    #[test]
    fn undefined_variables_are_reported() {
        let res = empty_resolver();
        let root = ScopeRoot::function("f", TypeDescriptor::void());
        let scope = VariableScope::of_root(&root);
        let err = resolve_expression(
            Expression::variable(Token::synthetic("ghost")),
            &scope,
            &res,
        )
        .unwrap_err();
        assert!(err.message.contains("'ghost' is not defined"));
    }

    #[test]
    fn bracket_assignment_desugars_to_set() {
        let res = empty_resolver();
        let root = ScopeRoot::function("f", TypeDescriptor::void());
        let mut scope = VariableScope::of_root(&root);
        scope
            .declare(
                &Token::synthetic("items"),
                TypeDescriptor::list_of(TypeDescriptor::int()),
            )
            .unwrap();
        let target = Expression::new(
            Token::synthetic("items"),
            ExpressionKind::BracketIndex {
                root: Box::new(Expression::variable(Token::synthetic("items"))),
                bracket_token: Token::synthetic("["),
                index: Box::new(int_expr(0)),
            },
        );
        let statement = Statement::new(
            Token::synthetic("items"),
            StatementKind::Assignment {
                target: Box::new(target),
                op_token: Token::synthetic("="),
                value: Box::new(int_expr(9)),
            },
        );
        let resolved = resolve_statement(statement, &mut scope, &res).unwrap();
        match resolved.kind {
            StatementKind::ExpressionAsStatement(expression) => match expression.kind {
                ExpressionKind::CoreFunctionInvocation { function, .. } => {
                    assert_eq!(function, CoreFunction::ListSet)
                }
                other => panic!("expected a ListSet call, got {:?}", other),
            },
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn switch_conditions_must_be_int_or_char() {
        let res = empty_resolver();
        let root = ScopeRoot::function("f", TypeDescriptor::void());
        let mut scope = VariableScope::of_root(&root);
        let statement = Statement::new(
            Token::synthetic("switch"),
            StatementKind::Switch {
                condition: Box::new(Expression::string(Token::synthetic("\"x\""), "x")),
                chunks: Vec::new(),
            },
        );
        let err = resolve_statement(statement, &mut scope, &res).unwrap_err();
        assert!(err.message.contains("ints or chars"));
    }

    #[test]
    fn return_types_are_enforced() {
        let res = empty_resolver();
        let root = ScopeRoot::function("f", TypeDescriptor::int());
        let mut scope = VariableScope::of_root(&root);
        let bad = Statement::new(
            Token::synthetic("return"),
            StatementKind::Return(Some(Box::new(Expression::string(
                Token::synthetic("\"x\""),
                "x",
            )))),
        );
        let err = resolve_statement(bad, &mut scope, &res).unwrap_err();
        assert!(err.message.contains("Cannot return a 'string'"));

        let bare = Statement::new(Token::synthetic("return"), StatementKind::Return(None));
        let err = resolve_statement(bare, &mut scope, &res).unwrap_err();
        assert_eq!(err.message, "The function 'f' must return a value.");
    }

    #[test]
    fn constructors_allow_only_bare_returns() {
        let res = empty_resolver();
        let root = ScopeRoot::constructor("Machine");
        let mut scope = VariableScope::of_root(&root);
        let bare = Statement::new(Token::synthetic("return"), StatementKind::Return(None));
        assert!(resolve_statement(bare, &mut scope, &res).is_ok());

        let valued = Statement::new(
            Token::synthetic("return"),
            StatementKind::Return(Some(Box::new(int_expr(1)))),
        );
        let err = resolve_statement(valued, &mut scope, &res).unwrap_err();
        assert!(err.message.contains("constructor"));
    }

    #[test]
    fn equality_covers_null_against_nullable() {
        let op = Token::synthetic("==");
        let result = binary_result_type(&TypeDescriptor::string(), &op, &TypeDescriptor::null());
        assert!(result.unwrap().is_identical(&TypeDescriptor::bool_type()));
        let err = binary_result_type(&TypeDescriptor::int(), &op, &TypeDescriptor::null());
        assert!(err.is_err());
    }
}
