//! Phase 1: constant and enum resolution.
//!
//! Every `const` value and enum member value is folded down to a literal
//! before any body is looked at, so that pass 1 can splice constant values
//! directly into expressions. Definitions may reference each other in any
//! order; cycles are detected with an explicit visiting set and reported
//! at the definition that closes the cycle.

use fxhash::{FxHashMap, FxHashSet};
use indexmap::IndexMap;
use parser::ast::{EnumDefinition, TopLevelVariable};
use parser::error::{ParseResult, PositionalError};
use parser::token::Token;
use parser::{Expression, ExpressionKind};

/// Fold all enum member values and constant values in place.
pub(crate) fn run(
    enums: &mut IndexMap<String, EnumDefinition>,
    constants: &mut IndexMap<String, TopLevelVariable>,
) -> ParseResult<()> {
    let mut evaluator = Evaluator {
        enums,
        constants,
        enum_memo: FxHashMap::default(),
        const_memo: FxHashMap::default(),
        visiting: FxHashSet::default(),
    };

    let enum_names: Vec<String> = evaluator.enums.keys().cloned().collect();
    for name in &enum_names {
        let token = evaluator.enums[name].name_token.clone();
        evaluator.eval_enum(name, &token)?;
    }
    let constant_names: Vec<String> = evaluator.constants.keys().cloned().collect();
    for name in &constant_names {
        let token = evaluator.constants[name].name_token.clone();
        evaluator.eval_constant(name, &token)?;
    }

    let enum_memo = evaluator.enum_memo;
    let const_memo = evaluator.const_memo;
    for (name, values) in enum_memo {
        if let Some(enum_def) = enums.get_mut(&name) {
            enum_def.set_resolved_values(values);
        }
    }
    for (name, value) in const_memo {
        if let Some(constant) = constants.get_mut(&name) {
            check_constant_type(constant, &value)?;
            let token = constant.value.first_token.clone();
            constant.value = value.into_expression(token);
        }
    }
    Ok(())
}

fn check_constant_type(constant: &TopLevelVariable, value: &ConstValue) -> ParseResult<()> {
    let matches_declared = match value {
        ConstValue::Int(_) => constant.declared_type.root == "int",
        ConstValue::Float(_) => constant.declared_type.root == "double",
        ConstValue::Bool(_) => constant.declared_type.root == "bool",
        ConstValue::Char(_) => constant.declared_type.root == "char",
        ConstValue::Str(_) => constant.declared_type.root == "string",
    };
    if !matches_declared {
        return Err(PositionalError::type_error(
            &constant.name_token,
            format!(
                "Cannot assign this value to a constant of type '{}'.",
                constant.declared_type
            ),
        ));
    }
    Ok(())
}

/// A fully folded compile-time value.
#[derive(Debug, Clone)]
enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
}

impl ConstValue {
    fn into_expression(self, token: Token) -> Expression {
        match self {
            ConstValue::Int(v) => Expression::integer(token, v),
            ConstValue::Float(v) => Expression::float(token, v),
            ConstValue::Bool(v) => Expression::boolean(token, v),
            ConstValue::Char(v) => Expression::char_constant(token, v),
            ConstValue::Str(v) => Expression::string(token, v),
        }
    }
}

struct Evaluator<'a> {
    enums: &'a IndexMap<String, EnumDefinition>,
    constants: &'a IndexMap<String, TopLevelVariable>,
    enum_memo: FxHashMap<String, FxHashMap<String, i64>>,
    const_memo: FxHashMap<String, ConstValue>,
    visiting: FxHashSet<String>,
}

impl Evaluator<'_> {
    fn eval_constant(&mut self, name: &str, usage_token: &Token) -> ParseResult<ConstValue> {
        if let Some(memoized) = self.const_memo.get(name) {
            return Ok(memoized.clone());
        }
        let key = format!("const:{}", name);
        if !self.visiting.insert(key.clone()) {
            return Err(PositionalError::structural(
                usage_token,
                format!("The constant '{}' has a cyclical definition.", name),
            ));
        }
        let definition = self.constants.get(name).ok_or_else(|| {
            PositionalError::structural(
                usage_token,
                format!("'{}' is not a constant value.", name),
            )
        })?;
        let value = self.eval_expression(&definition.value.clone())?;
        self.visiting.remove(&key);
        self.const_memo.insert(name.to_string(), value.clone());
        Ok(value)
    }

    fn eval_enum(
        &mut self,
        name: &str,
        usage_token: &Token,
    ) -> ParseResult<FxHashMap<String, i64>> {
        if let Some(memoized) = self.enum_memo.get(name) {
            return Ok(memoized.clone());
        }
        let key = format!("enum:{}", name);
        if !self.visiting.insert(key.clone()) {
            return Err(PositionalError::structural(
                usage_token,
                format!("The enum '{}' has a cyclical definition.", name),
            ));
        }
        let definition = self.enums.get(name).ok_or_else(|| {
            PositionalError::structural(usage_token, format!("'{}' is not an enum.", name))
        })?;
        let member_names = definition.member_names.clone();
        let member_values = definition.member_values.clone();

        let mut values = FxHashMap::default();
        let mut next_auto = 0i64;
        for (member_token, member_value) in member_names.iter().zip(member_values.iter()) {
            let value = match member_value {
                Some(expression) => match self.eval_expression(expression)? {
                    ConstValue::Int(v) => v,
                    _ => {
                        return Err(PositionalError::type_error(
                            member_token,
                            "Enum values must be integers.",
                        ))
                    }
                },
                None => next_auto,
            };
            next_auto = value + 1;
            values.insert(member_token.value.clone(), value);
        }
        self.visiting.remove(&key);
        self.enum_memo.insert(name.to_string(), values.clone());
        Ok(values)
    }

    fn eval_expression(&mut self, expression: &Expression) -> ParseResult<ConstValue> {
        let token = &expression.first_token;
        match &expression.kind {
            ExpressionKind::IntegerConstant(v) => Ok(ConstValue::Int(*v)),
            ExpressionKind::FloatConstant(v) => Ok(ConstValue::Float(*v)),
            ExpressionKind::BooleanConstant(v) => Ok(ConstValue::Bool(*v)),
            ExpressionKind::CharConstant(v) => Ok(ConstValue::Char(*v)),
            ExpressionKind::StringConstant(v) => Ok(ConstValue::Str(v.clone())),
            ExpressionKind::Variable(name) => {
                if self.constants.contains_key(name) {
                    self.eval_constant(name, token)
                } else {
                    Err(PositionalError::structural(
                        token,
                        format!("'{}' is not a constant value.", name),
                    ))
                }
            }
            ExpressionKind::DotField { root, field_name } => {
                let enum_name = match &root.kind {
                    ExpressionKind::Variable(name) if self.enums.contains_key(name) => name.clone(),
                    _ => {
                        return Err(PositionalError::structural(
                            token,
                            "This expression cannot be used in a constant.",
                        ))
                    }
                };
                let values = self.eval_enum(&enum_name, &root.first_token)?;
                values
                    .get(&field_name.value)
                    .copied()
                    .map(ConstValue::Int)
                    .ok_or_else(|| {
                        PositionalError::structural(
                            field_name,
                            format!(
                                "The enum value '{}.{}' does not exist.",
                                enum_name, field_name.value
                            ),
                        )
                    })
            }
            ExpressionKind::UnaryOp { op, operand } => {
                let inner = self.eval_expression(operand)?;
                match (op, inner) {
                    (parser::ast::UnaryOpKind::Negative, ConstValue::Int(v)) => {
                        Ok(ConstValue::Int(-v))
                    }
                    (parser::ast::UnaryOpKind::Negative, ConstValue::Float(v)) => {
                        Ok(ConstValue::Float(-v))
                    }
                    (parser::ast::UnaryOpKind::Not, ConstValue::Bool(v)) => {
                        Ok(ConstValue::Bool(!v))
                    }
                    _ => Err(PositionalError::type_error(
                        token,
                        "This operator cannot be applied to this constant.",
                    )),
                }
            }
            ExpressionKind::OpPair { left, op, right } => {
                let lhs = self.eval_expression(left)?;
                let rhs = self.eval_expression(right)?;
                apply_op(lhs, op, rhs)
            }
            ExpressionKind::OpChain { expressions, ops } => {
                let mut accumulator = self.eval_expression(&expressions[0])?;
                for (op, rhs) in ops.iter().zip(expressions[1..].iter()) {
                    let value = self.eval_expression(rhs)?;
                    accumulator = apply_op(accumulator, op, value)?;
                }
                Ok(accumulator)
            }
            _ => Err(PositionalError::structural(
                token,
                "This expression cannot be used in a constant.",
            )),
        }
    }
}

/// Fold one integer operator with checked arithmetic. `Ok(None)` means
/// the operator does not fold over integers; overflow, invalid shift
/// amounts, and division by zero are positional errors on the operator
/// token. Shared by the constant evaluator and the pass-3 folder.
pub(crate) fn fold_int_op(a: i64, op: &Token, b: i64) -> ParseResult<Option<i64>> {
    let folded = match op.value.as_str() {
        "+" => a.checked_add(b),
        "-" => a.checked_sub(b),
        "*" => a.checked_mul(b),
        "/" => {
            if b == 0 {
                return Err(PositionalError::type_error(
                    op,
                    "Division by zero in constant expression.",
                ));
            }
            a.checked_div(b)
        }
        "&" => return Ok(Some(a & b)),
        "|" => return Ok(Some(a | b)),
        "^" => return Ok(Some(a ^ b)),
        "<<" | ">>" => {
            let shift = u32::try_from(b).ok().filter(|s| *s < 64).ok_or_else(|| {
                PositionalError::type_error(op, "The shift amount must be between 0 and 63.")
            })?;
            let value = if op.value == "<<" { a << shift } else { a >> shift };
            return Ok(Some(value));
        }
        _ => return Ok(None),
    };
    match folded {
        Some(value) => Ok(Some(value)),
        None => Err(PositionalError::type_error(
            op,
            "This constant expression overflows.",
        )),
    }
}

fn apply_op(left: ConstValue, op: &Token, right: ConstValue) -> ParseResult<ConstValue> {
    use ConstValue::*;
    let result = match (&left, op.value.as_str(), &right) {
        (Int(a), _, Int(b)) => match fold_int_op(*a, op, *b)? {
            Some(value) => Int(value),
            None => {
                return Err(PositionalError::type_error(
                    op,
                    format!("The '{}' operator cannot be used here.", op.value),
                ))
            }
        },
        (Float(a), "+", Float(b)) => Float(a + b),
        (Float(a), "-", Float(b)) => Float(a - b),
        (Float(a), "*", Float(b)) => Float(a * b),
        (Float(a), "/", Float(b)) => Float(a / b),
        (Str(a), "+", Str(b)) => Str(format!("{}{}", a, b)),
        (Bool(a), "&&", Bool(b)) => Bool(*a && *b),
        (Bool(a), "||", Bool(b)) => Bool(*a || *b),
        _ => {
            return Err(PositionalError::type_error(
                op,
                format!("The '{}' operator cannot be used here.", op.value),
            ))
        }
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::types::TypeDescriptor;

    fn enum_def(name: &str, members: &[(&str, Option<Expression>)]) -> EnumDefinition {
        EnumDefinition::new(
            Token::synthetic("enum"),
            Token::synthetic(name),
            members.iter().map(|(n, _)| Token::synthetic(*n)).collect(),
            members.iter().map(|(_, v)| v.clone()).collect(),
        )
    }

    fn int_const(name: &str, value: Expression) -> TopLevelVariable {
        TopLevelVariable::constant(TypeDescriptor::int(), Token::synthetic(name), value)
    }

    #[test]
    fn members_auto_assign_after_explicit_values() {
        let mut enums = IndexMap::new();
        enums.insert(
            "Op".to_string(),
            enum_def(
                "Op",
                &[
                    ("ADD", None),
                    ("SUB", None),
                    ("JUMP", Some(Expression::integer(Token::synthetic("10"), 10))),
                    ("CALL", None),
                ],
            ),
        );
        let mut constants = IndexMap::new();
        run(&mut enums, &mut constants).unwrap();
        let op = &enums["Op"];
        assert_eq!(op.resolved_value("ADD"), Some(0));
        assert_eq!(op.resolved_value("SUB"), Some(1));
        assert_eq!(op.resolved_value("JUMP"), Some(10));
        assert_eq!(op.resolved_value("CALL"), Some(11));
    }

    #[test]
    fn constants_may_reference_constants_and_enums() {
        let mut enums = IndexMap::new();
        enums.insert(
            "Op".to_string(),
            enum_def("Op", &[("ADD", None), ("SUB", None)]),
        );
        let mut constants = IndexMap::new();
        constants.insert(
            "BASE".to_string(),
            int_const("BASE", Expression::integer(Token::synthetic("100"), 100)),
        );
        let sum = Expression::new(
            Token::synthetic("BASE"),
            ExpressionKind::OpPair {
                left: Box::new(Expression::variable(Token::synthetic("BASE"))),
                op: Token::synthetic("+"),
                right: Box::new(Expression::new(
                    Token::synthetic("Op"),
                    ExpressionKind::DotField {
                        root: Box::new(Expression::variable(Token::synthetic("Op"))),
                        field_name: Token::synthetic("SUB"),
                    },
                )),
            },
        );
        constants.insert("DERIVED".to_string(), int_const("DERIVED", sum));
        run(&mut enums, &mut constants).unwrap();
        match constants["DERIVED"].value.kind {
            ExpressionKind::IntegerConstant(v) => assert_eq!(v, 101),
            ref other => panic!("expected folded integer, got {:?}", other),
        }
    }

    #[test]
    fn cyclical_constants_are_reported() {
        let mut enums = IndexMap::new();
        let mut constants = IndexMap::new();
        constants.insert(
            "A".to_string(),
            int_const("A", Expression::variable(Token::synthetic("B"))),
        );
        constants.insert(
            "B".to_string(),
            int_const("B", Expression::variable(Token::synthetic("A"))),
        );
        let err = run(&mut enums, &mut constants).unwrap_err();
        assert!(err.message.contains("cyclical definition"));
    }

    #[test]
    fn overflowing_constants_are_rejected() {
        let mut enums = IndexMap::new();
        let pair = |a: i64, op: &str, b: i64| {
            Expression::new(
                Token::synthetic(&a.to_string()),
                ExpressionKind::OpPair {
                    left: Box::new(Expression::integer(Token::synthetic(&a.to_string()), a)),
                    op: Token::synthetic(op),
                    right: Box::new(Expression::integer(Token::synthetic(&b.to_string()), b)),
                },
            )
        };

        let mut constants = IndexMap::new();
        constants.insert("BAD".to_string(), int_const("BAD", pair(i64::MIN, "/", -1)));
        let err = run(&mut enums, &mut constants).unwrap_err();
        assert!(err.message.contains("overflows"));

        let mut constants = IndexMap::new();
        constants.insert("BAD".to_string(), int_const("BAD", pair(1, "<<", 64)));
        let err = run(&mut enums, &mut constants).unwrap_err();
        assert!(err.message.contains("between 0 and 63"));

        let mut constants = IndexMap::new();
        constants.insert("BAD".to_string(), int_const("BAD", pair(1, ">>", -3)));
        let err = run(&mut enums, &mut constants).unwrap_err();
        assert!(err.message.contains("between 0 and 63"));
    }

    #[test]
    fn non_integer_enum_values_are_rejected() {
        let mut enums = IndexMap::new();
        enums.insert(
            "Bad".to_string(),
            enum_def(
                "Bad",
                &[(
                    "NAME",
                    Some(Expression::string(Token::synthetic("\"x\""), "x")),
                )],
            ),
        );
        let mut constants = IndexMap::new();
        let err = run(&mut enums, &mut constants).unwrap_err();
        assert!(err.message.contains("must be integers"));
    }

    #[test]
    fn declared_type_must_match_folded_value() {
        let mut enums = IndexMap::new();
        let mut constants = IndexMap::new();
        constants.insert(
            "NAME".to_string(),
            TopLevelVariable::constant(
                TypeDescriptor::int(),
                Token::synthetic("NAME"),
                Expression::string(Token::synthetic("\"x\""), "x"),
            ),
        );
        let err = run(&mut enums, &mut constants).unwrap_err();
        assert!(err.message.contains("constant of type 'int'"));
    }
}
