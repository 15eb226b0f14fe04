//! End-to-end pipeline tests.
//!
//! Each test builds a raw program the way the parser would hand it over,
//! runs the full resolution pipeline, and (where the input is valid)
//! renders it through the curly-brace reference backend. Assertions check
//! the final output text, so these tests cover the interaction of
//! constant folding, desugaring, struct flattening, and emission
//! together rather than any single pass.

use compiler::emit::{emit_program, CurlyBraceBackend, TranspileOutput};
use compiler::resolve_program;
use parser::ast::{FunctionDefinition, Program, StructDefinition, SwitchChunk};
use parser::{Expression, ExpressionKind, Statement, StatementKind, Token, TypeDescriptor};

fn tok(value: &str) -> Token {
    Token::synthetic(value)
}

fn int_lit(value: i64) -> Expression {
    Expression::integer(tok(&value.to_string()), value)
}

fn var(name: &str) -> Expression {
    Expression::variable(tok(name))
}

fn chain(expressions: Vec<Expression>, ops: &[&str]) -> Expression {
    let first = expressions[0].first_token.clone();
    Expression::new(
        first,
        ExpressionKind::OpChain {
            expressions,
            ops: ops.iter().map(|op| tok(op)).collect(),
        },
    )
}

fn invoke(name: &str, args: Vec<Expression>) -> Expression {
    Expression::new(
        tok(name),
        ExpressionKind::FunctionInvocation {
            root: Box::new(var(name)),
            open_paren: tok("("),
            args,
        },
    )
}

fn core_call(name: &str, args: Vec<Expression>) -> Expression {
    Expression::new(
        tok("Core"),
        ExpressionKind::FunctionInvocation {
            root: Box::new(Expression::new(
                tok("Core"),
                ExpressionKind::DotField {
                    root: Box::new(var("Core")),
                    field_name: tok(name),
                },
            )),
            open_paren: tok("("),
            args,
        },
    )
}

fn field(root: Expression, name: &str) -> Expression {
    Expression::new(
        root.first_token.clone(),
        ExpressionKind::DotField {
            root: Box::new(root),
            field_name: tok(name),
        },
    )
}

fn construct(type_name: &str, args: Vec<Expression>) -> Expression {
    let descriptor = TypeDescriptor::new(Some(tok(type_name)), type_name, Vec::new()).unwrap();
    Expression::new(
        tok("new"),
        ExpressionKind::FunctionInvocation {
            root: Box::new(Expression::new(
                tok("new"),
                ExpressionKind::ConstructorReference(descriptor),
            )),
            open_paren: tok("("),
            args,
        },
    )
}

fn ret(value: Expression) -> Statement {
    Statement::new(tok("return"), StatementKind::Return(Some(Box::new(value))))
}

fn declare(declared_type: TypeDescriptor, name: &str, value: Expression) -> Statement {
    Statement::new(
        tok("var"),
        StatementKind::VariableDeclaration {
            declared_type,
            name_token: tok(name),
            value: Some(Box::new(value)),
        },
    )
}

fn function(
    name: &str,
    return_type: TypeDescriptor,
    args: Vec<(TypeDescriptor, &str)>,
    body: Vec<Statement>,
) -> FunctionDefinition {
    let (arg_types, arg_names) = args
        .into_iter()
        .map(|(ty, arg_name)| (ty, tok(arg_name)))
        .unzip();
    FunctionDefinition::new(tok(name), return_type, arg_types, arg_names, body, None)
}

fn named(type_name: &str) -> TypeDescriptor {
    TypeDescriptor::new(Some(tok(type_name)), type_name, Vec::new()).unwrap()
}

fn emit(program: Program) -> TranspileOutput {
    let resolver = resolve_program(program).unwrap();
    emit_program(&CurlyBraceBackend::new(), &resolver, "PST_").unwrap()
}

// ============================================================================
// Full pipeline, valid input
// ============================================================================

#[test]
fn struct_program_resolves_and_emits() {
    let mut program = Program::new();
    program.structs.push(StructDefinition::new(
        tok("struct"),
        tok("Point"),
        vec![TypeDescriptor::int(), TypeDescriptor::int()],
        vec![tok("x"), tok("y")],
        None,
    ));
    program.functions.push(function(
        "manhattan",
        TypeDescriptor::int(),
        vec![(named("Point"), "p")],
        vec![ret(chain(
            vec![
                core_call("MathAbs", vec![field(var("p"), "x")]),
                core_call("MathAbs", vec![field(var("p"), "y")]),
            ],
            &["+"],
        ))],
    ));
    program.functions.push(function(
        "main",
        TypeDescriptor::int(),
        Vec::new(),
        vec![
            declare(
                TypeDescriptor::int(),
                "total",
                chain(vec![int_lit(1), int_lit(2), int_lit(3)], &["+", "*"]),
            ),
            declare(named("Point"), "p", construct("Point", vec![var("total"), int_lit(4)])),
            ret(invoke("manhattan", vec![var("p")])),
        ],
    ));

    let output = emit(program);
    assert!(output.code.contains("public sealed class Point"));
    assert!(output.code.contains("int manhattan(Point p)"));
    assert!(output.code.contains("return Math.Abs(p.x) + Math.Abs(p.y);"));
    // The (1 + 2) * 3 chain folds away entirely.
    assert!(output.code.contains("int total = 9;"));
    assert!(output.code.contains("Point p = new Point(total, 4);"));
    assert!(output.code.contains("return manhattan(p);"));
    assert!(output.features.is_empty());
}

#[test]
fn inherited_fields_flatten_into_the_emitted_struct() {
    let mut program = Program::new();
    program.structs.push(StructDefinition::new(
        tok("struct"),
        tok("Base"),
        vec![TypeDescriptor::int()],
        vec![tok("id")],
        None,
    ));
    program.structs.push(StructDefinition::new(
        tok("struct"),
        tok("Derived"),
        vec![TypeDescriptor::int()],
        vec![tok("extra")],
        Some(tok("Base")),
    ));
    program.functions.push(function(
        "build",
        named("Derived"),
        vec![(TypeDescriptor::int(), "id"), (TypeDescriptor::int(), "extra")],
        vec![ret(construct("Derived", vec![var("id"), var("extra")]))],
    ));

    let output = emit(program);
    let class_start = output.code.find("public sealed class Derived").unwrap();
    let id_field = output.code[class_start..].find("public int id;").unwrap();
    let extra_field = output.code[class_start..].find("public int extra;").unwrap();
    // Parent fields come first in the flattened layout.
    assert!(id_field < extra_field);
    assert!(output.code.contains("new Derived(id, extra)"));
}

#[test]
fn string_concatenation_emits_flat() {
    let mut program = Program::new();
    program.functions.push(function(
        "wrap",
        TypeDescriptor::string(),
        vec![(TypeDescriptor::string(), "a")],
        vec![ret(chain(
            vec![var("a"), Expression::string(tok("\"-\""), "-"), var("a")],
            &["+", "+"],
        ))],
    ));

    let output = emit(program);
    assert!(output.code.contains("return a + \"-\" + a;"));
}

#[test]
fn bracket_indexing_desugars_before_emission() {
    let mut program = Program::new();
    program.functions.push(function(
        "first",
        TypeDescriptor::int(),
        vec![(TypeDescriptor::list_of(TypeDescriptor::int()), "items")],
        vec![ret(Expression::new(
            tok("items"),
            ExpressionKind::BracketIndex {
                root: Box::new(var("items")),
                bracket_token: tok("["),
                index: Box::new(int_lit(0)),
            },
        ))],
    ));

    let output = emit(program);
    assert!(output.code.contains("return items[0];"));
}

#[test]
fn dictionary_try_get_renders_as_a_guarded_assignment() {
    let mut program = Program::new();
    let dict_type = TypeDescriptor::dictionary_of(TypeDescriptor::string(), TypeDescriptor::int());
    program.functions.push(function(
        "lookup",
        TypeDescriptor::int(),
        vec![(dict_type, "d")],
        vec![
            declare(TypeDescriptor::int(), "v", int_lit(0)),
            Statement::new(
                tok("v"),
                StatementKind::Assignment {
                    target: Box::new(var("v")),
                    op_token: tok("="),
                    value: Box::new(core_call(
                        "DictionaryTryGet",
                        vec![
                            var("d"),
                            Expression::string(tok("\"k\""), "k"),
                            int_lit(0),
                        ],
                    )),
                },
            ),
            ret(var("v")),
        ],
    ));

    let output = emit(program);
    assert!(output.code.contains("v = PST_DictionaryTryGet(d, \"k\", 0);"));
    assert_eq!(output.features, vec!["DictionaryTryGet".to_string()]);
}

#[test]
fn constant_conditions_prune_dead_branches() {
    let mut program = Program::new();
    program.functions.push(function(
        "flagged",
        TypeDescriptor::int(),
        Vec::new(),
        vec![Statement::new(
            tok("if"),
            StatementKind::If {
                condition: Box::new(Expression::boolean(tok("true"), true)),
                if_code: vec![ret(int_lit(1))],
                else_code: vec![ret(int_lit(2))],
            },
        )],
    ));

    let output = emit(program);
    assert!(output.code.contains("return 1;"));
    assert!(!output.code.contains("return 2;"));
    assert!(!output.code.contains("if"));
}

// ============================================================================
// Full pipeline, rejected input
// ============================================================================

#[test]
fn parent_cycles_are_rejected() {
    let mut program = Program::new();
    program.structs.push(StructDefinition::new(
        tok("struct"),
        tok("A"),
        Vec::new(),
        Vec::new(),
        Some(tok("B")),
    ));
    program.structs.push(StructDefinition::new(
        tok("struct"),
        tok("B"),
        Vec::new(),
        Vec::new(),
        Some(tok("A")),
    ));

    let err = resolve_program(program).unwrap_err();
    assert!(err.message.contains("creates a cycle"));
}

#[test]
fn duplicate_switch_cases_are_rejected_across_chunks() {
    let mut program = Program::new();
    let chunk = |value: i64| {
        SwitchChunk::new(
            vec![tok("case")],
            vec![Some(int_lit(value))],
            vec![Statement::new(tok("break"), StatementKind::Break)],
        )
        .unwrap()
    };
    program.functions.push(function(
        "pick",
        TypeDescriptor::void(),
        vec![(TypeDescriptor::int(), "x")],
        vec![Statement::new(
            tok("switch"),
            StatementKind::Switch {
                condition: Box::new(var("x")),
                chunks: vec![chunk(1), chunk(1)],
            },
        )],
    ));

    let err = resolve_program(program).unwrap_err();
    assert!(err.message.contains("appears multiple times"));
}

#[test]
fn constant_folding_rejects_overflow_instead_of_panicking() {
    let mut program = Program::new();
    program.functions.push(function(
        "shifted",
        TypeDescriptor::int(),
        Vec::new(),
        vec![ret(chain(vec![int_lit(1), int_lit(64)], &["<<"]))],
    ));
    let err = resolve_program(program).unwrap_err();
    assert!(err.message.contains("between 0 and 63"));

    let mut program = Program::new();
    program.functions.push(function(
        "divided",
        TypeDescriptor::int(),
        Vec::new(),
        vec![ret(chain(vec![int_lit(i64::MIN), int_lit(-1)], &["/"]))],
    ));
    let err = resolve_program(program).unwrap_err();
    assert!(err.message.contains("overflows"));
}

#[test]
fn undefined_variables_are_reported_by_name() {
    let mut program = Program::new();
    program.functions.push(function(
        "f",
        TypeDescriptor::int(),
        Vec::new(),
        vec![ret(var("q"))],
    ));

    let err = resolve_program(program).unwrap_err();
    assert_eq!(err.message, "The variable 'q' is not defined.");
}

#[test]
fn constructor_arity_is_checked_against_flat_fields() {
    let mut program = Program::new();
    program.structs.push(StructDefinition::new(
        tok("struct"),
        tok("Pair"),
        vec![TypeDescriptor::int(), TypeDescriptor::int()],
        vec![tok("a"), tok("b")],
        None,
    ));
    program.functions.push(function(
        "make",
        named("Pair"),
        Vec::new(),
        vec![ret(construct("Pair", vec![int_lit(1)]))],
    ));

    let err = resolve_program(program).unwrap_err();
    assert!(err.message.contains("Expected 2 but found 1"));
}
