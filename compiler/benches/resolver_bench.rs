//! Benchmarks for the resolution pipeline and the reference backend.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use compiler::emit::{emit_program, CurlyBraceBackend};
use compiler::resolve_program;
use parser::ast::{FunctionDefinition, Program, StructDefinition};
use parser::{Expression, ExpressionKind, Statement, StatementKind, Token, TypeDescriptor};

fn tok(value: &str) -> Token {
    Token::synthetic(value)
}

fn arithmetic_chain(terms: usize) -> Expression {
    let expressions = (0..terms)
        .map(|i| {
            if i % 2 == 0 {
                Expression::integer(tok(&i.to_string()), i as i64)
            } else {
                Expression::variable(tok("x"))
            }
        })
        .collect::<Vec<_>>();
    let ops = (0..terms - 1)
        .map(|i| tok(if i % 2 == 0 { "+" } else { "*" }))
        .collect();
    Expression::new(tok("0"), ExpressionKind::OpChain { expressions, ops })
}

/// `count` functions, each folding a mixed constant/variable chain, plus
/// one struct so hierarchy resolution has work to do.
fn generate_program(count: usize) -> Program {
    let mut program = Program::new();
    program.structs.push(StructDefinition::new(
        tok("struct"),
        tok("Record"),
        vec![TypeDescriptor::int(), TypeDescriptor::string()],
        vec![tok("id"), tok("label")],
        None,
    ));
    for i in 0..count {
        let body = vec![Statement::new(
            tok("return"),
            StatementKind::Return(Some(Box::new(arithmetic_chain(9)))),
        )];
        program.functions.push(FunctionDefinition::new(
            tok(&format!("fn_{}", i)),
            TypeDescriptor::int(),
            vec![TypeDescriptor::int()],
            vec![tok("x")],
            body,
            None,
        ));
    }
    program
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_program");
    for size in [10usize, 100, 500] {
        let program = generate_program(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &program, |b, program| {
            b.iter(|| resolve_program(black_box(program.clone())).unwrap());
        });
    }
    group.finish();
}

fn bench_emission(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit_program");
    let backend = CurlyBraceBackend::new();
    for size in [10usize, 100, 500] {
        let resolver = resolve_program(generate_program(size)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &resolver, |b, resolver| {
            b.iter(|| emit_program(&backend, black_box(resolver), "PST_").unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolution, bench_emission);
criterion_main!(benches);
