//! prism - source-to-source transpiler core
//!
//! # Usage
//!
//! ```bash
//! # Resolve and emit the built-in sample program
//! prism demo
//!
//! # Same, with a project file supplying the helper prefix
//! prism demo --config prism.toml --format json
//!
//! # Validate a project file
//! prism check prism.toml
//!
//! # List the output languages a project file may name
//! prism targets
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;

use compiler::emit::{emit_program, CurlyBraceBackend};
use compiler::{resolve_program, Language, TranspileOptions};
use parser::ast::{FunctionDefinition, Program, StructDefinition};
use parser::{Expression, ExpressionKind, ParseResult, Statement, StatementKind, Token,
    TypeDescriptor};

#[derive(Parser)]
#[command(name = "prism")]
#[command(version = "0.1.0")]
#[command(about = "Source-to-source transpiler core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and emit the built-in sample program
    Demo {
        /// Project file supplying the helper prefix
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Enable verbose pipeline logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a project file and summarize its targets
    Check {
        /// Path to the project file
        file: PathBuf,
    },

    /// List the output languages a project file may name
    Targets,
}

#[derive(ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Demo {
            config,
            format,
            verbose,
        } => run_demo(config, format, verbose),
        Commands::Check { file } => check_project(file),
        Commands::Targets => {
            list_targets();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_demo(
    config: Option<PathBuf>,
    format: OutputFormat,
    verbose: bool,
) -> Result<(), String> {
    if verbose {
        compiler::logging::init_with_level(log::LevelFilter::Debug);
    } else {
        compiler::logging::init_from_env();
    }

    let options = match config {
        Some(path) => TranspileOptions::load(&path).map_err(|e| e.to_string())?,
        None => TranspileOptions::default(),
    };

    let program = sample_program().map_err(|e| e.to_string())?;
    let resolver = resolve_program(program).map_err(|e| e.to_string())?;
    let backend = CurlyBraceBackend::new();
    let output =
        emit_program(&backend, &resolver, &options.unique_prefix).map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Text => {
            print!("{}", output.code);
            if !output.features.is_empty() {
                println!("\n// runtime helpers: {}", output.features.join(", "));
            }
        }
        OutputFormat::Json => {
            let rendered = serde_json::json!({
                "code": output.code,
                "features": output.features,
            });
            println!("{}", rendered);
        }
    }
    Ok(())
}

fn check_project(file: PathBuf) -> Result<(), String> {
    let options = TranspileOptions::load(&file).map_err(|e| e.to_string())?;
    println!("✓ {} is valid", file.display());
    println!("  Helper prefix: {}", options.unique_prefix);
    println!("  Targets: {}", options.targets.len());
    for target in &options.targets {
        println!("    {} -> {}", target.language, target.output);
    }
    Ok(())
}

fn list_targets() {
    println!("Supported output languages:");
    for language in Language::all() {
        println!("  {:<14} (.{})", language.to_string(), language.file_extension());
    }
    println!("\nOnly the curly-brace reference backend ships with this build.");
}

fn tok(value: &str) -> Token {
    Token::synthetic(value)
}

/// A small program exercising the full pipeline: a struct, constant
/// folding, builtin invocations, and a cross-function call.
fn sample_program() -> ParseResult<Program> {
    let mut program = Program::new();

    // struct Point { int x; int y; }
    program.structs.push(StructDefinition::new(
        tok("struct"),
        tok("Point"),
        vec![TypeDescriptor::int(), TypeDescriptor::int()],
        vec![tok("x"), tok("y")],
        None,
    ));

    let point_type = TypeDescriptor::new(Some(tok("Point")), "Point", Vec::new())?;

    // int manhattan(Point p) { return Core.MathAbs(p.x) + Core.MathAbs(p.y); }
    let abs_of_field = |field: &str| {
        Expression::new(
            tok("Core"),
            ExpressionKind::FunctionInvocation {
                root: Box::new(Expression::new(
                    tok("Core"),
                    ExpressionKind::DotField {
                        root: Box::new(Expression::variable(tok("Core"))),
                        field_name: tok("MathAbs"),
                    },
                )),
                open_paren: tok("("),
                args: vec![Expression::new(
                    tok("p"),
                    ExpressionKind::DotField {
                        root: Box::new(Expression::variable(tok("p"))),
                        field_name: tok(field),
                    },
                )],
            },
        )
    };
    let sum = Expression::new(
        tok("Core"),
        ExpressionKind::OpChain {
            expressions: vec![abs_of_field("x"), abs_of_field("y")],
            ops: vec![tok("+")],
        },
    );
    program.functions.push(FunctionDefinition::new(
        tok("manhattan"),
        TypeDescriptor::int(),
        vec![point_type.clone()],
        vec![tok("p")],
        vec![Statement::new(
            tok("return"),
            StatementKind::Return(Some(Box::new(sum))),
        )],
        None,
    ));

    // int main() {
    //     int total = (1 + 2) * 3;   (folds to a constant)
    //     Point p = new Point(total, 4);
    //     return manhattan(p);
    // }
    let folded = Expression::new(
        tok("1"),
        ExpressionKind::OpChain {
            expressions: vec![
                Expression::integer(tok("1"), 1),
                Expression::integer(tok("2"), 2),
                Expression::integer(tok("3"), 3),
            ],
            ops: vec![tok("+"), tok("*")],
        },
    );
    let declare_total = Statement::new(
        tok("int"),
        StatementKind::VariableDeclaration {
            declared_type: TypeDescriptor::int(),
            name_token: tok("total"),
            value: Some(Box::new(folded)),
        },
    );
    let construct = Expression::new(
        tok("new"),
        ExpressionKind::FunctionInvocation {
            root: Box::new(Expression::new(
                tok("new"),
                ExpressionKind::ConstructorReference(point_type.clone()),
            )),
            open_paren: tok("("),
            args: vec![
                Expression::variable(tok("total")),
                Expression::integer(tok("4"), 4),
            ],
        },
    );
    let declare_p = Statement::new(
        tok("Point"),
        StatementKind::VariableDeclaration {
            declared_type: point_type,
            name_token: tok("p"),
            value: Some(Box::new(construct)),
        },
    );
    let call = Expression::new(
        tok("manhattan"),
        ExpressionKind::FunctionInvocation {
            root: Box::new(Expression::variable(tok("manhattan"))),
            open_paren: tok("("),
            args: vec![Expression::variable(tok("p"))],
        },
    );
    program.functions.push(FunctionDefinition::new(
        tok("main"),
        TypeDescriptor::int(),
        Vec::new(),
        Vec::new(),
        vec![
            declare_total,
            declare_p,
            Statement::new(tok("return"), StatementKind::Return(Some(Box::new(call)))),
        ],
        None,
    ));

    Ok(program)
}
