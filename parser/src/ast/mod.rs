//! The raw AST handed to the semantic pipeline.

pub mod core;
pub mod entity;
pub mod expr;
pub mod stmt;

pub use core::CoreFunction;
pub use entity::{
    ClassDefinition, CompilationEntityKind, ConstructorDefinition, EnumDefinition,
    FieldDefinition, FunctionDefinition, Program, StructDefinition, TopLevelVariable,
};
pub use expr::{Expression, ExpressionKind, UnaryOpKind};
pub use stmt::{Statement, StatementKind, SwitchChunk};
