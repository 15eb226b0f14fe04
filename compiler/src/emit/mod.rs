//! Target-language emission.
//!
//! Resolved programs are rendered through the backend contract in
//! [`translator`]: expressions become precedence-ranked [`Fragment`]
//! ropes, statements write themselves into the shared [`EmitContext`],
//! and the context records which runtime helper features the output
//! depends on. [`curly`] is the bundled C#-flavored backend.

pub mod context;
pub mod curly;
pub mod fragment;
pub mod translator;

pub use context::EmitContext;
pub use curly::CurlyBraceBackend;
pub use fragment::{Fragment, Tightness};
pub use translator::{ExpressionTranslator, GenError, GenResult, StatementTranslator,
    TypeTranslator};

use log::{debug, info};
use parser::ast::FunctionDefinition;

use crate::resolver::Resolver;

/// The rendered program plus the runtime helper features it relies on,
/// in first-use order.
#[derive(Debug)]
pub struct TranspileOutput {
    pub code: String,
    pub features: Vec<String>,
}

/// Render a fully resolved program: structs in declaration order, then
/// globals, then functions sorted by name.
pub fn emit_program<B>(
    backend: &B,
    resolver: &Resolver,
    unique_prefix: &str,
) -> GenResult<TranspileOutput>
where
    B: StatementTranslator,
{
    let mut ctx = EmitContext::new(unique_prefix);
    for definition in resolver.structs.values() {
        debug!("emitting struct {}", definition.name());
        backend.generate_struct(&mut ctx, definition)?;
        ctx.append("\n");
    }
    for definition in resolver.classes.values() {
        debug!("emitting class {}", definition.name());
        backend.generate_class(&mut ctx, definition)?;
        ctx.append("\n");
    }
    for variable in resolver.globals.values() {
        backend.translate_variable_declaration(
            &mut ctx,
            &variable.declared_type,
            variable.name(),
            &variable.value,
        )?;
    }
    if !resolver.globals.is_empty() {
        ctx.append("\n");
    }
    let mut functions: Vec<&FunctionDefinition> = resolver.functions.values().collect();
    functions.sort_by(|a, b| a.name().cmp(b.name()));
    for (i, function) in functions.iter().enumerate() {
        if i > 0 {
            ctx.append("\n");
        }
        debug!("emitting function {}", function.name());
        backend.generate_function(&mut ctx, function)?;
    }
    let features: Vec<String> = ctx.features().map(str::to_string).collect();
    info!(
        "emitted {} function(s), {} struct(s), {} helper feature(s)",
        functions.len(),
        resolver.structs.len(),
        features.len()
    );
    Ok(TranspileOutput {
        code: ctx.take_output(),
        features,
    })
}
