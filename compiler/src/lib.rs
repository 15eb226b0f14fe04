//! Semantic resolution and code emission for the prism transpiler.
//!
//! The pipeline takes a parsed [`parser::ast::Program`] and runs it
//! through constant folding, struct flattening, and three body passes
//! (name resolution, type checking, type-context finalization); the
//! resulting [`resolver::Resolver`] registry is then rendered by a
//! backend implementing the traits in [`emit`].

pub mod config;
pub mod core_fns;
pub mod emit;
pub mod logging;
pub mod resolver;

pub use config::{ConfigError, Language, TargetConfig, TranspileOptions};
pub use emit::{emit_program, CurlyBraceBackend, GenError, TranspileOutput};
pub use resolver::{resolve_program, Resolver};

use parser::PositionalError;
use source_map::SourceMap;

/// Render a pipeline error as a full diagnostic with a source snippet.
pub fn render_error(error: &PositionalError, sources: &SourceMap) -> String {
    error.to_diagnostic().render(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::Token;
    use source_map::{SourcePosition, SourceSpan};

    #[test]
    fn pipeline_errors_render_with_source_snippets() {
        let mut sources = SourceMap::new();
        let file = sources.add_file("vm.pst".to_string(), "int x = y;\n".to_string());
        let span = SourceSpan::new(SourcePosition::new(1, 9), SourcePosition::new(1, 10), file);
        let token = Token::new("y", span);
        let error = PositionalError::type_error(&token, "The variable 'y' is not defined.");

        let rendered = render_error(&error, &sources);
        assert!(rendered.contains("vm.pst:1:9"));
        assert!(rendered.contains("int x = y;"));
        assert!(rendered.contains("The variable 'y' is not defined."));
    }
}
