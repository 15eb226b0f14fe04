//! Diagnostics for the prism transpiler
//!
//! Positional diagnostics with:
//! - Severity levels (Error, Warning, Info, Hint)
//! - Source snippets with caret highlighting
//! - Notes and help text
//! - Multi-file source map support
//!
//! The semantic pipeline is fail-fast: a compile produces at most one error
//! diagnostic, but the collection type exists so callers can batch
//! diagnostics across independent compilation units.

use std::fmt;

// Re-export source mapping types from the source_map crate
pub use source_map::{FileId, SourceFile, SourceMap, SourcePosition, SourceSpan};

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
            DiagnosticSeverity::Hint => write!(f, "hint"),
        }
    }
}

/// A diagnostic message with severity, span, notes, and help
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub span: SourceSpan,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    pub fn error(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            code: None,
            message: message.into(),
            span,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    pub fn warning(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(span, message)
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Render this diagnostic with a source snippet, rustc-style:
    ///
    /// ```text
    /// error[S001]: The parent chain for this struct has a cycle.
    ///   --> vm.pst:4:8
    ///    |
    ///  4 | struct Value : Value {
    ///    |        ^^^^^
    ///    = note: ...
    /// ```
    pub fn render(&self, sources: &SourceMap) -> String {
        let mut out = String::new();
        match &self.code {
            Some(code) => out.push_str(&format!("{}[{}]: {}\n", self.severity, code, self.message)),
            None => out.push_str(&format!("{}: {}\n", self.severity, self.message)),
        }
        out.push_str(&format!("  --> {}\n", sources.describe(self.span)));

        if let Some(file) = sources.get_file(self.span.file_id) {
            let line_no = self.span.start.line;
            if let Some(line) = file.get_line(line_no) {
                let gutter = line_no.to_string();
                let pad = " ".repeat(gutter.len());
                out.push_str(&format!("{} |\n", pad));
                out.push_str(&format!("{} | {}\n", gutter, line));
                let caret_count = if self.span.end.line == line_no {
                    self.span.end.column.saturating_sub(self.span.start.column).max(1)
                } else {
                    1
                };
                out.push_str(&format!(
                    "{} | {}{}\n",
                    pad,
                    " ".repeat(self.span.start.column.saturating_sub(1)),
                    "^".repeat(caret_count)
                ));
            }
        }

        for note in &self.notes {
            out.push_str(&format!("   = note: {}\n", note));
        }
        for help in &self.help {
            out.push_str(&format!("   = help: {}\n", help));
        }
        out
    }
}

/// Collection of diagnostics
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    pub fn render_all(&self, sources: &SourceMap) -> String {
        let mut out = String::new();
        for diagnostic in &self.diagnostics {
            out.push_str(&diagnostic.render(sources));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sources() -> (SourceMap, FileId) {
        let mut sources = SourceMap::new();
        let id = sources.add_file(
            "vm.pst".to_string(),
            "struct Value : Value {\n    int type;\n}\n".to_string(),
        );
        (sources, id)
    }

    #[test]
    fn render_includes_snippet_and_carets() {
        let (sources, file) = sample_sources();
        let span = SourceSpan::new(
            SourcePosition::new(1, 8),
            SourcePosition::new(1, 13),
            file,
        );
        let rendered = Diagnostic::error(span, "The parent chain for this struct has a cycle.")
            .with_code("S001")
            .render(&sources);
        assert!(rendered.contains("error[S001]"));
        assert!(rendered.contains("--> vm.pst:1:8"));
        assert!(rendered.contains("struct Value : Value {"));
        assert!(rendered.contains("^^^^^"));
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let (sources, file) = sample_sources();
        let span = SourceSpan::single_position(SourcePosition::new(2, 5), file);
        let mut all = Diagnostics::new();
        all.push(Diagnostic::warning(span, "unused field"));
        assert!(!all.has_errors());
        all.push(Diagnostic::error(span, "type mismatch"));
        assert!(all.has_errors());
        assert!(all.render_all(&sources).contains("warning: unused field"));
    }
}
