//! Source file tracking and position mapping for multi-file transpilation
//!
//! Every token handed to the semantic pipeline carries a [`SourceSpan`] so
//! that any resolution error can name the file, line, and column of the
//! offending construct. This crate owns the file registry and the
//! line/column arithmetic; nothing here knows about tokens or the AST.

use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a registered source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(usize);

impl FileId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// A position in source code. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn start() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A contiguous region of one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
    pub file_id: FileId,
}

impl SourceSpan {
    pub fn new(start: SourcePosition, end: SourcePosition, file_id: FileId) -> Self {
        Self { start, end, file_id }
    }

    pub fn single_position(pos: SourcePosition, file_id: FileId) -> Self {
        Self {
            start: pos,
            end: SourcePosition::new(pos.line, pos.column + 1),
            file_id,
        }
    }

    /// Merge two spans from the same file into the smallest covering span.
    pub fn merge(self, other: SourceSpan) -> SourceSpan {
        assert_eq!(
            self.file_id, other.file_id,
            "Cannot merge spans from different files"
        );
        let start = if (self.start.line, self.start.column) <= (other.start.line, other.start.column)
        {
            self.start
        } else {
            other.start
        };
        let end = if (self.end.line, self.end.column) >= (other.end.line, other.end.column) {
            self.end
        } else {
            other.end
        };
        SourceSpan::new(start, end, self.file_id)
    }
}

/// A registered source file with precomputed line boundaries.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: String, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            name,
            content,
            line_starts,
        }
    }

    /// Get one line of the file (1-based), without its line terminator.
    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 || line_number > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line_number - 1];
        let end = if line_number < self.line_starts.len() {
            self.line_starts[line_number]
        } else {
            self.content.len()
        };
        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

fn compute_line_starts(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (offset, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(offset + 1);
        }
    }
    starts
}

/// Registry of all source files participating in one compilation.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
    name_lookup: HashMap<String, FileId>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: String, content: String) -> FileId {
        if let Some(&existing) = self.name_lookup.get(&name) {
            return existing;
        }
        let id = FileId::new(self.files.len());
        self.name_lookup.insert(name.clone(), id);
        self.files.push(SourceFile::new(name, content));
        id
    }

    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.as_usize())
    }

    pub fn file_name(&self, id: FileId) -> &str {
        self.get_file(id).map(|f| f.name.as_str()).unwrap_or("<unknown>")
    }

    /// Human-readable "file:line:col" description of a span's start.
    pub fn describe(&self, span: SourceSpan) -> String {
        format!("{}:{}", self.file_name(span.file_id), span.start)
    }
}
