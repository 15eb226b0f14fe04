//! Shared state for one emission run.
//!
//! Backends append statement text directly into the buffer with the
//! current indentation, and mark which runtime helper features the
//! generated code ended up needing so the exporter can prepend only the
//! helpers that are actually used.

use super::fragment::Fragment;
use indexmap::IndexSet;

const TAB: &str = "    ";

/// Mutable state threaded through a backend while it writes output.
pub struct EmitContext {
    buffer: String,
    tab_depth: usize,
    tab_cache: Vec<String>,
    features: IndexSet<String>,
    unique_prefix: String,
}

impl EmitContext {
    pub fn new(unique_prefix: impl Into<String>) -> Self {
        Self {
            buffer: String::new(),
            tab_depth: 0,
            tab_cache: vec![String::new()],
            features: IndexSet::new(),
            unique_prefix: unique_prefix.into(),
        }
    }

    pub fn append(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn append_fragment(&mut self, fragment: &Fragment) {
        self.buffer.push_str(&fragment.flatten());
    }

    /// The indentation string for the current depth, cached per depth.
    pub fn tab(&mut self) -> &str {
        while self.tab_cache.len() <= self.tab_depth {
            let next = format!("{}{}", self.tab_cache.last().unwrap(), TAB);
            self.tab_cache.push(next);
        }
        &self.tab_cache[self.tab_depth]
    }

    pub fn append_tab(&mut self) {
        let tab = self.tab().to_string();
        self.buffer.push_str(&tab);
    }

    pub fn indent(&mut self) {
        self.tab_depth += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.tab_depth > 0);
        self.tab_depth -= 1;
    }

    pub fn unique_prefix(&self) -> &str {
        &self.unique_prefix
    }

    /// Record that the output relies on a named runtime helper.
    pub fn mark_feature(&mut self, feature: &str) {
        self.features.insert(feature.to_string());
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(String::as_str)
    }

    /// Take the accumulated output, leaving the context reusable.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indentation_tracks_depth() {
        let mut ctx = EmitContext::new("PST_");
        assert_eq!(ctx.tab(), "");
        ctx.indent();
        ctx.indent();
        assert_eq!(ctx.tab(), "        ");
        ctx.dedent();
        assert_eq!(ctx.tab(), "    ");
    }

    #[test]
    fn features_are_deduplicated_in_first_use_order() {
        let mut ctx = EmitContext::new("PST_");
        ctx.mark_feature("ListShuffle");
        ctx.mark_feature("RandomFloat");
        ctx.mark_feature("ListShuffle");
        let features: Vec<&str> = ctx.features().collect();
        assert_eq!(features, vec!["ListShuffle", "RandomFloat"]);
    }

    #[test]
    fn take_output_drains_the_buffer()  {
        let mut ctx = EmitContext::new("PST_");
        ctx.append("int x = 1;\n");
        assert_eq!(ctx.take_output(), "int x = 1;\n");
        assert_eq!(ctx.take_output(), "");
    }
}
