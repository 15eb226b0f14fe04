//! Transpilation configuration.
//!
//! A project file (TOML) names the targets to generate and a few knobs the
//! emission layer needs, most importantly the unique prefix prepended to
//! helper functions so generated code never collides with hand-written
//! code in the host project.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Output languages the emission framework knows how to address.
///
/// Only the curly-brace reference backend ships in this crate; the variants
/// exist so project files can be parsed and validated up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "c")]
    C,
    #[serde(rename = "csharp")]
    CSharp,
    #[serde(rename = "go")]
    Go,
    #[serde(rename = "javascript")]
    JavaScript,
    #[serde(rename = "php")]
    Php,
    #[serde(rename = "common-script")]
    CommonScript,
}

impl Language {
    pub fn file_extension(self) -> &'static str {
        match self {
            Language::C => "c",
            Language::CSharp => "cs",
            Language::Go => "go",
            Language::JavaScript => "js",
            Language::Php => "php",
            Language::CommonScript => "script",
        }
    }

    pub fn all() -> &'static [Language] {
        &[
            Language::C,
            Language::CSharp,
            Language::Go,
            Language::JavaScript,
            Language::Php,
            Language::CommonScript,
        ]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::C => "c",
            Language::CSharp => "csharp",
            Language::Go => "go",
            Language::JavaScript => "javascript",
            Language::Php => "php",
            Language::CommonScript => "common-script",
        };
        write!(f, "{}", name)
    }
}

/// One output target of a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub language: Language,
    /// Output file path, relative to the project root.
    pub output: String,
}

/// The parsed project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranspileOptions {
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    /// Prefix for generated helper symbols; defaults to `PST_`.
    #[serde(default = "default_prefix")]
    pub unique_prefix: String,
}

fn default_prefix() -> String {
    "PST_".to_string()
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            unique_prefix: default_prefix(),
        }
    }
}

impl TranspileOptions {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml_str(&text)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read project file: {}", e),
            ConfigError::Parse(e) => write!(f, "malformed project file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_project_file() {
        let options = TranspileOptions::from_toml_str(
            r#"
            unique_prefix = "VM_"

            [[targets]]
            language = "csharp"
            output = "gen/Interpreter.cs"

            [[targets]]
            language = "javascript"
            output = "gen/interpreter.js"
            "#,
        )
        .unwrap();
        assert_eq!(options.unique_prefix, "VM_");
        assert_eq!(options.targets.len(), 2);
        assert_eq!(options.targets[0].language, Language::CSharp);
        assert_eq!(options.targets[1].output, "gen/interpreter.js");
    }

    #[test]
    fn prefix_defaults_when_absent() {
        let options = TranspileOptions::from_toml_str("").unwrap();
        assert_eq!(options.unique_prefix, "PST_");
        assert!(options.targets.is_empty());
    }

    #[test]
    fn unknown_language_is_rejected() {
        let result = TranspileOptions::from_toml_str(
            r#"
            [[targets]]
            language = "cobol"
            output = "out.cbl"
            "#,
        );
        assert!(result.is_err());
    }
}
