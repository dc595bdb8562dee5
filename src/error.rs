//! Load-time and run-time error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a `load` call.
///
/// Errors raised while loading an included document are returned unchanged,
/// whatever the include depth.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A syntax token produced a pattern the regex engine rejected
    #[error("invalid syntax configuration: {0}")]
    Pattern(#[from] regex::Error),

    /// The rewritten text is not valid YAML
    #[error("YAML parse error at line {line} column {column}: {message}")]
    Parse {
        message: String,
        line: u32,
        column: u32,
    },

    /// A function marker whose argument list cannot be split off
    #[error("malformed function signal: {value:?}")]
    MalformedFunctionSignal { value: String },

    /// The function body is not valid in the body language
    #[error("invalid function body: {message} in {source_text:?}")]
    FunctionSyntax {
        message: String,
        source_text: String,
    },

    /// An include marker with no path after it
    #[error("malformed include signal: {value:?}")]
    MalformedIncludeSignal { value: String },

    /// An included file does not exist
    #[error("included file not found: {}", path.display())]
    IncludeNotFound { path: PathBuf },

    /// An included file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document includes itself, directly or through other documents
    #[error("include cycle detected: {}", format_chain(chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    /// A get/set-only container whose get or set entry is not a function
    #[error("accessor '{key}' must map to a function")]
    InvalidAccessor { key: String },

    /// A mapping key that is itself a sequence or a mapping
    #[error("unsupported mapping key: {key}")]
    UnsupportedKey { key: String },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors raised while a materialized function runs.
///
/// These are never produced by the loader itself; they surface when the
/// caller invokes a function or reads/writes through an accessor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("{name} is not defined")]
    UndefinedVariable { name: String },

    #[error("assignment to constant variable '{name}'")]
    ConstAssignment { name: String },

    #[error("identifier '{name}' has already been declared")]
    Redeclaration { name: String },

    #[error("{what} is not a function")]
    NotCallable { what: String },

    #[error("cannot read property '{property}' of {target}")]
    InvalidPropertyRead { property: String, target: String },

    #[error("cannot set property '{property}' of {target}")]
    InvalidPropertyWrite { property: String, target: String },

    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    #[error("property '{property}' has a getter but no setter")]
    ReadOnly { property: String },

    #[error("{statement} outside of a loop")]
    StrayControlFlow { statement: String },

    #[error("uncaught {0}")]
    Thrown(String),

    #[error("maximum call depth of {limit} exceeded")]
    CallDepthExceeded { limit: usize },

    /// A sequence write too far past the end to pad
    #[error("index {index} is too far past the end of a sequence of length {len}")]
    IndexTooLarge { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_cycle_message() {
        let err = LoadError::IncludeCycle {
            chain: vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml"), PathBuf::from("a.yaml")],
        };
        assert_eq!(
            err.to_string(),
            "include cycle detected: a.yaml -> b.yaml -> a.yaml"
        );
    }

    #[test]
    fn test_parse_error_message() {
        let err = LoadError::Parse {
            message: "mapping values are not allowed in this context".to_string(),
            line: 2,
            column: 7,
        };
        assert_eq!(
            err.to_string(),
            "YAML parse error at line 2 column 7: mapping values are not allowed in this context"
        );
    }

    #[test]
    fn test_runtime_error_message() {
        let err = RuntimeError::UndefinedVariable {
            name: "x".to_string(),
        };
        assert_eq!(err.to_string(), "x is not defined");
    }
}
