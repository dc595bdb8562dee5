//! In-text markers inserted by the line transformer
//!
//! The transformer rewrites function and include syntax into plain YAML
//! scalars that start with one of these markers. After parsing, the resolver
//! calls [`detect`] on every string scalar to find them again.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::LoadError;

/// Prefix of a scalar holding a function: `__YAML_SCRIPT_FN__(a, b) body`
pub const FUNCTION_MARKER: &str = "__YAML_SCRIPT_FN__";
/// Prefix of a scalar holding an include: `__YAML_SCRIPT_INCLUDE__ path`
pub const INCLUDE_MARKER: &str = "__YAML_SCRIPT_INCLUDE__";

lazy_static! {
    static ref PARAM_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

/// Render the function marker for an argument list
pub fn function_marker(args: &str) -> String {
    format!("{}({})", FUNCTION_MARKER, args)
}

/// Render the include marker for a path
pub fn include_marker(path: &str) -> String {
    format!("{} {}", INCLUDE_MARKER, path)
}

/// A marker found in a parsed scalar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<'a> {
    /// A function with its formal parameters and body text
    Function { params: Vec<String>, body: &'a str },
    /// An include with the path to load
    Include { path: &'a str },
}

/// Look for a marker at the start of `value`.
///
/// Returns `Ok(None)` for ordinary scalars.
pub fn detect(value: &str) -> Result<Option<Signal<'_>>, LoadError> {
    let trimmed = value.trim_start();

    if let Some(rest) = trimmed.strip_prefix(FUNCTION_MARKER) {
        return split_function(value, rest).map(Some);
    }

    if let Some(rest) = trimmed.strip_prefix(INCLUDE_MARKER) {
        let path = rest.trim();
        if !rest.starts_with(char::is_whitespace) || path.is_empty() {
            return Err(LoadError::MalformedIncludeSignal {
                value: value.to_string(),
            });
        }
        return Ok(Some(Signal::Include { path }));
    }

    Ok(None)
}

fn split_function<'a>(value: &str, rest: &'a str) -> Result<Signal<'a>, LoadError> {
    let malformed = || LoadError::MalformedFunctionSignal {
        value: value.to_string(),
    };

    let inner = rest.strip_prefix('(').ok_or_else(malformed)?;
    let close = inner.find(')').ok_or_else(malformed)?;
    let args = &inner[..close];
    let body = &inner[close + 1..];

    let params = parse_params(args).ok_or_else(malformed)?;

    Ok(Signal::Function { params, body })
}

/// Split a comma-separated argument list into trimmed parameter names.
/// An all-blank list means no parameters.
fn parse_params(args: &str) -> Option<Vec<String>> {
    if args.trim().is_empty() {
        return Some(Vec::new());
    }

    args.split(',')
        .map(str::trim)
        .map(|name| PARAM_RE.is_match(name).then(|| name.to_string()))
        .collect()
}
