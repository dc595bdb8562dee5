//! Line transformer
//!
//! This module rewrites the extension syntax into valid YAML before parsing.
//! Six line patterns are recognized, each in a mapping-value and a
//! sequence-item form:
//!
//! ```text
//! key: (a, b)                  ->  key: >
//!     body...                          __YAML_SCRIPT_FN__(a, b)
//!                                      body...
//! - (a, b)                     ->  - >  (same as above, for sequence items)
//! key: (a, b) return a + b;    ->  key: __YAML_SCRIPT_FN__(a, b) return a + b;
//! - (a, b) return a + b;       ->  - __YAML_SCRIPT_FN__(a, b) return a + b;
//! key: @include some/file      ->  key: __YAML_SCRIPT_INCLUDE__ some/file
//! - @include some/file         ->  - __YAML_SCRIPT_INCLUDE__ some/file
//! ```
//!
//! Patterns are applied to every line in that order. Once a line has been
//! rewritten its brackets or include token are gone, so a later pattern can
//! no longer match it.

use regex::{Captures, Regex};

use super::markers::{function_marker, include_marker};
use crate::config::SyntaxConfig;
use crate::error::LoadError;

/// The compiled line patterns for one syntax configuration
#[derive(Debug, Clone)]
pub struct LineTransformer {
    multiline_key: Regex,
    multiline_item: Regex,
    inline_key: Regex,
    inline_item: Regex,
    include_key: Regex,
    include_item: Regex,
}

impl LineTransformer {
    /// Build the six line patterns from the configured tokens
    pub fn new(config: &SyntaxConfig) -> Result<Self, LoadError> {
        let open = regex::escape(&config.function_open);
        let close = regex::escape(&config.function_close);
        let include = regex::escape(&config.include_key);

        Ok(Self {
            multiline_key: Regex::new(&format!(r"^(\s*)(.*?)\s*:\s*{open}(.*?){close}\s*$"))?,
            multiline_item: Regex::new(&format!(r"^(\s*)-\s*{open}(.*?){close}\s*$"))?,
            inline_key: Regex::new(&format!(r"^(\s*)(.*?)\s*:\s*{open}(.*?){close}(.*?)$"))?,
            inline_item: Regex::new(&format!(r"^(\s*)-\s*{open}(.*?){close}(.*?)$"))?,
            include_key: Regex::new(&format!(r"^(\s*)(.*?)\s*:\s*{include}\s+(.*?)\s*$"))?,
            include_item: Regex::new(&format!(r"^(\s*)-\s*{include}\s+(.*?)\s*$"))?,
        })
    }

    /// Rewrite every line of `text`, returning the text to hand to the YAML parser
    pub fn transform(&self, text: &str) -> String {
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let mut rewritten = 0usize;

        for i in 0..lines.len() {
            let next_indent = lines
                .get(i + 1)
                .map(|next| leading_whitespace(next).to_string())
                .unwrap_or_default();

            let line = self.rewrite_line(&lines[i], &next_indent);
            if line != lines[i] {
                tracing::trace!(line = i + 1, "rewrote {:?} -> {:?}", lines[i], line);
                rewritten += 1;
                lines[i] = line;
            }
        }

        tracing::debug!(
            lines = lines.len(),
            rewritten,
            "transformed document"
        );

        lines.join("\n")
    }

    /// Apply the six patterns in order, each at most once
    fn rewrite_line(&self, line: &str, next_indent: &str) -> String {
        let line = self
            .multiline_key
            .replacen(line, 1, |caps: &Captures| {
                format!(
                    "{}{}: >\n{}{}",
                    &caps[1],
                    &caps[2],
                    next_indent,
                    function_marker(&caps[3])
                )
            })
            .into_owned();

        let line = self
            .multiline_item
            .replacen(&line, 1, |caps: &Captures| {
                format!(
                    "{}- >\n{}{}",
                    &caps[1],
                    next_indent,
                    function_marker(&caps[2])
                )
            })
            .into_owned();

        let line = self
            .inline_key
            .replacen(&line, 1, |caps: &Captures| {
                format!(
                    "{}{}: {} {}",
                    &caps[1],
                    &caps[2],
                    function_marker(&caps[3]),
                    &caps[4]
                )
            })
            .into_owned();

        let line = self
            .inline_item
            .replacen(&line, 1, |caps: &Captures| {
                format!("{}- {} {}", &caps[1], function_marker(&caps[2]), &caps[3])
            })
            .into_owned();

        let line = self
            .include_key
            .replacen(&line, 1, |caps: &Captures| {
                format!("{}{}: {}", &caps[1], &caps[2], include_marker(&caps[3]))
            })
            .into_owned();

        self.include_item
            .replacen(&line, 1, |caps: &Captures| {
                format!("{}- {}", &caps[1], include_marker(&caps[2]))
            })
            .into_owned()
    }
}

/// Rewrite `text` with the patterns built from `config`
pub fn transform(text: &str, config: &SyntaxConfig) -> Result<String, LoadError> {
    Ok(LineTransformer::new(config)?.transform(text))
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}
