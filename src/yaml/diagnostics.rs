//! Script syntax diagnostics with source snippets

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A script that could not be parsed into commands
#[derive(Debug, Error, Diagnostic)]
#[error("script syntax error: {message}")]
#[diagnostic(code(slat::script::syntax))]
pub struct ScriptError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// The underlying error message
    message: String,
}

impl ScriptError {
    /// Create a syntax error from a serde_yml error
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let message = err.to_string();
        let help = generate_help(&message);
        Self::at_location(message, source, filename, line, column, help)
    }

    /// Create a syntax error at a specific location
    pub fn at_location(
        message: impl Into<String>,
        source: &str,
        filename: &str,
        line: usize,
        column: usize,
        help: Option<String>,
    ) -> Self {
        let offset = line_col_to_offset(source, line, column);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Byte offset of a 1-based line and column, clamped to the source
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    if line_start >= source.len() {
        return source.len().saturating_sub(1);
    }
    let rest = &source[line_start..];
    rest.char_indices()
        .take_while(|(_, c)| *c != '\n')
        .nth(column.saturating_sub(1))
        .map_or(line_start + rest.find('\n').unwrap_or(rest.len()), |(j, _)| line_start + j)
}

/// Parser message fragments and the fix each one suggests
const HINTS: &[(&str, &str)] = &[
    (
        "unknown variant",
        "Check the spelling of the command, function type or recorder kind; the valid names are listed above.",
    ),
    ("missing field", "Add the required field to the command's parameters."),
    (
        "unknown field",
        "Remove the field or check its spelling against the command's parameters.",
    ),
    (
        "invalid type: map",
        "A script is a list of commands, each written as `- command: {...}`.",
    ),
    (
        "expected a sequence",
        "A script is a list of commands, each written as `- command: {...}`.",
    ),
    ("tab", "Indent with spaces; YAML does not allow tabs."),
    ("duplicate key", "Each key can appear only once per command."),
    ("expected block end", "Check the indentation of the surrounding commands."),
    (
        "mapping values are not allowed",
        "A space may be missing after ':', or a flow map may be unclosed.",
    ),
];

/// Suggest a fix based on the parser's message
fn generate_help(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    HINTS
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, hint)| hint.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_to_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_col_to_offset(source, 1, 1), 0);
        assert_eq!(line_col_to_offset(source, 2, 1), 6);
        assert_eq!(line_col_to_offset(source, 2, 3), 8);
        assert_eq!(line_col_to_offset(source, 3, 1), 12);
    }

    #[test]
    fn test_help_generation() {
        assert!(generate_help("unknown variant `imrat`, expected one of ...").is_some());
        assert!(generate_help("missing field `id`").is_some());
        assert!(generate_help("found tab character").is_some());
        assert!(generate_help("some random error").is_none());
    }

    #[test]
    fn test_from_serde_error_keeps_message() {
        let source = "- detfn: {id: F, type: linear\n";
        let err = serde_yml::from_str::<serde_yml::Value>(source).unwrap_err();
        let diag = ScriptError::from_serde_error(&err, source, "bad.yaml");
        assert!(!diag.message().is_empty());
        assert!(diag.to_string().starts_with("script syntax error"));
    }
}
