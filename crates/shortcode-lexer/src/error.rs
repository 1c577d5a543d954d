//! Lexer errors and their diagnostic rendering.

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};

use crate::Span;

/// Lexer error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A character outside the unquoted word set, inside a tag.
    UnrecognizedCharacter(char),
    /// Input ended inside a tag.
    UnclosedAction,
    /// A closing tag before any shortcode was opened.
    CloseWithoutOpen,
    /// A closing tag whose name matches no open shortcode.
    MismatchedClose {
        /// Name given in the closing tag.
        name: String,
    },
    /// Content between a closing tag's name and its right delimiter.
    UnclosedShortcode,
    /// Unquoted positional parameter after named ones.
    MixedPositional {
        /// The positional parameter.
        name: String,
    },
    /// Quoted positional parameter after named ones.
    MixedQuotedPositional,
    /// Named parameter after positional ones.
    MixedNamed {
        /// The parameter name.
        name: String,
    },
    /// Quoted value not closed before the end of input.
    UnterminatedQuote {
        /// Input from after the opening quote to the end.
        rest: String,
    },
    /// Backtick value not closed before the end of input.
    UnterminatedRawString {
        /// Input from after the opening backtick to the end.
        rest: String,
    },
    /// `{{</*` without a matching `*/>}}`.
    UnclosedComment,
}

impl LexErrorKind {
    fn label(&self) -> &'static str {
        match self {
            LexErrorKind::UnrecognizedCharacter(_) => "not allowed here",
            LexErrorKind::UnclosedAction => "shortcode opened here",
            LexErrorKind::CloseWithoutOpen => "nothing to close",
            LexErrorKind::MismatchedClose { .. } => "no open shortcode with this name",
            LexErrorKind::UnclosedShortcode => "expected the right delimiter here",
            LexErrorKind::MixedPositional { .. }
            | LexErrorKind::MixedQuotedPositional
            | LexErrorKind::MixedNamed { .. } => "parameter kind differs from the first one",
            LexErrorKind::UnterminatedQuote { .. } => "string starts here",
            LexErrorKind::UnterminatedRawString { .. } => "raw string starts here",
            LexErrorKind::UnclosedComment => "comment opened here",
        }
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            LexErrorKind::UnrecognizedCharacter(_) => Some("wrap the argument in double quotes"),
            LexErrorKind::MixedPositional { .. }
            | LexErrorKind::MixedQuotedPositional
            | LexErrorKind::MixedNamed { .. } => {
                Some("use either `name=value` pairs or bare values in one shortcode, not both")
            }
            LexErrorKind::UnterminatedQuote { .. } => Some("add a closing '\"'"),
            LexErrorKind::UnterminatedRawString { .. } => Some("add a closing '`'"),
            LexErrorKind::UnclosedComment => {
                Some("end the comment with `*/` directly before the closing delimiter")
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErrorKind::UnrecognizedCharacter(c) => write!(
                f,
                "unrecognized character in shortcode action: U+{:04X} '{}'. Note: Parameters with non-alphanumeric args must be quoted",
                *c as u32, c
            ),
            LexErrorKind::UnclosedAction => write!(f, "unclosed shortcode action"),
            LexErrorKind::CloseWithoutOpen => {
                write!(f, "got closing shortcode, but none is open")
            }
            LexErrorKind::MismatchedClose { name } => write!(
                f,
                "closing tag for shortcode '{}' does not match start tag",
                name
            ),
            LexErrorKind::UnclosedShortcode => write!(f, "unclosed shortcode"),
            LexErrorKind::MixedPositional { name } => write!(
                f,
                "got positional parameter '{}'. Cannot mix named and positional parameters",
                name
            ),
            LexErrorKind::MixedQuotedPositional => write!(
                f,
                "got quoted positional parameter. Cannot mix named and positional parameters"
            ),
            LexErrorKind::MixedNamed { name } => write!(
                f,
                "got named parameter '{}'. Cannot mix named and positional parameters",
                name
            ),
            LexErrorKind::UnterminatedQuote { rest } => write!(
                f,
                "unterminated quoted string in shortcode parameter-argument: '{}'",
                rest
            ),
            LexErrorKind::UnterminatedRawString { rest } => write!(
                f,
                "unterminated raw string in shortcode parameter-argument: '{}'",
                rest
            ),
            LexErrorKind::UnclosedComment => write!(f, "comment must be closed"),
        }
    }
}

/// A lexer error with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// The kind of error.
    pub kind: LexErrorKind,
    /// Source location.
    pub span: Span,
}

impl LexError {
    /// Create a new lex error.
    pub fn new(kind: LexErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Render this error with ariadne.
    ///
    /// Returns a string containing the formatted error message with source context.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let range: std::ops::Range<usize> = self.clamped(source).into();
        let mut report = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_config(Config::default().with_index_type(IndexType::Byte))
            .with_message(self.kind.to_string())
            .with_label(
                Label::new((filename, range))
                    .with_message(self.kind.label())
                    .with_color(Color::Red),
            );
        if let Some(help) = self.kind.help() {
            report = report.with_help(help);
        }
        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    /// The error span limited to `source`, widened to one character when empty
    /// so the label has something to point at.
    fn clamped(&self, source: &str) -> Span {
        let len = source.len() as u32;
        let start = self.span.start.min(len);
        let end = self.span.end.clamp(start, len);
        if start == end {
            let width = source
                .get(start as usize..)
                .and_then(|rest| rest.chars().next())
                .map_or(0, |c| c.len_utf8() as u32);
            Span::new(start, start + width)
        } else {
            Span::new(start, end)
        }
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.span.start)
    }
}

impl std::error::Error for LexError {}
