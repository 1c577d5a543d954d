//! Token types for the shortcode lexer.

use std::borrow::Cow;
use std::fmt;

use crate::Span;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum TokenKind {
    /// Plain text outside of any shortcode, or the pieces of a comment span.
    Text,
    /// End of input. Always the last token of a successful stream.
    EndOfInput,
    /// Lexer error; the token value holds the message.
    Error,

    // Delimiters
    /// `{{<`
    LeftDelimRaw,
    /// `>}}`
    RightDelimRaw,
    /// `{{%`
    LeftDelimMarkup,
    /// `%}}`
    RightDelimMarkup,

    // Tag content
    /// `/`, either opening a closing tag or self-closing a tag
    TagClose,
    /// Shortcode name: `figure`, `sc/sub`
    TagName,
    /// Positional parameter value, or the name of a named parameter
    Param,
    /// Value bound to the preceding named [`TokenKind::Param`]
    ParamValue,
}

impl TokenKind {
    /// Whether this token ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenKind::EndOfInput | TokenKind::Error)
    }

    pub fn is_left_delim(&self) -> bool {
        matches!(self, TokenKind::LeftDelimRaw | TokenKind::LeftDelimMarkup)
    }

    pub fn is_right_delim(&self) -> bool {
        matches!(self, TokenKind::RightDelimRaw | TokenKind::RightDelimMarkup)
    }

    /// Whether this is a delimiter of the markup flavor (`{{%` or `%}}`).
    pub fn is_markup_delim(&self) -> bool {
        matches!(
            self,
            TokenKind::LeftDelimMarkup | TokenKind::RightDelimMarkup
        )
    }
}

/// A token with its kind, span, and value.
///
/// `value` borrows from the input whenever it can. It is owned for
/// parameter values whose escaped quotes were rewritten, and for errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span in the input. For errors this starts at the offending construct.
    pub span: Span,
    /// The text the token denotes: delimiters literally, parameter values
    /// without quotes, or the error message.
    pub value: Cow<'src, str>,
}

impl<'src> Token<'src> {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, value: impl Into<Cow<'src, str>>) -> Self {
        Self {
            kind,
            span,
            value: value.into(),
        }
    }

    /// 0-based byte offset of the token in the input.
    #[inline]
    pub fn position(&self) -> u32 {
        self.span.start
    }

    /// Offset of the token in an enclosing document that starts the input at `base`.
    #[inline]
    pub fn absolute_position(&self, base: u32) -> u32 {
        self.span.start + base
    }

    pub fn is_text(&self) -> bool {
        self.kind == TokenKind::Text
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EndOfInput
    }

    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }

    /// End of input or error.
    pub fn is_done(&self) -> bool {
        self.kind.is_terminal()
    }

    pub fn is_left_delim(&self) -> bool {
        self.kind.is_left_delim()
    }

    pub fn is_right_delim(&self) -> bool {
        self.kind.is_right_delim()
    }

    pub fn is_markup_delim(&self) -> bool {
        self.kind.is_markup_delim()
    }

    pub fn is_tag_close(&self) -> bool {
        self.kind == TokenKind::TagClose
    }

    pub fn is_name(&self) -> bool {
        self.kind == TokenKind::TagName
    }

    pub fn is_param(&self) -> bool {
        self.kind == TokenKind::Param
    }

    pub fn is_param_value(&self) -> bool {
        self.kind == TokenKind::ParamValue
    }

    /// Detach the token from the input it was lexed from.
    pub fn into_owned(self) -> Token<'static> {
        Token {
            kind: self.kind,
            span: self.span,
            value: Cow::Owned(self.value.into_owned()),
        }
    }
}

/// Values longer than this are cut in [`Display`](fmt::Display) output.
const DISPLAY_MAX: usize = 50;

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::EndOfInput => write!(f, "EOF"),
            TokenKind::Error => write!(f, "error@{}: {}", self.span.start, self.value),
            _ if self.value.chars().count() > DISPLAY_MAX => {
                let head: String = self.value.chars().take(20).collect();
                write!(f, "{:?}@{}: {:?}...", self.kind, self.span.start, head)
            }
            _ => write!(f, "{:?}@{}: {:?}", self.kind, self.span.start, self.value),
        }
    }
}
