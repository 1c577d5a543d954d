//! A lexer for shortcode markup: `{{< name args >}}` and `{{% name args %}}`
//! tags embedded in free-form text.
//!
//! The [`Lexer`] turns a document into a flat stream of [`Token`]s which a
//! caller builds structure from. All lexical errors, including mismatched
//! closing tags and mixed positional/named parameters, end the stream with a
//! single [`TokenKind::Error`] token.
//!
//! ```
//! use shortcode_lexer::{lex, TokenKind};
//!
//! let kinds: Vec<_> = lex("{{< figure src=\"a.png\" />}}").iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     [
//!         TokenKind::LeftDelimRaw,
//!         TokenKind::TagName,
//!         TokenKind::Param,
//!         TokenKind::ParamValue,
//!         TokenKind::TagClose,
//!         TokenKind::RightDelimRaw,
//!         TokenKind::EndOfInput,
//!     ]
//! );
//! ```

mod span;
pub use span::Span;

mod token;
pub use token::{Token, TokenKind};

mod error;
pub use error::{LexError, LexErrorKind};

mod lexer;
pub use lexer::{Flavor, Lexer, lex};
