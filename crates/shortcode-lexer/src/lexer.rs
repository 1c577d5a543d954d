//! Lexer for shortcode markup embedded in text.

use std::borrow::Cow;
use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::{LexError, LexErrorKind, Span, Token, TokenKind};

/// Opens a comment when it directly follows a left delimiter.
const COMMENT_START: &str = "/*";
/// Closes a comment when it directly precedes a right delimiter.
const COMMENT_END: &str = "*/";
/// Opens and closes an escaped-quote value.
const ESCAPED_QUOTE: &str = "\\\"";

/// Delimiter family of a shortcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum Flavor {
    /// `{{< name >}}`: inner content is passed through as is.
    Raw,
    /// `{{% name %}}`: inner content goes through markup rendering.
    Markup,
}

impl Flavor {
    pub fn left_delim(self) -> &'static str {
        match self {
            Flavor::Raw => "{{<",
            Flavor::Markup => "{{%",
        }
    }

    pub fn right_delim(self) -> &'static str {
        match self {
            Flavor::Raw => ">}}",
            Flavor::Markup => "%}}",
        }
    }

    fn left_kind(self) -> TokenKind {
        match self {
            Flavor::Raw => TokenKind::LeftDelimRaw,
            Flavor::Markup => TokenKind::LeftDelimMarkup,
        }
    }

    fn right_kind(self) -> TokenKind {
        match self {
            Flavor::Raw => TokenKind::RightDelimRaw,
            Flavor::Markup => TokenKind::RightDelimMarkup,
        }
    }

    /// `*/` followed by the right delimiter.
    fn comment_close(self) -> &'static str {
        match self {
            Flavor::Raw => "*/>}}",
            Flavor::Markup => "*/%}}",
        }
    }
}

/// Which kind of parameters the current tag takes. Fixed by the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParamMode {
    #[default]
    Unset,
    Positional,
    Named,
}

/// State scoped to one tag span, reset at every left delimiter.
#[derive(Debug, Clone)]
struct TagState {
    flavor: Flavor,
    mode: ParamMode,
    /// Name of an opening tag, pushed on the stack at its right delimiter.
    name: Option<String>,
    self_closing: bool,
}

impl TagState {
    fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            mode: ParamMode::Unset,
            name: None,
            self_closing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Plain text outside of shortcodes.
    Text,
    /// At a left delimiter, before deciding between a tag and a comment.
    LeftDelim(Flavor),
    /// Just past `{{<` with `/*` ahead.
    Comment(Flavor),
    /// After the left delimiter: closing marker or name.
    TagStart,
    Name,
    ClosingName,
    /// After a closing tag's name; only the right delimiter may follow.
    EndOfClosingTag,
    Params,
    RightDelim,
    Done,
}

/// A lexer that produces tokens from text containing shortcodes.
///
/// Tokens are produced on demand, either through [`Lexer::next_token`] or
/// the [`Iterator`] impl. The stream always ends with exactly one
/// [`TokenKind::EndOfInput`] or [`TokenKind::Error`] token.
#[derive(Clone)]
pub struct Lexer<'src> {
    /// Document name, used in diagnostics.
    name: String,
    /// The source text being lexed.
    source: &'src str,
    /// The remaining source text (suffix of `source`).
    remaining: &'src str,
    /// Current byte position in `source`.
    pos: u32,
    /// Offset of `source` in an enclosing document.
    start_position: u32,

    state: State,
    /// Tokens produced by the last step, not yet handed out.
    pending: VecDeque<Token<'src>>,
    /// Names of the shortcodes opened and not yet closed, innermost last.
    open: Vec<String>,
    /// Whether any shortcode name has been lexed so far.
    seen_name: bool,
    tag: TagState,
    error: Option<LexError>,
    /// Set once the iterator has yielded the terminal token.
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Create a lexer for `source`.
    ///
    /// `name` and `start_position` are metadata for diagnostics and for
    /// inputs cut from a larger document. They do not change tokenization.
    pub fn new(name: impl Into<String>, source: &'src str, start_position: u32) -> Self {
        Self {
            name: name.into(),
            source,
            remaining: source,
            pos: 0,
            start_position,
            state: State::Text,
            pending: VecDeque::new(),
            open: Vec::new(),
            seen_name: false,
            tag: TagState::new(Flavor::Raw),
            error: None,
            finished: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset of the input in its enclosing document.
    pub fn start_position(&self) -> u32 {
        self.start_position
    }

    /// Get the current byte position.
    #[inline]
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// The error that ended the stream, once it has been produced.
    pub fn error(&self) -> Option<&LexError> {
        self.error.as_ref()
    }

    /// Render the error that ended the stream, using the lexer name as file name.
    pub fn render_error(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|err| err.render(&self.name, self.source))
    }

    /// Get the next token.
    ///
    /// Once the terminal token has been returned, further calls keep
    /// returning [`TokenKind::EndOfInput`].
    pub fn next_token(&mut self) -> Token<'src> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return token;
            }
            if self.state == State::Done {
                return Token::new(TokenKind::EndOfInput, Span::empty(self.pos), "");
            }
            let next = self.step(self.state);
            trace!("State {:?} -> {:?} at {}", self.state, next, self.pos);
            self.state = next;
        }
    }

    fn step(&mut self, state: State) -> State {
        match state {
            State::Text => self.lex_text(),
            State::LeftDelim(flavor) => self.lex_left_delim(flavor),
            State::Comment(flavor) => self.lex_comment(flavor),
            State::TagStart => self.lex_tag_start(),
            State::Name => self.lex_name(),
            State::ClosingName => self.lex_closing_name(),
            State::EndOfClosingTag => self.lex_end_of_closing_tag(),
            State::Params => self.lex_params(),
            State::RightDelim => self.lex_right_delim(),
            State::Done => State::Done,
        }
    }

    /// Peek at the next character without consuming it.
    #[inline]
    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    /// Peek at the nth character (0-indexed) without consuming.
    #[inline]
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining.chars().nth(n)
    }

    /// Advance by one character and return it.
    #[inline]
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.advance_by(c.len_utf8());
        Some(c)
    }

    /// Advance by n bytes.
    #[inline]
    fn advance_by(&mut self, n: usize) {
        self.pos += n as u32;
        self.remaining = &self.remaining[n..];
    }

    /// Check if the remaining text starts with the given prefix.
    #[inline]
    fn starts_with(&self, prefix: &str) -> bool {
        self.remaining.starts_with(prefix)
    }

    /// `/` directly followed by the current right delimiter.
    fn at_self_close(&self) -> bool {
        self.remaining
            .strip_prefix('/')
            .is_some_and(|rest| rest.starts_with(self.tag.flavor.right_delim()))
    }

    /// Skip spaces, tabs and line breaks.
    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\r' | '\n') = self.peek() {
            self.advance();
        }
    }

    fn skip_horizontal_whitespace(&mut self) {
        while let Some(' ' | '\t') = self.peek() {
            self.advance();
        }
    }

    /// Queue a token spanning from `start` to the current position.
    fn emit(&mut self, kind: TokenKind, start: u32) {
        let span = Span::new(start, self.pos);
        let text = &self.source[start as usize..self.pos as usize];
        self.emit_value(kind, span, Cow::Borrowed(text));
    }

    fn emit_value(&mut self, kind: TokenKind, span: Span, value: Cow<'src, str>) {
        trace!("Token {:?} at {:?}: {:?}", kind, span, value);
        self.pending.push_back(Token::new(kind, span, value));
    }

    /// Queue the error token and end the stream.
    fn fail(&mut self, kind: LexErrorKind, span: Span) -> State {
        let message = kind.to_string();
        debug!("{} at {:?} in {}", message, span, self.name);
        self.pending.push_back(Token::new(TokenKind::Error, span, message));
        self.error = Some(LexError::new(kind, span));
        State::Done
    }

    /// Fail on whatever stops a word from starting at the cursor.
    fn fail_at_cursor(&mut self) -> State {
        match self.peek() {
            None => self.fail(LexErrorKind::UnclosedAction, Span::empty(self.pos)),
            Some(c) => self.fail(
                LexErrorKind::UnrecognizedCharacter(c),
                Span::new(self.pos, self.pos + c.len_utf8() as u32),
            ),
        }
    }

    /// Scan a name or unquoted value.
    ///
    /// A word starts with a word character. A later `/` belongs to the word
    /// unless it self-closes the tag.
    fn scan_word(&mut self) -> &'src str {
        let start = self.pos as usize;
        while let Some(c) = self.peek() {
            if c == '/' {
                if self.pos as usize == start || self.at_self_close() {
                    break;
                }
            } else if !is_word_char(c) {
                break;
            }
            self.advance();
        }
        &self.source[start..self.pos as usize]
    }

    fn lex_text(&mut self) -> State {
        let start = self.pos;
        loop {
            let Some(i) = self.remaining.find("{{") else {
                self.advance_by(self.remaining.len());
                self.emit_text(start);
                self.emit(TokenKind::EndOfInput, self.pos);
                return State::Done;
            };
            self.advance_by(i);
            if let Some(flavor) = self.left_delim_ahead() {
                self.emit_text(start);
                return State::LeftDelim(flavor);
            }
            // `{{` not followed by a delimiter character; move past one brace
            // so `{{{<` still finds its delimiter.
            self.advance_by(1);
        }
    }

    fn left_delim_ahead(&self) -> Option<Flavor> {
        [Flavor::Raw, Flavor::Markup]
            .into_iter()
            .find(|flavor| self.starts_with(flavor.left_delim()))
    }

    fn emit_text(&mut self, start: u32) {
        if self.pos > start {
            self.emit(TokenKind::Text, start);
        }
    }

    fn lex_left_delim(&mut self, flavor: Flavor) -> State {
        let start = self.pos;
        self.advance_by(flavor.left_delim().len());
        if self.starts_with(COMMENT_START) {
            return State::Comment(flavor);
        }
        self.emit(flavor.left_kind(), start);
        self.tag = TagState::new(flavor);
        State::TagStart
    }

    /// Emit a comment span as three text tokens: the left delimiter, the
    /// content between `/*` and `*/`, and the right delimiter.
    fn lex_comment(&mut self, flavor: Flavor) -> State {
        let delim_start = self.pos - flavor.left_delim().len() as u32;
        let body = &self.remaining[COMMENT_START.len()..];
        let Some(content_len) = body.find(flavor.comment_close()) else {
            let span = Span::new(delim_start, self.pos + COMMENT_START.len() as u32);
            return self.fail(LexErrorKind::UnclosedComment, span);
        };

        self.emit(TokenKind::Text, delim_start);
        self.advance_by(COMMENT_START.len());
        let content_start = self.pos;
        self.advance_by(content_len);
        self.emit(TokenKind::Text, content_start);
        self.advance_by(COMMENT_END.len());
        let close_start = self.pos;
        self.advance_by(flavor.right_delim().len());
        self.emit(TokenKind::Text, close_start);
        State::Text
    }

    fn lex_tag_start(&mut self) -> State {
        self.skip_whitespace();
        match self.peek() {
            None => self.fail(LexErrorKind::UnclosedAction, Span::empty(self.pos)),
            Some('/') => {
                let start = self.pos;
                self.advance();
                self.emit(TokenKind::TagClose, start);
                if self.open.is_empty() && !self.seen_name {
                    return self.fail(LexErrorKind::CloseWithoutOpen, Span::new(start, self.pos));
                }
                State::ClosingName
            }
            Some(_) => State::Name,
        }
    }

    fn lex_name(&mut self) -> State {
        let start = self.pos;
        let word = self.scan_word();
        if word.is_empty() {
            return self.fail_at_cursor();
        }
        self.seen_name = true;
        self.tag.name = Some(word.to_string());
        self.emit(TokenKind::TagName, start);
        State::Params
    }

    fn lex_closing_name(&mut self) -> State {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.scan_word();
        if word.is_empty() {
            return self.fail_at_cursor();
        }
        // Shortcodes opened after the one being closed never got a closing
        // tag, so they were standalone.
        match self.open.iter().rposition(|name| name == word) {
            Some(depth) => {
                if depth + 1 < self.open.len() {
                    debug!(
                        "closing '{}' ends standalone {:?}",
                        word,
                        &self.open[depth + 1..]
                    );
                }
                self.open.truncate(depth);
            }
            None => {
                let kind = LexErrorKind::MismatchedClose {
                    name: word.to_string(),
                };
                return self.fail(kind, Span::new(start, self.pos));
            }
        }
        self.emit(TokenKind::TagName, start);
        State::EndOfClosingTag
    }

    fn lex_end_of_closing_tag(&mut self) -> State {
        self.skip_whitespace();
        if self.starts_with(self.tag.flavor.right_delim()) {
            return State::RightDelim;
        }
        let width = self.peek().map_or(0, char::len_utf8) as u32;
        self.fail(
            LexErrorKind::UnclosedShortcode,
            Span::new(self.pos, self.pos + width),
        )
    }

    fn lex_params(&mut self) -> State {
        self.skip_whitespace();
        if self.starts_with(self.tag.flavor.right_delim()) {
            return State::RightDelim;
        }
        match self.peek() {
            None => self.fail(LexErrorKind::UnclosedAction, Span::empty(self.pos)),
            Some('/') if self.at_self_close() => {
                let start = self.pos;
                self.advance();
                self.emit(TokenKind::TagClose, start);
                self.tag.self_closing = true;
                State::RightDelim
            }
            Some('"' | '`') => self.lex_quoted_positional(),
            Some('\\') if self.peek_nth(1) == Some('"') => self.lex_quoted_positional(),
            Some(_) => self.lex_word_param(),
        }
    }

    fn lex_quoted_positional(&mut self) -> State {
        if self.tag.mode == ParamMode::Named {
            let width = if self.starts_with(ESCAPED_QUOTE) { 2 } else { 1 };
            return self.fail(
                LexErrorKind::MixedQuotedPositional,
                Span::new(self.pos, self.pos + width),
            );
        }
        self.tag.mode = ParamMode::Positional;
        self.lex_quoted(TokenKind::Param)
    }

    /// A bare positional value, or the name of a named parameter.
    fn lex_word_param(&mut self) -> State {
        let start = self.pos;
        let word = self.scan_word();
        if word.is_empty() {
            return self.fail_at_cursor();
        }
        let span = Span::new(start, self.pos);

        if self.peek() == Some('=') {
            if self.tag.mode == ParamMode::Positional {
                let kind = LexErrorKind::MixedNamed {
                    name: word.to_string(),
                };
                return self.fail(kind, span);
            }
            self.tag.mode = ParamMode::Named;
            self.emit(TokenKind::Param, start);
            self.advance();
            self.skip_horizontal_whitespace();
            return self.lex_param_value();
        }

        if self.tag.mode == ParamMode::Named {
            let kind = LexErrorKind::MixedPositional {
                name: word.to_string(),
            };
            return self.fail(kind, span);
        }
        self.tag.mode = ParamMode::Positional;
        self.emit(TokenKind::Param, start);
        State::Params
    }

    /// The value after `name=`.
    fn lex_param_value(&mut self) -> State {
        match self.peek() {
            Some('"' | '`') => self.lex_quoted(TokenKind::ParamValue),
            Some('\\') if self.peek_nth(1) == Some('"') => self.lex_quoted(TokenKind::ParamValue),
            _ => {
                let start = self.pos;
                if self.scan_word().is_empty() {
                    return self.fail_at_cursor();
                }
                self.emit(TokenKind::ParamValue, start);
                State::Params
            }
        }
    }

    /// Lex a value opened by `"`, `\"` or a backtick; the cursor is on the opener.
    fn lex_quoted(&mut self, kind: TokenKind) -> State {
        if self.starts_with(ESCAPED_QUOTE) {
            self.advance_by(ESCAPED_QUOTE.len());
            let start = self.pos;
            let Some(len) = self.remaining.find(ESCAPED_QUOTE) else {
                return self.unterminated_quote(start);
            };
            self.advance_by(len);
            self.emit(kind, start);
            self.advance_by(ESCAPED_QUOTE.len());
            return State::Params;
        }

        if self.starts_with("`") {
            self.advance();
            let start = self.pos;
            let Some(len) = self.remaining.find('`') else {
                let kind = LexErrorKind::UnterminatedRawString {
                    rest: self.remaining.to_string(),
                };
                return self.fail(kind, Span::new(start, self.source.len() as u32));
            };
            self.advance_by(len);
            self.emit(kind, start);
            self.advance();
            return State::Params;
        }

        // Plain `"`: `\"` inside is an escaped quote.
        self.advance();
        let start = self.pos;
        let mut has_escapes = false;
        loop {
            match self.peek() {
                None => return self.unterminated_quote(start),
                Some('\\') if self.peek_nth(1) == Some('"') => {
                    has_escapes = true;
                    self.advance_by(ESCAPED_QUOTE.len());
                }
                Some('"') => break,
                Some(_) => {
                    self.advance();
                }
            }
        }
        let span = Span::new(start, self.pos);
        let raw = &self.source[start as usize..self.pos as usize];
        let value = if has_escapes {
            Cow::Owned(raw.replace(ESCAPED_QUOTE, "\""))
        } else {
            Cow::Borrowed(raw)
        };
        self.emit_value(kind, span, value);
        self.advance();
        State::Params
    }

    fn unterminated_quote(&mut self, start: u32) -> State {
        let rest = self.source[start as usize..].to_string();
        self.fail(
            LexErrorKind::UnterminatedQuote { rest },
            Span::new(start, self.source.len() as u32),
        )
    }

    fn lex_right_delim(&mut self) -> State {
        let start = self.pos;
        let flavor = self.tag.flavor;
        self.advance_by(flavor.right_delim().len());
        self.emit(flavor.right_kind(), start);
        if let Some(name) = self.tag.name.take()
            && !self.tag.self_closing
        {
            self.open.push(name);
        }
        State::Text
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        self.finished = token.is_done();
        Some(token)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

/// Lex a whole input, including the terminal token.
pub fn lex(source: &str) -> Vec<Token<'_>> {
    Lexer::new("", source, 0).collect()
}

/// Characters allowed in names and unquoted values, besides an inner `/`.
/// Letters plus ASCII decimal digits; other numeric characters such as `²`
/// are rejected.
fn is_word_char(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')
}
