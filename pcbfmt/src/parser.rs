//! Recursive-descent reading of token streams.
use crate::lexer::{LexError, Lexer, Token};
use crate::util::Spanned;
use delegate::delegate;
use smol_str::SmolStr;
use std::fmt::Display;
use std::ops::Range;

/// How deeply lists may nest before the input is rejected.
pub const MAX_DEPTH: usize = 256;

/// A parser stepping through the tokens of a source string with one token of lookahead.
///
/// The parser carries a context `C` that is handed to every [`Parse`] implementation,
/// so document-scoped lookup tables can be threaded through without global state.
pub struct Parser<'a, C> {
    lexer: Lexer<'a>,
    current: Spanned<Token>,
    context: C,
    /// Lists currently open through [`Parser::list`].
    depth: usize,
}

impl<'a, C> Parser<'a, C> {
    pub fn new(source: &'a str, context: C) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            context,
            depth: 0,
        })
    }

    #[inline]
    pub fn parse<T>(&mut self) -> Result<T>
    where
        T: Parse<C>,
    {
        T::parse(self)
    }

    /// The lookahead token.
    #[inline]
    pub fn peek(&self) -> &Token {
        &self.current.inner
    }

    /// Line of the lookahead token.
    #[inline]
    pub fn line(&self) -> usize {
        self.current.line
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.current.span.clone()
    }

    /// Consumes the lookahead token and returns it.
    pub fn advance(&mut self) -> Result<Spanned<Token>> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Whether the lookahead opens a list.
    #[inline]
    pub fn at_list(&self) -> bool {
        matches!(self.peek(), Token::LeftParen)
    }

    /// Whether the enclosing list has no more children. End of file counts as the
    /// end of a list so that loops over children always terminate; the closing
    /// paren check then reports the truncation.
    #[inline]
    pub fn at_list_end(&self) -> bool {
        matches!(self.peek(), Token::RightParen | Token::EndOfFile)
    }

    pub fn open(&mut self) -> Result<()> {
        match self.peek() {
            Token::LeftParen => self.advance().map(drop),
            _ => Err(self.expected("`(`")),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        match self.peek() {
            Token::RightParen => self.advance().map(drop),
            _ => Err(self.expected("`)`")),
        }
    }

    /// Parses a parenthesised list, using `f` for its contents.
    pub fn list<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.open()?;
        if self.depth == MAX_DEPTH {
            return Err(self.error(
                ErrorKind::TooDeep,
                format!("lists nested more than {MAX_DEPTH} deep"),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        let result = result?;
        self.close()?;
        Ok(result)
    }

    /// Reads the keyword that heads a list.
    pub fn keyword(&mut self) -> Result<SmolStr> {
        match self.peek() {
            Token::Symbol(text) | Token::Number(text) => {
                let text = text.clone();
                self.advance()?;
                Ok(text)
            }
            _ => Err(self.expected("keyword")),
        }
    }

    /// Reads a bare (unquoted) atom.
    pub fn symbol(&mut self) -> Result<SmolStr> {
        match self.peek() {
            Token::Symbol(text) | Token::Number(text) => {
                let text = text.clone();
                self.advance()?;
                Ok(text)
            }
            _ => Err(self.expected("symbol")),
        }
    }

    /// Reads a bare atom and converts it with `f`, failing without consuming the
    /// token when `f` rejects it.
    pub fn symbol_with<T>(&mut self, f: impl FnOnce(&str) -> Option<T>, what: &str) -> Result<T> {
        let value = match self.peek() {
            Token::Symbol(text) | Token::Number(text) => f(text),
            _ => None,
        };
        match value {
            Some(value) => {
                self.advance()?;
                Ok(value)
            }
            None => Err(self.expected(what)),
        }
    }

    /// Reads any atom, quoted or bare, as text.
    pub fn text(&mut self) -> Result<SmolStr> {
        match self.peek() {
            Token::Symbol(text) | Token::Number(text) | Token::QuotedString(text) => {
                let text = text.clone();
                self.advance()?;
                Ok(text)
            }
            _ => Err(self.expected("string")),
        }
    }

    pub fn number(&mut self) -> Result<f64> {
        let value = match self.peek() {
            Token::Number(text) => text.parse::<f64>().ok().filter(|value| value.is_finite()),
            _ => None,
        };
        match value {
            Some(value) => {
                self.advance()?;
                Ok(value)
            }
            None => Err(self.expected("number")),
        }
    }

    pub fn int(&mut self) -> Result<i64> {
        let value = match self.peek() {
            Token::Number(text) => text.parse::<i64>().ok(),
            _ => None,
        };
        match value {
            Some(value) => {
                self.advance()?;
                Ok(value)
            }
            None => Err(self.expected("integer")),
        }
    }

    /// Reads `yes`/`no` (or `true`/`false`).
    pub fn boolean(&mut self) -> Result<bool> {
        self.symbol_with(
            |text| match text {
                "yes" | "true" => Some(true),
                "no" | "false" => Some(false),
                _ => None,
            },
            "`yes` or `no`",
        )
    }

    /// Reads the value of a flag child such as `(locked)` or `(locked yes)`.
    pub fn flag(&mut self) -> Result<bool> {
        if self.at_list_end() {
            Ok(true)
        } else {
            self.boolean()
        }
    }

    /// Calls `f` with the keyword and line of each child list until the
    /// enclosing list ends. Each call must consume the child's contents.
    pub fn children<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, SmolStr, usize) -> Result<()>,
    {
        while !self.at_list_end() {
            self.list(|parser| {
                let line = parser.line();
                let keyword = parser.keyword()?;
                f(parser, keyword, line)
            })?;
        }
        Ok(())
    }

    /// Skips the lookahead value, which may be an atom or a whole list.
    pub fn skip_value(&mut self) -> Result<()> {
        if self.at_list() {
            self.list(|parser| parser.skip_rest())
        } else if self.at_list_end() {
            Err(self.expected("value"))
        } else {
            self.advance().map(drop)
        }
    }

    /// Skips everything up to, but not including, the paren closing the current list.
    pub fn skip_rest(&mut self) -> Result<()> {
        while !self.at_list_end() {
            self.skip_value()?;
        }
        Ok(())
    }

    /// Stores the value of a child that may appear at most once in its parent.
    pub fn once<T>(&self, slot: &mut Option<T>, keyword: &str, value: T) -> Result<()> {
        if slot.is_some() {
            return Err(self.error(
                ErrorKind::DuplicateField(keyword.into()),
                format!("duplicate `{keyword}`"),
            ));
        }
        *slot = Some(value);
        Ok(())
    }

    /// Unwraps a child that must have appeared in its parent.
    pub fn required<T>(&self, slot: Option<T>, keyword: &str) -> Result<T> {
        slot.ok_or_else(|| {
            self.error(
                ErrorKind::MissingField(keyword.into()),
                format!("missing required `{keyword}`"),
            )
        })
    }

    pub fn expect_end_of_file(&self) -> Result<()> {
        match self.peek() {
            Token::EndOfFile => Ok(()),
            _ => Err(self.expected("end of file")),
        }
    }

    /// An error located at the lookahead token.
    pub fn error(&self, kind: ErrorKind, message: impl Display) -> ParseError {
        ParseError::new(kind, message, self.line())
    }

    /// A syntax error reporting what was expected instead of the lookahead token.
    pub fn expected(&self, what: &str) -> ParseError {
        let found = match self.peek() {
            Token::EndOfFile => "end of file".to_string(),
            _ => format!("`{}`", self.current_text()),
        };
        ParseError::new(
            ErrorKind::Syntax {
                expected: what.into(),
            },
            format!("expected {what}, found {found}"),
            self.line(),
        )
    }

    #[inline]
    pub fn context(&self) -> &C {
        &self.context
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    delegate! {
        to self.lexer {
            /// Raw source text of the lookahead token.
            pub fn current_text(&self) -> &'a str;
        }
    }
}

/// Trait for types that can be parsed from an s-expression.
pub trait Parse<C = ()>: Sized {
    fn parse(parser: &mut Parser<'_, C>) -> Result<Self>;
}

impl<V: Parse<C>, C> Parse<C> for Vec<V> {
    fn parse(parser: &mut Parser<'_, C>) -> Result<Self> {
        let mut values = Vec::new();
        while !parser.at_list_end() {
            values.push(parser.parse()?);
        }
        Ok(values)
    }
}

impl<C> Parse<C> for SmolStr {
    fn parse(parser: &mut Parser<'_, C>) -> Result<Self> {
        parser.text()
    }
}

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A malformed token.
    Lexical,
    /// A token of the wrong kind, or a keyword other than the ones allowed.
    Syntax { expected: SmolStr },
    /// A required child was absent when its parent closed.
    MissingField(SmolStr),
    /// A child that may appear once appeared again.
    DuplicateField(SmolStr),
    /// The top-level keyword does not name a document this codec reads.
    UnknownDocument(SmolStr),
    /// A single-layer name missing from the layer table, with strict layers on.
    UnknownLayer(SmolStr),
    /// Lists nested deeper than [`MAX_DEPTH`].
    TooDeep,
}

/// A parse error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    kind: ErrorKind,
    message: String,
    line: usize,
    future_version: Option<u32>,
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: impl Display, line: usize) -> Self {
        ParseError {
            kind,
            message: message.to_string(),
            line,
            future_version: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// The document's format version, when it is newer than this codec understands.
    pub fn future_version(&self) -> Option<u32> {
        self.future_version
    }

    pub(crate) fn with_future_version(mut self, version: u32) -> Self {
        self.future_version = Some(version);
        self
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(ErrorKind::Lexical, &err, err.line())
    }
}

/// Shorthand for a result specialised to parse errors.
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Span within a string.
pub type Span = Range<usize>;

/// Parse a `T` from an s-expression string.
pub fn from_str<T: Parse>(source: &str) -> Result<T> {
    from_str_with_ctx(source, ()).map(|(value, ())| value)
}

/// Parse a `T` from an s-expression string in the given context, handing the
/// context back once the whole input has been consumed.
pub fn from_str_with_ctx<T: Parse<C>, C>(source: &str, context: C) -> Result<(T, C)> {
    let mut parser = Parser::new(source, context)?;
    let value = T::parse(&mut parser)?;
    parser.expect_end_of_file()?;
    Ok((value, parser.into_context()))
}
