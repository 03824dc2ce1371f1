use logos::Logos;
use smol_str::SmolStr;
use std::fmt::Display;

use crate::{escape::unescape, util::Spanned};

#[derive(Debug, Clone, Copy, PartialEq, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
enum LexerToken {
    #[token("(")]
    OpenList,
    #[token(")")]
    CloseList,
    #[regex(r#"[^ \t\r\n\f\(\)";]+"#)]
    BareAtom,
    #[regex(r#""([^"\\]|\\(.|\n))*""#)]
    QuotedAtom,
    #[regex(r#""([^"\\]|\\(.|\n))*\\?"#)]
    UnterminatedAtom,
    #[regex(r";[^\n]*")]
    LineComment,
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,
}

/// A token of the design-file grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    LeftParen,
    RightParen,
    Symbol(SmolStr),
    /// A bare atom that looks numeric. The parser decides whether it really is one.
    Number(SmolStr),
    /// The unescaped body of a quoted string.
    QuotedString(SmolStr),
    EndOfFile,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LeftParen => f.write_str("`(`"),
            Token::RightParen => f.write_str("`)`"),
            Token::Symbol(text) | Token::Number(text) => write!(f, "`{text}`"),
            Token::QuotedString(text) => write!(f, "{text:?}"),
            Token::EndOfFile => f.write_str("end of file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },
    #[error("line {line}: malformed escape sequence")]
    InvalidEscape { line: usize },
    #[error("line {line}: syntax error")]
    Unexpected { line: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedString { line } => *line,
            LexError::InvalidEscape { line } => *line,
            LexError::Unexpected { line } => *line,
        }
    }
}

/// Lazily splits source text into [`Token`]s, skipping whitespace and comments.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LexerToken>,
    source: &'a str,
    line: usize,
    scanned: usize,
    text: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: LexerToken::lexer(source),
            source,
            line: 1,
            scanned: 0,
            text: "",
        }
    }

    /// Produces the next token. Once the input is exhausted this keeps returning
    /// [`Token::EndOfFile`].
    pub fn next_token(&mut self) -> Result<Spanned<Token>, LexError> {
        loop {
            let Some(result) = self.inner.next() else {
                let end = self.source.len();
                self.count_lines(end);
                self.text = "";
                return Ok(Spanned::new(Token::EndOfFile, end..end, self.line));
            };

            let span = self.inner.span();
            self.count_lines(span.start);
            let line = self.line;
            let slice = self.inner.slice();
            self.count_lines(span.end);
            self.text = slice;

            let token = match result.map_err(|()| LexError::Unexpected { line })? {
                LexerToken::OpenList => Token::LeftParen,
                LexerToken::CloseList => Token::RightParen,
                LexerToken::BareAtom => classify(slice),
                LexerToken::QuotedAtom => {
                    let body = &slice[1..slice.len() - 1];
                    let unescaped = unescape(body).ok_or(LexError::InvalidEscape { line })?;
                    Token::QuotedString(unescaped.into())
                }
                LexerToken::UnterminatedAtom => return Err(LexError::UnterminatedString { line }),
                LexerToken::LineComment | LexerToken::BlockComment => continue,
            };

            return Ok(Spanned::new(token, span, line));
        }
    }

    /// The raw source text of the most recently produced token, quotes included.
    pub fn current_text(&self) -> &'a str {
        self.text
    }

    fn count_lines(&mut self, to: usize) {
        if to > self.scanned {
            let newlines = self.source[self.scanned..to]
                .bytes()
                .filter(|byte| *byte == b'\n')
                .count();
            self.line += newlines;
            self.scanned = to;
        }
    }
}

fn classify(text: &str) -> Token {
    let mut chars = text.chars();
    let numeric = match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-' | '+') => matches!(chars.next(), Some(c) if c.is_ascii_digit() || c == '.'),
        Some('.') => matches!(chars.next(), Some(c) if c.is_ascii_digit()),
        _ => false,
    };

    if numeric {
        Token::Number(text.into())
    } else {
        Token::Symbol(text.into())
    }
}

#[cfg(test)]
mod test {
    use super::{LexError, Lexer, Token};
    use rstest::rstest;

    fn tokens(source: &str) -> Result<Vec<(Token, usize)>, LexError> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token()?;
            if token.inner == Token::EndOfFile {
                return Ok(out);
            }
            out.push((token.inner, token.line));
        }
    }

    #[test]
    fn test_list_tokens() {
        let tokens = tokens(r#"(at 1.5 -2 "a b")"#).unwrap();
        let kinds: Vec<Token> = tokens.into_iter().map(|(token, _)| token).collect();
        assert_eq!(
            kinds,
            vec![
                Token::LeftParen,
                Token::Symbol("at".into()),
                Token::Number("1.5".into()),
                Token::Number("-2".into()),
                Token::QuotedString("a b".into()),
                Token::RightParen,
            ]
        );
    }

    #[rstest]
    #[case("12", true)]
    #[case("-0.5", true)]
    #[case("+3", true)]
    #[case(".25", true)]
    #[case("-.25", true)]
    #[case("F.Cu", false)]
    #[case("-", false)]
    #[case("a/b", false)]
    #[case("1abc", true)]
    fn test_number_classification(#[case] text: &str, #[case] numeric: bool) {
        let tokens = tokens(text).unwrap();
        assert_eq!(numeric, matches!(tokens[0].0, Token::Number(_)));
    }

    #[test]
    fn test_comments_are_skipped_and_lines_counted() {
        let source = "; header comment\n(a /* block\ncomment */ b\n  \"multi\nline\" c)";
        let tokens = tokens(source).unwrap();
        let lines: Vec<usize> = tokens.iter().map(|(_, line)| *line).collect();
        assert_eq!(lines, vec![2, 2, 3, 4, 5, 5]);
        assert_eq!(tokens[3].0, Token::QuotedString("multi\nline".into()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokens("(a\n\"never closed)").unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { line: 2 });
    }

    #[test]
    fn test_current_text_is_raw() {
        let mut lexer = Lexer::new(r#"(name "a\"b")"#);
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let token = lexer.next_token().unwrap();
        assert_eq!(token.inner, Token::QuotedString("a\"b".into()));
        assert_eq!(lexer.current_text(), r#""a\"b""#);
    }

    #[test]
    fn test_end_of_file_repeats() {
        let mut lexer = Lexer::new("()");
        for _ in 0..2 {
            lexer.next_token().unwrap();
        }
        assert_eq!(lexer.next_token().unwrap().inner, Token::EndOfFile);
        assert_eq!(lexer.next_token().unwrap().inner, Token::EndOfFile);
    }
}
