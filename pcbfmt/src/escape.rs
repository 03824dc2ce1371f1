use logos::Logos;

/// Lexer token for a piece of a quoted string body.
#[derive(Debug, Clone, Logos)]
enum EscapedToken {
    #[token(r#"\n"#, |_| '\n')]
    #[token(r#"\r"#, |_| '\r')]
    #[token(r#"\t"#, |_| '\t')]
    #[token(r#"\""#, |_| '"')]
    #[token(r#"\\"#, |_| '\\')]
    #[token(r#"\a"#, |_| '\u{07}')]
    #[token(r#"\b"#, |_| '\u{08}')]
    #[token(r#"\f"#, |_| '\u{0C}')]
    #[token(r#"\v"#, |_| '\u{0B}')]
    Escaped(char),

    #[regex(r#"\\x[a-fA-F0-9][a-fA-F0-9]"#, |lex| parse_hex(lex.slice()))]
    Hex(char),

    /// A backslash before a character with no special meaning; kept as written.
    #[regex(r#"\\[^\\]"#, priority = 1)]
    Verbatim,

    #[regex(r#"[^\\]"#)]
    Literal,
}

/// Parses a hex escape sequence of the form `\xHH`.
fn parse_hex(str: &str) -> Option<char> {
    let hex = str.get(2..)?;
    let code = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(code)
}

/// Replaces escape sequences with their corresponding characters.
///
/// Returns `None` when the body ends in a lone backslash.
pub fn unescape(str: &str) -> Option<String> {
    let mut lexer = EscapedToken::lexer(str);
    let mut output = String::with_capacity(str.len());

    while let Some(token) = lexer.next() {
        let token = token.ok()?;

        match token {
            EscapedToken::Escaped(c) => output.push(c),
            EscapedToken::Hex(c) => output.push(c),
            EscapedToken::Verbatim | EscapedToken::Literal => output.push_str(lexer.slice()),
        }
    }

    Some(output)
}

/// Quotes a string, escaping the characters that would otherwise end it early
/// or break the line structure of a file.
pub fn escape_string(str: &str) -> String {
    let mut output = String::with_capacity(str.len() + 2);
    output.push('"');

    for c in str.chars() {
        match c {
            '\n' => output.push_str(r#"\n"#),
            '\r' => output.push_str(r#"\r"#),
            '\t' => output.push_str(r#"\t"#),
            '"' => output.push_str(r#"\""#),
            '\\' => output.push_str(r#"\\"#),
            c => output.push(c),
        }
    }

    output.push('"');
    output
}

#[cfg(test)]
mod test {
    use super::{escape_string, unescape};
    use rstest::rstest;

    #[rstest]
    #[case("string", r#""string""#)]
    #[case("", r#""""#)]
    #[case("hello world", r#""hello world""#)]
    #[case("a\"b", r#""a\"b""#)]
    #[case(r"C:\lib", r#""C:\\lib""#)]
    #[case("two\nlines", r#""two\nlines""#)]
    fn test_escape_string(#[case] string: &str, #[case] expected: &str) {
        assert_eq!(expected, escape_string(string));
    }

    #[rstest]
    #[case(r#"\""#, "\"")]
    #[case(r"\\", "\\")]
    #[case(r"a\nb", "a\nb")]
    #[case(r"\x41\x42", "AB")]
    #[case(r"\q", r"\q")]
    #[case(r"\xZ1", r"\xZ1")]
    #[case(r"${KIPRJMOD}/lib.pretty", "${KIPRJMOD}/lib.pretty")]
    #[case("Ω 10k", "Ω 10k")]
    fn test_unescape(#[case] escaped: &str, #[case] expected: &str) {
        assert_eq!(expected, unescape(escaped).unwrap());
    }

    #[test]
    fn test_unescape_reverses_escape() {
        let original = "quote \" slash \\ tab \t end";
        let escaped = escape_string(original);
        let body = &escaped[1..escaped.len() - 1];
        assert_eq!(original, unescape(body).unwrap());
    }
}
