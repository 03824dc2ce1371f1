use crate::lexer::Token;
use crate::parser::{Parse, Parser};
use crate::printer::{Print, Printer};
use smol_str::SmolStr;

/// A leaf of an s-expression, remembering how it was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    Symbol(SmolStr),
    Number(SmolStr),
    String(SmolStr),
}

impl Atom {
    pub fn as_str(&self) -> &str {
        match self {
            Atom::Symbol(text) | Atom::Number(text) | Atom::String(text) => text,
        }
    }
}

/// An s-expression represented as a recursive enum.
///
/// Used for blobs whose schema the codec does not model, so they survive a
/// read/write cycle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Atom(Atom),
    List(Vec<Value>),
}

impl Value {
    pub fn symbol(text: impl Into<SmolStr>) -> Self {
        Value::Atom(Atom::Symbol(text.into()))
    }

    pub fn string(text: impl Into<SmolStr>) -> Self {
        Value::Atom(Atom::String(text.into()))
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Value::Atom(atom) => Some(atom.as_str()),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            Value::Atom(_) => None,
        }
    }

    /// The leading symbol of a list.
    pub fn keyword(&self) -> Option<&str> {
        match self.as_list()?.first()? {
            Value::Atom(Atom::Symbol(text)) => Some(text),
            _ => None,
        }
    }

    /// Finds the first child list whose keyword is `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_list()?
            .iter()
            .find(|item| item.keyword() == Some(key))
    }
}

impl<C> Parse<C> for Value {
    fn parse(parser: &mut Parser<'_, C>) -> crate::parser::Result<Self> {
        let atom = match parser.peek().clone() {
            Token::LeftParen => return parser.list(|parser| Ok(Value::List(parser.parse()?))),
            Token::Symbol(text) => Atom::Symbol(text),
            Token::Number(text) => Atom::Number(text),
            Token::QuotedString(text) => Atom::String(text),
            Token::RightParen | Token::EndOfFile => return Err(parser.expected("value")),
        };
        parser.advance()?;
        Ok(Value::Atom(atom))
    }
}

impl Print for Value {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        match self {
            Value::Atom(Atom::Symbol(text)) | Value::Atom(Atom::Number(text)) => {
                printer.symbol(text)
            }
            Value::Atom(Atom::String(text)) => printer.string(text),
            Value::List(items) => printer.list(|printer| printer.print(items)),
        }
    }
}

impl From<SmolStr> for Value {
    fn from(value: SmolStr) -> Self {
        Self::string(value)
    }
}

#[cfg(test)]
mod test {
    use super::{Atom, Value};
    use crate::{from_str, printer::to_string};

    #[test]
    fn test_parse_keeps_atom_kinds() {
        let value: Value = from_str(r#"(setup (pad_to_mask_clearance 0) (aux "x y"))"#).unwrap();
        assert_eq!(value.keyword(), Some("setup"));
        let clearance = value.get("pad_to_mask_clearance").unwrap();
        assert_eq!(
            clearance.as_list().unwrap()[1],
            Value::Atom(Atom::Number("0".into()))
        );
        let aux = value.get("aux").unwrap();
        assert_eq!(aux.as_list().unwrap()[1], Value::string("x y"));
    }

    #[test]
    fn test_print_then_parse() {
        let source = r#"(effects (font (size 1 1) (thickness 0.15)) (justify left) hide "q\"uote")"#;
        let value: Value = from_str(source).unwrap();
        assert_eq!(to_string(&value), source);
        let reparsed: Value = from_str(&to_string(&value)).unwrap();
        assert_eq!(value, reparsed);
    }
}
