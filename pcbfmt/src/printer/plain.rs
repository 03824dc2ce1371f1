use crate::escape::escape_string;
use std::convert::Infallible;

use super::{Print, Printer};

/// Writes s-expressions on a single line, separating atoms with one space.
pub struct PlainPrinter {
    needs_whitespace: bool,
    string: String,
}

impl PlainPrinter {
    pub fn new() -> Self {
        Self {
            needs_whitespace: false,
            string: String::new(),
        }
    }

    pub fn into_string(self) -> String {
        self.string
    }

    #[inline]
    fn separate(&mut self) {
        if self.needs_whitespace {
            self.string.push(' ');
        }
    }
}

impl Default for PlainPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer for PlainPrinter {
    type Error = Infallible;

    fn symbol(&mut self, atom: &str) -> Result<(), Self::Error> {
        self.separate();
        self.needs_whitespace = true;
        self.string.push_str(atom);
        Ok(())
    }

    fn string(&mut self, string: &str) -> Result<(), Self::Error> {
        self.separate();
        self.needs_whitespace = true;
        self.string.push_str(&escape_string(string));
        Ok(())
    }

    fn list<F>(&mut self, f: F) -> Result<(), Self::Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Self::Error>,
    {
        self.separate();
        self.string.push('(');
        self.needs_whitespace = false;
        f(self)?;
        self.string.push(')');
        self.needs_whitespace = true;
        Ok(())
    }
}

/// Print a `T` into an s-expression string.
///
/// This function does not produce any line breaks or indentation. Files are never
/// written in this form directly; run the result through
/// [`prettify`](crate::prettify::prettify) first.
pub fn to_string<T: Print>(value: T) -> String {
    let mut printer = PlainPrinter::new();
    let _ = value.print(&mut printer);
    printer.into_string()
}

#[cfg(test)]
mod test {
    use super::PlainPrinter;
    use crate::printer::Printer;

    #[test]
    fn test_spacing() {
        let mut printer = PlainPrinter::new();
        printer
            .form("lib", |p| {
                p.form("name", |p| p.string("X"))?;
                p.form("type", |p| p.symbol("KiCad"))?;
                p.list(|_| Ok(()))
            })
            .unwrap();
        assert_eq!(printer.into_string(), r#"(lib (name "X") (type KiCad) ())"#);
    }
}
