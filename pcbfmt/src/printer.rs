//! Print values into s-expressions.
//!
//! Printing is the first half of writing a file: every item writes itself on a
//! single line through a [`Printer`], and the result is then run through
//! [`prettify`](crate::prettify::prettify) to obtain the canonical layout.
mod plain;
pub use plain::{to_string, PlainPrinter};

/// Trait for types that can print s-expressions.
pub trait Printer: Sized {
    type Error;

    /// Print a bare atom: a keyword, a number or an identifier.
    fn symbol(&mut self, symbol: &str) -> Result<(), Self::Error>;

    /// Print a quoted string.
    fn string(&mut self, string: &str) -> Result<(), Self::Error>;

    /// Print a list given a function that prints the contents.
    fn list<F>(&mut self, f: F) -> Result<(), Self::Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Self::Error>;

    /// Print a list headed by `keyword`.
    fn form<F>(&mut self, keyword: &str, f: F) -> Result<(), Self::Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Self::Error>,
    {
        self.list(|printer| {
            printer.symbol(keyword)?;
            f(printer)
        })
    }

    /// Print a printable value.
    fn print(&mut self, value: impl Print) -> Result<(), Self::Error> {
        value.print(self)
    }
}

/// Trait for types that can be printed as an s-expression.
pub trait Print {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error>;
}

impl<T: Print + ?Sized> Print for &T {
    #[inline]
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        (*self).print(printer)
    }
}

impl<T: Print> Print for Option<T> {
    #[inline]
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        match self {
            Some(value) => value.print(printer),
            None => Ok(()),
        }
    }
}

impl<T: Print> Print for Vec<T> {
    #[inline]
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        for item in self {
            printer.print(item)?;
        }
        Ok(())
    }
}
