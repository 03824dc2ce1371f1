//! Utilities to help with parsing and printing s-expressions.
mod keyword;
mod spanned;
mod value;

pub(crate) use keyword::keyword_enum;
pub use spanned::Spanned;
pub use value::{Atom, Value};
