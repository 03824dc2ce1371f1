use crate::parser::Span;

/// Records where in the source a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub inner: T,
    pub span: Span,
    /// One-based line on which the value starts.
    pub line: usize,
}

impl<T> Spanned<T> {
    pub fn new(inner: T, span: Span, line: usize) -> Self {
        Self { inner, span, line }
    }

    /// Converts into the inner type.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
