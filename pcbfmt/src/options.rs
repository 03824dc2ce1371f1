//! Knobs for reading and canonical formatting.
//!
//! The defaults reproduce the layout the board editor writes. [`FormatOptions`]
//! exposes every constant of the formatting algorithm so that format variants,
//! such as library tables, can be targeted without forking it.
//!
//! ```rust
//! use pcbfmt::{prettify, FormatOptions};
//!
//! let mut text = String::from("(fp_lib_table (lib (name X) (type KiCad) (uri a/b)))");
//! prettify(&mut text, &FormatOptions::library_table()).unwrap();
//! assert_eq!(text, "(fp_lib_table\n\t(lib (name X) (type KiCad) (uri a/b))\n)\n");
//! ```
use smol_str::SmolStr;

/// Which family of special cases the formatter applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    #[default]
    Normal,
    /// Library tables: every row stays on one line.
    LibraryTable,
}

/// Parameters of the canonical formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOptions {
    pub mode: FormatMode,
    pub indent_char: char,
    /// Indent characters per nesting level.
    pub indent_size: usize,
    /// Keyword of the coordinate lists that may share a line.
    pub coordinate_keyword: SmolStr,
    /// Column after which a new coordinate list starts a fresh line.
    pub coordinate_column_limit: usize,
    /// Column after which whitespace inside a list becomes a line break.
    pub wrap_threshold: usize,
    /// Lists whose contents always stay on the line they start on.
    pub compact_keywords: Vec<SmolStr>,
    /// Lists kept on one line in [`FormatMode::LibraryTable`].
    pub table_row_keywords: Vec<SmolStr>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            mode: FormatMode::Normal,
            indent_char: '\t',
            indent_size: 1,
            coordinate_keyword: SmolStr::new_inline("xy"),
            coordinate_column_limit: 99,
            wrap_threshold: 72,
            compact_keywords: ["font", "stroke", "fill", "teardrop", "offset", "rotate", "scale"]
                .into_iter()
                .map(SmolStr::new_inline)
                .collect(),
            table_row_keywords: vec![SmolStr::new_inline("lib")],
        }
    }
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The preset used for `fp_lib_table` and `sym_lib_table` files.
    pub fn library_table() -> Self {
        Self::default().with_mode(FormatMode::LibraryTable)
    }

    #[must_use]
    pub fn with_mode(mut self, mode: FormatMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_indent(mut self, indent_char: char, indent_size: usize) -> Self {
        self.indent_char = indent_char;
        self.indent_size = indent_size;
        self
    }

    #[must_use]
    pub fn with_coordinate_column_limit(mut self, limit: usize) -> Self {
        self.coordinate_column_limit = limit;
        self
    }

    #[must_use]
    pub fn with_wrap_threshold(mut self, threshold: usize) -> Self {
        self.wrap_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_compact_keyword(mut self, keyword: impl Into<SmolStr>) -> Self {
        self.compact_keywords.push(keyword.into());
        self
    }

    #[must_use]
    pub fn with_table_row_keyword(mut self, keyword: impl Into<SmolStr>) -> Self {
        self.table_row_keywords.push(keyword.into());
        self
    }

    pub(crate) fn is_compact(&self, keyword: &str) -> bool {
        self.compact_keywords.iter().any(|k| k == keyword)
    }

    pub(crate) fn is_table_row(&self, keyword: &str) -> bool {
        self.mode == FormatMode::LibraryTable && self.table_row_keywords.iter().any(|k| k == keyword)
    }
}

/// Parameters of the reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Fail on a single-layer reference to an unknown layer instead of moving the
    /// item to the rescue layer.
    pub strict_layers: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_strict_layers(mut self, strict: bool) -> Self {
        self.strict_layers = strict;
        self
    }
}
