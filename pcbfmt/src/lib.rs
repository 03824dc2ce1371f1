//! Reading and writing of board design files.
//!
//! # Syntax
//!
//! Design files are s-expressions: every construct is a list whose first atom
//! is a keyword, such as `(segment (start 0 0) (end 1.27 0) (width 0.25))`.
//!
//! - **Atoms** are either bare, like `F.Cu` or `1.27`, or quoted strings.
//!   Within quoted strings `\"`, `\\`, `\n`, `\r`, `\t` and `\xHH` are escapes.
//!
//! - **Comments** begin with a `;` and extend to the end of the line, or are
//!   enclosed in `/*` and `*/`.
//!
//! Linear dimensions are written in millimetres and held as integer
//! nanometres (see [`units`]).
//!
//! # Reading
//!
//! [`parse_document`] reads boards, footprints and library tables into typed
//! object graphs. Constructs a newer format added are skipped and reported in
//! the [`ParseReport`] instead of failing the read.
//!
//! # Writing
//!
//! Items print themselves on one line through a [`printer::Printer`];
//! [`prettify`] then lays the text out in the canonical form. [`Codec`] ties
//! both directions to files.
//!
//! ```rust
//! use pcbfmt::{Codec, DocumentRoot};
//!
//! let codec = Codec::new();
//! let parsed = codec.parse_str("(fp_lib_table (lib (name R) (type KiCad) (uri r.pretty)))").unwrap();
//! let DocumentRoot::LibTable(table) = &parsed.root else { unreachable!() };
//! assert_eq!(table.rows[0].uri, "r.pretty");
//!
//! let text = codec.to_canonical_string(&parsed.root).unwrap();
//! assert!(text.ends_with("\t(lib (name \"R\") (type \"KiCad\") (uri \"r.pretty\"))\n)\n"));
//! ```

pub(crate) mod escape;
pub(crate) mod lexer;
pub mod board;
pub mod codec;
pub mod context;
pub mod document;
pub mod layers;
pub mod libtable;
pub mod options;
pub mod parser;
pub mod prettify;
pub mod printer;
pub mod units;
pub mod util;

pub use codec::{Codec, CodecError};
pub use context::{
    Diagnostic, DiagnosticKind, ParseReport, BOARD_FILE_VERSION, LIB_TABLE_VERSION,
};
pub use document::{parse_board_into, parse_document, DocumentKind, DocumentRoot, Parsed};
pub use options::{FormatMode, FormatOptions, ParseOptions};
pub use parser::{from_str, ErrorKind, ParseError};
pub use prettify::{prettify, FormatError};
pub use printer::to_string;
pub use units::IU_PER_MM;

/// Name written into the `generator` header of every file.
pub const GENERATOR: &str = "pcbfmt";

/// Written into the `generator_version` header.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
