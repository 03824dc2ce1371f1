//! Loading and saving documents on disk.
//!
//! Files are always written in canonical form: the document is printed on a
//! single line and then laid out by [`prettify`]. Nothing is written unless
//! the whole text could be produced.
use crate::board::Board;
use crate::context::ParseReport;
use crate::document::{parse_board_into, parse_document, DocumentRoot, Parsed};
use crate::options::{FormatMode, FormatOptions, ParseOptions};
use crate::parser::ParseError;
use crate::prettify::{prettify, FormatError};
use crate::printer::to_string;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{}: {source}", path.display())]
    Parse { path: PathBuf, source: ParseError },
    #[error("{} was written by a newer version (format {version}): {source}", path.display())]
    FutureFormat {
        path: PathBuf,
        version: u32,
        source: ParseError,
    },
    #[error("cannot format output: {0}")]
    Format(#[from] FormatError),
}

impl CodecError {
    fn parse(path: &Path, source: ParseError) -> Self {
        match source.future_version() {
            Some(version) => CodecError::FutureFormat {
                path: path.to_owned(),
                version,
                source,
            },
            None => CodecError::Parse {
                path: path.to_owned(),
                source,
            },
        }
    }
}

/// Reads and writes documents with a fixed set of options.
#[derive(Debug, Clone)]
pub struct Codec {
    parse_options: ParseOptions,
    board_format: FormatOptions,
    library_format: FormatOptions,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    pub fn new() -> Self {
        Codec {
            parse_options: ParseOptions::default(),
            board_format: FormatOptions::default(),
            library_format: FormatOptions::library_table(),
        }
    }

    #[must_use]
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    /// Format used for boards and footprints.
    #[must_use]
    pub fn with_board_format(mut self, options: FormatOptions) -> Self {
        self.board_format = options;
        self
    }

    /// Format used for library tables.
    #[must_use]
    pub fn with_library_format(mut self, options: FormatOptions) -> Self {
        self.library_format = options;
        self
    }

    fn format_options(&self, mode: FormatMode) -> &FormatOptions {
        match mode {
            FormatMode::Normal => &self.board_format,
            FormatMode::LibraryTable => &self.library_format,
        }
    }

    pub fn parse_str(&self, source: &str) -> Result<Parsed<DocumentRoot>, ParseError> {
        parse_document(source, self.parse_options.clone())
    }

    /// Adds the board or footprint in `source` to `board`.
    pub fn parse_board_into(&self, source: &str, board: &mut Board) -> Result<ParseReport, ParseError> {
        parse_board_into(source, board, self.parse_options.clone())
    }

    /// The canonical text of `document`, ending with a newline.
    pub fn to_canonical_string(&self, document: &DocumentRoot) -> Result<String, FormatError> {
        let mut text = to_string(document);
        prettify(&mut text, self.format_options(document.format_mode()))?;
        Ok(text)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Parsed<DocumentRoot>, CodecError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| CodecError::Read {
            path: path.to_owned(),
            source,
        })?;
        let parsed = self
            .parse_str(&source)
            .map_err(|source| CodecError::parse(path, source))?;
        tracing::info!(
            path = %path.display(),
            bytes = source.len(),
            diagnostics = parsed.report.diagnostics.len(),
            "loaded document"
        );
        Ok(parsed)
    }

    pub fn save(&self, path: impl AsRef<Path>, document: &DocumentRoot) -> Result<(), CodecError> {
        let path = path.as_ref();
        let text = self.to_canonical_string(document)?;
        write(path, &text)
    }

    /// Rewrites a file in canonical layout without reading it into an object
    /// graph. The file is left untouched when its text is malformed.
    pub fn reformat(&self, path: impl AsRef<Path>, mode: FormatMode) -> Result<(), CodecError> {
        let path = path.as_ref();
        let mut text = fs::read_to_string(path).map_err(|source| CodecError::Read {
            path: path.to_owned(),
            source,
        })?;
        prettify(&mut text, self.format_options(mode))?;
        write(path, &text)
    }
}

fn write(path: &Path, text: &str) -> Result<(), CodecError> {
    fs::write(path, text).map_err(|source| CodecError::Write {
        path: path.to_owned(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = text.len(), "saved document");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::Codec;
    use crate::document::DocumentRoot;
    use crate::libtable::{LibRow, LibTable, LibTableKind};
    use crate::options::FormatOptions;

    #[test]
    fn test_library_tables_keep_rows_on_one_line() {
        let mut table = LibTable::new(LibTableKind::Footprint);
        table.rows.push(LibRow::new("R", "KiCad", "${LIBS}/R.pretty"));
        let text = Codec::new()
            .to_canonical_string(&DocumentRoot::LibTable(table))
            .unwrap();
        let version = env!("CARGO_PKG_VERSION");
        assert_eq!(
            text,
            format!(
                "(fp_lib_table\n\t(version 7)\n\t(generator \"pcbfmt\")\n\t(generator_version \"{version}\")\n\t(lib (name \"R\") (type \"KiCad\") (uri \"${{LIBS}}/R.pretty\"))\n)\n"
            )
        );
    }

    #[test]
    fn test_board_format_is_configurable() {
        let codec = Codec::new().with_board_format(FormatOptions::new().with_indent(' ', 2));
        let text = codec
            .to_canonical_string(&DocumentRoot::Board(Default::default()))
            .unwrap();
        assert!(text.starts_with("(kicad_pcb\n  (version "));
        assert!(text.contains("\n  (net 0 \"\")\n"));
    }
}
