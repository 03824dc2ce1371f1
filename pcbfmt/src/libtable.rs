//! Footprint and symbol library tables.
//!
//! A table maps library nicknames to the place the library lives:
//!
//! ```text
//! (fp_lib_table
//! 	(version 7)
//! 	(lib (name "Resistors") (type "KiCad") (uri "${LIBS}/R.pretty") (options "") (descr ""))
//! )
//! ```
use crate::board::header;
use crate::context::{ParseContext, LIB_TABLE_VERSION};
use crate::parser::{ErrorKind, Parser, Result};
use crate::printer::{Print, Printer};
use crate::util::keyword_enum;
use smol_str::SmolStr;

keyword_enum! {
    /// Which kind of library a table lists.
    pub enum LibTableKind {
        Footprint => "fp_lib_table",
        Symbol => "sym_lib_table",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibTable {
    pub kind: LibTableKind,
    pub rows: Vec<LibRow>,
}

impl LibTable {
    pub fn new(kind: LibTableKind) -> Self {
        LibTable {
            kind,
            rows: Vec::new(),
        }
    }

    /// The row for the library nicknamed `name`.
    pub fn row(&self, name: &str) -> Option<&LibRow> {
        self.rows.iter().find(|row| row.name == name)
    }
}

/// One library of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibRow {
    /// Nickname, unique within the table.
    pub name: SmolStr,
    /// Plugin that reads the library, such as `KiCad` or `Legacy`.
    pub lib_type: SmolStr,
    pub uri: SmolStr,
    pub options: Option<SmolStr>,
    pub descr: Option<SmolStr>,
    pub disabled: bool,
    pub hidden: bool,
}

impl LibRow {
    pub fn new(
        name: impl Into<SmolStr>,
        lib_type: impl Into<SmolStr>,
        uri: impl Into<SmolStr>,
    ) -> Self {
        LibRow {
            name: name.into(),
            lib_type: lib_type.into(),
            uri: uri.into(),
            options: None,
            descr: None,
            disabled: false,
            hidden: false,
        }
    }
}

/// Reads the children of a table list, its keyword already consumed.
pub(crate) fn read_lib_table(
    p: &mut Parser<'_, ParseContext>,
    kind: LibTableKind,
) -> Result<LibTable> {
    let mut table = LibTable::new(kind);
    let mut version = None;

    p.children(|p, keyword, line| {
        match keyword.as_str() {
            "version" => {
                let value = p.read_version(LIB_TABLE_VERSION)?;
                p.once(&mut version, "version", value)?;
            }
            "generator" => {
                let generator = p.text()?;
                p.context_mut().generator = Some(generator);
            }
            "generator_version" => {
                let text = p.text()?;
                p.context_mut().generator_version = Some(text);
            }
            "lib" => {
                let row = read_row(p)?;
                if table.row(&row.name).is_some() {
                    return Err(p.error(
                        ErrorKind::DuplicateField("name".into()),
                        format!("duplicate library nickname `{}`", row.name),
                    ));
                }
                table.rows.push(row);
            }
            _ => p.skip_child(kind.as_str(), &keyword, line)?,
        }
        Ok(())
    })?;

    Ok(table)
}

fn read_row(p: &mut Parser<'_, ParseContext>) -> Result<LibRow> {
    let mut name = None;
    let mut lib_type = None;
    let mut uri = None;
    let mut options = None;
    let mut descr = None;
    let mut disabled = false;
    let mut hidden = false;

    p.children(|p, keyword, line| {
        match keyword.as_str() {
            "name" => {
                let value = p.text()?;
                p.once(&mut name, "name", value)?;
            }
            "type" => {
                let value = p.text()?;
                p.once(&mut lib_type, "type", value)?;
            }
            "uri" => {
                let value = p.text()?;
                p.once(&mut uri, "uri", value)?;
            }
            "options" => {
                let value = p.text()?;
                p.once(&mut options, "options", value)?;
            }
            "descr" => {
                let value = p.text()?;
                p.once(&mut descr, "descr", value)?;
            }
            "disabled" => disabled = p.flag()?,
            "hidden" => hidden = p.flag()?,
            _ => p.skip_child("lib", &keyword, line)?,
        }
        Ok(())
    })?;

    Ok(LibRow {
        name: p.required(name, "name")?,
        lib_type: p.required(lib_type, "type")?,
        uri: p.required(uri, "uri")?,
        options,
        descr,
        disabled,
        hidden,
    })
}

impl Print for LibTable {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.form(self.kind.as_str(), |p| {
            header(p, LIB_TABLE_VERSION)?;
            p.print(&self.rows)
        })
    }
}

impl Print for LibRow {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.form("lib", |p| {
            p.form("name", |p| p.string(&self.name))?;
            p.form("type", |p| p.string(&self.lib_type))?;
            p.form("uri", |p| p.string(&self.uri))?;
            if let Some(options) = &self.options {
                p.form("options", |p| p.string(options))?;
            }
            if let Some(descr) = &self.descr {
                p.form("descr", |p| p.string(descr))?;
            }
            if self.disabled {
                p.form("disabled", |_| Ok(()))?;
            }
            if self.hidden {
                p.form("hidden", |_| Ok(()))?;
            }
            Ok(())
        })
    }
}
