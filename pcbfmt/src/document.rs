//! Reading whole documents.
//!
//! A document is a single top-level list whose keyword says what it holds.
//! Reading runs in two passes: the body is read item by item while groups are
//! only recorded, then, once the closing paren of the document has been
//! consumed, group members are looked up among everything that was read.
use crate::board::{read_board, read_footprint, Board, Footprint, FootprintFile};
use crate::context::{GroupPhase, ParseContext, ParseReport};
use crate::libtable::{read_lib_table, LibTable, LibTableKind};
use crate::options::{FormatMode, ParseOptions};
use crate::parser::{ErrorKind, ParseError, Parser, Result};
use crate::printer::{Print, Printer};
use crate::util::keyword_enum;

type DocumentParser<'a> = Parser<'a, ParseContext>;

keyword_enum! {
    /// Keyword of a document's top-level list.
    pub enum DocumentKind {
        Board => "kicad_pcb",
        Footprint => "footprint",
        /// Footprints written before 2021.
        Module => "module",
        FootprintLibTable => "fp_lib_table",
        SymbolLibTable => "sym_lib_table",
    }
}

impl DocumentKind {
    /// The reader of the document's body, called after its keyword.
    fn reader(self) -> fn(&mut DocumentParser<'_>) -> Result<DocumentRoot> {
        match self {
            DocumentKind::Board => read_board_document,
            DocumentKind::Footprint | DocumentKind::Module => read_footprint_document,
            DocumentKind::FootprintLibTable => read_footprint_table,
            DocumentKind::SymbolLibTable => read_symbol_table,
        }
    }
}

/// The object graph of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRoot {
    Board(Board),
    Footprint(Footprint),
    LibTable(LibTable),
}

impl DocumentRoot {
    /// The formatter variant this document is written with.
    pub fn format_mode(&self) -> FormatMode {
        match self {
            DocumentRoot::LibTable(_) => FormatMode::LibraryTable,
            DocumentRoot::Board(_) | DocumentRoot::Footprint(_) => FormatMode::Normal,
        }
    }
}

impl Print for DocumentRoot {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        match self {
            DocumentRoot::Board(board) => printer.print(board),
            DocumentRoot::Footprint(footprint) => printer.print(FootprintFile(footprint)),
            DocumentRoot::LibTable(table) => printer.print(table),
        }
    }
}

/// A successfully read document together with what was tolerated along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub root: T,
    pub report: ParseReport,
}

/// Reads a document of any supported kind.
pub fn parse_document(source: &str, options: ParseOptions) -> Result<Parsed<DocumentRoot>> {
    let mut parser = Parser::new(source, ParseContext::new(options))?;
    let result = read_document(&mut parser);
    let root = finish(&parser, result)?;
    Ok(Parsed {
        root,
        report: parser.into_context().into_report(),
    })
}

/// Reads a board or footprint document into an existing board.
///
/// Every identifier of the document is replaced by a fresh one, and nets are
/// merged by name. The header blobs of `board` (paper, title block, setup,
/// layer stack) are kept. On error `board` is left as it was.
pub fn parse_board_into(source: &str, board: &mut Board, options: ParseOptions) -> Result<ParseReport> {
    let mut parser = Parser::new(source, ParseContext::for_append(options))?;
    let mut merged = board.clone();
    let result = append_document(&mut parser, &mut merged);
    finish(&parser, result)?;
    *board = merged;
    Ok(parser.into_context().into_report())
}

/// Attaches the document version to errors in documents newer than this reader.
fn finish<T>(p: &DocumentParser<'_>, result: Result<T>) -> Result<T> {
    result.map_err(|err| {
        let ctx = p.context();
        if ctx.too_recent {
            err.with_future_version(ctx.version)
        } else {
            err
        }
    })
}

fn read_kind(p: &mut DocumentParser<'_>) -> Result<DocumentKind> {
    let keyword = p.keyword()?;
    DocumentKind::from_keyword(&keyword).ok_or_else(|| {
        ParseError::new(
            ErrorKind::UnknownDocument(keyword.clone()),
            format!("`{keyword}` is not a known document kind"),
            p.line(),
        )
    })
}

fn read_document(p: &mut DocumentParser<'_>) -> Result<DocumentRoot> {
    p.open()?;
    let kind = read_kind(p)?;
    let root = kind.reader()(p)?;
    p.expect_end_of_file()?;
    Ok(root)
}

fn read_board_document(p: &mut DocumentParser<'_>) -> Result<DocumentRoot> {
    let mut board = Board::new();
    read_board(p, &mut board)?;
    p.close()?;
    p.context_mut().resolve_board_groups(&mut board);
    debug_assert_eq!(p.context().groups.phase(), GroupPhase::Done);
    Ok(DocumentRoot::Board(board))
}

fn read_footprint_document(p: &mut DocumentParser<'_>) -> Result<DocumentRoot> {
    read_standalone_footprint(p).map(DocumentRoot::Footprint)
}

fn read_standalone_footprint(p: &mut DocumentParser<'_>) -> Result<Footprint> {
    let mut footprint = read_footprint(p)?;
    p.close()?;
    p.context_mut().resolve_footprint_groups(&mut footprint);
    debug_assert_eq!(p.context().groups.phase(), GroupPhase::Done);
    Ok(footprint)
}

fn read_footprint_table(p: &mut DocumentParser<'_>) -> Result<DocumentRoot> {
    read_table(p, LibTableKind::Footprint)
}

fn read_symbol_table(p: &mut DocumentParser<'_>) -> Result<DocumentRoot> {
    read_table(p, LibTableKind::Symbol)
}

fn read_table(p: &mut DocumentParser<'_>, kind: LibTableKind) -> Result<DocumentRoot> {
    let table = read_lib_table(p, kind)?;
    p.close()?;
    Ok(DocumentRoot::LibTable(table))
}

fn append_document(p: &mut DocumentParser<'_>, board: &mut Board) -> Result<()> {
    p.open()?;
    let line = p.line();
    match read_kind(p)? {
        DocumentKind::Board => {
            read_board(p, board)?;
            p.close()?;
            p.context_mut().resolve_board_groups(board);
        }
        DocumentKind::Footprint | DocumentKind::Module => {
            let footprint = read_standalone_footprint(p)?;
            board.footprints.push(footprint);
        }
        kind @ (DocumentKind::FootprintLibTable | DocumentKind::SymbolLibTable) => {
            return Err(ParseError::new(
                ErrorKind::UnknownDocument(kind.as_str().into()),
                format!("a `{kind}` cannot be added to a board"),
                line,
            ));
        }
    }
    p.expect_end_of_file()
}

#[cfg(test)]
mod test {
    use super::{parse_board_into, parse_document, DocumentRoot};
    use crate::board::{Board, Track};
    use crate::context::{DiagnosticKind, ItemRef, BOARD_FILE_VERSION};
    use crate::layers::LayerId;
    use crate::options::ParseOptions;
    use crate::parser::ErrorKind;
    use rstest::rstest;

    const BOARD: &str = r#"(kicad_pcb (version 20240108) (generator "pcbnew") (generator_version "8.0")
        (general (thickness 1.6) (legacy_teardrops no))
        (paper "A4")
        (layers (0 "F.Cu" signal) (31 "B.Cu" signal) (44 "Edge.Cuts" user) (50 "User.1" user "Notes"))
        (net 0 "")
        (net 1 "GND")
        (group "pair" (uuid "9a1f6a58-0000-4000-8000-000000000001")
            (members "9a1f6a58-0000-4000-8000-000000000010" "9a1f6a58-0000-4000-8000-000000000011"))
        (segment (start 0 0) (end 1.27 0) (width 0.25) (layer "F.Cu") (net 1)
            (uuid "9a1f6a58-0000-4000-8000-000000000010"))
        (via (at 1.27 0) (size 0.6) (drill 0.3) (layers "F.Cu" "B.Cu") (net 1)
            (uuid "9a1f6a58-0000-4000-8000-000000000011"))
        (gr_line (start 0 0) (end 10 0) (stroke (width 0.1) (type solid)) (layer "Notes")
            (uuid "9a1f6a58-0000-4000-8000-000000000012"))
    )"#;

    fn board(source: &str) -> Board {
        match parse_document(source, ParseOptions::default()).unwrap().root {
            DocumentRoot::Board(board) => board,
            other => panic!("not a board: {other:?}"),
        }
    }

    #[test]
    fn test_forward_group_members() {
        let parsed = parse_document(BOARD, ParseOptions::default()).unwrap();
        assert!(parsed.report.diagnostics.is_empty());
        assert_eq!(parsed.report.generator.as_deref(), Some("pcbnew"));
        let DocumentRoot::Board(board) = parsed.root else {
            panic!("not a board");
        };
        assert_eq!(board.groups[0].members, vec![ItemRef::Track(0), ItemRef::Track(1)]);
        assert_eq!(board.drawings[0].layer.name(), "User.1");
        assert_eq!(board.nets.len(), 2);
    }

    #[test]
    fn test_group_member_problems() {
        let source = r#"(kicad_pcb (version 20240108)
            (group "a" (uuid "00000000-0000-0000-0000-0000000000a1")
                (members "00000000-0000-0000-0000-000000000001" "00000000-0000-0000-0000-000000000001"
                         "00000000-0000-0000-0000-000000000099"))
            (group "b" (uuid "00000000-0000-0000-0000-0000000000b1")
                (members "00000000-0000-0000-0000-000000000001"))
            (segment (start 0 0) (end 1 0) (width 0.2) (layer F.Cu) (net 0)
                (uuid "00000000-0000-0000-0000-000000000001"))
        )"#;
        let parsed = parse_document(source, ParseOptions::default()).unwrap();
        let DocumentRoot::Board(board) = parsed.root else {
            panic!("not a board");
        };
        assert_eq!(board.groups[0].members, vec![ItemRef::Track(0)]);
        assert!(board.groups[1].members.is_empty());
        let kinds: Vec<_> = parsed.report.diagnostics.iter().map(|d| &d.kind).collect();
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], DiagnosticKind::DuplicateMember { .. }));
        assert!(matches!(kinds[1], DiagnosticKind::UnresolvedMember { .. }));
        assert!(matches!(kinds[2], DiagnosticKind::DuplicateMember { .. }));
    }

    #[test]
    fn test_unknown_layers_are_tolerated() {
        let source = r#"(kicad_pcb
            (segment (start 0 0) (end 1 0) (width 0.2) (layer "Mystery") (net 0))
            (segment (start 0 0) (end 1 0) (width 0.2) (layer "Mystery") (net 0))
            (zone (net 0) (net_name "") (layers "F.Cu" "Mystery") (polygon (pts (xy 0 0) (xy 1 0) (xy 1 1))))
        )"#;
        let parsed = parse_document(source, ParseOptions::default()).unwrap();
        assert_eq!(parsed.report.undefined_layers.len(), 1);
        let DocumentRoot::Board(board) = parsed.root else {
            panic!("not a board");
        };
        let Track::Segment(segment) = &board.tracks[0] else {
            panic!("not a segment");
        };
        assert_eq!(segment.layer, LayerId::RESCUE);
        assert_eq!(board.zones[0].layers.len(), 1);

        let err = parse_document(source, ParseOptions::new().with_strict_layers(true)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownLayer("Mystery".into()));
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_too_recent() {
        let parsed = parse_document("(kicad_pcb (version 29990101) (future_thing 1))", ParseOptions::default())
            .unwrap();
        assert!(parsed.report.too_recent);
        assert_eq!(parsed.report.diagnostics.len(), 1);

        let err = parse_document("(kicad_pcb (version 29990101) (net oops))", ParseOptions::default())
            .unwrap_err();
        assert_eq!(err.future_version(), Some(29990101));

        let err = parse_document("(kicad_pcb (version 20240108) (net oops))", ParseOptions::default())
            .unwrap_err();
        assert_eq!(err.future_version(), None);
    }

    #[rstest]
    #[case("(schematic (version 1))", "schematic")]
    #[case("(\"kicad_pcb\")", "")]
    fn test_unknown_document(#[case] source: &str, #[case] keyword: &str) {
        let err = parse_document(source, ParseOptions::default()).unwrap_err();
        if keyword.is_empty() {
            assert!(matches!(err.kind(), ErrorKind::Syntax { .. }));
        } else {
            assert_eq!(err.kind(), &ErrorKind::UnknownDocument(keyword.into()));
        }
    }

    #[test]
    fn test_trailing_content() {
        let err = parse_document("(kicad_pcb) (kicad_pcb)", ParseOptions::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Syntax { .. }));
    }

    #[rstest]
    #[case(20221018, true)]
    #[case(20240107, true)]
    #[case(20240108, false)]
    #[case(BOARD_FILE_VERSION, false)]
    fn test_bare_footprint_flags(#[case] version: u32, #[case] accepted: bool) {
        let source = format!(r#"(footprint "R_0603" (version {version}) locked (layer "F.Cu"))"#);
        let result = parse_document(&source, ParseOptions::default());
        match result {
            Ok(parsed) => {
                assert!(accepted);
                let DocumentRoot::Footprint(footprint) = parsed.root else {
                    panic!("not a footprint");
                };
                assert!(footprint.locked);
            }
            Err(err) => {
                assert!(!accepted);
                assert!(matches!(err.kind(), ErrorKind::Syntax { .. }));
            }
        }
    }

    #[test]
    fn test_legacy_module() {
        let source = r#"(module Resistors:R_0603 locked (layer F.Cu) (tedit 5F68FEEE)
            (fp_line (start -1 -1) (end 1 -1) (layer F.SilkS) (width 0.12))
            (pad 1 smd roundrect (at -0.8 0 90) (size 0.8 0.9) (layers F.Cu F.Paste F.Mask) (roundrect_rratio 0.25) (tstamp 5C1A2B3D))
        )"#;
        let parsed = parse_document(source, ParseOptions::default()).unwrap();
        let DocumentRoot::Footprint(footprint) = parsed.root else {
            panic!("not a footprint");
        };
        assert!(footprint.locked);
        assert_eq!(footprint.lib_id, "Resistors:R_0603");
        assert_eq!(footprint.pads[0].placement.angle.0, 90.0);
        assert_eq!(footprint.pads[0].uuid.to_string(), "00000000-0000-0000-0000-00005c1a2b3d");
        assert_eq!(footprint.drawings[0].stroke.width, 120_000);
        assert_eq!(parsed.report.version, 20171130);
    }

    #[test]
    fn test_append_board() {
        let mut target = board(BOARD);
        let original_ids: Vec<_> = target.tracks.iter().map(Track::uuid).collect();
        let report = parse_board_into(BOARD, &mut target, ParseOptions::default()).unwrap();
        assert!(report.diagnostics.is_empty());

        assert_eq!(target.nets.len(), 2);
        assert_eq!(target.tracks.len(), 4);
        assert!(target.tracks.iter().all(|track| track.net() == 1));
        let appended: Vec<_> = target.tracks[2..].iter().map(Track::uuid).collect();
        assert!(appended.iter().all(|id| !original_ids.contains(id)));
        assert_eq!(target.groups[1].members, vec![ItemRef::Track(2), ItemRef::Track(3)]);
        assert_ne!(target.groups[0].uuid, target.groups[1].uuid);
    }

    #[test]
    fn test_failed_append_leaves_board_unchanged() {
        let mut target = board(BOARD);
        let before = target.clone();
        let source = r#"(footprint "X" (layer "F.Cu") (pad 1 smd rect (at 0 0)))"#;
        let err = parse_board_into(source, &mut target, ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MissingField("size".into()));
        assert_eq!(target, before);

        let source = r#"(footprint "X" (layer "F.Cu") (pad 1 smd rect (at 0 0) (size 1 1)))"#;
        parse_board_into(source, &mut target, ParseOptions::default()).unwrap();
        assert_eq!(target.footprints.len(), 1);
        assert_eq!(target.footprints[0].lib_id, "X");
        assert_eq!(target.footprints[0].pads.len(), 1);
    }

    #[test]
    fn test_append_rejects_tables() {
        let mut target = Board::new();
        let err = parse_board_into("(fp_lib_table)", &mut target, ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownDocument("fp_lib_table".into()));
    }

    const TEXT_GROUP: &str = r#"(kicad_pcb (version 20241229)
        (group "label" (uuid "9a1f6a58-0000-4000-8000-000000000020")
            (members "9a1f6a58-0000-4000-8000-000000000021"))
        (gr_text "rev B" (at 5 5 0) (layer "F.SilkS") (uuid "9a1f6a58-0000-4000-8000-000000000021")
            (effects (font (size 1 1))))
    )"#;

    #[test]
    fn test_verbatim_items_join_groups() {
        let parsed = parse_document(TEXT_GROUP, ParseOptions::default()).unwrap();
        assert!(parsed.report.diagnostics.is_empty());
        let DocumentRoot::Board(board) = parsed.root else {
            panic!("not a board");
        };
        assert_eq!(board.groups[0].members, vec![ItemRef::Extra(0)]);
        assert_eq!(
            board.group_members(&board.groups[0])[0].to_string(),
            "9a1f6a58-0000-4000-8000-000000000021"
        );
    }

    #[test]
    fn test_append_renews_verbatim_ids() {
        let mut target = Board::new();
        parse_board_into(TEXT_GROUP, &mut target, ParseOptions::default()).unwrap();
        parse_board_into(TEXT_GROUP, &mut target, ParseOptions::default()).unwrap();

        assert_eq!(target.extras.len(), 2);
        assert_ne!(target.extras[0], target.extras[1]);
        assert_eq!(target.groups[0].members, vec![ItemRef::Extra(0)]);
        assert_eq!(target.groups[1].members, vec![ItemRef::Extra(1)]);
        let first = target.group_members(&target.groups[0]);
        let second = target.group_members(&target.groups[1]);
        assert_ne!(first, second);
        assert_ne!(first[0].to_string(), "9a1f6a58-0000-4000-8000-000000000021");
    }

    #[test]
    fn test_large_net_codes() {
        let board = board(
            r#"(kicad_pcb (net 2147483647 "X")
                (segment (start 0 0) (end 1 0) (width 0.2) (layer F.Cu) (net 2147483647)))"#,
        );
        assert_eq!(board.nets.len(), 2);
        assert_eq!(board.tracks[0].net(), 1);
    }
}
