//! End-to-end tests of loading and saving files.

use pcbfmt::board::{Board, Track};
use pcbfmt::context::ItemRef;
use pcbfmt::{Codec, CodecError, DocumentRoot, FormatError, FormatMode, BOARD_FILE_VERSION};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const BOARD: &str = r#"(kicad_pcb (version 20240108) (generator "pcbnew") (generator_version "8.0")
  (general (thickness 1.6) (legacy_teardrops no))
  (paper "A4")
  (title_block (title "Blinky") (rev "B"))
  (layers
    (0 "F.Cu" signal)
    (31 "B.Cu" signal)
    (37 "F.SilkS" user "F.Silkscreen")
    (39 "F.Mask" user)
    (44 "Edge.Cuts" user)
  )
  (setup (pad_to_mask_clearance 0) (pcbplotparams (layerselection 0x00010fc_ffffffff) (mirror false)))
  (net 0 "")
  (net 1 "GND")
  (net 2 "LED")
  (footprint "LED_SMD:LED_0603" (layer "F.Cu") (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000001") (at 20 15 90)
    (property "Reference" "D1" (at 0 -1.5 90) (layer "F.SilkS") (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000002")
      (effects (font (size 1 1) (thickness 0.15))))
    (property "Value" "red" (at 0 1.5 90) (layer "F.Fab") (hide yes) (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000003")
      (effects (font (size 1 1))))
    (attr smd)
    (fp_line (start -1.5 -0.7) (end 0.8 -0.7) (stroke (width 0.12) (type solid)) (layer "F.SilkS")
      (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000004"))
    (pad "1" smd roundrect (at -0.79 0 90) (size 0.93 0.95) (layers "F.Cu" "F.Paste" "F.Mask")
      (roundrect_rratio 0.25) (net 2 "LED") (pintype "passive") (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000005"))
    (pad "2" smd roundrect (at 0.79 0 90) (size 0.93 0.95) (layers "F.Cu" "F.Paste" "F.Mask")
      (roundrect_rratio 0.25) (net 1 "GND") (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000006"))
    (group "pads" (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000007")
      (members "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000005" "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000006"))
  )
  (gr_rect (start 0 0) (end 40 30) (stroke (width 0.05) (type default)) (fill none) (layer "Edge.Cuts")
    (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000010"))
  (gr_text "v1" (at 2 2 0) (layer "F.SilkS") (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000011")
    (effects (font (size 1 1) (thickness 0.15)) (justify left)))
  (segment (start 19.21 15) (end 10 15) (width 0.25) (layer "F.Cu") (net 2)
    (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000020"))
  (arc (start 10 15) (mid 8.5 15.6) (end 8 17) (width 0.25) (layer "F.Cu") (net 2)
    (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000021"))
  (via (at 8 17) (size 0.6) (drill 0.3) (layers "F.Cu" "B.Cu") (net 2)
    (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000022"))
  (zone (net 1) (net_name "GND") (layers "F.Cu" "B.Cu") (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000030")
    (name "ground") (hatch edge 0.5) (priority 1)
    (connect_pads (clearance 0.5)) (min_thickness 0.25) (filled_areas_thickness no)
    (fill yes (thermal_gap 0.5) (thermal_bridge_width 0.5))
    (polygon (pts (xy 0 0) (xy 40 0) (xy 40 30) (xy 0 30))))
  (group "route" (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000040")
    (members "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000020" "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000021"
      "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000022"))
)
"#;

fn workspace() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("Failed to write test file");
    path
}

fn board(root: DocumentRoot) -> Board {
    match root {
        DocumentRoot::Board(board) => board,
        other => panic!("expected a board, got {other:?}"),
    }
}

#[test]
fn test_load_board() {
    let dir = workspace();
    let path = write_file(&dir, "blinky.kicad_pcb", BOARD);
    let parsed = Codec::new().load(&path).unwrap();

    assert_eq!(parsed.report.version, 20240108);
    assert!(!parsed.report.too_recent);
    assert!(parsed.report.diagnostics.is_empty(), "{:?}", parsed.report.diagnostics);

    let board = board(parsed.root);
    assert_eq!(board.nets.len(), 3);
    assert_eq!(board.footprints[0].pads.len(), 2);
    assert_eq!(board.footprints[0].groups[0].members.len(), 2);
    assert_eq!(
        board.groups[0].members,
        vec![ItemRef::Track(0), ItemRef::Track(1), ItemRef::Track(2)]
    );
    assert_eq!(board.extras.len(), 1);
    assert_eq!(board.zones[0].settings.len(), 5);
    assert!(matches!(board.tracks[1], Track::Arc(_)));
}

#[test]
fn test_save_then_load_is_lossless() {
    let dir = workspace();
    let source = write_file(&dir, "in.kicad_pcb", BOARD);
    let codec = Codec::new();
    let first = codec.load(&source).unwrap();

    let saved = dir.path().join("out.kicad_pcb");
    codec.save(&saved, &first.root).unwrap();
    let text = fs::read_to_string(&saved).unwrap();
    assert!(text.starts_with(&format!("(kicad_pcb\n\t(version {BOARD_FILE_VERSION})\n")));
    assert!(text.ends_with(")\n"));
    assert!(text.contains("\t\t\t(pts\n\t\t\t\t(xy 0 0) (xy 40 0) (xy 40 30) (xy 0 30)\n\t\t\t)\n"));

    let second = codec.load(&saved).unwrap();
    assert_eq!(second.root, first.root);
    assert_eq!(second.report.generator.as_deref(), Some("pcbfmt"));

    codec.save(&saved, &second.root).unwrap();
    assert_eq!(fs::read_to_string(&saved).unwrap(), text);
}

#[test]
fn test_footprint_file() {
    let dir = workspace();
    let path = write_file(
        &dir,
        "R_0603.kicad_mod",
        r#"(footprint "R_0603" (version 20240108) (generator "pcbnew") (layer "F.Cu")
            (descr "Resistor SMD 0603") (tags "resistor")
            (attr smd)
            (pad "1" smd roundrect (at -0.825 0) (size 0.8 0.95) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25))
            (model "${KICAD8_3DMODEL_DIR}/R_0603.wrl" (offset (xyz 0 0 0)) (scale (xyz 1 1 1)) (rotate (xyz 0 0 0))))"#,
    );
    let codec = Codec::new();
    let parsed = codec.load(&path).unwrap();
    codec.save(&path, &parsed.root).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("(footprint \"R_0603\"\n\t(version "));
    assert!(!text.contains("(at 0 0)"));
    assert!(text.contains("\t\t(offset (xyz 0 0 0))\n"));
    assert_eq!(codec.load(&path).unwrap().root, parsed.root);
}

#[test]
fn test_library_table_file() {
    let dir = workspace();
    let path = write_file(
        &dir,
        "fp-lib-table",
        "(fp_lib_table (version 7) (lib (name \"LED_SMD\")(type \"KiCad\")(uri \"${KICAD8_FOOTPRINT_DIR}/LED_SMD.pretty\")(options \"\")(descr \"LEDs\")))",
    );
    let codec = Codec::new();
    let parsed = codec.load(&path).unwrap();
    codec.save(&path, &parsed.root).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.ends_with(
        "\t(lib (name \"LED_SMD\") (type \"KiCad\") (uri \"${KICAD8_FOOTPRINT_DIR}/LED_SMD.pretty\") (options \"\") (descr \"LEDs\"))\n)\n"
    ));
}

#[test]
fn test_missing_uri_names_the_field() {
    let dir = workspace();
    let path = write_file(&dir, "sym-lib-table", "(sym_lib_table\n(lib (name X) (type KiCad)))");
    match Codec::new().load(&path) {
        Err(CodecError::Parse { source, .. }) => {
            assert_eq!(source.kind(), &pcbfmt::ErrorKind::MissingField("uri".into()));
            assert_eq!(source.line(), 2);
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_future_format() {
    let dir = workspace();
    let tolerated = write_file(
        &dir,
        "new.kicad_pcb",
        "(kicad_pcb (version 29990101) (hologram (depth 3)) (net 0 \"\"))",
    );
    let parsed = Codec::new().load(&tolerated).unwrap();
    assert!(parsed.report.too_recent);
    assert_eq!(parsed.report.diagnostics.len(), 1);

    let broken = write_file(&dir, "broken.kicad_pcb", "(kicad_pcb (version 29990101) (net zero))");
    match Codec::new().load(&broken) {
        Err(CodecError::FutureFormat { version, .. }) => assert_eq!(version, 29990101),
        other => panic!("expected a future format error, got {other:?}"),
    }
}

#[test]
fn test_missing_file() {
    let dir = workspace();
    let result = Codec::new().load(dir.path().join("absent.kicad_pcb"));
    assert!(matches!(result, Err(CodecError::Read { .. })));
}

#[test]
fn test_reformat_refuses_malformed_text() {
    let dir = workspace();
    let contents = "(kicad_pcb (general (thickness 1.6)";
    let path = write_file(&dir, "cut.kicad_pcb", contents);
    let result = Codec::new().reformat(&path, FormatMode::Normal);
    assert!(matches!(
        result,
        Err(CodecError::Format(FormatError::UnclosedList { .. }))
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), contents);
}

#[test]
fn test_reformat() {
    let dir = workspace();
    let path = write_file(&dir, "fp-lib-table", "(fp_lib_table(lib(name X)(type LEGACY)(uri a/b)))");
    Codec::new().reformat(&path, FormatMode::LibraryTable).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "(fp_lib_table\n\t(lib (name X) (type LEGACY) (uri a/b))\n)\n"
    );
}

#[test]
fn test_paste_footprint_into_board() {
    let dir = workspace();
    let path = write_file(&dir, "blinky.kicad_pcb", BOARD);
    let codec = Codec::new();
    let mut board = board(codec.load(&path).unwrap().root);
    let footprint = board.footprints[0].clone();

    let snippet = fs::read_to_string(&path).unwrap();
    let start = snippet.find("(footprint").unwrap();
    let end = snippet.find("(gr_rect").unwrap();
    codec.parse_board_into(&snippet[start..end], &mut board).unwrap();

    assert_eq!(board.footprints.len(), 2);
    let pasted = &board.footprints[1];
    assert_ne!(pasted.uuid, footprint.uuid);
    assert_ne!(pasted.pads[0].uuid, footprint.pads[0].uuid);
    assert_eq!(pasted.groups[0].members, footprint.groups[0].members);
    assert_eq!(pasted.pads[0].net, footprint.pads[0].net);
}

#[test]
fn test_curved_outline_and_grouped_text_survive_save() {
    let dir = workspace();
    let path = write_file(
        &dir,
        "outline.kicad_pcb",
        r#"(kicad_pcb (version 20241229)
            (gr_poly (pts (xy 0 0) (xy 10 0) (arc (start 10 0) (mid 12 5) (end 10 10)) (xy 0 10))
                (stroke (width 0.1) (type solid)) (fill none) (layer "Edge.Cuts")
                (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000050"))
            (gr_text "rev B" (at 5 5 0) (layer "F.SilkS") (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000051")
                (effects (font (size 1 1))))
            (group "outline" (uuid "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000052")
                (members "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000050" "3f0b7cc2-5c1e-4d8a-9d3e-1e1f00000051")))"#,
    );
    let codec = Codec::new();
    let first = codec.load(&path).unwrap();
    assert!(first.report.diagnostics.is_empty(), "{:?}", first.report.diagnostics);
    codec.save(&path, &first.root).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("(arc\n"), "{text}");
    assert!(text.contains("(mid 12 5)"), "{text}");

    let second = codec.load(&path).unwrap();
    assert!(second.report.diagnostics.is_empty(), "{:?}", second.report.diagnostics);
    let reloaded = board(second.root);
    assert_eq!(reloaded.groups[0].members, vec![ItemRef::Drawing(0), ItemRef::Extra(0)]);
    assert_eq!(reloaded, board(first.root));
}
