use super::{
    ArcTrack, Board, Drill, Footprint, Group, Kiid, LayerDef, Pad, PadNet, Placement, Point,
    PolyVertex, Property, Segment, Shape, ShapeKind, Stroke, StrokeStyle, Track, Via, ViaType,
    Zone,
};
use crate::context::{
    GroupOwner, GroupRecord, ParseContext, BARE_FLAGS_VERSION, BOARD_FILE_VERSION,
};
use crate::layers::{LayerId, LayerKind, LayerSet};
use crate::lexer::Token;
use crate::parser::{ErrorKind, Parser, Result};
use crate::units::mm_to_iu;
use crate::util::{keyword_enum, Atom, Value};
use ordered_float::OrderedFloat;
use smol_str::SmolStr;

type BoardParser<'a> = Parser<'a, ParseContext>;

keyword_enum! {
    enum BoardChild {
        Version => "version",
        Generator => "generator",
        GeneratorVersion => "generator_version",
        Host => "host",
        General => "general",
        Paper => "paper",
        TitleBlock => "title_block",
        Layers => "layers",
        Setup => "setup",
        Net => "net",
        Footprint => "footprint",
        Module => "module",
        GrLine => "gr_line",
        GrRect => "gr_rect",
        GrCircle => "gr_circle",
        GrArc => "gr_arc",
        GrPoly => "gr_poly",
        Segment => "segment",
        Arc => "arc",
        Via => "via",
        Zone => "zone",
        Group => "group",
        GrText => "gr_text",
        GrTextBox => "gr_text_box",
        Dimension => "dimension",
        Target => "target",
        Image => "image",
        Property => "property",
        Generated => "generated",
        EmbeddedFonts => "embedded_fonts",
        EmbeddedFiles => "embedded_files",
    }
}

keyword_enum! {
    enum FootprintChild {
        Version => "version",
        Generator => "generator",
        GeneratorVersion => "generator_version",
        Locked => "locked",
        Placed => "placed",
        Layer => "layer",
        Tedit => "tedit",
        Uuid => "uuid",
        Tstamp => "tstamp",
        At => "at",
        Descr => "descr",
        Tags => "tags",
        Property => "property",
        Attr => "attr",
        FpLine => "fp_line",
        FpRect => "fp_rect",
        FpCircle => "fp_circle",
        FpArc => "fp_arc",
        FpPoly => "fp_poly",
        Pad => "pad",
        Group => "group",
        Path => "path",
        Sheetname => "sheetname",
        Sheetfile => "sheetfile",
        SolderMaskMargin => "solder_mask_margin",
        SolderPasteMargin => "solder_paste_margin",
        SolderPasteRatio => "solder_paste_ratio",
        SolderPasteMarginRatio => "solder_paste_margin_ratio",
        Clearance => "clearance",
        ZoneConnect => "zone_connect",
        ThermalWidth => "thermal_width",
        ThermalGap => "thermal_gap",
        NetTiePadGroups => "net_tie_pad_groups",
        PrivateLayers => "private_layers",
        FpText => "fp_text",
        FpTextBox => "fp_text_box",
        Model => "model",
        Zone => "zone",
        Dimension => "dimension",
        EmbeddedFonts => "embedded_fonts",
        EmbeddedFiles => "embedded_files",
    }
}

keyword_enum! {
    enum PadChild {
        Locked => "locked",
        At => "at",
        Size => "size",
        Drill => "drill",
        Layers => "layers",
        RoundrectRratio => "roundrect_rratio",
        Net => "net",
        Uuid => "uuid",
        Tstamp => "tstamp",
        Pinfunction => "pinfunction",
        Pintype => "pintype",
        DieLength => "die_length",
        SolderMaskMargin => "solder_mask_margin",
        SolderPasteMargin => "solder_paste_margin",
        SolderPasteMarginRatio => "solder_paste_margin_ratio",
        Clearance => "clearance",
        ZoneConnect => "zone_connect",
        ThermalWidth => "thermal_width",
        ThermalBridgeWidth => "thermal_bridge_width",
        ThermalGap => "thermal_gap",
        ThermalBridgeAngle => "thermal_bridge_angle",
        ChamferRatio => "chamfer_ratio",
        Chamfer => "chamfer",
        RectDelta => "rect_delta",
        Options => "options",
        Primitives => "primitives",
        RemoveUnusedLayers => "remove_unused_layers",
        KeepEndLayers => "keep_end_layers",
        ZoneLayerConnections => "zone_layer_connections",
        Teardrops => "teardrops",
        Property => "property",
    }
}

keyword_enum! {
    enum ShapeChild {
        Start => "start",
        Mid => "mid",
        End => "end",
        Center => "center",
        Pts => "pts",
        Width => "width",
        Stroke => "stroke",
        Fill => "fill",
        Layer => "layer",
        Locked => "locked",
        Uuid => "uuid",
        Tstamp => "tstamp",
    }
}

keyword_enum! {
    enum TrackChild {
        Start => "start",
        Mid => "mid",
        End => "end",
        At => "at",
        Width => "width",
        Size => "size",
        Drill => "drill",
        Layer => "layer",
        Layers => "layers",
        Net => "net",
        Locked => "locked",
        Uuid => "uuid",
        Tstamp => "tstamp",
    }
}

keyword_enum! {
    enum ZoneChild {
        Net => "net",
        NetName => "net_name",
        Layer => "layer",
        Layers => "layers",
        Uuid => "uuid",
        Tstamp => "tstamp",
        Name => "name",
        Priority => "priority",
        Locked => "locked",
        Polygon => "polygon",
        Hatch => "hatch",
        ConnectPads => "connect_pads",
        MinThickness => "min_thickness",
        FilledAreasThickness => "filled_areas_thickness",
        Fill => "fill",
        Keepout => "keepout",
        Placement => "placement",
        Attr => "attr",
        FilledPolygon => "filled_polygon",
        FillSegments => "fill_segments",
    }
}

/// Reads the children of `(kicad_pcb ...)` into `board`, appending to what it
/// already holds.
pub(crate) fn read_board(p: &mut BoardParser<'_>, board: &mut Board) -> Result<()> {
    let appending = p.context().appending();
    let mut version = None;
    let mut general = None;
    let mut layers = None;

    p.children(|p, keyword, line| {
        let Some(child) = BoardChild::from_keyword(&keyword) else {
            return p.skip_child("kicad_pcb", &keyword, line);
        };
        match child {
            BoardChild::Version => {
                let value = p.read_version(BOARD_FILE_VERSION)?;
                p.once(&mut version, "version", value)?;
            }
            BoardChild::Generator => {
                let generator = p.text()?;
                p.context_mut().generator = Some(generator);
            }
            BoardChild::GeneratorVersion => {
                let version = p.text()?;
                p.context_mut().generator_version = Some(version);
            }
            BoardChild::Host => read_host(p)?,
            BoardChild::General => {
                p.once(&mut general, "general", ())?;
                read_general(p, board, appending)?;
            }
            BoardChild::Paper | BoardChild::TitleBlock | BoardChild::Setup => {
                let blob = read_blob(p, keyword)?;
                let slot = match child {
                    BoardChild::Paper => &mut board.paper,
                    BoardChild::TitleBlock => &mut board.title_block,
                    _ => &mut board.setup,
                };
                if !appending {
                    *slot = Some(blob);
                }
            }
            BoardChild::Layers => {
                p.once(&mut layers, "layers", ())?;
                let defs = read_layer_defs(p)?;
                if !appending {
                    board.layers = defs;
                }
            }
            BoardChild::Net => {
                let local = int32(p)?;
                let name = p.text()?;
                let canonical = board.add_net(name);
                p.context_mut().map_net(local, canonical);
            }
            BoardChild::Footprint | BoardChild::Module => {
                p.context_mut().current_footprint = Some(board.footprints.len());
                let footprint = read_footprint(p);
                p.context_mut().current_footprint = None;
                board.footprints.push(footprint?);
            }
            BoardChild::GrLine => board.drawings.push(read_shape(p, ShapeKeyword::Line)?),
            BoardChild::GrRect => board.drawings.push(read_shape(p, ShapeKeyword::Rect)?),
            BoardChild::GrCircle => board.drawings.push(read_shape(p, ShapeKeyword::Circle)?),
            BoardChild::GrArc => board.drawings.push(read_shape(p, ShapeKeyword::Arc)?),
            BoardChild::GrPoly => board.drawings.push(read_shape(p, ShapeKeyword::Poly)?),
            BoardChild::Segment => board.tracks.push(read_segment(p)?),
            BoardChild::Arc => board.tracks.push(read_arc(p)?),
            BoardChild::Via => board.tracks.push(read_via(p)?),
            BoardChild::Zone => board.zones.push(read_zone(p)?),
            BoardChild::Group => {
                let group = read_group(p, board.groups.len())?;
                board.groups.push(group);
            }
            BoardChild::GrText
            | BoardChild::GrTextBox
            | BoardChild::Dimension
            | BoardChild::Target
            | BoardChild::Image
            | BoardChild::Property
            | BoardChild::Generated
            | BoardChild::EmbeddedFonts
            | BoardChild::EmbeddedFiles => board.extras.push(read_blob(p, keyword)?),
        }
        Ok(())
    })
}

/// Reads the body of `(footprint ...)` or the legacy `(module ...)`.
pub(crate) fn read_footprint(p: &mut BoardParser<'_>) -> Result<Footprint> {
    let mut footprint = Footprint::new(p.text()?);
    let mut version = None;

    // legacy files mix bare flags in with the children
    while !p.at_list_end() {
        if !p.at_list() {
            match read_bare_flag(p)? {
                FootprintChild::Locked => footprint.locked = true,
                _ => footprint.placed = true,
            }
            continue;
        }
        p.list(|p| {
            let line = p.line();
            let keyword = p.keyword()?;
            read_footprint_child(p, &mut footprint, &mut version, keyword, line)
        })?;
    }

    Ok(footprint)
}

fn read_footprint_child(
    p: &mut BoardParser<'_>,
    footprint: &mut Footprint,
    version: &mut Option<u32>,
    keyword: SmolStr,
    line: usize,
) -> Result<()> {
    let Some(child) = FootprintChild::from_keyword(&keyword) else {
        return p.skip_child("footprint", &keyword, line);
    };
    match child {
        FootprintChild::Version => {
            let value = p.read_version(BOARD_FILE_VERSION)?;
            p.once(version, "version", value)?;
        }
        FootprintChild::Generator => {
            let generator = p.text()?;
            p.context_mut().generator = Some(generator);
        }
        FootprintChild::GeneratorVersion => {
            let text = p.text()?;
            p.context_mut().generator_version = Some(text);
        }
        FootprintChild::Locked => footprint.locked = p.flag()?,
        FootprintChild::Placed => footprint.placed = p.flag()?,
        FootprintChild::Layer => footprint.layer = read_layer(p)?,
        // edit timestamps are no longer written
        FootprintChild::Tedit => p.skip_rest()?,
        FootprintChild::Uuid | FootprintChild::Tstamp => {
            footprint.uuid = Some(read_kiid(p)?)
        }
        FootprintChild::At => footprint.placement = read_placement(p)?,
        FootprintChild::Descr => footprint.description = Some(p.text()?),
        FootprintChild::Tags => footprint.tags = Some(p.text()?),
        FootprintChild::Property => footprint.properties.push(read_property(p)?),
        FootprintChild::Attr => {
            let mut attributes = Vec::new();
            while !p.at_list_end() {
                attributes.push(p.symbol()?);
            }
            footprint.attributes = Some(attributes);
        }
        FootprintChild::FpLine => footprint.drawings.push(read_shape(p, ShapeKeyword::Line)?),
        FootprintChild::FpRect => footprint.drawings.push(read_shape(p, ShapeKeyword::Rect)?),
        FootprintChild::FpCircle => {
            footprint.drawings.push(read_shape(p, ShapeKeyword::Circle)?)
        }
        FootprintChild::FpArc => footprint.drawings.push(read_shape(p, ShapeKeyword::Arc)?),
        FootprintChild::FpPoly => footprint.drawings.push(read_shape(p, ShapeKeyword::Poly)?),
        FootprintChild::Pad => footprint.pads.push(read_pad(p)?),
        FootprintChild::Group => {
            let group = read_group(p, footprint.groups.len())?;
            footprint.groups.push(group);
        }
        FootprintChild::Path
        | FootprintChild::Sheetname
        | FootprintChild::Sheetfile
        | FootprintChild::SolderMaskMargin
        | FootprintChild::SolderPasteMargin
        | FootprintChild::SolderPasteRatio
        | FootprintChild::SolderPasteMarginRatio
        | FootprintChild::Clearance
        | FootprintChild::ZoneConnect
        | FootprintChild::ThermalWidth
        | FootprintChild::ThermalGap
        | FootprintChild::NetTiePadGroups
        | FootprintChild::PrivateLayers
        | FootprintChild::FpText
        | FootprintChild::FpTextBox
        | FootprintChild::Model
        | FootprintChild::Zone
        | FootprintChild::Dimension
        | FootprintChild::EmbeddedFonts
        | FootprintChild::EmbeddedFiles => footprint.extras.push(read_blob(p, keyword)?),
    }
    Ok(())
}

/// Reads a legacy bare `locked` or `placed` atom, which later versions write
/// as a list.
fn read_bare_flag(p: &mut BoardParser<'_>) -> Result<FootprintChild> {
    let legacy = p.context().version < BARE_FLAGS_VERSION;
    p.symbol_with(
        |text| {
            FootprintChild::from_keyword(text)
                .filter(|child| legacy && matches!(child, FootprintChild::Locked | FootprintChild::Placed))
        },
        "`(`",
    )
}

fn read_property(p: &mut BoardParser<'_>) -> Result<Property> {
    let name = p.text()?;
    let value = p.text()?;
    let mut property = Property {
        name,
        value,
        placement: None,
        layer: None,
        uuid: None,
        hidden: false,
        unlocked: false,
        effects: None,
    };

    p.children(|p, keyword, line| {
        match keyword.as_str() {
            "at" => property.placement = Some(read_placement(p)?),
            "layer" => property.layer = Some(read_layer(p)?),
            "uuid" | "tstamp" => property.uuid = Some(read_kiid(p)?),
            "hide" => property.hidden = p.flag()?,
            "unlocked" => property.unlocked = p.flag()?,
            "effects" => property.effects = Some(read_blob(p, keyword)?),
            _ => p.skip_child("property", &keyword, line)?,
        }
        Ok(())
    })?;

    Ok(property)
}

fn read_pad(p: &mut BoardParser<'_>) -> Result<Pad> {
    let number = p.text()?;
    let kind = p.parse()?;
    let shape = p.parse()?;
    let mut locked = false;
    while !p.at_list_end() && !p.at_list() {
        locked |= read_bare_flag(p)? == FootprintChild::Locked;
    }

    let mut placement = None;
    let mut size = None;
    let mut drill = None;
    let mut layers = None;
    let mut roundrect_ratio = None;
    let mut net = None;
    let mut uuid = None;
    let mut extras = Vec::new();

    p.children(|p, keyword, line| {
        let Some(child) = PadChild::from_keyword(&keyword) else {
            return p.skip_child("pad", &keyword, line);
        };
        match child {
            PadChild::Locked => locked = p.flag()?,
            PadChild::At => {
                let value = read_placement(p)?;
                p.once(&mut placement, "at", value)?;
            }
            PadChild::Size => {
                let value = read_pair(p)?;
                p.once(&mut size, "size", value)?;
            }
            PadChild::Drill => {
                let value = read_drill(p)?;
                p.once(&mut drill, "drill", value)?;
            }
            PadChild::Layers => {
                let value = read_layer_set(p)?;
                p.once(&mut layers, "layers", value)?;
            }
            PadChild::RoundrectRratio => roundrect_ratio = Some(OrderedFloat(p.number()?)),
            PadChild::Net => {
                let code = int32(p)?;
                let code = p.context_mut().remap_net(code, line);
                let name = if p.at_list_end() { SmolStr::default() } else { p.text()? };
                net = Some(PadNet { code, name });
            }
            PadChild::Uuid | PadChild::Tstamp => uuid = Some(read_kiid(p)?),
            _ => extras.push(read_blob(p, keyword)?),
        }
        Ok(())
    })?;

    Ok(Pad {
        number,
        kind,
        shape,
        placement: p.required(placement, "at")?,
        size: p.required(size, "size")?,
        drill,
        layers: layers.unwrap_or_default(),
        roundrect_ratio,
        net,
        locked,
        uuid: uuid.unwrap_or_else(Kiid::new),
        extras,
    })
}

/// Reads `diameter`, `oval width height`, each optionally followed by `(offset x y)`.
fn read_drill(p: &mut BoardParser<'_>) -> Result<Drill> {
    let oval = matches!(p.peek(), Token::Symbol(text) if text == "oval");
    if oval {
        p.advance()?;
    }
    let width = read_mm(p)?;
    let height = if matches!(p.peek(), Token::Number(_)) {
        read_mm(p)?
    } else {
        width
    };

    let mut offset = None;
    p.children(|p, keyword, line| {
        if keyword == "offset" {
            let value = read_pair(p)?;
            p.once(&mut offset, "offset", value)
        } else {
            p.skip_child("drill", &keyword, line)
        }
    })?;

    Ok(Drill {
        oval,
        width,
        height,
        offset,
    })
}

/// Which graphic a `gr_*` or `fp_*` keyword names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKeyword {
    Line,
    Rect,
    Circle,
    Arc,
    Poly,
}

fn read_shape(p: &mut BoardParser<'_>, keyword: ShapeKeyword) -> Result<Shape> {
    let mut start = None;
    let mut mid = None;
    let mut end = None;
    let mut center = None;
    let mut points = None;
    let mut stroke = None;
    let mut fill = None;
    let mut layer = None;
    let mut locked = false;
    let mut uuid = None;

    p.children(|p, child_keyword, line| {
        let Some(child) = ShapeChild::from_keyword(&child_keyword) else {
            return p.skip_child("shape", &child_keyword, line);
        };
        match child {
            ShapeChild::Start => {
                let value = read_pair(p)?;
                p.once(&mut start, "start", value)?;
            }
            ShapeChild::Mid => {
                let value = read_pair(p)?;
                p.once(&mut mid, "mid", value)?;
            }
            ShapeChild::End => {
                let value = read_pair(p)?;
                p.once(&mut end, "end", value)?;
            }
            ShapeChild::Center => {
                let value = read_pair(p)?;
                p.once(&mut center, "center", value)?;
            }
            ShapeChild::Pts => {
                let value = read_points(p)?;
                p.once(&mut points, "pts", value)?;
            }
            ShapeChild::Width => {
                let width = read_mm(p)?;
                p.once(
                    &mut stroke,
                    "stroke",
                    Stroke {
                        width,
                        style: StrokeStyle::Default,
                    },
                )?;
            }
            ShapeChild::Stroke => {
                let value = read_stroke(p)?;
                p.once(&mut stroke, "stroke", value)?;
            }
            ShapeChild::Fill => {
                fill = Some(p.symbol_with(
                    |text| match text {
                        "yes" | "solid" => Some(true),
                        "no" | "none" => Some(false),
                        _ => None,
                    },
                    "`solid` or `none`",
                )?)
            }
            ShapeChild::Layer => {
                let value = read_layer(p)?;
                p.once(&mut layer, "layer", value)?;
            }
            ShapeChild::Locked => locked = p.flag()?,
            ShapeChild::Uuid | ShapeChild::Tstamp => uuid = Some(read_kiid(p)?),
        }
        Ok(())
    })?;

    let kind = match keyword {
        ShapeKeyword::Line => ShapeKind::Line {
            start: p.required(start, "start")?,
            end: p.required(end, "end")?,
        },
        ShapeKeyword::Rect => ShapeKind::Rect {
            start: p.required(start, "start")?,
            end: p.required(end, "end")?,
        },
        ShapeKeyword::Circle => ShapeKind::Circle {
            center: p.required(center, "center")?,
            end: p.required(end, "end")?,
        },
        ShapeKeyword::Arc => ShapeKind::Arc {
            start: p.required(start, "start")?,
            mid: p.required(mid, "mid")?,
            end: p.required(end, "end")?,
        },
        ShapeKeyword::Poly => ShapeKind::Poly {
            points: p.required(points, "pts")?,
        },
    };

    Ok(Shape {
        kind,
        stroke: stroke.unwrap_or(Stroke {
            width: 0,
            style: StrokeStyle::Default,
        }),
        fill,
        layer: p.required(layer, "layer")?,
        locked,
        uuid: uuid.unwrap_or_else(Kiid::new),
    })
}

fn read_stroke(p: &mut BoardParser<'_>) -> Result<Stroke> {
    let mut width = None;
    let mut style = None;
    p.children(|p, keyword, line| {
        match keyword.as_str() {
            "width" => {
                let value = read_mm(p)?;
                p.once(&mut width, "width", value)?;
            }
            "type" => {
                let value = p.parse()?;
                p.once(&mut style, "type", value)?;
            }
            _ => p.skip_child("stroke", &keyword, line)?,
        }
        Ok(())
    })?;
    Ok(Stroke {
        width: p.required(width, "width")?,
        style: style.unwrap_or(StrokeStyle::Default),
    })
}

/// Shared reader of `segment`, `arc` and `via` children.
#[derive(Default)]
struct TrackFields {
    start: Option<Point>,
    mid: Option<Point>,
    end: Option<Point>,
    at: Option<Point>,
    width: Option<i32>,
    size: Option<i32>,
    drill: Option<i32>,
    layer: Option<LayerId>,
    layers: Option<(LayerId, LayerId)>,
    net: Option<i32>,
    locked: bool,
    uuid: Option<Kiid>,
}

fn read_track_fields(p: &mut BoardParser<'_>, parent: &str) -> Result<TrackFields> {
    let mut fields = TrackFields::default();
    p.children(|p, keyword, line| {
        let Some(child) = TrackChild::from_keyword(&keyword) else {
            return p.skip_child(parent, &keyword, line);
        };
        match child {
            TrackChild::Start => {
                let value = read_pair(p)?;
                p.once(&mut fields.start, "start", value)?;
            }
            TrackChild::Mid => {
                let value = read_pair(p)?;
                p.once(&mut fields.mid, "mid", value)?;
            }
            TrackChild::End => {
                let value = read_pair(p)?;
                p.once(&mut fields.end, "end", value)?;
            }
            TrackChild::At => {
                let value = read_pair(p)?;
                p.once(&mut fields.at, "at", value)?;
            }
            TrackChild::Width => {
                let value = read_mm(p)?;
                p.once(&mut fields.width, "width", value)?;
            }
            TrackChild::Size => {
                let value = read_mm(p)?;
                p.once(&mut fields.size, "size", value)?;
            }
            TrackChild::Drill => {
                let value = read_mm(p)?;
                p.once(&mut fields.drill, "drill", value)?;
            }
            TrackChild::Layer => {
                let value = read_layer(p)?;
                p.once(&mut fields.layer, "layer", value)?;
            }
            TrackChild::Layers => {
                let top = read_layer(p)?;
                let bottom = read_layer(p)?;
                p.once(&mut fields.layers, "layers", (top, bottom))?;
            }
            TrackChild::Net => {
                let local = int32(p)?;
                let value = p.context_mut().remap_net(local, line);
                p.once(&mut fields.net, "net", value)?;
            }
            TrackChild::Locked => fields.locked = p.flag()?,
            TrackChild::Uuid | TrackChild::Tstamp => {
                let value = read_kiid(p)?;
                p.once(&mut fields.uuid, "uuid", value)?;
            }
        }
        Ok(())
    })?;
    Ok(fields)
}

fn read_segment(p: &mut BoardParser<'_>) -> Result<Track> {
    let fields = read_track_fields(p, "segment")?;
    Ok(Track::Segment(Segment {
        start: p.required(fields.start, "start")?,
        end: p.required(fields.end, "end")?,
        width: p.required(fields.width, "width")?,
        layer: p.required(fields.layer, "layer")?,
        net: fields.net.unwrap_or(0),
        locked: fields.locked,
        uuid: fields.uuid.unwrap_or_else(Kiid::new),
    }))
}

fn read_arc(p: &mut BoardParser<'_>) -> Result<Track> {
    let fields = read_track_fields(p, "arc")?;
    Ok(Track::Arc(ArcTrack {
        start: p.required(fields.start, "start")?,
        mid: p.required(fields.mid, "mid")?,
        end: p.required(fields.end, "end")?,
        width: p.required(fields.width, "width")?,
        layer: p.required(fields.layer, "layer")?,
        net: fields.net.unwrap_or(0),
        locked: fields.locked,
        uuid: fields.uuid.unwrap_or_else(Kiid::new),
    }))
}

fn read_via(p: &mut BoardParser<'_>) -> Result<Track> {
    let mut via_type = None;
    let mut locked = false;
    while !p.at_list_end() && !p.at_list() {
        if matches!(p.peek(), Token::Symbol(text) if text == "locked") {
            p.advance()?;
            locked = true;
        } else {
            via_type = Some(p.parse::<ViaType>()?);
        }
    }

    let fields = read_track_fields(p, "via")?;
    Ok(Track::Via(Via {
        via_type,
        at: p.required(fields.at, "at")?,
        size: p.required(fields.size, "size")?,
        drill: p.required(fields.drill, "drill")?,
        layers: fields.layers.unwrap_or((LayerId::F_CU, LayerId::B_CU)),
        net: fields.net.unwrap_or(0),
        locked: locked || fields.locked,
        uuid: fields.uuid.unwrap_or_else(Kiid::new),
    }))
}

fn read_zone(p: &mut BoardParser<'_>) -> Result<Zone> {
    let mut net = 0;
    let mut net_name = SmolStr::default();
    let mut layers = None;
    let mut uuid = None;
    let mut name = None;
    let mut priority = None;
    let mut locked = false;
    let mut outline = None;
    let mut settings = Vec::new();

    p.children(|p, keyword, line| {
        let Some(child) = ZoneChild::from_keyword(&keyword) else {
            return p.skip_child("zone", &keyword, line);
        };
        match child {
            ZoneChild::Net => {
                let local = int32(p)?;
                net = p.context_mut().remap_net(local, line);
            }
            ZoneChild::NetName => net_name = p.text()?,
            ZoneChild::Layer => {
                let value = LayerSet::from(read_layer(p)?);
                p.once(&mut layers, "layer", value)?;
            }
            ZoneChild::Layers => {
                let value = read_layer_set(p)?;
                p.once(&mut layers, "layers", value)?;
            }
            ZoneChild::Uuid | ZoneChild::Tstamp => uuid = Some(read_kiid(p)?),
            ZoneChild::Name => name = Some(p.text()?),
            ZoneChild::Priority => {
                let value = p.int()?;
                let value = u32::try_from(value).map_err(|_| {
                    p.error(
                        ErrorKind::Syntax {
                            expected: "priority".into(),
                        },
                        format!("zone priority {value} out of range"),
                    )
                })?;
                priority = Some(value);
            }
            ZoneChild::Locked => locked = p.flag()?,
            // further outlines are cut-outs, kept as written
            ZoneChild::Polygon if outline.is_some() => settings.push(read_blob(p, keyword)?),
            ZoneChild::Polygon => {
                let mut points = None;
                p.children(|p, keyword, line| {
                    if keyword == "pts" {
                        let value = read_points(p)?;
                        p.once(&mut points, "pts", value)
                    } else {
                        p.skip_child("polygon", &keyword, line)
                    }
                })?;
                outline = Some(p.required(points, "pts")?);
            }
            _ => settings.push(read_blob(p, keyword)?),
        }
        Ok(())
    })?;

    Ok(Zone {
        net,
        net_name,
        layers: p.required(layers, "layer")?,
        uuid: uuid.unwrap_or_else(Kiid::new),
        name,
        priority,
        locked,
        outline: outline.unwrap_or_default(),
        settings,
    })
}

/// Reads a group and records its members for resolution once the document is done.
fn read_group(p: &mut BoardParser<'_>, index: usize) -> Result<Group> {
    let line = p.line();
    let name = if p.at_list() || p.at_list_end() {
        SmolStr::default()
    } else {
        p.text()?
    };
    let mut uuid = None;
    let mut locked = false;
    let mut members = Vec::new();

    p.children(|p, keyword, line| {
        match keyword.as_str() {
            "uuid" | "id" => {
                let value = read_kiid(p)?;
                p.once(&mut uuid, "uuid", value)?;
            }
            "locked" => locked = p.flag()?,
            "members" => {
                while !p.at_list_end() {
                    members.push(read_kiid(p)?);
                }
            }
            _ => p.skip_child("group", &keyword, line)?,
        }
        Ok(())
    })?;

    let ctx = p.context_mut();
    ctx.groups.record(GroupRecord {
        owner: ctx
            .current_footprint
            .map_or(GroupOwner::Root, GroupOwner::Footprint),
        group: index,
        name: name.clone(),
        line,
        members,
    });

    Ok(Group {
        name,
        uuid: uuid.unwrap_or_else(Kiid::new),
        locked,
        members: Vec::new(),
    })
}

fn read_general(p: &mut BoardParser<'_>, board: &mut Board, appending: bool) -> Result<()> {
    p.children(|p, keyword, line| {
        match keyword.as_str() {
            "thickness" => {
                let thickness = read_mm(p)?;
                if !appending {
                    board.thickness = thickness;
                }
            }
            "legacy_teardrops" => {
                let value = p.boolean()?;
                if !appending {
                    board.legacy_teardrops = Some(value);
                }
            }
            _ => p.skip_child("general", &keyword, line)?,
        }
        Ok(())
    })
}

/// Reads the layer stack, registering user names as layer aliases.
fn read_layer_defs(p: &mut BoardParser<'_>) -> Result<Vec<LayerDef>> {
    let mut defs = Vec::new();
    while !p.at_list_end() {
        let def = p.list(|p| {
            let ordinal = int32(p)?;
            let layer = read_layer(p)?;
            let kind: LayerKind = p.parse()?;
            let user_name = if p.at_list_end() { None } else { Some(p.text()?) };
            p.skip_rest()?;
            Ok(LayerDef {
                ordinal,
                layer,
                kind,
                user_name,
            })
        })?;
        if let Some(user_name) = &def.user_name {
            p.context_mut().layers.add_alias(user_name.clone(), def.layer);
        }
        defs.push(def);
    }
    Ok(defs)
}

/// Reads the legacy `(host name version)` header.
fn read_host(p: &mut BoardParser<'_>) -> Result<()> {
    let generator = p.text()?;
    let version = if p.at_list_end() { None } else { Some(p.text()?) };
    p.skip_rest()?;
    let ctx = p.context_mut();
    ctx.generator = Some(generator);
    ctx.generator_version = version;
    Ok(())
}

/// Keeps the rest of a child verbatim, with its keyword.
fn read_blob(p: &mut BoardParser<'_>, keyword: SmolStr) -> Result<Value> {
    let mut items = vec![Value::symbol(keyword)];
    while !p.at_list_end() {
        items.push(p.parse()?);
    }
    let mut blob = Value::List(items);
    if p.context().appending() {
        map_blob_ids(&mut blob, p.context_mut());
    }
    Ok(blob)
}

/// Substitutes the identifiers of `(uuid X)` and `(tstamp X)` lists anywhere in `value`.
fn map_blob_ids(value: &mut Value, ctx: &mut ParseContext) {
    let Value::List(items) = value else {
        return;
    };
    if let [Value::Atom(Atom::Symbol(keyword)), Value::Atom(id)] = items.as_mut_slice() {
        if matches!(keyword.as_str(), "uuid" | "tstamp") {
            if let Some(kiid) = Kiid::parse(id.as_str()) {
                *id = Atom::String(ctx.map_id(kiid).to_string().into());
            }
            return;
        }
    }
    for item in items {
        map_blob_ids(item, ctx);
    }
}

fn read_mm(p: &mut BoardParser<'_>) -> Result<i32> {
    Ok(mm_to_iu(p.number()?))
}

/// Reads a bare `X Y` pair.
fn read_pair(p: &mut BoardParser<'_>) -> Result<Point> {
    Ok(Point::new(read_mm(p)?, read_mm(p)?))
}

/// Reads the `(xy X Y)` and `(arc ...)` entries of a point list.
fn read_points(p: &mut BoardParser<'_>) -> Result<Vec<PolyVertex>> {
    let mut vertices = Vec::new();
    p.children(|p, keyword, line| {
        match keyword.as_str() {
            "xy" => vertices.push(PolyVertex::Point(read_pair(p)?)),
            "arc" => vertices.push(read_poly_arc(p)?),
            _ => p.skip_child("pts", &keyword, line)?,
        }
        Ok(())
    })?;
    Ok(vertices)
}

fn read_poly_arc(p: &mut BoardParser<'_>) -> Result<PolyVertex> {
    let mut start = None;
    let mut mid = None;
    let mut end = None;
    p.children(|p, keyword, line| {
        let slot = match keyword.as_str() {
            "start" => &mut start,
            "mid" => &mut mid,
            "end" => &mut end,
            _ => return p.skip_child("arc", &keyword, line),
        };
        let value = read_pair(p)?;
        p.once(slot, &keyword, value)
    })?;
    Ok(PolyVertex::Arc {
        start: p.required(start, "start")?,
        mid: p.required(mid, "mid")?,
        end: p.required(end, "end")?,
    })
}

/// Reads `X Y [angle]`.
fn read_placement(p: &mut BoardParser<'_>) -> Result<Placement> {
    let position = read_pair(p)?;
    let angle = if matches!(p.peek(), Token::Number(_)) {
        p.number()?
    } else {
        0.0
    };
    // `unlocked` after the angle belongs to older text items
    p.skip_rest()?;
    Ok(Placement {
        position,
        angle: OrderedFloat(angle),
    })
}

fn read_layer(p: &mut BoardParser<'_>) -> Result<LayerId> {
    let line = p.line();
    let name = p.text()?;
    p.context_mut().layer(&name, line).ok_or_else(|| {
        p.error(
            ErrorKind::UnknownLayer(name.clone()),
            format!("unknown layer `{name}`"),
        )
    })
}

fn read_layer_set(p: &mut BoardParser<'_>) -> Result<LayerSet> {
    let mut set = LayerSet::empty();
    while !p.at_list_end() {
        let line = p.line();
        let name = p.text()?;
        set = set | p.context_mut().layer_mask(&name, line);
    }
    Ok(set)
}

fn read_kiid(p: &mut BoardParser<'_>) -> Result<Kiid> {
    let id = match p.peek() {
        Token::Symbol(text) | Token::Number(text) | Token::QuotedString(text) => Kiid::parse(text),
        _ => None,
    };
    let Some(id) = id else {
        return Err(p.expected("identifier"));
    };
    p.advance()?;
    Ok(p.context_mut().map_id(id))
}

fn int32(p: &mut BoardParser<'_>) -> Result<i32> {
    let value = p.int()?;
    i32::try_from(value).map_err(|_| {
        p.error(
            ErrorKind::Syntax {
                expected: "integer".into(),
            },
            format!("integer {value} out of range"),
        )
    })
}
