//! The object graph of boards and footprints.
//!
//! Linear dimensions are internal units (see [`crate::units`]); angles are in
//! degrees. Constructs the model does not break down further, such as text
//! effects or the board setup, are kept as [`Value`] trees and written back
//! as read.
mod read;
mod write;

pub(crate) use read::{read_board, read_footprint};
pub(crate) use write::{header, FootprintFile};

use crate::context::{GroupScope, ItemRef};
use crate::layers::{LayerId, LayerKind, LayerSet};
use crate::units::mm_to_iu;
use crate::util::{keyword_enum, Value};
use ordered_float::OrderedFloat;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::fmt::Display;
use uuid::Uuid;

/// Identifier of an item, unique within a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kiid(Uuid);

impl Kiid {
    /// A fresh random identifier.
    pub fn new() -> Self {
        Kiid(Uuid::new_v4())
    }

    /// Reads an identifier in UUID form, or a legacy 8-digit hex timestamp.
    pub fn parse(text: &str) -> Option<Self> {
        if text.len() == 8 {
            let stamp = u32::from_str_radix(text, 16).ok()?;
            return Some(Kiid(Uuid::from_u128(u128::from(stamp))));
        }
        Uuid::parse_str(text).ok().map(Kiid)
    }
}

/// The identifier of an item kept verbatim, from its `uuid` or `tstamp` child.
fn blob_id(value: &Value) -> Option<Kiid> {
    let child = value.get("uuid").or_else(|| value.get("tstamp"))?;
    match child.as_list()? {
        [_, Value::Atom(id)] => Kiid::parse(id.as_str()),
        _ => None,
    }
}

/// Indexes the verbatim items of a group owner that carry an identifier.
fn extra_ids(extras: &[Value]) -> impl Iterator<Item = (Kiid, ItemRef)> + '_ {
    extras
        .iter()
        .enumerate()
        .filter_map(|(i, extra)| blob_id(extra).map(|id| (id, ItemRef::Extra(i))))
}

impl Default for Kiid {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Kiid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub fn from_mm(x: f64, y: f64) -> Self {
        Point::new(mm_to_iu(x), mm_to_iu(y))
    }
}

/// Position and rotation, as in `(at x y angle)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Placement {
    pub position: Point,
    pub angle: OrderedFloat<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Net {
    pub code: i32,
    pub name: SmolStr,
}

/// An entry of the board's layer stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDef {
    /// The number the file gives the layer.
    pub ordinal: i32,
    pub layer: LayerId,
    pub kind: LayerKind,
    /// The name shown to users, when it differs from the canonical one.
    pub user_name: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub thickness: i32,
    pub legacy_teardrops: Option<bool>,
    pub paper: Option<Value>,
    pub title_block: Option<Value>,
    pub layers: Vec<LayerDef>,
    pub setup: Option<Value>,
    pub nets: Vec<Net>,
    pub footprints: Vec<Footprint>,
    pub drawings: Vec<Shape>,
    pub tracks: Vec<Track>,
    pub zones: Vec<Zone>,
    pub groups: Vec<Group>,
    /// Board-level constructs kept verbatim, such as texts and dimensions.
    pub extras: Vec<Value>,
}

impl Default for Board {
    fn default() -> Self {
        Board {
            thickness: mm_to_iu(1.6),
            legacy_teardrops: None,
            paper: None,
            title_block: None,
            layers: Vec::new(),
            setup: None,
            nets: vec![Net {
                code: 0,
                name: SmolStr::default(),
            }],
            footprints: Vec::new(),
            drawings: Vec::new(),
            tracks: Vec::new(),
            zones: Vec::new(),
            groups: Vec::new(),
            extras: Vec::new(),
        }
    }
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn net_by_name(&self, name: &str) -> Option<&Net> {
        self.nets.iter().find(|net| net.name == name)
    }

    /// Adds a net unless one of the same name exists, returning its code.
    pub fn add_net(&mut self, name: impl Into<SmolStr>) -> i32 {
        let name = name.into();
        if let Some(net) = self.net_by_name(&name) {
            return net.code;
        }
        let code = self.nets.len() as i32;
        self.nets.push(Net { code, name });
        code
    }

    /// The members of `group`, by identifier.
    pub fn group_members(&self, group: &Group) -> Vec<Kiid> {
        group
            .members
            .iter()
            .filter_map(|item| self.item_id(*item))
            .collect()
    }
}

impl GroupScope for Board {
    fn member_index(&self) -> HashMap<Kiid, ItemRef> {
        let footprints = self.footprints.iter().enumerate().filter_map(|(i, footprint)| {
            footprint.uuid.map(|id| (id, ItemRef::Footprint(i)))
        });
        let tracks = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, track)| (track.uuid(), ItemRef::Track(i)));
        let drawings = self
            .drawings
            .iter()
            .enumerate()
            .map(|(i, shape)| (shape.uuid, ItemRef::Drawing(i)));
        let zones = self
            .zones
            .iter()
            .enumerate()
            .map(|(i, zone)| (zone.uuid, ItemRef::Zone(i)));
        let groups = self
            .groups
            .iter()
            .enumerate()
            .map(|(i, group)| (group.uuid, ItemRef::Group(i)));
        footprints
            .chain(tracks)
            .chain(drawings)
            .chain(zones)
            .chain(groups)
            .chain(extra_ids(&self.extras))
            .collect()
    }

    fn item_id(&self, item: ItemRef) -> Option<Kiid> {
        match item {
            ItemRef::Footprint(i) => self.footprints.get(i)?.uuid,
            ItemRef::Track(i) => self.tracks.get(i).map(Track::uuid),
            ItemRef::Drawing(i) => self.drawings.get(i).map(|shape| shape.uuid),
            ItemRef::Zone(i) => self.zones.get(i).map(|zone| zone.uuid),
            ItemRef::Group(i) => self.groups.get(i).map(|group| group.uuid),
            ItemRef::Extra(i) => blob_id(self.extras.get(i)?),
            ItemRef::Pad(_) => None,
        }
    }

    fn groups(&self) -> &[Group] {
        &self.groups
    }

    fn groups_mut(&mut self) -> &mut [Group] {
        &mut self.groups
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    /// Library identifier, `library:name`.
    pub lib_id: SmolStr,
    pub layer: LayerId,
    /// Absent in library files.
    pub uuid: Option<Kiid>,
    pub placement: Placement,
    pub locked: bool,
    pub placed: bool,
    pub description: Option<SmolStr>,
    pub tags: Option<SmolStr>,
    pub properties: Vec<Property>,
    /// Atoms of `(attr ...)`, such as `smd` or `board_only`.
    pub attributes: Option<Vec<SmolStr>>,
    pub drawings: Vec<Shape>,
    pub pads: Vec<Pad>,
    pub groups: Vec<Group>,
    /// Footprint constructs kept verbatim, such as texts and 3D models.
    pub extras: Vec<Value>,
}

impl Footprint {
    pub fn new(lib_id: impl Into<SmolStr>) -> Self {
        Footprint {
            lib_id: lib_id.into(),
            layer: LayerId::F_CU,
            uuid: None,
            placement: Placement::default(),
            locked: false,
            placed: false,
            description: None,
            tags: None,
            properties: Vec::new(),
            attributes: None,
            drawings: Vec::new(),
            pads: Vec::new(),
            groups: Vec::new(),
            extras: Vec::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|property| property.name == name)
    }

    pub fn group_members(&self, group: &Group) -> Vec<Kiid> {
        group
            .members
            .iter()
            .filter_map(|item| self.item_id(*item))
            .collect()
    }
}

impl GroupScope for Footprint {
    fn member_index(&self) -> HashMap<Kiid, ItemRef> {
        let pads = self
            .pads
            .iter()
            .enumerate()
            .map(|(i, pad)| (pad.uuid, ItemRef::Pad(i)));
        let drawings = self
            .drawings
            .iter()
            .enumerate()
            .map(|(i, shape)| (shape.uuid, ItemRef::Drawing(i)));
        let groups = self
            .groups
            .iter()
            .enumerate()
            .map(|(i, group)| (group.uuid, ItemRef::Group(i)));
        pads.chain(drawings)
            .chain(groups)
            .chain(extra_ids(&self.extras))
            .collect()
    }

    fn item_id(&self, item: ItemRef) -> Option<Kiid> {
        match item {
            ItemRef::Pad(i) => self.pads.get(i).map(|pad| pad.uuid),
            ItemRef::Drawing(i) => self.drawings.get(i).map(|shape| shape.uuid),
            ItemRef::Group(i) => self.groups.get(i).map(|group| group.uuid),
            ItemRef::Extra(i) => blob_id(self.extras.get(i)?),
            ItemRef::Footprint(_) | ItemRef::Track(_) | ItemRef::Zone(_) => None,
        }
    }

    fn groups(&self) -> &[Group] {
        &self.groups
    }

    fn groups_mut(&mut self) -> &mut [Group] {
        &mut self.groups
    }
}

/// A named field of a footprint, like its reference or value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: SmolStr,
    pub value: SmolStr,
    pub placement: Option<Placement>,
    pub layer: Option<LayerId>,
    pub uuid: Option<Kiid>,
    pub hidden: bool,
    pub unlocked: bool,
    pub effects: Option<Value>,
}

keyword_enum! {
    pub enum PadType {
        ThroughHole => "thru_hole",
        Smd => "smd",
        Connect => "connect",
        NpThroughHole => "np_thru_hole",
    }
}

keyword_enum! {
    pub enum PadShape {
        Circle => "circle",
        Rect => "rect",
        Oval => "oval",
        Trapezoid => "trapezoid",
        RoundRect => "roundrect",
        Custom => "custom",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drill {
    pub oval: bool,
    pub width: i32,
    /// Equal to `width` for round holes.
    pub height: i32,
    pub offset: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadNet {
    pub code: i32,
    pub name: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pad {
    /// The pad "number", which may be any text.
    pub number: SmolStr,
    pub kind: PadType,
    pub shape: PadShape,
    pub placement: Placement,
    pub size: Point,
    pub drill: Option<Drill>,
    pub layers: LayerSet,
    pub roundrect_ratio: Option<OrderedFloat<f64>>,
    pub net: Option<PadNet>,
    pub locked: bool,
    pub uuid: Kiid,
    /// Pad settings kept verbatim, such as clearances and pin functions.
    pub extras: Vec<Value>,
}

keyword_enum! {
    pub enum StrokeStyle {
        Default => "default",
        Solid => "solid",
        Dash => "dash",
        Dot => "dot",
        DashDot => "dash_dot",
        DashDotDot => "dash_dot_dot",
    }
}

/// Line width and style. The legacy `(width w)` form reads as the default style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stroke {
    pub width: i32,
    pub style: StrokeStyle,
}

/// An entry of a `(pts ...)` list: a corner, or an arc through three points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyVertex {
    Point(Point),
    Arc { start: Point, mid: Point, end: Point },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    Line { start: Point, end: Point },
    Rect { start: Point, end: Point },
    /// `end` is a point on the circle.
    Circle { center: Point, end: Point },
    Arc { start: Point, mid: Point, end: Point },
    Poly { points: Vec<PolyVertex> },
}

impl ShapeKind {
    /// The keyword suffix after `gr_` or `fp_`.
    pub fn keyword(&self) -> &'static str {
        match self {
            ShapeKind::Line { .. } => "line",
            ShapeKind::Rect { .. } => "rect",
            ShapeKind::Circle { .. } => "circle",
            ShapeKind::Arc { .. } => "arc",
            ShapeKind::Poly { .. } => "poly",
        }
    }
}

/// A graphic item on a board or in a footprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub stroke: Stroke,
    pub fill: Option<bool>,
    pub layer: LayerId,
    pub locked: bool,
    pub uuid: Kiid,
}

keyword_enum! {
    pub enum ViaType {
        Blind => "blind",
        Micro => "micro",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    pub width: i32,
    pub layer: LayerId,
    pub net: i32,
    pub locked: bool,
    pub uuid: Kiid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcTrack {
    pub start: Point,
    pub mid: Point,
    pub end: Point,
    pub width: i32,
    pub layer: LayerId,
    pub net: i32,
    pub locked: bool,
    pub uuid: Kiid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via {
    pub via_type: Option<ViaType>,
    pub at: Point,
    pub size: i32,
    pub drill: i32,
    /// Top and bottom copper layers.
    pub layers: (LayerId, LayerId),
    pub net: i32,
    pub locked: bool,
    pub uuid: Kiid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Track {
    Segment(Segment),
    Arc(ArcTrack),
    Via(Via),
}

impl Track {
    pub fn uuid(&self) -> Kiid {
        match self {
            Track::Segment(segment) => segment.uuid,
            Track::Arc(arc) => arc.uuid,
            Track::Via(via) => via.uuid,
        }
    }

    pub fn net(&self) -> i32 {
        match self {
            Track::Segment(segment) => segment.net,
            Track::Arc(arc) => arc.net,
            Track::Via(via) => via.net,
        }
    }
}

/// A copper pour or keep-out area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub net: i32,
    pub net_name: SmolStr,
    pub layers: LayerSet,
    pub uuid: Kiid,
    pub name: Option<SmolStr>,
    pub priority: Option<u32>,
    pub locked: bool,
    pub outline: Vec<PolyVertex>,
    /// Fill and clearance settings, kept verbatim.
    pub settings: Vec<Value>,
}

/// A named collection of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: SmolStr,
    pub uuid: Kiid,
    pub locked: bool,
    /// Resolved members, relative to the board or footprint owning the group.
    pub members: Vec<ItemRef>,
}
