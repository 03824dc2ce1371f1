//! Layer identifiers, layer sets and the per-document name table.
use crate::printer::{Print, Printer};
use crate::util::keyword_enum;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::fmt::Display;
use std::ops::BitOr;

const LAYER_NAMES: [&str; LayerId::COUNT] = [
    "F.Cu", "In1.Cu", "In2.Cu", "In3.Cu", "In4.Cu", "In5.Cu", "In6.Cu", "In7.Cu", "In8.Cu",
    "In9.Cu", "In10.Cu", "In11.Cu", "In12.Cu", "In13.Cu", "In14.Cu", "In15.Cu", "In16.Cu",
    "In17.Cu", "In18.Cu", "In19.Cu", "In20.Cu", "In21.Cu", "In22.Cu", "In23.Cu", "In24.Cu",
    "In25.Cu", "In26.Cu", "In27.Cu", "In28.Cu", "In29.Cu", "In30.Cu", "B.Cu", "B.Adhes",
    "F.Adhes", "B.Paste", "F.Paste", "B.SilkS", "F.SilkS", "B.Mask", "F.Mask", "Dwgs.User",
    "Cmts.User", "Eco1.User", "Eco2.User", "Edge.Cuts", "Margin", "B.CrtYd", "F.CrtYd", "B.Fab",
    "F.Fab", "User.1", "User.2", "User.3", "User.4", "User.5", "User.6", "User.7", "User.8",
    "User.9", "Rescue",
];

/// Names the board editor shows instead of the canonical ones.
const ALIASES: [(&str, LayerId); 12] = [
    ("F.Adhesive", LayerId(33)),
    ("B.Adhesive", LayerId(32)),
    ("F.Silkscreen", LayerId(37)),
    ("B.Silkscreen", LayerId(36)),
    ("F.Courtyard", LayerId(47)),
    ("B.Courtyard", LayerId(46)),
    ("User.Drawings", LayerId(40)),
    ("User.Comments", LayerId(41)),
    ("User.Eco1", LayerId(42)),
    ("User.Eco2", LayerId(43)),
    ("F.Fabrication", LayerId(49)),
    ("B.Fabrication", LayerId(48)),
];

/// A canonical layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u8);

impl LayerId {
    pub const COUNT: usize = 60;

    pub const F_CU: LayerId = LayerId(0);
    pub const B_CU: LayerId = LayerId(31);
    pub const B_ADHES: LayerId = LayerId(32);
    pub const F_ADHES: LayerId = LayerId(33);
    pub const B_PASTE: LayerId = LayerId(34);
    pub const F_PASTE: LayerId = LayerId(35);
    pub const B_SILKS: LayerId = LayerId(36);
    pub const F_SILKS: LayerId = LayerId(37);
    pub const B_MASK: LayerId = LayerId(38);
    pub const F_MASK: LayerId = LayerId(39);
    pub const EDGE_CUTS: LayerId = LayerId(44);
    pub const B_CRTYD: LayerId = LayerId(46);
    pub const F_CRTYD: LayerId = LayerId(47);
    pub const B_FAB: LayerId = LayerId(48);
    pub const F_FAB: LayerId = LayerId(49);
    /// Items on layers this codec cannot name end up here.
    pub const RESCUE: LayerId = LayerId(59);

    /// The `n`th inner copper layer, counting from one.
    pub fn inner(n: u8) -> Option<Self> {
        (1..=30).contains(&n).then_some(LayerId(n))
    }

    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index)
            .ok()
            .filter(|index| usize::from(*index) < Self::COUNT)
            .map(LayerId)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The canonical on-disk name.
    pub fn name(self) -> &'static str {
        LAYER_NAMES[self.index()]
    }

    pub fn is_copper(self) -> bool {
        self.0 <= Self::B_CU.0
    }

    fn all() -> impl Iterator<Item = LayerId> {
        (0..Self::COUNT as u8).map(LayerId)
    }
}

impl Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Print for LayerId {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.string(self.name())
    }
}

/// A set of layers as a bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LayerSet(u64);

impl LayerSet {
    pub const fn empty() -> Self {
        LayerSet(0)
    }

    pub fn all_copper() -> Self {
        (0..=LayerId::B_CU.0).map(LayerId).collect()
    }

    pub fn inner_copper() -> Self {
        (1..LayerId::B_CU.0).map(LayerId).collect()
    }

    pub fn contains(self, layer: LayerId) -> bool {
        self.0 & (1 << layer.0) != 0
    }

    pub fn insert(&mut self, layer: LayerId) {
        self.0 |= 1 << layer.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_superset(self, other: LayerSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Layers in the set, in canonical order.
    pub fn iter(self) -> impl Iterator<Item = LayerId> {
        LayerId::all().filter(move |layer| self.contains(*layer))
    }
}

impl BitOr for LayerSet {
    type Output = LayerSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        LayerSet(self.0 | rhs.0)
    }
}

impl From<LayerId> for LayerSet {
    fn from(layer: LayerId) -> Self {
        LayerSet(1 << layer.0)
    }
}

impl FromIterator<LayerId> for LayerSet {
    fn from_iter<I: IntoIterator<Item = LayerId>>(iter: I) -> Self {
        let mut set = LayerSet::empty();
        for layer in iter {
            set.insert(layer);
        }
        set
    }
}

fn pair(front: LayerId, back: LayerId) -> LayerSet {
    LayerSet::from(front) | LayerSet::from(back)
}

fn wildcards() -> [(&'static str, LayerSet); 9] {
    [
        ("*.Cu", LayerSet::all_copper()),
        ("*In.Cu", LayerSet::inner_copper()),
        ("F&B.Cu", pair(LayerId::F_CU, LayerId::B_CU)),
        ("*.Adhes", pair(LayerId::F_ADHES, LayerId::B_ADHES)),
        ("*.Paste", pair(LayerId::F_PASTE, LayerId::B_PASTE)),
        ("*.SilkS", pair(LayerId::F_SILKS, LayerId::B_SILKS)),
        ("*.Mask", pair(LayerId::F_MASK, LayerId::B_MASK)),
        ("*.CrtYd", pair(LayerId::F_CRTYD, LayerId::B_CRTYD)),
        ("*.Fab", pair(LayerId::F_FAB, LayerId::B_FAB)),
    ]
}

/// Writes the set as layer names, using wildcards where a whole family is present.
impl Print for LayerSet {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        let mut rest = *self;
        for (name, mask) in wildcards() {
            if rest.is_superset(mask) {
                printer.string(name)?;
                rest = LayerSet(rest.0 & !mask.0);
            }
        }
        for layer in rest.iter() {
            printer.print(layer)?;
        }
        Ok(())
    }
}

/// Maps on-disk layer names to layers and layer masks.
///
/// Every document gets its own table: the board's `layers` section adds the
/// user-chosen names of its layers as aliases.
#[derive(Debug, Clone)]
pub struct LayerTable {
    indices: HashMap<SmolStr, LayerId>,
    masks: HashMap<SmolStr, LayerSet>,
}

impl Default for LayerTable {
    fn default() -> Self {
        let mut table = LayerTable {
            indices: HashMap::new(),
            masks: HashMap::new(),
        };
        for layer in LayerId::all() {
            table.indices.insert(layer.name().into(), layer);
            table.masks.insert(layer.name().into(), LayerSet::from(layer));
        }
        for (name, layer) in ALIASES {
            table.add_alias(name, layer);
        }
        for (name, mask) in wildcards() {
            table.masks.insert(name.into(), mask);
        }
        table
    }
}

impl LayerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a single-layer name.
    pub fn layer(&self, name: &str) -> Option<LayerId> {
        self.indices.get(name).copied()
    }

    /// Resolves a name usable in a layer set, wildcards included.
    pub fn mask(&self, name: &str) -> Option<LayerSet> {
        self.masks.get(name).copied()
    }

    /// Makes `name` another spelling of `layer`. Canonical names are never
    /// shadowed.
    pub fn add_alias(&mut self, name: impl Into<SmolStr>, layer: LayerId) {
        let name = name.into();
        if LAYER_NAMES.contains(&name.as_str()) {
            return;
        }
        self.masks.insert(name.clone(), LayerSet::from(layer));
        self.indices.insert(name, layer);
    }
}

keyword_enum! {
    /// How a layer is used in the stack-up.
    pub enum LayerKind {
        Signal => "signal",
        Power => "power",
        Mixed => "mixed",
        Jumper => "jumper",
        User => "user",
        Front => "front",
        Back => "back",
    }
}
