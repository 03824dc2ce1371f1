//! Document-scoped state threaded through the reader.
//!
//! A [`ParseContext`] lives exactly as long as one parse. It owns the lookup
//! tables item readers consult (layers, nets, identifiers), collects group
//! declarations for the resolution pass and accumulates the tolerated problems
//! reported back in a [`ParseReport`].
use crate::board::{Board, Footprint, Group, Kiid};
use crate::layers::{LayerId, LayerSet, LayerTable};
use crate::options::ParseOptions;
use crate::parser::{ErrorKind, Parser, Result};
use smol_str::SmolStr;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Format version of board and footprint files written by this crate.
pub const BOARD_FILE_VERSION: u32 = 20241229;

/// Format version of library tables written by this crate.
pub const LIB_TABLE_VERSION: u32 = 7;

/// Version assumed for documents that do not state one.
pub const LEGACY_BOARD_VERSION: u32 = 20171130;

/// First version in which footprints write `locked` and `placed` as lists
/// rather than bare atoms.
pub(crate) const BARE_FLAGS_VERSION: u32 = 20240108;

/// A problem the reader recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A child construct this reader does not know was skipped.
    SkippedConstruct { parent: SmolStr, keyword: SmolStr },
    /// A layer name missing from the layer table.
    UndefinedLayer(SmolStr),
    /// A net code with no entry in the net table.
    UnmappedNet(i32),
    /// A group member that names no item of the group's owner.
    UnresolvedMember { group: SmolStr, member: Kiid },
    /// A group member listed twice, or already claimed by another group.
    DuplicateMember { group: SmolStr, member: Kiid },
}

/// What the reader learned about a document besides its contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub version: u32,
    pub generator: Option<SmolStr>,
    pub generator_version: Option<SmolStr>,
    /// The document is newer than this crate. Its unknown parts were skipped.
    pub too_recent: bool,
    /// Every distinct layer name the layer table could not resolve.
    pub undefined_layers: BTreeSet<SmolStr>,
    pub diagnostics: Vec<Diagnostic>,
}

/// An item a group can hold, indexing into the collections of the group's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemRef {
    Footprint(usize),
    Track(usize),
    Drawing(usize),
    Pad(usize),
    Group(usize),
    Zone(usize),
    /// An item kept verbatim, such as a text or a dimension.
    Extra(usize),
}

/// Something that owns groups and the items they may contain.
pub(crate) trait GroupScope {
    /// Every identifiable item, by identifier.
    fn member_index(&self) -> HashMap<Kiid, ItemRef>;

    fn item_id(&self, item: ItemRef) -> Option<Kiid>;

    fn groups(&self) -> &[Group];

    fn groups_mut(&mut self) -> &mut [Group];
}

/// The object a recorded group belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupOwner {
    /// The document's top-level board or footprint.
    Root,
    /// A footprint placed on the board, by index.
    Footprint(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct GroupRecord {
    pub owner: GroupOwner,
    /// Index into the owner's groups.
    pub group: usize,
    pub name: SmolStr,
    pub line: usize,
    pub members: Vec<Kiid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum GroupPhase {
    #[default]
    Collecting,
    Resolving,
    Done,
}

/// Defers group membership until every item of the document has been read,
/// since groups may list members declared after them.
#[derive(Debug, Default)]
pub(crate) struct GroupResolver {
    phase: GroupPhase,
    records: Vec<GroupRecord>,
}

impl GroupResolver {
    pub fn record(&mut self, record: GroupRecord) {
        debug_assert_eq!(self.phase, GroupPhase::Collecting);
        self.records.push(record);
    }

    pub fn phase(&self) -> GroupPhase {
        self.phase
    }

    /// Resolves every record against its owner, reachable from `board`.
    fn resolve_board(&mut self, board: &mut Board, diagnostics: &mut Vec<Diagnostic>) {
        for record in self.begin() {
            match record.owner {
                GroupOwner::Root => attach(board, record, diagnostics),
                GroupOwner::Footprint(index) => match board.footprints.get_mut(index) {
                    Some(footprint) => attach(footprint, record, diagnostics),
                    None => tracing::warn!(index, "group owner footprint vanished"),
                },
            }
        }
        self.phase = GroupPhase::Done;
    }

    fn resolve_footprint(&mut self, footprint: &mut Footprint, diagnostics: &mut Vec<Diagnostic>) {
        for record in self.begin() {
            attach(footprint, record, diagnostics);
        }
        self.phase = GroupPhase::Done;
    }

    fn begin(&mut self) -> Vec<GroupRecord> {
        debug_assert_eq!(self.phase, GroupPhase::Collecting);
        self.phase = GroupPhase::Resolving;
        std::mem::take(&mut self.records)
    }
}

fn attach<S: GroupScope>(scope: &mut S, record: GroupRecord, diagnostics: &mut Vec<Diagnostic>) {
    let index = scope.member_index();
    let mut claimed: HashSet<ItemRef> = scope
        .groups()
        .iter()
        .flat_map(|group| group.members.iter().copied())
        .collect();

    let mut members = Vec::with_capacity(record.members.len());
    for member in record.members {
        let kind = match index.get(&member) {
            Some(&ItemRef::Group(target)) if target == record.group => {
                Some(DiagnosticKind::DuplicateMember {
                    group: record.name.clone(),
                    member,
                })
            }
            Some(item) if claimed.insert(*item) => {
                members.push(*item);
                None
            }
            Some(_) => Some(DiagnosticKind::DuplicateMember {
                group: record.name.clone(),
                member,
            }),
            None => Some(DiagnosticKind::UnresolvedMember {
                group: record.name.clone(),
                member,
            }),
        };

        if let Some(kind) = kind {
            tracing::warn!(line = record.line, group = %record.name, %member, "dropping group member");
            diagnostics.push(Diagnostic {
                line: record.line,
                kind,
            });
        }
    }

    if let Some(group) = scope.groups_mut().get_mut(record.group) {
        group.members = members;
    }
}

/// Mutable state of one parse.
#[derive(Debug)]
pub struct ParseContext {
    pub(crate) options: ParseOptions,
    pub(crate) version: u32,
    pub(crate) generator: Option<SmolStr>,
    pub(crate) generator_version: Option<SmolStr>,
    pub(crate) too_recent: bool,
    pub(crate) layers: LayerTable,
    /// Net codes of the document, mapped to codes of the target board.
    net_remap: HashMap<i32, i32>,
    /// Identifier substitutions, present when appending to an existing board.
    id_map: Option<HashMap<Kiid, Kiid>>,
    pub(crate) groups: GroupResolver,
    /// The board footprint being read, if any.
    pub(crate) current_footprint: Option<usize>,
    undefined_layers: BTreeSet<SmolStr>,
    diagnostics: Vec<Diagnostic>,
}

impl ParseContext {
    pub fn new(options: ParseOptions) -> Self {
        ParseContext {
            options,
            version: LEGACY_BOARD_VERSION,
            generator: None,
            generator_version: None,
            too_recent: false,
            layers: LayerTable::new(),
            net_remap: HashMap::new(),
            id_map: None,
            groups: GroupResolver::default(),
            current_footprint: None,
            undefined_layers: BTreeSet::new(),
            diagnostics: Vec::new(),
        }
    }

    /// A context that gives every identifier it sees a fresh replacement.
    pub fn for_append(options: ParseOptions) -> Self {
        ParseContext {
            id_map: Some(HashMap::new()),
            ..ParseContext::new(options)
        }
    }

    /// Whether the document is being added to an existing board.
    pub(crate) fn appending(&self) -> bool {
        self.id_map.is_some()
    }

    /// Records the document's format version, flagging versions newer than `supported`.
    pub(crate) fn set_version(&mut self, version: u32, supported: u32) {
        self.version = version;
        if version > supported {
            tracing::warn!(version, supported, "document is newer than this reader");
            self.too_recent = true;
        }
    }

    /// Resolves a single-layer name. Unknown names move to the rescue layer,
    /// or yield `None` when layers are strict.
    pub(crate) fn layer(&mut self, name: &str, line: usize) -> Option<LayerId> {
        if let Some(layer) = self.layers.layer(name) {
            return Some(layer);
        }
        self.undefined_layer(name, line);
        (!self.options.strict_layers).then_some(LayerId::RESCUE)
    }

    /// Resolves a name inside a layer set. Unknown names contribute nothing.
    pub(crate) fn layer_mask(&mut self, name: &str, line: usize) -> LayerSet {
        match self.layers.mask(name) {
            Some(mask) => mask,
            None => {
                self.undefined_layer(name, line);
                LayerSet::empty()
            }
        }
    }

    fn undefined_layer(&mut self, name: &str, line: usize) {
        if self.undefined_layers.insert(name.into()) {
            tracing::warn!(line, layer = name, "undefined layer");
            self.diagnostics.push(Diagnostic {
                line,
                kind: DiagnosticKind::UndefinedLayer(name.into()),
            });
        }
    }

    /// Remembers that the document's net `local` is `canonical` in the target board.
    pub(crate) fn map_net(&mut self, local: i32, canonical: i32) {
        self.net_remap.insert(local, canonical);
    }

    /// Translates a net code of the document into the target board's numbering.
    /// Codes outside the table pass through unchanged.
    pub fn remap_net(&mut self, local: i32, line: usize) -> i32 {
        match self.net_remap.get(&local) {
            Some(canonical) => *canonical,
            None => {
                if !self.net_remap.is_empty() {
                    tracing::debug!(line, net = local, "net code outside the net table");
                    self.diagnostics.push(Diagnostic {
                        line,
                        kind: DiagnosticKind::UnmappedNet(local),
                    });
                }
                local
            }
        }
    }

    /// The identifier to use for `id` read from the document.
    pub fn map_id(&mut self, id: Kiid) -> Kiid {
        match &mut self.id_map {
            None => id,
            Some(map) => *map.entry(id).or_insert_with(|| {
                let fresh = Kiid::new();
                tracing::debug!(%id, %fresh, "substituting identifier");
                fresh
            }),
        }
    }

    /// Records a child construct that was skipped.
    pub(crate) fn skipped(&mut self, parent: &str, keyword: &str, line: usize) {
        tracing::debug!(line, parent, keyword, "skipping unknown construct");
        self.diagnostics.push(Diagnostic {
            line,
            kind: DiagnosticKind::SkippedConstruct {
                parent: parent.into(),
                keyword: keyword.into(),
            },
        });
    }

    pub(crate) fn resolve_board_groups(&mut self, board: &mut Board) {
        self.groups.resolve_board(board, &mut self.diagnostics);
    }

    pub(crate) fn resolve_footprint_groups(&mut self, footprint: &mut Footprint) {
        self.groups.resolve_footprint(footprint, &mut self.diagnostics);
    }

    pub fn into_report(self) -> ParseReport {
        ParseReport {
            version: self.version,
            generator: self.generator,
            generator_version: self.generator_version,
            too_recent: self.too_recent,
            undefined_layers: self.undefined_layers,
            diagnostics: self.diagnostics,
        }
    }
}

impl Parser<'_, ParseContext> {
    /// Reads the value of `(version N)`, flagging documents newer than `supported`.
    pub(crate) fn read_version(&mut self, supported: u32) -> Result<u32> {
        let value = self.int()?;
        let version = u32::try_from(value).map_err(|_| {
            self.error(
                ErrorKind::Syntax {
                    expected: "version".into(),
                },
                format!("invalid version {value}"),
            )
        })?;
        self.context_mut().set_version(version, supported);
        Ok(version)
    }

    /// Skips the rest of a child construct this reader does not know.
    pub(crate) fn skip_child(&mut self, parent: &str, keyword: &str, line: usize) -> Result<()> {
        self.context_mut().skipped(parent, keyword, line);
        self.skip_rest()
    }
}

#[cfg(test)]
mod test {
    use super::{DiagnosticKind, ParseContext};
    use crate::board::Kiid;
    use crate::layers::LayerId;
    use crate::options::ParseOptions;

    #[test]
    fn test_unknown_layer_recorded_once() {
        let mut ctx = ParseContext::new(ParseOptions::default());
        assert_eq!(ctx.layer("Mystery", 3), Some(LayerId::RESCUE));
        assert_eq!(ctx.layer("Mystery", 9), Some(LayerId::RESCUE));
        assert!(ctx.layer_mask("Mystery", 10).is_empty());
        let report = ctx.into_report();
        assert_eq!(report.undefined_layers.len(), 1);
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_strict_layers() {
        let mut ctx = ParseContext::new(ParseOptions::new().with_strict_layers(true));
        assert_eq!(ctx.layer("Mystery", 1), None);
        assert_eq!(ctx.layer("B.Cu", 1), Some(LayerId::B_CU));
    }

    #[test]
    fn test_net_remap() {
        let mut ctx = ParseContext::new(ParseOptions::default());
        assert_eq!(ctx.remap_net(4, 1), 4);
        ctx.map_net(0, 0);
        ctx.map_net(3, 7);
        assert_eq!(ctx.remap_net(3, 1), 7);
        assert_eq!(ctx.remap_net(1, 1), 1);
        assert_eq!(ctx.remap_net(12, 1), 12);
        assert_eq!(ctx.remap_net(-1, 1), -1);
        ctx.map_net(i32::MAX, 2);
        assert_eq!(ctx.remap_net(i32::MAX, 1), 2);
        let report = ctx.into_report();
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnmappedNet(12)));
    }

    #[test]
    fn test_append_ids_are_consistent() {
        let mut fresh = ParseContext::new(ParseOptions::default());
        let id = Kiid::new();
        assert_eq!(fresh.map_id(id), id);

        let mut append = ParseContext::for_append(ParseOptions::default());
        let first = append.map_id(id);
        assert_ne!(first, id);
        assert_eq!(append.map_id(id), first);
    }
}
