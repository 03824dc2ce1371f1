use super::{
    Board, Drill, Footprint, Group, Kiid, LayerDef, Pad, Placement, Point, PolyVertex, Property,
    Shape, ShapeKind, Stroke, Track, Zone,
};
use crate::context::BOARD_FILE_VERSION;
use crate::layers::{LayerId, LayerSet};
use crate::printer::{Print, Printer};
use crate::units::{format_decimal, format_mm};
use crate::{GENERATOR, GENERATOR_VERSION};

fn mm<P: Printer>(p: &mut P, value: i32) -> Result<(), P::Error> {
    p.symbol(&format_mm(value))
}

fn int<P: Printer>(p: &mut P, value: impl ToString) -> Result<(), P::Error> {
    p.symbol(&value.to_string())
}

fn pair<P: Printer>(p: &mut P, keyword: &str, point: Point) -> Result<(), P::Error> {
    p.form(keyword, |p| {
        mm(p, point.x)?;
        mm(p, point.y)
    })
}

fn points<P: Printer>(p: &mut P, vertices: &[PolyVertex]) -> Result<(), P::Error> {
    p.form("pts", |p| {
        for vertex in vertices {
            match *vertex {
                PolyVertex::Point(point) => pair(p, "xy", point)?,
                PolyVertex::Arc { start, mid, end } => p.form("arc", |p| {
                    pair(p, "start", start)?;
                    pair(p, "mid", mid)?;
                    pair(p, "end", end)
                })?,
            }
        }
        Ok(())
    })
}

fn flag<P: Printer>(p: &mut P, keyword: &str, value: bool) -> Result<(), P::Error> {
    p.form(keyword, |p| p.symbol(if value { "yes" } else { "no" }))
}

fn layer<P: Printer>(p: &mut P, layer: LayerId) -> Result<(), P::Error> {
    p.form("layer", |p| p.print(layer))
}

fn uuid<P: Printer>(p: &mut P, id: Kiid) -> Result<(), P::Error> {
    p.form("uuid", |p| p.print(id))
}

pub(crate) fn header<P: Printer>(p: &mut P, version: u32) -> Result<(), P::Error> {
    p.form("version", |p| int(p, version))?;
    p.form("generator", |p| p.string(GENERATOR))?;
    p.form("generator_version", |p| p.string(GENERATOR_VERSION))
}

impl Print for Kiid {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.string(&self.to_string())
    }
}

impl Print for Placement {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.form("at", |p| {
            mm(p, self.position.x)?;
            mm(p, self.position.y)?;
            if self.angle.0 != 0.0 {
                p.symbol(&format_decimal(self.angle.0))?;
            }
            Ok(())
        })
    }
}

impl Print for LayerDef {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.list(|p| {
            int(p, self.ordinal)?;
            p.print(self.layer)?;
            p.print(self.kind)?;
            match &self.user_name {
                Some(name) => p.string(name),
                None => Ok(()),
            }
        })
    }
}

impl Print for Board {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.form("kicad_pcb", |p| {
            header(p, BOARD_FILE_VERSION)?;
            p.form("general", |p| {
                p.form("thickness", |p| mm(p, self.thickness))?;
                match self.legacy_teardrops {
                    Some(value) => flag(p, "legacy_teardrops", value),
                    None => Ok(()),
                }
            })?;
            p.print(&self.paper)?;
            p.print(&self.title_block)?;
            if !self.layers.is_empty() {
                p.form("layers", |p| p.print(&self.layers))?;
            }
            p.print(&self.setup)?;
            for net in &self.nets {
                p.form("net", |p| {
                    int(p, net.code)?;
                    p.string(&net.name)
                })?;
            }
            p.print(&self.footprints)?;
            for shape in &self.drawings {
                print_shape(p, "gr", shape)?;
            }
            p.print(&self.tracks)?;
            p.print(&self.zones)?;
            for group in &self.groups {
                print_group(p, group, &self.group_members(group))?;
            }
            p.print(&self.extras)
        })
    }
}

/// A footprint written as a library file, with a format header.
pub(crate) struct FootprintFile<'a>(pub &'a Footprint);

impl Print for FootprintFile<'_> {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        print_footprint(printer, self.0, true)
    }
}

impl Print for Footprint {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        print_footprint(printer, self, false)
    }
}

fn print_footprint<P: Printer>(
    printer: &mut P,
    footprint: &Footprint,
    file: bool,
) -> Result<(), P::Error> {
    printer.form("footprint", |p| {
        p.string(&footprint.lib_id)?;
        if file {
            header(p, BOARD_FILE_VERSION)?;
        }
        if footprint.locked {
            flag(p, "locked", true)?;
        }
        if footprint.placed {
            flag(p, "placed", true)?;
        }
        layer(p, footprint.layer)?;
        if let Some(id) = footprint.uuid {
            uuid(p, id)?;
        }
        if !file || footprint.placement != Placement::default() {
            p.print(footprint.placement)?;
        }
        if let Some(description) = &footprint.description {
            p.form("descr", |p| p.string(description))?;
        }
        if let Some(tags) = &footprint.tags {
            p.form("tags", |p| p.string(tags))?;
        }
        p.print(&footprint.properties)?;
        if let Some(attributes) = &footprint.attributes {
            p.form("attr", |p| {
                for attribute in attributes {
                    p.symbol(attribute)?;
                }
                Ok(())
            })?;
        }
        p.print(&footprint.extras)?;
        for shape in &footprint.drawings {
            print_shape(p, "fp", shape)?;
        }
        p.print(&footprint.pads)?;
        for group in &footprint.groups {
            print_group(p, group, &footprint.group_members(group))?;
        }
        Ok(())
    })
}

impl Print for Property {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.form("property", |p| {
            p.string(&self.name)?;
            p.string(&self.value)?;
            p.print(self.placement)?;
            if self.unlocked {
                flag(p, "unlocked", true)?;
            }
            if let Some(id) = self.layer {
                layer(p, id)?;
            }
            if self.hidden {
                flag(p, "hide", true)?;
            }
            if let Some(id) = self.uuid {
                uuid(p, id)?;
            }
            p.print(&self.effects)
        })
    }
}

impl Print for Drill {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.form("drill", |p| {
            if self.oval {
                p.symbol("oval")?;
            }
            mm(p, self.width)?;
            if self.oval || self.height != self.width {
                mm(p, self.height)?;
            }
            match self.offset {
                Some(offset) => pair(p, "offset", offset),
                None => Ok(()),
            }
        })
    }
}

impl Print for Pad {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.form("pad", |p| {
            p.string(&self.number)?;
            p.print(self.kind)?;
            p.print(self.shape)?;
            if self.locked {
                flag(p, "locked", true)?;
            }
            p.print(self.placement)?;
            pair(p, "size", self.size)?;
            p.print(self.drill)?;
            p.form("layers", |p| p.print(self.layers))?;
            if let Some(ratio) = self.roundrect_ratio {
                p.form("roundrect_rratio", |p| p.symbol(&format_decimal(ratio.0)))?;
            }
            if let Some(net) = &self.net {
                p.form("net", |p| {
                    int(p, net.code)?;
                    p.string(&net.name)
                })?;
            }
            uuid(p, self.uuid)?;
            p.print(&self.extras)
        })
    }
}

impl Print for Stroke {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.form("stroke", |p| {
            p.form("width", |p| mm(p, self.width))?;
            p.form("type", |p| p.print(self.style))
        })
    }
}

fn print_shape<P: Printer>(printer: &mut P, prefix: &str, shape: &Shape) -> Result<(), P::Error> {
    let keyword = format!("{prefix}_{}", shape.kind.keyword());
    printer.form(&keyword, |p| {
        match &shape.kind {
            ShapeKind::Line { start, end } | ShapeKind::Rect { start, end } => {
                pair(p, "start", *start)?;
                pair(p, "end", *end)?;
            }
            ShapeKind::Circle { center, end } => {
                pair(p, "center", *center)?;
                pair(p, "end", *end)?;
            }
            ShapeKind::Arc { start, mid, end } => {
                pair(p, "start", *start)?;
                pair(p, "mid", *mid)?;
                pair(p, "end", *end)?;
            }
            ShapeKind::Poly { points: outline } => points(p, outline)?,
        }
        p.print(shape.stroke)?;
        if let Some(fill) = shape.fill {
            p.form("fill", |p| p.symbol(if fill { "solid" } else { "none" }))?;
        }
        if shape.locked {
            flag(p, "locked", true)?;
        }
        layer(p, shape.layer)?;
        uuid(p, shape.uuid)
    })
}

impl Print for Track {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        match self {
            Track::Segment(segment) => printer.form("segment", |p| {
                pair(p, "start", segment.start)?;
                pair(p, "end", segment.end)?;
                p.form("width", |p| mm(p, segment.width))?;
                if segment.locked {
                    flag(p, "locked", true)?;
                }
                layer(p, segment.layer)?;
                p.form("net", |p| int(p, segment.net))?;
                uuid(p, segment.uuid)
            }),
            Track::Arc(arc) => printer.form("arc", |p| {
                pair(p, "start", arc.start)?;
                pair(p, "mid", arc.mid)?;
                pair(p, "end", arc.end)?;
                p.form("width", |p| mm(p, arc.width))?;
                if arc.locked {
                    flag(p, "locked", true)?;
                }
                layer(p, arc.layer)?;
                p.form("net", |p| int(p, arc.net))?;
                uuid(p, arc.uuid)
            }),
            Track::Via(via) => printer.form("via", |p| {
                p.print(via.via_type)?;
                pair(p, "at", via.at)?;
                p.form("size", |p| mm(p, via.size))?;
                p.form("drill", |p| mm(p, via.drill))?;
                p.form("layers", |p| {
                    p.print(via.layers.0)?;
                    p.print(via.layers.1)
                })?;
                if via.locked {
                    flag(p, "locked", true)?;
                }
                p.form("net", |p| int(p, via.net))?;
                uuid(p, via.uuid)
            }),
        }
    }
}

impl Print for Zone {
    fn print<P: Printer>(&self, printer: &mut P) -> Result<(), P::Error> {
        printer.form("zone", |p| {
            p.form("net", |p| int(p, self.net))?;
            p.form("net_name", |p| p.string(&self.net_name))?;
            match single_layer(self.layers) {
                Some(id) => layer(p, id)?,
                None => p.form("layers", |p| p.print(self.layers))?,
            }
            uuid(p, self.uuid)?;
            if let Some(name) = &self.name {
                p.form("name", |p| p.string(name))?;
            }
            if let Some(priority) = self.priority {
                p.form("priority", |p| int(p, priority))?;
            }
            if self.locked {
                flag(p, "locked", true)?;
            }
            // the first polygon is the outline, the rest are kept settings
            p.form("polygon", |p| points(p, &self.outline))?;
            p.print(&self.settings)
        })
    }
}

fn single_layer(layers: LayerSet) -> Option<LayerId> {
    let mut iter = layers.iter();
    match (iter.next(), iter.next()) {
        (Some(layer), None) => Some(layer),
        _ => None,
    }
}

fn print_group<P: Printer>(printer: &mut P, group: &Group, members: &[Kiid]) -> Result<(), P::Error> {
    printer.form("group", |p| {
        p.string(&group.name)?;
        uuid(p, group.uuid)?;
        if group.locked {
            flag(p, "locked", true)?;
        }
        p.form("members", |p| {
            for member in members {
                p.print(member)?;
            }
            Ok(())
        })
    })
}

#[cfg(test)]
mod test {
    use crate::board::{Kiid, Placement, Point};
    use crate::printer::to_string;
    use ordered_float::OrderedFloat;

    #[test]
    fn test_placement_omits_zero_angle() {
        let placement = Placement {
            position: Point::from_mm(1.5, -2.0),
            angle: OrderedFloat(0.0),
        };
        assert_eq!(to_string(placement), "(at 1.5 -2)");
        let rotated = Placement {
            angle: OrderedFloat(90.0),
            ..placement
        };
        assert_eq!(to_string(rotated), "(at 1.5 -2 90)");
    }

    #[test]
    fn test_kiid_is_quoted() {
        let id = Kiid::parse("00000000-0000-0000-0000-00005c1a2b3d").unwrap();
        assert_eq!(to_string(id), r#""00000000-0000-0000-0000-00005c1a2b3d""#);
    }
}
