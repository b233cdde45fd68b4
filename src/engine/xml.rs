//! Regina's XML data format.
//!
//! Files are written in the third-generation layout: a `<regina>` root
//! holding one element per packet, named after the packet's kind
//! (`<container>`, `<tri>`, `<textdata>` and so on), with the packet's tags
//! and children nested inside it. A packet that something else refers to
//! (a script variable's target, or the triangulation a surface list was
//! enumerated in) carries an `id`.
//!
//! Second-generation files, a `<reginadata>` root with generic
//! `<packet type=... typeid=...>` elements, are read too for the kinds that
//! generation could hold. Packets of any other kind are skipped along with
//! their subtrees.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fmt::Write;

use base64::Engine as _;

use crate::engine::{skeleton, snappea};
use crate::model::link::Link;
use crate::model::packet::{Packet, PacketId, PacketKind, PacketRef, Payload, Script, SnapPeaData};
use crate::model::perm::Perm;
use crate::model::polynomial::{Invariant, Polynomial};
use crate::model::surfaces::{AngleStructure, AngleStructureList, HyperCoords, ListFlags, NormalCoords, NormalHypersurface, NormalHypersurfaceList, NormalSurface, NormalSurfaceList, SurfaceFilter};
use crate::model::triangulation::Triangulation;
use crate::util;

/// Elements that stand for a packet, in either generation.
const PACKET_ELEMENTS: [&str; 14] = [
    "container", "tri", "snappeadata", "surfaces", "hypersurfaces", "angles",
    "filtertrivial", "filterprop", "filtercomb", "link", "textdata",
    "attachment", "script", "packet",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlError {
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/* writing */

fn attr(text: &str) -> String {
    util::escape_xml(text)
}

fn element_name(payload: &Payload) -> &'static str {
    match payload {
        Payload::Container => "container",
        Payload::Triangulation(_) => "tri",
        Payload::SnapPea(_) => "snappeadata",
        Payload::NormalSurfaces(_) => "surfaces",
        Payload::NormalHypersurfaces(_) => "hypersurfaces",
        Payload::AngleStructures(_) => "angles",
        Payload::SurfaceFilter(SurfaceFilter::Trivial) => "filtertrivial",
        Payload::SurfaceFilter(SurfaceFilter::Properties { .. }) => "filterprop",
        Payload::SurfaceFilter(SurfaceFilter::Combination { .. }) => "filtercomb",
        Payload::Link(_) => "link",
        Payload::Text(_) => "textdata",
        Payload::Pdf(_) => "attachment",
        Payload::Script(_) => "script",
    }
}

/// The triangulation a list packet was enumerated in.
fn list_triangulation(payload: &Payload) -> Option<&Triangulation> {
    match payload {
        Payload::NormalSurfaces(list) => Some(list.triangulation()),
        Payload::NormalHypersurfaces(list) => Some(list.triangulation()),
        Payload::AngleStructures(list) => Some(list.triangulation()),
        _ => None,
    }
}

/// The parent, if it holds exactly the triangulation `tri`.
fn triangulation_parent(packet: &PacketRef, tri: &Triangulation) -> Option<PacketRef> {
    packet.parent().filter(|parent| matches!(&*parent.payload(), Payload::Triangulation(t) if t == tri))
}

fn sparse(vector: &[i64]) -> String {
    vector.iter().enumerate()
        .filter(|(_, v)| **v != 0)
        .map(|(i, v)| format!("{} {}", i, v))
        .collect::<Vec<_>>()
        .join(" ")
}

struct Writer {
    out: String,
    /* packets referred to from elsewhere, with the id written for them */
    ids: HashMap<PacketId, String>,
    anonymous: usize,
}

impl Writer {
    fn new(top: &PacketRef) -> Writer {
        let mut referenced = HashSet::new();
        for packet in top.subtree() {
            let payload = packet.payload();
            if let Payload::Script(script) = &*payload {
                referenced.extend(script.variables().iter().filter_map(|v| v.resolve()).map(|p| p.id()));
            }
            if let Some(parent) = list_triangulation(&payload).and_then(|tri| triangulation_parent(&packet, tri)) {
                referenced.insert(parent.id());
            }
        }

        let ids = top.subtree().iter().enumerate()
            .filter(|(_, p)| referenced.contains(&p.id()))
            .map(|(i, p)| (p.id(), format!("p{}", i)))
            .collect();
        Writer { out: String::new(), ids, anonymous: 0 }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn simplices(&mut self, tri: &Triangulation, depth: usize) {
        for simplex in tri.simplices() {
            let gluings: Vec<String> = simplex.gluings().iter().map(|g| match g {
                Some(g) => format!("{} {}", g.simplex, g.perm.sn_index()),
                None => "-1 -1".to_string(),
            }).collect();
            self.indent(depth);
            let _ = writeln!(self.out, "<simplex desc=\"{}\"> {} </simplex>", attr(&simplex.description), gluings.join(" "));
        }
    }

    fn header(&mut self, element: &str, attributes: &[(&str, String)], packet: Option<&PacketRef>, id: Option<&str>, depth: usize) {
        self.indent(depth);
        self.out.push('<');
        self.out.push_str(element);
        for (name, value) in attributes {
            let _ = write!(self.out, " {}=\"{}\"", name, attr(value));
        }
        if let Some(packet) = packet {
            let _ = write!(self.out, " label=\"{}\"", attr(&packet.label()));
        }
        if let Some(id) = id {
            let _ = write!(self.out, " id=\"{}\"", attr(id));
        }
        self.out.push_str(">\n");
    }

    fn footer(&mut self, element: &str, depth: usize) {
        self.indent(depth);
        let _ = writeln!(self.out, "</{}>", element);
    }

    /// A triangulation that is needed as a reference but is not in the
    /// tree, written as an anonymous block. Returns its id.
    fn anonymous_triangulation(&mut self, tri: &Triangulation, depth: usize) -> String {
        self.anonymous+= 1;
        let id = format!("anon{}", self.anonymous);
        self.indent(depth);
        self.out.push_str("<anon>\n");
        self.header("tri", &[("dim", tri.dim().to_string()), ("size", tri.size().to_string()), ("perm", "index".to_string())], None, Some(&id), depth + 1);
        self.simplices(tri, depth + 2);
        self.footer("tri", depth + 1);
        self.indent(depth);
        self.out.push_str("</anon>\n");
        id
    }

    fn attributes(&mut self, packet: &PacketRef, payload: &Payload, depth: usize) -> Vec<(&'static str, String)> {
        let mut attributes = match payload {
            Payload::Triangulation(tri) => vec![("dim", tri.dim().to_string()), ("size", tri.size().to_string()), ("perm", "index".to_string())],
            Payload::NormalSurfaces(list) => vec![("coords", list.enumerated.key().to_string()), ("flags", list.flags.bits().to_string())],
            Payload::NormalHypersurfaces(list) => vec![("coords", list.enumerated.key().to_string()), ("flags", list.flags.bits().to_string())],
            Payload::AngleStructures(list) => vec![("taut", list.taut_only.to_string())],
            Payload::SurfaceFilter(SurfaceFilter::Properties { orientable, compact, boundary, euler }) => {
                let tri_state = |b: &Option<bool>| b.map_or(String::new(), |b| b.to_string());
                let euler: Vec<String> = euler.iter().map(i64::to_string).collect();
                vec![("orientable", tri_state(orientable)), ("compact", tri_state(compact)), ("boundary", tri_state(boundary)), ("euler", euler.join(" "))]
            },
            Payload::SurfaceFilter(SurfaceFilter::Combination { use_and }) => vec![("op", if *use_and { "and" } else { "or" }.to_string())],
            Payload::Pdf(_) => vec![("encoding", "base64".to_string())],
            _ => Vec::new(),
        };

        if let Some(tri) = list_triangulation(payload) {
            let parent_id = triangulation_parent(packet, tri).and_then(|p| self.ids.get(&p.id()).cloned());
            let id = match parent_id {
                Some(id) => id,
                None => self.anonymous_triangulation(tri, depth),
            };
            attributes.push(("tri", id));
        }
        attributes
    }

    fn content(&mut self, payload: &Payload, label: &str, depth: usize) {
        match payload {
            Payload::Container | Payload::SurfaceFilter(_) => {},
            Payload::Triangulation(tri) => self.simplices(tri, depth),
            Payload::SnapPea(data) => {
                let text = snappea::write(&data.triangulation, &skeleton::compute(&data.triangulation), label);
                self.indent(depth);
                let _ = writeln!(self.out, "<snappea>{}</snappea>", util::escape_xml(&text));
            },
            Payload::NormalSurfaces(list) => {
                for s in list.surfaces() {
                    self.indent(depth);
                    let _ = writeln!(self.out, "<surface len=\"{}\" name=\"{}\"> {} </surface>", s.vector().len(), attr(&s.name), sparse(s.vector()));
                }
            },
            Payload::NormalHypersurfaces(list) => {
                for s in list.surfaces() {
                    self.indent(depth);
                    let _ = writeln!(self.out, "<hypersurface len=\"{}\" name=\"{}\"> {} </hypersurface>", s.vector().len(), attr(&s.name), sparse(s.vector()));
                }
            },
            Payload::AngleStructures(list) => {
                for s in list.structures() {
                    self.indent(depth);
                    let angles: Vec<String> = s.angles().iter().map(|(n, d)| format!("{}/{}", n, d)).collect();
                    let _ = writeln!(self.out, "<structure>{}</structure>", angles.join(" "));
                }
            },
            Payload::Link(link) => {
                self.indent(depth);
                let _ = writeln!(self.out, "<jenkins>{}</jenkins>", link.jenkins());
                for (invariant, poly) in link.cached_polynomials() {
                    self.indent(depth);
                    let _ = writeln!(self.out, "<poly invariant=\"{}\">{}</poly>", invariant.key(), poly.to_storage());
                }
            },
            Payload::Text(text) => {
                self.indent(depth);
                let _ = writeln!(self.out, "<text>{}</text>", util::escape_xml(text));
            },
            Payload::Pdf(data) => {
                self.indent(depth);
                let _ = writeln!(self.out, "{}", base64::engine::general_purpose::STANDARD.encode(data));
            },
            Payload::Script(script) => {
                for variable in script.variables() {
                    let target = variable.resolve().and_then(|p| self.ids.get(&p.id()).cloned()).unwrap_or_default();
                    self.indent(depth);
                    let _ = writeln!(self.out, "<var name=\"{}\" valueid=\"{}\"/>", attr(&variable.name), attr(&target));
                }
                self.indent(depth);
                let _ = writeln!(self.out, "<code>{}</code>", util::escape_xml(&script.text));
            },
        }
    }

    fn packet(&mut self, packet: &PacketRef, depth: usize) {
        let payload = packet.payload().clone();
        let element = element_name(&payload);
        let attributes = self.attributes(packet, &payload, depth);
        let id = self.ids.get(&packet.id()).cloned();

        self.header(element, &attributes, Some(packet), id.as_deref(), depth);
        self.content(&payload, &packet.label(), depth + 1);
        for tag in packet.tags() {
            self.indent(depth + 1);
            let _ = writeln!(self.out, "<tag name=\"{}\"/>", attr(&tag));
        }
        for child in packet.children() {
            self.packet(&child, depth + 1);
        }
        self.footer(element, depth);
    }
}

/// Serialises `packet` and its whole subtree.
pub fn write_tree(packet: &PacketRef) -> String {
    let mut writer = Writer::new(packet);
    writer.out.push_str("<?xml version=\"1.0\"?>\n");
    let _ = writeln!(writer.out, "<regina engine=\"{}\">", env!("CARGO_PKG_VERSION"));
    writer.packet(packet, 0);
    writer.out.push_str("</regina>\n");
    writer.out
}

/* reading */

#[derive(Clone, Copy)]
enum PermCoding {
    /// Position in the alternating-sign order of Sn.
    Index,
    /// Images packed two or three bits apiece.
    Pack,
}

/// What a script variable points at.
enum Target {
    Id(String),
    /// Second-generation files name the target by label.
    Label(String),
}

struct Reader<'a, 'input> {
    doc: &'a roxmltree::Document<'input>,
    ids: HashMap<String, PacketRef>,
    /* (script packet, variable, target) resolved once the whole tree exists */
    pending: Vec<(PacketRef, String, Target)>,
}

impl<'a, 'input> Reader<'a, 'input> {
    fn error(&self, node: roxmltree::Node<'_, 'input>, message: impl Into<String>) -> XmlError {
        XmlError {
            line: Some(self.doc.text_pos_at(node.range().start).row as usize),
            message: message.into(),
        }
    }

    fn child<'n>(&self, node: roxmltree::Node<'n, 'input>, name: &str) -> Result<roxmltree::Node<'n, 'input>, XmlError> {
        node.children().find(|c| c.has_tag_name(name)).ok_or_else(|| self.error(node, format!("missing <{}> element", name)))
    }

    fn children<'n>(node: roxmltree::Node<'n, 'input>, name: &'n str) -> impl Iterator<Item = roxmltree::Node<'n, 'input>> + 'n {
        node.children().filter(move |c| c.has_tag_name(name))
    }

    fn number<T: std::str::FromStr>(&self, node: roxmltree::Node<'_, 'input>, attribute: &str) -> Result<T, XmlError> {
        node.attribute(attribute)
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| self.error(node, format!("missing or malformed attribute \"{}\"", attribute)))
    }

    /// Reads the `size` simplex elements named `tag` under `node`.
    fn simplices(&self, node: roxmltree::Node<'_, 'input>, dim: usize, size: usize, tag: &str, coding: PermCoding) -> Result<Triangulation, XmlError> {
        if !(2..=4).contains(&dim) {
            return Err(self.error(node, format!("unsupported dimension {}", dim)));
        }
        let simplices: Vec<_> = Self::children(node, tag).collect();
        if simplices.len() != size {
            return Err(self.error(node, format!("expected {} simplices but found {}", size, simplices.len())));
        }

        let mut tri = Triangulation::new(dim);
        for _ in 0..size {
            tri.add_simplex();
        }
        for (s, simplex) in simplices.iter().enumerate() {
            if let Some(desc) = simplex.attribute("desc") {
                tri.set_description(s, desc.to_string()).map_err(|e| self.error(*simplex, e.to_string()))?;
            }
            let tokens: Vec<&str> = simplex.text().unwrap_or("").split_whitespace().collect();
            if tokens.len() != 2 * (dim + 1) {
                return Err(self.error(*simplex, "each simplex needs a target and a permutation for every facet"));
            }
            for (facet, pair) in tokens.chunks(2).enumerate() {
                let target: i64 = pair[0].parse().map_err(|_| self.error(*simplex, format!("\"{}\" is not a simplex number", pair[0])))?;
                let existing = tri.adjacent(s, facet);
                if target < 0 {
                    if existing.is_some() {
                        return Err(self.error(*simplex, format!("facet {} is boundary here but glued elsewhere", facet)));
                    }
                    continue;
                }
                if target as usize >= size {
                    return Err(self.error(*simplex, format!("there is no simplex {}", target)));
                }
                let perm = pair[1].parse::<u32>().ok()
                    .and_then(|code| match coding {
                        PermCoding::Index => Perm::from_sn_index(dim + 1, code as usize),
                        PermCoding::Pack => Perm::from_image_pack(dim + 1, code),
                    })
                    .ok_or_else(|| self.error(*simplex, format!("\"{}\" is not a gluing permutation", pair[1])))?;
                if let Some(existing) = existing {
                    if existing.simplex as i64 != target || existing.perm != perm {
                        return Err(self.error(*simplex, format!("facet {} disagrees with its partner", facet)));
                    }
                    continue;
                }
                tri.join(s, facet, target as usize, perm).map_err(|e| self.error(*simplex, e.to_string()))?;
            }
        }

        if !tri.is_consistent() {
            return Err(self.error(node, "the gluings are not symmetric"));
        }
        Ok(tri)
    }

    /// A `<tri>` element.
    fn triangulation(&self, node: roxmltree::Node<'_, 'input>) -> Result<Triangulation, XmlError> {
        let dim: usize = self.number(node, "dim")?;
        let size: usize = self.number(node, "size")?;
        let coding = if dim == 2 || node.attribute("perm") == Some("index") { PermCoding::Index } else { PermCoding::Pack };
        self.simplices(node, dim, size, "simplex", coding)
    }

    /// The triangulation packet a list's `tri` attribute refers to.
    fn referenced_triangulation(&self, node: roxmltree::Node<'_, 'input>) -> Result<Triangulation, XmlError> {
        let id = node.attribute("tri").ok_or_else(|| self.error(node, "the list names no triangulation"))?;
        let packet = self.ids.get(id).ok_or_else(|| self.error(node, format!("no triangulation has id \"{}\"", id)))?;
        match &*packet.payload() {
            Payload::Triangulation(tri) => Ok(tri.clone()),
            Payload::SnapPea(data) => Ok(data.triangulation.clone()),
            _ => Err(self.error(node, format!("packet \"{}\" is not a triangulation", id))),
        }
    }

    fn vector(&self, node: roxmltree::Node<'_, 'input>) -> Result<Vec<i64>, XmlError> {
        let len: usize = self.number(node, "len")?;
        let tokens: Vec<&str> = node.text().unwrap_or("").split_whitespace().collect();
        if tokens.len() % 2 != 0 {
            return Err(self.error(node, "coordinates come in index and value pairs"));
        }
        let mut vector = vec![0; len];
        for pair in tokens.chunks(2) {
            let index: usize = pair[0].parse().ok().filter(|&i| i < len)
                .ok_or_else(|| self.error(node, format!("\"{}\" is not a coordinate index", pair[0])))?;
            vector[index] = pair[1].parse().map_err(|_| self.error(node, format!("\"{}\" is not an integer", pair[1])))?;
        }
        Ok(vector)
    }

    fn tri_state(&self, node: roxmltree::Node<'_, 'input>, attribute: &str) -> Result<Option<bool>, XmlError> {
        match node.attribute(attribute).unwrap_or("") {
            "" => Ok(None),
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(self.error(node, format!("\"{}\" is not true, false or empty", other))),
        }
    }

    fn snappea(&self, node: roxmltree::Node<'_, 'input>) -> Result<Payload, XmlError> {
        let element = self.child(node, "snappea")?;
        let tri = snappea::read(element.text().unwrap_or(""))
            .map_err(|e| self.error(element, format!("bad SnapPea data: {}", e.message)))?;
        Ok(Payload::SnapPea(SnapPeaData { triangulation: tri }))
    }

    fn attachment(&self, node: roxmltree::Node<'_, 'input>) -> Result<Payload, XmlError> {
        let text: String = node.children().filter(|c| c.is_text()).filter_map(|c| c.text()).collect();
        let data = match node.attribute("encoding").unwrap_or("base64") {
            "null" => Vec::new(),
            "base64" => {
                let compact: String = text.split_whitespace().collect();
                base64::engine::general_purpose::STANDARD.decode(compact)
                    .map_err(|e| self.error(node, format!("malformed attachment data ({})", e)))?
            },
            other => return Err(self.error(node, format!("unknown encoding \"{}\"", other))),
        };
        Ok(Payload::Pdf(data))
    }

    /// A script with its variables declared but not yet bound.
    fn script(&self, node: roxmltree::Node<'_, 'input>, code: String) -> Result<Script, XmlError> {
        let mut script = Script::new(code);
        for var in Self::children(node, "var") {
            let name = var.attribute("name").ok_or_else(|| self.error(var, "a script variable has no name"))?;
            script.add_variable(name.to_string(), None);
        }
        Ok(script)
    }

    /// A packet element of the third generation.
    fn payload(&self, node: roxmltree::Node<'_, 'input>, packet_label: &str) -> Result<Payload, XmlError> {
        Ok(match node.tag_name().name() {
            "container" => Payload::Container,
            "tri" => Payload::Triangulation(self.triangulation(node)?),
            "snappeadata" => self.snappea(node)?,
            "surfaces" => {
                let coords = node.attribute("coords").and_then(NormalCoords::from_key)
                    .ok_or_else(|| self.error(node, "unknown coordinate system"))?;
                let flags = ListFlags::from_bits(self.number(node, "flags")?)
                    .ok_or_else(|| self.error(node, "unknown list flags"))?;
                let tri = self.referenced_triangulation(node)?;
                let mut list = NormalSurfaceList::new(tri, coords, flags).map_err(|e| self.error(node, e.to_string()))?;
                for s in Self::children(node, "surface") {
                    let surface = NormalSurface::new(s.attribute("name").unwrap_or("").to_string(), self.vector(s)?);
                    list.push(surface).map_err(|e| self.error(s, e.to_string()))?;
                }
                Payload::NormalSurfaces(list)
            },
            "hypersurfaces" => {
                let coords = node.attribute("coords").and_then(HyperCoords::from_key)
                    .ok_or_else(|| self.error(node, "unknown coordinate system"))?;
                let flags = ListFlags::from_bits(self.number(node, "flags")?)
                    .ok_or_else(|| self.error(node, "unknown list flags"))?;
                let tri = self.referenced_triangulation(node)?;
                let mut list = NormalHypersurfaceList::new(tri, coords, flags).map_err(|e| self.error(node, e.to_string()))?;
                for s in Self::children(node, "hypersurface") {
                    let surface = NormalHypersurface::new(s.attribute("name").unwrap_or("").to_string(), self.vector(s)?);
                    list.push(surface).map_err(|e| self.error(s, e.to_string()))?;
                }
                Payload::NormalHypersurfaces(list)
            },
            "angles" => {
                let taut = node.attribute("taut") == Some("true");
                let mut list = AngleStructureList::new(self.referenced_triangulation(node)?, taut);
                for s in Self::children(node, "structure") {
                    let angles = s.text().unwrap_or("").split_whitespace().map(|t| {
                        t.split_once('/')
                            .and_then(|(n, d)| Some((n.parse().ok()?, d.parse().ok()?)))
                            .filter(|&(_, d): &(i64, i64)| d > 0)
                            .ok_or_else(|| self.error(s, format!("\"{}\" is not a fraction", t)))
                    }).collect::<Result<Vec<_>, _>>()?;
                    list.push(AngleStructure::new(angles)).map_err(|e| self.error(s, e.to_string()))?;
                }
                Payload::AngleStructures(list)
            },
            "filtertrivial" => Payload::SurfaceFilter(SurfaceFilter::Trivial),
            "filtercomb" => Payload::SurfaceFilter(SurfaceFilter::Combination { use_and: node.attribute("op") != Some("or") }),
            "filterprop" => {
                let euler = node.attribute("euler").unwrap_or("").split_whitespace()
                    .map(|t| t.parse().map_err(|_| self.error(node, format!("\"{}\" is not an Euler characteristic", t))))
                    .collect::<Result<BTreeSet<i64>, _>>()?;
                Payload::SurfaceFilter(SurfaceFilter::Properties {
                    orientable: self.tri_state(node, "orientable")?,
                    compact: self.tri_state(node, "compact")?,
                    boundary: self.tri_state(node, "boundary")?,
                    euler,
                })
            },
            "link" => {
                let element = self.child(node, "jenkins")?;
                let mut link = Link::from_jenkins(element.text().unwrap_or("")).map_err(|e| self.error(element, e.to_string()))?;
                for poly in Self::children(node, "poly") {
                    let invariant = poly.attribute("invariant").and_then(Invariant::from_key)
                        .ok_or_else(|| self.error(poly, "unknown invariant"))?;
                    let value = Polynomial::from_storage(poly.text().unwrap_or(""), invariant == Invariant::Homfly)
                        .ok_or_else(|| self.error(poly, "malformed polynomial"))?;
                    link.set_polynomial(invariant, value);
                }
                Payload::Link(link)
            },
            "textdata" => Payload::Text(self.child(node, "text")?.text().unwrap_or("").to_string()),
            "attachment" => self.attachment(node)?,
            "script" => {
                let code = Self::children(node, "code").next().and_then(|c| c.text()).unwrap_or("");
                Payload::Script(self.script(node, code.to_string())?)
            },
            other => return Err(self.error(node, format!("\"{}\" is not a packet (in packet \"{}\")", other, packet_label))),
        })
    }

    /// A `<packet>` element of the second generation, or None for a kind
    /// this reader does not know.
    fn legacy_payload(&self, node: roxmltree::Node<'_, 'input>) -> Result<Option<Payload>, XmlError> {
        let kind = match (node.attribute("typeid"), node.attribute("type")) {
            (Some("1"), _) | (_, Some("Container")) => PacketKind::Container,
            (Some("2"), _) | (_, Some("Text")) => PacketKind::Text,
            (Some("3"), _) | (_, Some("3-Manifold Triangulation")) => PacketKind::Triangulation3,
            (Some("4"), _) | (_, Some("4-Manifold Triangulation")) => PacketKind::Triangulation4,
            (Some("7"), _) | (_, Some("Script")) => PacketKind::Script,
            (Some("10"), _) | (_, Some("PDF")) => PacketKind::Pdf,
            (Some("15"), _) | (_, Some("2-Manifold Triangulation")) => PacketKind::Triangulation2,
            (Some("16"), _) | (_, Some("SnapPea Triangulation")) => PacketKind::SnapPea,
            _ => return Ok(None),
        };

        Ok(Some(match kind {
            PacketKind::Triangulation2 => {
                let element = self.child(node, "triangles")?;
                Payload::Triangulation(self.simplices(element, 2, self.number(element, "ntriangles")?, "triangle", PermCoding::Index)?)
            },
            PacketKind::Triangulation3 => {
                let element = self.child(node, "tetrahedra")?;
                Payload::Triangulation(self.simplices(element, 3, self.number(element, "ntet")?, "tet", PermCoding::Pack)?)
            },
            PacketKind::Triangulation4 => {
                let element = self.child(node, "pentachora")?;
                Payload::Triangulation(self.simplices(element, 4, self.number(element, "npent")?, "pent", PermCoding::Pack)?)
            },
            PacketKind::Text => Payload::Text(self.child(node, "text")?.text().unwrap_or("").to_string()),
            PacketKind::SnapPea => self.snappea(node)?,
            PacketKind::Pdf => self.attachment(self.child(node, "pdf")?)?,
            PacketKind::Script => {
                let lines: Vec<&str> = Self::children(node, "line").map(|l| l.text().unwrap_or("")).collect();
                Payload::Script(self.script(node, lines.join("\n"))?)
            },
            _ => Payload::Container,
        }))
    }

    fn packet(&mut self, node: roxmltree::Node<'_, 'input>) -> Result<Option<PacketRef>, XmlError> {
        let label = node.attribute("label").unwrap_or("");
        let payload = if node.has_tag_name("packet") {
            match self.legacy_payload(node)? {
                Some(payload) => payload,
                None => {
                    tracing::warn!(label, kind = node.attribute("type").unwrap_or(""), "skipping a packet of unknown kind");
                    return Ok(None);
                },
            }
        } else {
            self.payload(node, label)?
        };
        let packet = Packet::new(label, payload);

        let tags: BTreeSet<String> = Self::children(node, "tag").filter_map(|t| t.attribute("name")).map(str::to_string).collect();
        if !tags.is_empty() {
            packet.set_tags(tags);
        }
        if let Some(id) = node.attribute("id") {
            self.ids.insert(id.to_string(), packet.clone());
        }
        for var in Self::children(node, "var") {
            let name = var.attribute("name").unwrap_or("");
            let target = match (var.attribute("valueid"), var.attribute("value")) {
                (Some(id), _) if !id.is_empty() => Target::Id(id.to_string()),
                (_, Some(label)) if !label.is_empty() => Target::Label(label.to_string()),
                _ => continue,
            };
            self.pending.push((packet.clone(), name.to_string(), target));
        }

        for child in node.children().filter(|c| c.is_element()) {
            let name = child.tag_name().name();
            if name == "anon" {
                for inner in child.children().filter(|c| PACKET_ELEMENTS.contains(&c.tag_name().name())) {
                    self.packet(inner)?;
                }
            } else if PACKET_ELEMENTS.contains(&name) {
                if let Some(child) = self.packet(child)? {
                    packet.append(child).map_err(|e| self.error(node, e.to_string()))?;
                }
            }
        }
        Ok(Some(packet))
    }
}

pub fn read_tree(text: &str) -> Result<PacketRef, XmlError> {
    let doc = roxmltree::Document::parse(text).map_err(|e| XmlError { line: Some(e.pos().row as usize), message: e.to_string() })?;
    let root = doc.root_element();
    if !(root.has_tag_name("regina") || root.has_tag_name("reginadata")) {
        return Err(XmlError { line: Some(1), message: "this is not a Regina data file".to_string() });
    }

    let mut reader = Reader { doc: &doc, ids: HashMap::new(), pending: Vec::new() };
    let mut top = None;
    for node in root.children().filter(|c| PACKET_ELEMENTS.contains(&c.tag_name().name())) {
        top = reader.packet(node)?;
        if top.is_some() {
            break;
        }
    }
    let packet = top.ok_or_else(|| reader.error(root, "the file contains no packets"))?;

    for (script, name, target) in std::mem::take(&mut reader.pending) {
        let found = match &target {
            Target::Id(id) => reader.ids.get(id).cloned(),
            Target::Label(label) => packet.find_label(label),
        };
        if found.is_none() {
            let wanted = match &target { Target::Id(s) | Target::Label(s) => s.as_str() };
            tracing::warn!(variable = %name, target = wanted, "script variable refers to a missing packet");
        }
        let _ = script.change::<Script, _>(|s| s.set_variable_value(&name, found.as_ref()));
    }

    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn perm(text: &str) -> Perm {
        Perm::parse(text).unwrap()
    }

    fn sample_tree() -> PacketRef {
        let root = Packet::container("Root & <friends>");
        let tri = Triangulation::from_gluings(3, 2, &[(0, 0, 1, perm("1023")), (0, 2, 0, perm("0132"))]).unwrap();
        let a = Packet::new("A", Payload::Triangulation(tri));
        a.add_tag("census");
        let b = Packet::new("B", Payload::Text("x < y\n\"quoted\"".into()));
        let pdf = Packet::new("Doc", Payload::Pdf(vec![0x25, 0x50, 0x44, 0x46, 0xff]));
        let mut script = Script::new("print(tri)".into());
        script.add_variable("tri".into(), Some(&a));
        script.add_variable("nothing".into(), None);
        let s = Packet::new("Script", Payload::Script(script));
        let link = Packet::new("Hopf", Payload::Link(Link::from_jenkins("2 2 0 1 1 -1 2 0 -1 1 1 0 1 1 1").unwrap()));
        let filter = Packet::new("Filter", Payload::SurfaceFilter(SurfaceFilter::Combination { use_and: false }));

        root.append(a.clone()).unwrap();
        a.append(s).unwrap();
        root.append(b).unwrap();
        root.append(pdf).unwrap();
        root.append(link).unwrap();
        root.append(filter).unwrap();
        root
    }

    fn shape(packet: &PacketRef) -> Vec<(usize, String, PacketKind, Payload)> {
        packet.subtree().iter()
            .filter(|p| p.kind() != PacketKind::Script)
            .map(|p| (p.depth(), p.label(), p.kind(), p.payload().clone()))
            .collect()
    }

    #[test]
    fn tree_survives_a_round_trip() {
        let original = sample_tree();
        let text = write_tree(&original);
        assert!(text.contains("<regina engine="));
        assert!(text.contains("<tri dim=\"3\" size=\"2\" perm=\"index\" label=\"A\" id=\"p1\">"));
        assert!(text.contains("<textdata label=\"B\">"));
        let loaded = read_tree(&text).unwrap();

        assert_eq!(shape(&loaded), shape(&original));
        assert!(loaded.child(0).unwrap().has_tag("census"));

        let a = loaded.child(0).unwrap();
        let script = a.child(0).unwrap();
        let target = script.read::<Script, _>(|s| s.variable("tri").and_then(|v| v.resolve())).flatten().unwrap();
        assert!(std::sync::Arc::ptr_eq(&target, &a));
        assert!(script.read::<Script, _>(|s| s.variable("nothing").unwrap().resolve().is_none()).unwrap());
    }

    #[test]
    fn lists_refer_to_their_triangulation() {
        let tri = Triangulation::from_gluings(3, 2, &[(0, 0, 1, perm("1023")), (0, 2, 0, perm("0132"))]).unwrap();
        let root = Packet::container("");
        let parent = Packet::new("T", Payload::Triangulation(tri.clone()));
        let mut angles = AngleStructureList::new(tri.clone(), false);
        angles.push(AngleStructure::new(vec![(1, 2); 3 * tri.size()])).unwrap();
        parent.append(Packet::new("Angles", Payload::AngleStructures(angles))).unwrap();
        root.append(parent).unwrap();
        /* a list whose triangulation is nowhere in the tree */
        root.append(Packet::new("Stray", Payload::AngleStructures(AngleStructureList::new(tri, true)))).unwrap();

        let text = write_tree(&root);
        assert!(text.contains("<angles taut=\"false\" tri=\"p1\" label=\"Angles\">"));
        assert!(text.contains("<anon>"));

        let loaded = read_tree(&text).unwrap();
        assert_eq!(shape(&loaded), shape(&root));
        assert_eq!(loaded.subtree().len(), 4);
    }

    #[test]
    fn reads_third_generation_files() {
        let text = r#"<?xml version="1.0"?>
<regina engine="7.3">
<container label="Top">
  <tri dim="2" size="1" perm="index" label="Band" id="t1">
    <simplex desc="only"> 0 2 0 4 -1 -1 </simplex>
    <tag name="bounded"/>
  </tri>
  <script label="Run">
    <var name="band" valueid="t1"/>
    <var name="none" valueid=""/>
    <code>print(band)</code>
  </script>
  <textdata label="Note"><text>a &amp; b</text></textdata>
</container>
</regina>
"#;
        let top = read_tree(text).unwrap();
        assert_eq!(top.label(), "Top");
        let band = top.child(0).unwrap();
        let mut expected = Triangulation::from_gluings(2, 1, &[(0, 0, 0, perm("120"))]).unwrap();
        expected.set_description(0, "only".into()).unwrap();
        assert_eq!(band.read::<Triangulation, _>(Clone::clone), Some(expected));
        assert!(band.has_tag("bounded"));

        let script = top.child(1).unwrap();
        let target = script.read::<Script, _>(|s| s.variable("band").and_then(|v| v.resolve())).flatten().unwrap();
        assert!(std::sync::Arc::ptr_eq(&target, &band));
        assert_eq!(script.read::<Script, _>(|s| s.text.clone()), Some("print(band)".to_string()));
        assert_eq!(top.child(2).unwrap().read::<String, _>(Clone::clone), Some("a & b".to_string()));
    }

    #[test]
    fn reads_second_generation_files() {
        let text = r#"<?xml version="1.0"?>
<reginadata engine="4.6">
<packet label="Census" type="Container" typeid="1" parent="">
<packet label="S3" type="3-Manifold Triangulation" typeid="3" parent="Census">
  <tetrahedra ntet="1">
    <tet desc=""> 0 225 0 225 0 180 0 180 </tet>
  </tetrahedra>
  <tag name="closed"/>
</packet> <!-- S3 (3-Manifold Triangulation) -->
<packet label="Surfaces" type="Normal Surface List" typeid="6" parent="S3">
  <params type="0" flavourid="0" embedded="T"/>
</packet>
<packet label="Go" type="Script" typeid="7" parent="Census">
  <var name="t" value="S3"/>
  <line>for i in range(2):</line>
  <line>    print(t)</line>
</packet>
<packet label="Notes" type="Text" typeid="2" parent="Census">
  <text>Hello</text>
</packet>
</packet>
</reginadata>
"#;
        let top = read_tree(text).unwrap();
        let labels: Vec<String> = top.children().iter().map(|p| p.label()).collect();
        assert_eq!(labels, vec!["S3", "Go", "Notes"]);

        let s3 = top.child(0).unwrap();
        let expected = Triangulation::from_gluings(3, 1, &[(0, 0, 0, perm("1023")), (0, 2, 0, perm("0132"))]).unwrap();
        assert_eq!(s3.read::<Triangulation, _>(Clone::clone), Some(expected));
        assert!(s3.has_tag("closed"));

        let script = top.child(1).unwrap();
        assert_eq!(script.read::<Script, _>(|s| s.text.clone()), Some("for i in range(2):\n    print(t)".to_string()));
        let target = script.read::<Script, _>(|s| s.variable("t").and_then(|v| v.resolve())).flatten().unwrap();
        assert!(std::sync::Arc::ptr_eq(&target, &s3));
    }

    #[test]
    fn errors_carry_lines() {
        assert_matches!(read_tree("<regina>\n<tri dim=\"7\" size=\"0\"/>\n</regina>"), Err(XmlError { line: Some(2), .. }));
        assert_matches!(read_tree("<other/>"), Err(XmlError { line: Some(1), .. }));
        assert_matches!(read_tree("<regina><packet"), Err(XmlError { line: Some(1), .. }));
        assert_matches!(read_tree("<regina>\n<packet type=\"Mystery\"/>\n</regina>"), Err(XmlError { line: Some(1), .. }));
        let asymmetric = "<regina><tri dim=\"3\" size=\"1\" perm=\"index\" label=\"\">\n<simplex>0 1 -1 -1 -1 -1 -1 -1</simplex>\n</tri></regina>";
        assert_matches!(read_tree(asymmetric), Err(_));
    }
}
