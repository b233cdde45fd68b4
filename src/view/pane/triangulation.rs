//! Triangulations of dimension 2, 3 and 4: a gluings editor, a skeleton
//! viewer and a graph tab.

use std::ops::Range;

use crate::engine::EngineError;
use crate::model::packet::PacketRef;
use crate::model::perm::Perm;
use crate::model::preferences::TriGraph;
use crate::model::triangulation::{self, Gluing, Skeleton, Triangulation, VertexLink};
use crate::view::error::{Action, Error, Trouble};
use crate::view::interaction::Interaction;
use crate::view::pane::graph::{GraphTab, Layout, LAYOUT_PROGRAM};
use crate::view::pane::{PacketUi, PaneContext};

pub const TAB_GLUINGS: usize = 0;
pub const TAB_SKELETON: usize = 1;
pub const TAB_GRAPHS: usize = 2;

/// Maps position `i < dim` to the `i`th vertex of `facet`, and `dim` to
/// `facet` itself.
fn facet_ordering(dim: usize, facet: usize) -> Perm {
    let mut images: Vec<u8> = triangulation::facet_vertices(dim, facet).into_iter().map(|v| v as u8).collect();
    images.push(facet as u8);
    Perm::from_images(&images).unwrap_or_else(|| Perm::identity(dim + 1))
}

fn vertex_string(vertices: impl IntoIterator<Item = usize>) -> String {
    vertices.into_iter().map(|v| char::from(b'0' + v as u8)).collect()
}

/// How a facet's gluing is written: `"target (vertices)"`, where the
/// vertices are the images of the facet's own vertices in increasing order.
/// Boundary facets are written as an empty string.
pub fn gluing_text(tri: &Triangulation, simplex: usize, facet: usize) -> String {
    match tri.adjacent(simplex, facet) {
        None => String::new(),
        Some(gluing) => {
            let dim = tri.dim();
            let images = gluing.perm.compose(&facet_ordering(dim, facet));
            format!("{} ({})", gluing.simplex, vertex_string((0..dim).map(|i| images.apply(i))))
        },
    }
}

/// Column headers for the facets, in the order the table shows them.
pub fn facet_columns(dim: usize) -> Vec<(usize, String)> {
    let noun = capitalised(triangulation::facet_noun(dim));
    (0..=dim).rev()
        .map(|facet| (facet, format!("{} {}", noun, vertex_string(triangulation::facet_vertices(dim, facet)))))
        .collect()
}

fn capitalised(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn article(noun: &str) -> &'static str {
    match noun.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "An",
        _ => "A",
    }
}

struct Words {
    short: &'static str,
    example: &'static str,
    count: &'static str,
}

fn words(dim: usize) -> Words {
    match dim {
        2 => Words { short: "triangle", example: "02", count: "two" },
        3 => Words { short: "tet", example: "032", count: "three" },
        _ => Words { short: "pentachoron", example: "0342", count: "four" },
    }
}

fn invalid(message: String, detail: Option<String>) -> Error {
    Error::new(Action::EditGluings, Trouble::Validation { message, detail })
}

/// Reads the text typed into the cell for `facet` of `simplex`. An empty
/// cell means the facet should be boundary.
pub fn parse_gluing(tri: &Triangulation, simplex: usize, facet: usize, text: &str) -> Result<Option<Gluing>, Error> {
    let dim = tri.dim();
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let facet_noun = triangulation::facet_noun(dim);
    let simplex_noun = triangulation::simplex_noun(dim);
    let w = words(dim);
    let form = || invalid(
        "This is not a valid gluing.".to_string(),
        Some(format!("The {f} gluing should be of the form: {s} ({f}). An example is 5 ({e}), which represents {f} {e} of {n} 5.",
                     f = facet_noun, s = w.short, e = w.example, n = simplex_noun)));

    /* target, optional space and/or open bracket, vertices, optional close bracket */
    let split = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    let (target, rest) = text.split_at(split);
    if target.is_empty() {
        return Err(form());
    }
    let rest = rest.trim_start();
    let bracketed = rest.starts_with('(');
    let rest = rest.strip_prefix('(').unwrap_or(rest).trim_start();
    if !bracketed && split == text.len() {
        return Err(form());
    }
    let split = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let (vertices, rest) = rest.split_at(split);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(')').unwrap_or(rest);
    if !rest.trim().is_empty() || vertices.len() != dim {
        return Err(form());
    }

    let target = match target.parse::<usize>() {
        Ok(target) if target < tri.size() => target,
        _ => return Err(invalid(
            "This is not a valid gluing.".to_string(),
            Some(format!("There is no {} number {}.", simplex_noun, target)))),
    };

    let digits: Vec<usize> = vertices.bytes().map(|b| (b - b'0') as usize).collect();
    if digits.iter().any(|&d| d > dim) {
        return Err(invalid(
            "This is not a valid gluing.".to_string(),
            Some(format!("{v} is not a valid {n} {f}. {a} {n} {f} must be described by a sequence of {c} vertices, each between 0 and {d} inclusive. An example is {e}.",
                         v = vertices, n = simplex_noun, f = facet_noun, a = article(simplex_noun),
                         c = w.count, d = dim, e = w.example))));
    }
    let mut seen = vec![false; dim + 1];
    for &d in &digits {
        if std::mem::replace(&mut seen[d], true) {
            return Err(invalid(
                "This is not a valid gluing.".to_string(),
                Some(format!("{} is not a valid {} {}. The {} vertices forming the {} must be distinct.", vertices, simplex_noun, facet_noun, w.count, facet_noun))));
        }
    }

    let mut images: Vec<u8> = digits.iter().map(|&d| d as u8).collect();
    images.extend(seen.iter().position(|&s| !s).map(|v| v as u8));
    let arranged = Perm::from_images(&images).ok_or_else(form)?;
    let perm = arranged.compose(&facet_ordering(dim, facet).inverse());

    if target == simplex && perm.apply(facet) == facet {
        return Err(invalid(
            "This is not a valid gluing.".to_string(),
            Some(format!("{} {} cannot be glued to itself.", article(facet_noun), facet_noun))));
    }

    Ok(Some(Gluing { simplex: target, perm }))
}

pub struct TriangulationUi {
    tri: Triangulation,
    skeleton: Result<Skeleton, String>,
    graph: GraphTab,
    graph_type: TriGraph,
    labels: bool,
}

impl TriangulationUi {
    pub fn new(packet: &PacketRef, cx: &PaneContext) -> TriangulationUi {
        let dim = packet.kind().triangulation_dim().unwrap_or(3);
        let mut ui = TriangulationUi {
            tri: Triangulation::new(dim),
            skeleton: Err(String::new()),
            graph: GraphTab::new(Layout::locate(LAYOUT_PROGRAM)),
            graph_type: cx.prefs.tri_initial_graph_type,
            labels: cx.prefs.tri_graphviz_labels,
        };
        ui.refresh(packet, cx);
        ui
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.tri
    }

    pub fn graph(&self) -> &GraphTab {
        &self.graph
    }

    pub fn graph_type(&self) -> TriGraph {
        self.graph_type
    }

    pub fn set_graph_type(&mut self, graph_type: TriGraph, cx: &PaneContext) {
        self.graph_type = graph_type;
        self.redraw_graph(cx);
    }

    fn redraw_graph(&mut self, cx: &PaneContext) {
        let tri = &self.tri;
        let labels = self.labels;
        let graph_type = self.graph_type;
        self.graph.show("triangulation", tri.size(), triangulation::simplex_noun_plural(tri.dim()), || match graph_type {
            TriGraph::DualGraph => cx.engine.dual_graph_dot(tri, labels),
            TriGraph::TreeDecomposition => cx.engine.tree_decomposition_dot(tri, false),
            TriGraph::NiceTreeDecomposition => cx.engine.tree_decomposition_dot(tri, true),
        });
    }

    pub fn cell_text(&self, simplex: usize, facet: usize) -> String {
        gluing_text(&self.tri, simplex, facet)
    }

    /// Commits an edited gluings cell. Any gluings already on either facet
    /// are broken first. Returns false if the cell already said this.
    pub fn set_cell(&self, packet: &PacketRef, simplex: usize, facet: usize, text: &str) -> Result<bool, Error> {
        let current = packet.read::<Triangulation, _>(Clone::clone)
            .ok_or_else(|| Error::refused(Action::EditGluings, "This packet is no longer a triangulation.", None))?;
        if simplex >= current.size() || facet > current.dim() {
            return Err(Error::invalid(Action::EditGluings, "There is no such gluing cell.", None));
        }

        let gluing = parse_gluing(&current, simplex, facet, text)?;
        if gluing == current.adjacent(simplex, facet) {
            return Ok(false);
        }

        tracing::debug!(simplex, facet, text, "changing gluing");
        packet.try_change::<Triangulation, _, Trouble>(|tri| {
            tri.unjoin(simplex, facet);
            if let Some(gluing) = gluing {
                tri.unjoin(gluing.simplex, gluing.perm.apply(facet));
                tri.join(simplex, facet, gluing.simplex, gluing.perm).map_err(|e| Trouble::Validation {
                    message: "This gluing could not be made.".to_string(),
                    detail: Some(e.to_string()),
                })?;
            }
            Ok(())
        }).map_err(|trouble| Error::new(Action::EditGluings, trouble))?;
        Ok(true)
    }

    pub fn add_simplex(&self, packet: &PacketRef) -> Result<usize, Error> {
        packet.change::<Triangulation, _>(Triangulation::add_simplex)
            .map_err(|e| Error::new(Action::EditGluings, Trouble::Packet(e)))
    }

    /// Removes a range of simplices after asking the user. Returns whether
    /// anything was removed.
    pub fn remove_simplices(&self, packet: &PacketRef, range: Range<usize>, interaction: &dyn Interaction) -> Result<bool, Error> {
        let dim = self.tri.dim();
        if range.is_empty() || range.end > self.tri.size() {
            return Err(Error::invalid(Action::EditGluings, format!("Please select some {} to remove.", triangulation::simplex_noun_plural(dim)), None));
        }

        let question = if range.len() == 1 {
            format!("{} number {} will be removed.", capitalised(triangulation::simplex_noun(dim)), range.start)
        } else {
            format!("{} {} (numbers {}–{}) will be removed.", range.len(), triangulation::simplex_noun_plural(dim), range.start, range.end - 1)
        };
        if !interaction.confirm(&question, Some("Are you sure?")) {
            return Ok(false);
        }

        packet.try_change::<Triangulation, _, Trouble>(|tri| {
            for simplex in range.clone().rev() {
                tri.remove_simplex(simplex).map_err(|e| Trouble::Validation {
                    message: "The selection could not be removed.".to_string(),
                    detail: Some(e.to_string()),
                })?;
            }
            Ok(())
        }).map_err(|trouble| Error::new(Action::EditGluings, trouble))?;
        Ok(true)
    }

    pub fn set_description(&self, packet: &PacketRef, simplex: usize, description: &str) -> Result<(), Error> {
        packet.try_change::<Triangulation, _, Trouble>(|tri| {
            tri.set_description(simplex, description.trim().to_string()).map_err(|e| Trouble::Validation {
                message: "There is no such row.".to_string(),
                detail: Some(e.to_string()),
            })
        }).map_err(|trouble| Error::new(Action::EditGluings, trouble))
    }

    fn render_gluings(&self) -> String {
        let dim = self.tri.dim();
        let columns = facet_columns(dim);
        let mut rows = vec![{
            let mut header = vec![capitalised(triangulation::simplex_noun(dim)), "Description".to_string()];
            header.extend(columns.iter().map(|(_, name)| name.clone()));
            header
        }];
        for (index, simplex) in self.tri.simplices().iter().enumerate() {
            let mut row = vec![index.to_string(), simplex.description.clone()];
            row.extend(columns.iter().map(|&(facet, _)| gluing_text(&self.tri, index, facet)));
            rows.push(row);
        }
        rows.into_iter().map(|row| row.join(" | ")).collect::<Vec<_>>().join("\n")
    }

    fn render_skeleton(&self) -> String {
        let skeleton = match &self.skeleton {
            Ok(skeleton) => skeleton,
            Err(message) => return format!("Skeletal information is not available: {}.", message),
        };
        let mut lines = vec![
            format!("Vertices: {}", skeleton.vertices.len()),
            format!("Edges: {}", skeleton.edges.len()),
        ];
        if skeleton.dim > 2 {
            lines.push(format!("Triangles: {}", skeleton.triangles.len()));
        }
        lines.push(format!("Components: {}", skeleton.component_count));
        lines.push(format!("Boundary {}s: {}", triangulation::facet_noun(skeleton.dim), skeleton.boundary_facets));
        for (index, (vertex, link)) in skeleton.vertices.iter().zip(&skeleton.vertex_links).enumerate() {
            let link = match link {
                VertexLink::Sphere => "sphere",
                VertexLink::Disc => "disc",
                VertexLink::Torus => "torus",
                VertexLink::KleinBottle => "Klein bottle",
                VertexLink::Other => "other",
            };
            lines.push(format!("Vertex {}: degree {}, link {}{}", index, vertex.degree, link, if vertex.valid { "" } else { " (invalid)" }));
        }
        lines.join("\n")
    }
}

impl PacketUi for TriangulationUi {
    fn tabs(&self) -> &'static [&'static str] {
        &["Gluings", "Skeleton", "Graphs"]
    }

    fn refresh(&mut self, packet: &PacketRef, cx: &PaneContext) {
        if let Some(tri) = packet.read::<Triangulation, _>(Clone::clone) {
            self.tri = tri;
        }
        self.skeleton = cx.engine.skeleton(&self.tri).map_err(|e: EngineError| e.to_string());
        self.redraw_graph(cx);
    }

    fn summary(&self) -> Option<String> {
        if self.tri.is_empty() {
            return Some("Empty".to_string());
        }
        let skeleton = match &self.skeleton {
            Ok(skeleton) => skeleton,
            Err(_) => return Some(format!("{} {}", self.tri.size(), triangulation::simplex_noun_plural(self.tri.dim()))),
        };
        if !skeleton.is_valid() {
            return Some("INVALID TRIANGULATION!".to_string());
        }

        let boundary = match (skeleton.is_ideal(), skeleton.has_boundary_facets()) {
            (false, false) => "Closed",
            (true, true) => "Ideal & real bdry",
            (true, false) => "Ideal bdry",
            (false, true) => "Real bdry",
        };
        let orientation = match (skeleton.orientable, skeleton.oriented) {
            (true, true) => "orientable and oriented",
            (true, false) => "orientable",
            (false, _) => "non-orientable",
        };
        let connected = if skeleton.is_connected() { "connected" } else { "disconnected" };
        Some(format!("{}, {}, {}", boundary, orientation, connected))
    }

    fn render(&self, tab: usize) -> String {
        match tab {
            TAB_SKELETON => self.render_skeleton(),
            TAB_GRAPHS => self.graph.render(),
            _ => self.render_gluings(),
        }
    }

    fn unavailable(&self, tab: usize) -> Option<Error> {
        match tab {
            TAB_GRAPHS => self.graph.unavailable(),
            _ => None,
        }
    }
}
