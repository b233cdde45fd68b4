//! Knots and links: crossings, polynomials, codes and graphs.

use std::collections::BTreeMap;

use crate::model::link::{CodeError, Link};
use crate::model::packet::PacketRef;
use crate::model::polynomial::{Invariant, Polynomial};
use crate::model::preferences::{CrossingsStyle, HomflyType, LinkCode, LinkGraph};
use crate::view::error::Error;
use crate::view::pane::graph::{GraphTab, Layout, LAYOUT_PROGRAM};
use crate::view::pane::{EditFacet, PacketUi, PaneContext};

pub const TAB_CROSSINGS: usize = 0;
pub const TAB_POLYNOMIALS: usize = 1;
pub const TAB_CODES: usize = 2;
pub const TAB_GRAPHS: usize = 3;

/// Polynomials of links this small are computed as soon as they are shown.
/// Larger links wait for the user to ask.
pub const AUTO_COMPUTE_CROSSINGS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolynomialState {
    Known(Polynomial),
    /// Too expensive to compute unasked.
    Compute,
    Unavailable(String),
}

pub struct LinkUi {
    link: Link,
    /* computed for display only; never written back */
    computed: BTreeMap<Invariant, Result<Polynomial, String>>,
    knot_sig: Option<Result<String, String>>,
    code_type: LinkCode,
    homfly: HomflyType,
    crossings_style: CrossingsStyle,
    unicode: bool,
    graph: GraphTab,
    graph_type: LinkGraph,
}

impl LinkUi {
    pub fn new(packet: &PacketRef, cx: &PaneContext) -> LinkUi {
        let mut ui = LinkUi {
            link: Link::default(),
            computed: BTreeMap::new(),
            knot_sig: None,
            code_type: cx.prefs.link_code_type,
            homfly: cx.prefs.link_homfly_type,
            crossings_style: cx.prefs.link_crossings_style,
            unicode: cx.prefs.display_unicode,
            graph: GraphTab::new(Layout::locate(LAYOUT_PROGRAM)),
            graph_type: cx.prefs.link_initial_graph_type,
        };
        ui.refresh(packet, cx);
        ui
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn code_type(&self) -> LinkCode {
        self.code_type
    }

    pub fn set_code_type(&mut self, code_type: LinkCode) {
        self.code_type = code_type;
    }

    /// Switches between the `(α, z)` and `(ℓ, m)` forms of HOMFLY-PT. The
    /// polynomial itself is not recomputed.
    pub fn set_homfly_type(&mut self, homfly: HomflyType) {
        self.homfly = homfly;
    }

    pub fn set_graph_type(&mut self, graph_type: LinkGraph, cx: &PaneContext) {
        self.graph_type = graph_type;
        self.redraw_graph(cx);
    }

    pub fn graph(&self) -> &GraphTab {
        &self.graph
    }

    fn redraw_graph(&mut self, cx: &PaneContext) {
        let link = &self.link;
        let nice = self.graph_type == LinkGraph::NiceTreeDecomposition;
        self.graph.show("link", link.size(), "crossings", || cx.engine.link_tree_decomposition_dot(link, nice));
    }

    pub fn polynomial(&self, invariant: Invariant) -> PolynomialState {
        if let Some(value) = self.link.polynomial(invariant) {
            return PolynomialState::Known(value.clone());
        }
        match self.computed.get(&invariant) {
            Some(Ok(value)) => PolynomialState::Known(value.clone()),
            Some(Err(message)) => PolynomialState::Unavailable(message.clone()),
            None => PolynomialState::Compute,
        }
    }

    fn render_crossings(&self) -> String {
        if self.link.size() == 0 {
            return match self.link.count_components() {
                0 => "This link is empty.".to_string(),
                1 => "This is the unknot, with no crossings.".to_string(),
                n => format!("This link has {} unknotted components and no crossings.", n),
            };
        }

        match self.crossings_style {
            CrossingsStyle::Text => (0..self.link.count_components())
                .map(|c| {
                    let strands = self.link.traverse(c);
                    if strands.is_empty() {
                        format!("Component {}: no crossings", c)
                    } else {
                        format!("Component {}: {}", c, strands.iter()
                            .map(|s| format!("{}{}", if s.is_upper() { '^' } else { '_' }, s.crossing))
                            .collect::<Vec<_>>()
                            .join(" "))
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            CrossingsStyle::Pictorial => self.link.crossings().iter().enumerate()
                .map(|(i, crossing)| {
                    let (sign, glyph) = match (crossing.sign > 0, self.unicode) {
                        (true, true) => ("positive", "⤱"),
                        (true, false) => ("positive", "+"),
                        (false, true) => ("negative", "⤲"),
                        (false, false) => ("negative", "-"),
                    };
                    format!("{} {} ({})", glyph, i, sign)
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn render_polynomials(&self) -> String {
        let lm = self.homfly == HomflyType::LM;
        Invariant::ALL.iter()
            .map(|&invariant| {
                let value = match self.polynomial(invariant) {
                    PolynomialState::Known(p) => p.render(invariant, lm, self.unicode),
                    PolynomialState::Compute => "[Compute]".to_string(),
                    PolynomialState::Unavailable(message) => format!("Unavailable: {}", message),
                };
                let name = match (invariant, lm) {
                    (Invariant::Homfly, false) => "HOMFLY-PT (α, z)".to_string(),
                    (Invariant::Homfly, true) => "HOMFLY-PT (ℓ, m)".to_string(),
                    (invariant, _) => invariant.name().to_string(),
                };
                format!("{}: {}", name, value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn code(&self) -> Result<String, String> {
        let knot_only = |what: &str| format!("{} currently only available for knots.", what);
        let code_error = |e: CodeError| match e {
            CodeError::Empty => "This link is empty.".to_string(),
            other => format!("This code could not be computed: {}.", other),
        };

        match self.code_type {
            LinkCode::Gauss => {
                if !self.link.is_knot() {
                    return Err(knot_only("Gauss codes are"));
                }
                let classical = self.link.gauss().map_err(code_error)?;
                let oriented = self.link.oriented_gauss().map_err(code_error)?;
                let signed = self.link.signed_gauss().map_err(code_error)?;
                Ok(format!("Classical Gauss code:\n{}\n\nOriented Gauss code:\n{}\n\nSigned Gauss code:\n{}", classical, oriented, signed))
            },
            LinkCode::DowkerThistlethwaite => {
                if !self.link.is_knot() {
                    return Err(knot_only("Dowker-Thistlethwaite notation is"));
                }
                let numeric = self.link.dt().map_err(code_error)?;
                let alpha = match self.link.dt_alpha() {
                    Ok(alpha) => alpha,
                    Err(CodeError::TooManyCrossings { max }) => format!("Only available for knots with at most {} crossings.", max),
                    Err(e) => return Err(code_error(e)),
                };
                Ok(format!("Numeric:\n{}\n\nAlphabetic:\n{}", numeric, alpha))
            },
            LinkCode::KnotSig => {
                if !self.link.is_knot() {
                    return Err(knot_only("Knot signatures are"));
                }
                match &self.knot_sig {
                    Some(Ok(sig)) => Ok(sig.clone()),
                    Some(Err(message)) => Err(message.clone()),
                    None => Err("The knot signature has not been computed.".to_string()),
                }
            },
            LinkCode::PlanarDiagram => {
                if self.link.count_components() == 0 {
                    return Err("This link is empty.".to_string());
                }
                Ok(self.link.pd())
            },
            LinkCode::Jenkins => Ok(self.link.jenkins()),
        }
    }
}

impl PacketUi for LinkUi {
    fn tabs(&self) -> &'static [&'static str] {
        &["Crossings", "Polynomials", "Codes", "Graphs"]
    }

    fn refresh(&mut self, packet: &PacketRef, cx: &PaneContext) {
        if let Some(link) = packet.read::<Link, _>(Clone::clone) {
            self.link = link;
        }
        self.unicode = cx.prefs.display_unicode;

        self.computed.clear();
        if self.link.size() <= AUTO_COMPUTE_CROSSINGS {
            let threads = cx.prefs.threads();
            for invariant in Invariant::ALL {
                if self.link.polynomial(invariant).is_none() {
                    let value = cx.engine.polynomial(&self.link, invariant, threads, None).map_err(|e| e.to_string());
                    self.computed.insert(invariant, value);
                }
            }
        }

        self.knot_sig = self.link.is_knot().then(|| cx.engine.knot_sig(&self.link).map_err(|e| format!("The knot signature could not be computed: {}.", e)));
        self.redraw_graph(cx);
    }

    fn summary(&self) -> Option<String> {
        let crossings = match self.link.size() {
            1 => "1 crossing".to_string(),
            n => format!("{} crossings", n),
        };
        Some(match self.link.count_components() {
            0 => "Empty link".to_string(),
            1 => format!("Knot with {}", crossings),
            n => format!("Link with {} components, {}", n, crossings),
        })
    }

    fn render(&self, tab: usize) -> String {
        match tab {
            TAB_POLYNOMIALS => self.render_polynomials(),
            TAB_CODES => self.code().unwrap_or_else(|message| message),
            TAB_GRAPHS => self.graph.render(),
            _ => self.render_crossings(),
        }
    }

    fn edit_facet(&self, tab: usize) -> EditFacet {
        EditFacet {
            can_copy: tab == TAB_CODES && self.code().is_ok(),
            ..EditFacet::default()
        }
    }

    fn copy_text(&self, tab: usize) -> Option<String> {
        match tab {
            TAB_CODES => self.code().ok(),
            _ => None,
        }
    }

    fn unavailable(&self, tab: usize) -> Option<Error> {
        match tab {
            TAB_GRAPHS => self.graph.unavailable(),
            _ => None,
        }
    }
}
