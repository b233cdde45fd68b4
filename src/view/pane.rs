//! Editor panes: one per open packet.
//!
//! A [Pane] wraps a kind-specific [PaneBody] built by the registry. The pane
//! itself keeps the weak packet handle, the header line and the selected
//! tab; bodies only know how to refresh from a packet and how to render
//! each of their tabs.

use std::collections::HashMap;
use std::sync;

use enum_dispatch::enum_dispatch;
use once_cell::sync::Lazy;

use crate::engine::Engine;
use crate::model::packet::{Packet, PacketId, PacketKind, PacketRef};
use crate::model::preferences::{Change, Preferences};
use crate::view::error::Error;

pub mod container;
pub mod graph;
pub mod link;
pub mod script;
pub mod snappea;
pub mod surfaces;
pub mod text;
pub mod triangulation;

pub use container::ContainerUi;
pub use link::LinkUi;
pub use script::ScriptUi;
pub use snappea::SnapPeaUi;
pub use surfaces::SurfacesUi;
pub use text::TextUi;
pub use triangulation::TriangulationUi;

/// What a pane needs to look at its packet.
#[derive(Clone, Copy)]
pub struct PaneContext<'a> {
    pub engine: &'a dyn Engine,
    pub prefs: &'a Preferences,
}

/// Which clipboard actions the pane can take right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditFacet {
    pub can_cut: bool,
    pub can_copy: bool,
    pub can_paste: bool,
}

#[enum_dispatch]
pub trait PacketUi {
    fn tabs(&self) -> &'static [&'static str] {
        &[]
    }

    /// Re-reads everything from the packet.
    fn refresh(&mut self, packet: &PacketRef, cx: &PaneContext);

    /// A one-line description shown under the pane's title.
    fn summary(&self) -> Option<String> {
        None
    }

    fn render(&self, tab: usize) -> String;

    fn edit_facet(&self, _tab: usize) -> EditFacet {
        EditFacet::default()
    }

    /// Text the copy action places on the clipboard.
    fn copy_text(&self, _tab: usize) -> Option<String> {
        None
    }

    /// An optional feature this tab needs but cannot have.
    fn unavailable(&self, _tab: usize) -> Option<Error> {
        None
    }
}

/// Shown for kinds that have no editor of their own.
#[derive(Debug)]
pub struct DefaultUi {
    kind: PacketKind,
}

impl PacketUi for DefaultUi {
    fn refresh(&mut self, packet: &PacketRef, _cx: &PaneContext) {
        self.kind = packet.kind();
    }

    fn render(&self, _tab: usize) -> String {
        format!("Packets of type {} are not yet supported in the graphical interface.\n\
                 You can still work with this packet through the Python console, \
                 where it is available as the variable item.", self.kind.name())
    }
}

#[enum_dispatch(PacketUi)]
pub enum PaneBody {
    Default(DefaultUi),
    Container(ContainerUi),
    Triangulation(TriangulationUi),
    SnapPea(SnapPeaUi),
    Link(LinkUi),
    Surfaces(SurfacesUi),
    Text(TextUi),
    Script(ScriptUi),
}

type Factory = fn(&PacketRef, &PaneContext) -> PaneBody;

static REGISTRY: Lazy<HashMap<PacketKind, Factory>> = Lazy::new(|| {
    let mut registry: HashMap<PacketKind, Factory> = HashMap::new();
    registry.insert(PacketKind::Container, |p, cx| ContainerUi::new(p, cx).into());
    registry.insert(PacketKind::Triangulation2, |p, cx| TriangulationUi::new(p, cx).into());
    registry.insert(PacketKind::Triangulation3, |p, cx| TriangulationUi::new(p, cx).into());
    registry.insert(PacketKind::Triangulation4, |p, cx| TriangulationUi::new(p, cx).into());
    registry.insert(PacketKind::SnapPea, |p, cx| SnapPeaUi::new(p, cx).into());
    registry.insert(PacketKind::Link, |p, cx| LinkUi::new(p, cx).into());
    registry.insert(PacketKind::NormalSurfaces, |p, cx| SurfacesUi::new(p, cx).into());
    registry.insert(PacketKind::Text, |p, cx| TextUi::new(p, cx).into());
    registry.insert(PacketKind::Script, |p, cx| ScriptUi::new(p, cx).into());
    registry
});

fn default_factory(packet: &PacketRef, cx: &PaneContext) -> PaneBody {
    let mut ui = DefaultUi { kind: packet.kind() };
    ui.refresh(packet, cx);
    ui.into()
}

pub fn has_editor(kind: PacketKind) -> bool {
    REGISTRY.contains_key(&kind)
}

/// The tab a kind last showed, for kinds that remember one.
fn stored_tab(kind: PacketKind, prefs: &Preferences) -> Option<u32> {
    match kind {
        PacketKind::Triangulation2 => Some(prefs.tab_dim2_tri),
        PacketKind::Triangulation3 => Some(prefs.tab_dim3_tri),
        PacketKind::Triangulation4 => Some(prefs.tab_dim4_tri),
        PacketKind::SnapPea => Some(prefs.tab_snappea_tri),
        PacketKind::Link => Some(prefs.tab_link),
        PacketKind::NormalSurfaces => Some(prefs.tab_surface_list),
        PacketKind::NormalHypersurfaces => Some(prefs.tab_hypersurface_list),
        _ => None,
    }
}

fn store_tab(kind: PacketKind, tab: u32) -> Option<Change> {
    match kind {
        PacketKind::Triangulation2 => Some(Change::tab_dim2_tri(tab)),
        PacketKind::Triangulation3 => Some(Change::tab_dim3_tri(tab)),
        PacketKind::Triangulation4 => Some(Change::tab_dim4_tri(tab)),
        PacketKind::SnapPea => Some(Change::tab_snappea_tri(tab)),
        PacketKind::Link => Some(Change::tab_link(tab)),
        PacketKind::NormalSurfaces => Some(Change::tab_surface_list(tab)),
        PacketKind::NormalHypersurfaces => Some(Change::tab_hypersurface_list(tab)),
        _ => None,
    }
}

pub struct Pane {
    packet: sync::Weak<Packet>,
    id: PacketId,
    kind: PacketKind,
    title: String,
    tab: usize,
    body: PaneBody,
}

impl Pane {
    pub fn new(packet: &PacketRef, cx: &PaneContext) -> Pane {
        let factory = REGISTRY.get(&packet.kind()).copied().unwrap_or(default_factory);
        let body = factory(packet, cx);
        let tab = stored_tab(packet.kind(), cx.prefs)
            .map(|tab| tab as usize)
            .filter(|&tab| tab < body.tabs().len())
            .unwrap_or(0);

        tracing::debug!(packet = %packet.human_label(), kind = %packet.kind(), "opening pane");
        Pane {
            packet: sync::Arc::downgrade(packet),
            id: packet.id(),
            kind: packet.kind(),
            title: title_for(packet),
            tab,
            body,
        }
    }

    pub fn packet(&self) -> Option<PacketRef> {
        self.packet.upgrade()
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &PaneBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut PaneBody {
        &mut self.body
    }

    pub fn tabs(&self) -> &'static [&'static str] {
        self.body.tabs()
    }

    pub fn current_tab(&self) -> usize {
        self.tab
    }

    /// Switches tab. Out-of-range indices are ignored.
    pub fn set_tab(&mut self, tab: usize) -> bool {
        if tab < self.tabs().len().max(1) {
            self.tab = tab;
            true
        } else {
            false
        }
    }

    pub fn set_tab_by_name(&mut self, name: &str) -> bool {
        match self.tabs().iter().position(|t| t.eq_ignore_ascii_case(name)) {
            Some(tab) => self.set_tab(tab),
            None => false,
        }
    }

    /// The preference change that records this pane's tab, if its kind
    /// remembers one.
    pub fn remembered_tab(&self) -> Option<Change> {
        store_tab(self.kind, self.tab as u32)
    }

    /// Pulls fresh state from the packet. Returns false if the packet is gone.
    pub fn refresh(&mut self, cx: &PaneContext) -> bool {
        match self.packet.upgrade() {
            Some(packet) => {
                self.title = title_for(&packet);
                self.body.refresh(&packet, cx);
                true
            },
            None => false,
        }
    }

    pub fn relabel(&mut self) {
        if let Some(packet) = self.packet.upgrade() {
            self.title = title_for(&packet);
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.title.clone();
        if let Some(summary) = self.body.summary() {
            out.push('\n');
            out.push_str(&summary);
        }
        let tabs = self.tabs();
        if !tabs.is_empty() {
            out.push_str("\n[");
            out.push_str(&tabs.iter().enumerate()
                .map(|(i, t)| if i == self.tab { format!("*{}*", t) } else { t.to_string() })
                .collect::<Vec<_>>()
                .join(" | "));
            out.push(']');
        }
        out.push('\n');
        out.push_str(&self.body.render(self.tab));
        out
    }

    pub fn edit_facet(&self) -> EditFacet {
        self.body.edit_facet(self.tab)
    }

    pub fn copy_text(&self) -> Option<String> {
        self.body.copy_text(self.tab)
    }

    pub fn unavailable(&self) -> Option<Error> {
        self.body.unavailable(self.tab)
    }

    /// Panes commit every edit as it is made, so there is never anything
    /// left to lose.
    pub fn close_query(&self) -> bool {
        true
    }
}

fn title_for(packet: &Packet) -> String {
    format!("{} ({})", packet.human_label(), packet.kind().name())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::engine::basic::BasicEngine;
    use crate::model::packet::Payload;
    use crate::model::surfaces::SurfaceFilter;

    #[test]
    fn unsupported_kinds_get_the_default_pane() {
        let engine = BasicEngine;
        let prefs = Preferences::default();
        let cx = PaneContext { engine: &engine, prefs: &prefs };

        let filter = Packet::new("Filter", Payload::SurfaceFilter(SurfaceFilter::Trivial));
        let pane = Pane::new(&filter, &cx);
        assert!(!has_editor(PacketKind::SurfaceFilter));
        assert!(matches!(pane.body(), PaneBody::Default(_)));
        assert!(pane.render().contains("Python console"));

        let text = Packet::new("Notes", Payload::Text("hi".into()));
        assert!(matches!(Pane::new(&text, &cx).body(), PaneBody::Text(_)));
    }

    #[test]
    fn tabs_are_remembered_per_kind() {
        let engine = BasicEngine;
        let mut prefs = Preferences::default();
        prefs.tab_link = 2;
        let cx = PaneContext { engine: &engine, prefs: &prefs };

        let link = Packet::new("Trefoil", Payload::Link(crate::model::link::Link::unknot()));
        let mut pane = Pane::new(&link, &cx);
        assert_eq!(pane.current_tab(), 2);
        assert!(pane.set_tab_by_name("crossings"));
        assert!(!pane.set_tab(99));
        assert!(matches!(pane.remembered_tab(), Some(Change::tab_link(0))));
    }

    #[test]
    fn titles_follow_renames() {
        let engine = BasicEngine;
        let prefs = Preferences::default();
        let cx = PaneContext { engine: &engine, prefs: &prefs };

        let text = Packet::new("", Payload::Text(String::new()));
        let mut pane = Pane::new(&text, &cx);
        assert_eq!(pane.title(), "(no label) (Text)");
        text.set_label("Notes");
        pane.relabel();
        assert_eq!(pane.title(), "Notes (Text)");

        drop(text);
        assert!(!pane.refresh(&cx));
    }
}
