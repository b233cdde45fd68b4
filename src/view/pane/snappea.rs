use crate::model::packet::{PacketRef, SnapPeaData};
use crate::model::triangulation::{Skeleton, Triangulation};
use crate::view::pane::triangulation::{facet_columns, gluing_text};
use crate::view::pane::{PacketUi, PaneContext};

/// SnapPea triangulations can only be changed through the SnapPea kernel, so
/// their gluings are shown read-only.
pub struct SnapPeaUi {
    tri: Triangulation,
    skeleton: Option<Skeleton>,
}

impl SnapPeaUi {
    pub fn new(packet: &PacketRef, cx: &PaneContext) -> SnapPeaUi {
        let mut ui = SnapPeaUi { tri: Triangulation::new(3), skeleton: None };
        ui.refresh(packet, cx);
        ui
    }

    pub fn cusps(&self) -> usize {
        self.skeleton.as_ref().map_or(0, |s| s.vertex_links.iter().filter(|l| l.is_ideal()).count())
    }
}

impl PacketUi for SnapPeaUi {
    fn tabs(&self) -> &'static [&'static str] {
        &["Gluings", "Skeleton"]
    }

    fn refresh(&mut self, packet: &PacketRef, cx: &PaneContext) {
        if let Some(tri) = packet.read::<SnapPeaData, _>(|data| data.triangulation.clone()) {
            self.tri = tri;
        }
        self.skeleton = cx.engine.skeleton(&self.tri).ok();
    }

    fn summary(&self) -> Option<String> {
        if self.tri.is_empty() {
            return Some("Null triangulation".to_string());
        }
        Some(match self.cusps() {
            1 => format!("{} tetrahedra, 1 cusp", self.tri.size()),
            n => format!("{} tetrahedra, {} cusps", self.tri.size(), n),
        })
    }

    fn render(&self, tab: usize) -> String {
        match tab {
            1 => match &self.skeleton {
                Some(skeleton) => format!("Vertices: {}\nEdges: {}\nCusps: {}\nOrientable: {}",
                                          skeleton.vertices.len(), skeleton.edges.len(), self.cusps(),
                                          if skeleton.orientable { "yes" } else { "no" }),
                None => "Skeletal information is not available.".to_string(),
            },
            _ => {
                let columns = facet_columns(3);
                let mut lines = vec![format!("Tetrahedron | {}", columns.iter().map(|(_, name)| name.as_str()).collect::<Vec<_>>().join(" | "))];
                for simplex in 0..self.tri.size() {
                    let cells = columns.iter().map(|&(facet, _)| gluing_text(&self.tri, simplex, facet)).collect::<Vec<_>>();
                    lines.push(format!("{} | {}", simplex, cells.join(" | ")));
                }
                lines.join("\n")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::basic::BasicEngine;
    use crate::model::packet::{Packet, Payload};
    use crate::model::perm::Perm;
    use crate::model::preferences::Preferences;

    #[test]
    fn gluings_are_shown_read_only() {
        let engine = BasicEngine;
        let prefs = Preferences::default();
        let cx = PaneContext { engine: &engine, prefs: &prefs };

        let tri = Triangulation::from_gluings(3, 2, &[(0, 0, 1, Perm::parse("0132").unwrap())]).unwrap();
        let packet = Packet::new("Cusped", Payload::SnapPea(SnapPeaData { triangulation: tri }));
        let ui = SnapPeaUi::new(&packet, &cx);
        assert_eq!(ui.tabs(), &["Gluings", "Skeleton"]);
        assert!(ui.render(0).contains("\n0 |  |  |  | 1 (132)"));
        assert!(ui.summary().unwrap().starts_with("2 tetrahedra"));
    }
}
