//! Normal surface lists, viewed in any coordinate system the list allows.

use crate::model::packet::PacketRef;
use crate::model::surfaces::{coordinates, NormalCoords, NormalSurfaceList};
use crate::model::triangulation::Skeleton;
use crate::view::pane::{PacketUi, PaneContext};

pub const TAB_SUMMARY: usize = 0;
pub const TAB_COORDINATES: usize = 1;

pub struct SurfacesUi {
    list: Option<NormalSurfaceList>,
    skeleton: Option<Skeleton>,
    views: Vec<NormalCoords>,
    view: NormalCoords,
    unicode: bool,
}

impl SurfacesUi {
    pub fn new(packet: &PacketRef, cx: &PaneContext) -> SurfacesUi {
        let mut ui = SurfacesUi {
            list: None,
            skeleton: None,
            views: Vec::new(),
            view: NormalCoords::Standard,
            unicode: cx.prefs.display_unicode,
        };
        ui.refresh(packet, cx);
        if let Some(list) = &ui.list {
            ui.view = list.enumerated;
        }
        ui.settle_view();
        ui
    }

    /// Coordinate systems offered by the chooser.
    pub fn views(&self) -> &[NormalCoords] {
        &self.views
    }

    pub fn view(&self) -> NormalCoords {
        self.view
    }

    /// Switches coordinate system. Systems the list cannot show are refused.
    pub fn set_view(&mut self, view: NormalCoords) -> bool {
        if self.views.contains(&view) {
            self.view = view;
            true
        } else {
            false
        }
    }

    fn settle_view(&mut self) {
        if !self.views.contains(&self.view) {
            self.view = self.views.first().copied().unwrap_or(NormalCoords::Standard);
        }
    }

    /// Header and tooltip for every column of the current view.
    pub fn columns(&self) -> Vec<(String, String)> {
        let (Some(list), Some(skeleton)) = (&self.list, &self.skeleton) else { return Vec::new() };
        (0..coordinates::column_count(self.view, list.triangulation().size(), skeleton))
            .map(|i| (coordinates::column_name(self.view, i, skeleton, self.unicode), coordinates::column_desc(self.view, i, skeleton)))
            .collect()
    }

    fn render_coordinates(&self) -> String {
        let (Some(list), Some(skeleton)) = (&self.list, &self.skeleton) else {
            return "The underlying triangulation could not be examined.".to_string();
        };
        let columns = coordinates::column_count(self.view, list.triangulation().size(), skeleton);

        let mut lines = vec![format!("{} coordinates", self.view.name(true))];
        let mut header = vec!["Name".to_string()];
        header.extend(self.columns().into_iter().map(|(name, _)| name));
        lines.push(header.join(" | "));
        for surface in list.surfaces() {
            let mut row = vec![surface.name.clone()];
            row.extend((0..columns).map(|i| coordinates::value(list, surface, self.view, i, skeleton).to_string()));
            lines.push(row.join(" | "));
        }
        lines.join("\n")
    }
}

impl PacketUi for SurfacesUi {
    fn tabs(&self) -> &'static [&'static str] {
        &["Summary", "Coordinates"]
    }

    fn refresh(&mut self, packet: &PacketRef, cx: &PaneContext) {
        self.list = packet.read::<NormalSurfaceList, _>(Clone::clone);
        self.skeleton = self.list.as_ref().and_then(|list| cx.engine.skeleton(list.triangulation()).ok());
        self.views = self.list.as_ref()
            .map(|list| list.allowed_views(cx.prefs.surfaces_support_oriented))
            .unwrap_or_default();
        self.unicode = cx.prefs.display_unicode;
        self.settle_view();
    }

    fn summary(&self) -> Option<String> {
        self.list.as_ref().map(|list| {
            let count = match list.len() {
                1 => "1 surface".to_string(),
                n => format!("{} surfaces", n),
            };
            format!("{} ({}), enumerated in {} coordinates", count, list.flags.describe(), list.enumerated.name(false))
        })
    }

    fn render(&self, tab: usize) -> String {
        match tab {
            TAB_COORDINATES => self.render_coordinates(),
            _ => match &self.list {
                None => "This packet holds no surfaces.".to_string(),
                Some(list) => {
                    let empty = list.surfaces().iter().filter(|s| s.is_empty()).count();
                    format!("Surfaces: {}\nEmpty surfaces: {}\nTetrahedra: {}", list.len(), empty, list.triangulation().size())
                },
            },
        }
    }
}
