use std::fmt::Write;
use std::path::Path;

use crate::io::{Context, HandlerError, PacketHandler};
use crate::model::packet::{PacketKind, PacketRef, Payload};
use crate::model::surfaces::{coordinates, NormalCoords, NormalSurfaceList};
use crate::model::triangulation::Skeleton;

/// Normal surface lists as comma-separated values, one surface per row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CsvSurfaceHandler {
    edge_weights: bool,
}

impl CsvSurfaceHandler {
    /// Standard coordinates, or standard almost normal coordinates if the
    /// list has octagons.
    pub fn standard() -> CsvSurfaceHandler {
        CsvSurfaceHandler { edge_weights: false }
    }

    pub fn edge_weight() -> CsvSurfaceHandler {
        CsvSurfaceHandler { edge_weights: true }
    }

    fn view(&self, list: &NormalSurfaceList) -> NormalCoords {
        if self.edge_weights {
            NormalCoords::EdgeWeight
        } else if list.allows_almost_normal() {
            NormalCoords::AlmostNormal
        } else {
            NormalCoords::Standard
        }
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Renders the whole list; the header row names every coordinate column.
pub fn render(list: &NormalSurfaceList, view: NormalCoords, skeleton: &Skeleton) -> String {
    let columns = coordinates::column_count(view, list.triangulation().size(), skeleton);
    let mut out = String::from("name");
    for column in 0..columns {
        out.push(',');
        out.push_str(&quote(&coordinates::column_name(view, column, skeleton, false)));
    }
    out.push('\n');

    for surface in list.surfaces() {
        out.push_str(&quote(&surface.name));
        for column in 0..columns {
            let _ = write!(out, ",{}", coordinates::value(list, surface, view, column, skeleton));
        }
        out.push('\n');
    }
    out
}

impl PacketHandler for CsvSurfaceHandler {
    fn name(&self) -> &'static str {
        if self.edge_weights {
            "CSV (edge weight coordinates)"
        } else {
            "CSV (standard coordinates)"
        }
    }

    fn filter(&self) -> &'static str {
        "*.csv"
    }

    fn can_import(&self) -> bool {
        false
    }

    fn accepts(&self, kind: PacketKind) -> bool {
        kind == PacketKind::NormalSurfaces
    }

    fn export(&self, cx: &Context, packet: &PacketRef, path: &Path) -> Result<(), HandlerError> {
        let text = match &*packet.payload() {
            Payload::NormalSurfaces(list) => {
                let skeleton = cx.engine.skeleton(list.triangulation())?;
                render(list, self.view(list), &skeleton)
            },
            _ => return Err(HandlerError::WrongKind { format: self.name(), found: packet.kind() }),
        };
        /* names are always written as UTF-8 */
        cx.write_bytes(path, text.as_bytes())
    }
}
