use std::path::Path;

use crate::io::{label_from_path, Context, HandlerError, PacketHandler};
use crate::model::packet::{Packet, PacketKind, PacketRef, Payload, SnapPeaData};
use crate::model::triangulation::Triangulation;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapPeaHandler;

/// The manifold name recorded on the second line of a SnapPea file.
fn snappea_name(text: &str) -> Option<String> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .nth(1)
        .map(|l| l.trim().to_string())
        .filter(|name| !name.is_empty())
}

impl PacketHandler for SnapPeaHandler {
    fn name(&self) -> &'static str {
        "SnapPea triangulation"
    }

    fn filter(&self) -> &'static str {
        "*.tri"
    }

    fn accepts(&self, kind: PacketKind) -> bool {
        matches!(kind, PacketKind::SnapPea | PacketKind::Triangulation3)
    }

    fn import(&self, cx: &Context, path: &Path) -> Result<PacketRef, HandlerError> {
        let text = cx.read_ascii(path)?;
        let data = cx.engine.read_snappea(&text)?;
        let label = snappea_name(&text).unwrap_or_else(|| label_from_path(path));
        tracing::info!(path = %path.display(), tetrahedra = data.triangulation.size(), "imported SnapPea triangulation");
        Ok(Packet::new(label, Payload::SnapPea(data)))
    }

    fn export(&self, cx: &Context, packet: &PacketRef, path: &Path) -> Result<(), HandlerError> {
        let data = match &*packet.payload() {
            Payload::SnapPea(data) => data.clone(),
            Payload::Triangulation(tri) if tri.dim() == 3 => {
                if tri.is_empty() {
                    return Err(HandlerError::Refused("This triangulation is empty.".to_string()));
                }
                cx.engine.snappea_from_native(tri)?
            },
            _ => return Err(HandlerError::WrongKind { format: self.name(), found: packet.kind() }),
        };
        let text = cx.engine.write_snappea(&data, &packet.label())?;
        cx.write_bytes(path, text.as_bytes())
    }
}

/// Orb and Casson files; these are only ever read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrbHandler;

impl PacketHandler for OrbHandler {
    fn name(&self) -> &'static str {
        "Orb / Casson triangulation"
    }

    fn filter(&self) -> &'static str {
        "*.orb"
    }

    fn can_export(&self) -> bool {
        false
    }

    fn accepts(&self, _kind: PacketKind) -> bool {
        false
    }

    fn import(&self, cx: &Context, path: &Path) -> Result<PacketRef, HandlerError> {
        let text = cx.read_ascii(path)?;
        let tri: Triangulation = cx.engine.read_orb(&text)?;
        Ok(Packet::new(label_from_path(path), Payload::Triangulation(tri)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use crate::engine::basic::BasicEngine;
    use crate::engine::EngineError;
    use crate::model::codec::TextCodec;
    use crate::model::perm::Perm;

    fn doubled_tet() -> Triangulation {
        let gluings: Vec<_> = (0..4).map(|f| (0, f, 1, Perm::identity(4))).collect();
        Triangulation::from_gluings(3, 2, &gluings).unwrap()
    }

    #[test]
    fn triangulations_travel_through_snappea_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sphere.tri");
        let engine = BasicEngine;
        let cx = Context::new(&engine, TextCodec::Utf8);

        let packet = Packet::new("Sphere", Payload::Triangulation(doubled_tet()));
        SnapPeaHandler.export(&cx, &packet, &path).unwrap();
        let imported = SnapPeaHandler.import(&cx, &path).unwrap();
        assert_eq!(imported.kind(), PacketKind::SnapPea);
        assert_eq!(imported.label(), "Sphere");
        assert_eq!(imported.read::<SnapPeaData, _>(|d| d.triangulation.clone()), Some(doubled_tet()));
    }

    #[test]
    fn empty_and_foreign_packets_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tri");
        let engine = BasicEngine;
        let cx = Context::new(&engine, TextCodec::Utf8);

        let empty = Packet::new("Empty", Payload::Triangulation(Triangulation::new(3)));
        assert_matches!(SnapPeaHandler.export(&cx, &empty, &path), Err(HandlerError::Refused(_)));
        let surface = Packet::new("Disc", Payload::Triangulation(Triangulation::new(2)));
        assert_matches!(SnapPeaHandler.export(&cx, &surface, &path), Err(HandlerError::WrongKind { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn orb_needs_engine_support() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.orb");
        std::fs::write(&path, "% orb\n").unwrap();
        let engine = BasicEngine;
        let cx = Context::new(&engine, TextCodec::Utf8);
        assert_matches!(OrbHandler.import(&cx, &path), Err(HandlerError::Engine(EngineError::Unsupported(_))));
    }
}
