//! Operations offered on SnapPea triangulations.

use crate::engine::EngineError;
use crate::model::packet::{Packet, PacketRef, Payload, SnapPeaData};
use crate::view::error::{Action, Error};
use crate::view::operation::triangulation::{engine_failure, packet_failure};
use crate::view::operation::{Done, OpContext, SnapPeaOp};

fn data_of(packet: &PacketRef, action: Action) -> Result<SnapPeaData, Error> {
    packet.read::<SnapPeaData, _>(Clone::clone)
        .ok_or_else(|| Error::refused(action, "Please select a SnapPea triangulation to work with.", None))
}

fn null(action: Action, verb: &str) -> Error {
    Error::refused(action, format!("This is a null triangulation: there is no SnapPea triangulation for me to {}.", verb), None)
}

pub fn precheck(cx: &OpContext, op: SnapPeaOp, packet: &PacketRef, action: Action) -> Result<(), Error> {
    let data = data_of(packet, action)?;
    let null_verb = match op {
        SnapPeaOp::Randomise => "randomise",
        SnapPeaOp::Canonize => "canonise",
        SnapPeaOp::ToNative => "convert",
        SnapPeaOp::VertexLink { .. } => "triangulate",
    };
    if data.triangulation.is_empty() {
        return Err(match op {
            SnapPeaOp::VertexLink { .. } => Error::refused(action, "This triangulation does not have any vertices.", None),
            _ => null(action, null_verb),
        });
    }

    if let SnapPeaOp::VertexLink { cusp } = op {
        let vertices = cx.engine.skeleton(&data.triangulation).map_err(engine_failure(action))?.vertices.len();
        if vertices == 0 {
            return Err(Error::refused(action, "This triangulation does not have any vertices.", None));
        }
        if cusp >= vertices {
            return Err(Error::invalid(action, format!("There is no vertex number {}.", cusp),
                                      Some(&format!("This triangulation has {} vertices.", vertices))));
        }
    }
    Ok(())
}

pub fn execute(cx: &OpContext, op: SnapPeaOp, packet: &PacketRef, action: Action) -> Result<Done, Error> {
    let mut data = data_of(packet, action)?;
    let failed = engine_failure(action);

    let child = match op {
        SnapPeaOp::Randomise => {
            cx.engine.snappea_randomise(&mut data).map_err(failed)?;
            packet.change::<SnapPeaData, _>(|stored| *stored = data).map_err(packet_failure(action))?;
            return Ok(Done::modified());
        },
        SnapPeaOp::Canonize => match cx.engine.snappea_canonize(&data) {
            Ok(tri) => Packet::new("Canonical retriangulation", Payload::Triangulation(tri)),
            Err(EngineError::NoResult) | Err(EngineError::Failed(_)) => {
                return Err(Error::refused(action,
                                          "The SnapPea kernel was not able to build the canonical retriangulation of the canonical cell decomposition.",
                                          None));
            },
            Err(error) => return Err(failed(error)),
        },
        SnapPeaOp::VertexLink { cusp } => {
            let link = cx.engine.snappea_vertex_link(&data, cusp).map_err(failed)?;
            Packet::new(format!("Link of vertex {}", cusp), Payload::Triangulation(link))
        },
        SnapPeaOp::ToNative => {
            let tri = cx.engine.snappea_to_native(&data).map_err(failed)?;
            Packet::new(packet.label(), Payload::Triangulation(tri))
        },
    };

    packet.append(child.clone()).map_err(packet_failure(action))?;
    Ok(Done::selecting(child))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use crate::engine::basic::BasicEngine;
    use crate::engine::SharedEngine;
    use crate::model::packet::PacketKind;
    use crate::model::perm::Perm;
    use crate::model::preferences::PreferencesStore;
    use crate::model::triangulation::Triangulation;
    use crate::view::error::ErrorKind;
    use crate::view::interaction::Unattended;
    use crate::view::operation::Operation;

    fn run(root: &PacketRef, op: SnapPeaOp, packet: &PacketRef) -> Result<Done, Error> {
        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        let engine: SharedEngine = sync::Arc::new(BasicEngine);
        let prefs = PreferencesStore::new();
        let cx = OpContext { engine: &engine, prefs: &prefs, interaction: &Unattended, runtime: rt.handle().clone(), root };
        Operation::SnapPea(op).execute(&cx, Some(packet))
    }

    fn snappea(root: &PacketRef, label: &str, tri: Triangulation) -> PacketRef {
        let packet = Packet::new(label, Payload::SnapPea(SnapPeaData { triangulation: tri }));
        root.append(packet.clone()).unwrap();
        packet
    }

    #[test]
    fn null_triangulations_are_refused() {
        let root = Packet::container("");
        let packet = snappea(&root, "Null", Triangulation::new(3));
        assert_eq!(run(&root, SnapPeaOp::ToNative, &packet).unwrap_err().message(),
                   "This is a null triangulation: there is no SnapPea triangulation for me to convert.");
        assert_eq!(run(&root, SnapPeaOp::Canonize, &packet).unwrap_err().message(),
                   "This is a null triangulation: there is no SnapPea triangulation for me to canonise.");
        assert_eq!(run(&root, SnapPeaOp::VertexLink { cusp: 0 }, &packet).unwrap_err().message(),
                   "This triangulation does not have any vertices.");
        assert!(!packet.has_children());
    }

    #[test]
    fn conversion_keeps_the_label() {
        let root = Packet::container("");
        let gluings: Vec<_> = (0..4).map(|f| (0, f, 1, Perm::identity(4))).collect();
        let tri = Triangulation::from_gluings(3, 2, &gluings).unwrap();
        let packet = snappea(&root, "S3", tri.clone());

        let done = run(&root, SnapPeaOp::ToNative, &packet).unwrap();
        let child = done.select.unwrap();
        assert_eq!(child.kind(), PacketKind::Triangulation3);
        assert_eq!(child.label(), "S3");
        assert_eq!(child.read::<Triangulation, _>(Clone::clone), Some(tri));
        assert!(sync::Arc::ptr_eq(&child.parent().unwrap(), &packet));
    }

    #[test]
    fn out_of_range_cusps_are_invalid() {
        let root = Packet::container("");
        let gluings: Vec<_> = (0..4).map(|f| (0, f, 1, Perm::identity(4))).collect();
        let packet = snappea(&root, "S3", Triangulation::from_gluings(3, 2, &gluings).unwrap());
        assert_matches!(run(&root, SnapPeaOp::VertexLink { cusp: 40 }, &packet), Err(e) if e.kind() == ErrorKind::Validation);
    }
}
