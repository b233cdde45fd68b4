//! Creating new packets from the "New" menu.
//!
//! Most kinds start out empty beneath the selected packet (or the root when
//! nothing is selected). Lists and SnapPea triangulations are built from a
//! selected triangulation instead, and appear beneath it.

use crate::engine::EngineError;
use crate::model::link::Link;
use crate::model::packet::{Packet, PacketKind, PacketRef, Payload, Script};
use crate::model::surfaces::SurfaceFilter;
use crate::model::triangulation::Triangulation;
use crate::view::error::{Action, Error, Trouble};
use crate::view::operation::triangulation::{engine_failure, packet_failure};
use crate::view::operation::{Done, OpContext};
use crate::view::runner::Outcome;

/// The triangulation dimension a derived kind is built from.
fn source_dim(kind: PacketKind) -> Option<usize> {
    match kind {
        PacketKind::SnapPea | PacketKind::NormalSurfaces | PacketKind::AngleStructures => Some(3),
        PacketKind::NormalHypersurfaces => Some(4),
        _ => None,
    }
}

fn source_message(dim: usize) -> String {
    format!("Please select a {}-manifold triangulation to work with.", dim)
}

pub fn precheck(kind: PacketKind, packet: Option<&PacketRef>, action: Action) -> Result<(), Error> {
    if kind == PacketKind::Pdf {
        return Err(Error::refused(action, "PDF documents cannot be created from scratch.",
                                  Some("Please import an existing PDF file instead.")));
    }
    if let Some(dim) = source_dim(kind) {
        let source = packet.filter(|p| !p.is_root()).and_then(|p| p.kind().triangulation_dim());
        if source != Some(dim) {
            return Err(Error::refused(action, source_message(dim), None));
        }
    }
    Ok(())
}

pub fn execute(cx: &OpContext, kind: PacketKind, packet: Option<&PacketRef>, action: Action) -> Result<Done, Error> {
    let parent = match packet {
        Some(packet) => packet.clone(),
        None => cx.root.clone(),
    };

    let payload = match kind {
        PacketKind::Container => Payload::Container,
        PacketKind::Triangulation2 => Payload::Triangulation(Triangulation::new(2)),
        PacketKind::Triangulation3 => Payload::Triangulation(Triangulation::new(3)),
        PacketKind::Triangulation4 => Payload::Triangulation(Triangulation::new(4)),
        PacketKind::Text => Payload::Text(String::new()),
        PacketKind::Script => Payload::Script(Script::new(String::new())),
        PacketKind::SurfaceFilter => Payload::SurfaceFilter(SurfaceFilter::Trivial),
        PacketKind::Link => {
            let Some(code) = cx.interaction.ask_text("Knot or link code:", "") else {
                return Ok(Done::nothing());
            };
            if code.trim().is_empty() {
                return Err(Error::invalid(action, "Please type a knot or link code.", None));
            }
            let link: Link = cx.engine.link_from_code(&code).map_err(|error| match error {
                EngineError::Failed(message) => Error::invalid(action, "I could not interpret the given code.", Some(&message)),
                error => Error::new(action, Trouble::Engine(error)),
            })?;
            Payload::Link(link)
        },
        PacketKind::SnapPea | PacketKind::NormalSurfaces | PacketKind::NormalHypersurfaces | PacketKind::AngleStructures => {
            match derive(cx, kind, &parent, action)? {
                Some(payload) => payload,
                None => return Ok(Done::nothing()),
            }
        },
        PacketKind::Pdf => return Err(Error::refused(action, "PDF documents cannot be created from scratch.", None)),
    };

    let created = Packet::new(kind.name(), payload);
    parent.append(created.clone()).map_err(packet_failure(action))?;
    Ok(Done::selecting(created))
}

/// Builds a payload from the triangulation in `source`. None means the user
/// cancelled an enumeration.
fn derive(cx: &OpContext, kind: PacketKind, source: &PacketRef, action: Action) -> Result<Option<Payload>, Error> {
    let Some(tri) = source.read::<Triangulation, _>(Clone::clone) else {
        return Err(Error::refused(action, source_message(source_dim(kind).unwrap_or(3)), None));
    };
    let prefs = cx.preferences();
    let threads = prefs.threads();
    let engine = cx.engine.clone();
    let runner = cx.runner();

    let outcome = match kind {
        PacketKind::SnapPea => {
            return cx.engine.snappea_from_native(&tri).map(|data| Some(Payload::SnapPea(data))).map_err(engine_failure(action));
        },
        PacketKind::NormalSurfaces => {
            let (coords, flags) = (prefs.surfaces_creation_coords, prefs.surfaces_creation_list);
            runner.run("Enumerating normal surfaces", move |tracker| {
                engine.enumerate_surfaces(&tri, coords, flags, threads, tracker).map(Payload::NormalSurfaces)
            })
        },
        PacketKind::NormalHypersurfaces => {
            let (coords, flags) = (prefs.hypersurfaces_creation_coords, prefs.hypersurfaces_creation_list);
            runner.run("Enumerating normal hypersurfaces", move |tracker| {
                engine.enumerate_hypersurfaces(&tri, coords, flags, threads, tracker).map(Payload::NormalHypersurfaces)
            })
        },
        _ => {
            let taut = prefs.angles_creation_taut;
            runner.run("Enumerating angle structures", move |tracker| {
                engine.enumerate_angles(&tri, taut, tracker).map(Payload::AngleStructures)
            })
        },
    };

    match outcome {
        Outcome::Cancelled => Ok(None),
        Outcome::Finished(result) => result.map(Some).map_err(engine_failure(action)),
    }
}
