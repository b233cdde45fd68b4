//! Export-only text formats: input for Matveev's 3-manifold recogniser and
//! C++ source that rebuilds a triangulation.

use std::path::Path;

use crate::io::{Context, HandlerError, PacketHandler};
use crate::model::packet::{PacketKind, PacketRef, Payload};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecogniserHandler;

impl PacketHandler for RecogniserHandler {
    fn name(&self) -> &'static str {
        "3-manifold recogniser"
    }

    fn filter(&self) -> &'static str {
        "*.txt"
    }

    fn can_import(&self) -> bool {
        false
    }

    fn accepts(&self, kind: PacketKind) -> bool {
        kind == PacketKind::Triangulation3
    }

    fn export(&self, cx: &Context, packet: &PacketRef, path: &Path) -> Result<(), HandlerError> {
        let text = match &*packet.payload() {
            Payload::Triangulation(tri) if tri.dim() == 3 => cx.engine.recogniser(tri)?,
            _ => return Err(HandlerError::WrongKind { format: self.name(), found: packet.kind() }),
        };
        cx.write_bytes(path, text.as_bytes())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceHandler;

impl PacketHandler for SourceHandler {
    fn name(&self) -> &'static str {
        "C++ source"
    }

    fn filter(&self) -> &'static str {
        "*.cpp *.cc *.C"
    }

    fn uses_codec(&self) -> bool {
        true
    }

    fn can_import(&self) -> bool {
        false
    }

    fn accepts(&self, kind: PacketKind) -> bool {
        kind.triangulation_dim().is_some()
    }

    fn export(&self, cx: &Context, packet: &PacketRef, path: &Path) -> Result<(), HandlerError> {
        let text = match &*packet.payload() {
            Payload::Triangulation(tri) => cx.engine.source(tri, &packet.label())?,
            _ => return Err(HandlerError::WrongKind { format: self.name(), found: packet.kind() }),
        };
        cx.write_text(path, &text)
    }
}
