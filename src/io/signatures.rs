//! Plain-text lists of isomorphism signatures and dehydration strings.

use std::path::Path;

use crate::io::{Context, HandlerError, PacketHandler};
use crate::model::packet::{Packet, PacketKind, PacketRef, Payload};
use crate::model::triangulation::Triangulation;

/// Label of the container that a multi-line import produces.
const IMPORT_CONTAINER: &str = "Imported Triangulations";

/// Builds one triangulation per line, keyed by the first token of the line.
/// Blank lines and lines starting with `#` are skipped; a line that does not
/// parse is logged and skipped.
fn import_lines(text: &str, what: &str, parse: impl Fn(&str) -> Result<Triangulation, HandlerError>) -> Result<PacketRef, HandlerError> {
    let container = Packet::container(IMPORT_CONTAINER);
    let mut bad = 0;
    for (number, line) in text.lines().enumerate() {
        let Some(token) = line.split_whitespace().next() else { continue };
        if token.starts_with('#') {
            continue;
        }
        match parse(token) {
            Ok(tri) => {
                container.append(Packet::new(token, Payload::Triangulation(tri)))
                    .map_err(|e| HandlerError::Refused(e.to_string()))?;
            },
            Err(error) => {
                bad+= 1;
                tracing::warn!(line = number + 1, %token, %error, "skipping unreadable {}", what);
            },
        }
    }

    if !container.has_children() {
        return Err(HandlerError::Refused(format!("The file contained no valid {}s.", what)));
    }
    if bad > 0 {
        tracing::info!(imported = container.count_children(), skipped = bad, "imported {}s", what);
    }
    Ok(container)
}

fn export_line(cx: &Context, packet: &PacketRef, path: &Path, format: &'static str, dim: usize, encode: impl FnOnce(&Triangulation) -> Result<String, HandlerError>) -> Result<(), HandlerError> {
    let line = match &*packet.payload() {
        Payload::Triangulation(tri) if tri.dim() == dim => encode(tri)?,
        Payload::SnapPea(data) if dim == 3 => encode(&data.triangulation)?,
        _ => return Err(HandlerError::WrongKind { format, found: packet.kind() }),
    };
    cx.write_text(path, &format!("{}\n", line))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IsoSigHandler {
    dim: usize,
}

impl IsoSigHandler {
    pub fn new(dim: usize) -> IsoSigHandler {
        IsoSigHandler { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl PacketHandler for IsoSigHandler {
    fn name(&self) -> &'static str {
        match self.dim {
            2 => "Isomorphism signature list (2-D)",
            4 => "Isomorphism signature list (4-D)",
            _ => "Isomorphism signature list (3-D)",
        }
    }

    fn filter(&self) -> &'static str {
        "*"
    }

    fn uses_codec(&self) -> bool {
        true
    }

    fn accepts(&self, kind: PacketKind) -> bool {
        kind.triangulation_dim() == Some(self.dim) || (self.dim == 3 && kind == PacketKind::SnapPea)
    }

    fn import(&self, cx: &Context, path: &Path) -> Result<PacketRef, HandlerError> {
        let text = cx.read_text(path)?;
        import_lines(&text, "isomorphism signature", |sig| Ok(cx.engine.from_iso_sig(self.dim, sig)?))
    }

    fn export(&self, cx: &Context, packet: &PacketRef, path: &Path) -> Result<(), HandlerError> {
        export_line(cx, packet, path, self.name(), self.dim, |tri| Ok(cx.engine.iso_sig(tri)?))
    }
}

/// Dehydration strings, which only describe 3-manifold triangulations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DehydrationHandler;

impl PacketHandler for DehydrationHandler {
    fn name(&self) -> &'static str {
        "Dehydrated triangulation list"
    }

    fn filter(&self) -> &'static str {
        "*"
    }

    fn uses_codec(&self) -> bool {
        true
    }

    fn accepts(&self, kind: PacketKind) -> bool {
        matches!(kind, PacketKind::Triangulation3 | PacketKind::SnapPea)
    }

    fn import(&self, cx: &Context, path: &Path) -> Result<PacketRef, HandlerError> {
        let text = cx.read_text(path)?;
        import_lines(&text, "dehydration string", |s| Ok(cx.engine.rehydrate(s)?))
    }

    fn export(&self, cx: &Context, packet: &PacketRef, path: &Path) -> Result<(), HandlerError> {
        export_line(cx, packet, path, self.name(), 3, |tri| Ok(cx.engine.dehydrate(tri)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use crate::engine::{Engine, EngineError};
    use crate::model::codec::TextCodec;

    /// Encodes a triangulation as its dimension and size, which is enough
    /// to tell imports apart.
    struct CountingEngine;

    impl Engine for CountingEngine {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn iso_sig(&self, tri: &Triangulation) -> Result<String, EngineError> {
            Ok(format!("d{}s{}", tri.dim(), tri.size()))
        }

        fn from_iso_sig(&self, dim: usize, sig: &str) -> Result<Triangulation, EngineError> {
            let size = sig.strip_prefix(&format!("d{}s", dim))
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| EngineError::Failed(format!("bad signature {}", sig)))?;
            let mut tri = Triangulation::new(dim);
            for _ in 0..size {
                tri.add_simplex();
            }
            Ok(tri)
        }

        fn dehydrate(&self, tri: &Triangulation) -> Result<String, EngineError> {
            self.iso_sig(tri)
        }

        fn rehydrate(&self, text: &str) -> Result<Triangulation, EngineError> {
            self.from_iso_sig(3, text)
        }
    }

    #[test]
    fn one_child_per_good_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sigs.txt");
        std::fs::write(&path, "d3s2 first\n\n# comment\nnonsense\nd3s5\n").unwrap();
        let cx = Context::new(&CountingEngine, TextCodec::Utf8);

        let container = IsoSigHandler::new(3).import(&cx, &path).unwrap();
        assert_eq!(container.label(), IMPORT_CONTAINER);
        let labels: Vec<_> = container.children().iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["d3s2".to_string(), "d3s5".to_string()]);
        assert_eq!(container.child(1).unwrap().read::<Triangulation, _>(|t| t.size()), Some(5));
    }

    #[test]
    fn nothing_valid_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sigs.txt");
        std::fs::write(&path, "d4s1\n").unwrap();
        let cx = Context::new(&CountingEngine, TextCodec::Utf8);
        assert_matches!(IsoSigHandler::new(2).import(&cx, &path), Err(HandlerError::Refused(_)));
        assert_eq!(DehydrationHandler.import(&cx, &path).unwrap_err().to_string(), "The file contained no valid dehydration strings.");
    }

    #[test]
    fn export_matches_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let cx = Context::new(&CountingEngine, TextCodec::Utf8);

        let mut tri = Triangulation::new(4);
        tri.add_simplex();
        let packet = Packet::new("Pentachoron", Payload::Triangulation(tri));
        assert_matches!(IsoSigHandler::new(3).export(&cx, &packet, &path), Err(HandlerError::WrongKind { .. }));
        assert_matches!(DehydrationHandler.export(&cx, &packet, &path), Err(HandlerError::WrongKind { .. }));
        IsoSigHandler::new(4).export(&cx, &packet, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "d4s1\n");
    }
}
