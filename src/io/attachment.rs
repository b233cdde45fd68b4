use std::path::Path;

use crate::io::{Context, HandlerError, PacketHandler};
use crate::model::packet::{Packet, PacketKind, PacketRef, Payload};

/// PDF documents, carried as opaque bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PdfHandler;

impl PacketHandler for PdfHandler {
    fn name(&self) -> &'static str {
        "PDF document"
    }

    fn filter(&self) -> &'static str {
        "*.pdf"
    }

    fn accepts(&self, kind: PacketKind) -> bool {
        kind == PacketKind::Pdf
    }

    fn import(&self, cx: &Context, path: &Path) -> Result<PacketRef, HandlerError> {
        let bytes = cx.read_bytes(path)?;
        if bytes.is_empty() {
            return Err(HandlerError::Refused("The PDF document is empty.".to_string()));
        }
        let label = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "PDF document".to_string());
        Ok(Packet::new(label, Payload::Pdf(bytes)))
    }

    fn export(&self, cx: &Context, packet: &PacketRef, path: &Path) -> Result<(), HandlerError> {
        match &*packet.payload() {
            Payload::Pdf(bytes) => cx.write_bytes(path, bytes),
            _ => Err(HandlerError::WrongKind { format: self.name(), found: packet.kind() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    use crate::engine::basic::BasicEngine;
    use crate::model::codec::TextCodec;

    #[test]
    fn bytes_pass_through_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.pdf");
        let copy = dir.path().join("copy.pdf");
        let bytes = b"%PDF-1.4\n\xff\xfe binary".to_vec();
        std::fs::write(&source, &bytes).unwrap();
        let cx = Context::new(&BasicEngine, TextCodec::Utf8);

        let packet = PdfHandler.import(&cx, &source).unwrap();
        assert_eq!(packet.label(), "notes.pdf");
        PdfHandler.export(&cx, &packet, &copy).unwrap();
        assert_eq!(std::fs::read(&copy).unwrap(), bytes);
    }

    #[test]
    fn empty_files_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();
        let cx = Context::new(&BasicEngine, TextCodec::Utf8);
        assert_matches!(PdfHandler.import(&cx, &path), Err(HandlerError::Refused(_)));
        assert_matches!(PdfHandler.import(&cx, &dir.path().join("missing.pdf")), Err(HandlerError::Io { .. }));
    }
}
