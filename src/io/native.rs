use std::path::Path;

use crate::io::{Context, HandlerError, PacketHandler};
use crate::model::packet::{PacketKind, PacketRef};

/// Another data file, grafted in whole, or a subtree written out as one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NativeHandler;

impl PacketHandler for NativeHandler {
    fn name(&self) -> &'static str {
        "Regina data file"
    }

    fn filter(&self) -> &'static str {
        "*.rga"
    }

    fn accepts(&self, _kind: PacketKind) -> bool {
        true
    }

    #[tracing::instrument(skip(self, cx))]
    fn import(&self, cx: &Context, path: &Path) -> Result<PacketRef, HandlerError> {
        Ok(cx.engine.open(path)?)
    }

    #[tracing::instrument(skip(self, cx, packet), fields(packet = %packet.label()))]
    fn export(&self, cx: &Context, packet: &PacketRef, path: &Path) -> Result<(), HandlerError> {
        Ok(cx.engine.save(packet, path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::basic::BasicEngine;
    use crate::model::codec::TextCodec;
    use crate::model::packet::{Packet, Payload};

    #[test]
    fn exported_subtree_imports_as_orphan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.rga");
        let engine = BasicEngine;
        let cx = Context::new(&engine, TextCodec::Utf8);

        let root = Packet::container("Root");
        let branch = Packet::container("Branch");
        branch.append(Packet::new("Leaf", Payload::Text("leaf".into()))).unwrap();
        root.append(branch.clone()).unwrap();

        NativeHandler.export(&cx, &branch, &path).unwrap();
        let imported = NativeHandler.import(&cx, &path).unwrap();
        assert!(imported.parent().is_none());
        assert_eq!(imported.label(), "Branch");
        assert_eq!(imported.child(0).unwrap().label(), "Leaf");
        assert!(!std::sync::Arc::ptr_eq(&imported, &branch));
    }
}
