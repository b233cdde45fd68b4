//! Importing packets from, and exporting packets to, foreign file formats.

use std::sync;

use crate::io::{self, Context, Handler, PacketHandler};
use crate::model::packet::PacketRef;
use crate::view::error::{Action, Error, Trouble};
use crate::view::operation::triangulation::packet_failure;
use crate::view::operation::{Done, OpContext};

pub fn precheck_import(handler: &Handler, action: Action) -> Result<(), Error> {
    if !handler.can_import() {
        return Err(Error::refused(action, format!("Files cannot be imported from {} format.", handler.name()), None));
    }
    Ok(())
}

pub fn precheck_export(handler: &Handler, packet: &PacketRef, action: Action) -> Result<(), Error> {
    io::check_exportable(handler, packet).map_err(|error| Error::new(action, Trouble::Handler(error)))
}

/// Reads a file chosen by the user, then asks where in the tree the result
/// should go. `packet` is only a suggestion for the parent.
pub fn import(cx: &OpContext, handler: &Handler, packet: Option<&PacketRef>, action: Action) -> Result<Done, Error> {
    let Some(path) = cx.interaction.choose_path(&format!("Import {}", handler.name()), handler.filter(), false) else {
        return Ok(Done::nothing());
    };

    let io_cx = Context::new(cx.engine.as_ref(), cx.preferences().import_export_codec());
    tracing::info!(format = handler.name(), path = %path.display(), "importing");
    let imported = handler.import(&io_cx, &path).map_err(|error| Error::new(action, Trouble::Handler(error)))?;

    /* the suggested parent goes first */
    let mut parents = Vec::new();
    if let Some(packet) = packet {
        parents.push(packet.clone());
    }
    parents.extend(cx.root.subtree().into_iter().filter(|p| !packet.is_some_and(|s| sync::Arc::ptr_eq(s, p))));

    let Some(parent) = cx.interaction.choose_packet("Import beneath which packet?", &parents) else {
        return Ok(Done::nothing());
    };
    parent.append(imported.clone()).map_err(packet_failure(action))?;
    Ok(Done::selecting(imported))
}

pub fn export(cx: &OpContext, handler: &Handler, packet: &PacketRef, action: Action) -> Result<Done, Error> {
    let Some(path) = cx.interaction.choose_path(&format!("Export {}", handler.name()), handler.filter(), true) else {
        return Ok(Done::nothing());
    };

    let io_cx = Context::new(cx.engine.as_ref(), cx.preferences().import_export_codec());
    tracing::info!(format = handler.name(), path = %path.display(), packet = %packet.human_label(), "exporting");
    handler.export(&io_cx, packet, &path).map_err(|error| Error::new(action, Trouble::Handler(error)))?;
    Ok(Done::nothing())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use crate::engine::basic::BasicEngine;
    use crate::engine::SharedEngine;
    use crate::io::{NativeHandler, OrbHandler, SnapPeaHandler};
    use crate::model::packet::{Packet, Payload};
    use crate::model::preferences::PreferencesStore;
    use crate::view::error::ErrorKind;
    use crate::view::interaction::{CloseChoice, Interaction, MessageKind};
    use crate::view::operation::Operation;

    /// Picks the given path and always the last offered parent.
    struct Picker(PathBuf);

    impl Interaction for Picker {
        fn message(&self, _: MessageKind, _: &str, _: Option<&str>) {}
        fn confirm(&self, _: &str, _: Option<&str>) -> bool { true }
        fn ask_close(&self, _: &str) -> CloseChoice { CloseChoice::Cancel }
        fn ask_text(&self, _: &str, _: &str) -> Option<String> { None }
        fn choose_packet(&self, _: &str, among: &[PacketRef]) -> Option<PacketRef> { among.last().cloned() }
        fn choose_path(&self, _: &str, _: &str, _: bool) -> Option<PathBuf> { Some(self.0.clone()) }
        fn progress(&self, _: &str, _: Option<f64>) -> bool { true }
    }

    fn run(root: &PacketRef, op: Operation, packet: Option<&PacketRef>, path: PathBuf) -> Result<Done, Error> {
        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        let engine: SharedEngine = sync::Arc::new(BasicEngine);
        let prefs = PreferencesStore::new();
        let picker = Picker(path);
        let cx = OpContext { engine: &engine, prefs: &prefs, interaction: &picker, runtime: rt.handle().clone(), root };
        op.execute(&cx, packet)
    }

    #[test]
    fn exported_packets_import_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.rga");

        let root = Packet::container("");
        let notes = Packet::new("Notes", Payload::Text("hello".into()));
        root.append(notes.clone()).unwrap();
        let target = Packet::container("Target");
        root.append(target.clone()).unwrap();

        let done = run(&root, Operation::Export(NativeHandler.into()), Some(&notes), path.clone()).unwrap();
        assert!(!done.modified);
        assert!(path.exists());

        let done = run(&root, Operation::Import(NativeHandler.into()), Some(&notes), path).unwrap();
        let imported = done.select.unwrap();
        assert!(sync::Arc::ptr_eq(&imported.parent().unwrap(), &target));
        assert_eq!(imported.subtree().iter().filter(|p| p.label() == "Notes").count(), 1);
    }

    #[test]
    fn directions_and_kinds_are_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        let root = Packet::container("");
        let notes = Packet::new("Notes", Payload::Text("hello".into()));
        root.append(notes.clone()).unwrap();

        let error = run(&root, Operation::Export(SnapPeaHandler.into()), Some(&notes), dir.path().join("x.tri")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Refused);
        assert!(!dir.path().join("x.tri").exists());

        assert!(run(&root, Operation::Export(OrbHandler.into()), Some(&notes), dir.path().join("x.orb")).is_err());
    }
}
