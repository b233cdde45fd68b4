//! One open document and everything that hangs off it: the tree view, the
//! open panes and the Python console.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc;
use std::sync;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::engine::{Move, SharedEngine};
use crate::io::{NativeHandler, PacketHandler};
use crate::model::packet::{Packet, PacketId, PacketKind, PacketRef, Script};
use crate::model::preferences::{Preferences, PreferencesStore};
use crate::python::console::PythonConsole;
use crate::python::EmbeddedPython;
use crate::view::error::{Action, Error, ErrorKind, Trouble};
use crate::view::interaction::{CloseChoice, Interaction, MessageKind};
use crate::view::operation::{triangulation, OpContext, Operation};
use crate::view::pane::{Pane, PaneContext};
use crate::view::queue::{UiQueue, UiTask};
use crate::view::tree::TreeView;

/* features already reported as unavailable in this process */
static REPORTED_FEATURES: Lazy<Mutex<HashSet<&'static str>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// A packet tree together with where it came from.
pub struct Document {
    root: PacketRef,
    path: Option<PathBuf>,
    /// The file held a single packet that is not a container, and the root
    /// was made up to hold it.
    synthetic_root: bool,
    dirty: bool,
}

impl Document {
    pub fn new() -> Document {
        Document { root: Packet::container(""), path: None, synthetic_root: false, dirty: false }
    }

    /// Adopts a tree read from `path`, wrapping it in a new root unless its
    /// top is a container.
    pub fn opened(top: PacketRef, path: PathBuf) -> Result<Document, crate::model::packet::PacketError> {
        if top.kind() == PacketKind::Container {
            return Ok(Document { root: top, path: Some(path), synthetic_root: false, dirty: false });
        }
        let root = Packet::container("");
        root.append(top)?;
        Ok(Document { root, path: Some(path), synthetic_root: true, dirty: false })
    }

    pub fn root(&self) -> &PacketRef {
        &self.root
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn has_synthetic_root(&self) -> bool {
        self.synthetic_root
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// A document nobody has touched yet, which a newly opened file may
    /// replace.
    pub fn is_pristine(&self) -> bool {
        self.path.is_none() && !self.dirty && !self.root.has_children()
    }

    /// What goes on disk: the lone top-level packet of a made-up root, or
    /// the whole tree.
    pub fn saved_tree(&self) -> PacketRef {
        if self.synthetic_root && self.root.count_children() == 1 {
            if let Some(only) = self.root.first_child() {
                return only;
            }
        }
        self.root.clone()
    }

    pub fn title(&self) -> String {
        match &self.path {
            Some(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string()),
            None => "Untitled".to_string(),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

pub struct DocumentWindow {
    engine: SharedEngine,
    prefs: sync::Arc<PreferencesStore>,
    runtime: tokio::runtime::Handle,
    interaction: rc::Rc<dyn Interaction>,

    document: Document,
    queue: UiQueue,
    tree: TreeView,
    panes: Vec<Pane>,
    console: Option<PythonConsole>,
    seen_prefs: sync::Arc<Preferences>,

    /// The empty window shown at startup, which the first opened file may
    /// take over.
    starter: bool,
}

impl DocumentWindow {
    pub fn new(engine: SharedEngine, prefs: sync::Arc<PreferencesStore>, runtime: tokio::runtime::Handle, interaction: rc::Rc<dyn Interaction>) -> DocumentWindow {
        let document = Document::new();
        let queue = UiQueue::new();
        let seen_prefs = prefs.get();
        let tree = TreeView::new(document.root(), queue.sender(), seen_prefs.display_tags_in_tree);
        DocumentWindow {
            engine,
            prefs,
            runtime,
            interaction,
            document,
            queue,
            tree,
            panes: Vec::new(),
            console: None,
            seen_prefs,
            starter: false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn tree(&self) -> &TreeView {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut TreeView {
        &mut self.tree
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn console(&self) -> Option<&PythonConsole> {
        self.console.as_ref()
    }

    pub fn console_mut(&mut self) -> Option<&mut PythonConsole> {
        self.console.as_mut()
    }

    pub fn is_starter(&self) -> bool {
        self.starter
    }

    pub fn set_starter(&mut self, starter: bool) {
        self.starter = starter;
    }

    pub fn title(&self) -> String {
        if self.document.is_dirty() {
            format!("{} [modified]", self.document.title())
        } else {
            self.document.title()
        }
    }

    fn replace_document(&mut self, document: Document) {
        self.close_panes();
        self.console = None;
        self.document = document;
        self.queue = UiQueue::new();
        self.tree = TreeView::new(self.document.root(), self.queue.sender(), self.seen_prefs.display_tags_in_tree);
        self.starter = false;
    }

    /* files */

    pub fn open_file(&mut self, path: &Path) -> bool {
        self.open_as(path, Action::OpenFile)
    }

    /// Opens one of the bundled example files.
    pub fn open_example(&mut self, path: &Path) -> bool {
        if !path.exists() {
            self.report_error(&Error::new(Action::OpenExample, Trouble::Missing {
                path: path.to_path_buf(),
                message: format!("The example file {} could not be found.", path.display()),
            }));
            return false;
        }
        self.open_as(path, Action::OpenExample)
    }

    fn open_as(&mut self, path: &Path, action: Action) -> bool {
        let top = match self.engine.open(path) {
            Ok(top) => top,
            Err(error) => {
                self.report_error(&Error::new(action, Trouble::Engine(error)));
                return false;
            },
        };
        let document = match Document::opened(top, path.to_path_buf()) {
            Ok(document) => document,
            Err(error) => {
                self.report_error(&Error::new(action, Trouble::Packet(error)));
                return false;
            },
        };

        tracing::info!(path = %path.display(), synthetic_root = document.has_synthetic_root(), "opened document");
        self.replace_document(document);
        if action == Action::OpenFile {
            self.prefs.add_recent_file(path);
        }
        true
    }

    /// Saves to the document's own file, asking for one if it has none.
    /// Returns false if nothing was written.
    pub fn save(&mut self) -> bool {
        match self.document.path.clone() {
            Some(path) => self.save_to(&path),
            None => self.save_as(),
        }
    }

    pub fn save_as(&mut self) -> bool {
        let Some(path) = self.interaction.choose_path("Save data file", NativeHandler.filter(), true) else {
            return false;
        };
        self.save_to(&path)
    }

    fn save_to(&mut self, path: &Path) -> bool {
        /* changes still queued would otherwise mark the saved document dirty */
        self.pump_queue();
        let tree = self.document.saved_tree();
        if let Err(error) = self.engine.save(&tree, path) {
            self.report_error(&Error::new(Action::SaveFile, Trouble::Engine(error)));
            return false;
        }

        tracing::info!(path = %path.display(), synthetic_root = self.document.has_synthetic_root(), "saved document");
        self.document.path = Some(path.to_path_buf());
        self.document.dirty = false;
        self.prefs.add_recent_file(path);
        true
    }

    /// Asks every pane, then the user if there are unsaved changes. Returns
    /// true if the window may go away; on false nothing has changed.
    pub fn close(&mut self) -> bool {
        if !self.panes.iter().all(Pane::close_query) {
            return false;
        }
        if self.document.is_dirty() {
            match self.interaction.ask_close(&self.document.title()) {
                CloseChoice::Save => {
                    if !self.save() {
                        return false;
                    }
                },
                CloseChoice::Discard => {},
                CloseChoice::Cancel => return false,
            }
        }
        self.close_panes();
        tracing::info!(document = %self.document.title(), "closing window");
        true
    }

    /* operations */

    /// Runs an operation on the current selection and shows whatever it has
    /// to say. Returns true if it completed, even if it changed nothing.
    pub fn perform(&mut self, operation: Operation) -> bool {
        self.pump_queue();
        let selected = self.tree.selected();
        let result = {
            let cx = OpContext {
                engine: &self.engine,
                prefs: &self.prefs,
                interaction: &*self.interaction,
                runtime: self.runtime.clone(),
                root: self.document.root(),
            };
            operation.execute(&cx, selected.as_ref())
        };

        match result {
            Ok(done) => {
                for notice in &done.notices {
                    self.interaction.message(notice.kind, &notice.text, notice.detail.as_deref());
                }
                if done.modified {
                    self.document.dirty = true;
                }
                self.pump_queue();
                if let Some(packet) = done.select {
                    self.select(&packet);
                    self.open_pane(&packet);
                }
                true
            },
            Err(error) => {
                self.report_error(&error);
                false
            },
        }
    }

    /// Whether an operation would run on the current selection, for menus
    /// that grey themselves out.
    pub fn can_perform(&self, operation: Operation) -> Result<(), Error> {
        let cx = OpContext {
            engine: &self.engine,
            prefs: &self.prefs,
            interaction: &*self.interaction,
            runtime: self.runtime.clone(),
            root: self.document.root(),
        };
        operation.precheck(&cx, self.tree.selected().as_ref())
    }

    /// The elementary moves that are legal on the selected triangulation,
    /// each with the faces it can be performed about.
    pub fn move_candidates(&self) -> Vec<(Move, Vec<usize>)> {
        let Some(packet) = self.tree.selected() else { return Vec::new() };
        let cx = OpContext {
            engine: &self.engine,
            prefs: &self.prefs,
            interaction: &*self.interaction,
            runtime: self.runtime.clone(),
            root: self.document.root(),
        };
        triangulation::move_candidates(&cx, &packet)
    }

    pub fn report_error(&self, error: &Error) {
        let kind = match error.kind() {
            ErrorKind::Validation => MessageKind::NotValid,
            ErrorKind::Refused => MessageKind::Information,
            ErrorKind::Engine => MessageKind::Sorry,
            ErrorKind::Io => MessageKind::Warning,
            ErrorKind::FeatureUnavailable => {
                if let Trouble::FeatureUnavailable { feature, .. } = &error.trouble {
                    if !REPORTED_FEATURES.lock().insert(*feature) {
                        tracing::debug!(feature = *feature, "feature unavailability already reported");
                        return;
                    }
                }
                MessageKind::Information
            },
            ErrorKind::Fatal => {
                tracing::error!(message = %error.message(), detail = %error.detail(), "packet tree invariant violated");
                MessageKind::Error
            },
        };
        let detail = error.detail();
        self.interaction.message(kind, &error.message(), (!detail.is_empty()).then_some(detail.as_str()));
    }

    /* ui thread */

    /// Applies everything packet listeners have posted since the last call.
    /// Returns true if anything changed.
    pub fn pump_queue(&mut self) -> bool {
        let current = self.prefs.get();
        if !sync::Arc::ptr_eq(&current, &self.seen_prefs) {
            self.preferences_changed(current);
        }

        let tasks = self.queue.drain();
        if tasks.is_empty() {
            return false;
        }

        let selected_before = self.tree.selected_id();
        self.tree.handle(&tasks);

        let cx_prefs = self.seen_prefs.clone();
        let cx = PaneContext { engine: self.engine.as_ref(), prefs: &cx_prefs };
        for task in &tasks {
            match *task {
                UiTask::Changed(id) => {
                    self.document.dirty = true;
                    if let Some(pane) = self.panes.iter_mut().find(|p| p.id() == id) {
                        pane.refresh(&cx);
                    }
                },
                UiTask::Relabel(id) => {
                    self.document.dirty = true;
                    if let Some(pane) = self.panes.iter_mut().find(|p| p.id() == id) {
                        pane.relabel();
                    }
                },
                UiTask::RefreshDescendants(_) => self.document.dirty = true,
                UiTask::Destroyed(id) => self.panes.retain(|p| p.id() != id),
            }
        }

        /* panes of packets that left the tree go with them */
        let root = self.document.root().clone();
        self.panes.retain(|p| p.packet().is_some_and(|packet| root.find_id(packet.id()).is_some()));

        if self.tree.selected_id() != selected_before {
            self.selection_changed();
        }
        true
    }

    fn preferences_changed(&mut self, prefs: sync::Arc<Preferences>) {
        tracing::debug!("applying new preferences");
        self.tree.set_display_tags(prefs.display_tags_in_tree);
        if let Some(console) = self.console.as_mut() {
            console.update_preferences(&prefs);
        }
        let cx = PaneContext { engine: self.engine.as_ref(), prefs: &prefs };
        for pane in self.panes.iter_mut() {
            pane.refresh(&cx);
        }
        self.seen_prefs = prefs;
    }

    pub fn select(&mut self, packet: &Packet) {
        let before = self.tree.selected_id();
        self.tree.select(packet);
        if self.tree.selected_id() != before {
            self.selection_changed();
        }
    }

    fn selection_changed(&mut self) {
        let selected = self.tree.selected();
        if let Some(console) = self.console.as_mut() {
            console.selection_changed(selected.as_ref());
        }
    }

    /* panes */

    /// Opens a pane on `packet`, or finds the one already open. Returns its
    /// index in [DocumentWindow::panes].
    pub fn open_pane(&mut self, packet: &PacketRef) -> usize {
        if let Some(index) = self.panes.iter().position(|p| p.id() == packet.id()) {
            return index;
        }
        let cx = PaneContext { engine: self.engine.as_ref(), prefs: &self.seen_prefs };
        let pane = Pane::new(packet, &cx);
        if let Some(error) = pane.unavailable() {
            self.report_error(&error);
        }
        self.panes.push(pane);
        self.panes.len() - 1
    }

    pub fn pane_mut(&mut self, id: PacketId) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|p| p.id() == id)
    }

    /// Closes the pane on `id`, remembering its tab for next time.
    pub fn close_pane(&mut self, id: PacketId) -> bool {
        let Some(index) = self.panes.iter().position(|p| p.id() == id) else { return false };
        if !self.panes[index].close_query() {
            return false;
        }
        let pane = self.panes.remove(index);
        self.remember_tab(&pane);
        true
    }

    fn close_panes(&mut self) {
        for pane in std::mem::take(&mut self.panes) {
            self.remember_tab(&pane);
        }
    }

    fn remember_tab(&self, pane: &Pane) {
        if let Some(change) = pane.remembered_tab() {
            if let Err(error) = self.prefs.change(change) {
                tracing::warn!(%error, "could not remember pane tab");
            }
        }
    }

    /* python */

    /// Opens the Python console, bound to this document's root and the
    /// current selection.
    pub fn open_console(&mut self) -> &mut PythonConsole {
        let selected = self.tree.selected();
        let root = self.document.root().clone();
        let prefs = self.seen_prefs.clone();
        self.console.get_or_insert_with(|| {
            PythonConsole::new(Box::new(EmbeddedPython::new()), Some(&root), selected.as_ref(), true, &prefs)
        })
    }

    pub fn close_console(&mut self) {
        self.console = None;
    }

    /// Runs a script packet in the console, with its variables bound.
    pub fn run_script(&mut self, packet: &PacketRef) -> bool {
        let Some(script) = packet.read::<Script, _>(Clone::clone) else {
            self.report_error(&Error::refused(Action::RunScript, "Please select a script to run.", None));
            return false;
        };
        tracing::info!(script = %packet.human_label(), "running script");
        self.open_console().run_script(&script);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use crate::engine::basic::BasicEngine;
    use crate::engine::Engine;
    use crate::model::packet::Payload;
    use crate::model::triangulation::Triangulation;

    #[derive(Default)]
    struct Recorder {
        messages: RefCell<Vec<(MessageKind, String)>>,
        close: RefCell<Vec<CloseChoice>>,
        save_path: RefCell<Option<PathBuf>>,
    }

    impl Interaction for Recorder {
        fn message(&self, kind: MessageKind, text: &str, _: Option<&str>) {
            self.messages.borrow_mut().push((kind, text.to_string()));
        }
        fn confirm(&self, _: &str, _: Option<&str>) -> bool { false }
        fn ask_close(&self, _: &str) -> CloseChoice { self.close.borrow_mut().pop().unwrap_or(CloseChoice::Cancel) }
        fn ask_text(&self, _: &str, _: &str) -> Option<String> { None }
        fn choose_packet(&self, _: &str, _: &[PacketRef]) -> Option<PacketRef> { None }
        fn choose_path(&self, _: &str, _: &str, _: bool) -> Option<PathBuf> { self.save_path.borrow().clone() }
        fn progress(&self, _: &str, _: Option<f64>) -> bool { true }
    }

    fn window(rt: &tokio::runtime::Runtime, recorder: &rc::Rc<Recorder>) -> DocumentWindow {
        let interaction: rc::Rc<dyn Interaction> = recorder.clone();
        DocumentWindow::new(sync::Arc::new(BasicEngine), sync::Arc::new(PreferencesStore::new()), rt.handle().clone(), interaction)
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap()
    }

    #[test]
    fn single_packet_files_keep_their_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.rga");
        BasicEngine.save(&Packet::new("T", Payload::Triangulation(Triangulation::new(3))), &path).unwrap();

        let rt = runtime();
        let recorder = rc::Rc::new(Recorder::default());
        let mut w = window(&rt, &recorder);
        assert!(w.open_file(&path));
        assert!(w.document().has_synthetic_root());
        assert_eq!(w.tree().shape(), "T");

        let copy = dir.path().join("copy.rga");
        *recorder.save_path.borrow_mut() = Some(copy.clone());
        assert!(w.save_as());
        let reread = BasicEngine.open(&copy).unwrap();
        assert_eq!(reread.kind(), PacketKind::Triangulation3);
        assert_eq!(reread.label(), "T");
    }

    #[test]
    fn saving_takes_in_pending_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.rga");
        let rt = runtime();
        let recorder = rc::Rc::new(Recorder::default());
        let mut w = window(&rt, &recorder);
        *recorder.save_path.borrow_mut() = Some(path.clone());

        /* no pump between the edit and the save */
        w.document().root().append(Packet::container("Late")).unwrap();
        assert!(w.save());
        assert_eq!(w.tree().shape(), "Late");
        assert!(!w.pump_queue());
        assert!(!w.document().is_dirty());
        assert_eq!(BasicEngine.open(&path).unwrap().child(0).map(|p| p.label()), Some("Late".to_string()));
    }

    #[test]
    fn cancelled_close_changes_nothing() {
        let rt = runtime();
        let recorder = rc::Rc::new(Recorder::default());
        let mut w = window(&rt, &recorder);
        w.document().root().append(Packet::container("A")).unwrap();
        w.pump_queue();
        assert!(w.document().is_dirty());

        recorder.close.borrow_mut().push(CloseChoice::Cancel);
        assert!(!w.close());
        assert!(w.document().is_dirty());
        assert_eq!(w.tree().shape(), "A");

        recorder.close.borrow_mut().push(CloseChoice::Discard);
        assert!(w.close());
    }

    #[test]
    fn missing_files_are_reported_with_their_path() {
        let rt = runtime();
        let recorder = rc::Rc::new(Recorder::default());
        let mut w = window(&rt, &recorder);

        assert!(!w.open_example(Path::new("/nonexistent/sample.rga")));
        assert!(!w.open_file(Path::new("/nonexistent/other.rga")));
        let messages = recorder.messages.borrow();
        assert_eq!(messages[0], (MessageKind::Warning, "The example file /nonexistent/sample.rga could not be found.".to_string()));
        assert_eq!(messages[1], (MessageKind::Warning, "I could not open the selected file.".to_string()));
        assert!(w.document().is_pristine());
    }

    #[test]
    fn unavailable_features_are_reported_once() {
        let rt = runtime();
        let recorder = rc::Rc::new(Recorder::default());
        let w = window(&rt, &recorder);
        let error = || Error::new(Action::RenderGraph, Trouble::FeatureUnavailable { feature: "window test feature", detail: "Missing.".into() });
        w.report_error(&error());
        w.report_error(&error());
        assert_eq!(recorder.messages.borrow().len(), 1);
    }

    #[test]
    fn panes_follow_their_packets() {
        let rt = runtime();
        let recorder = rc::Rc::new(Recorder::default());
        let mut w = window(&rt, &recorder);
        let text = Packet::new("Notes", Payload::Text("hi".into()));
        w.document().root().append(text.clone()).unwrap();
        w.pump_queue();

        assert_eq!(w.open_pane(&text), 0);
        assert_eq!(w.open_pane(&text), 0);
        text.set_label("Renamed");
        w.pump_queue();
        assert!(w.panes()[0].title().starts_with("Renamed"));

        text.make_orphan();
        drop(text);
        w.pump_queue();
        assert!(w.panes().is_empty());
    }
}
