//! Shared fixtures for the cross-module tests: a scripted stand-in for the
//! user and an engine wrapper that records what it was asked to do.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc;
use std::sync;

use parking_lot::Mutex;

use regina_ui::engine::basic::BasicEngine;
use regina_ui::engine::{Engine, EngineError, SharedEngine};
use regina_ui::model::link::Link;
use regina_ui::model::packet::{Packet, PacketRef};
use regina_ui::model::polynomial::{Invariant, Polynomial};
use regina_ui::model::preferences::PreferencesStore;
use regina_ui::model::progress::ProgressTracker;
use regina_ui::model::triangulation::{Skeleton, Triangulation};
use regina_ui::view::interaction::{CloseChoice, Interaction, MessageKind};
use regina_ui::view::tree::display_label;
use regina_ui::view::window::DocumentWindow;
use regina_ui::view::Application;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shown {
    pub kind: MessageKind,
    pub text: String,
    pub detail: Option<String>,
}

/// Plays the user. Every message box is recorded; every question is
/// answered from a queue, falling back to the cautious answer once the
/// queue runs dry.
#[derive(Default)]
pub struct Script {
    pub shown: RefCell<Vec<Shown>>,
    pub confirms: RefCell<VecDeque<bool>>,
    pub closes: RefCell<VecDeque<CloseChoice>>,
    pub texts: RefCell<VecDeque<String>>,
    pub paths: RefCell<VecDeque<PathBuf>>,
    /// Index into the offered candidates.
    pub packets: RefCell<VecDeque<usize>>,
    pub progress: RefCell<Vec<String>>,
}

impl Script {
    pub fn new() -> rc::Rc<Script> {
        rc::Rc::new(Script::default())
    }

    pub fn texts_shown(&self) -> Vec<String> {
        self.shown.borrow().iter().map(|s| s.text.clone()).collect()
    }

    pub fn answer_close(&self, choice: CloseChoice) {
        self.closes.borrow_mut().push_back(choice);
    }

    pub fn answer_path(&self, path: &Path) {
        self.paths.borrow_mut().push_back(path.to_path_buf());
    }

    pub fn answer_text(&self, text: &str) {
        self.texts.borrow_mut().push_back(text.to_string());
    }
}

impl Interaction for Script {
    fn message(&self, kind: MessageKind, text: &str, detail: Option<&str>) {
        self.shown.borrow_mut().push(Shown { kind, text: text.to_string(), detail: detail.map(str::to_string) });
    }

    fn confirm(&self, _text: &str, _detail: Option<&str>) -> bool {
        self.confirms.borrow_mut().pop_front().unwrap_or(false)
    }

    fn ask_close(&self, _document: &str) -> CloseChoice {
        self.closes.borrow_mut().pop_front().unwrap_or(CloseChoice::Cancel)
    }

    fn ask_text(&self, _prompt: &str, _initial: &str) -> Option<String> {
        self.texts.borrow_mut().pop_front()
    }

    fn choose_packet(&self, _prompt: &str, candidates: &[PacketRef]) -> Option<PacketRef> {
        let index = self.packets.borrow_mut().pop_front()?;
        candidates.get(index).cloned()
    }

    fn choose_path(&self, _title: &str, _filter: &str, _save: bool) -> Option<PathBuf> {
        self.paths.borrow_mut().pop_front()
    }

    fn progress(&self, description: &str, _fraction: Option<f64>) -> bool {
        let mut progress = self.progress.borrow_mut();
        if progress.last().map(String::as_str) != Some(description) {
            progress.push(description.to_string());
        }
        true
    }
}

/// The bundled engine, with a log of the thread counts it was handed and
/// the option of pretending to transform triangulations it cannot.
#[derive(Default)]
pub struct Recording {
    inner: BasicEngine,
    pub threads: Mutex<Vec<usize>>,
    pub calls: Mutex<Vec<&'static str>>,
    /// When set, ideal_to_finite claims success without touching anything.
    pub fake_truncation: bool,
}

impl Recording {
    pub fn shared() -> sync::Arc<Recording> {
        sync::Arc::new(Recording::default())
    }

    pub fn truncating() -> sync::Arc<Recording> {
        sync::Arc::new(Recording { fake_truncation: true, ..Recording::default() })
    }

    fn called(&self, name: &'static str) {
        self.calls.lock().push(name);
    }
}

impl Engine for Recording {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn open(&self, path: &Path) -> Result<PacketRef, EngineError> {
        self.called("open");
        self.inner.open(path)
    }

    fn save(&self, packet: &PacketRef, path: &Path) -> Result<(), EngineError> {
        self.called("save");
        self.inner.save(packet, path)
    }

    fn skeleton(&self, tri: &Triangulation) -> Result<Skeleton, EngineError> {
        self.inner.skeleton(tri)
    }

    fn orient(&self, tri: &mut Triangulation) -> Result<(), EngineError> {
        self.called("orient");
        self.inner.orient(tri)
    }

    fn ideal_to_finite(&self, _tri: &mut Triangulation) -> Result<bool, EngineError> {
        self.called("ideal_to_finite");
        if self.fake_truncation {
            Ok(true)
        } else {
            Err(EngineError::Unsupported("truncating ideal vertices"))
        }
    }

    fn is_isomorphic(&self, a: &Triangulation, b: &Triangulation) -> Result<bool, EngineError> {
        self.inner.is_isomorphic(a, b)
    }

    fn polynomial(&self, link: &Link, invariant: Invariant, threads: usize, tracker: Option<&ProgressTracker>) -> Result<Polynomial, EngineError> {
        self.threads.lock().push(threads);
        self.inner.polynomial(link, invariant, threads, tracker)
    }

    fn knot_sig(&self, link: &Link) -> Result<String, EngineError> {
        self.inner.knot_sig(link)
    }

    fn link_from_code(&self, code: &str) -> Result<Link, EngineError> {
        self.inner.link_from_code(code)
    }
}

pub fn window(engine: SharedEngine, prefs: sync::Arc<PreferencesStore>, rt: &tokio::runtime::Runtime, script: &rc::Rc<Script>) -> DocumentWindow {
    let interaction: rc::Rc<dyn Interaction> = script.clone();
    DocumentWindow::new(engine, prefs, rt.handle().clone(), interaction)
}

pub fn application(engine: SharedEngine, prefs: sync::Arc<PreferencesStore>, script: &rc::Rc<Script>) -> Application {
    let interaction: rc::Rc<dyn Interaction> = script.clone();
    Application::new(engine, prefs, interaction).unwrap()
}

pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap()
}

/// The tree beneath `root` in the notation of `TreeView::shape`.
pub fn shape_of(root: &Packet) -> String {
    root.children()
        .iter()
        .map(|child| {
            let label = display_label(child);
            if child.has_children() {
                format!("{}{{{}}}", label, shape_of(child))
            } else {
                label
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// A closed 3-sphere: two tetrahedra glued along all four faces.
pub fn sphere() -> Triangulation {
    use regina_ui::model::perm::Perm;
    let gluings: Vec<_> = (0..4).map(|f| (0, f, 1, Perm::identity(4))).collect();
    Triangulation::from_gluings(3, 2, &gluings).unwrap()
}

pub fn trefoil() -> Link {
    Link::from_oriented_gauss("+>1 -<2 +>3 -<1 +>2 -<3").unwrap()
}

pub fn hopf() -> Link {
    Link::from_jenkins("2  2 0 1 1 -1  2 0 -1 1 1  0 1 1 1").unwrap()
}
