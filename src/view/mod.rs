pub mod error;
pub mod interaction;
pub mod operation;
pub mod pane;
pub mod queue;
pub mod runner;
pub mod tree;
pub mod window;

use std::path::Path;
use std::rc;
use std::sync;

use crate::engine::SharedEngine;
use crate::model::preferences::PreferencesStore;

use interaction::Interaction;

/// Every open window, plus the runtime their slow operations run on.
pub struct Application {
    engine: SharedEngine,
    prefs: sync::Arc<PreferencesStore>,
    rt: tokio::runtime::Runtime,
    interaction: rc::Rc<dyn Interaction>,

    windows: Vec<window::DocumentWindow>,
}

impl Application {
    pub fn new(engine: SharedEngine, prefs: sync::Arc<PreferencesStore>, interaction: rc::Rc<dyn Interaction>) -> std::io::Result<Application> {
        Ok(Application {
            engine,
            prefs,
            rt: tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?,
            interaction,
            windows: Vec::new(),
        })
    }

    /// Opens the empty starter window shown at launch.
    pub fn start(&mut self) -> usize {
        let index = self.new_window();
        self.windows[index].set_starter(true);
        index
    }

    pub fn new_window(&mut self) -> usize {
        self.windows.push(window::DocumentWindow::new(
            self.engine.clone(),
            self.prefs.clone(),
            self.rt.handle().clone(),
            self.interaction.clone()));
        self.windows.len() - 1
    }

    pub fn windows(&self) -> &[window::DocumentWindow] {
        &self.windows
    }

    pub fn window_mut(&mut self, index: usize) -> Option<&mut window::DocumentWindow> {
        self.windows.get_mut(index)
    }

    pub fn preferences(&self) -> &sync::Arc<PreferencesStore> {
        &self.prefs
    }

    /* the starter window is only reused while nothing has happened to it */
    fn starter_window(&mut self) -> Option<usize> {
        self.windows.iter_mut().position(|w| {
            w.pump_queue();
            w.is_starter() && w.document().is_pristine()
        })
    }

    fn open_with(&mut self, open: impl FnOnce(&mut window::DocumentWindow) -> bool) -> Option<usize> {
        if let Some(index) = self.starter_window() {
            let opened = open(&mut self.windows[index]);
            return opened.then_some(index);
        }

        let index = self.new_window();
        if open(&mut self.windows[index]) {
            Some(index)
        } else {
            self.windows.pop();
            None
        }
    }

    /// Opens a data file, in the starter window if it is still untouched or
    /// else in a window of its own.
    pub fn open_path(&mut self, path: &Path) -> Option<usize> {
        self.open_with(|w| w.open_file(path))
    }

    pub fn open_example(&mut self, path: &Path) -> Option<usize> {
        self.open_with(|w| w.open_example(path))
    }

    /// Opens every local file among text dropped onto a window.
    pub fn open_urls<'a>(&mut self, urls: impl IntoIterator<Item = &'a str>) -> Vec<usize> {
        tree::dropped_files(urls)
            .iter()
            .filter_map(|path| self.open_path(path))
            .collect()
    }

    /// Returns false if the window refused to close.
    pub fn close_window(&mut self, index: usize) -> bool {
        match self.windows.get_mut(index).map(|w| w.close()) {
            Some(true) => {
                self.windows.remove(index);
                true
            },
            _ => false,
        }
    }

    /// Closes every window, newest first, then writes the preferences back.
    /// Stops at the first window that refuses.
    pub fn quit(&mut self) -> bool {
        while let Some(index) = self.windows.len().checked_sub(1) {
            if !self.close_window(index) {
                return false;
            }
        }
        if let Err(e) = self.prefs.save() {
            tracing::warn!(error = %e, "could not save preferences");
        }
        true
    }
}
