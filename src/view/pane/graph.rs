//! Graph tabs, drawn by Graphviz.
//!
//! The engine supplies dot source; the layout itself is done by running the
//! external `dot` program. When that program cannot be found the tab shows
//! an explanation instead of a picture. Layout happens the first time the
//! tab is rendered after a refresh, never on refresh itself.

use std::cell::OnceCell;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use crate::engine::EngineError;
use crate::view::error::{Action, Error, Trouble};

/// Larger triangulations and links are not drawn at all.
pub const MAX_GRAPH_SIZE: usize = 500;

pub const LAYOUT_PROGRAM: &str = "dot";

const HOMEPAGE: &str = "You can install Graphviz from www.graphviz.org.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    Graphviz(PathBuf),
    Missing(String),
}

impl Layout {
    /// Looks for `program` on the search path.
    pub fn locate(program: &str) -> Layout {
        match which::which(program) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "found graph layout program");
                Layout::Graphviz(path)
            },
            Err(error) => {
                tracing::debug!(program, %error, "graph layout program not found");
                Layout::Missing(program.to_string())
            },
        }
    }

    fn run(&self, dot: &str) -> Result<String, String> {
        let path = match self {
            Layout::Graphviz(path) => path,
            Layout::Missing(program) => return Err(missing_message(program)),
        };
        let name = path.display();

        let mut child = process::Command::new(path)
            .arg("-Tsvg")
            .stdin(process::Stdio::piped())
            .stdout(process::Stdio::piped())
            .stderr(process::Stdio::piped())
            .spawn()
            .map_err(|e| format!("However, I could not start the Graphviz executable \"{}\": {}.", name, e))?;

        /* stdin is closed before waiting, and the child is reaped even when the write fails */
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(dot.as_bytes()),
            None => Ok(()),
        };
        let output = child.wait_with_output()
            .map_err(|e| format!("The Graphviz executable \"{}\" did not finish: {}.", name, e))?;
        sent.map_err(|e| format!("I could not send the graph to the Graphviz executable \"{}\": {}.", name, e))?;
        if !output.status.success() {
            tracing::warn!(status = %output.status, stderr = %String::from_utf8_lossy(&output.stderr), "graph layout failed");
            return Err(format!("The Graphviz executable \"{}\" did not run successfully.", name));
        }
        String::from_utf8(output.stdout)
            .map_err(|_| format!("The Graphviz executable \"{}\" produced output I could not read.", name))
    }
}

fn missing_message(program: &str) -> String {
    format!("Regina uses Graphviz to display graphs. \
             However, I could not find the Graphviz executable \"{}\" on the default search path.\n{}", program, HOMEPAGE)
}

enum Content {
    /// Nothing to draw, for the given reason.
    Info(String),
    Source(String),
}

pub struct GraphTab {
    layout: Layout,
    content: Content,
    drawn: OnceCell<Result<String, String>>,
}

impl GraphTab {
    pub fn new(layout: Layout) -> GraphTab {
        GraphTab {
            layout,
            content: Content::Info(String::new()),
            drawn: OnceCell::new(),
        }
    }

    /// Replaces the graph. `size` counts simplices or crossings, whichever
    /// the graph is built from; `noun` names them.
    pub fn show(&mut self, subject: &str, size: usize, noun: &str, source: impl FnOnce() -> Result<String, EngineError>) {
        self.drawn = OnceCell::new();
        self.content = if size == 0 {
            Content::Info(format!("This {} is empty.", subject))
        } else if size > MAX_GRAPH_SIZE {
            Content::Info(format!("This {} contains over {} {}.\nRegina does not display graphs for such large {}s.", subject, MAX_GRAPH_SIZE, noun, subject))
        } else {
            match source() {
                Ok(dot) => Content::Source(dot),
                Err(error) => Content::Info(format!("I could not build this graph: {}.", error)),
            }
        };
    }

    pub fn source(&self) -> Option<&str> {
        match &self.content {
            Content::Source(dot) => Some(dot),
            Content::Info(_) => None,
        }
    }

    /// The SVG picture, laid out on first request.
    pub fn svg(&self) -> Option<&str> {
        match &self.content {
            Content::Source(dot) => self.drawn.get_or_init(|| self.layout.run(dot)).as_deref().ok(),
            Content::Info(_) => None,
        }
    }

    /// Text shown in place of the picture, if any.
    pub fn message(&self) -> Option<String> {
        match &self.content {
            Content::Info(info) => Some(info.clone()),
            Content::Source(dot) => self.drawn.get_or_init(|| self.layout.run(dot)).as_ref().err().cloned(),
        }
    }

    /// Reported once per process by the window, the first time a graph
    /// cannot be drawn for want of Graphviz.
    pub fn unavailable(&self) -> Option<Error> {
        match (&self.layout, &self.content) {
            (Layout::Missing(program), Content::Source(_)) => Some(Error::new(Action::RenderGraph, Trouble::FeatureUnavailable {
                feature: "Graphviz",
                detail: missing_message(program),
            })),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match (self.message(), self.svg()) {
            (Some(message), _) => message,
            (None, Some(svg)) => svg.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::view::error::ErrorKind;

    #[test]
    fn missing_programs_leave_a_message() {
        let mut tab = GraphTab::new(Layout::locate("regina-no-such-layout-program"));
        assert_matches::assert_matches!(tab.layout, Layout::Missing(_));

        tab.show("triangulation", 2, "tetrahedra", || Ok("graph G { 0 -- 1; }".to_string()));
        assert_eq!(tab.source(), Some("graph G { 0 -- 1; }"));
        assert!(tab.svg().is_none());
        assert!(tab.render().contains("could not find the Graphviz executable \"regina-no-such-layout-program\""));
        assert_eq!(tab.unavailable().map(|e| e.kind()), Some(ErrorKind::FeatureUnavailable));
    }

    #[test]
    fn large_and_empty_graphs_are_not_drawn() {
        let mut tab = GraphTab::new(Layout::Missing("dot".into()));
        tab.show("link", 501, "crossings", || panic!("source should not be built"));
        assert_eq!(tab.render(), "This link contains over 500 crossings.\nRegina does not display graphs for such large links.");
        assert!(tab.unavailable().is_none());

        tab.show("triangulation", 0, "tetrahedra", || panic!("source should not be built"));
        assert_eq!(tab.render(), "This triangulation is empty.");
    }

    #[test]
    fn programs_that_stop_reading_are_reported() {
        let Ok(path) = which::which("true") else { return };
        let layout = Layout::Graphviz(path);
        /* more than a pipe buffer, so the write cannot complete */
        let dot = format!("graph G {{ {} }}", "0 -- 1; ".repeat(1 << 17));
        let result = layout.run(&dot);
        assert!(result.unwrap_err().starts_with("I could not send the graph"));
    }

    #[test]
    fn engine_failures_are_shown_in_place() {
        let mut tab = GraphTab::new(Layout::Missing("dot".into()));
        tab.show("link", 3, "crossings", || Err(EngineError::Unsupported("tree decompositions")));
        assert!(tab.render().starts_with("I could not build this graph"));
    }
}
