//! The interactive console that sits on top of an [Interpreter].
//!
//! The console owns the session transcript and the prompt state. It knows
//! nothing about widgets: a front-end shows [PythonConsole::prompt], feeds
//! each typed line to [PythonConsole::execute_line] and renders
//! [PythonConsole::log] (or its HTML form) however it likes.

use std::path::Path;

use crate::model::packet::{PacketRef, Script};
use crate::model::preferences::Preferences;
use crate::python::{Execution, Interpreter, Output, Value, ENGINE_MODULE};

pub const PRIMARY_PROMPT: &str = ">>> ";
pub const SECONDARY_PROMPT: &str = "... ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Input,
    Output,
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    pub kind: LineKind,
    pub text: String,
}

impl LogLine {
    /// The line as the session view shows it, with markup-unsafe characters
    /// escaped.
    pub fn html(&self) -> String {
        let text = encode(&self.text);
        match self.kind {
            LineKind::Input => format!("<b>{}</b><br>", text),
            LineKind::Output => format!("{}<br>", text),
            LineKind::Info => format!("<font color=\"dark goldenrod\">{}</font><br>", text),
            LineKind::Error => format!("<font color=\"dark red\">{}</font><br>", text),
        }
    }
}

/// Escapes text for the HTML session view. Spaces become non-breaking so
/// that indentation survives.
pub fn encode(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('>', "&gt;")
        .replace('<', "&lt;")
        .replace(' ', "&nbsp;")
}

/// The leading whitespace of `line`, or nothing if the line is blank.
fn initial_indent(line: &str) -> &str {
    let rest = line.trim_start();
    if rest.is_empty() {
        ""
    } else {
        &line[..line.len() - rest.len()]
    }
}

/// The longest run at the end of `text` that looks like a dotted name: it
/// starts with a letter or underscore and continues with letters, digits,
/// underscores and dots.
fn trailing_word(text: &str) -> Option<&str> {
    let run_start = text.char_indices().rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '.')
        .last()
        .map(|(i, _)| i)?;
    let (offset, _) = text[run_start..].char_indices().find(|(_, c)| c.is_alphabetic() || *c == '_')?;
    Some(&text[run_start + offset..])
}

fn common_prefix<'a>(candidates: &'a [String]) -> &'a str {
    let Some(first) = candidates.first() else { return "" };
    let mut end = first.len();
    for other in &candidates[1..] {
        end = first.char_indices()
            .zip(other.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, a), _)| i + a.len_utf8())
            .unwrap_or(0)
            .min(end);
    }
    &first[..end]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// There is no name before the cursor.
    Nothing,
    /// The name before the cursor completes to nothing.
    NoMatch,
    /// Insert `insert` at the cursor. If more than one candidate remains the
    /// front-end should offer them in a popup.
    Extend { insert: String, candidates: Vec<String> },
}

pub struct PythonConsole {
    interpreter: Box<dyn Interpreter>,
    log: imbl::Vector<LogLine>,
    continuing: bool,
    rebind_item: bool,
    engine_loaded: bool,
    auto_indent: bool,
    spaces_per_tab: u32,
}

impl PythonConsole {
    /// Starts a session. The engine module is imported first; if that fails
    /// the session carries on without it. `root` and `item` are bound
    /// weakly. If `rebind_item` is set, later calls to
    /// [PythonConsole::selection_changed] move `item` along with the
    /// selection.
    pub fn new(interpreter: Box<dyn Interpreter>, root: Option<&PacketRef>, item: Option<&PacketRef>, rebind_item: bool, prefs: &Preferences) -> PythonConsole {
        let mut console = PythonConsole {
            interpreter,
            log: imbl::Vector::new(),
            continuing: false,
            rebind_item,
            engine_loaded: false,
            auto_indent: prefs.python_auto_indent,
            spaces_per_tab: prefs.python_spaces_per_tab,
        };

        match console.interpreter.import_engine() {
            Ok(()) => console.engine_loaded = true,
            Err(error) => {
                tracing::error!(module = ENGINE_MODULE, %error, "could not import the engine module");
                console.add_error(format!("Unable to load module \"{}\".", ENGINE_MODULE));
            },
        }

        if let Some(root) = root {
            console.set_root(root);
        }
        console.set_item(item);
        console
    }

    pub fn engine_loaded(&self) -> bool {
        self.engine_loaded
    }

    pub fn log(&self) -> &imbl::Vector<LogLine> {
        &self.log
    }

    pub fn prompt(&self) -> &'static str {
        if self.continuing { SECONDARY_PROMPT } else { PRIMARY_PROMPT }
    }

    /// What the tab key inserts when there is nothing to complete.
    pub fn tab_text(&self) -> String {
        " ".repeat(self.spaces_per_tab as usize)
    }

    /// Picks up the Python settings again after the preferences changed.
    pub fn update_preferences(&mut self, prefs: &Preferences) {
        self.auto_indent = prefs.python_auto_indent;
        self.spaces_per_tab = prefs.python_spaces_per_tab;
    }

    fn push(&mut self, kind: LineKind, text: impl Into<String>) {
        self.log.push_back(LogLine { kind, text: text.into() });
    }

    pub fn add_info(&mut self, text: impl Into<String>) {
        self.push(LineKind::Info, text);
    }

    pub fn add_error(&mut self, text: impl Into<String>) {
        self.push(LineKind::Error, text);
    }

    fn add_output(&mut self, output: Output) {
        for (kind, stream) in [(LineKind::Output, output.stdout), (LineKind::Error, output.stderr)] {
            if stream.is_empty() {
                continue;
            }
            let stream = stream.strip_suffix('\n').unwrap_or(&stream);
            for line in stream.split('\n') {
                self.push(kind, line);
            }
        }
    }

    fn set_root(&mut self, root: &PacketRef) {
        match self.interpreter.set_variable("root", Value::packet(root)) {
            Ok(()) => self.add_info("The (invisible) root of the packet tree is in the variable [root]."),
            Err(error) => {
                tracing::error!(%error, "could not bind the root packet");
                self.add_error("The variable \"root\" has not been set.");
            },
        }
    }

    fn set_item(&mut self, item: Option<&PacketRef>) {
        let value = item.map(Value::packet).unwrap_or(Value::None);
        match self.interpreter.set_variable("item", value.clone()) {
            Ok(()) => {
                if let Some(item) = item {
                    self.add_info(format!("The selected packet ({}) is in the variable [item].", item.human_label()));
                }
                /* older scripts know the selection as "selected" */
                let _ = self.interpreter.set_variable("selected", value);
            },
            Err(error) => {
                tracing::error!(%error, "could not bind the selected packet");
                self.add_error("The variable \"item\" has not been set.");
            },
        }
    }

    /// Binds an arbitrary packet (or None) to a variable.
    pub fn set_variable(&mut self, name: &str, value: Option<&PacketRef>) {
        let bound = self.interpreter.set_variable(name, value.map(Value::packet).unwrap_or(Value::None));
        if bound.is_err() {
            let target = value.map(|p| p.human_label()).unwrap_or_else(|| "None".to_string());
            self.add_error(format!("Could not set variable {} to {}.", name, target));
        }
    }

    /// Rebinds `item` if this session follows the selection.
    pub fn selection_changed(&mut self, item: Option<&PacketRef>) {
        if self.rebind_item {
            self.set_item(item);
        }
    }

    /// Runs one line typed at the prompt and returns the text the input
    /// field should be pre-filled with for the next line.
    pub fn execute_line(&mut self, line: &str) -> String {
        self.push(LineKind::Input, format!("{}{}", self.prompt(), line));
        match self.interpreter.push_line(line) {
            Execution::Complete(output) => {
                self.continuing = false;
                self.add_output(output);
                String::new()
            },
            Execution::Incomplete => {
                self.continuing = true;
                if !self.auto_indent {
                    return String::new();
                }
                let mut indent = initial_indent(line).to_string();
                if line.trim_end().ends_with(':') {
                    indent.push_str(&self.tab_text());
                }
                indent
            },
        }
    }

    /// Runs a script packet's code with its variable table bound first.
    /// Variables whose target has gone away are bound to None.
    pub fn run_script(&mut self, script: &Script) {
        for variable in script.variables() {
            self.set_variable(&variable.name, variable.resolve().as_ref());
        }
        let output = self.interpreter.run(&script.text);
        self.add_output(output);
    }

    /// Completes the name that ends at the cursor. `before_cursor` is the
    /// input text up to the cursor.
    pub fn complete(&self, before_cursor: &str) -> Completion {
        let Some(word) = trailing_word(before_cursor) else { return Completion::Nothing };

        let mut candidates: Vec<String> = self.interpreter.completions(word)
            .into_iter()
            .filter(|c| !c.contains("__"))
            .collect();
        candidates.sort();
        candidates.dedup();
        if candidates.is_empty() {
            return Completion::NoMatch;
        }

        let prefix = common_prefix(&candidates);
        let Some(insert) = prefix.strip_prefix(word) else {
            tracing::error!(word, prefix, "completion does not extend the word being completed");
            return Completion::Nothing;
        };
        let insert = insert.to_string();
        if candidates.len() == 1 {
            candidates.clear();
        }
        Completion::Extend { insert, candidates }
    }

    pub fn log_html(&self) -> String {
        self.log.iter().map(LogLine::html).collect()
    }

    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for line in self.log.iter() {
            text.push_str(&line.text);
            text.push('\n');
        }
        text
    }

    /// Writes the session transcript as plain UTF-8 text.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub fn save_log(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.plain_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use crate::model::packet::{Packet, Payload};
    use crate::python::EmbeddedPython;

    /// A session whose engine module cannot be imported.
    struct NoEngine(EmbeddedPython);

    impl Interpreter for NoEngine {
        fn import_engine(&mut self) -> Result<(), String> {
            Err("No module named 'regina'".into())
        }

        fn set_variable(&mut self, name: &str, value: Value) -> Result<(), String> {
            self.0.set_variable(name, value)
        }

        fn push_line(&mut self, line: &str) -> Execution {
            self.0.push_line(line)
        }

        fn run(&mut self, code: &str) -> Output {
            self.0.run(code)
        }

        fn completions(&self, text: &str) -> Vec<String> {
            self.0.completions(text)
        }
    }

    fn tree() -> PacketRef {
        let root = Packet::container("");
        root.append(Packet::new("Knot", Payload::Text("3_1".into()))).unwrap();
        root.append(Packet::new("Notes", Payload::Text(String::new()))).unwrap();
        root
    }

    fn console(root: &PacketRef, item: Option<&PacketRef>, rebind: bool) -> PythonConsole {
        PythonConsole::new(Box::new(EmbeddedPython::new()), Some(root), item, rebind, &Preferences::default())
    }

    fn texts(console: &PythonConsole, kind: LineKind) -> Vec<String> {
        console.log().iter().filter(|l| l.kind == kind).map(|l| l.text.clone()).collect()
    }

    #[test]
    fn binds_root_and_item() {
        let root = tree();
        let knot = root.first_child().unwrap();
        let mut console = console(&root, Some(&knot), false);
        assert!(console.engine_loaded());
        assert_eq!(texts(&console, LineKind::Info), vec![
            "The (invisible) root of the packet tree is in the variable [root].".to_string(),
            "The selected packet (Knot) is in the variable [item].".to_string(),
        ]);

        console.execute_line("item.label()");
        console.execute_line("selected.label()");
        console.execute_line("root.countChildren()");
        assert_eq!(texts(&console, LineKind::Output), vec!["'Knot'", "'Knot'", "2"]);
    }

    #[test]
    fn item_follows_selection_only_when_asked() {
        let root = tree();
        let knot = root.first_child().unwrap();
        let notes = root.last_child().unwrap();

        let mut fixed = console(&root, Some(&knot), false);
        fixed.selection_changed(Some(&notes));
        fixed.execute_line("item.label()");
        assert_eq!(texts(&fixed, LineKind::Output), vec!["'Knot'"]);

        let mut following = console(&root, Some(&knot), true);
        following.selection_changed(Some(&notes));
        following.execute_line("item.label()");
        following.selection_changed(None);
        following.execute_line("print(item)");
        assert_eq!(texts(&following, LineKind::Output), vec!["'Notes'", "None"]);
    }

    #[test]
    fn the_session_does_not_keep_the_tree_alive() {
        let root = tree();
        let weak = std::sync::Arc::downgrade(&root);
        let mut console = console(&root, None, false);
        drop(root);
        assert!(weak.upgrade().is_none());
        console.execute_line("root.label()");
        let errors = texts(&console, LineKind::Error);
        assert_eq!(errors.last().map(String::as_str), Some("RuntimeError: the packet has been deleted"));
    }

    #[test]
    fn a_missing_engine_degrades_the_session() {
        let root = tree();
        let mut console = PythonConsole::new(Box::new(NoEngine(EmbeddedPython::new())), Some(&root), None, false, &Preferences::default());
        assert!(!console.engine_loaded());
        assert_eq!(console.log()[0], LogLine { kind: LineKind::Error, text: "Unable to load module \"regina\".".into() });
        console.execute_line("print(1 + 1)");
        assert_eq!(texts(&console, LineKind::Output), vec!["2"]);
    }

    #[test]
    fn continuation_lines_are_indented() {
        let root = tree();
        let mut console = console(&root, None, false);
        assert_eq!(console.prompt(), ">>> ");
        assert_eq!(console.execute_line("for c in root.children():"), "    ");
        assert_eq!(console.prompt(), "... ");
        assert_eq!(console.execute_line("    print(c.label())"), "    ");
        assert_eq!(console.execute_line(""), "");
        assert_eq!(console.prompt(), ">>> ");
        assert_eq!(texts(&console, LineKind::Input), vec![">>> for c in root.children():", "...     print(c.label())", "... "]);
        assert_eq!(texts(&console, LineKind::Output), vec!["Knot", "Notes"]);

        let mut prefs = Preferences::default();
        prefs.python_auto_indent = false;
        prefs.python_spaces_per_tab = 2;
        console.update_preferences(&prefs);
        assert_eq!(console.execute_line("if 1:"), "");
        assert_eq!(console.tab_text(), "  ");
    }

    #[test]
    fn completion_extends_the_common_prefix() {
        let root = tree();
        let console = console(&root, None, false);
        assert_eq!(console.complete("x = root.cou"), Completion::Extend { insert: "ntChildren".into(), candidates: vec![] });
        assert_eq!(console.complete("root.firstChild().zz"), Completion::NoMatch);
        assert_eq!(console.complete("x = 1 + "), Completion::Nothing);
        assert_matches!(console.complete("print(root.l"), Completion::Extend { insert, candidates } => {
            assert_eq!(insert, "a");
            assert_eq!(candidates, vec!["root.label".to_string(), "root.lastChild".to_string()]);
        });
        /* dunder methods are never offered */
        assert_eq!(console.complete("root._"), Completion::NoMatch);
    }

    #[test]
    fn scripts_see_their_variables() {
        let root = tree();
        let knot = root.first_child().unwrap();
        let mut console = console(&root, None, false);

        let mut script = Script::new("print(k.label())\nprint(gone)\n".into());
        script.add_variable("k".into(), Some(&knot));
        script.add_variable("gone".into(), None);
        script.add_variable("not valid".into(), Some(&knot));
        console.run_script(&script);

        assert_eq!(texts(&console, LineKind::Output), vec!["Knot", "None"]);
        assert_eq!(texts(&console, LineKind::Error), vec!["Could not set variable not valid to Knot."]);
    }

    #[test]
    fn transcript_renders_and_saves() {
        let root = tree();
        let mut console = console(&root, None, false);
        console.execute_line("print('a < b')");
        console.execute_line("nothing_here");
        let html = console.log_html();
        assert!(html.contains("<b>&gt;&gt;&gt;&nbsp;print('a&nbsp;&lt;&nbsp;b')</b><br>"));
        assert!(html.contains("a&nbsp;&lt;&nbsp;b<br>"));
        assert!(html.contains("<font color=\"dark red\">NameError:&nbsp;name&nbsp;'nothing_here'&nbsp;is&nbsp;not&nbsp;defined</font><br>"));
        assert!(html.starts_with("<font color=\"dark goldenrod\">"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        console.save_log(&path).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains(">>> nothing_here\nTraceback (most recent call last):\n"));
        assert!(saved.ends_with("NameError: name 'nothing_here' is not defined\n"));
    }

    #[test]
    fn helpers() {
        assert_eq!(trailing_word("foo(bar.baz"), Some("bar.baz"));
        assert_eq!(trailing_word("x = 12ab"), Some("ab"));
        assert_eq!(trailing_word("x = "), None);
        assert_eq!(initial_indent("   "), "");
        assert_eq!(initial_indent("\t  x"), "\t  ");
        assert_eq!(common_prefix(&["root.label".into(), "root.lastChild".into()]), "root.la");
    }
}
