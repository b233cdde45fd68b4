use std::fmt::Write;
use std::path::Path;

use crate::io::{label_from_path, Context, HandlerError, PacketHandler};
use crate::model::packet::{Packet, PacketKind, PacketRef, Payload, Script};

const SCRIPT_MARKER: &str = "### Regina Script:";
const VAR_MARKER: &str = "### Variable ";
const END_MARKER: &str = "### Begin Script";

/// Python scripts as plain `.py` files. The label and variable table
/// travel in a comment header so that a round trip keeps them; a file
/// without the header imports as bare code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScriptHandler;

/// Splits a file into (label, variable names, code).
fn parse(text: &str) -> (Option<String>, Vec<String>, String) {
    let mut lines = text.lines().peekable();
    let label = match lines.peek().and_then(|l| l.strip_prefix(SCRIPT_MARKER)) {
        Some(rest) => {
            let label = rest.trim().to_string();
            lines.next();
            label
        },
        None => return (None, Vec::new(), text.to_string()),
    };

    let mut variables = Vec::new();
    while let Some(line) = lines.next() {
        if line.trim_end() == END_MARKER {
            break;
        }
        if let Some(name) = line.strip_prefix(VAR_MARKER).and_then(|rest| rest.split(':').next()) {
            variables.push(name.trim().to_string());
        }
    }

    let mut code = lines.collect::<Vec<_>>().join("\n");
    if text.ends_with('\n') && !code.is_empty() {
        code.push('\n');
    }
    (Some(label), variables, code)
}

impl PacketHandler for ScriptHandler {
    fn name(&self) -> &'static str {
        "Python script"
    }

    fn filter(&self) -> &'static str {
        "*.py"
    }

    fn uses_codec(&self) -> bool {
        true
    }

    fn accepts(&self, kind: PacketKind) -> bool {
        kind == PacketKind::Script
    }

    fn import(&self, cx: &Context, path: &Path) -> Result<PacketRef, HandlerError> {
        let text = cx.read_text(path)?;
        let (label, variables, code) = parse(&text);
        let mut script = Script::new(code);
        for name in variables {
            /* targets cannot be recovered outside their original file */
            if !script.add_variable(name.clone(), None) {
                tracing::warn!(variable = %name, path = %path.display(), "duplicate script variable");
            }
        }
        let label = label.filter(|l| !l.is_empty()).unwrap_or_else(|| label_from_path(path));
        Ok(Packet::new(label, Payload::Script(script)))
    }

    fn export(&self, cx: &Context, packet: &PacketRef, path: &Path) -> Result<(), HandlerError> {
        let mut out = String::new();
        match &*packet.payload() {
            Payload::Script(script) => {
                let _ = writeln!(out, "{} {}", SCRIPT_MARKER, packet.label());
                for variable in script.variables() {
                    let target = variable.resolve().map(|p| p.label()).unwrap_or_default();
                    let _ = writeln!(out, "{}{}: {}", VAR_MARKER, variable.name, target);
                }
                let _ = writeln!(out, "{}", END_MARKER);
                out.push_str(&script.text);
            },
            _ => return Err(HandlerError::WrongKind { format: self.name(), found: packet.kind() }),
        }
        cx.write_text(path, &out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::engine::basic::BasicEngine;
    use crate::model::codec::TextCodec;

    #[test]
    fn header_carries_label_and_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("census.py");
        let cx = Context::new(&BasicEngine, TextCodec::Utf8);

        let target = Packet::container("Census");
        let mut script = Script::new("for t in census.children():\n    print(t)\n".into());
        script.add_variable("census".into(), Some(&target));
        script.add_variable("unused".into(), None);
        let packet = Packet::new("Walk census", Payload::Script(script));

        ScriptHandler.export(&cx, &packet, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("### Regina Script: Walk census\n### Variable census: Census\n### Variable unused: \n### Begin Script\n"));

        let imported = ScriptHandler.import(&cx, &path).unwrap();
        assert_eq!(imported.label(), "Walk census");
        let (text, names) = imported.read::<Script, _>(|s| {
            (s.text.clone(), s.variables().iter().map(|v| v.name.clone()).collect::<Vec<_>>())
        }).unwrap();
        assert_eq!(text, "for t in census.children():\n    print(t)\n");
        assert_eq!(names, vec!["census".to_string(), "unused".to_string()]);
    }

    #[test]
    fn bare_files_are_all_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.py");
        std::fs::write(&path, "print('hello')\n").unwrap();
        let cx = Context::new(&BasicEngine, TextCodec::Utf8);

        let imported = ScriptHandler.import(&cx, &path).unwrap();
        assert_eq!(imported.label(), "hello");
        assert_eq!(imported.read::<Script, _>(|s| s.text.clone()).unwrap(), "print('hello')\n");
    }
}
