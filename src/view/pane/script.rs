//! Python scripts: a table of variables bound to packets, and the script
//! text itself. Running the script is the window's business, since it owns
//! the console.

use crate::model::packet::{PacketRef, Script};
use crate::view::error::{Action, Error, Trouble};
use crate::view::interaction::{Interaction, MessageKind};
use crate::view::pane::{EditFacet, PacketUi, PaneContext};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableRow {
    pub name: String,
    pub value: Option<String>,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

fn edit_error(error: crate::model::packet::PacketError) -> Error {
    Error::new(Action::EditPacket, Trouble::Packet(error))
}

#[derive(Debug, Default)]
pub struct ScriptUi {
    rows: Vec<VariableRow>,
    text: String,
}

impl ScriptUi {
    pub fn new(packet: &PacketRef, cx: &PaneContext) -> ScriptUi {
        let mut ui = ScriptUi::default();
        ui.refresh(packet, cx);
        ui
    }

    pub fn rows(&self) -> &[VariableRow] {
        &self.rows
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&self, packet: &PacketRef, text: &str) -> Result<(), Error> {
        if text == self.text {
            return Ok(());
        }
        packet.change::<Script, _>(|script| script.text = text.to_string()).map_err(edit_error)
    }

    /// Adds an unbound variable called `var0`, `var1`, ... whichever is free.
    pub fn add_variable(&self, packet: &PacketRef) -> Result<String, Error> {
        packet.change::<Script, _>(|script| {
            let name = (0..).map(|i| format!("var{}", i))
                .find(|name| script.variable(name).is_none())
                .unwrap_or_default();
            script.add_variable(name.clone(), None);
            name
        }).map_err(edit_error)
    }

    pub fn remove_variables(&self, packet: &PacketRef, names: &[&str], interaction: &dyn Interaction) -> Result<bool, Error> {
        let question = match names {
            [] => return Err(Error::refused(
                Action::EditPacket,
                "No variables are selected.",
                Some("Please select one or more variables to remove, then press Remove Var again."))),
            [name] => format!("The variable {} will be removed.", name),
            names => format!("{} variables will be removed.", names.len()),
        };
        if !interaction.confirm(&question, Some("Are you sure?")) {
            return Ok(false);
        }

        packet.change::<Script, _>(|script| {
            for name in names {
                script.remove_variable(name);
            }
        }).map_err(edit_error)?;
        Ok(true)
    }

    /// Renames a variable, fixing up names that are not Python identifiers
    /// or that clash with another variable and telling the user what was
    /// done instead. Returns the name finally used, if any.
    pub fn rename_variable(&self, packet: &PacketRef, old: &str, new: &str, interaction: &dyn Interaction) -> Result<Option<String>, Error> {
        let mut name = new.trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid(Action::EditPacket, "Variable names cannot be empty.", None));
        }

        if !is_identifier(&name) {
            let original = name.clone();
            name.retain(|c| c.is_ascii_alphanumeric() || c == '_');
            if name.is_empty() {
                return Ok(None);
            }
            if !is_identifier(&name) {
                name.insert(0, '_');
            }
            interaction.message(
                MessageKind::Information,
                &format!("{} is not a valid Python variable name.", original),
                Some(&format!("I have changed it to {} instead.", name)));
        }

        let taken = |candidate: &str| self.rows.iter().any(|row| row.name == candidate && row.name != old);
        if taken(&name) {
            let original = name.clone();
            name = (0..).map(|i| format!("{}{}", original, i))
                .find(|candidate| !taken(candidate))
                .unwrap_or_default();
            interaction.message(
                MessageKind::Information,
                &format!("Another variable is already using the name {}.", original),
                Some(&format!("I will use {} instead.", name)));
        }

        let renamed = packet.change::<Script, _>(|script| script.set_variable_name(old, name.clone())).map_err(edit_error)?;
        Ok(renamed.then_some(name))
    }

    pub fn set_variable_value(&self, packet: &PacketRef, name: &str, value: Option<&PacketRef>) -> Result<bool, Error> {
        packet.change::<Script, _>(|script| script.set_variable_value(name, value)).map_err(edit_error)
    }
}

impl PacketUi for ScriptUi {
    fn refresh(&mut self, packet: &PacketRef, _cx: &PaneContext) {
        let Some((rows, text)) = packet.read::<Script, _>(|script| {
            let rows = script.variables().iter()
                .map(|v| VariableRow { name: v.name.clone(), value: v.resolve().map(|p| p.human_label()) })
                .collect::<Vec<_>>();
            (rows, script.text.clone())
        }) else { return };
        self.rows = rows;
        self.text = text;
    }

    fn summary(&self) -> Option<String> {
        Some(match self.rows.len() {
            0 => "No variables".to_string(),
            1 => "1 variable".to_string(),
            n => format!("{} variables", n),
        })
    }

    fn render(&self, _tab: usize) -> String {
        let mut out = String::from("Variable | Value");
        for row in &self.rows {
            out.push('\n');
            out.push_str(&row.name);
            out.push_str(" | ");
            out.push_str(row.value.as_deref().unwrap_or("(none)"));
        }
        out.push_str("\n\n");
        out.push_str(&self.text);
        out
    }

    fn edit_facet(&self, _tab: usize) -> EditFacet {
        EditFacet { can_cut: true, can_copy: true, can_paste: true }
    }

    fn copy_text(&self, _tab: usize) -> Option<String> {
        Some(self.text.clone())
    }
}
