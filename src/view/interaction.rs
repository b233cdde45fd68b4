//! The seam between the document logic and whatever presents it.
//!
//! Everything that would pop up a dialog goes through an [Interaction]. A
//! graphical front-end shows message boxes and file choosers; the text
//! front-end prints and reads lines; tests script the answers.

use std::path::PathBuf;

use crate::model::packet::PacketRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Something the user may want to know; nothing went wrong.
    Information,
    /// Input that failed a precondition.
    NotValid,
    /// The engine could not do what was asked.
    Sorry,
    Warning,
    Error,
}

impl MessageKind {
    pub fn title(&self) -> &'static str {
        match self {
            MessageKind::Information => "Information",
            MessageKind::NotValid => "Not valid",
            MessageKind::Sorry => "Sorry",
            MessageKind::Warning => "Warning",
            MessageKind::Error => "Error",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseChoice {
    Save,
    Discard,
    Cancel,
}

pub trait Interaction {
    fn message(&self, kind: MessageKind, text: &str, detail: Option<&str>);

    /// A yes/cancel question. Returns true for yes.
    fn confirm(&self, text: &str, detail: Option<&str>) -> bool;

    /// Asked when a window with unsaved changes is about to close.
    fn ask_close(&self, document: &str) -> CloseChoice;

    /// Asks for a line of text, as when renaming a packet.
    fn ask_text(&self, prompt: &str, initial: &str) -> Option<String>;

    /// Picks one packet from a list, as when choosing where an imported
    /// packet should go.
    fn choose_packet(&self, prompt: &str, candidates: &[PacketRef]) -> Option<PacketRef>;

    fn choose_path(&self, title: &str, filter: &str, save: bool) -> Option<PathBuf>;

    /// Shows progress of a long job. `fraction` is None while the job cannot
    /// say how far along it is. Returns false if the user asked to cancel.
    fn progress(&self, description: &str, fraction: Option<f64>) -> bool;

    /// The job behind the last [Interaction::progress] call has ended.
    fn progress_done(&self) {}
}

/// Answers every question with the safe default and logs every message.
/// Used when nobody is watching, such as in batch runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unattended;

impl Interaction for Unattended {
    fn message(&self, kind: MessageKind, text: &str, detail: Option<&str>) {
        match kind {
            MessageKind::Information => tracing::info!(text, detail, "message"),
            MessageKind::NotValid | MessageKind::Sorry | MessageKind::Warning => tracing::warn!(kind = kind.title(), text, detail, "message"),
            MessageKind::Error => tracing::error!(text, detail, "message"),
        }
    }

    fn confirm(&self, text: &str, _detail: Option<&str>) -> bool {
        tracing::info!(text, "declining confirmation");
        false
    }

    fn ask_close(&self, document: &str) -> CloseChoice {
        tracing::info!(document, "keeping unsaved document open");
        CloseChoice::Cancel
    }

    fn ask_text(&self, _prompt: &str, _initial: &str) -> Option<String> {
        None
    }

    fn choose_packet(&self, _prompt: &str, _candidates: &[PacketRef]) -> Option<PacketRef> {
        None
    }

    fn choose_path(&self, _title: &str, _filter: &str, _save: bool) -> Option<PathBuf> {
        None
    }

    fn progress(&self, _description: &str, _fraction: Option<f64>) -> bool {
        true
    }
}
