use std::fmt;
use std::fmt::Write;
use std::path::PathBuf;

use crate::engine::EngineError;
use crate::io::HandlerError;
use crate::model::packet::PacketError;
use crate::model::preferences::PreferenceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    OpenFile,
    OpenExample,
    SaveFile,
    Import,
    Export,
    ClonePacket,
    RenamePacket,
    DeletePacket,
    MovePacket,
    NewPacket,
    EditPacket,
    EditGluings,
    TriangulationOperation(&'static str),
    SnapPeaOperation(&'static str),
    ElementaryMove,
    CensusLookup,
    ComputeInvariant,
    RenderGraph,
    ChangePreferences,
    SavePreferences,
    LoadPreferences,
    RunScript,
    SaveSessionLog,
}

#[derive(Debug)]
pub enum Trouble {
    None,
    Packet(PacketError),
    Engine(EngineError),
    Handler(HandlerError),
    Preference(PreferenceError),
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    /// A file that should have been there was not.
    Missing {
        path: PathBuf,
        message: String,
    },
    /// The selected packet does not meet the operation's preconditions.
    Refused {
        message: String,
        detail: Option<String>,
    },
    /// User input was malformed.
    Validation {
        message: String,
        detail: Option<String>,
    },
    /// An external program the feature needs is not installed.
    FeatureUnavailable {
        feature: &'static str,
        detail: String,
    },
}

impl From<PacketError> for Trouble {
    fn from(error: PacketError) -> Trouble {
        Trouble::Packet(error)
    }
}

impl From<EngineError> for Trouble {
    fn from(error: EngineError) -> Trouble {
        Trouble::Engine(error)
    }
}

impl From<HandlerError> for Trouble {
    fn from(error: HandlerError) -> Trouble {
        Trouble::Handler(error)
    }
}

/// The broad classes of failure, which decide how a problem is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Refused,
    Engine,
    Io,
    FeatureUnavailable,
    Fatal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Informational,
    Warning,
    Error,
}

#[derive(Debug)]
pub struct Error {
    pub while_attempting: Action,
    pub trouble: Trouble,
    pub level: Level,
    pub is_bug: bool,
}

impl Error {
    pub fn new(while_attempting: Action, trouble: Trouble) -> Error {
        let (level, is_bug) = match &trouble {
            Trouble::None => (Level::Informational, false),
            Trouble::Refused { .. } | Trouble::FeatureUnavailable { .. } => (Level::Informational, false),
            Trouble::Validation { .. } => (Level::Warning, false),
            Trouble::Packet(PacketError::WouldCreateCycle) | Trouble::Packet(PacketError::KindChanged { .. }) => (Level::Error, true),
            _ => (Level::Error, false),
        };
        Error { while_attempting, trouble, level, is_bug }
    }

    pub fn refused(while_attempting: Action, message: impl Into<String>, detail: Option<&str>) -> Error {
        Error::new(while_attempting, Trouble::Refused { message: message.into(), detail: detail.map(str::to_string) })
    }

    pub fn invalid(while_attempting: Action, message: impl Into<String>, detail: Option<&str>) -> Error {
        Error::new(while_attempting, Trouble::Validation { message: message.into(), detail: detail.map(str::to_string) })
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.trouble {
            Trouble::None | Trouble::Refused { .. } => ErrorKind::Refused,
            Trouble::Validation { .. } => ErrorKind::Validation,
            Trouble::Preference(PreferenceError::Validation { .. }) => ErrorKind::Validation,
            Trouble::Preference(_) => ErrorKind::Io,
            Trouble::Packet(PacketError::WouldCreateCycle) | Trouble::Packet(PacketError::KindChanged { .. }) => ErrorKind::Fatal,
            Trouble::Packet(_) => ErrorKind::Refused,
            Trouble::Engine(EngineError::Io { .. }) | Trouble::Engine(EngineError::Parse { .. }) => ErrorKind::Io,
            Trouble::Engine(_) => ErrorKind::Engine,
            Trouble::Handler(HandlerError::Io { .. }) | Trouble::Handler(HandlerError::Encoding { .. }) => ErrorKind::Io,
            Trouble::Handler(HandlerError::Engine(EngineError::Io { .. })) => ErrorKind::Io,
            Trouble::Handler(HandlerError::WrongKind { .. }) | Trouble::Handler(HandlerError::Direction { .. }) => ErrorKind::Refused,
            Trouble::Handler(_) => ErrorKind::Engine,
            Trouble::Io { .. } | Trouble::Missing { .. } => ErrorKind::Io,
            Trouble::FeatureUnavailable { .. } => ErrorKind::FeatureUnavailable,
        }
    }

    /// The one-line summary shown in bold.
    pub fn message(&self) -> String {
        match &self.trouble {
            Trouble::Refused { message, .. } | Trouble::Validation { message, .. } | Trouble::Missing { message, .. } => return message.clone(),
            _ => {},
        }

        match self.while_attempting {
            Action::OpenFile => "I could not open the selected file.",
            Action::OpenExample => "I could not open the example file.",
            Action::SaveFile => "I could not save the data file.",
            Action::Import => "The import failed.",
            Action::Export => "The export failed.",
            Action::ClonePacket => "I could not clone the packet.",
            Action::RenamePacket => "I could not rename the packet.",
            Action::DeletePacket => "I could not delete the packet.",
            Action::MovePacket => "I could not move the packet.",
            Action::NewPacket => "I could not create the new packet.",
            Action::EditPacket => "I could not change the packet.",
            Action::EditGluings => "I could not change the gluings.",
            Action::TriangulationOperation(_) | Action::SnapPeaOperation(_) => "The operation failed.",
            Action::ElementaryMove => "I could not perform the elementary move.",
            Action::CensusLookup => "The census lookup failed.",
            Action::ComputeInvariant => "I could not compute this invariant.",
            Action::RenderGraph => "I could not draw this graph.",
            Action::ChangePreferences => "I could not change the settings.",
            Action::SavePreferences => "I could not save your settings.",
            Action::LoadPreferences => "I could not load your settings.",
            Action::RunScript => "The script could not be run.",
            Action::SaveSessionLog => "I could not save the session log.",
        }.to_string()
    }

    /// Multi-line explanation. File problems always name the full path.
    pub fn detail(&self) -> String {
        let mut msg = String::new();
        if self.write_detail(&mut msg).is_err() {
            msg+= "Failed to format details.\n";
        }
        msg
    }

    fn write_detail(&self, msg: &mut String) -> Result<(), fmt::Error> {
        if let Action::TriangulationOperation(name) | Action::SnapPeaOperation(name) = self.while_attempting {
            if !matches!(self.trouble, Trouble::Refused { .. } | Trouble::Validation { .. }) {
                writeln!(msg, "While attempting: {}", name)?;
            }
        }

        match &self.trouble {
            Trouble::None => write!(msg, "No further details.")?,
            Trouble::Refused { detail, .. } | Trouble::Validation { detail, .. } => {
                if let Some(detail) = detail {
                    write!(msg, "{}", detail)?;
                }
            },
            Trouble::Packet(error) => {
                write!(msg, "The packet tree refused the change: {}.", error)?;
            },
            Trouble::Engine(EngineError::Io { path, error }) | Trouble::Handler(HandlerError::Engine(EngineError::Io { path, error })) => {
                write!(msg, "Please check that the file {} is readable and in Regina format.\n{}", path.display(), error)?;
            },
            Trouble::Engine(EngineError::Parse { path, line, message }) => {
                write!(msg, "The file {} could not be read", path.display())?;
                if let Some(line) = line {
                    write!(msg, " (line {})", line)?;
                }
                write!(msg, ": {}", message)?;
            },
            Trouble::Engine(EngineError::Unsupported(what)) => {
                write!(msg, "The mathematical engine in use does not support {}.", what)?;
            },
            Trouble::Engine(error) => write!(msg, "{}", capitalise(&error.to_string()))?,
            Trouble::Handler(HandlerError::Io { path, error }) => {
                write!(msg, "An error occurred while accessing {}: {}", path.display(), error)?;
            },
            Trouble::Handler(HandlerError::Encoding { path, error }) => {
                write!(msg, "The file {} is not in the selected text encoding: {}", path.display(), error)?;
            },
            Trouble::Handler(error) => write!(msg, "{}", capitalise(&error.to_string()))?,
            Trouble::Preference(PreferenceError::Validation { key, message }) => {
                write!(msg, "The setting {} {}.", key, message)?;
            },
            Trouble::Preference(error) => write!(msg, "{}", error)?,
            Trouble::Io { path, error } => {
                write!(msg, "An error occurred while accessing {}: {}", path.display(), error)?;
            },
            Trouble::Missing { path, .. } => write!(msg, "Expected file: {}", path.display())?,
            Trouble::FeatureUnavailable { detail, .. } => write!(msg, "{}", detail)?,
        };

        if self.is_bug {
            write!(msg, "\nThis should never happen; please report it as a bug.")?;
        }
        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for Error {}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => {
            let mut out: String = first.to_uppercase().collect();
            out.push_str(chars.as_str());
            if !out.ends_with('.') {
                out.push('.');
            }
            out
        },
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn io_failures_name_the_path() {
        let error = Error::new(Action::OpenFile, Trouble::Engine(EngineError::Io {
            path: PathBuf::from("/data/census.rga"),
            error: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        }));
        assert_eq!(error.kind(), ErrorKind::Io);
        assert_eq!(error.message(), "I could not open the selected file.");
        assert!(error.detail().contains("/data/census.rga"));
    }

    #[test]
    fn kinds_classify_troubles() {
        assert_eq!(Error::refused(Action::TriangulationOperation("Orient"), "This triangulation is already oriented.", None).kind(), ErrorKind::Refused);
        assert_eq!(Error::invalid(Action::EditGluings, "A face cannot be glued to itself.", None).kind(), ErrorKind::Validation);
        assert_eq!(Error::new(Action::ComputeInvariant, Trouble::Engine(EngineError::NoResult)).kind(), ErrorKind::Engine);
        assert_eq!(Error::new(Action::ChangePreferences, Trouble::Preference(PreferenceError::Validation { key: "Tree.JumpSize", message: "must be a positive integer" })).kind(), ErrorKind::Validation);

        let cycle = Error::new(Action::MovePacket, Trouble::Packet(PacketError::WouldCreateCycle));
        assert_eq!(cycle.kind(), ErrorKind::Fatal);
        assert!(cycle.is_bug);
        assert_eq!(cycle.level, Level::Error);
    }

    #[test]
    fn refusals_carry_their_own_words() {
        let error = Error::refused(Action::TriangulationOperation("Truncate"), "This triangulation has no ideal vertices.", Some("Only ideal vertices can be truncated."));
        assert_eq!(error.message(), "This triangulation has no ideal vertices.");
        assert_eq!(error.detail(), "Only ideal vertices can be truncated.");
    }

    #[test]
    fn engine_errors_read_as_sentences() {
        let error = Error::new(Action::TriangulationOperation("Simplify"), Trouble::Engine(EngineError::Unsupported("simplification")));
        assert_eq!(error.detail(), "While attempting: Simplify\nThe mathematical engine in use does not support simplification.");
    }
}
