//! Import and export of packets in file formats other than, and including,
//! the native data file.
//!
//! Every format is a [PacketHandler]. Imports always produce an orphan
//! packet; the caller decides where in the tree it goes. Exports write a
//! single packet (or, for the native format, a subtree).

use std::fmt;
use std::fs;
use std::io as stdio;
use std::path::{Path, PathBuf};

use enum_dispatch::enum_dispatch;

use crate::engine::{Engine, EngineError};
use crate::model::codec::{CodecError, TextCodec};
use crate::model::packet::{PacketKind, PacketRef};

pub mod attachment;
pub mod csv;
pub mod native;
pub mod script;
pub mod signatures;
pub mod snappea;
pub mod text;

pub use attachment::PdfHandler;
pub use csv::CsvSurfaceHandler;
pub use native::NativeHandler;
pub use script::ScriptHandler;
pub use signatures::{DehydrationHandler, IsoSigHandler};
pub use snappea::{OrbHandler, SnapPeaHandler};
pub use text::{RecogniserHandler, SourceHandler};

#[derive(Debug)]
pub enum HandlerError {
    Engine(EngineError),
    Io { path: PathBuf, error: stdio::Error },
    Encoding { path: PathBuf, error: CodecError },
    /// The packet is not something this format can hold.
    WrongKind { format: &'static str, found: PacketKind },
    /// The packet is of the right kind but cannot be written (or the file
    /// held nothing usable); the message is meant for the user.
    Refused(String),
    /// This handler only works in the other direction.
    Direction { format: &'static str, import: bool },
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Engine(e) => write!(f, "{}", e),
            HandlerError::Io { path, error } => write!(f, "{}: {}", path.display(), error),
            HandlerError::Encoding { path, error } => write!(f, "{}: {}", path.display(), error),
            HandlerError::WrongKind { format, found } => write!(f, "a {} packet cannot be saved as {}", found.name().to_lowercase(), format),
            HandlerError::Refused(message) => write!(f, "{}", message),
            HandlerError::Direction { format, import: true } => write!(f, "{} files cannot be imported", format),
            HandlerError::Direction { format, import: false } => write!(f, "packets cannot be exported as {}", format),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Engine(e) => Some(e),
            HandlerError::Io { error, .. } => Some(error),
            HandlerError::Encoding { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<EngineError> for HandlerError {
    fn from(e: EngineError) -> HandlerError {
        HandlerError::Engine(e)
    }
}

/// What a handler needs from the surrounding application.
pub struct Context<'a> {
    pub engine: &'a dyn Engine,
    pub codec: TextCodec,
}

impl<'a> Context<'a> {
    pub fn new(engine: &'a dyn Engine, codec: TextCodec) -> Context<'a> {
        Context { engine, codec }
    }

    pub fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, HandlerError> {
        fs::read(path).map_err(|error| HandlerError::Io { path: path.to_path_buf(), error })
    }

    pub fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), HandlerError> {
        fs::write(path, bytes).map_err(|error| HandlerError::Io { path: path.to_path_buf(), error })
    }

    /// Reads a text file in the configured encoding.
    pub fn read_text(&self, path: &Path) -> Result<String, HandlerError> {
        let bytes = self.read_bytes(path)?;
        self.codec.decode(&bytes).map_err(|error| HandlerError::Encoding { path: path.to_path_buf(), error })
    }

    pub fn write_text(&self, path: &Path, text: &str) -> Result<(), HandlerError> {
        let bytes = self.codec.encode(text).map_err(|error| HandlerError::Encoding { path: path.to_path_buf(), error })?;
        self.write_bytes(path, &bytes)
    }

    /// Reads a file that is ASCII by definition, whatever the configured
    /// encoding.
    pub fn read_ascii(&self, path: &Path) -> Result<String, HandlerError> {
        let bytes = self.read_bytes(path)?;
        TextCodec::Utf8.decode(&bytes).map_err(|error| HandlerError::Encoding { path: path.to_path_buf(), error })
    }
}

/// A label for an imported packet, taken from the file name.
pub fn label_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[enum_dispatch]
pub trait PacketHandler {
    /// Human-readable name of the format.
    fn name(&self) -> &'static str;

    /// File-dialog filter, such as `*.tri`.
    fn filter(&self) -> &'static str;

    /// Whether the configured text encoding applies to this format.
    fn uses_codec(&self) -> bool {
        false
    }

    fn can_import(&self) -> bool {
        true
    }

    fn can_export(&self) -> bool {
        true
    }

    /// Whether packets of this kind may be offered for export.
    fn accepts(&self, kind: PacketKind) -> bool;

    fn import(&self, _cx: &Context, _path: &Path) -> Result<PacketRef, HandlerError> {
        Err(HandlerError::Direction { format: self.name(), import: true })
    }

    fn export(&self, _cx: &Context, _packet: &PacketRef, _path: &Path) -> Result<(), HandlerError> {
        Err(HandlerError::Direction { format: self.name(), import: false })
    }
}

#[enum_dispatch(PacketHandler)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    Native(NativeHandler),
    SnapPea(SnapPeaHandler),
    Orb(OrbHandler),
    IsoSig(IsoSigHandler),
    Dehydration(DehydrationHandler),
    Pdf(PdfHandler),
    Script(ScriptHandler),
    CsvSurfaces(CsvSurfaceHandler),
    Recogniser(RecogniserHandler),
    Source(SourceHandler),
}

/// Formats offered on the import menu, in menu order.
pub fn importers() -> Vec<Handler> {
    all().into_iter().filter(|h| h.can_import()).collect()
}

/// Formats offered on the export menu, in menu order.
pub fn exporters() -> Vec<Handler> {
    all().into_iter().filter(|h| h.can_export()).collect()
}

fn all() -> Vec<Handler> {
    vec![
        NativeHandler.into(),
        SnapPeaHandler.into(),
        OrbHandler.into(),
        IsoSigHandler::new(2).into(),
        IsoSigHandler::new(3).into(),
        IsoSigHandler::new(4).into(),
        DehydrationHandler.into(),
        PdfHandler.into(),
        ScriptHandler.into(),
        CsvSurfaceHandler::standard().into(),
        CsvSurfaceHandler::edge_weight().into(),
        RecogniserHandler.into(),
        SourceHandler.into(),
    ]
}

/// Checks a packet against what a handler can export, without writing
/// anything.
pub fn check_exportable(handler: &Handler, packet: &PacketRef) -> Result<(), HandlerError> {
    if !handler.can_export() {
        return Err(HandlerError::Direction { format: handler.name(), import: false });
    }
    if !handler.accepts(packet.kind()) {
        return Err(HandlerError::WrongKind { format: handler.name(), found: packet.kind() });
    }
    Ok(())
}
