//! The Python bridge.
//!
//! Each document window owns one [PythonConsole] wrapped around an
//! [Interpreter], normally an [EmbeddedPython] session. Packets are handed
//! to it as weak handles, so a session never keeps a document alive.

use std::sync;

use crate::model::packet::{Packet, PacketRef};

pub mod console;
pub mod embedded;

pub use console::{Completion, LineKind, LogLine, PythonConsole};
pub use embedded::EmbeddedPython;

/// Name under which the mathematical engine is imported.
pub const ENGINE_MODULE: &str = "regina";

/// A value handed from the document to a session.
#[derive(Clone, Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Packet(sync::Weak<Packet>),
}

impl Value {
    pub fn packet(packet: &PacketRef) -> Value {
        Value::Packet(sync::Arc::downgrade(packet))
    }
}

/// What a piece of code wrote to its two output streams.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Execution {
    Complete(Output),
    /// The line opened (or continued) a block; more input is needed.
    Incomplete,
}

pub trait Interpreter {
    /// Imports the mathematical engine module into the session. On failure
    /// the session carries on without it.
    fn import_engine(&mut self) -> Result<(), String>;

    /// Binds a global variable. Fails if the name is not a valid identifier.
    fn set_variable(&mut self, name: &str, value: Value) -> Result<(), String>;

    /// Feeds one line typed at the prompt.
    fn push_line(&mut self, line: &str) -> Execution;

    /// Runs a complete program, as when a script packet is executed.
    fn run(&mut self, code: &str) -> Output;

    /// Candidates that complete `text`, a possibly dotted name. Results are
    /// whole names (`root.firstChild`, not `firstChild`), in any order and
    /// possibly repeated.
    fn completions(&self, text: &str) -> Vec<String>;
}
