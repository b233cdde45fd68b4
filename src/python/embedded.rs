//! CPython, embedded through pyo3.
//!
//! Every session gets its own globals dictionary, so two windows never see
//! each other's variables. The engine module is built here in Rust and
//! registered in `sys.modules` under [ENGINE_MODULE]; packets cross into
//! Python as weak handles that raise `RuntimeError` once their packet has
//! gone.

use std::sync;

use parking_lot::Mutex;
use pyo3::exceptions::{PyRuntimeError, PyTypeError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::model::packet::{Packet, PacketRef, Payload};
use crate::python::{Execution, Interpreter, Output, Value, ENGINE_MODULE};

/* sys.stdout and sys.stderr belong to the whole process, so only one
 * session at a time may have them redirected. Always taken before the GIL. */
static STREAMS: Mutex<()> = parking_lot::const_mutex(());

/// A packet as Python sees it.
#[pyclass(name = "Packet", module = "regina", frozen)]
pub struct PyPacket {
    packet: sync::Weak<Packet>,
}

impl PyPacket {
    fn wrap(packet: &PacketRef) -> PyPacket {
        PyPacket { packet: sync::Arc::downgrade(packet) }
    }

    fn live(&self) -> PyResult<PacketRef> {
        self.packet.upgrade().ok_or_else(|| PyRuntimeError::new_err("the packet has been deleted"))
    }
}

#[pymethods]
impl PyPacket {
    fn label(&self) -> PyResult<String> {
        Ok(self.live()?.label())
    }

    #[pyo3(name = "setLabel")]
    fn set_label(&self, label: String) -> PyResult<()> {
        self.live()?.set_label(label);
        Ok(())
    }

    #[pyo3(name = "humanLabel")]
    fn human_label(&self) -> PyResult<String> {
        Ok(self.live()?.human_label())
    }

    #[pyo3(name = "typeName")]
    fn type_name(&self) -> PyResult<String> {
        Ok(self.live()?.kind().name().to_string())
    }

    fn parent(&self) -> PyResult<Option<PyPacket>> {
        Ok(self.live()?.parent().as_ref().map(PyPacket::wrap))
    }

    fn root(&self) -> PyResult<PyPacket> {
        Ok(PyPacket::wrap(&self.live()?.root()))
    }

    #[pyo3(name = "firstChild")]
    fn first_child(&self) -> PyResult<Option<PyPacket>> {
        Ok(self.live()?.first_child().as_ref().map(PyPacket::wrap))
    }

    #[pyo3(name = "lastChild")]
    fn last_child(&self) -> PyResult<Option<PyPacket>> {
        Ok(self.live()?.last_child().as_ref().map(PyPacket::wrap))
    }

    #[pyo3(name = "nextSibling")]
    fn next_sibling(&self) -> PyResult<Option<PyPacket>> {
        Ok(self.live()?.next_sibling().as_ref().map(PyPacket::wrap))
    }

    #[pyo3(name = "prevSibling")]
    fn prev_sibling(&self) -> PyResult<Option<PyPacket>> {
        Ok(self.live()?.prev_sibling().as_ref().map(PyPacket::wrap))
    }

    fn children(&self) -> PyResult<Vec<PyPacket>> {
        Ok(self.live()?.children().iter().map(PyPacket::wrap).collect())
    }

    #[pyo3(name = "countChildren")]
    fn count_children(&self) -> PyResult<usize> {
        Ok(self.live()?.count_children())
    }

    #[pyo3(name = "hasTag")]
    fn has_tag(&self, tag: &str) -> PyResult<bool> {
        Ok(self.live()?.has_tag(tag))
    }

    #[pyo3(name = "addTag")]
    fn add_tag(&self, tag: String) -> PyResult<bool> {
        Ok(self.live()?.add_tag(tag))
    }

    #[pyo3(name = "removeTag")]
    fn remove_tag(&self, tag: &str) -> PyResult<bool> {
        Ok(self.live()?.remove_tag(tag))
    }

    fn tags(&self) -> PyResult<Vec<String>> {
        Ok(self.live()?.tags().into_iter().collect())
    }

    /// Simplices, crossings or list entries, depending on the kind.
    fn size(&self) -> PyResult<usize> {
        let packet = self.live()?;
        let payload = packet.payload();
        match &*payload {
            Payload::Triangulation(tri) => Ok(tri.size()),
            Payload::SnapPea(data) => Ok(data.triangulation.size()),
            Payload::NormalSurfaces(list) => Ok(list.len()),
            Payload::NormalHypersurfaces(list) => Ok(list.len()),
            Payload::AngleStructures(list) => Ok(list.structures().len()),
            Payload::Link(link) => Ok(link.size()),
            _ => Err(PyTypeError::new_err(format!("a {} packet has no size", packet.kind().name()))),
        }
    }

    fn __repr__(&self) -> String {
        match self.packet.upgrade() {
            Some(p) => format!("<{}.{}: {}>", ENGINE_MODULE, p.kind().name(), p.label()),
            None => "<deleted packet>".to_string(),
        }
    }

    fn __str__(&self) -> String {
        match self.packet.upgrade() {
            Some(p) => p.human_label(),
            None => "<deleted packet>".to_string(),
        }
    }

    fn __eq__(&self, other: &Bound<'_, PyPacket>) -> bool {
        sync::Weak::ptr_eq(&self.packet, &other.get().packet)
    }

    fn __hash__(&self) -> u64 {
        self.packet.as_ptr() as usize as u64
    }
}

fn engine_module(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let module = PyModule::new_bound(py, ENGINE_MODULE)?;
    module.add_class::<PyPacket>()?;
    module.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(module)
}

fn to_python(py: Python<'_>, value: &Value) -> PyResult<PyObject> {
    Ok(match value {
        Value::None => py.None(),
        Value::Bool(b) => b.to_object(py),
        Value::Int(i) => i.to_object(py),
        Value::Str(s) => s.to_object(py),
        Value::List(items) => {
            let items = items.iter().map(|item| to_python(py, item)).collect::<PyResult<Vec<_>>>()?;
            PyList::new_bound(py, items).into_any().unbind()
        },
        Value::Packet(packet) => Py::new(py, PyPacket { packet: packet.clone() })?.into_any(),
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Runs `body` with both output streams redirected into buffers. An error
/// escaping `body` is printed, traceback and all, into the error stream.
fn captured(py: Python<'_>, body: impl FnOnce() -> PyResult<()>) -> Output {
    let attempt = || -> PyResult<Output> {
        let sys = py.import_bound("sys")?;
        let string_io = py.import_bound("io")?.getattr("StringIO")?;
        let (out, err) = (string_io.call0()?, string_io.call0()?);
        let saved = (sys.getattr("stdout")?, sys.getattr("stderr")?);

        sys.setattr("stdout", &out)?;
        sys.setattr("stderr", &err)?;
        if let Err(error) = body() {
            error.display(py);
        }
        sys.setattr("stdout", saved.0)?;
        sys.setattr("stderr", saved.1)?;

        Ok(Output {
            stdout: out.call_method0("getvalue")?.extract()?,
            stderr: err.call_method0("getvalue")?.extract()?,
        })
    };

    attempt().unwrap_or_else(|error| Output { stdout: String::new(), stderr: format!("{}\n", error) })
}

fn exec(py: Python<'_>, code: &Bound<'_, PyAny>, globals: &Bound<'_, PyDict>) -> PyResult<()> {
    py.import_bound("builtins")?.getattr("exec")?.call1((code, globals))?;
    Ok(())
}

pub struct EmbeddedPython {
    globals: Py<PyDict>,
    /// Lines of a block that is still being typed.
    buffer: Vec<String>,
}

impl Default for EmbeddedPython {
    fn default() -> Self {
        EmbeddedPython::new()
    }
}

impl EmbeddedPython {
    pub fn new() -> EmbeddedPython {
        let globals = Python::with_gil(|py| {
            let globals = PyDict::new_bound(py);
            if let Err(error) = globals.set_item("__name__", "__main__") {
                tracing::warn!(%error, "could not name the session's main module");
            }
            globals.unbind()
        });
        EmbeddedPython { globals, buffer: Vec::new() }
    }
}

impl Interpreter for EmbeddedPython {
    fn import_engine(&mut self) -> Result<(), String> {
        Python::with_gil(|py| -> PyResult<()> {
            let module = engine_module(py)?;
            py.import_bound("sys")?.getattr("modules")?.set_item(ENGINE_MODULE, &module)?;
            let globals = self.globals.bind(py);
            globals.set_item(ENGINE_MODULE, &module)?;
            py.run_bound(&format!("from {} import *", ENGINE_MODULE), Some(globals), None)
        })
        .map_err(|error| error.to_string())
    }

    fn set_variable(&mut self, name: &str, value: Value) -> Result<(), String> {
        if !is_identifier(name) {
            return Err(format!("{} is not a valid Python identifier", name));
        }
        Python::with_gil(|py| -> PyResult<()> {
            let object = to_python(py, &value)?;
            self.globals.bind(py).set_item(name, object)
        })
        .map_err(|error| error.to_string())
    }

    /* the same buffering as the standard library's interactive console:
     * keep the lines of an unfinished block and retry the whole source */
    fn push_line(&mut self, line: &str) -> Execution {
        self.buffer.push(line.to_string());
        let source = self.buffer.join("\n");

        let _streams = STREAMS.lock();
        let execution = Python::with_gil(|py| {
            let globals = self.globals.bind(py);
            let compiled = py.import_bound("codeop")
                .and_then(|codeop| codeop.getattr("compile_command")?.call1((source.as_str(), "<console>", "single")));
            match compiled {
                Ok(code) if code.is_none() => Execution::Incomplete,
                Ok(code) => Execution::Complete(captured(py, || exec(py, &code, globals))),
                Err(error) => Execution::Complete(captured(py, || Err(error))),
            }
        });

        if let Execution::Complete(_) = execution {
            self.buffer.clear();
        }
        execution
    }

    fn run(&mut self, code: &str) -> Output {
        self.buffer.clear();
        let _streams = STREAMS.lock();
        Python::with_gil(|py| {
            let globals = self.globals.bind(py);
            captured(py, || py.run_bound(code, Some(globals), None))
        })
    }

    fn completions(&self, text: &str) -> Vec<String> {
        Python::with_gil(|py| -> PyResult<Vec<String>> {
            let completer = py.import_bound("rlcompleter")?.getattr("Completer")?.call1((self.globals.bind(py).clone(),))?;
            let mut found = Vec::new();
            for state in 0usize.. {
                let candidate = completer.call_method1("complete", (text, state))?;
                if candidate.is_none() {
                    break;
                }
                /* rlcompleter decorates callables and keywords */
                let candidate: String = candidate.extract()?;
                found.push(candidate.trim_end_matches(|c: char| !(c.is_alphanumeric() || c == '_')).to_string());
            }
            Ok(found)
        })
        .unwrap_or_else(|error| {
            tracing::debug!(%error, text, "completion failed");
            Vec::new()
        })
    }
}
