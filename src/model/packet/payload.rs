use std::fmt;
use std::sync;

use crate::model::link::Link;
use crate::model::packet::{Packet, PacketRef};
use crate::model::surfaces::{AngleStructureList, NormalHypersurfaceList, NormalSurfaceList, SurfaceFilter};
use crate::model::triangulation::Triangulation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PacketKind {
    Container,
    Triangulation2,
    Triangulation3,
    Triangulation4,
    SnapPea,
    NormalSurfaces,
    NormalHypersurfaces,
    AngleStructures,
    SurfaceFilter,
    Link,
    Text,
    Pdf,
    Script,
}

impl PacketKind {
    pub const ALL: [PacketKind; 13] = [
        PacketKind::Container,
        PacketKind::Triangulation2,
        PacketKind::Triangulation3,
        PacketKind::Triangulation4,
        PacketKind::SnapPea,
        PacketKind::NormalSurfaces,
        PacketKind::NormalHypersurfaces,
        PacketKind::AngleStructures,
        PacketKind::SurfaceFilter,
        PacketKind::Link,
        PacketKind::Text,
        PacketKind::Pdf,
        PacketKind::Script,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PacketKind::Container => "Container",
            PacketKind::Triangulation2 => "2-D triangulation",
            PacketKind::Triangulation3 => "3-D triangulation",
            PacketKind::Triangulation4 => "4-D triangulation",
            PacketKind::SnapPea => "SnapPea triangulation",
            PacketKind::NormalSurfaces => "Normal surface list",
            PacketKind::NormalHypersurfaces => "Normal hypersurface list",
            PacketKind::AngleStructures => "Angle structure list",
            PacketKind::SurfaceFilter => "Surface filter",
            PacketKind::Link => "Link",
            PacketKind::Text => "Text",
            PacketKind::Pdf => "PDF",
            PacketKind::Script => "Script",
        }
    }

    pub fn triangulation_dim(&self) -> Option<usize> {
        match self {
            PacketKind::Triangulation2 => Some(2),
            PacketKind::Triangulation3 => Some(3),
            PacketKind::Triangulation4 => Some(4),
            _ => None,
        }
    }

    pub fn triangulation_of_dim(dim: usize) -> PacketKind {
        match dim {
            2 => PacketKind::Triangulation2,
            4 => PacketKind::Triangulation4,
            _ => PacketKind::Triangulation3,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A triangulation that the SnapPea kernel would hold, kept separately from
/// native triangulations so that SnapPea-specific operations can be offered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapPeaData {
    pub triangulation: Triangulation,
}

#[derive(Clone, Debug)]
pub struct ScriptVariable {
    pub name: String,
    pub value: Option<sync::Weak<Packet>>,
}

impl ScriptVariable {
    pub fn resolve(&self) -> Option<PacketRef> {
        self.value.as_ref().and_then(sync::Weak::upgrade)
    }
}

impl PartialEq for ScriptVariable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && match (&self.value, &other.value) {
            (None, None) => true,
            (Some(a), Some(b)) => sync::Weak::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A Python script together with its table of named packet references,
/// which are injected into the interpreter before the script runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Script {
    pub text: String,
    /* sorted by name */
    variables: Vec<ScriptVariable>,
}

impl Script {
    pub fn new(text: String) -> Script {
        Script { text, variables: Vec::new() }
    }

    pub fn variables(&self) -> &[ScriptVariable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&ScriptVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Adds a variable. Returns false, leaving the table untouched, if a
    /// variable with this name already exists.
    pub fn add_variable(&mut self, name: String, value: Option<&PacketRef>) -> bool {
        match self.variables.binary_search_by(|v| v.name.as_str().cmp(&name)) {
            Ok(_) => false,
            Err(index) => {
                self.variables.insert(index, ScriptVariable { name, value: value.map(sync::Arc::downgrade) });
                true
            },
        }
    }

    /// Adds a variable, appending a numeric suffix to the name if needed to
    /// keep names unique. Returns the name actually used.
    pub fn add_variable_unique(&mut self, name: &str, value: Option<&PacketRef>) -> String {
        let mut candidate = name.to_string();
        let mut suffix = 2;
        while self.variable(&candidate).is_some() {
            candidate = format!("{}{}", name, suffix);
            suffix+= 1;
        }
        self.add_variable(candidate.clone(), value);
        candidate
    }

    pub fn remove_variable(&mut self, name: &str) -> bool {
        let before = self.variables.len();
        self.variables.retain(|v| v.name != name);
        self.variables.len() != before
    }

    pub fn set_variable_value(&mut self, name: &str, value: Option<&PacketRef>) -> bool {
        match self.variables.iter_mut().find(|v| v.name == name) {
            Some(variable) => {
                variable.value = value.map(sync::Arc::downgrade);
                true
            },
            None => false,
        }
    }

    pub fn set_variable_name(&mut self, old: &str, new: String) -> bool {
        if old == new {
            return self.variable(old).is_some();
        }
        if self.variable(&new).is_some() {
            return false;
        }
        let Some(position) = self.variables.iter().position(|v| v.name == old) else { return false };
        let variable = self.variables.remove(position);
        self.add_variable(new, variable.resolve().as_ref())
    }

    pub(crate) fn remap_variables(&mut self, remap: impl Fn(&PacketRef) -> Option<PacketRef>) {
        for variable in self.variables.iter_mut() {
            if let Some(new_target) = variable.resolve().and_then(|p| remap(&p)) {
                variable.value = Some(sync::Arc::downgrade(&new_target));
            }
        }
    }
}

/// Kind-specific state of a packet.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Container,
    Triangulation(Triangulation),
    SnapPea(SnapPeaData),
    NormalSurfaces(NormalSurfaceList),
    NormalHypersurfaces(NormalHypersurfaceList),
    AngleStructures(AngleStructureList),
    SurfaceFilter(SurfaceFilter),
    Link(Link),
    Text(String),
    Pdf(Vec<u8>),
    Script(Script),
}

impl Payload {
    pub fn kind(&self) -> PacketKind {
        match self {
            Payload::Container => PacketKind::Container,
            Payload::Triangulation(tri) => PacketKind::triangulation_of_dim(tri.dim()),
            Payload::SnapPea(_) => PacketKind::SnapPea,
            Payload::NormalSurfaces(_) => PacketKind::NormalSurfaces,
            Payload::NormalHypersurfaces(_) => PacketKind::NormalHypersurfaces,
            Payload::AngleStructures(_) => PacketKind::AngleStructures,
            Payload::SurfaceFilter(_) => PacketKind::SurfaceFilter,
            Payload::Link(_) => PacketKind::Link,
            Payload::Text(_) => PacketKind::Text,
            Payload::Pdf(_) => PacketKind::Pdf,
            Payload::Script(_) => PacketKind::Script,
        }
    }

    /// Whether this kind of packet may hold children that depend on it (a
    /// triangulation owning its surface lists, for instance).
    pub fn can_have_dependents(&self) -> bool {
        matches!(self, Payload::Container | Payload::Triangulation(_) | Payload::SnapPea(_))
    }
}

/// Typed access to one variant of [Payload].
pub trait PayloadVariant: Sized + Clone {
    fn kind_matches(kind: PacketKind) -> bool;
    fn get(payload: &Payload) -> Option<&Self>;
    fn get_mut(payload: &mut Payload) -> Option<&mut Self>;
    fn into_payload(self) -> Payload;
}

macro_rules! payload_variant {
    ($type:ty, $variant:ident, $($kind:ident)|+) => {
        impl PayloadVariant for $type {
            fn kind_matches(kind: PacketKind) -> bool {
                matches!(kind, $(PacketKind::$kind)|+)
            }

            fn get(payload: &Payload) -> Option<&Self> {
                match payload {
                    Payload::$variant(x) => Some(x),
                    _ => None,
                }
            }

            fn get_mut(payload: &mut Payload) -> Option<&mut Self> {
                match payload {
                    Payload::$variant(x) => Some(x),
                    _ => None,
                }
            }

            fn into_payload(self) -> Payload {
                Payload::$variant(self)
            }
        }
    };
}

payload_variant!(Triangulation, Triangulation, Triangulation2 | Triangulation3 | Triangulation4);
payload_variant!(SnapPeaData, SnapPea, SnapPea);
payload_variant!(NormalSurfaceList, NormalSurfaces, NormalSurfaces);
payload_variant!(NormalHypersurfaceList, NormalHypersurfaces, NormalHypersurfaces);
payload_variant!(AngleStructureList, AngleStructures, AngleStructures);
payload_variant!(SurfaceFilter, SurfaceFilter, SurfaceFilter);
payload_variant!(Link, Link, Link);
payload_variant!(String, Text, Text);
payload_variant!(Vec<u8>, Pdf, Pdf);
payload_variant!(Script, Script, Script);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_dimension() {
        assert_eq!(Payload::Triangulation(Triangulation::new(2)).kind(), PacketKind::Triangulation2);
        assert_eq!(Payload::Triangulation(Triangulation::new(4)).kind(), PacketKind::Triangulation4);
        assert!(Triangulation::kind_matches(PacketKind::Triangulation3));
        assert!(!String::kind_matches(PacketKind::Script));
    }

    #[test]
    fn script_variable_names_stay_unique() {
        let mut script = Script::new("print(x)".into());
        assert!(script.add_variable("x".into(), None));
        assert!(!script.add_variable("x".into(), None));
        assert_eq!(script.add_variable_unique("x", None), "x2");
        assert!(script.set_variable_name("x2", "a".into()));
        let names: Vec<&str> = script.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "x"]);
        assert!(!script.set_variable_name("a", "x".into()));
        assert!(script.remove_variable("a"));
        assert!(!script.remove_variable("a"));
    }
}
