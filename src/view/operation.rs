//! Everything a menu can do to the packet tree.
//!
//! An [Operation] is checked with [Operation::precheck] before anything is
//! touched, which is what lets menus grey themselves out and lets refusals
//! leave the document exactly as it was. [Operation::execute] re-runs the
//! precheck, then does the work, handing anything slow to a [Runner].

use std::sync;

use crate::engine::{Move, SharedEngine};
use crate::io::Handler;
use crate::model::packet::{PacketKind, PacketRef};
use crate::model::polynomial::Invariant;
use crate::model::preferences::{Preferences, PreferencesStore};
use crate::view::error::{Action, Error};
use crate::view::interaction::{Interaction, MessageKind};
use crate::view::runner::Runner;

pub mod census;
pub mod create;
pub mod link;
pub mod snappea;
pub mod transfer;
pub mod tree;
pub mod triangulation;

/// Ways of moving a packet among its siblings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    Up,
    Down,
    /// By the tree jump size.
    JumpUp,
    JumpDown,
    First,
    Last,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriangulationOp {
    Simplify,
    Orient,
    Reflect,
    Barycentric,
    IdealToFinite,
    FiniteToIdeal,
    DoubleCover,
    SplitIntoComponents,
    ConnectedSumWith,
    ConnectedSumDecomposition,
    MakeZeroEfficient,
    ToSnapPea,
}

impl TriangulationOp {
    pub fn name(&self) -> &'static str {
        match self {
            TriangulationOp::Simplify => "Simplify",
            TriangulationOp::Orient => "Orient",
            TriangulationOp::Reflect => "Reflect",
            TriangulationOp::Barycentric => "Barycentric subdivision",
            TriangulationOp::IdealToFinite => "Truncate ideal vertices",
            TriangulationOp::FiniteToIdeal => "Make ideal",
            TriangulationOp::DoubleCover => "Double cover",
            TriangulationOp::SplitIntoComponents => "Extract components",
            TriangulationOp::ConnectedSumWith => "Connected sum",
            TriangulationOp::ConnectedSumDecomposition => "Connected sum decomposition",
            TriangulationOp::MakeZeroEfficient => "Make 0-efficient",
            TriangulationOp::ToSnapPea => "Convert to SnapPea",
        }
    }

    /// Operations that make sense in any dimension.
    pub fn any_dimension(&self) -> bool {
        matches!(self,
                 TriangulationOp::Simplify |
                 TriangulationOp::Orient |
                 TriangulationOp::Reflect |
                 TriangulationOp::Barycentric |
                 TriangulationOp::DoubleCover |
                 TriangulationOp::SplitIntoComponents)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapPeaOp {
    Randomise,
    Canonize,
    VertexLink { cusp: usize },
    ToNative,
}

impl SnapPeaOp {
    pub fn name(&self) -> &'static str {
        match self {
            SnapPeaOp::Randomise => "Randomise",
            SnapPeaOp::Canonize => "Canonical retriangulation",
            SnapPeaOp::VertexLink { .. } => "Vertex link",
            SnapPeaOp::ToNative => "Convert to Regina",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Clone { subtree: bool },
    Rename,
    Delete,
    Move(Motion),
    NewPacket(PacketKind),
    Import(Handler),
    Export(Handler),
    Triangulation(TriangulationOp),
    ElementaryMove(Move, usize),
    CensusLookup,
    SnapPea(SnapPeaOp),
    ComputeInvariant(Invariant),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Clone { subtree: false } => "Clone packet",
            Operation::Clone { subtree: true } => "Clone subtree",
            Operation::Rename => "Rename",
            Operation::Delete => "Delete",
            Operation::Move(Motion::Up) => "Move up",
            Operation::Move(Motion::Down) => "Move down",
            Operation::Move(Motion::JumpUp) => "Jump up",
            Operation::Move(Motion::JumpDown) => "Jump down",
            Operation::Move(Motion::First) => "Move to top",
            Operation::Move(Motion::Last) => "Move to bottom",
            Operation::NewPacket(_) => "New packet",
            Operation::Import(_) => "Import",
            Operation::Export(_) => "Export",
            Operation::Triangulation(op) => op.name(),
            Operation::ElementaryMove(..) => "Elementary move",
            Operation::CensusLookup => "Census lookup",
            Operation::SnapPea(op) => op.name(),
            Operation::ComputeInvariant(invariant) => invariant.name(),
        }
    }

    fn action(&self) -> Action {
        match self {
            Operation::Clone { .. } => Action::ClonePacket,
            Operation::Rename => Action::RenamePacket,
            Operation::Delete => Action::DeletePacket,
            Operation::Move(_) => Action::MovePacket,
            Operation::NewPacket(_) => Action::NewPacket,
            Operation::Import(_) => Action::Import,
            Operation::Export(_) => Action::Export,
            Operation::Triangulation(op) => Action::TriangulationOperation(op.name()),
            Operation::ElementaryMove(..) => Action::ElementaryMove,
            Operation::CensusLookup => Action::CensusLookup,
            Operation::SnapPea(op) => Action::SnapPeaOperation(op.name()),
            Operation::ComputeInvariant(_) => Action::ComputeInvariant,
        }
    }

    /// Decides whether the operation can run on `packet`, without changing
    /// anything.
    pub fn precheck(&self, cx: &OpContext, packet: Option<&PacketRef>) -> Result<(), Error> {
        let action = self.action();
        match self {
            Operation::NewPacket(kind) => create::precheck(*kind, packet, action),
            Operation::Import(handler) => transfer::precheck_import(handler, action),
            Operation::Export(handler) => transfer::precheck_export(handler, selected(packet, action)?, action),
            Operation::Clone { .. } | Operation::Rename | Operation::Delete | Operation::Move(_) => {
                tree::precheck(selected(packet, action)?, action)
            },
            Operation::Triangulation(op) => triangulation::precheck(cx, *op, selected(packet, action)?, action),
            Operation::ElementaryMove(mv, element) => triangulation::precheck_move(cx, *mv, *element, selected(packet, action)?, action),
            Operation::CensusLookup => census::precheck(selected(packet, action)?, action),
            Operation::SnapPea(op) => snappea::precheck(cx, *op, selected(packet, action)?, action),
            Operation::ComputeInvariant(_) => link::precheck(selected(packet, action)?, action),
        }
    }

    pub fn execute(&self, cx: &OpContext, packet: Option<&PacketRef>) -> Result<Done, Error> {
        let label = packet.map(|p| p.human_label()).unwrap_or_default();
        if let Err(error) = self.precheck(cx, packet) {
            tracing::info!(operation = self.name(), packet = %label, message = %error.message(), "operation refused");
            return Err(error);
        }

        let action = self.action();
        let result = match (self, packet) {
            (Operation::NewPacket(kind), _) => create::execute(cx, *kind, packet, action),
            (Operation::Import(handler), _) => transfer::import(cx, handler, packet, action),
            (Operation::Export(handler), Some(packet)) => transfer::export(cx, handler, packet, action),
            (Operation::Clone { subtree }, Some(packet)) => tree::clone(packet, *subtree, action),
            (Operation::Rename, Some(packet)) => tree::rename(cx, packet),
            (Operation::Delete, Some(packet)) => tree::delete(cx, packet),
            (Operation::Move(motion), Some(packet)) => tree::motion(cx, packet, *motion),
            (Operation::Triangulation(op), Some(packet)) => triangulation::execute(cx, *op, packet, action),
            (Operation::ElementaryMove(mv, element), Some(packet)) => triangulation::elementary_move(cx, *mv, *element, packet, action),
            (Operation::CensusLookup, Some(packet)) => census::lookup(cx, packet, action),
            (Operation::SnapPea(op), Some(packet)) => snappea::execute(cx, *op, packet, action),
            (Operation::ComputeInvariant(invariant), Some(packet)) => link::compute(cx, *invariant, packet, action),
            (_, None) => Err(nothing_selected(action)),
        };

        match &result {
            Ok(done) => tracing::info!(operation = self.name(), packet = %label, modified = done.modified, "operation executed"),
            Err(error) => tracing::warn!(operation = self.name(), packet = %label, message = %error.message(), "operation failed"),
        }
        result
    }
}

/// What an operation needs from the window that runs it.
pub struct OpContext<'a> {
    pub engine: &'a SharedEngine,
    pub prefs: &'a PreferencesStore,
    pub interaction: &'a dyn Interaction,
    pub runtime: tokio::runtime::Handle,
    pub root: &'a PacketRef,
}

impl<'a> OpContext<'a> {
    pub fn runner(&self) -> Runner<'a> {
        Runner::new(self.runtime.clone(), self.interaction)
    }

    pub fn preferences(&self) -> sync::Arc<Preferences> {
        self.prefs.get()
    }
}

/// Something to tell the user once an operation has finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: MessageKind,
    pub text: String,
    pub detail: Option<String>,
}

impl Notice {
    pub fn info(text: impl Into<String>, detail: Option<&str>) -> Notice {
        Notice { kind: MessageKind::Information, text: text.into(), detail: detail.map(str::to_string) }
    }

    pub fn sorry(text: impl Into<String>, detail: Option<&str>) -> Notice {
        Notice { kind: MessageKind::Sorry, text: text.into(), detail: detail.map(str::to_string) }
    }
}

#[derive(Debug, Default)]
pub struct Done {
    /// Whether the document changed.
    pub modified: bool,
    /// A packet the tree should select, usually one the operation created.
    pub select: Option<PacketRef>,
    pub notices: Vec<Notice>,
}

impl Done {
    pub fn nothing() -> Done {
        Done::default()
    }

    pub fn modified() -> Done {
        Done { modified: true, ..Done::default() }
    }

    pub fn selecting(packet: PacketRef) -> Done {
        Done { modified: true, select: Some(packet), notices: Vec::new() }
    }

    pub fn with_notice(mut self, notice: Notice) -> Done {
        self.notices.push(notice);
        self
    }
}

fn nothing_selected(action: Action) -> Error {
    Error::refused(action, "Please select a packet to work with.", None)
}

/// The selected packet, as long as it is not the hidden root.
fn selected(packet: Option<&PacketRef>, action: Action) -> Result<&PacketRef, Error> {
    match packet {
        Some(packet) if !packet.is_root() => Ok(packet),
        _ => Err(nothing_selected(action)),
    }
}

/// Where packets derived from `packet` go: directly beneath it, or in a new
/// container beneath it if it already has children.
fn derived_base(packet: &PacketRef, adornment: &str) -> Result<PacketRef, crate::model::packet::PacketError> {
    if packet.has_children() {
        let base = crate::model::packet::Packet::container(packet.adorned_label(adornment));
        packet.append(base.clone())?;
        Ok(base)
    } else {
        Ok(packet.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use crate::engine::basic::BasicEngine;
    use crate::model::packet::{Packet, Payload};
    use crate::view::interaction::Unattended;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap()
    }

    #[test]
    fn operations_need_a_real_selection() {
        let rt = runtime();
        let engine: SharedEngine = sync::Arc::new(BasicEngine);
        let prefs = PreferencesStore::new();
        let root = Packet::container("");
        let cx = OpContext { engine: &engine, prefs: &prefs, interaction: &Unattended, runtime: rt.handle().clone(), root: &root };

        let error = Operation::Clone { subtree: false }.execute(&cx, Some(&root)).unwrap_err();
        assert_eq!(error.message(), "Please select a packet to work with.");
        assert_matches!(Operation::Rename.precheck(&cx, None), Err(_));
    }

    #[test]
    fn derived_packets_nest_when_needed() {
        let tri = Packet::new("T", Payload::Triangulation(crate::model::triangulation::Triangulation::new(3)));
        let base = derived_base(&tri, "Components").unwrap();
        assert!(sync::Arc::ptr_eq(&base, &tri));

        tri.append(Packet::container("Existing")).unwrap();
        let base = derived_base(&tri, "Components").unwrap();
        assert_eq!(base.label(), "T (Components)");
        assert_eq!(tri.count_children(), 2);
    }
}
