//! The mathematical engine, seen from the user interface.
//!
//! The interface never does topology itself. It hands payloads to an
//! [Engine] and displays whatever comes back. Every operation has a default
//! body that reports [EngineError::Unsupported], so an engine advertises what
//! it can do simply by overriding methods.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync;

use crate::model::link::Link;
use crate::model::packet::{PacketRef, SnapPeaData};
use crate::model::polynomial::{Invariant, Polynomial};
use crate::model::progress::ProgressTracker;
use crate::model::surfaces::{AngleStructureList, HyperCoords, ListFlags, NormalCoords, NormalHypersurfaceList, NormalSurfaceList};
use crate::model::triangulation::{Skeleton, Triangulation};

pub mod basic;
pub mod graph;
pub mod skeleton;
pub mod snappea;
pub mod xml;

#[derive(Debug)]
pub enum EngineError {
    /// This engine does not provide the operation.
    Unsupported(&'static str),
    Failed(String),
    /// The progress tracker was cancelled before the work finished.
    Cancelled,
    Io { path: PathBuf, error: io::Error },
    Parse { path: PathBuf, line: Option<usize>, message: String },
    /// The engine ran but produced nothing.
    NoResult,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Unsupported(what) => write!(f, "the engine does not support {}", what),
            EngineError::Failed(message) => write!(f, "{}", message),
            EngineError::Cancelled => write!(f, "the operation was cancelled"),
            EngineError::Io { path, error } => write!(f, "{}: {}", path.display(), error),
            EngineError::Parse { path, line: Some(line), message } => write!(f, "{}:{}: {}", path.display(), line, message),
            EngineError::Parse { path, line: None, message } => write!(f, "{}: {}", path.display(), message),
            EngineError::NoResult => write!(f, "the engine returned no result"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Local modifications of a 3-manifold triangulation that preserve the
/// underlying manifold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    ThreeTwo,
    TwoThree,
    OneFour,
    FourFour,
    TwoZeroEdge,
    TwoZeroVertex,
    TwoOne,
    OpenBook,
    CloseBook,
    ShellBoundary,
    CollapseEdge,
}

/// The kind of face a [Move] is performed about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveElement {
    Vertex,
    Edge,
    Triangle,
    Tetrahedron,
}

impl Move {
    pub const ALL: [Move; 11] = [
        Move::ThreeTwo,
        Move::TwoThree,
        Move::OneFour,
        Move::FourFour,
        Move::TwoZeroEdge,
        Move::TwoZeroVertex,
        Move::TwoOne,
        Move::OpenBook,
        Move::CloseBook,
        Move::ShellBoundary,
        Move::CollapseEdge,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Move::ThreeTwo => "3-2",
            Move::TwoThree => "2-3",
            Move::OneFour => "1-4",
            Move::FourFour => "4-4",
            Move::TwoZeroEdge => "2-0 (edge)",
            Move::TwoZeroVertex => "2-0 (vertex)",
            Move::TwoOne => "2-1",
            Move::OpenBook => "Open book",
            Move::CloseBook => "Close book",
            Move::ShellBoundary => "Shell boundary",
            Move::CollapseEdge => "Collapse edge",
        }
    }

    pub fn element(&self) -> MoveElement {
        match self {
            Move::ThreeTwo | Move::FourFour | Move::TwoZeroEdge | Move::TwoOne | Move::CloseBook | Move::CollapseEdge => MoveElement::Edge,
            Move::TwoZeroVertex => MoveElement::Vertex,
            Move::TwoThree | Move::OpenBook => MoveElement::Triangle,
            Move::OneFour | Move::ShellBoundary => MoveElement::Tetrahedron,
        }
    }

    /// How many elements of the right kind a triangulation offers.
    pub fn element_count(&self, tri: &Triangulation, skeleton: &Skeleton) -> usize {
        match self.element() {
            MoveElement::Vertex => skeleton.vertices.len(),
            MoveElement::Edge => skeleton.edges.len(),
            MoveElement::Triangle => skeleton.triangles.len(),
            MoveElement::Tetrahedron => tri.size(),
        }
    }
}

pub type SharedEngine = sync::Arc<dyn Engine>;

pub trait Engine: Send + Sync {
    fn name(&self) -> &'static str;

    /* data files */

    fn open(&self, _path: &Path) -> Result<PacketRef, EngineError> {
        Err(EngineError::Unsupported("reading data files"))
    }

    fn save(&self, _packet: &PacketRef, _path: &Path) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("writing data files"))
    }

    /* triangulations */

    fn skeleton(&self, _tri: &Triangulation) -> Result<Skeleton, EngineError> {
        Err(EngineError::Unsupported("skeletal computations"))
    }

    /// Returns whether the triangulation was changed.
    fn simplify(&self, _tri: &mut Triangulation) -> Result<bool, EngineError> {
        Err(EngineError::Unsupported("simplification"))
    }

    fn simplify_exhaustive(&self, _tri: &mut Triangulation, _height: usize, _threads: usize, _tracker: &ProgressTracker) -> Result<bool, EngineError> {
        Err(EngineError::Unsupported("exhaustive simplification"))
    }

    fn orient(&self, _tri: &mut Triangulation) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("orientation"))
    }

    fn reflect(&self, _tri: &mut Triangulation) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("reflection"))
    }

    fn barycentric_subdivide(&self, _tri: &mut Triangulation) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("barycentric subdivision"))
    }

    fn ideal_to_finite(&self, _tri: &mut Triangulation) -> Result<bool, EngineError> {
        Err(EngineError::Unsupported("truncating ideal vertices"))
    }

    fn finite_to_ideal(&self, _tri: &mut Triangulation) -> Result<bool, EngineError> {
        Err(EngineError::Unsupported("coning boundary components"))
    }

    fn double_cover(&self, _tri: &Triangulation) -> Result<Triangulation, EngineError> {
        Err(EngineError::Unsupported("orientable double covers"))
    }

    fn split_into_components(&self, _tri: &Triangulation) -> Result<Vec<Triangulation>, EngineError> {
        Err(EngineError::Unsupported("splitting into components"))
    }

    fn summands(&self, _tri: &Triangulation, _tracker: &ProgressTracker) -> Result<Vec<Triangulation>, EngineError> {
        Err(EngineError::Unsupported("connected sum decomposition"))
    }

    /// Replaces `tri` with its connected sum with `other`.
    fn connected_sum(&self, _tri: &mut Triangulation, _other: &Triangulation) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("connected sums"))
    }

    /// Returns whether the triangulation was changed.
    fn make_zero_efficient(&self, _tri: &mut Triangulation) -> Result<bool, EngineError> {
        Err(EngineError::Unsupported("0-efficiency"))
    }

    fn iso_sig(&self, _tri: &Triangulation) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("isomorphism signatures"))
    }

    fn from_iso_sig(&self, _dim: usize, _sig: &str) -> Result<Triangulation, EngineError> {
        Err(EngineError::Unsupported("isomorphism signatures"))
    }

    fn dehydrate(&self, _tri: &Triangulation) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("dehydration strings"))
    }

    fn rehydrate(&self, _text: &str) -> Result<Triangulation, EngineError> {
        Err(EngineError::Unsupported("dehydration strings"))
    }

    fn is_isomorphic(&self, _a: &Triangulation, _b: &Triangulation) -> Result<bool, EngineError> {
        Err(EngineError::Unsupported("isomorphism testing"))
    }

    fn move_legal(&self, _tri: &Triangulation, _mv: Move, _element: usize) -> Result<bool, EngineError> {
        Err(EngineError::Unsupported("elementary moves"))
    }

    fn apply_move(&self, _tri: &mut Triangulation, _mv: Move, _element: usize) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("elementary moves"))
    }

    /// The elements about which `mv` may legally be performed.
    fn move_candidates(&self, tri: &Triangulation, skeleton: &Skeleton, mv: Move) -> Result<Vec<usize>, EngineError> {
        let mut candidates = Vec::new();
        for element in 0..mv.element_count(tri, skeleton) {
            if self.move_legal(tri, mv, element)? {
                candidates.push(element);
            }
        }
        Ok(candidates)
    }

    fn dual_graph_dot(&self, _tri: &Triangulation, _labels: bool) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("dual graphs"))
    }

    fn tree_decomposition_dot(&self, _tri: &Triangulation, _nice: bool) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("tree decompositions"))
    }

    /// Matveev's 3-manifold recogniser input format.
    fn recogniser(&self, _tri: &Triangulation) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("3-manifold recogniser output"))
    }

    /// C++ source that rebuilds the triangulation.
    fn source(&self, _tri: &Triangulation, _name: &str) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("C++ source output"))
    }

    fn read_orb(&self, _text: &str) -> Result<Triangulation, EngineError> {
        Err(EngineError::Unsupported("Orb / Casson files"))
    }

    fn write_orb(&self, _tri: &Triangulation, _name: &str) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("Orb / Casson files"))
    }

    fn enumerate_surfaces(&self, _tri: &Triangulation, _coords: NormalCoords, _flags: ListFlags, _threads: usize, _tracker: &ProgressTracker) -> Result<NormalSurfaceList, EngineError> {
        Err(EngineError::Unsupported("normal surface enumeration"))
    }

    fn enumerate_hypersurfaces(&self, _tri: &Triangulation, _coords: HyperCoords, _flags: ListFlags, _threads: usize, _tracker: &ProgressTracker) -> Result<NormalHypersurfaceList, EngineError> {
        Err(EngineError::Unsupported("normal hypersurface enumeration"))
    }

    fn enumerate_angles(&self, _tri: &Triangulation, _taut_only: bool, _tracker: &ProgressTracker) -> Result<AngleStructureList, EngineError> {
        Err(EngineError::Unsupported("angle structure enumeration"))
    }

    /* SnapPea */

    fn snappea_from_native(&self, _tri: &Triangulation) -> Result<SnapPeaData, EngineError> {
        Err(EngineError::Unsupported("SnapPea triangulations"))
    }

    fn snappea_to_native(&self, _data: &SnapPeaData) -> Result<Triangulation, EngineError> {
        Err(EngineError::Unsupported("SnapPea triangulations"))
    }

    fn snappea_randomise(&self, _data: &mut SnapPeaData) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("SnapPea randomisation"))
    }

    fn snappea_canonize(&self, _data: &SnapPeaData) -> Result<Triangulation, EngineError> {
        Err(EngineError::Unsupported("canonical retriangulation"))
    }

    /// The link of one cusp, as a 2-dimensional triangulation.
    fn snappea_vertex_link(&self, _data: &SnapPeaData, _cusp: usize) -> Result<Triangulation, EngineError> {
        Err(EngineError::Unsupported("SnapPea vertex links"))
    }

    fn read_snappea(&self, _text: &str) -> Result<SnapPeaData, EngineError> {
        Err(EngineError::Unsupported("SnapPea files"))
    }

    fn write_snappea(&self, _data: &SnapPeaData, _name: &str) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("SnapPea files"))
    }

    /* links */

    fn polynomial(&self, _link: &Link, _invariant: Invariant, _threads: usize, _tracker: Option<&ProgressTracker>) -> Result<Polynomial, EngineError> {
        Err(EngineError::Unsupported("this polynomial invariant"))
    }

    fn knot_sig(&self, _link: &Link) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("knot signatures"))
    }

    /// Parses any of the text codes the engine understands.
    fn link_from_code(&self, _code: &str) -> Result<Link, EngineError> {
        Err(EngineError::Unsupported("link codes"))
    }

    fn link_tree_decomposition_dot(&self, _link: &Link, _nice: bool) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("tree decompositions"))
    }
}
