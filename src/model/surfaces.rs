//! Normal surface, normal hypersurface and angle structure lists, plus the
//! surface filters that select from them.
//!
//! Surface vectors are always stored in the list's storage layout: 7 entries
//! per tetrahedron (4 triangles, 3 quads), 10 when almost normal octagons are
//! admitted, or 14 when transverse orientations are tracked (each standard
//! entry split into its two orientations).

use std::collections::BTreeSet;

pub mod coordinates;

use crate::model::triangulation::Triangulation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NormalCoords {
    Standard,
    AlmostNormal,
    Quad,
    QuadOct,
    EdgeWeight,
    TriangleArcs,
    Oriented,
    OrientedQuad,
}

impl NormalCoords {
    pub const ALL: [NormalCoords; 8] = [
        NormalCoords::Standard,
        NormalCoords::AlmostNormal,
        NormalCoords::Quad,
        NormalCoords::QuadOct,
        NormalCoords::EdgeWeight,
        NormalCoords::TriangleArcs,
        NormalCoords::Oriented,
        NormalCoords::OrientedQuad,
    ];

    pub fn name(&self, capitalise: bool) -> &'static str {
        let (upper, lower) = match self {
            NormalCoords::Standard => ("Standard normal (tri-quad)", "standard normal (tri-quad)"),
            NormalCoords::AlmostNormal => ("Standard almost normal (tri-quad-oct)", "standard almost normal (tri-quad-oct)"),
            NormalCoords::Quad => ("Quad normal", "quad normal"),
            NormalCoords::QuadOct => ("Quad-oct almost normal", "quad-oct almost normal"),
            NormalCoords::EdgeWeight => ("Edge weight", "edge weight"),
            NormalCoords::TriangleArcs => ("Triangle arc", "triangle arc"),
            NormalCoords::Oriented => ("Transversely oriented normal", "transversely oriented normal"),
            NormalCoords::OrientedQuad => ("Transversely oriented quad normal", "transversely oriented quad normal"),
        };
        if capitalise { upper } else { lower }
    }

    pub fn adjective(&self, capitalise: bool) -> &'static str {
        let (upper, lower) = match self {
            NormalCoords::Standard => ("Standard", "standard"),
            NormalCoords::AlmostNormal => ("Almost normal", "almost normal"),
            NormalCoords::Quad => ("Quad", "quad"),
            NormalCoords::QuadOct => ("Quad-oct", "quad-oct"),
            NormalCoords::EdgeWeight => ("Edge weight", "edge weight"),
            NormalCoords::TriangleArcs => ("Triangle arc", "triangle arc"),
            NormalCoords::Oriented => ("Transversely oriented", "transversely oriented"),
            NormalCoords::OrientedQuad => ("Transversely oriented quad", "transversely oriented quad"),
        };
        if capitalise { upper } else { lower }
    }

    /// Whether enumerating in this system produces almost normal surfaces.
    pub fn generates_almost_normal(&self) -> bool {
        matches!(self, NormalCoords::AlmostNormal | NormalCoords::QuadOct)
    }

    pub fn is_oriented(&self) -> bool {
        matches!(self, NormalCoords::Oriented | NormalCoords::OrientedQuad)
    }

    /// Whether surfaces may be enumerated in this system, as opposed to only
    /// being viewed in it.
    pub fn is_enumerable(&self) -> bool {
        !matches!(self, NormalCoords::EdgeWeight | NormalCoords::TriangleArcs)
    }

    pub fn key(&self) -> &'static str {
        match self {
            NormalCoords::Standard => "Standard",
            NormalCoords::AlmostNormal => "AlmostNormal",
            NormalCoords::Quad => "Quad",
            NormalCoords::QuadOct => "QuadOct",
            NormalCoords::EdgeWeight => "EdgeWeight",
            NormalCoords::TriangleArcs => "TriangleArcs",
            NormalCoords::Oriented => "Oriented",
            NormalCoords::OrientedQuad => "OrientedQuad",
        }
    }

    pub fn from_key(key: &str) -> Option<NormalCoords> {
        NormalCoords::ALL.iter().copied().find(|c| c.key() == key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HyperCoords {
    Standard,
    Prism,
    EdgeWeight,
}

impl HyperCoords {
    pub const ALL: [HyperCoords; 3] = [HyperCoords::Standard, HyperCoords::Prism, HyperCoords::EdgeWeight];

    pub fn name(&self, capitalise: bool) -> &'static str {
        let (upper, lower) = match self {
            HyperCoords::Standard => ("Standard normal (tet-prism)", "standard normal (tet-prism)"),
            HyperCoords::Prism => ("Prism normal", "prism normal"),
            HyperCoords::EdgeWeight => ("Edge weight", "edge weight"),
        };
        if capitalise { upper } else { lower }
    }

    pub fn key(&self) -> &'static str {
        match self {
            HyperCoords::Standard => "Standard",
            HyperCoords::Prism => "Prism",
            HyperCoords::EdgeWeight => "EdgeWeight",
        }
    }

    pub fn from_key(key: &str) -> Option<HyperCoords> {
        HyperCoords::ALL.iter().copied().find(|c| c.key() == key)
    }
}

bitflags::bitflags! {
    /// Which surfaces an enumeration should produce.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ListFlags: u32 {
        const EMBEDDED_ONLY     = 0x0001;
        const IMMERSED_SINGULAR = 0x0002;
        const VERTEX            = 0x0004;
        const FUNDAMENTAL       = 0x0008;
    }
}

impl Default for ListFlags {
    fn default() -> Self {
        ListFlags::EMBEDDED_ONLY | ListFlags::VERTEX
    }
}

impl ListFlags {
    pub fn describe(&self) -> String {
        let which = if self.contains(ListFlags::FUNDAMENTAL) { "fundamental" } else { "vertex" };
        let embedding = if self.contains(ListFlags::IMMERSED_SINGULAR) { "embedded, immersed & singular" } else { "embedded" };
        format!("{} {}", embedding, which)
    }
}

/// The three quadrilateral types of a tetrahedron, by the vertex pairs they
/// keep together.
pub const QUAD_STRING: [&str; 3] = ["01/23", "02/13", "03/12"];
pub const QUAD_DEFN: [[usize; 4]; 3] = [[0, 1, 2, 3], [0, 2, 1, 3], [0, 3, 1, 2]];
/// `QUAD_SEPARATING[i][j]` is the quad type keeping vertices `i` and `j` together.
pub const QUAD_SEPARATING: [[i8; 4]; 4] = [[-1, 0, 1, 2], [0, -1, 2, 1], [1, 2, -1, 0], [2, 1, 0, -1]];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalSurface {
    pub name: String,
    vector: Vec<i64>,
}

impl NormalSurface {
    pub fn new(name: String, vector: Vec<i64>) -> NormalSurface {
        NormalSurface { name, vector }
    }

    pub fn vector(&self) -> &[i64] {
        &self.vector
    }

    pub fn is_empty(&self) -> bool {
        self.vector.iter().all(|&x| x == 0)
    }

    pub fn has_octagon(&self, layout: SurfaceLayout) -> bool {
        layout == SurfaceLayout::AlmostNormal && self.vector.chunks(10).any(|block| block[7..].iter().any(|&x| x != 0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceLayout {
    Standard,
    AlmostNormal,
    Oriented,
}

impl SurfaceLayout {
    pub fn block(&self) -> usize {
        match self {
            SurfaceLayout::Standard => 7,
            SurfaceLayout::AlmostNormal => 10,
            SurfaceLayout::Oriented => 14,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalSurfaceList {
    pub enumerated: NormalCoords,
    pub flags: ListFlags,
    triangulation: Triangulation,
    surfaces: Vec<NormalSurface>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceListError {
    WrongLength { expected: usize, found: usize },
    NotEnumerable(NormalCoords),
    WrongDimension(usize),
}

impl std::fmt::Display for SurfaceListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceListError::WrongLength { expected, found } => write!(f, "surface vector has {} entries instead of {}", found, expected),
            SurfaceListError::NotEnumerable(coords) => write!(f, "surfaces cannot be enumerated in {} coordinates", coords.name(false)),
            SurfaceListError::WrongDimension(dim) => write!(f, "a {}-dimensional triangulation cannot hold these surfaces", dim),
        }
    }
}

impl std::error::Error for SurfaceListError {}

impl NormalSurfaceList {
    pub fn new(triangulation: Triangulation, enumerated: NormalCoords, flags: ListFlags) -> Result<NormalSurfaceList, SurfaceListError> {
        if triangulation.dim() != 3 {
            return Err(SurfaceListError::WrongDimension(triangulation.dim()));
        }
        if !enumerated.is_enumerable() {
            return Err(SurfaceListError::NotEnumerable(enumerated));
        }
        Ok(NormalSurfaceList { enumerated, flags, triangulation, surfaces: Vec::new() })
    }

    pub fn layout(&self) -> SurfaceLayout {
        if self.enumerated.is_oriented() {
            SurfaceLayout::Oriented
        } else if self.enumerated.generates_almost_normal() {
            SurfaceLayout::AlmostNormal
        } else {
            SurfaceLayout::Standard
        }
    }

    pub fn allows_almost_normal(&self) -> bool {
        self.layout() == SurfaceLayout::AlmostNormal
    }

    pub fn is_oriented(&self) -> bool {
        self.layout() == SurfaceLayout::Oriented
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    pub fn surfaces(&self) -> &[NormalSurface] {
        &self.surfaces
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn push(&mut self, surface: NormalSurface) -> Result<(), SurfaceListError> {
        let expected = self.layout().block() * self.triangulation.size();
        if surface.vector.len() != expected {
            return Err(SurfaceListError::WrongLength { expected, found: surface.vector.len() });
        }
        self.surfaces.push(surface);
        Ok(())
    }

    /// Viewing systems offered for this list. Almost normal systems require a
    /// list that admits octagons; oriented ones a list that tracks
    /// orientation, and only when the user has opted into them.
    pub fn allowed_views(&self, support_oriented: bool) -> Vec<NormalCoords> {
        let mut views = vec![NormalCoords::Standard];
        if self.allows_almost_normal() {
            views.push(NormalCoords::AlmostNormal);
        }
        views.push(NormalCoords::Quad);
        if self.allows_almost_normal() {
            views.push(NormalCoords::QuadOct);
        }
        if self.is_oriented() && support_oriented {
            views.push(NormalCoords::Oriented);
            views.push(NormalCoords::OrientedQuad);
        }
        views.push(NormalCoords::EdgeWeight);
        views.push(NormalCoords::TriangleArcs);
        views
    }

    pub fn triangles(&self, surface: &NormalSurface, tet: usize, vertex: usize) -> i64 {
        match self.layout() {
            SurfaceLayout::Oriented => self.oriented(surface, tet, vertex, true) + self.oriented(surface, tet, vertex, false),
            layout => surface.vector[layout.block() * tet + vertex],
        }
    }

    pub fn quads(&self, surface: &NormalSurface, tet: usize, quad: usize) -> i64 {
        self.triangles(surface, tet, 4 + quad)
    }

    pub fn octs(&self, surface: &NormalSurface, tet: usize, oct: usize) -> i64 {
        match self.layout() {
            SurfaceLayout::AlmostNormal => surface.vector[10 * tet + 7 + oct],
            _ => 0,
        }
    }

    /// Oriented count of a standard disc type (`0..4` triangles, `4..7`
    /// quads); zero unless the list tracks orientation.
    pub fn oriented(&self, surface: &NormalSurface, tet: usize, disc: usize, positive: bool) -> i64 {
        match self.layout() {
            SurfaceLayout::Oriented => surface.vector[14 * tet + 2 * disc + if positive { 0 } else { 1 }],
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalHypersurface {
    pub name: String,
    vector: Vec<i64>,
}

impl NormalHypersurface {
    pub fn new(name: String, vector: Vec<i64>) -> NormalHypersurface {
        NormalHypersurface { name, vector }
    }

    pub fn vector(&self) -> &[i64] {
        &self.vector
    }
}

/// Normal hypersurfaces in a 4-manifold triangulation. Vectors hold 15
/// entries per pentachoron: 5 tetrahedron pieces then 10 prisms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalHypersurfaceList {
    pub enumerated: HyperCoords,
    pub flags: ListFlags,
    triangulation: Triangulation,
    surfaces: Vec<NormalHypersurface>,
}

impl NormalHypersurfaceList {
    pub fn new(triangulation: Triangulation, enumerated: HyperCoords, flags: ListFlags) -> Result<NormalHypersurfaceList, SurfaceListError> {
        if triangulation.dim() != 4 {
            return Err(SurfaceListError::WrongDimension(triangulation.dim()));
        }
        Ok(NormalHypersurfaceList { enumerated, flags, triangulation, surfaces: Vec::new() })
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    pub fn surfaces(&self) -> &[NormalHypersurface] {
        &self.surfaces
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn push(&mut self, surface: NormalHypersurface) -> Result<(), SurfaceListError> {
        let expected = 15 * self.triangulation.size();
        if surface.vector.len() != expected {
            return Err(SurfaceListError::WrongLength { expected, found: surface.vector.len() });
        }
        self.surfaces.push(surface);
        Ok(())
    }

    pub fn tetrahedra(&self, surface: &NormalHypersurface, pent: usize, vertex: usize) -> i64 {
        surface.vector[15 * pent + vertex]
    }

    pub fn prisms(&self, surface: &NormalHypersurface, pent: usize, prism: usize) -> i64 {
        surface.vector[15 * pent + 5 + prism]
    }
}

/// An angle structure: one angle per quad type per tetrahedron, each a
/// rational multiple of π stored as `(numerator, denominator)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AngleStructure {
    angles: Vec<(i64, i64)>,
}

impl AngleStructure {
    pub fn new(angles: Vec<(i64, i64)>) -> AngleStructure {
        AngleStructure { angles }
    }

    pub fn angles(&self) -> &[(i64, i64)] {
        &self.angles
    }

    pub fn is_taut(&self) -> bool {
        self.angles.iter().all(|&(n, d)| n == 0 || n == d)
    }

    pub fn is_strict(&self) -> bool {
        self.angles.iter().all(|&(n, d)| n > 0 && n < d)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AngleStructureList {
    pub taut_only: bool,
    triangulation: Triangulation,
    structures: Vec<AngleStructure>,
}

impl AngleStructureList {
    pub fn new(triangulation: Triangulation, taut_only: bool) -> AngleStructureList {
        AngleStructureList { taut_only, triangulation, structures: Vec::new() }
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    pub fn structures(&self) -> &[AngleStructure] {
        &self.structures
    }

    pub fn push(&mut self, structure: AngleStructure) -> Result<(), SurfaceListError> {
        let expected = 3 * self.triangulation.size();
        if structure.angles.len() != expected {
            return Err(SurfaceListError::WrongLength { expected, found: structure.angles.len() });
        }
        self.structures.push(structure);
        Ok(())
    }

    pub fn column_name(&self, index: usize) -> String {
        format!("{}: {}", index / 3, QUAD_STRING[index % 3])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceFilter {
    Trivial,
    Properties {
        orientable: Option<bool>,
        compact: Option<bool>,
        boundary: Option<bool>,
        euler: BTreeSet<i64>,
    },
    Combination {
        use_and: bool,
    },
}

impl SurfaceFilter {
    pub fn type_name(&self) -> &'static str {
        match self {
            SurfaceFilter::Trivial => "Trivial",
            SurfaceFilter::Properties { .. } => "Filter by basic properties",
            SurfaceFilter::Combination { .. } => "Combination filter",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    #[test]
    fn vector_lengths_are_checked() {
        let mut tri = Triangulation::new(3);
        tri.add_simplex();
        let mut list = NormalSurfaceList::new(tri, NormalCoords::QuadOct, ListFlags::default()).unwrap();
        assert_eq!(list.layout(), SurfaceLayout::AlmostNormal);
        assert_matches!(list.push(NormalSurface::new("bad".into(), vec![0; 7])), Err(SurfaceListError::WrongLength { expected: 10, found: 7 }));
        list.push(NormalSurface::new("oct".into(), vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 0])).unwrap();
        assert_eq!(list.octs(&list.surfaces()[0], 0, 1), 1);
        assert!(list.surfaces()[0].has_octagon(list.layout()));
    }

    #[test]
    fn views_depend_on_list() {
        let mut tri = Triangulation::new(3);
        tri.add_simplex();
        let plain = NormalSurfaceList::new(tri.clone(), NormalCoords::Quad, ListFlags::default()).unwrap();
        assert_eq!(plain.allowed_views(true), vec![NormalCoords::Standard, NormalCoords::Quad, NormalCoords::EdgeWeight, NormalCoords::TriangleArcs]);

        let oriented = NormalSurfaceList::new(tri, NormalCoords::Oriented, ListFlags::default()).unwrap();
        assert!(oriented.allowed_views(true).contains(&NormalCoords::OrientedQuad));
        assert!(!oriented.allowed_views(false).contains(&NormalCoords::Oriented));
    }

    #[test]
    fn view_only_systems_cannot_enumerate() {
        assert_matches!(NormalSurfaceList::new(Triangulation::new(3), NormalCoords::EdgeWeight, ListFlags::default()),
                        Err(SurfaceListError::NotEnumerable(NormalCoords::EdgeWeight)));
        assert_matches!(NormalSurfaceList::new(Triangulation::new(2), NormalCoords::Standard, ListFlags::default()),
                        Err(SurfaceListError::WrongDimension(2)));
    }
}
