//! Gluing data for triangulations of dimension 2, 3 and 4.
//!
//! A triangulation is a list of top-dimensional simplices. Facet `f` of a
//! simplex is the facet opposite vertex `f`. A gluing of facet `f` of simplex
//! `s` onto simplex `t` carries a permutation `p` of the vertices such that
//! vertex `v` of `s` is identified with vertex `p[v]` of `t`; facet `f` of `s`
//! therefore lands on facet `p[f]` of `t`, and the partner gluing is always
//! `(s, p⁻¹)`.

use std::fmt;

use crate::model::perm::Perm;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Gluing {
    pub simplex: usize,
    pub perm: Perm,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Simplex {
    pub description: String,
    gluings: Vec<Option<Gluing>>,
}

impl Simplex {
    fn new(dim: usize) -> Simplex {
        Simplex {
            description: String::new(),
            gluings: vec![None; dim + 1],
        }
    }

    pub fn adjacent(&self, facet: usize) -> Option<Gluing> {
        self.gluings.get(facet).copied().flatten()
    }

    pub fn gluings(&self) -> &[Option<Gluing>] {
        &self.gluings
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GluingError {
    NoSuchSimplex(usize),
    NoSuchFacet(usize),
    FacetInUse { simplex: usize, facet: usize },
    GlueToSelf { simplex: usize, facet: usize },
    WrongPermSize,
}

impl fmt::Display for GluingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GluingError::NoSuchSimplex(s) => write!(f, "there is no simplex number {}", s),
            GluingError::NoSuchFacet(facet) => write!(f, "there is no facet number {}", facet),
            GluingError::FacetInUse { simplex, facet } => write!(f, "facet {} of simplex {} is already glued", facet, simplex),
            GluingError::GlueToSelf { simplex, facet } => write!(f, "facet {} of simplex {} cannot be glued to itself", facet, simplex),
            GluingError::WrongPermSize => write!(f, "the gluing permutation has the wrong size"),
        }
    }
}

impl std::error::Error for GluingError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Triangulation {
    dim: usize,
    simplices: Vec<Simplex>,
}

impl Triangulation {
    pub fn new(dim: usize) -> Triangulation {
        assert!((2..=4).contains(&dim), "unsupported dimension {}", dim);
        Triangulation { dim, simplices: Vec::new() }
    }

    /// Builds a triangulation from a list of one-sided gluings
    /// `(simplex, facet, target, perm)`; each pair only needs to be listed once.
    pub fn from_gluings(dim: usize, size: usize, gluings: &[(usize, usize, usize, Perm)]) -> Result<Triangulation, GluingError> {
        let mut tri = Triangulation::new(dim);
        for _ in 0..size {
            tri.add_simplex();
        }
        for &(s, f, t, p) in gluings {
            tri.join(s, f, t, p)?;
        }
        Ok(tri)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn size(&self) -> usize {
        self.simplices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.simplices.is_empty()
    }

    pub fn simplices(&self) -> &[Simplex] {
        &self.simplices
    }

    pub fn simplex(&self, index: usize) -> Option<&Simplex> {
        self.simplices.get(index)
    }

    pub fn adjacent(&self, simplex: usize, facet: usize) -> Option<Gluing> {
        self.simplices.get(simplex).and_then(|s| s.adjacent(facet))
    }

    pub fn add_simplex(&mut self) -> usize {
        self.simplices.push(Simplex::new(self.dim));
        self.simplices.len() - 1
    }

    pub fn set_description(&mut self, simplex: usize, description: String) -> Result<(), GluingError> {
        self.simplices.get_mut(simplex).ok_or(GluingError::NoSuchSimplex(simplex))?.description = description;
        Ok(())
    }

    /// Removes a simplex, unjoining it first and renumbering every later
    /// simplex down by one.
    pub fn remove_simplex(&mut self, simplex: usize) -> Result<(), GluingError> {
        if simplex >= self.size() {
            return Err(GluingError::NoSuchSimplex(simplex));
        }

        for facet in 0..=self.dim {
            self.unjoin(simplex, facet);
        }
        self.simplices.remove(simplex);

        for s in self.simplices.iter_mut() {
            for g in s.gluings.iter_mut().flatten() {
                if g.simplex > simplex {
                    g.simplex-= 1;
                }
            }
        }

        Ok(())
    }

    pub fn join(&mut self, simplex: usize, facet: usize, target: usize, perm: Perm) -> Result<(), GluingError> {
        if simplex >= self.size() {
            return Err(GluingError::NoSuchSimplex(simplex));
        }
        if target >= self.size() {
            return Err(GluingError::NoSuchSimplex(target));
        }
        if facet > self.dim {
            return Err(GluingError::NoSuchFacet(facet));
        }
        if perm.size() != self.dim + 1 {
            return Err(GluingError::WrongPermSize);
        }

        let target_facet = perm.apply(facet);
        if simplex == target && target_facet == facet {
            return Err(GluingError::GlueToSelf { simplex, facet });
        }
        if self.simplices[simplex].gluings[facet].is_some() {
            return Err(GluingError::FacetInUse { simplex, facet });
        }
        if self.simplices[target].gluings[target_facet].is_some() {
            return Err(GluingError::FacetInUse { simplex: target, facet: target_facet });
        }

        self.simplices[simplex].gluings[facet] = Some(Gluing { simplex: target, perm });
        self.simplices[target].gluings[target_facet] = Some(Gluing { simplex, perm: perm.inverse() });
        Ok(())
    }

    /// Unglues a facet and its partner. Returns the gluing that was removed.
    pub fn unjoin(&mut self, simplex: usize, facet: usize) -> Option<Gluing> {
        let gluing = self.adjacent(simplex, facet)?;
        let partner_facet = gluing.perm.apply(facet);
        self.simplices[simplex].gluings[facet] = None;
        self.simplices[gluing.simplex].gluings[partner_facet] = None;
        Some(gluing)
    }

    /// Relabels the vertices of one simplex by `relabel` (old vertex `v`
    /// becomes new vertex `relabel[v]`), keeping every gluing consistent.
    pub fn relabel_simplex(&mut self, simplex: usize, relabel: Perm) {
        let inverse = relabel.inverse();
        let old: Vec<Option<Gluing>> = self.simplices[simplex].gluings.clone();

        let mut fresh = vec![None; self.dim + 1];
        for (facet, gluing) in old.iter().enumerate() {
            if let Some(g) = gluing {
                let perm = if g.simplex == simplex {
                    relabel.compose(&g.perm).compose(&inverse)
                } else {
                    g.perm.compose(&inverse)
                };
                fresh[relabel.apply(facet)] = Some(Gluing { simplex: g.simplex, perm });
            }
        }

        for (facet, gluing) in old.iter().enumerate() {
            if let Some(g) = gluing {
                if g.simplex != simplex {
                    let partner_facet = g.perm.apply(facet);
                    if let Some(back) = self.simplices[g.simplex].gluings[partner_facet].as_mut() {
                        back.perm = relabel.compose(&back.perm);
                    }
                }
            }
        }

        self.simplices[simplex].gluings = fresh;
    }

    /// Appends a disjoint copy of `other`.
    pub fn insert_triangulation(&mut self, other: &Triangulation) {
        debug_assert_eq!(self.dim, other.dim);
        let offset = self.size();
        for s in &other.simplices {
            let mut copy = s.clone();
            for g in copy.gluings.iter_mut().flatten() {
                g.simplex+= offset;
            }
            self.simplices.push(copy);
        }
    }

    pub fn count_boundary_facets(&self) -> usize {
        self.simplices.iter().map(|s| s.gluings.iter().filter(|g| g.is_none()).count()).sum()
    }

    /// Checks that every gluing has a matching partner.
    pub fn is_consistent(&self) -> bool {
        self.simplices.iter().enumerate().all(|(s, simplex)| {
            simplex.gluings.iter().enumerate().all(|(facet, gluing)| match gluing {
                None => true,
                Some(g) => self.adjacent(g.simplex, g.perm.apply(facet))
                    .map_or(false, |back| back.simplex == s && back.perm == g.perm.inverse()),
            })
        })
    }

    pub fn simplex_noun(&self) -> &'static str {
        simplex_noun(self.dim)
    }
}

pub fn simplex_noun(dim: usize) -> &'static str {
    match dim {
        2 => "triangle",
        3 => "tetrahedron",
        _ => "pentachoron",
    }
}

pub fn simplex_noun_plural(dim: usize) -> &'static str {
    match dim {
        2 => "triangles",
        3 => "tetrahedra",
        _ => "pentachora",
    }
}

pub fn facet_noun(dim: usize) -> &'static str {
    match dim {
        2 => "edge",
        3 => "face",
        _ => "facet",
    }
}

/// The vertices of facet `facet` of a `dim`-simplex, in increasing order.
pub fn facet_vertices(dim: usize, facet: usize) -> Vec<usize> {
    (0..=dim).filter(|&v| v != facet).collect()
}

/// Standard numbering of the edges of a simplex: lexicographic pairs.
pub fn edge_vertices(dim: usize) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for a in 0..=dim {
        for b in (a + 1)..=dim {
            edges.push((a, b));
        }
    }
    edges
}

/// Standard numbering of the triangles of a simplex: lexicographic triples.
pub fn triangle_vertices(dim: usize) -> Vec<(usize, usize, usize)> {
    let mut triangles = Vec::new();
    for a in 0..=dim {
        for b in (a + 1)..=dim {
            for c in (b + 1)..=dim {
                triangles.push((a, b, c));
            }
        }
    }
    triangles
}

/// A face of the skeleton, recorded by one of its embeddings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Face {
    pub simplex: usize,
    pub vertices: Vec<usize>,
    pub boundary: bool,
    pub degree: usize,
    pub valid: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexLink {
    Sphere,
    Disc,
    Torus,
    KleinBottle,
    Other,
}

impl VertexLink {
    pub fn is_ideal(&self) -> bool {
        matches!(self, VertexLink::Torus | VertexLink::KleinBottle)
    }
}

/// Combinatorial summary of a triangulation, computed by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skeleton {
    pub dim: usize,
    pub size: usize,
    pub vertices: Vec<Face>,
    pub edges: Vec<Face>,
    pub triangles: Vec<Face>,
    /// `edge_index[s][e]` is the skeleton edge containing local edge `e` of simplex `s`.
    pub edge_index: Vec<Vec<usize>>,
    pub triangle_index: Vec<Vec<usize>>,
    pub vertex_index: Vec<Vec<usize>>,
    /// `component[s]` is the component containing simplex `s`.
    pub component: Vec<usize>,
    pub component_count: usize,
    pub boundary_facets: usize,
    pub vertex_links: Vec<VertexLink>,
    pub orientable: bool,
    pub oriented: bool,
    pub orientable_components: usize,
}

impl Skeleton {
    pub fn is_valid(&self) -> bool {
        self.vertices.iter().all(|v| v.valid) && self.edges.iter().all(|e| e.valid)
    }

    pub fn is_ideal(&self) -> bool {
        self.vertex_links.iter().any(|l| l.is_ideal())
    }

    pub fn is_closed(&self) -> bool {
        self.boundary_facets == 0 && !self.is_ideal()
    }

    pub fn is_connected(&self) -> bool {
        self.component_count <= 1
    }

    pub fn has_boundary_facets(&self) -> bool {
        self.boundary_facets > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    fn two_tets() -> Triangulation {
        Triangulation::from_gluings(3, 2, &[(0, 0, 1, Perm::parse("0132").unwrap())]).unwrap()
    }

    #[test]
    fn join_sets_partner() {
        let tri = two_tets();
        let back = tri.adjacent(1, 0).unwrap();
        assert_eq!(back.simplex, 0);
        assert_eq!(back.perm, Perm::parse("0132").unwrap().inverse());
        assert!(tri.is_consistent());
        assert_eq!(tri.count_boundary_facets(), 6);
    }

    #[test]
    fn join_refuses_bad_requests() {
        let mut tri = two_tets();
        assert_matches!(tri.join(0, 0, 1, Perm::identity(4)), Err(GluingError::FacetInUse { simplex: 0, facet: 0 }));
        assert_matches!(tri.join(0, 1, 0, Perm::identity(4)), Err(GluingError::GlueToSelf { .. }));
        assert_matches!(tri.join(0, 1, 7, Perm::identity(4)), Err(GluingError::NoSuchSimplex(7)));
        assert_matches!(tri.join(0, 1, 1, Perm::identity(3)), Err(GluingError::WrongPermSize));
    }

    #[test]
    fn removal_renumbers() {
        let mut tri = Triangulation::new(3);
        for _ in 0..3 {
            tri.add_simplex();
        }
        tri.join(0, 3, 2, Perm::identity(4)).unwrap();
        tri.remove_simplex(1).unwrap();
        assert_eq!(tri.size(), 2);
        assert_eq!(tri.adjacent(0, 3).map(|g| g.simplex), Some(1));
        assert!(tri.is_consistent());
    }

    #[test]
    fn relabel_keeps_consistency() {
        let mut tri = two_tets();
        tri.join(0, 2, 0, Perm::parse("0132").unwrap()).unwrap();
        assert!(tri.is_consistent());
        tri.relabel_simplex(0, Perm::transposition(4, 2, 3));
        assert!(tri.is_consistent());
        tri.relabel_simplex(1, Perm::parse("1230").unwrap());
        assert!(tri.is_consistent());
    }
}
