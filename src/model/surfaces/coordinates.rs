//! Column schema for viewing surface lists in a chosen coordinate system:
//! how many columns there are, what each is called, what it means, and the
//! value a surface takes in it.

use crate::model::surfaces::{HyperCoords, NormalCoords, NormalHypersurface, NormalHypersurfaceList, NormalSurface, NormalSurfaceList};
use crate::model::surfaces::{QUAD_DEFN, QUAD_SEPARATING, QUAD_STRING};
use crate::model::triangulation::{edge_vertices, Skeleton};

const BOUNDARY_UNICODE: &str = "\u{2202}";

/// Vertices of the face of a tetrahedron opposite the given vertex.
fn face_opposite(vertex: usize) -> &'static str {
    match vertex {
        0 => "123",
        1 => "023",
        2 => "013",
        _ => "012",
    }
}

fn quad_pair(quad: usize, second: bool) -> String {
    let defn = QUAD_DEFN[quad];
    if second {
        format!("{}{}", defn[2], defn[3])
    } else {
        format!("{}{}", defn[0], defn[1])
    }
}

fn oct_meets_twice(oct: usize, a: usize, b: usize) -> bool {
    QUAD_SEPARATING[a][b] as usize == oct
}

pub fn column_count(view: NormalCoords, tetrahedra: usize, skeleton: &Skeleton) -> usize {
    match view {
        NormalCoords::Standard => 7 * tetrahedra,
        NormalCoords::AlmostNormal => 10 * tetrahedra,
        NormalCoords::Quad => 3 * tetrahedra,
        NormalCoords::QuadOct => 6 * tetrahedra,
        NormalCoords::EdgeWeight => skeleton.edges.len(),
        NormalCoords::TriangleArcs => 3 * skeleton.triangles.len(),
        NormalCoords::Oriented => 14 * tetrahedra,
        NormalCoords::OrientedQuad => 6 * tetrahedra,
    }
}

pub fn column_name(view: NormalCoords, index: usize, skeleton: &Skeleton, unicode: bool) -> String {
    match view {
        NormalCoords::Standard => {
            let (tet, disc) = (index / 7, index % 7);
            if disc < 4 {
                format!("{}: {}", tet, disc)
            } else {
                format!("{}: {}", tet, QUAD_STRING[disc - 4])
            }
        },
        NormalCoords::AlmostNormal => {
            let (tet, disc) = (index / 10, index % 10);
            if disc < 4 {
                format!("T{}: {}", tet, disc)
            } else if disc < 7 {
                format!("Q{}: {}", tet, QUAD_STRING[disc - 4])
            } else {
                format!("K{}: {}", tet, QUAD_STRING[disc - 7])
            }
        },
        NormalCoords::Quad => format!("{}: {}", index / 3, QUAD_STRING[index % 3]),
        NormalCoords::QuadOct => {
            let (tet, disc) = (index / 6, index % 6);
            if disc < 3 {
                format!("Q{}: {}", tet, QUAD_STRING[disc])
            } else {
                format!("K{}: {}", tet, QUAD_STRING[disc - 3])
            }
        },
        NormalCoords::EdgeWeight => {
            match skeleton.edges.get(index) {
                Some(edge) if edge.boundary => {
                    if unicode {
                        format!("{}: {}", index, BOUNDARY_UNICODE)
                    } else {
                        format!("{} (B)", index)
                    }
                },
                _ => format!("{}", index),
            }
        },
        NormalCoords::TriangleArcs => {
            let (triangle, vertex) = (index / 3, index % 3);
            match skeleton.triangles.get(triangle) {
                Some(face) if face.boundary => {
                    if unicode {
                        format!("{} {}: {}", BOUNDARY_UNICODE, triangle, vertex)
                    } else {
                        format!("B {}: {}", triangle, vertex)
                    }
                },
                _ => format!("{}: {}", triangle, vertex),
            }
        },
        NormalCoords::Oriented => {
            let standard = index / 2;
            let (tet, disc) = (standard / 7, standard % 7);
            let towards_second = index % 2 == 1;
            match (disc < 4, towards_second) {
                (true, false) => format!("{}: {}", tet, disc),
                (true, true) => format!("{}: {}", tet, face_opposite(disc)),
                (false, second) => format!("{}: {}", tet, quad_pair(disc - 4, second)),
            }
        },
        NormalCoords::OrientedQuad => {
            let quad = index / 2;
            format!("{}: {}", quad / 3, quad_pair(quad % 3, index % 2 == 1))
        },
    }
}

pub fn column_desc(view: NormalCoords, index: usize, skeleton: &Skeleton) -> String {
    match view {
        NormalCoords::Standard => {
            let (tet, disc) = (index / 7, index % 7);
            if disc < 4 {
                format!("Tetrahedron {}, triangle about vertex {}", tet, disc)
            } else {
                format!("Tetrahedron {}, quad splitting vertices {}", tet, QUAD_STRING[disc - 4])
            }
        },
        NormalCoords::AlmostNormal => {
            let (tet, disc) = (index / 10, index % 10);
            if disc < 4 {
                format!("Tetrahedron {}, triangle about vertex {}", tet, disc)
            } else if disc < 7 {
                format!("Tetrahedron {}, quad splitting vertices {}", tet, QUAD_STRING[disc - 4])
            } else {
                format!("Tetrahedron {}, oct partitioning vertices {}", tet, QUAD_STRING[disc - 7])
            }
        },
        NormalCoords::Quad => format!("Tetrahedron {}, quad splitting vertices {}", index / 3, QUAD_STRING[index % 3]),
        NormalCoords::QuadOct => {
            let (tet, disc) = (index / 6, index % 6);
            if disc < 3 {
                format!("Tetrahedron {}, quad splitting vertices {}", tet, QUAD_STRING[disc])
            } else {
                format!("Tetrahedron {}, oct partitioning vertices {}", tet, QUAD_STRING[disc - 3])
            }
        },
        NormalCoords::EdgeWeight => {
            let boundary = skeleton.edges.get(index).map(|e| e.boundary).unwrap_or(false);
            format!("Weight of ({}) edge {}", if boundary { "boundary" } else { "internal" }, index)
        },
        NormalCoords::TriangleArcs => {
            let (triangle, vertex) = (index / 3, index % 3);
            let boundary = skeleton.triangles.get(triangle).map(|f| f.boundary).unwrap_or(false);
            format!("Arcs on ({}) triangle {} crossing triangle vertex {}", if boundary { "boundary" } else { "internal" }, triangle, vertex)
        },
        NormalCoords::Oriented => {
            let standard = index / 2;
            let (tet, disc) = (standard / 7, standard % 7);
            let towards_second = index % 2 == 1;
            match (disc < 4, towards_second) {
                (true, false) => format!("Tetrahedron {}, triangle oriented towards vertex {}", tet, disc),
                (true, true) => format!("Tetrahedron {}, triangle oriented towards face {}", tet, face_opposite(disc)),
                (false, second) => format!("Tetrahedron {}, quad oriented towards edge {}", tet, quad_pair(disc - 4, second)),
            }
        },
        NormalCoords::OrientedQuad => {
            let quad = index / 2;
            format!("Tetrahedron {}, quad oriented towards edge {}", quad / 3, quad_pair(quad % 3, index % 2 == 1))
        },
    }
}

/// The value of `surface` in column `index` of the viewing system `view`.
/// Columns outside the list's storage (octagons in a list without them,
/// orientations in an unoriented list) read as zero.
pub fn value(list: &NormalSurfaceList, surface: &NormalSurface, view: NormalCoords, index: usize, skeleton: &Skeleton) -> i64 {
    match view {
        NormalCoords::Standard => {
            let (tet, disc) = (index / 7, index % 7);
            list.triangles(surface, tet, disc)
        },
        NormalCoords::AlmostNormal => {
            let (tet, disc) = (index / 10, index % 10);
            if disc < 7 {
                list.triangles(surface, tet, disc)
            } else {
                list.octs(surface, tet, disc - 7)
            }
        },
        NormalCoords::Quad => list.quads(surface, index / 3, index % 3),
        NormalCoords::QuadOct => {
            let (tet, disc) = (index / 6, index % 6);
            if disc < 3 {
                list.quads(surface, tet, disc)
            } else {
                list.octs(surface, tet, disc - 3)
            }
        },
        NormalCoords::EdgeWeight => {
            let Some(edge) = skeleton.edges.get(index) else { return 0 };
            let (tet, a, b) = (edge.simplex, edge.vertices[0], edge.vertices[1]);
            let mut weight = list.triangles(surface, tet, a) + list.triangles(surface, tet, b);
            for quad in 0..3 {
                if QUAD_SEPARATING[a][b] as usize != quad {
                    weight+= list.quads(surface, tet, quad);
                }
                weight+= list.octs(surface, tet, quad) * if oct_meets_twice(quad, a, b) { 2 } else { 1 };
            }
            weight
        },
        NormalCoords::TriangleArcs => {
            let (triangle, corner) = (index / 3, index % 3);
            let Some(face) = skeleton.triangles.get(triangle) else { return 0 };
            let tet = face.simplex;
            let v = face.vertices[corner];
            let opposite = (0..4).find(|x| !face.vertices.contains(x)).unwrap_or(0);
            let keep = QUAD_SEPARATING[v][opposite] as usize;
            let mut arcs = list.triangles(surface, tet, v) + list.quads(surface, tet, keep);
            for oct in 0..3 {
                if oct != keep {
                    arcs+= list.octs(surface, tet, oct);
                }
            }
            arcs
        },
        NormalCoords::Oriented => {
            let standard = index / 2;
            list.oriented(surface, standard / 7, standard % 7, index % 2 == 0)
        },
        NormalCoords::OrientedQuad => {
            let quad = index / 2;
            list.oriented(surface, quad / 3, 4 + quad % 3, index % 2 == 0)
        },
    }
}

pub fn hyper_column_count(view: HyperCoords, pentachora: usize, skeleton: &Skeleton) -> usize {
    match view {
        HyperCoords::Standard => 15 * pentachora,
        HyperCoords::Prism => 10 * pentachora,
        HyperCoords::EdgeWeight => skeleton.edges.len(),
    }
}

fn prism_string(prism: usize) -> String {
    let (a, b) = edge_vertices(4)[prism];
    format!("{}{}", a, b)
}

pub fn hyper_column_name(view: HyperCoords, index: usize, skeleton: &Skeleton, unicode: bool) -> String {
    match view {
        HyperCoords::Standard => {
            let (pent, piece) = (index / 15, index % 15);
            if piece < 5 {
                format!("{}: {}", pent, piece)
            } else {
                format!("{}: {}", pent, prism_string(piece - 5))
            }
        },
        HyperCoords::Prism => format!("{}: {}", index / 10, prism_string(index % 10)),
        HyperCoords::EdgeWeight => column_name(NormalCoords::EdgeWeight, index, skeleton, unicode),
    }
}

pub fn hyper_column_desc(view: HyperCoords, index: usize, skeleton: &Skeleton) -> String {
    let prism_desc = |pent: usize, prism: usize| {
        let (a, b) = edge_vertices(4)[prism];
        format!("Pentachoron {}, prism beside vertices {} and {}", pent, a, b)
    };
    match view {
        HyperCoords::Standard => {
            let (pent, piece) = (index / 15, index % 15);
            if piece < 5 {
                format!("Pentachoron {}, tetrahedron about vertex {}", pent, piece)
            } else {
                prism_desc(pent, piece - 5)
            }
        },
        HyperCoords::Prism => prism_desc(index / 10, index % 10),
        HyperCoords::EdgeWeight => column_desc(NormalCoords::EdgeWeight, index, skeleton),
    }
}

pub fn hyper_value(list: &NormalHypersurfaceList, surface: &NormalHypersurface, view: HyperCoords, index: usize, skeleton: &Skeleton) -> i64 {
    match view {
        HyperCoords::Standard => {
            let (pent, piece) = (index / 15, index % 15);
            if piece < 5 {
                list.tetrahedra(surface, pent, piece)
            } else {
                list.prisms(surface, pent, piece - 5)
            }
        },
        HyperCoords::Prism => list.prisms(surface, index / 10, index % 10),
        HyperCoords::EdgeWeight => {
            let Some(edge) = skeleton.edges.get(index) else { return 0 };
            let (pent, a, b) = (edge.simplex, edge.vertices[0], edge.vertices[1]);
            let mut weight = list.tetrahedra(surface, pent, a) + list.tetrahedra(surface, pent, b);
            for (prism, (x, y)) in edge_vertices(4).into_iter().enumerate() {
                let beside_a = a == x || a == y;
                let beside_b = b == x || b == y;
                if beside_a != beside_b {
                    weight+= list.prisms(surface, pent, prism);
                }
            }
            weight
        },
    }
}
