//! Skeletal structure of a triangulation: which local faces are identified,
//! how the simplices fall into components, and what the vertex links look
//! like.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::model::triangulation::{self, Face, Skeleton, Triangulation, VertexLink};

/// Partitions the `local` faces (each a sorted vertex list) of every simplex
/// into equivalence classes under the gluings. Returns the classes in order of
/// first appearance, and `index[s][i]` giving the class of local face `i` of
/// simplex `s`.
fn face_classes(tri: &Triangulation, local: &[Vec<usize>]) -> (Vec<Face>, Vec<Vec<usize>>) {
    let dim = tri.dim();
    let lookup: HashMap<&[usize], usize> = local.iter().enumerate().map(|(i, f)| (f.as_slice(), i)).collect();

    const UNSEEN: usize = usize::MAX;
    let mut index = vec![vec![UNSEEN; local.len()]; tri.size()];
    /* the ordering a face was first reached with, to catch self-identifications */
    let mut reached: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); local.len()]; tri.size()];
    let mut classes = Vec::new();

    for s in 0..tri.size() {
        for (i, face) in local.iter().enumerate() {
            if index[s][i] != UNSEEN {
                continue;
            }

            let class = classes.len();
            let mut rep = Face { simplex: s, vertices: face.clone(), boundary: false, degree: 0, valid: true };
            let mut queue = VecDeque::new();
            index[s][i] = class;
            reached[s][i] = face.clone();
            queue.push_back((s, face.clone()));

            while let Some((t, ordered)) = queue.pop_front() {
                rep.degree+= 1;
                for facet in 0..=dim {
                    if ordered.contains(&facet) {
                        continue;
                    }
                    let Some(gluing) = tri.adjacent(t, facet) else {
                        rep.boundary = true;
                        continue;
                    };

                    let image: Vec<usize> = ordered.iter().map(|&v| gluing.perm.apply(v)).collect();
                    let mut sorted = image.clone();
                    sorted.sort_unstable();
                    let Some(&j) = lookup.get(sorted.as_slice()) else { continue };

                    if index[gluing.simplex][j] == UNSEEN {
                        index[gluing.simplex][j] = class;
                        reached[gluing.simplex][j] = image.clone();
                        queue.push_back((gluing.simplex, image));
                    } else if reached[gluing.simplex][j] != image {
                        rep.valid = false;
                    }
                }
            }

            classes.push(rep);
        }
    }

    (classes, index)
}

/// Two-colours the simplices reachable from `start` so that every gluing
/// respects orientation. Returns false if no consistent colouring exists.
/// `filter` limits which facets may be crossed.
fn orient_from(tri: &Triangulation, start: usize, orientation: &mut [i8], mut filter: impl FnMut(usize, usize) -> bool) -> bool {
    let mut consistent = true;
    let mut queue = VecDeque::from([start]);
    orientation[start] = 1;

    while let Some(s) = queue.pop_front() {
        for facet in 0..=tri.dim() {
            if !filter(s, facet) {
                continue;
            }
            let Some(gluing) = tri.adjacent(s, facet) else { continue };
            /* an odd gluing permutation joins compatibly labelled simplices */
            let expected = if gluing.perm.sign() == -1 { orientation[s] } else { -orientation[s] };
            match orientation[gluing.simplex] {
                0 => {
                    orientation[gluing.simplex] = expected;
                    queue.push_back(gluing.simplex);
                },
                o if o != expected => consistent = false,
                _ => {},
            }
        }
    }

    consistent
}

/// Finds a consistent orientation for every orientable component: `+1` or
/// `-1` per simplex. Simplices in non-orientable components get whatever the
/// search left them with.
pub fn orientation(tri: &Triangulation) -> (Vec<i8>, Vec<bool>) {
    let mut orientation = vec![0i8; tri.size()];
    let mut component_orientable = Vec::new();
    for s in 0..tri.size() {
        if orientation[s] == 0 {
            component_orientable.push(orient_from(tri, s, &mut orientation, |_, _| true));
        }
    }
    (orientation, component_orientable)
}

pub fn components(tri: &Triangulation) -> (Vec<usize>, usize) {
    let mut component = vec![usize::MAX; tri.size()];
    let mut count = 0;
    for start in 0..tri.size() {
        if component[start] != usize::MAX {
            continue;
        }
        let mut queue = VecDeque::from([start]);
        component[start] = count;
        while let Some(s) = queue.pop_front() {
            for facet in 0..=tri.dim() {
                if let Some(gluing) = tri.adjacent(s, facet) {
                    if component[gluing.simplex] == usize::MAX {
                        component[gluing.simplex] = count;
                        queue.push_back(gluing.simplex);
                    }
                }
            }
        }
        count+= 1;
    }
    (component, count)
}

fn vertex_link(tri: &Triangulation, vertex: usize, vertices: &[Face], vertex_index: &[Vec<usize>], edges: &[Face]) -> VertexLink {
    let rep = &vertices[vertex];
    if tri.dim() != 3 {
        return if rep.boundary { VertexLink::Disc } else { VertexLink::Sphere };
    }

    let embeddings: Vec<(usize, usize)> = (0..tri.size())
        .flat_map(|s| (0..4).map(move |v| (s, v)))
        .filter(|&(s, v)| vertex_index[s][v] == vertex)
        .collect();

    let triangles = embeddings.len() as i64;
    let boundary_edges = embeddings.iter()
        .map(|&(s, v)| (0..4).filter(|&f| f != v && tri.adjacent(s, f).is_none()).count() as i64)
        .sum::<i64>();
    let link_edges = (3 * triangles + boundary_edges) / 2;
    let link_vertices = edges.iter()
        .map(|e| {
            let (a, b) = (e.vertices[0], e.vertices[1]);
            (vertex_index[e.simplex][a] == vertex) as i64 + (vertex_index[e.simplex][b] == vertex) as i64
        })
        .sum::<i64>();
    let euler = link_vertices - link_edges + triangles;

    /* orientability of the link is that of the star, crossing only facets through the vertex */
    let mut orientation = vec![0i8; tri.size()];
    let mut orientable = true;
    for &(s, _) in &embeddings {
        if orientation[s] == 0 {
            orientable&= orient_from(tri, s, &mut orientation, |t, facet| {
                (0..4).any(|v| v != facet && vertex_index[t][v] == vertex)
            });
        }
    }

    match (boundary_edges > 0, euler, orientable) {
        (true, 1, _) => VertexLink::Disc,
        (true, _, _) => VertexLink::Other,
        (false, 2, _) => VertexLink::Sphere,
        (false, 0, true) => VertexLink::Torus,
        (false, 0, false) => VertexLink::KleinBottle,
        (false, _, _) => VertexLink::Other,
    }
}

pub fn compute(tri: &Triangulation) -> Skeleton {
    let dim = tri.dim();
    let local_vertices: Vec<Vec<usize>> = (0..=dim).map(|v| vec![v]).collect();
    let local_edges: Vec<Vec<usize>> = triangulation::edge_vertices(dim).into_iter().map(|(a, b)| vec![a, b]).collect();
    let local_triangles: Vec<Vec<usize>> = triangulation::triangle_vertices(dim).into_iter().map(|(a, b, c)| vec![a, b, c]).collect();

    let (mut vertices, vertex_index) = face_classes(tri, &local_vertices);
    let (edges, edge_index) = face_classes(tri, &local_edges);
    let (triangles, triangle_index) = face_classes(tri, &local_triangles);

    let vertex_links: Vec<VertexLink> = (0..vertices.len())
        .map(|v| vertex_link(tri, v, &vertices, &vertex_index, &edges))
        .collect();
    for (vertex, link) in vertices.iter_mut().zip(&vertex_links) {
        if vertex.boundary && *link == VertexLink::Other {
            vertex.valid = false;
        }
    }

    let (component, component_count) = components(tri);
    let (_, component_orientable) = orientation(tri);
    let oriented = tri.simplices().iter()
        .all(|s| s.gluings().iter().flatten().all(|g| g.perm.sign() == -1));

    Skeleton {
        dim,
        size: tri.size(),
        vertices,
        edges,
        triangles,
        edge_index,
        triangle_index,
        vertex_index,
        component,
        component_count,
        boundary_facets: tri.count_boundary_facets(),
        vertex_links,
        orientable: component_orientable.iter().all(|&o| o),
        oriented,
        orientable_components: component_orientable.iter().filter(|&&o| o).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::perm::Perm;

    fn perm(text: &str) -> Perm {
        Perm::parse(text).unwrap()
    }

    /// A closed one-tetrahedron triangulation: faces 0/1 and 2/3 folded together.
    fn folded_sphere() -> Triangulation {
        Triangulation::from_gluings(3, 1, &[(0, 0, 0, perm("1023")), (0, 2, 0, perm("0132"))]).unwrap()
    }

    /// Two tetrahedra glued along all four faces by the identity: a 3-sphere.
    fn doubled_tet() -> Triangulation {
        let gluings: Vec<_> = (0..4).map(|f| (0, f, 1, perm("0123"))).collect();
        Triangulation::from_gluings(3, 2, &gluings).unwrap()
    }

    #[test]
    fn single_tetrahedron() {
        let mut tri = Triangulation::new(3);
        tri.add_simplex();
        let sk = compute(&tri);
        assert_eq!((sk.vertices.len(), sk.edges.len(), sk.triangles.len()), (4, 6, 4));
        assert_eq!(sk.boundary_facets, 4);
        assert!(sk.vertices.iter().all(|v| v.boundary && v.degree == 1));
        assert!(sk.vertex_links.iter().all(|l| *l == VertexLink::Disc));
        assert!(sk.is_valid());
        assert!(!sk.is_ideal());
        assert!(sk.orientable && sk.oriented);
    }

    #[test]
    fn doubled_tetrahedron_is_closed_sphere() {
        let sk = compute(&doubled_tet());
        assert_eq!(sk.vertices.len(), 4);
        assert_eq!(sk.edges.len(), 6);
        assert!(sk.is_closed());
        assert!(sk.vertex_links.iter().all(|l| *l == VertexLink::Sphere));
        assert!(sk.is_connected());
        /* identity gluings are even, so the labelling is not oriented */
        assert!(sk.orientable);
        assert!(!sk.oriented);
    }

    #[test]
    fn folded_tetrahedron() {
        let sk = compute(&folded_sphere());
        assert_eq!(sk.boundary_facets, 0);
        assert_eq!(sk.vertices.iter().map(|v| v.degree).sum::<usize>(), 4);
        assert!(sk.is_valid());
        assert!(sk.is_closed());
    }

    #[test]
    fn components_are_counted() {
        let mut tri = doubled_tet();
        tri.add_simplex();
        let sk = compute(&tri);
        assert_eq!(sk.component_count, 2);
        assert_eq!(sk.component, vec![0, 0, 1]);
        assert_eq!(sk.orientable_components, 2);
    }
}
