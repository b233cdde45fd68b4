//! An engine that covers the purely combinatorial operations, with no help
//! from an external mathematics library.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::fmt::Write;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::thread;

use itertools::Itertools;

use crate::engine::graph::{self, Graph, TreeDecomposition};
use crate::engine::{skeleton, snappea, xml, Engine, EngineError, Move};
use crate::model::link::Link;
use crate::model::packet::{PacketRef, SnapPeaData};
use crate::model::perm::Perm;
use crate::model::polynomial::{Invariant, Laurent, Polynomial};
use crate::model::progress::ProgressTracker;
use crate::model::triangulation::{Skeleton, Triangulation};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// State sums beyond this many crossings would never finish.
pub const MAX_STATE_SUM_CROSSINGS: usize = 24;

#[derive(Clone, Copy, Debug, Default)]
pub struct BasicEngine;

fn failed(error: impl fmt::Display) -> EngineError {
    EngineError::Failed(error.to_string())
}

/// Renumbers the simplices of each connected component into a triangulation
/// of its own.
fn components_of(tri: &Triangulation) -> Result<Vec<Triangulation>, EngineError> {
    let (component, count) = skeleton::components(tri);
    let mut parts: Vec<Triangulation> = (0..count).map(|_| Triangulation::new(tri.dim())).collect();
    let mut local = vec![0; tri.size()];

    for (s, simplex) in tri.simplices().iter().enumerate() {
        let part = &mut parts[component[s]];
        local[s] = part.add_simplex();
        part.set_description(local[s], simplex.description.clone()).map_err(failed)?;
    }
    for (s, simplex) in tri.simplices().iter().enumerate() {
        let part = &mut parts[component[s]];
        for (facet, gluing) in simplex.gluings().iter().enumerate() {
            let Some(gluing) = gluing else { continue };
            if part.adjacent(local[s], facet).is_none() {
                part.join(local[s], facet, local[gluing.simplex], gluing.perm).map_err(failed)?;
            }
        }
    }
    Ok(parts)
}

/// Tries to extend `start -> (image, perm)` to an isomorphism from the
/// component of `a` containing `start` into `b`, avoiding simplices of `b`
/// already in `used`. On success the new images are marked as used.
fn extend_isomorphism(a: &Triangulation, b: &Triangulation, start: usize, image: usize, perm: Perm, used: &mut [bool]) -> bool {
    let mut map: HashMap<usize, (usize, Perm)> = HashMap::new();
    let mut taken = used.to_vec();
    let mut queue = VecDeque::from([start]);
    map.insert(start, (image, perm));
    taken[image] = true;

    while let Some(s) = queue.pop_front() {
        let (t, sigma) = map[&s];
        for facet in 0..=a.dim() {
            let here = a.adjacent(s, facet);
            let there = b.adjacent(t, sigma.apply(facet));
            let (here, there) = match (here, there) {
                (None, None) => continue,
                (Some(here), Some(there)) => (here, there),
                _ => return false,
            };

            /* vertex v of s sits at sigma[v] in t, so the neighbour's map is forced */
            let expected = there.perm.compose(&sigma).compose(&here.perm.inverse());
            match map.get(&here.simplex) {
                Some(&(mapped, existing)) => {
                    if mapped != there.simplex || existing != expected {
                        return false;
                    }
                },
                None => {
                    if taken[there.simplex] {
                        return false;
                    }
                    taken[there.simplex] = true;
                    map.insert(here.simplex, (there.simplex, expected));
                    queue.push_back(here.simplex);
                },
            }
        }
    }

    used.copy_from_slice(&taken);
    true
}

/* link polynomials */

/// Arc ends meeting at each crossing, in the order under-in, under-out,
/// over-in, over-out. Arc `2c + k` leaves crossing `c` along strand `k`.
fn crossing_ends(link: &Link) -> Vec<[usize; 4]> {
    link.crossings().iter().enumerate().map(|(c, crossing)| {
        let arc_into = |strand: u8| {
            let from = crossing.prev(strand);
            2 * from.crossing + from.strand as usize
        };
        [arc_into(0), 2 * c, arc_into(1), 2 * c + 1]
    }).collect()
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (a, b) = (find(parent, a), find(parent, b));
    if a != b {
        parent[a] = b;
    }
}

/// Tallies `(#A - #B, loops)` over the states in `range`. Returns `None` if
/// the tracker was cancelled part way.
fn tally_states(signs: &[i8], ends: &[[usize; 4]], range: std::ops::Range<u64>, tracker: Option<&ProgressTracker>, report: bool) -> Option<BTreeMap<(i64, usize), i64>> {
    let n = signs.len();
    let mut tally = BTreeMap::new();
    let mut parent = vec![0; 2 * n];
    let span = (range.end - range.start).max(1) as f64;

    for state in range.clone() {
        if (state - range.start) % 4096 == 0 {
            if let Some(tracker) = tracker {
                if tracker.is_cancelled() {
                    return None;
                }
                if report {
                    tracker.set_stage_fraction((state - range.start) as f64 / span);
                }
            }
        }

        for (i, p) in parent.iter_mut().enumerate() {
            *p = i;
        }
        let mut balance = 0i64;
        for (c, &[under_in, under_out, over_in, over_out]) in ends.iter().enumerate() {
            let b_smoothing = (state >> c) & 1 == 1;
            balance+= if b_smoothing { -1 } else { 1 };
            let pairs = match (signs[c] > 0, b_smoothing) {
                (true, false) => [(over_in, under_out), (under_in, over_out)],
                (true, true) => [(over_in, under_in), (under_out, over_out)],
                (false, false) => [(over_out, under_out), (over_in, under_in)],
                (false, true) => [(over_out, under_in), (under_out, over_in)],
            };
            for (x, y) in pairs {
                union(&mut parent, x, y);
            }
        }
        let loops = (0..parent.len()).filter(|&x| find(&mut parent, x) == x).count();
        *tally.entry((balance, loops)).or_insert(0)+= 1;
    }

    Some(tally)
}

/// The Kauffman bracket, normalised so that the zero-crossing unknot is 1.
fn bracket(link: &Link, threads: usize, tracker: Option<&ProgressTracker>) -> Result<Laurent, EngineError> {
    let n = link.size();
    if n > MAX_STATE_SUM_CROSSINGS {
        return Err(EngineError::Failed(format!("the bracket of a {}-crossing diagram is too expensive to compute here", n)));
    }
    let unknots = (0..link.count_components()).filter(|&c| link.component(c).is_none()).count();
    let loop_value = Laurent::from_terms([(2, -1), (-2, -1)]);
    let loop_power = |k: usize| (0..k).fold(Laurent::monomial(1, 0), |acc, _| acc.mul(&loop_value));

    if n == 0 {
        return Ok(loop_power(unknots.saturating_sub(1)));
    }

    let signs: Vec<i8> = link.crossings().iter().map(|c| c.sign).collect();
    let ends = crossing_ends(link);
    let total: u64 = 1 << n;
    let workers = (threads.max(1) as u64).min(total);
    let chunk = total.div_ceil(workers);

    let partials: Vec<Option<BTreeMap<(i64, usize), i64>>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers).map(|w| {
            let (signs, ends) = (&signs, &ends);
            let range = (w * chunk)..((w + 1) * chunk).min(total);
            scope.spawn(move || tally_states(signs, ends, range, tracker, w == 0))
        }).collect();
        handles.into_iter().map(|h| h.join().ok().flatten()).collect()
    });

    let mut tally: BTreeMap<(i64, usize), i64> = BTreeMap::new();
    for partial in partials {
        let Some(partial) = partial else {
            tracing::debug!("bracket computation cancelled");
            return Err(EngineError::Cancelled);
        };
        for (key, count) in partial {
            *tally.entry(key).or_insert(0)+= count;
        }
    }

    let mut result = Laurent::zero();
    for ((balance, loops), count) in tally {
        let term = loop_power(loops + unknots - 1).shift(balance).scale(count);
        result = result.add(&term);
    }
    if let Some(tracker) = tracker {
        tracker.set_stage_fraction(1.0);
    }
    Ok(result)
}

impl Engine for BasicEngine {
    fn name(&self) -> &'static str {
        "basic"
    }

    #[tracing::instrument(skip(self))]
    fn open(&self, path: &Path) -> Result<PacketRef, EngineError> {
        let mut bytes = fs::read(path).map_err(|error| EngineError::Io { path: path.to_path_buf(), error })?;
        if bytes.starts_with(&GZIP_MAGIC) {
            let mut plain = Vec::new();
            flate2::read::GzDecoder::new(bytes.as_slice()).read_to_end(&mut plain)
                .map_err(|error| EngineError::Io { path: path.to_path_buf(), error })?;
            tracing::debug!(compressed = bytes.len(), plain = plain.len(), "decompressed data file");
            bytes = plain;
        }
        let text = String::from_utf8(bytes).map_err(|e| EngineError::Parse {
            path: path.to_path_buf(),
            line: None,
            message: format!("the file is not valid UTF-8 ({})", e.utf8_error()),
        })?;
        let packet = xml::read_tree(&text).map_err(|e| EngineError::Parse { path: path.to_path_buf(), line: e.line, message: e.message })?;
        tracing::info!(packets = packet.total_tree_size(), "read data file");
        Ok(packet)
    }

    #[tracing::instrument(skip(self, packet))]
    fn save(&self, packet: &PacketRef, path: &Path) -> Result<(), EngineError> {
        fs::write(path, xml::write_tree(packet)).map_err(|error| EngineError::Io { path: path.to_path_buf(), error })?;
        tracing::info!("wrote data file");
        Ok(())
    }

    fn skeleton(&self, tri: &Triangulation) -> Result<Skeleton, EngineError> {
        Ok(skeleton::compute(tri))
    }

    fn orient(&self, tri: &mut Triangulation) -> Result<(), EngineError> {
        let (orientation, orientable) = skeleton::orientation(tri);
        if !orientable.iter().any(|&o| o) {
            return Err(EngineError::Failed("This triangulation has no orientable components.".to_string()));
        }
        let (component, _) = skeleton::components(tri);
        let swap = Perm::transposition(tri.dim() + 1, tri.dim() - 1, tri.dim());
        for s in 0..tri.size() {
            if orientable[component[s]] && orientation[s] < 0 {
                tri.relabel_simplex(s, swap);
            }
        }
        Ok(())
    }

    fn reflect(&self, tri: &mut Triangulation) -> Result<(), EngineError> {
        let swap = Perm::transposition(tri.dim() + 1, tri.dim() - 1, tri.dim());
        for s in 0..tri.size() {
            tri.relabel_simplex(s, swap);
        }
        Ok(())
    }

    /// Subsimplex `(t, p)` has vertex `i` at the barycentre of the face of
    /// `t` spanned by `p[i], ..., p[dim]`.
    fn barycentric_subdivide(&self, tri: &mut Triangulation) -> Result<(), EngineError> {
        let dim = tri.dim();
        let perms = Perm::all(dim + 1);
        let index: HashMap<Perm, usize> = perms.iter().enumerate().map(|(i, p)| (*p, i)).collect();
        let per_simplex = perms.len();
        let identity = Perm::identity(dim + 1);

        let mut result = Triangulation::new(dim);
        for _ in 0..tri.size() * per_simplex {
            result.add_simplex();
        }

        for t in 0..tri.size() {
            for (i, p) in perms.iter().enumerate() {
                let me = t * per_simplex + i;
                for facet in 1..=dim {
                    let neighbour = p.compose(&Perm::transposition(dim + 1, facet - 1, facet));
                    let other = t * per_simplex + index[&neighbour];
                    if result.adjacent(me, facet).is_none() {
                        result.join(me, facet, other, identity).map_err(failed)?;
                    }
                }
                if let Some(gluing) = tri.adjacent(t, p.apply(0)) {
                    let other = gluing.simplex * per_simplex + index[&gluing.perm.compose(p)];
                    if result.adjacent(me, 0).is_none() {
                        result.join(me, 0, other, identity).map_err(failed)?;
                    }
                }
            }
        }

        *tri = result;
        Ok(())
    }

    fn double_cover(&self, tri: &Triangulation) -> Result<Triangulation, EngineError> {
        let n = tri.size();
        let mut cover = Triangulation::new(tri.dim());
        for _ in 0..2 * n {
            cover.add_simplex();
        }
        for (s, simplex) in tri.simplices().iter().enumerate() {
            for (facet, gluing) in simplex.gluings().iter().enumerate() {
                let Some(gluing) = gluing else { continue };
                for sheet in 0..2 {
                    /* odd gluings respect the labelled orientation and stay on their sheet */
                    let target_sheet = if gluing.perm.sign() < 0 { sheet } else { 1 - sheet };
                    let here = s + sheet * n;
                    if cover.adjacent(here, facet).is_none() {
                        cover.join(here, facet, gluing.simplex + target_sheet * n, gluing.perm).map_err(failed)?;
                    }
                }
            }
        }
        Ok(cover)
    }

    fn split_into_components(&self, tri: &Triangulation) -> Result<Vec<Triangulation>, EngineError> {
        components_of(tri)
    }

    fn is_isomorphic(&self, a: &Triangulation, b: &Triangulation) -> Result<bool, EngineError> {
        if a.dim() != b.dim() || a.size() != b.size() || a.count_boundary_facets() != b.count_boundary_facets() {
            return Ok(false);
        }

        /* components can be matched greedily since isomorphism is transitive */
        let (component, count) = skeleton::components(a);
        let perms = Perm::all(a.dim() + 1);
        let mut used = vec![false; b.size()];
        for c in 0..count {
            let Some(start) = component.iter().position(|&x| x == c) else { continue };
            let mut matched = false;
            'search: for image in 0..b.size() {
                if used[image] {
                    continue;
                }
                for perm in &perms {
                    if extend_isomorphism(a, b, start, image, *perm, &mut used) {
                        matched = true;
                        break 'search;
                    }
                }
            }
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn move_legal(&self, tri: &Triangulation, mv: Move, element: usize) -> Result<bool, EngineError> {
        match mv {
            Move::OneFour => Ok(tri.dim() == 3 && element < tri.size()),
            _ => Err(EngineError::Unsupported("this elementary move")),
        }
    }

    /// The 1-4 move cones tetrahedron `t` from a new interior vertex. New
    /// tetrahedron `i` sits over facet `i` of `t`, with the new vertex
    /// labelled `i`.
    fn apply_move(&self, tri: &mut Triangulation, mv: Move, element: usize) -> Result<(), EngineError> {
        if !self.move_legal(tri, mv, element)? {
            return Err(EngineError::Failed(format!("the {} move cannot be performed here", mv.name())));
        }

        let t = element;
        let old: Vec<_> = (0..4).map(|facet| tri.adjacent(t, facet)).collect();
        for facet in 0..4 {
            tri.unjoin(t, facet);
        }

        let base = tri.size();
        for _ in 0..4 {
            tri.add_simplex();
        }
        for (i, j) in (0..4).tuple_combinations() {
            tri.join(base + i, j, base + j, Perm::transposition(4, i, j)).map_err(failed)?;
        }
        for (i, gluing) in old.iter().enumerate() {
            let Some(gluing) = gluing else { continue };
            if tri.adjacent(base + i, i).is_some() {
                continue;
            }
            let target = if gluing.simplex == t { base + gluing.perm.apply(i) } else { gluing.simplex };
            tri.join(base + i, i, target, gluing.perm).map_err(failed)?;
        }

        tri.remove_simplex(t).map_err(failed)
    }

    fn dual_graph_dot(&self, tri: &Triangulation, labels: bool) -> Result<String, EngineError> {
        Ok(graph::dual_graph_dot(tri, labels))
    }

    fn tree_decomposition_dot(&self, tri: &Triangulation, nice: bool) -> Result<String, EngineError> {
        let td = TreeDecomposition::greedy(&Graph::dual(tri));
        Ok(if nice { td.nice() } else { td }.to_dot())
    }

    fn recogniser(&self, tri: &Triangulation) -> Result<String, EngineError> {
        if tri.dim() != 3 {
            return Err(EngineError::Unsupported("recogniser output outside dimension 3"));
        }
        let skeleton = skeleton::compute(tri);
        if !skeleton.is_valid() || skeleton.has_boundary_facets() {
            return Err(EngineError::Failed("The recogniser can only describe valid triangulations with no boundary triangles.".to_string()));
        }

        let mut out = String::from("triangulation\n");
        for (i, triangle) in skeleton.triangles.iter().enumerate() {
            let facet = (0..4).find(|v| !triangle.vertices.contains(v)).unwrap_or(3);
            let gluing = tri.adjacent(triangle.simplex, facet).ok_or(EngineError::NoResult)?;
            let vertices = &triangle.vertices;
            let _ = write!(out, "t{}({},{},{}) - t{}({},{},{})",
                           triangle.simplex + 1, vertices[0] + 1, vertices[1] + 1, vertices[2] + 1,
                           gluing.simplex + 1, gluing.perm.apply(vertices[0]) + 1, gluing.perm.apply(vertices[1]) + 1, gluing.perm.apply(vertices[2]) + 1);
            if i + 1 != skeleton.triangles.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push_str("end\n");
        Ok(out)
    }

    fn source(&self, tri: &Triangulation, name: &str) -> Result<String, EngineError> {
        let dim = tri.dim();
        let mut out = String::from("/**\n");
        if name.is_empty() {
            let _ = writeln!(out, " * {}-dimensional triangulation:", dim);
        } else {
            let _ = writeln!(out, " * {}-dimensional triangulation: {}", dim, name);
        }
        out.push_str(" * Code automatically generated by dumpConstruction().\n */\n\n");

        if tri.is_empty() {
            out.push_str("/* This triangulation is empty.  No code is being generated. */\n");
            return Ok(out);
        }

        out.push_str("/**\n * The following arrays describe the gluings between simplices.\n */\n\n");
        let n = tri.size();
        let _ = writeln!(out, "const int adjacencies[{}][{}] = {{", n, dim + 1);
        let rows = tri.simplices().iter().map(|s| {
            let cells = s.gluings().iter().map(|g| g.map_or("-1".to_string(), |g| g.simplex.to_string())).join(", ");
            format!("    {{ {} }}", cells)
        }).join(",\n");
        let _ = writeln!(out, "{}\n}};\n", rows);

        let _ = writeln!(out, "const int gluings[{}][{}][{}] = {{", n, dim + 1, dim + 1);
        let rows = tri.simplices().iter().map(|s| {
            let cells = s.gluings().iter().map(|g| {
                let images = match g {
                    Some(g) => g.perm.images().iter().join(", "),
                    None => vec!["0"; dim + 1].join(", "),
                };
                format!("{{ {} }}", images)
            }).join(", ");
            format!("    {{ {} }}", cells)
        }).join(",\n");
        let _ = writeln!(out, "{}\n}};\n", rows);

        let _ = write!(out, "/**\n * The following code constructs a {}-dimensional triangulation\n * based on the information stored in the arrays above.\n */\n\n", dim);
        let _ = write!(out, "Triangulation<{}> tri;\ntri.insertConstruction({}, adjacencies, gluings);\n\n", dim, n);
        Ok(out)
    }

    fn snappea_from_native(&self, tri: &Triangulation) -> Result<SnapPeaData, EngineError> {
        if tri.dim() != 3 {
            return Err(EngineError::Failed("SnapPea only works with 3-manifold triangulations.".to_string()));
        }
        if tri.is_empty() {
            return Err(EngineError::Failed("This triangulation is empty.".to_string()));
        }
        Ok(SnapPeaData { triangulation: tri.clone() })
    }

    fn snappea_to_native(&self, data: &SnapPeaData) -> Result<Triangulation, EngineError> {
        Ok(data.triangulation.clone())
    }

    fn read_snappea(&self, text: &str) -> Result<SnapPeaData, EngineError> {
        snappea::read(text)
            .map(|triangulation| SnapPeaData { triangulation })
            .map_err(|e| match e.line {
                Some(line) => EngineError::Failed(format!("line {}: {}", line, e.message)),
                None => EngineError::Failed(e.message),
            })
    }

    fn write_snappea(&self, data: &SnapPeaData, name: &str) -> Result<String, EngineError> {
        Ok(snappea::write(&data.triangulation, &skeleton::compute(&data.triangulation), name))
    }

    fn polynomial(&self, link: &Link, invariant: Invariant, threads: usize, tracker: Option<&ProgressTracker>) -> Result<Polynomial, EngineError> {
        match invariant {
            Invariant::Bracket => Ok(Polynomial::Laurent(bracket(link, threads, tracker)?)),
            Invariant::Jones => {
                /* V = (-A^3)^(-w) <L>, then A = t^(-1/4) written in sqrt(t) */
                let writhe = link.writhe();
                let sign = if writhe % 2 == 0 { 1 } else { -1 };
                let normalised = bracket(link, threads, tracker)?.shift(-3 * writhe).scale(sign);
                normalised.rescale_exponents(-1, 2)
                    .map(Polynomial::Laurent)
                    .ok_or_else(|| EngineError::Failed("the bracket has exponents of the wrong parity".to_string()))
            },
            _ => Err(EngineError::Unsupported("this polynomial invariant")),
        }
    }

    fn link_from_code(&self, code: &str) -> Result<Link, EngineError> {
        let code = code.trim();
        Link::from_oriented_gauss(code)
            .or_else(|_| Link::from_jenkins(code))
            .map_err(|_| EngineError::Failed("The text could not be read as an oriented Gauss code or a Jenkins code.".to_string()))
    }

    fn link_tree_decomposition_dot(&self, link: &Link, nice: bool) -> Result<String, EngineError> {
        let td = TreeDecomposition::greedy(&Graph::of_link(link));
        Ok(if nice { td.nice() } else { td }.to_dot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use crate::model::packet::{Packet, Payload};

    fn perm(text: &str) -> Perm {
        Perm::parse(text).unwrap()
    }

    fn doubled_tet() -> Triangulation {
        let gluings: Vec<_> = (0..4).map(|f| (0, f, 1, Perm::identity(4))).collect();
        Triangulation::from_gluings(3, 2, &gluings).unwrap()
    }

    fn mobius_band() -> Triangulation {
        Triangulation::from_gluings(2, 1, &[(0, 0, 0, perm("120"))]).unwrap()
    }

    fn left_trefoil() -> Link {
        Link::from_oriented_gauss("+>1 -<2 +>3 -<1 +>2 -<3").unwrap()
    }

    #[test]
    fn files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.rga");
        let root = Packet::container("Root");
        root.append(Packet::new("Sphere", Payload::Triangulation(doubled_tet()))).unwrap();

        BasicEngine.save(&root, &path).unwrap();
        let loaded = BasicEngine.open(&path).unwrap();
        assert_eq!(loaded.label(), "Root");
        assert_eq!(loaded.child(0).unwrap().read::<Triangulation, _>(Clone::clone), Some(doubled_tet()));
    }

    #[test]
    fn compressed_files_open() {
        use std::io::Write as _;

        let root = Packet::container("Packed");
        root.append(Packet::new("Sphere", Payload::Triangulation(doubled_tet()))).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(xml::write_tree(&root).as_bytes()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packed.rga");
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let loaded = BasicEngine.open(&path).unwrap();
        assert_eq!(loaded.label(), "Packed");
        assert_eq!(loaded.child(0).unwrap().read::<Triangulation, _>(Clone::clone), Some(doubled_tet()));
    }

    #[test]
    fn original_data_files_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.rga");
        fs::write(&path, "<?xml version=\"1.0\"?>\n<reginadata engine=\"4.6\">\n\
            <packet label=\"Sphere\" type=\"3-Manifold Triangulation\" typeid=\"3\" parent=\"\">\n\
            <tetrahedra ntet=\"2\">\n\
            <tet desc=\"\"> 1 228 1 228 1 228 1 228 </tet>\n\
            <tet desc=\"\"> 0 228 0 228 0 228 0 228 </tet>\n\
            </tetrahedra>\n</packet>\n</reginadata>\n").unwrap();

        let loaded = BasicEngine.open(&path).unwrap();
        assert_eq!(loaded.label(), "Sphere");
        assert_eq!(loaded.read::<Triangulation, _>(Clone::clone), Some(doubled_tet()));
    }

    #[test]
    fn unreadable_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.rga");
        assert_matches!(BasicEngine.open(&missing), Err(EngineError::Io { path, .. }) if path == missing);

        let truncated = dir.path().join("truncated.rga");
        fs::write(&truncated, [0x1f, 0x8b, 0x08, 0x00]).unwrap();
        assert_matches!(BasicEngine.open(&truncated), Err(EngineError::Io { .. }));

        let garbage = dir.path().join("garbage.rga");
        fs::write(&garbage, "<regina>\n<tri dim=\"3\" size=\"1\"/></regina>").unwrap();
        assert_matches!(BasicEngine.open(&garbage), Err(EngineError::Parse { line: Some(2), .. }));
    }

    #[test]
    fn orient_and_reflect() {
        let mut tri = doubled_tet();
        assert!(!skeleton::compute(&tri).oriented);
        BasicEngine.orient(&mut tri).unwrap();
        assert!(tri.is_consistent());
        assert!(skeleton::compute(&tri).oriented);

        BasicEngine.reflect(&mut tri).unwrap();
        assert!(skeleton::compute(&tri).oriented);

        let mut band = mobius_band();
        assert_matches!(BasicEngine.orient(&mut band), Err(EngineError::Failed(_)));
        assert_eq!(band, mobius_band());
    }

    #[test]
    fn barycentric_subdivision() {
        let mut tri = Triangulation::new(3);
        tri.add_simplex();
        BasicEngine.barycentric_subdivide(&mut tri).unwrap();
        assert_eq!(tri.size(), 24);
        assert!(tri.is_consistent());
        assert_eq!(tri.count_boundary_facets(), 24);

        let mut closed = doubled_tet();
        BasicEngine.barycentric_subdivide(&mut closed).unwrap();
        assert_eq!(closed.size(), 48);
        assert_eq!(closed.count_boundary_facets(), 0);
        assert!(skeleton::compute(&closed).vertex_links.iter().all(|l| *l == crate::model::triangulation::VertexLink::Sphere));
    }

    #[test]
    fn double_cover_is_orientable() {
        let cover = BasicEngine.double_cover(&mobius_band()).unwrap();
        assert_eq!(cover.size(), 2);
        assert!(cover.is_consistent());
        assert!(skeleton::compute(&cover).orientable);
    }

    #[test]
    fn components_split_apart() {
        let mut tri = doubled_tet();
        tri.add_simplex();
        tri.set_description(2, "lonely".into()).unwrap();
        let parts = BasicEngine.split_into_components(&tri).unwrap();
        assert_eq!(parts.iter().map(Triangulation::size).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(parts[0], doubled_tet());
        assert_eq!(parts[1].simplices()[0].description, "lonely");
    }

    #[test]
    fn isomorphism_ignores_labels() {
        let tri = doubled_tet();
        let mut relabelled = tri.clone();
        relabelled.relabel_simplex(0, perm("2031"));
        relabelled.relabel_simplex(1, perm("2031"));
        assert!(BasicEngine.is_isomorphic(&tri, &relabelled).unwrap());

        let mut swapped = tri.clone();
        swapped.unjoin(0, 3);
        swapped.unjoin(0, 2);
        swapped.join(0, 3, 1, perm("0132")).unwrap();
        swapped.join(0, 2, 1, perm("0132")).unwrap();
        assert!(swapped.is_consistent());
        assert!(!BasicEngine.is_isomorphic(&tri, &swapped).unwrap());

        let mut other = Triangulation::new(3);
        other.add_simplex();
        other.add_simplex();
        assert!(!BasicEngine.is_isomorphic(&tri, &other).unwrap());
    }

    #[test]
    fn one_four_move() {
        let mut tri = doubled_tet();
        assert_eq!(BasicEngine.move_candidates(&tri, &skeleton::compute(&tri), Move::OneFour).unwrap(), vec![0, 1]);
        assert_matches!(BasicEngine.move_legal(&tri, Move::ThreeTwo, 0), Err(EngineError::Unsupported(_)));

        BasicEngine.apply_move(&mut tri, Move::OneFour, 0).unwrap();
        assert_eq!(tri.size(), 5);
        assert!(tri.is_consistent());
        let sk = skeleton::compute(&tri);
        assert!(sk.is_closed());
        assert_eq!(sk.vertices.len(), 5);
    }

    #[test]
    fn recogniser_lists_every_triangle() {
        let text = BasicEngine.recogniser(&doubled_tet()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "triangulation");
        assert_eq!(lines[1], "t1(1,2,3) - t2(1,2,3),");
        assert!(!lines[4].ends_with(','));
        assert_eq!(lines[5], "end");

        let mut open = Triangulation::new(3);
        open.add_simplex();
        assert_matches!(BasicEngine.recogniser(&open), Err(EngineError::Failed(_)));
    }

    #[test]
    fn source_describes_gluings() {
        let text = BasicEngine.source(&doubled_tet(), "sphere").unwrap();
        assert!(text.contains(" * 3-dimensional triangulation: sphere\n"));
        assert!(text.contains("const int adjacencies[2][4] = {\n    { 1, 1, 1, 1 },\n    { 0, 0, 0, 0 }\n};"));
        assert!(text.contains("{ 0, 1, 2, 3 }"));
        assert!(text.ends_with("tri.insertConstruction(2, adjacencies, gluings);\n\n"));
        assert!(BasicEngine.source(&Triangulation::new(2), "").unwrap().contains("This triangulation is empty."));
    }

    #[test]
    fn jones_polynomial_of_trefoil() {
        let jones = BasicEngine.polynomial(&left_trefoil(), Invariant::Jones, 1, None).unwrap();
        assert_eq!(jones, Polynomial::Laurent(Laurent::from_terms([(-2, 1), (-6, 1), (-8, -1)])));

        let threaded = BasicEngine.polynomial(&left_trefoil(), Invariant::Jones, 3, None).unwrap();
        assert_eq!(threaded, jones);

        assert_eq!(BasicEngine.polynomial(&Link::unknot(), Invariant::Jones, 1, None).unwrap(), Polynomial::Laurent(Laurent::monomial(1, 0)));
    }

    #[test]
    fn kinks_only_change_the_bracket_by_units() {
        let kink = Link::from_jenkins("1\n2 0 1 0 -1\n0 1").unwrap();
        assert_eq!(BasicEngine.polynomial(&kink, Invariant::Bracket, 1, None).unwrap(), Polynomial::Laurent(Laurent::monomial(-1, 3)));
        assert_eq!(BasicEngine.polynomial(&kink, Invariant::Jones, 1, None).unwrap(), Polynomial::Laurent(Laurent::monomial(1, 0)));
    }

    #[test]
    fn cancelled_state_sums_stop() {
        let tracker = ProgressTracker::new();
        tracker.cancel();
        assert_matches!(BasicEngine.polynomial(&left_trefoil(), Invariant::Bracket, 2, Some(&tracker)), Err(EngineError::Cancelled));
        assert_matches!(BasicEngine.polynomial(&left_trefoil(), Invariant::Homfly, 1, None), Err(EngineError::Unsupported(_)));
    }

    #[test]
    fn link_codes_are_recognised() {
        assert_eq!(BasicEngine.link_from_code("  +>1 -<2 +>3 -<1 +>2 -<3 ").unwrap(), left_trefoil());
        assert_eq!(BasicEngine.link_from_code(&left_trefoil().jenkins()).unwrap(), left_trefoil());
        assert_matches!(BasicEngine.link_from_code("hello"), Err(EngineError::Failed(_)));
    }
}
