//! The SnapPea 3.0 triangulation file format.
//!
//! Only the combinatorial content is interpreted: neighbours and gluing
//! permutations. Cusp indices, peripheral curves and shapes are written as
//! placeholders and skipped when reading.

use std::fmt::Write;

use crate::model::perm::Perm;
use crate::model::triangulation::{Skeleton, Triangulation, VertexLink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapPeaParseError {
    pub line: Option<usize>,
    pub message: String,
}

struct Tokens<'a> {
    tokens: Vec<(usize, &'a str)>,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(lines: impl Iterator<Item = (usize, &'a str)>) -> Tokens<'a> {
        Tokens {
            tokens: lines.flat_map(|(n, line)| line.split_whitespace().map(move |t| (n, t))).collect(),
            cursor: 0,
        }
    }

    fn line(&self) -> Option<usize> {
        self.tokens.get(self.cursor.min(self.tokens.len().saturating_sub(1))).map(|(n, _)| n + 1)
    }

    fn next(&mut self, what: &str) -> Result<&'a str, SnapPeaParseError> {
        match self.tokens.get(self.cursor) {
            Some((_, token)) => {
                self.cursor+= 1;
                Ok(token)
            },
            None => Err(SnapPeaParseError { line: None, message: format!("the file ended while reading {}", what) }),
        }
    }

    fn number<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, SnapPeaParseError> {
        let line = self.line();
        let token = self.next(what)?;
        token.parse().map_err(|_| SnapPeaParseError { line, message: format!("expected {} but found \"{}\"", what, token) })
    }
}

pub fn read(text: &str) -> Result<Triangulation, SnapPeaParseError> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    match lines.next() {
        Some((_, first)) if first.trim_start().starts_with("% Triangulation") => {},
        _ => return Err(SnapPeaParseError { line: Some(1), message: "this is not a SnapPea triangulation file".into() }),
    }

    /* name, solution type, orientability, Chern-Simons */
    let header: Vec<_> = lines.by_ref().take(4).collect();
    if header.len() < 4 {
        return Err(SnapPeaParseError { line: None, message: "the file header is incomplete".into() });
    }

    let mut tokens = Tokens::new(lines);
    let orientable_cusps: usize = tokens.number("the number of orientable cusps")?;
    let nonorientable_cusps: usize = tokens.number("the number of non-orientable cusps")?;
    for _ in 0..(orientable_cusps + nonorientable_cusps) {
        tokens.next("a cusp type")?;
        tokens.number::<f64>("a cusp filling")?;
        tokens.number::<f64>("a cusp filling")?;
    }

    let size: usize = tokens.number("the number of tetrahedra")?;
    let mut neighbours = vec![[0i64; 4]; size];
    let mut perms = vec![[Perm::identity(4); 4]; size];
    for tet in 0..size {
        for facet in 0..4 {
            neighbours[tet][facet] = tokens.number("a neighbouring tetrahedron")?;
        }
        for facet in 0..4 {
            let line = tokens.line();
            let token = tokens.next("a gluing permutation")?;
            perms[tet][facet] = Perm::parse(token).filter(|p| p.size() == 4).ok_or_else(|| SnapPeaParseError {
                line,
                message: format!("\"{}\" is not a permutation of 0123", token),
            })?;
        }
        for _ in 0..4 {
            tokens.number::<i64>("a cusp index")?;
        }
        for _ in 0..64 {
            tokens.number::<i64>("a peripheral curve")?;
        }
        tokens.number::<f64>("a shape")?;
        tokens.number::<f64>("a shape")?;
    }

    let mut tri = Triangulation::new(3);
    for _ in 0..size {
        tri.add_simplex();
    }
    for tet in 0..size {
        for facet in 0..4 {
            let target = neighbours[tet][facet];
            let existing = tri.adjacent(tet, facet);
            if target < 0 {
                if existing.is_some() {
                    return Err(SnapPeaParseError { line: None, message: format!("tetrahedron {} facet {} is glued on one side only", tet, facet) });
                }
                continue;
            }
            let target = target as usize;
            if target >= size {
                return Err(SnapPeaParseError { line: None, message: format!("tetrahedron {} is glued to missing tetrahedron {}", tet, target) });
            }
            if let Some(existing) = existing {
                if existing.simplex != target || existing.perm != perms[tet][facet] {
                    return Err(SnapPeaParseError { line: None, message: format!("tetrahedron {} facet {} disagrees with its partner", tet, facet) });
                }
                continue;
            }
            tri.join(tet, facet, target, perms[tet][facet]).map_err(|e| SnapPeaParseError { line: None, message: e.to_string() })?;
        }
    }

    if !tri.is_consistent() {
        return Err(SnapPeaParseError { line: None, message: "the gluings are not symmetric".into() });
    }
    Ok(tri)
}

pub fn write(tri: &Triangulation, skeleton: &Skeleton, name: &str) -> String {
    let mut out = String::new();
    out.push_str("% Triangulation\n");
    let _ = writeln!(out, "{}", if name.is_empty() { "untitled" } else { name });
    out.push_str("not_attempted  0.000000000000\n");
    out.push_str(if skeleton.oriented {
        "oriented_manifold\n"
    } else if skeleton.orientable {
        "orientable_manifold\n"
    } else {
        "nonorientable_manifold\n"
    });
    out.push_str("CS_unknown\n\n");

    let klein = skeleton.vertex_links.iter().filter(|l| **l == VertexLink::KleinBottle).count();
    let torus = skeleton.vertex_links.len() - klein;
    let _ = writeln!(out, "{} {}", torus, klein);
    for link in &skeleton.vertex_links {
        let kind = if *link == VertexLink::KleinBottle { "Klein" } else { "torus" };
        let _ = writeln!(out, "   {}   0.000000000000   0.000000000000", kind);
    }
    out.push('\n');

    let _ = writeln!(out, "{}", tri.size());
    for (tet, simplex) in tri.simplices().iter().enumerate() {
        for facet in 0..4 {
            let target = simplex.adjacent(facet).map_or(-1, |g| g.simplex as i64);
            let _ = write!(out, "{:5}", target);
        }
        out.push('\n');
        for facet in 0..4 {
            let perm = simplex.adjacent(facet).map_or(Perm::identity(4), |g| g.perm);
            let _ = write!(out, " {}", perm);
        }
        out.push('\n');
        for v in 0..4 {
            let _ = write!(out, "{:5}", skeleton.vertex_index[tet][v]);
        }
        out.push('\n');
        for _ in 0..4 {
            out.push_str(" 0 0 0 0  0 0 0 0   0 0 0 0  0 0 0 0\n");
        }
        out.push_str("  0.000000000000   0.000000000000\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    use crate::engine::skeleton;

    #[test]
    fn write_then_read() {
        let gluings: Vec<_> = (0..4).map(|f| (0, f, 1, Perm::parse("1023").unwrap())).collect();
        let tri = Triangulation::from_gluings(3, 2, &gluings).unwrap();
        let text = write(&tri, &skeleton::compute(&tri), "m000");
        assert!(text.starts_with("% Triangulation\nm000\n"));
        assert_eq!(read(&text).unwrap(), tri);
    }

    #[test]
    fn rejects_other_files() {
        assert_matches!(read("<regina/>"), Err(SnapPeaParseError { line: Some(1), .. }));
        let truncated = "% Triangulation\nx\nnot_attempted 0\noriented_manifold\nCS_unknown\n\n0 0\n1\n 0 0 0";
        assert_matches!(read(truncated), Err(SnapPeaParseError { line: None, .. }));
    }
}
