//! Link diagrams and their text codes.
//!
//! A diagram is a set of signed crossings. Each crossing has a lower strand
//! (0) and an upper strand (1); every strand knows the strand that follows it
//! along its component. A component with no crossings at all is a zero-crossing
//! unknot and has no starting strand.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;

use crate::model::polynomial;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrandRef {
    pub crossing: usize,
    pub strand: u8,
}

impl StrandRef {
    pub fn lower(crossing: usize) -> StrandRef {
        StrandRef { crossing, strand: 0 }
    }

    pub fn upper(crossing: usize) -> StrandRef {
        StrandRef { crossing, strand: 1 }
    }

    pub fn is_upper(&self) -> bool {
        self.strand == 1
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Crossing {
    pub sign: i8,
    next: [StrandRef; 2],
    prev: [StrandRef; 2],
}

impl Crossing {
    pub fn next(&self, strand: u8) -> StrandRef {
        self.next[strand as usize]
    }

    pub fn prev(&self, strand: u8) -> StrandRef {
        self.prev[strand as usize]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodeError {
    NotKnot,
    Empty,
    TooManyCrossings { max: usize },
    Parse(String),
    Inconsistent(String),
}

impl fmt::Display for CodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeError::NotKnot => write!(f, "this code is only available for knots"),
            CodeError::Empty => write!(f, "the link is empty"),
            CodeError::TooManyCrossings { max } => write!(f, "this code is only available for at most {} crossings", max),
            CodeError::Parse(msg) => write!(f, "could not parse code: {}", msg),
            CodeError::Inconsistent(msg) => write!(f, "inconsistent code: {}", msg),
        }
    }
}

impl std::error::Error for CodeError {}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Link {
    crossings: Vec<Crossing>,
    components: Vec<Option<StrandRef>>,
    cache: BTreeMap<polynomial::Invariant, polynomial::Polynomial>,
}

impl Link {
    pub fn unknot() -> Link {
        Link { components: vec![None], ..Link::default() }
    }

    /// Builds a link from the strand sequence of each component. Every strand
    /// of every crossing must be used exactly once.
    pub fn from_components(signs: Vec<i8>, components: Vec<Vec<StrandRef>>) -> Result<Link, CodeError> {
        let n = signs.len();
        if let Some(bad) = signs.iter().find(|s| **s != 1 && **s != -1) {
            return Err(CodeError::Inconsistent(format!("crossing sign {} is not ±1", bad)));
        }

        let mut used = vec![[false; 2]; n];
        let placeholder = StrandRef::lower(0);
        let mut crossings: Vec<Crossing> = signs.iter().map(|&sign| Crossing {
            sign,
            next: [placeholder; 2],
            prev: [placeholder; 2],
        }).collect();

        let mut starts = Vec::with_capacity(components.len());
        for component in &components {
            for strand in component {
                if strand.crossing >= n || strand.strand > 1 {
                    return Err(CodeError::Inconsistent(format!("strand {:?} refers to a missing crossing", strand)));
                }
                let slot = &mut used[strand.crossing][strand.strand as usize];
                if *slot {
                    return Err(CodeError::Inconsistent(format!("crossing {} is passed {} twice", strand.crossing, if strand.is_upper() { "over" } else { "under" })));
                }
                *slot = true;
            }

            for (a, b) in component.iter().circular_tuple_windows() {
                crossings[a.crossing].next[a.strand as usize] = *b;
                crossings[b.crossing].prev[b.strand as usize] = *a;
            }

            starts.push(component.first().copied());
        }

        if let Some(c) = used.iter().position(|u| !u[0] || !u[1]) {
            return Err(CodeError::Inconsistent(format!("crossing {} is not passed both over and under", c)));
        }

        Ok(Link { crossings, components: starts, cache: BTreeMap::new() })
    }

    pub fn size(&self) -> usize {
        self.crossings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn count_components(&self) -> usize {
        self.components.len()
    }

    pub fn is_knot(&self) -> bool {
        self.components.len() == 1
    }

    pub fn crossing(&self, index: usize) -> Option<&Crossing> {
        self.crossings.get(index)
    }

    pub fn crossings(&self) -> &[Crossing] {
        &self.crossings
    }

    pub fn component(&self, index: usize) -> Option<StrandRef> {
        self.components.get(index).copied().flatten()
    }

    pub fn writhe(&self) -> i64 {
        self.crossings.iter().map(|c| c.sign as i64).sum()
    }

    /// The strands of one component in traversal order, starting from its
    /// designated starting strand. Empty for a zero-crossing unknot.
    pub fn traverse(&self, component: usize) -> Vec<StrandRef> {
        let start = match self.component(component) {
            Some(s) => s,
            None => return Vec::new(),
        };

        let mut strands = vec![start];
        let mut cursor = self.crossings[start.crossing].next(start.strand);
        while cursor != start && strands.len() <= 2 * self.crossings.len() {
            strands.push(cursor);
            cursor = self.crossings[cursor.crossing].next(cursor.strand);
        }
        strands
    }

    pub fn polynomial(&self, invariant: polynomial::Invariant) -> Option<&polynomial::Polynomial> {
        self.cache.get(&invariant)
    }

    pub fn cached_polynomials(&self) -> impl Iterator<Item = (polynomial::Invariant, &polynomial::Polynomial)> {
        self.cache.iter().map(|(i, p)| (*i, p))
    }

    pub fn set_polynomial(&mut self, invariant: polynomial::Invariant, value: polynomial::Polynomial) {
        self.cache.insert(invariant, value);
    }

    fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Switches which strand passes over at one crossing.
    pub fn change_crossing(&mut self, crossing: usize) {
        if crossing >= self.crossings.len() {
            return;
        }

        let flip = |s: StrandRef| if s.crossing == crossing { StrandRef { crossing, strand: 1 - s.strand } } else { s };

        for c in self.crossings.iter_mut() {
            c.next = [flip(c.next[0]), flip(c.next[1])];
            c.prev = [flip(c.prev[0]), flip(c.prev[1])];
        }
        let c = &mut self.crossings[crossing];
        c.next.swap(0, 1);
        c.prev.swap(0, 1);
        c.sign = -c.sign;

        for start in self.components.iter_mut().flatten() {
            *start = flip(*start);
        }
        self.invalidate();
    }

    /// Mirror image: every crossing is changed.
    pub fn reflect(&mut self) {
        for c in 0..self.crossings.len() {
            self.change_crossing(c);
        }
    }

    /// Reverses the orientation of every component.
    pub fn reverse(&mut self) {
        for c in self.crossings.iter_mut() {
            std::mem::swap(&mut c.next, &mut c.prev);
        }
        self.invalidate();
    }

    fn knot_strands(&self) -> Result<Vec<StrandRef>, CodeError> {
        if !self.is_knot() {
            return Err(CodeError::NotKnot);
        }
        Ok(self.traverse(0))
    }

    /// Classical Gauss code: crossings numbered from 1, positive when passing
    /// over and negative when passing under.
    pub fn gauss(&self) -> Result<String, CodeError> {
        Ok(self.knot_strands()?.iter().map(|s| {
            let label = s.crossing as i64 + 1;
            if s.is_upper() { label } else { -label }
        }).join(" "))
    }

    /// Oriented Gauss code: each token is `+` (over) or `-` (under), then `<`
    /// or `>` for the direction the other strand passes, then the crossing
    /// number from 1.
    pub fn oriented_gauss(&self) -> Result<String, CodeError> {
        Ok(self.knot_strands()?.iter().map(|s| {
            let sign = self.crossings[s.crossing].sign;
            let over = s.is_upper();
            let direction = if over == (sign > 0) { '<' } else { '>' };
            format!("{}{}{}", if over { '+' } else { '-' }, direction, s.crossing + 1)
        }).join(" "))
    }

    /// Signed Gauss code in the `O1-U2+...` form.
    pub fn signed_gauss(&self) -> Result<String, CodeError> {
        Ok(self.knot_strands()?.iter().map(|s| {
            format!("{}{}{}",
                    if s.is_upper() { 'O' } else { 'U' },
                    s.crossing + 1,
                    if self.crossings[s.crossing].sign > 0 { '+' } else { '-' })
        }).collect())
    }

    fn dt_labels(&self) -> Result<Vec<i64>, CodeError> {
        let strands = self.knot_strands()?;
        let mut odd_position = vec![None; self.crossings.len()];
        let mut even_position = vec![None; self.crossings.len()];

        for (i, s) in strands.iter().enumerate() {
            let position = i + 1;
            let slot = if position % 2 == 1 { &mut odd_position } else { &mut even_position };
            if slot[s.crossing].is_some() {
                return Err(CodeError::Inconsistent(format!("crossing {} is not met once at an odd and once at an even step", s.crossing + 1)));
            }
            slot[s.crossing] = Some((position as i64, s.is_upper()));
        }

        let mut pairs = Vec::with_capacity(self.crossings.len());
        for c in 0..self.crossings.len() {
            match (odd_position[c], even_position[c]) {
                (Some((odd, _)), Some((even, even_over))) => pairs.push((odd, if even_over { -even } else { even })),
                _ => return Err(CodeError::Inconsistent(format!("crossing {} is not met once at an odd and once at an even step", c + 1))),
            }
        }

        pairs.sort();
        Ok(pairs.into_iter().map(|(_, even)| even).collect())
    }

    /// Numeric Dowker-Thistlethwaite notation. An even label is negative when
    /// the knot passes over at that step.
    pub fn dt(&self) -> Result<String, CodeError> {
        Ok(self.dt_labels()?.iter().join(" "))
    }

    /// Alphabetic Dowker-Thistlethwaite notation, for at most 26 crossings.
    pub fn dt_alpha(&self) -> Result<String, CodeError> {
        if self.crossings.len() > 26 {
            return Err(CodeError::TooManyCrossings { max: 26 });
        }
        Ok(self.dt_labels()?.iter().map(|&label| {
            let letter = (b'a' + (label.unsigned_abs() / 2 - 1) as u8) as char;
            if label < 0 { letter.to_ascii_uppercase() } else { letter }
        }).collect())
    }

    /// Planar diagram code in Knot Atlas conventions. Arcs are numbered from
    /// 1 along each component in turn; each crossing is listed starting from
    /// the incoming lower arc and proceeding counter-clockwise, in the order
    /// the lower strands are entered. Zero-crossing components are omitted.
    pub fn pd(&self) -> String {
        let mut incoming = vec![[0usize; 2]; self.crossings.len()];
        let mut outgoing = vec![[0usize; 2]; self.crossings.len()];
        let mut lower_entry = vec![0usize; self.crossings.len()];

        let mut base = 0;
        let mut step = 0;
        for component in 0..self.components.len() {
            let strands = self.traverse(component);
            let m = strands.len();
            for (j, s) in strands.iter().enumerate() {
                incoming[s.crossing][s.strand as usize] = base + j + 1;
                outgoing[s.crossing][s.strand as usize] = base + (j + 1) % m + 1;
                if !s.is_upper() {
                    lower_entry[s.crossing] = step;
                }
                step+= 1;
            }
            base+= m;
        }

        let tuples = (0..self.crossings.len())
            .sorted_by_key(|&c| lower_entry[c])
            .map(|c| {
                let (il, ol) = (incoming[c][0], outgoing[c][0]);
                let (iu, ou) = (incoming[c][1], outgoing[c][1]);
                if self.crossings[c].sign > 0 {
                    format!("[{}, {}, {}, {}]", il, ou, ol, iu)
                } else {
                    format!("[{}, {}, {}, {}]", il, iu, ol, ou)
                }
            })
            .join(", ");

        format!("[{}]", tuples)
    }

    /// Jenkins' format: the component count, then one line per component
    /// giving its length and `(crossing, ±1)` pairs (+1 over, -1 under), then
    /// a line of `(crossing, sign)` pairs. Crossings are numbered from 0.
    pub fn jenkins(&self) -> String {
        let mut lines = vec![self.components.len().to_string()];
        for component in 0..self.components.len() {
            let strands = self.traverse(component);
            let mut line = strands.len().to_string();
            for s in strands {
                line.push_str(&format!(" {} {}", s.crossing, if s.is_upper() { 1 } else { -1 }));
            }
            lines.push(line);
        }
        lines.push(self.crossings.iter().enumerate().map(|(i, c)| format!("{} {}", i, c.sign)).join(" "));
        lines.join("\n")
    }

    pub fn from_jenkins(text: &str) -> Result<Link, CodeError> {
        let mut numbers = text.split_whitespace().map(|t| t.parse::<i64>().map_err(|_| CodeError::Parse(format!("'{}' is not an integer", t))));
        let mut next = move || numbers.next().unwrap_or(Err(CodeError::Parse("unexpected end of input".to_string())));

        let component_count = next()?;
        if component_count < 0 {
            return Err(CodeError::Parse("negative component count".to_string()));
        }

        let mut components = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..component_count {
            let length = next()?;
            if length < 0 {
                return Err(CodeError::Parse("negative component length".to_string()));
            }
            let mut strands = Vec::new();
            for _ in 0..length {
                let crossing = next()?;
                let over = next()?;
                if crossing < 0 || (over != 1 && over != -1) {
                    return Err(CodeError::Parse(format!("bad strand ({}, {})", crossing, over)));
                }
                seen.insert(crossing as usize);
                strands.push(StrandRef { crossing: crossing as usize, strand: if over == 1 { 1 } else { 0 } });
            }
            components.push(strands);
        }

        let n = seen.len();
        if seen.iter().next_back().map_or(false, |&max| max + 1 != n) {
            return Err(CodeError::Inconsistent("crossings must be numbered 0, 1, ..., n-1".to_string()));
        }

        let mut signs = vec![0i8; n];
        for _ in 0..n {
            let crossing = next()?;
            let sign = next()?;
            if crossing < 0 || crossing as usize >= n || (sign != 1 && sign != -1) {
                return Err(CodeError::Parse(format!("bad crossing sign ({}, {})", crossing, sign)));
            }
            signs[crossing as usize] = sign as i8;
        }

        Link::from_components(signs, components)
    }

    pub fn from_oriented_gauss(text: &str) -> Result<Link, CodeError> {
        let mut strands = Vec::new();
        let mut signs: BTreeMap<usize, i8> = BTreeMap::new();

        for token in text.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
            let mut chars = token.chars();
            let over = match chars.next() {
                Some('+') => true,
                Some('-') => false,
                _ => return Err(CodeError::Parse(format!("'{}' should begin with + or -", token))),
            };
            let left_to_right = match chars.next() {
                Some('<') => false,
                Some('>') => true,
                _ => return Err(CodeError::Parse(format!("'{}' should have < or > in second position", token))),
            };
            let label: usize = chars.as_str().parse().map_err(|_| CodeError::Parse(format!("'{}' has no crossing number", token)))?;
            if label == 0 {
                return Err(CodeError::Parse("crossings are numbered from 1".to_string()));
            }

            let sign = if over != left_to_right { 1 } else { -1 };
            if let Some(previous) = signs.insert(label - 1, sign) {
                if previous != sign {
                    return Err(CodeError::Inconsistent(format!("crossing {} has conflicting signs", label)));
                }
            }

            strands.push(StrandRef { crossing: label - 1, strand: if over { 1 } else { 0 } });
        }

        if strands.is_empty() {
            return Ok(Link::unknot());
        }

        let n = signs.len();
        if signs.keys().next_back().map_or(false, |&max| max + 1 != n) {
            return Err(CodeError::Inconsistent("crossings must be numbered 1, 2, ..., n".to_string()));
        }

        Link::from_components(signs.into_values().collect(), vec![strands])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn left_trefoil() -> Link {
        Link::from_oriented_gauss("+>1 -<2 +>3 -<1 +>2 -<3").unwrap()
    }

    fn hopf() -> Link {
        Link::from_jenkins("2\n2 0 1 1 -1\n2 0 -1 1 1\n0 1 1 1").unwrap()
    }

    #[test]
    fn trefoil_codes() {
        let k = left_trefoil();
        assert_eq!(k.size(), 3);
        assert_eq!(k.writhe(), -3);
        assert_eq!(k.gauss().unwrap(), "1 -2 3 -1 2 -3");
        assert_eq!(k.oriented_gauss().unwrap(), "+>1 -<2 +>3 -<1 +>2 -<3");
        assert_eq!(k.signed_gauss().unwrap(), "O1-U2-O3-U1-O2-U3-");
        assert_eq!(k.dt().unwrap(), "4 6 2");
        assert_eq!(k.dt_alpha().unwrap(), "bca");
        assert_eq!(k.pd(), "[[2, 5, 3, 6], [4, 1, 5, 2], [6, 3, 1, 4]]");
        assert_eq!(k.jenkins(), "1\n6 0 1 1 -1 2 1 0 -1 1 1 2 -1\n0 -1 1 -1 2 -1");
    }

    #[test]
    fn jenkins_reloads() {
        let k = left_trefoil();
        assert_eq!(Link::from_jenkins(&k.jenkins()).unwrap(), k);
        let h = hopf();
        assert_eq!(Link::from_jenkins(&h.jenkins()).unwrap(), h);
    }

    #[test]
    fn knot_only_codes_refuse_links() {
        let h = hopf();
        assert_eq!(h.count_components(), 2);
        assert_matches!(h.gauss(), Err(CodeError::NotKnot));
        assert_matches!(h.dt(), Err(CodeError::NotKnot));
        assert_eq!(h.pd(), "[[2, 3, 1, 4], [3, 2, 4, 1]]");
    }

    #[test]
    fn reflection_negates_writhe() {
        let mut k = left_trefoil();
        k.reflect();
        assert_eq!(k.writhe(), 3);
        assert_eq!(k.gauss().unwrap(), "-1 2 -3 1 -2 3");
        k.reflect();
        assert_eq!(k, left_trefoil());
    }

    #[test]
    fn reversal_keeps_signs() {
        let mut k = left_trefoil();
        k.reverse();
        assert_eq!(k.writhe(), -3);
        assert_eq!(k.gauss().unwrap(), "1 -3 2 -1 3 -2");
    }

    #[test]
    fn bad_codes() {
        assert_matches!(Link::from_oriented_gauss("+>1 +>1"), Err(CodeError::Inconsistent(_)));
        assert_matches!(Link::from_oriented_gauss("+>1 ->1"), Err(CodeError::Inconsistent(_)));
        assert_matches!(Link::from_oriented_gauss("x1"), Err(CodeError::Parse(_)));
        assert_matches!(Link::from_jenkins("1\n2 0 1"), Err(CodeError::Parse(_)));
        assert_eq!(Link::from_oriented_gauss("").unwrap(), Link::unknot());
    }
}
