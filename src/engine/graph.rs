//! Graphs derived from triangulations and link diagrams, their tree
//! decompositions, and Graphviz renderings of both.

use std::collections::BTreeSet;
use std::fmt::Write;

use itertools::Itertools;

use crate::model::link::Link;
use crate::model::triangulation::Triangulation;

/// A simple undirected graph on `0..len()`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph {
    adjacency: Vec<BTreeSet<usize>>,
}

impl Graph {
    pub fn new(nodes: usize) -> Graph {
        Graph { adjacency: vec![BTreeSet::new(); nodes] }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Loops are dropped and parallel edges are merged.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if a != b {
            self.adjacency[a].insert(b);
            self.adjacency[b].insert(a);
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency.iter().enumerate()
            .flat_map(|(a, adj)| adj.iter().filter(move |&&b| a < b).map(move |&b| (a, b)))
    }

    /// Nodes are simplices; edges join simplices that share a facet.
    pub fn dual(tri: &Triangulation) -> Graph {
        let mut graph = Graph::new(tri.size());
        for (s, simplex) in tri.simplices().iter().enumerate() {
            for gluing in simplex.gluings().iter().flatten() {
                graph.add_edge(s, gluing.simplex);
            }
        }
        graph
    }

    /// Nodes are crossings; edges follow the strands between them.
    pub fn of_link(link: &Link) -> Graph {
        let mut graph = Graph::new(link.size());
        for (c, crossing) in link.crossings().iter().enumerate() {
            for strand in 0..2 {
                graph.add_edge(c, crossing.next(strand).crossing);
            }
        }
        graph
    }
}

/// The dual graph with multi-edges kept, as Graphviz source.
pub fn dual_graph_dot(tri: &Triangulation, labels: bool) -> String {
    let mut out = String::new();
    out.push_str("graph G {\n");
    out.push_str("edge [color=black];\n");
    if labels {
        out.push_str("node [shape=circle,style=filled,height=0.3,fixedsize=true,fontsize=9,fontcolor=\"#751010\",fillcolor=\"#ff8080\"];\n");
    } else {
        out.push_str("node [shape=circle,style=filled,height=0.15,fixedsize=true,label=\"\",fillcolor=\"#ff8080\"];\n");
    }
    for s in 0..tri.size() {
        if labels {
            let _ = writeln!(out, "g_{} [label=\"{}\"];", s, s);
        } else {
            let _ = writeln!(out, "g_{};", s);
        }
    }
    for (s, simplex) in tri.simplices().iter().enumerate() {
        for (facet, gluing) in simplex.gluings().iter().enumerate() {
            let Some(gluing) = gluing else { continue };
            /* list each gluing from its smaller end only */
            if (gluing.simplex, gluing.perm.apply(facet)) > (s, facet) {
                let _ = writeln!(out, "g_{} -- g_{};", s, gluing.simplex);
            }
        }
    }
    out.push_str("}\n");
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BagKind {
    Plain,
    Leaf,
    Introduce(usize),
    Forget(usize),
    Join,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bag {
    pub elements: BTreeSet<usize>,
    pub kind: BagKind,
    pub children: Vec<usize>,
}

/// A rooted tree decomposition. Bags are indexed; `root` names the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeDecomposition {
    pub bags: Vec<Bag>,
    pub root: usize,
}

impl TreeDecomposition {
    /// Greedy minimum-degree elimination.
    pub fn greedy(graph: &Graph) -> TreeDecomposition {
        let n = graph.len();
        if n == 0 {
            return TreeDecomposition {
                bags: vec![Bag { elements: BTreeSet::new(), kind: BagKind::Plain, children: Vec::new() }],
                root: 0,
            };
        }

        let mut adjacency = graph.adjacency.clone();
        let mut position = vec![usize::MAX; n];
        let mut neighbours_at_elimination = vec![BTreeSet::new(); n];

        for step in 0..n {
            let v = (0..n)
                .filter(|&v| position[v] == usize::MAX)
                .min_by_key(|&v| (adjacency[v].len(), v))
                .unwrap_or(0);
            position[v] = step;
            let neighbours = std::mem::take(&mut adjacency[v]);
            for (&a, &b) in neighbours.iter().tuple_combinations() {
                adjacency[a].insert(b);
                adjacency[b].insert(a);
            }
            for &u in &neighbours {
                adjacency[u].remove(&v);
            }
            neighbours_at_elimination[v] = neighbours;
        }

        /* bag i belongs to the vertex eliminated at step i */
        let mut order = vec![0; n];
        for v in 0..n {
            order[position[v]] = v;
        }

        let mut bags: Vec<Bag> = order.iter().map(|&v| {
            let mut elements = neighbours_at_elimination[v].clone();
            elements.insert(v);
            Bag { elements, kind: BagKind::Plain, children: Vec::new() }
        }).collect();

        let mut roots = Vec::new();
        for (step, &v) in order.iter().enumerate() {
            match neighbours_at_elimination[v].iter().map(|&u| position[u]).min() {
                Some(parent) => bags[parent].children.push(step),
                None => roots.push(step),
            }
        }

        /* one tree per connected component; chain the component roots together */
        for (&child, &parent) in roots.iter().tuple_windows() {
            bags[parent].children.push(child);
        }
        let root = roots.last().copied().unwrap_or(n - 1);

        TreeDecomposition { bags, root }
    }

    pub fn width(&self) -> usize {
        self.bags.iter().map(|b| b.elements.len()).max().unwrap_or(0).saturating_sub(1)
    }

    /// Rewrites the decomposition so that every bag is a leaf (empty), an
    /// introduce or forget bag with one child differing by one element, or a
    /// join bag whose two children are identical to it. The root is empty.
    pub fn nice(&self) -> TreeDecomposition {
        let mut out = TreeDecomposition { bags: Vec::new(), root: 0 };
        let top = out.build_nice(self, self.root);
        out.root = out.chain(top, &BTreeSet::new());
        out
    }

    fn push(&mut self, elements: BTreeSet<usize>, kind: BagKind, children: Vec<usize>) -> usize {
        self.bags.push(Bag { elements, kind, children });
        self.bags.len() - 1
    }

    /// Forgets and introduces one element at a time from bag `from` until
    /// reaching `target`. Returns the bag equal to `target`.
    fn chain(&mut self, from: usize, target: &BTreeSet<usize>) -> usize {
        let mut current = from;
        let forget: Vec<usize> = self.bags[from].elements.difference(target).copied().collect();
        for x in forget {
            let mut elements = self.bags[current].elements.clone();
            elements.remove(&x);
            current = self.push(elements, BagKind::Forget(x), vec![current]);
        }
        let introduce: Vec<usize> = target.difference(&self.bags[current].elements).copied().collect();
        for x in introduce {
            let mut elements = self.bags[current].elements.clone();
            elements.insert(x);
            current = self.push(elements, BagKind::Introduce(x), vec![current]);
        }
        current
    }

    fn build_nice(&mut self, plain: &TreeDecomposition, bag: usize) -> usize {
        let target = plain.bags[bag].elements.clone();
        let children = &plain.bags[bag].children;
        if children.is_empty() {
            let leaf = self.push(BTreeSet::new(), BagKind::Leaf, Vec::new());
            return self.chain(leaf, &target);
        }

        let mut branches = Vec::with_capacity(children.len());
        for &child in children {
            let top = self.build_nice(plain, child);
            branches.push(self.chain(top, &target));
        }

        let mut branches = branches.into_iter();
        let mut current = branches.next().unwrap_or(0);
        for other in branches {
            current = self.push(target.clone(), BagKind::Join, vec![current, other]);
        }
        current
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        out.push_str("graph tree {\n");
        out.push_str("node [shape=rect,fontsize=9];\n");
        for (i, bag) in self.bags.iter().enumerate() {
            let contents = if bag.elements.is_empty() { "∅".to_string() } else { bag.elements.iter().join(" ") };
            let label = match bag.kind {
                BagKind::Plain => contents,
                BagKind::Leaf => format!("Leaf: {}", contents),
                BagKind::Introduce(x) => format!("Introduce {}: {}", x, contents),
                BagKind::Forget(x) => format!("Forget {}: {}", x, contents),
                BagKind::Join => format!("Join: {}", contents),
            };
            let _ = writeln!(out, "b_{} [label=\"{}\"];", i, label);
        }
        for (i, bag) in self.bags.iter().enumerate() {
            for child in &bag.children {
                let _ = writeln!(out, "b_{} -- b_{};", i, child);
            }
        }
        out.push_str("}\n");
        out
    }
}
