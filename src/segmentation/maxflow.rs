//! s/t minimum cut on pixel graphs
//!
//! Dinic's algorithm over a flat edge list. Terminal links are folded into
//! a single signed capacity per node, the way graph-cut segmenters usually
//! store them: positive means an edge from the source, negative an edge to
//! the sink. The depth-first phase is iterative so large images cannot
//! overflow the stack.

use std::collections::VecDeque;

const NONE: u32 = u32::MAX;
const UNREACHED: u32 = u32::MAX;

/// Residual capacities below this are treated as saturated
const CAPACITY_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: u32,
    next: u32,
    capacity: f64,
}

/// Flow network with one node per pixel plus source and sink
#[derive(Debug)]
pub(crate) struct FlowGraph {
    node_count: usize,
    head: Vec<u32>,
    edges: Vec<Edge>,
    terminal: Vec<f64>,
    constant_flow: f64,
    level: Vec<u32>,
    current: Vec<u32>,
    source_side: Vec<bool>,
}

impl FlowGraph {
    /// Graph over `node_count` pixel nodes, reserving room for `edge_hint` n-link pairs
    pub(crate) fn new(node_count: usize, edge_hint: usize) -> Self {
        let total = node_count + 2;
        Self {
            node_count,
            head: vec![NONE; total],
            edges: Vec::with_capacity(edge_hint * 2 + node_count * 2),
            terminal: vec![0.0; node_count],
            constant_flow: 0.0,
            level: vec![UNREACHED; total],
            current: vec![NONE; total],
            source_side: Vec::new(),
        }
    }

    fn source(&self) -> usize {
        self.node_count
    }

    fn sink(&self) -> usize {
        self.node_count + 1
    }

    fn push_edge(&mut self, from: usize, to: usize, capacity: f64) {
        let index = self.edges.len() as u32;
        self.edges.push(Edge {
            to: to as u32,
            next: self.head[from],
            capacity,
        });
        self.head[from] = index;
    }

    /// Add source and sink capacities for `node`
    pub(crate) fn add_terminal_weights(&mut self, node: usize, source_weight: f64, sink_weight: f64) {
        self.constant_flow += source_weight.min(sink_weight);
        self.terminal[node] += source_weight - sink_weight;
    }

    /// Add an undirected-style pair of arcs between two pixel nodes
    pub(crate) fn add_edge_pair(&mut self, a: usize, b: usize, forward: f64, backward: f64) {
        self.push_edge(a, b, forward);
        self.push_edge(b, a, backward);
    }

    fn materialize_terminals(&mut self) {
        let (source, sink) = (self.source(), self.sink());
        for node in 0..self.node_count {
            let weight = self.terminal[node];
            if weight > 0.0 {
                self.add_edge_pair(source, node, weight, 0.0);
            } else if weight < 0.0 {
                self.add_edge_pair(node, sink, -weight, 0.0);
            }
        }
    }

    fn build_levels(&mut self) -> bool {
        self.level.fill(UNREACHED);
        let source = self.source();
        self.level[source] = 0;
        let mut queue = VecDeque::from([source]);
        while let Some(node) = queue.pop_front() {
            let mut e = self.head[node];
            while e != NONE {
                let edge = self.edges[e as usize];
                let to = edge.to as usize;
                if edge.capacity > CAPACITY_EPSILON && self.level[to] == UNREACHED {
                    self.level[to] = self.level[node] + 1;
                    queue.push_back(to);
                }
                e = edge.next;
            }
        }
        self.level[self.sink()] != UNREACHED
    }

    /// Find one source-to-sink path in the level graph and saturate it
    fn augment(&mut self) -> f64 {
        let (source, sink) = (self.source(), self.sink());
        let mut path: Vec<u32> = Vec::new();
        let mut node = source;
        loop {
            if node == sink {
                let bottleneck = path
                    .iter()
                    .map(|&e| self.edges[e as usize].capacity)
                    .fold(f64::INFINITY, f64::min);
                for &e in &path {
                    self.edges[e as usize].capacity -= bottleneck;
                    self.edges[(e ^ 1) as usize].capacity += bottleneck;
                }
                return bottleneck;
            }

            let mut advanced = None;
            while self.current[node] != NONE {
                let e = self.current[node];
                let edge = self.edges[e as usize];
                let to = edge.to as usize;
                if edge.capacity > CAPACITY_EPSILON
                    && self.level[to] != UNREACHED
                    && self.level[to] == self.level[node] + 1
                {
                    path.push(e);
                    advanced = Some(to);
                    break;
                }
                self.current[node] = edge.next;
            }

            match advanced {
                Some(to) => node = to,
                None => {
                    // Dead end: nothing in this phase can pass through `node`
                    self.level[node] = UNREACHED;
                    let Some(e) = path.pop() else {
                        return 0.0;
                    };
                    node = self.edges[(e ^ 1) as usize].to as usize;
                    let skipped = self.current[node] as usize;
                    self.current[node] = self.edges[skipped].next;
                }
            }
        }
    }

    fn mark_source_side(&mut self) {
        let source = self.source();
        let mut reached = vec![false; self.node_count + 2];
        reached[source] = true;
        let mut queue = VecDeque::from([source]);
        while let Some(node) = queue.pop_front() {
            let mut e = self.head[node];
            while e != NONE {
                let edge = self.edges[e as usize];
                let to = edge.to as usize;
                if edge.capacity > CAPACITY_EPSILON && !reached[to] {
                    reached[to] = true;
                    queue.push_back(to);
                }
                e = edge.next;
            }
        }
        reached.truncate(self.node_count);
        self.source_side = reached;
    }

    /// Run the max-flow computation and return the total flow
    pub(crate) fn max_flow(&mut self) -> f64 {
        self.materialize_terminals();
        let mut flow = self.constant_flow;
        while self.build_levels() {
            self.current.copy_from_slice(&self.head);
            loop {
                let pushed = self.augment();
                if pushed <= CAPACITY_EPSILON {
                    break;
                }
                flow += pushed;
            }
        }
        self.mark_source_side();
        flow
    }

    /// Whether `node` ended on the source side of the minimum cut
    pub(crate) fn in_source_segment(&self, node: usize) -> bool {
        self.source_side.get(node).copied().unwrap_or(false)
    }
}
