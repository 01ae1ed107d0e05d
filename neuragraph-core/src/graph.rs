use crate::error::NeuraGraphError;
use std::collections::HashMap;

/// Visitation mark used while computing an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// Vertex was not reached yet.
    Unvisited,
    /// The current search passed through this vertex and has not left it.
    InProgress,
    /// The search finished this vertex and it is in the completion list.
    Done,
}

/// A single vertex: its name and adjacency lists (indices into the arena).
#[derive(Debug, Clone)]
struct Vertex {
    name: String,
    outgoing: Vec<usize>,
    incoming: Vec<usize>,
}

/// Directed graph over string-named vertices.
///
/// Vertices are stored in an arena in insertion order and addressed by index;
/// a name index maps names to arena slots. The graph computes a topological
/// ordering of its vertices or reports a cycle.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    vertices: Vec<Vertex>,
    index: HashMap<String, usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Inserts a new vertex.
    ///
    /// Returns `false` without any effect if a vertex of the same name already exists.
    pub fn add_vertex(&mut self, name: &str) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        self.index.insert(name.to_string(), self.vertices.len());
        self.vertices.push(Vertex {
            name: name.to_string(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        });
        true
    }

    /// Inserts the directed edge `from -> to`, creating missing endpoints.
    ///
    /// Self-loops are rejected: `add_edge(a, a)` returns `false` and leaves the
    /// graph untouched. Inserting an edge that already exists is a no-op that
    /// returns `true`.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        self.add_vertex(from);
        self.add_vertex(to);
        let (src, dst) = (self.index[from], self.index[to]);

        if !self.vertices[src].outgoing.contains(&dst) {
            self.vertices[src].outgoing.push(dst);
        }
        if !self.vertices[dst].incoming.contains(&src) {
            self.vertices[dst].incoming.push(src);
        }
        true
    }

    /// Removes the directed edge `from -> to`.
    ///
    /// Returns `false` if either endpoint or the edge itself does not exist.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        let (src, dst) = match (self.index.get(from), self.index.get(to)) {
            (Some(&src), Some(&dst)) => (src, dst),
            _ => return false,
        };
        let before = self.vertices[src].outgoing.len();
        self.vertices[src].outgoing.retain(|&v| v != dst);
        self.vertices[dst].incoming.retain(|&v| v != src);
        before != self.vertices[src].outgoing.len()
    }

    pub fn contains_vertex(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names of the direct successors of `name` (empty if unknown).
    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, |v| &v.outgoing)
    }

    /// Names of the direct predecessors of `name` (empty if unknown).
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, |v| &v.incoming)
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Computes a topological order covering every vertex exactly once.
    ///
    /// Depth-first search over all vertices in insertion order. A vertex is
    /// marked in-progress on entry and done on exit, when it is appended to a
    /// completion list; reaching an in-progress vertex means the graph holds a
    /// cycle. The result is the completion list reversed, so every vertex
    /// precedes all vertices reachable from it.
    ///
    /// The marks live only for the duration of the call, so a failed call
    /// leaves no state behind and repeated calls give the same result.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Topological` naming the vertex at which a
    /// cycle was detected. No partial ordering is returned.
    pub fn get_ordering(&self) -> Result<Vec<String>, NeuraGraphError> {
        let mut marks = vec![Mark::Unvisited; self.vertices.len()];
        let mut completed: Vec<usize> = Vec::with_capacity(self.vertices.len());
        // Explicit stack of (vertex, next outgoing edge to follow).
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.vertices.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (vertex, next_edge) = *frame;
                match self.vertices[vertex].outgoing.get(next_edge) {
                    Some(&succ) => {
                        frame.1 += 1;
                        match marks[succ] {
                            Mark::Done => {}
                            Mark::InProgress => {
                                let name = self.vertices[succ].name.clone();
                                log::debug!("get_ordering: cycle detected at vertex '{}'", name);
                                return Err(NeuraGraphError::Topological { vertex: name });
                            }
                            Mark::Unvisited => {
                                marks[succ] = Mark::InProgress;
                                stack.push((succ, 0));
                            }
                        }
                    }
                    None => {
                        marks[vertex] = Mark::Done;
                        completed.push(vertex);
                        stack.pop();
                    }
                }
            }
        }

        let ordering: Vec<String> = completed
            .into_iter()
            .rev()
            .map(|v| self.vertices[v].name.clone())
            .collect();
        log::trace!("get_ordering: {:?}", ordering);
        Ok(ordering)
    }

    fn neighbours<'a>(&'a self, name: &str, side: impl Fn(&'a Vertex) -> &'a Vec<usize>) -> Vec<&'a str> {
        match self.index.get(name) {
            Some(&v) => side(&self.vertices[v])
                .iter()
                .map(|&n| self.vertices[n].name.as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
