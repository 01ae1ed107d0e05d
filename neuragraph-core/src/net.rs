use crate::block::{BlockMap, BlockRef};
use crate::error::NeuraGraphError;
use crate::graph::DependencyGraph;
use crate::op::{same_op, Op, OpRef};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Mutable registry of a [`Network`].
#[derive(Default)]
struct NetworkState {
    ops: BTreeMap<String, OpRef>,
    blocks: BlockMap,
    /// Block name -> names of the nodes writing it.
    producers: HashMap<String, Vec<String>>,
    /// Block name -> names of the nodes reading it.
    consumers: HashMap<String, Vec<String>>,
    graph: DependencyGraph,
    ordering: Vec<String>,
    // Set by every registration; the cached ordering is valid only when clear.
    dirty: bool,
}

/// A computation node composed of other computation nodes.
///
/// Nodes are wired automatically: when a node is added, every block it
/// outputs that another node reads (and every block it reads that another
/// node outputs) becomes an edge of the internal [`DependencyGraph`]. The
/// topological ordering is computed lazily and cached until the next `add`.
///
/// Because `Network` implements [`Op`] itself, a network can be added to
/// another network. The wiring of a nested network is captured when it is
/// added, so it should be fully built by then.
///
/// Mutation and execution happen through `&self` (the registry lives in a
/// `RefCell`) so that networks can be shared as [`OpRef`]; a network must be
/// used from one thread of control only.
pub struct Network {
    name: String,
    state: RefCell<NetworkState>,
}

impl Network {
    /// Creates an empty network.
    pub fn new(name: impl Into<String>) -> Self {
        Network {
            name: name.into(),
            state: RefCell::new(NetworkState::default()),
        }
    }

    /// Registers a node and wires it to the already registered ones.
    ///
    /// Adding the identical node object a second time is a no-op.
    ///
    /// # Arguments
    /// * `op` - The node to register. Its `inputs()` and `outputs()` are
    ///   merged into the network-wide block registry.
    ///
    /// # Errors
    /// * `NeuraGraphError::Input` if `op` is this network or a network that
    ///   (transitively) contains this network.
    /// * `NeuraGraphError::Duplicity` if a different node already has the same
    ///   name, or a different block object already has the name of one of the
    ///   node's blocks.
    ///
    /// On error the network is left unchanged.
    pub fn add(&self, op: OpRef) -> Result<(), NeuraGraphError> {
        if same_op(self, op.as_ref()) {
            return Err(NeuraGraphError::Input(format!(
                "network '{}' cannot be added to itself",
                self.name
            )));
        }
        if let Some(inner) = op.as_network() {
            if inner.contains(self) {
                return Err(NeuraGraphError::Input(format!(
                    "network '{}' already contains network '{}', adding it would create a cycle",
                    inner.name, self.name
                )));
            }
        }

        let op_name = op.name().to_string();
        let inputs = op.inputs();
        let outputs = op.outputs();

        let mut state = self.state.borrow_mut();

        // Validation: nothing below may fail once the registry is touched.
        if let Some(existing) = state.ops.get(&op_name) {
            if same_op(existing.as_ref(), op.as_ref()) {
                log::trace!("Network '{}': node '{}' already registered", self.name, op_name);
                return Ok(());
            }
            return Err(NeuraGraphError::Duplicity {
                kind: "node".to_string(),
                name: op_name,
            });
        }
        let mut incoming = BlockMap::new();
        for block in inputs.values().chain(outputs.values()) {
            let clash = incoming
                .get(block.name())
                .or_else(|| state.blocks.get(block.name()))
                .map_or(false, |other| !Rc::ptr_eq(other, block));
            if clash {
                return Err(NeuraGraphError::Duplicity {
                    kind: "block".to_string(),
                    name: block.name().to_string(),
                });
            }
            incoming.insert(block.name().to_string(), Rc::clone(block));
        }

        let state = &mut *state;
        state.graph.add_vertex(&op_name);
        for block_name in outputs.keys() {
            for consumer in state.consumers.get(block_name).into_iter().flatten() {
                state.graph.add_edge(&op_name, consumer);
            }
            state
                .producers
                .entry(block_name.clone())
                .or_default()
                .push(op_name.clone());
        }
        for block_name in inputs.keys() {
            for producer in state.producers.get(block_name).into_iter().flatten() {
                state.graph.add_edge(producer, &op_name);
            }
            state
                .consumers
                .entry(block_name.clone())
                .or_default()
                .push(op_name.clone());
        }
        state.blocks.extend(incoming);
        state.ops.insert(op_name.clone(), op);
        state.dirty = true;

        log::debug!(
            "Network '{}': registered node '{}' ({} inputs, {} outputs)",
            self.name,
            op_name,
            inputs.len(),
            outputs.len()
        );
        Ok(())
    }

    /// Returns the execution order of the registered nodes, recomputing it
    /// if nodes were added since the last call.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Topological` if the nodes form a cycle. The
    /// cache stays dirty, so every later call reports the cycle again.
    pub fn ordering(&self) -> Result<Vec<String>, NeuraGraphError> {
        let mut state = self.state.borrow_mut();
        if state.dirty {
            let ordering = state.graph.get_ordering()?;
            log::debug!("Network '{}': recomputed ordering {:?}", self.name, ordering);
            state.ordering = ordering;
            state.dirty = false;
        }
        Ok(state.ordering.clone())
    }

    /// Every block known to the network, keyed by name.
    pub fn blocks(&self) -> BlockMap {
        self.state.borrow().blocks.clone()
    }

    pub fn block(&self, name: &str) -> Option<BlockRef> {
        self.state.borrow().blocks.get(name).cloned()
    }

    pub fn node(&self, name: &str) -> Option<OpRef> {
        self.state.borrow().ops.get(name).cloned()
    }

    /// Directly registered nodes, in name order.
    pub fn nodes(&self) -> Vec<OpRef> {
        self.state.borrow().ops.values().cloned().collect()
    }

    /// Blocks the optimizer updates, in name order.
    pub fn trainable_blocks(&self) -> Vec<BlockRef> {
        self.state
            .borrow()
            .blocks
            .values()
            .filter(|b| b.is_trainable())
            .cloned()
            .collect()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.state.borrow().ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().ops.is_empty()
    }

    /// Whether `op` is registered in this network or in any network nested
    /// in it, compared by identity.
    pub fn contains(&self, op: &dyn Op) -> bool {
        self.state.borrow().ops.values().any(|child| {
            same_op(child.as_ref(), op) || child.as_network().map_or(false, |n| n.contains(op))
        })
    }

    /// Nodes in execution order.
    fn scheduled_ops(&self) -> Result<Vec<OpRef>, NeuraGraphError> {
        let ordering = self.ordering()?;
        let state = self.state.borrow();
        ordering
            .iter()
            .map(|name| {
                state.ops.get(name).cloned().ok_or_else(|| {
                    NeuraGraphError::Input(format!(
                        "network '{}' has no node named '{}'",
                        self.name, name
                    ))
                })
            })
            .collect()
    }
}

impl Op for Network {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self) -> Result<(), NeuraGraphError> {
        for op in self.scheduled_ops()? {
            op.forward()?;
        }
        Ok(())
    }

    fn backward(&self) -> Result<(), NeuraGraphError> {
        for op in self.scheduled_ops()?.iter().rev() {
            op.backward()?;
        }
        Ok(())
    }

    /// Blocks that no registered node produces.
    fn inputs(&self) -> BlockMap {
        let state = self.state.borrow();
        state
            .blocks
            .iter()
            .filter(|(name, _)| !state.producers.contains_key(name.as_str()))
            .map(|(name, block)| (name.clone(), Rc::clone(block)))
            .collect()
    }

    /// Blocks that no registered node consumes.
    fn outputs(&self) -> BlockMap {
        let state = self.state.borrow();
        state
            .blocks
            .iter()
            .filter(|(name, _)| !state.consumers.contains_key(name.as_str()))
            .map(|(name, block)| (name.clone(), Rc::clone(block)))
            .collect()
    }

    /// Zeroes every registered block, then lets every node reset its own
    /// blocks, so blocks internal to nested networks are zeroed too.
    fn reset_gradient(&self) {
        let ops: Vec<OpRef> = {
            let state = self.state.borrow();
            for block in state.blocks.values() {
                block.reset_gradient();
            }
            state.ops.values().cloned().collect()
        };
        for op in ops {
            op.reset_gradient();
        }
    }

    fn as_network(&self) -> Option<&Network> {
        Some(self)
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Network")
            .field("name", &self.name)
            .field("nodes", &state.ops.keys().collect::<Vec<_>>())
            .field("blocks", &state.blocks.len())
            .field("dirty", &state.dirty)
            .finish()
    }
}

#[cfg(test)]
#[path = "net_test.rs"]
mod tests;
