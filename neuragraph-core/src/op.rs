use crate::block::{BlockMap, BlockRef};
use crate::error::NeuraGraphError;
use crate::net::Network;
use std::fmt::Debug;
use std::rc::Rc;

/// Shared handle to a computation node.
pub type OpRef = Rc<dyn Op>;

/// The base trait for all computation nodes (layers, readers, networks).
///
/// A node reads the values of its input blocks and writes the values of its
/// output blocks in `forward()`, and propagates gradients from its output
/// blocks back to its input blocks in `backward()`. The [`Network`] wires
/// nodes together purely by matching the names of the blocks returned by
/// `inputs()` and `outputs()`, so every block a node creates must be named
/// `"<node name>_<role>"` (e.g. `"n_out"`, `"n_thr"`).
///
/// The wiring of a node is fixed after construction: `inputs()` and
/// `outputs()` return the same blocks on every call.
pub trait Op: Debug {
    /// Unique name of the node inside a network.
    fn name(&self) -> &str;

    /// Computes the output block values from the current input block values.
    ///
    /// Must be a deterministic function of the inputs and mutate only this
    /// node's own output blocks.
    fn forward(&self) -> Result<(), NeuraGraphError>;

    /// Propagates gradients from the output blocks to the input blocks.
    ///
    /// Reads output values and output gradients and **adds** into the
    /// gradients of input blocks (trainable parameters included). It must
    /// never clear or overwrite a gradient, because a block consumed by
    /// several nodes receives one contribution from each of them.
    fn backward(&self) -> Result<(), NeuraGraphError>;

    /// Name-keyed map of every block this node reads, parameters included.
    fn inputs(&self) -> BlockMap;

    /// Name-keyed map of every block this node writes.
    fn outputs(&self) -> BlockMap;

    /// Zeroes the gradient of every input and output block.
    fn reset_gradient(&self) {
        for block in self.inputs().values().chain(self.outputs().values()) {
            block.reset_gradient();
        }
    }

    /// Returns `Some` when the node is itself a [`Network`], allowing
    /// containers to detect nesting cycles.
    fn as_network(&self) -> Option<&Network> {
        None
    }
}

/// Identity comparison of two nodes (same object, not same name).
pub(crate) fn same_op(a: &dyn Op, b: &dyn Op) -> bool {
    std::ptr::eq(a as *const dyn Op as *const (), b as *const dyn Op as *const ())
}

/// Returns the only output block of `op`, for layers built on top of an
/// upstream node.
///
/// # Errors
/// Returns `NeuraGraphError::Input` if `op` does not have exactly one output.
pub fn single_output(op: &dyn Op) -> Result<BlockRef, NeuraGraphError> {
    let outputs = op.outputs();
    if outputs.len() != 1 {
        return Err(NeuraGraphError::Input(format!(
            "node '{}' must have exactly one output block to be used as an input, it has {}",
            op.name(),
            outputs.len()
        )));
    }
    outputs
        .into_values()
        .next()
        .ok_or_else(|| NeuraGraphError::Input(format!("node '{}' has no output", op.name())))
}
