use crate::error::NeuraGraphError;
use crate::volume::Volume;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a [`TensorBlock`].
///
/// A block is typically the output of one node and the input of several
/// others, so it is owned jointly by every node (and network) holding it and
/// dropped with the last holder.
pub type BlockRef = Rc<TensorBlock>;

/// Name-keyed map of blocks, as returned by `Op::inputs()` and `Op::outputs()`.
pub type BlockMap = BTreeMap<String, BlockRef>;

/// A named pair of equally shaped 3-dimensional arrays (value and gradient)
/// plus a trainability flag.
///
/// `TensorBlock` uses `RefCell` internally to allow interior mutability:
/// the producing node writes `value` and every consuming node accumulates
/// into `gradient` through a shared [`BlockRef`]. Execution is single
/// threaded, so the cells are never borrowed concurrently.
///
/// The shape is fixed at construction and `value.shape() == gradient.shape()`
/// holds at all times.
pub struct TensorBlock {
    name: String,
    shape: [usize; 3],
    value: RefCell<Volume>,
    gradient: RefCell<Volume>,
    trainable: Cell<bool>,
}

impl TensorBlock {
    /// Creates a new, non-trainable block of shape `(depth, width, height)`.
    ///
    /// Both value and gradient are zero-filled.
    pub fn new(name: impl Into<String>, depth: usize, width: usize, height: usize) -> BlockRef {
        TensorBlock::from_volume(name, Volume::zeros(depth, width, height))
    }

    /// Creates a new trainable block (a parameter) of shape `(depth, width, height)`.
    pub fn parameter(
        name: impl Into<String>,
        depth: usize,
        width: usize,
        height: usize,
    ) -> BlockRef {
        let block = TensorBlock::new(name, depth, width, height);
        block.set_trainable(true);
        block
    }

    /// Creates a non-trainable block whose value is `value`; the gradient is
    /// zero-filled with the same shape.
    pub fn from_volume(name: impl Into<String>, value: Volume) -> BlockRef {
        let gradient = Volume::zeros_like(&value);
        Rc::new(TensorBlock {
            name: name.into(),
            shape: value.shape(),
            value: RefCell::new(value),
            gradient: RefCell::new(gradient),
            trainable: Cell::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the `[depth, width, height]` shape.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Number of elements in value (and gradient).
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the optimizer updates this block's value.
    pub fn is_trainable(&self) -> bool {
        self.trainable.get()
    }

    pub fn set_trainable(&self, trainable: bool) {
        self.trainable.set(trainable);
    }

    /// Immutable access to the value array.
    pub fn value(&self) -> Ref<'_, Volume> {
        self.value.borrow()
    }

    /// Mutable access to the value array.
    ///
    /// Callers must not replace the volume with one of a different shape;
    /// use [`TensorBlock::set_value`] for whole-array writes.
    pub fn value_mut(&self) -> RefMut<'_, Volume> {
        self.value.borrow_mut()
    }

    /// Immutable access to the gradient array.
    pub fn gradient(&self) -> Ref<'_, Volume> {
        self.gradient.borrow()
    }

    /// Mutable access to the gradient array.
    pub fn gradient_mut(&self) -> RefMut<'_, Volume> {
        self.gradient.borrow_mut()
    }

    /// Overwrites the whole value array.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if `value` has a different shape.
    pub fn set_value(&self, value: &Volume) -> Result<(), NeuraGraphError> {
        self.value.borrow_mut().copy_from(value)
    }

    /// Overwrites the whole gradient array.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if `gradient` has a different shape.
    pub fn set_gradient(&self, gradient: &Volume) -> Result<(), NeuraGraphError> {
        self.gradient.borrow_mut().copy_from(gradient)
    }

    /// Adds `delta` into the gradient (never replaces it).
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if `delta` has a different shape.
    pub fn accumulate_gradient(&self, delta: &Volume) -> Result<(), NeuraGraphError> {
        self.gradient.borrow_mut().scaled_add(1.0, delta)
    }

    /// Sets the gradient to all zeros.
    pub fn reset_gradient(&self) {
        self.gradient.borrow_mut().fill(0.0);
    }
}

impl fmt::Debug for TensorBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorBlock")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("trainable", &self.trainable.get())
            .finish()
    }
}

/// Builds a [`BlockMap`] from a list of blocks, keyed by block name.
pub fn block_map<'a>(blocks: impl IntoIterator<Item = &'a BlockRef>) -> BlockMap {
    blocks
        .into_iter()
        .map(|b| (b.name().to_string(), Rc::clone(b)))
        .collect()
}

#[cfg(test)]
#[path = "block_test.rs"]
mod tests;
