//! # neuragraph-core
//!
//! A computation-graph engine for training feed-forward numeric models by
//! reverse-mode differentiation.
//!
//! Models are built from computation nodes ([`Op`]) that read and write named
//! [`TensorBlock`]s. A [`Network`] wires nodes together by matching the
//! blocks they share, orders them with a [`DependencyGraph`] and runs their
//! forward and backward passes; a [`Solver`](optim::Solver) trains the
//! trainable blocks by gradient descent.

pub mod autograd;
pub mod block;
pub mod error;
pub mod graph;
pub mod net;
pub mod nn;
pub mod op;
pub mod optim;
pub mod utils;
pub mod volume;

pub use block::{block_map, BlockMap, BlockRef, TensorBlock};
pub use error::NeuraGraphError;
pub use graph::DependencyGraph;
pub use net::Network;
pub use op::{single_output, Op, OpRef};
pub use volume::Volume;
