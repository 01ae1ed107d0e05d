// neuragraph-core/src/optim/mod.rs

//! Training of networks by gradient descent.
//!
//! This module provides the [`Solver`], which drives forward/backward cycles
//! over a [`Network`](crate::net::Network) and updates its trainable blocks,
//! and the [`StepDecay`] learning-rate schedule it owns.

pub mod lr_decay;
pub mod solver;

// Re-export key items for easier access
pub use lr_decay::StepDecay;
pub use solver::{Method, Solver};
