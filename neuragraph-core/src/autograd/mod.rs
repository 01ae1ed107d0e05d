//! Numerical verification of the gradients computed by computation nodes.

pub mod grad_check;

pub use grad_check::{check_op_gradients, GradCheckError};
