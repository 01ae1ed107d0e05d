//! # Transfer Functions
//!
//! Element-wise activation functions applied by [`Neuron`](crate::nn::layers::Neuron),
//! [`Dense`](crate::nn::layers::Dense) and [`Conv`](crate::nn::layers::Conv).
//!
//! Each function provides its forward value and its derivative expressed in
//! terms of the *output* `y = f(x)`, which is all a layer keeps after the
//! forward pass.

use crate::error::NeuraGraphError;
use num_traits::Float;
use std::fmt;
use std::str::FromStr;

/// The supported transfer functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transfer {
    #[default]
    Sigmoid,
    Tanh,
    Relu,
    Softplus,
    Linear,
}

impl Transfer {
    /// All variants, in declaration order.
    pub const ALL: [Transfer; 5] = [
        Transfer::Sigmoid,
        Transfer::Tanh,
        Transfer::Relu,
        Transfer::Softplus,
        Transfer::Linear,
    ];

    /// Applies the function to `x`.
    pub fn forward<T: Float>(self, x: T) -> T {
        match self {
            Transfer::Sigmoid => T::one() / (T::one() + (-x).exp()),
            Transfer::Tanh => x.tanh(),
            Transfer::Relu => x.max(T::zero()),
            // ln(1 + e^x), rewritten to stay finite for large x
            Transfer::Softplus => x.max(T::zero()) + (-x.abs()).exp().ln_1p(),
            Transfer::Linear => x,
        }
    }

    /// Derivative `f'(x)` computed from the output `y = f(x)`.
    ///
    /// ReLU uses `f'(0) = 0`.
    pub fn derivative_from_output<T: Float>(self, y: T) -> T {
        match self {
            Transfer::Sigmoid => y * (T::one() - y),
            Transfer::Tanh => T::one() - y * y,
            Transfer::Relu => {
                if y > T::zero() {
                    T::one()
                } else {
                    T::zero()
                }
            }
            // sigmoid(x) == 1 - e^(-softplus(x))
            Transfer::Softplus => -(-y).exp_m1(),
            Transfer::Linear => T::one(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Transfer::Sigmoid => "sigmoid",
            Transfer::Tanh => "tanh",
            Transfer::Relu => "relu",
            Transfer::Softplus => "softplus",
            Transfer::Linear => "linear",
        }
    }
}

impl FromStr for Transfer {
    type Err = NeuraGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Transfer::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| NeuraGraphError::unknown_option("transfer function", s))
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "transfer_test.rs"]
mod tests;
