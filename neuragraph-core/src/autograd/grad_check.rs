use crate::block::{BlockMap, BlockRef};
use crate::error::NeuraGraphError;
use crate::op::Op;
use crate::volume::Volume;
use approx::relative_eq;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for block '{block}', element {element_index}: analytical grad {analytical_grad:?} != numerical grad {numerical_grad:?} (difference {difference:?})")]
    GradientMismatch {
        block: String,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },

    #[error("Numerical gradient is NaN or infinite for block '{block}', element {element_index} (loss+ {loss_plus:?}, loss- {loss_minus:?})")]
    NumericalGradNaNOrInfinite {
        block: String,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },

    #[error("Analytical gradient is NaN or infinite for block '{block}', element {element_index}: {value:?}")]
    AnalyticalGradNaNOrInfinite {
        block: String,
        element_index: usize,
        value: f64,
    },

    #[error("Seed for output '{0}' does not match any output block of the node")]
    UnknownSeed(String),

    #[error("Node error during gradient check: {0}")]
    Node(#[from] NeuraGraphError),
}

/// Checks the analytical gradients computed by `op.backward()` against
/// central finite differences of `op.forward()`.
///
/// The scalar objective is `L = sum over outputs of sum(seed * output)`, so
/// seeding an output gradient with `seed` and calling `backward()` must
/// leave `dL/dx` in the gradient of every input block `x`.
///
/// Values of the input blocks are perturbed in place and restored before
/// returning; on success the node is left after a final forward pass at the
/// original values.
///
/// # Arguments
/// * `op`: The node under test. Every block in `op.inputs()` is checked,
///   parameters included.
/// * `seeds`: Output gradient per output block name. Outputs without an entry
///   are seeded with ones.
/// * `epsilon`: Perturbation applied to each input element.
/// * `tolerance`: Allowed absolute and relative difference.
///
/// # Errors
/// * `GradCheckError::GradientMismatch` on the first element whose
///   analytical and numerical gradients differ by more than `tolerance`,
///   both absolutely and relative to the larger of the two.
/// * `GradCheckError::Node` if the node fails, or a seed has the wrong shape.
pub fn check_op_gradients(
    op: &dyn Op,
    seeds: &BTreeMap<String, Volume>,
    epsilon: f64,
    tolerance: f64,
) -> Result<(), GradCheckError> {
    let outputs = op.outputs();
    if let Some(name) = seeds.keys().find(|name| !outputs.contains_key(name.as_str())) {
        return Err(GradCheckError::UnknownSeed(name.clone()));
    }
    let seeds: Vec<(BlockRef, Volume)> = outputs
        .values()
        .map(|block| {
            let seed = seeds
                .get(block.name())
                .cloned()
                .unwrap_or_else(|| Volume::filled(block.shape(), 1.0));
            (block.clone(), seed)
        })
        .collect();

    // --- 1. Analytical gradients ---
    op.reset_gradient();
    op.forward()?;
    for (block, seed) in seeds.iter() {
        block.set_gradient(seed)?;
    }
    op.backward()?;
    let inputs: BlockMap = op.inputs();
    let analytical: BTreeMap<String, Vec<f64>> = inputs
        .iter()
        .map(|(name, block)| {
            let grad = block.gradient().iter().map(|&g| g as f64).collect();
            (name.clone(), grad)
        })
        .collect();

    // --- 2. Numerical gradients, element by element ---
    for (name, block) in inputs.iter() {
        for element_index in 0..block.len() {
            let original = block.value().as_slice()[element_index];

            block.value_mut().as_mut_slice()[element_index] = (original as f64 + epsilon) as f32;
            let loss_plus = objective(op, &seeds);
            block.value_mut().as_mut_slice()[element_index] = (original as f64 - epsilon) as f32;
            let loss_minus = objective(op, &seeds);
            block.value_mut().as_mut_slice()[element_index] = original;
            let (loss_plus, loss_minus) = (loss_plus?, loss_minus?);

            let numerical_grad = (loss_plus - loss_minus) / (2.0 * epsilon);
            let analytical_grad = analytical[name][element_index];

            if !numerical_grad.is_finite() {
                return Err(GradCheckError::NumericalGradNaNOrInfinite {
                    block: name.clone(),
                    element_index,
                    loss_plus,
                    loss_minus,
                });
            }
            if !analytical_grad.is_finite() {
                return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
                    block: name.clone(),
                    element_index,
                    value: analytical_grad,
                });
            }

            let difference = (analytical_grad - numerical_grad).abs();
            if !relative_eq!(
                analytical_grad,
                numerical_grad,
                epsilon = tolerance,
                max_relative = tolerance
            ) {
                log::debug!(
                    "check_op_gradients: '{}'[{}] analytical {} numerical {}",
                    name,
                    element_index,
                    analytical_grad,
                    numerical_grad
                );
                return Err(GradCheckError::GradientMismatch {
                    block: name.clone(),
                    element_index,
                    analytical_grad,
                    numerical_grad,
                    difference,
                });
            }
        }
    }

    op.forward()?;
    Ok(())
}

/// Runs `op.forward()` and returns `sum(seed * output)` in double precision.
fn objective(op: &dyn Op, seeds: &[(BlockRef, Volume)]) -> Result<f64, NeuraGraphError> {
    op.forward()?;
    Ok(seeds
        .iter()
        .map(|(block, seed)| {
            block
                .value()
                .iter()
                .zip(seed.iter())
                .map(|(&y, &s)| y as f64 * s as f64)
                .sum::<f64>()
        })
        .sum())
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
