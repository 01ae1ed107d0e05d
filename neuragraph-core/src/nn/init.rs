use crate::block::TensorBlock;
use crate::error::NeuraGraphError;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

/// Fills the value of `block` with samples drawn uniformly from `[low, high)`.
///
/// Operates in-place; the gradient is left untouched.
///
/// # Arguments
/// * `block`: The block whose value is overwritten.
/// * `low`, `high`: Bounds of the distribution.
/// * `rng`: The random source, so that initialisation can be seeded.
///
/// # Errors
/// Returns `NeuraGraphError::Input` if `low >= high`.
pub fn uniform_<R: Rng + ?Sized>(
    block: &TensorBlock,
    low: f32,
    high: f32,
    rng: &mut R,
) -> Result<(), NeuraGraphError> {
    if !(low < high) {
        return Err(NeuraGraphError::Input(format!(
            "uniform_: empty range [{}, {}) for block '{}'",
            low,
            high,
            block.name()
        )));
    }
    let dist = Uniform::new(low, high);
    for v in block.value_mut().as_mut_slice() {
        *v = dist.sample(rng);
    }
    Ok(())
}

/// Fills the value of `block` with samples from `N(0, 1/fan_in)`.
///
/// # Arguments
/// * `block`: The block whose value is overwritten.
/// * `fan_in`: Number of inputs feeding each unit the block parameterises.
/// * `rng`: The random source.
///
/// # Errors
/// Returns `NeuraGraphError::Input` if `fan_in` is zero.
pub fn scaled_normal_<R: Rng + ?Sized>(
    block: &TensorBlock,
    fan_in: usize,
    rng: &mut R,
) -> Result<(), NeuraGraphError> {
    if fan_in == 0 {
        return Err(NeuraGraphError::Input(format!(
            "scaled_normal_: fan_in must be positive for block '{}'",
            block.name()
        )));
    }
    let std_dev = 1.0 / (fan_in as f32).sqrt();
    let dist = Normal::new(0.0f32, std_dev)
        .map_err(|e| NeuraGraphError::Input(format!("scaled_normal_: {}", e)))?;
    for v in block.value_mut().as_mut_slice() {
        *v = dist.sample(rng);
    }
    Ok(())
}

#[cfg(test)]
#[path = "init_test.rs"]
mod tests;
