use crate::block::{block_map, BlockMap, BlockRef, TensorBlock};
use crate::error::NeuraGraphError;
use crate::op::Op;
use crate::volume::Volume;

/// Normalises its input into a probability distribution over all cells:
/// `out_i = exp(x_i) / sum_j exp(x_j)`.
#[derive(Debug)]
pub struct Softmax {
    name: String,
    input: BlockRef,
    output: BlockRef,
}

impl Softmax {
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if `input` is empty.
    pub fn new(name: &str, input: &BlockRef) -> Result<Self, NeuraGraphError> {
        if input.is_empty() {
            return Err(NeuraGraphError::dimension(
                &format!("Softmax '{}' input", name),
                &[1, 1, 1],
                &input.shape(),
            ));
        }
        let [d, w, h] = input.shape();
        Ok(Softmax {
            name: name.to_string(),
            input: input.clone(),
            output: TensorBlock::new(format!("{}_out", name), d, w, h),
        })
    }

    pub fn output(&self) -> &BlockRef {
        &self.output
    }
}

impl Op for Softmax {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self) -> Result<(), NeuraGraphError> {
        let x = self.input.value();
        let max = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut out = self.output.value_mut();
        for (y, &v) in out.as_mut_slice().iter_mut().zip(x.iter()) {
            *y = (v - max).exp();
        }
        let total = out.sum();
        out.scale(1.0 / total);
        Ok(())
    }

    fn backward(&self) -> Result<(), NeuraGraphError> {
        let delta = {
            let y = self.output.value();
            let g = self.output.gradient();
            let dot: f32 = y.iter().zip(g.iter()).map(|(a, b)| a * b).sum();
            let data = y.iter().zip(g.iter()).map(|(&y, &g)| y * (g - dot)).collect();
            Volume::from_vec(y.shape(), data)?
        };
        self.input.accumulate_gradient(&delta)
    }

    fn inputs(&self) -> BlockMap {
        block_map([&self.input])
    }

    fn outputs(&self) -> BlockMap {
        block_map([&self.output])
    }
}

#[cfg(test)]
#[path = "softmax_test.rs"]
mod tests;
