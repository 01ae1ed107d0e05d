use crate::block::{block_map, BlockMap, BlockRef, TensorBlock};
use crate::error::NeuraGraphError;
use crate::nn::init;
use crate::nn::transfer::Transfer;
use crate::op::Op;
use crate::volume::Volume;
use rand::Rng;

/// Fully connected layer: every output cell has an independent weight for
/// every input cell.
///
/// `out[o] = f(sum_i(w[o * in + i] * x[i]) + thr[o])`, with input and output
/// cells enumerated in storage order. The weight block `"<node>_w"` has shape
/// (1, 1, in * out), the threshold block `"<node>_thr"` (1, 1, out).
#[derive(Debug)]
pub struct Dense {
    name: String,
    transfer: Transfer,
    input: BlockRef,
    weights: BlockRef,
    threshold: BlockRef,
    output: BlockRef,
}

impl Dense {
    /// Creates a dense layer mapping `input` onto an output of `output_shape`.
    ///
    /// Weights are drawn from `N(0, 1/in)`, thresholds start at zero.
    ///
    /// # Arguments
    /// * `name`: Node name, used as block prefix.
    /// * `transfer`: The transfer function applied to every output cell.
    /// * `input`: Input block of any non-empty shape.
    /// * `output_shape`: `[depth, width, height]` of the output block.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if the input or the requested
    /// output is empty.
    pub fn new(
        name: &str,
        transfer: Transfer,
        input: &BlockRef,
        output_shape: [usize; 3],
    ) -> Result<Self, NeuraGraphError> {
        Dense::with_rng(name, transfer, input, output_shape, &mut rand::thread_rng())
    }

    /// Same as [`Dense::new`], drawing initial weights from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        name: &str,
        transfer: Transfer,
        input: &BlockRef,
        output_shape: [usize; 3],
        rng: &mut R,
    ) -> Result<Self, NeuraGraphError> {
        if input.is_empty() {
            return Err(NeuraGraphError::dimension(
                &format!("Dense '{}' input", name),
                &[1, 1, 1],
                &input.shape(),
            ));
        }
        let out_len: usize = output_shape.iter().product();
        if out_len == 0 {
            return Err(NeuraGraphError::dimension(
                &format!("Dense '{}' output", name),
                &[1, 1, 1],
                &output_shape,
            ));
        }
        let in_len = input.len();

        let weights = TensorBlock::parameter(format!("{}_w", name), 1, 1, in_len * out_len);
        init::scaled_normal_(&weights, in_len, rng)?;
        let threshold = TensorBlock::parameter(format!("{}_thr", name), 1, 1, out_len);
        let [d, w, h] = output_shape;

        Ok(Dense {
            name: name.to_string(),
            transfer,
            input: input.clone(),
            weights,
            threshold,
            output: TensorBlock::new(format!("{}_out", name), d, w, h),
        })
    }

    pub fn output(&self) -> &BlockRef {
        &self.output
    }

    pub fn weights(&self) -> &BlockRef {
        &self.weights
    }

    pub fn threshold(&self) -> &BlockRef {
        &self.threshold
    }
}

impl Op for Dense {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self) -> Result<(), NeuraGraphError> {
        let x = self.input.value();
        let w = self.weights.value();
        let thr = self.threshold.value();
        let mut out = self.output.value_mut();
        let in_len = x.len();

        for (o, y) in out.as_mut_slice().iter_mut().enumerate() {
            let row = &w.as_slice()[o * in_len..(o + 1) * in_len];
            let sum: f32 = row.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
            *y = self.transfer.forward(sum + thr.as_slice()[o]);
        }
        Ok(())
    }

    fn backward(&self) -> Result<(), NeuraGraphError> {
        let in_len = self.input.len();
        let out_len = self.output.len();
        // dL/d(pre-activation) per output cell
        let delta: Vec<f32> = {
            let y = self.output.value();
            let g = self.output.gradient();
            y.iter()
                .zip(g.iter())
                .map(|(&y, &g)| g * self.transfer.derivative_from_output(y))
                .collect()
        };

        let mut input_grad = Volume::zeros_like(&self.input.value());
        let mut weight_grad = Volume::zeros(1, 1, in_len * out_len);
        {
            let x = self.input.value();
            let w = self.weights.value();
            for (o, &d) in delta.iter().enumerate() {
                if d == 0.0 {
                    continue;
                }
                for i in 0..in_len {
                    input_grad.as_mut_slice()[i] += d * w.as_slice()[o * in_len + i];
                    weight_grad.as_mut_slice()[o * in_len + i] += d * x.as_slice()[i];
                }
            }
        }
        let thr_grad = Volume::from_vec([1, 1, out_len], delta)?;

        self.input.accumulate_gradient(&input_grad)?;
        self.weights.accumulate_gradient(&weight_grad)?;
        self.threshold.accumulate_gradient(&thr_grad)
    }

    fn inputs(&self) -> BlockMap {
        block_map([&self.input, &self.weights, &self.threshold])
    }

    fn outputs(&self) -> BlockMap {
        block_map([&self.output])
    }
}

#[cfg(test)]
#[path = "dense_test.rs"]
mod tests;
