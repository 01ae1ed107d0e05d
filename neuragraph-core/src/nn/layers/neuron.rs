use crate::block::{BlockMap, BlockRef, TensorBlock};
use crate::error::NeuraGraphError;
use crate::nn::init;
use crate::nn::transfer::Transfer;
use crate::op::Op;
use rand::Rng;
use std::rc::Rc;

/// A single unit: `out = f(sum_i(w_i * x_i) + thr)`.
///
/// Every input must be a 1x1x1 block. The node owns one trainable weight per
/// input, named `"<node>_<input>_w"`, a trainable threshold `"<node>_thr"` and
/// the output `"<node>_out"`.
#[derive(Debug)]
pub struct Neuron {
    name: String,
    transfer: Transfer,
    /// (input, weight) pairs in the order the inputs were given.
    synapses: Vec<(BlockRef, BlockRef)>,
    threshold: BlockRef,
    output: BlockRef,
}

impl Neuron {
    /// Creates a neuron over `inputs`, with weights and threshold drawn
    /// uniformly from `[-1, 1)`.
    ///
    /// # Arguments
    /// * `name`: Node name, used as prefix of every block it creates.
    /// * `transfer`: The transfer function applied to the weighted sum.
    /// * `inputs`: One or more 1x1x1 blocks. To build on top of another
    ///   node, pass its output through [`single_output`](crate::op::single_output).
    ///
    /// # Errors
    /// * `NeuraGraphError::Input` if `inputs` is empty or names a block twice.
    /// * `NeuraGraphError::Dimension` if an input is not 1x1x1.
    pub fn new(name: &str, transfer: Transfer, inputs: &[BlockRef]) -> Result<Self, NeuraGraphError> {
        Neuron::with_rng(name, transfer, inputs, &mut rand::thread_rng())
    }

    /// Same as [`Neuron::new`], drawing initial values from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        name: &str,
        transfer: Transfer,
        inputs: &[BlockRef],
        rng: &mut R,
    ) -> Result<Self, NeuraGraphError> {
        if inputs.is_empty() {
            return Err(NeuraGraphError::Input(format!(
                "neuron '{}' needs at least one input",
                name
            )));
        }
        for (i, input) in inputs.iter().enumerate() {
            if input.shape() != [1, 1, 1] {
                return Err(NeuraGraphError::dimension(
                    &format!("Neuron '{}' input '{}'", name, input.name()),
                    &[1, 1, 1],
                    &input.shape(),
                ));
            }
            if inputs[..i].iter().any(|other| other.name() == input.name()) {
                return Err(NeuraGraphError::Input(format!(
                    "neuron '{}' got input '{}' twice",
                    name,
                    input.name()
                )));
            }
        }

        let mut synapses = Vec::with_capacity(inputs.len());
        for input in inputs {
            let weight = TensorBlock::parameter(format!("{}_{}_w", name, input.name()), 1, 1, 1);
            init::uniform_(&weight, -1.0, 1.0, rng)?;
            synapses.push((Rc::clone(input), weight));
        }
        let threshold = TensorBlock::parameter(format!("{}_thr", name), 1, 1, 1);
        init::uniform_(&threshold, -1.0, 1.0, rng)?;

        Ok(Neuron {
            name: name.to_string(),
            transfer,
            synapses,
            threshold,
            output: TensorBlock::new(format!("{}_out", name), 1, 1, 1),
        })
    }

    pub fn output(&self) -> &BlockRef {
        &self.output
    }

    pub fn threshold(&self) -> &BlockRef {
        &self.threshold
    }

    /// Weight block applied to the input named `input`.
    pub fn weight(&self, input: &str) -> Option<&BlockRef> {
        self.synapses
            .iter()
            .find(|(x, _)| x.name() == input)
            .map(|(_, w)| w)
    }

    pub fn transfer(&self) -> Transfer {
        self.transfer
    }
}

impl Op for Neuron {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self) -> Result<(), NeuraGraphError> {
        let mut sum = self.threshold.value()[(0, 0, 0)];
        for (input, weight) in self.synapses.iter() {
            sum += input.value()[(0, 0, 0)] * weight.value()[(0, 0, 0)];
        }
        self.output.value_mut()[(0, 0, 0)] = self.transfer.forward(sum);
        Ok(())
    }

    fn backward(&self) -> Result<(), NeuraGraphError> {
        let y = self.output.value()[(0, 0, 0)];
        let grad = self.output.gradient()[(0, 0, 0)] * self.transfer.derivative_from_output(y);
        for (input, weight) in self.synapses.iter() {
            let x = input.value()[(0, 0, 0)];
            let w = weight.value()[(0, 0, 0)];
            input.gradient_mut()[(0, 0, 0)] += grad * w;
            weight.gradient_mut()[(0, 0, 0)] += grad * x;
        }
        self.threshold.gradient_mut()[(0, 0, 0)] += grad;
        Ok(())
    }

    fn inputs(&self) -> BlockMap {
        let mut map = BlockMap::new();
        for (input, weight) in self.synapses.iter() {
            map.insert(input.name().to_string(), Rc::clone(input));
            map.insert(weight.name().to_string(), Rc::clone(weight));
        }
        map.insert(self.threshold.name().to_string(), Rc::clone(&self.threshold));
        map
    }

    fn outputs(&self) -> BlockMap {
        let mut map = BlockMap::new();
        map.insert(self.output.name().to_string(), Rc::clone(&self.output));
        map
    }
}

#[cfg(test)]
#[path = "neuron_test.rs"]
mod tests;
