//! # Loss Functions
//!
//! Error measures between network outputs and desired values. The optimizer
//! evaluates a [`Loss`] over its (output, desired) pairs and seeds the output
//! gradients with [`Loss::gradients`].

use crate::block::BlockRef;
use crate::error::NeuraGraphError;
use crate::volume::Volume;
use std::fmt;
use std::str::FromStr;

/// The supported loss functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Loss {
    /// `0.5 * sum_pairs sqrt(sum |p - d|)`, gradient `sign(p - d)`.
    L1,
    /// `0.5 * sqrt(sum_pairs sum (p - d)^2)`, gradient `p - d`.
    #[default]
    L2,
}

impl Loss {
    pub fn name(self) -> &'static str {
        match self {
            Loss::L1 => "l1",
            Loss::L2 => "l2",
        }
    }

    /// Evaluates the loss over corresponding `outputs` and `desired` blocks.
    ///
    /// # Errors
    /// * `NeuraGraphError::Input` if the two slices differ in length.
    /// * `NeuraGraphError::Dimension` if a pair of blocks differs in shape.
    pub fn value(self, outputs: &[BlockRef], desired: &[BlockRef]) -> Result<f32, NeuraGraphError> {
        let diffs = differences(outputs, desired)?;
        let loss = match self {
            Loss::L1 => {
                0.5 * diffs
                    .iter()
                    .map(|d| d.iter().map(|v| v.abs()).sum::<f32>().sqrt())
                    .sum::<f32>()
            }
            Loss::L2 => {
                let squared: f32 = diffs
                    .iter()
                    .map(|d| d.iter().map(|v| v * v).sum::<f32>())
                    .sum();
                0.5 * squared.sqrt()
            }
        };
        Ok(loss)
    }

    /// Gradient of the loss with respect to each output block, in the order
    /// of `outputs`.
    ///
    /// # Errors
    /// Same as [`Loss::value`].
    pub fn gradients(
        self,
        outputs: &[BlockRef],
        desired: &[BlockRef],
    ) -> Result<Vec<Volume>, NeuraGraphError> {
        let mut diffs = differences(outputs, desired)?;
        if self == Loss::L1 {
            for d in diffs.iter_mut() {
                for v in d.as_mut_slice() {
                    *v = if *v > 0.0 {
                        1.0
                    } else if *v < 0.0 {
                        -1.0
                    } else {
                        0.0
                    };
                }
            }
        }
        Ok(diffs)
    }
}

/// `output - desired` for every pair.
fn differences(outputs: &[BlockRef], desired: &[BlockRef]) -> Result<Vec<Volume>, NeuraGraphError> {
    if outputs.len() != desired.len() {
        return Err(NeuraGraphError::Input(format!(
            "loss needs as many desired blocks as outputs: {} outputs, {} desired",
            outputs.len(),
            desired.len()
        )));
    }
    outputs
        .iter()
        .zip(desired)
        .map(|(out, want)| {
            let mut diff = out.value().clone();
            diff.scaled_add(-1.0, &want.value()).map_err(|_| {
                NeuraGraphError::dimension("loss", &out.shape(), &want.shape())
            })?;
            Ok(diff)
        })
        .collect()
}

impl FromStr for Loss {
    type Err = NeuraGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l1" => Ok(Loss::L1),
            "l2" => Ok(Loss::L2),
            _ => Err(NeuraGraphError::unknown_option("loss", s)),
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "losses_test.rs"]
mod tests;
