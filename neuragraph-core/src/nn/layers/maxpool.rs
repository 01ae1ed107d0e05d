use crate::block::{block_map, BlockMap, BlockRef, TensorBlock};
use crate::error::NeuraGraphError;
use crate::op::Op;
use crate::volume::Volume;

/// Max pooling with a square window sliding by one cell over width and
/// height, independently for every depth slice.
///
/// The input is conceptually padded by `padding` cells on every side;
/// padded cells never win the maximum. The output has shape
/// `(depth, width + 2p - window + 1, height + 2p - window + 1)`.
#[derive(Debug)]
pub struct MaxPool {
    name: String,
    window: usize,
    padding: usize,
    input: BlockRef,
    output: BlockRef,
}

impl MaxPool {
    /// # Arguments
    /// * `name`: Node name, used as block prefix.
    /// * `input`: The pooled block.
    /// * `window`: Side of the square window.
    /// * `padding`: Number of virtual cells added on each side.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if the input holds no cells, and
    /// `NeuraGraphError::Input` if the window is empty, if
    /// `padding >= window` (a window could then hold only padding), or if the
    /// window does not fit the padded input.
    pub fn new(
        name: &str,
        input: &BlockRef,
        window: usize,
        padding: usize,
    ) -> Result<Self, NeuraGraphError> {
        let [depth, width, height] = input.shape();
        if input.is_empty() {
            return Err(NeuraGraphError::dimension(
                &format!("MaxPool '{}' input", name),
                &[1, 1, 1],
                &input.shape(),
            ));
        }
        if window == 0 {
            return Err(NeuraGraphError::Input(format!(
                "max pool '{}' needs a non-empty window",
                name
            )));
        }
        if padding >= window {
            return Err(NeuraGraphError::Input(format!(
                "max pool '{}': padding {} must be smaller than window {}",
                name, padding, window
            )));
        }
        if window > width + 2 * padding || window > height + 2 * padding {
            return Err(NeuraGraphError::Input(format!(
                "max pool '{}': window {} does not fit padded input {:?}",
                name,
                window,
                [depth, width + 2 * padding, height + 2 * padding]
            )));
        }

        let output = TensorBlock::new(
            format!("{}_out", name),
            depth,
            width + 2 * padding + 1 - window,
            height + 2 * padding + 1 - window,
        );
        Ok(MaxPool {
            name: name.to_string(),
            window,
            padding,
            input: input.clone(),
            output,
        })
    }

    pub fn output(&self) -> &BlockRef {
        &self.output
    }

    /// Input coordinates of the first maximal cell of the window whose
    /// output cell is `(d, w, h)`.
    fn arg_max(&self, x: &Volume, d: usize, w: usize, h: usize) -> (usize, usize) {
        let rows = w.saturating_sub(self.padding)..(w + self.window - self.padding).min(x.width());
        let cols = h.saturating_sub(self.padding)..(h + self.window - self.padding).min(x.height());
        let mut best = (rows.start, cols.start);
        for i in rows {
            for j in cols.clone() {
                if x[(d, i, j)] > x[(d, best.0, best.1)] {
                    best = (i, j);
                }
            }
        }
        best
    }
}

impl Op for MaxPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self) -> Result<(), NeuraGraphError> {
        let x = self.input.value();
        let mut out = self.output.value_mut();
        let [depth, width, height] = out.shape();
        for d in 0..depth {
            for w in 0..width {
                for h in 0..height {
                    let (i, j) = self.arg_max(&x, d, w, h);
                    out[(d, w, h)] = x[(d, i, j)];
                }
            }
        }
        Ok(())
    }

    fn backward(&self) -> Result<(), NeuraGraphError> {
        let mut delta = Volume::zeros_like(&self.input.value());
        {
            let x = self.input.value();
            let g = self.output.gradient();
            let [depth, width, height] = g.shape();
            for d in 0..depth {
                for w in 0..width {
                    for h in 0..height {
                        let (i, j) = self.arg_max(&x, d, w, h);
                        delta[(d, i, j)] += g[(d, w, h)];
                    }
                }
            }
        }
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
#[path = "maxpool_test.rs"]
mod tests;
