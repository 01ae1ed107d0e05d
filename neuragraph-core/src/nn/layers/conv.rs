use crate::block::{BlockMap, BlockRef, TensorBlock};
use crate::error::NeuraGraphError;
use crate::nn::init;
use crate::nn::transfer::Transfer;
use crate::op::Op;
use crate::volume::Volume;
use rand::Rng;
use std::rc::Rc;

/// Geometry of a [`Conv`] layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvConfig {
    /// Number of kernels, i.e. depth of the output block.
    pub output_depth: usize,
    /// Side of the square kernel window.
    pub window: usize,
    /// Virtual zero cells added on each side of width and height.
    pub padding: usize,
    /// Step between two consecutive windows.
    pub stride: usize,
}

impl Default for ConvConfig {
    fn default() -> Self {
        ConvConfig {
            output_depth: 1,
            window: 3,
            padding: 0,
            stride: 1,
        }
    }
}

/// 2-D convolution over width and height, spanning the whole input depth.
///
/// Kernel `k` is the trainable block `"<node>_w<k>"` of shape
/// (input depth, window, window), paired with the trainable threshold
/// `"<node>_thr<k>"` of shape (1, 1, 1). Output slice `k` is
/// `f(sum(kernel_k * window) + thr_k)` at every stride position.
#[derive(Debug)]
pub struct Conv {
    name: String,
    transfer: Transfer,
    config: ConvConfig,
    input: BlockRef,
    kernels: Vec<BlockRef>,
    thresholds: Vec<BlockRef>,
    output: BlockRef,
}

impl Conv {
    /// Creates a convolution layer over `input`.
    ///
    /// Kernels are drawn from `N(0, 1/fan_in)` with
    /// `fan_in = depth * window * window`; thresholds start at zero.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Input` if any of `output_depth`, `window`,
    /// `stride` is zero, if `padding >= window`, if the window does not fit
    /// the padded input, or if the stride does not tile the padded input
    /// exactly.
    pub fn new(
        name: &str,
        transfer: Transfer,
        input: &BlockRef,
        config: ConvConfig,
    ) -> Result<Self, NeuraGraphError> {
        Conv::with_rng(name, transfer, input, config, &mut rand::thread_rng())
    }

    /// Same as [`Conv::new`], drawing initial kernels from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        name: &str,
        transfer: Transfer,
        input: &BlockRef,
        config: ConvConfig,
        rng: &mut R,
    ) -> Result<Self, NeuraGraphError> {
        let [out_width, out_height] = output_extent(name, input.shape(), &config)?;
        let depth = input.shape()[0];

        let mut kernels = Vec::with_capacity(config.output_depth);
        let mut thresholds = Vec::with_capacity(config.output_depth);
        for k in 0..config.output_depth {
            let kernel = TensorBlock::parameter(
                format!("{}_w{}", name, k),
                depth,
                config.window,
                config.window,
            );
            init::scaled_normal_(&kernel, kernel.len(), rng)?;
            kernels.push(kernel);
            thresholds.push(TensorBlock::parameter(format!("{}_thr{}", name, k), 1, 1, 1));
        }

        Ok(Conv {
            name: name.to_string(),
            transfer,
            config,
            input: input.clone(),
            kernels,
            thresholds,
            output: TensorBlock::new(
                format!("{}_out", name),
                config.output_depth,
                out_width,
                out_height,
            ),
        })
    }

    pub fn output(&self) -> &BlockRef {
        &self.output
    }

    pub fn kernels(&self) -> &[BlockRef] {
        &self.kernels
    }

    pub fn thresholds(&self) -> &[BlockRef] {
        &self.thresholds
    }

    pub fn config(&self) -> ConvConfig {
        self.config
    }

    /// Calls `visit(c, i, j, x, y)` for every kernel cell `(c, i, j)` of the
    /// window producing output cell `(w, h)` that lies inside the input
    /// `(c, x, y)`.
    fn for_each_tap(
        &self,
        width: usize,
        height: usize,
        w: usize,
        h: usize,
        mut visit: impl FnMut(usize, usize, usize, usize, usize),
    ) {
        let depth = self.input.shape()[0];
        let (p, s) = (self.config.padding, self.config.stride);
        for c in 0..depth {
            for i in 0..self.config.window {
                let Some(x) = (w * s + i).checked_sub(p).filter(|&x| x < width) else {
                    continue;
                };
                for j in 0..self.config.window {
                    if let Some(y) = (h * s + j).checked_sub(p).filter(|&y| y < height) {
                        visit(c, i, j, x, y);
                    }
                }
            }
        }
    }
}

/// Validates the geometry and returns the output `[width, height]`.
fn output_extent(
    name: &str,
    [_, width, height]: [usize; 3],
    config: &ConvConfig,
) -> Result<[usize; 2], NeuraGraphError> {
    let fail = |reason: String| Err(NeuraGraphError::Input(format!("conv '{}': {}", name, reason)));
    if config.output_depth == 0 || config.window == 0 || config.stride == 0 {
        return fail(format!("output depth, window and stride must be positive, got {:?}", config));
    }
    if config.padding >= config.window {
        return fail(format!(
            "padding {} must be smaller than window {}",
            config.padding, config.window
        ));
    }
    let padded = [width + 2 * config.padding, height + 2 * config.padding];
    if padded.iter().any(|&extent| extent < config.window) {
        return fail(format!("window {} does not fit padded input {:?}", config.window, padded));
    }
    if padded.iter().any(|&extent| (extent - config.window) % config.stride != 0) {
        return fail(format!(
            "stride {} does not tile padded input {:?} with window {}",
            config.stride, padded, config.window
        ));
    }
    Ok(padded.map(|extent| (extent - config.window) / config.stride + 1))
}

impl Op for Conv {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self) -> Result<(), NeuraGraphError> {
        let x = self.input.value();
        let (width, height) = (x.width(), x.height());
        let mut out = self.output.value_mut();
        let [_, out_width, out_height] = out.shape();

        for (k, (kernel, thr)) in self.kernels.iter().zip(self.thresholds.iter()).enumerate() {
            let kernel = kernel.value();
            let bias = thr.value()[(0, 0, 0)];
            for w in 0..out_width {
                for h in 0..out_height {
                    let mut sum = bias;
                    self.for_each_tap(width, height, w, h, |c, i, j, xi, yi| {
                        sum += kernel[(c, i, j)] * x[(c, xi, yi)];
                    });
                    out[(k, w, h)] = self.transfer.forward(sum);
                }
            }
        }
        Ok(())
    }

    fn backward(&self) -> Result<(), NeuraGraphError> {
        let [_, width, height] = self.input.shape();
        let [_, out_width, out_height] = self.output.shape();
        let mut input_grad = Volume::zeros_like(&self.input.value());

        for (k, (kernel, thr)) in self.kernels.iter().zip(self.thresholds.iter()).enumerate() {
            let mut kernel_grad = Volume::zeros_like(&kernel.value());
            let mut thr_grad = 0.0;
            {
                let x = self.input.value();
                let weights = kernel.value();
                let y = self.output.value();
                let g = self.output.gradient();
                for w in 0..out_width {
                    for h in 0..out_height {
                        let delta = g[(k, w, h)] * self.transfer.derivative_from_output(y[(k, w, h)]);
                        if delta == 0.0 {
                            continue;
                        }
                        thr_grad += delta;
                        self.for_each_tap(width, height, w, h, |c, i, j, xi, yi| {
                            kernel_grad[(c, i, j)] += delta * x[(c, xi, yi)];
                            input_grad[(c, xi, yi)] += delta * weights[(c, i, j)];
                        });
                    }
                }
            }
            kernel.accumulate_gradient(&kernel_grad)?;
            thr.gradient_mut()[(0, 0, 0)] += thr_grad;
        }
        self.input.accumulate_gradient(&input_grad)
    }

    fn inputs(&self) -> BlockMap {
        let mut map = BlockMap::new();
        map.insert(self.input.name().to_string(), Rc::clone(&self.input));
        for block in self.kernels.iter().chain(self.thresholds.iter()) {
            map.insert(block.name().to_string(), Rc::clone(block));
        }
        map
    }

    fn outputs(&self) -> BlockMap {
        let mut map = BlockMap::new();
        map.insert(self.output.name().to_string(), Rc::clone(&self.output));
        map
    }
}

#[cfg(test)]
#[path = "conv_test.rs"]
mod tests;
