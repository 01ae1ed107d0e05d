use crate::block::BlockRef;
use crate::error::NeuraGraphError;
use crate::net::Network;
use crate::nn::losses::Loss;
use crate::op::Op;
use crate::optim::lr_decay::StepDecay;
use crate::volume::Volume;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Parameter update rule used by [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Plain gradient descent: `value -= lr * gradient`.
    #[default]
    Sgd,
    /// Gradient descent with a look-ahead step along a running average of
    /// past gradients.
    Nesterov,
}

impl FromStr for Method {
    type Err = NeuraGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sgd" => Ok(Method::Sgd),
            "nesterov" => Ok(Method::Nesterov),
            _ => Err(NeuraGraphError::unknown_option("method", s)),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Sgd => "sgd",
            Method::Nesterov => "nesterov",
        })
    }
}

/// Trains the trainable blocks of a [`Network`] by gradient descent.
///
/// The objective is a [`Loss`] between designated network outputs and
/// blocks holding the desired values. Each training cycle:
///
/// 1. advances the learning-rate decay,
/// 2. zeroes every gradient of the network,
/// 3. (Nesterov) moves every trainable block by `-(lr / 3) * momentum`,
/// 4. runs the forward pass,
/// 5. stores the loss gradient into the gradients of the outputs,
/// 6. runs the backward pass,
/// 7. applies `value -= lr * gradient` to every trainable block,
/// 8. (Nesterov) updates `momentum = inertia * momentum + (1 - inertia) * gradient`.
#[derive(Debug)]
pub struct Solver {
    net: Rc<Network>,
    outputs: Vec<BlockRef>,
    desired: Vec<BlockRef>,
    learning_rate: f32,
    decay: StepDecay,
    method: Method,
    inertia: f32,
    loss: Loss,
    momentum: BTreeMap<String, Volume>,
}

impl Solver {
    /// Creates a solver fitting the single block `output` to `desired`.
    ///
    /// Defaults: learning rate 0.1, decay by 0.1 every 1000 cycles, plain
    /// SGD, inertia 0.9, L2 loss.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if the two blocks differ in shape.
    pub fn new(net: Rc<Network>, output: &BlockRef, desired: &BlockRef) -> Result<Self, NeuraGraphError> {
        Solver::with_pairs(net, vec![(output.clone(), desired.clone())])
    }

    /// Creates a solver fitting several (output, desired) pairs at once.
    ///
    /// # Errors
    /// * `NeuraGraphError::Input` if `pairs` is empty.
    /// * `NeuraGraphError::Dimension` if a pair differs in shape.
    pub fn with_pairs(
        net: Rc<Network>,
        pairs: Vec<(BlockRef, BlockRef)>,
    ) -> Result<Self, NeuraGraphError> {
        if pairs.is_empty() {
            return Err(NeuraGraphError::Input(
                "solver needs at least one (output, desired) pair".to_string(),
            ));
        }
        for (output, desired) in pairs.iter() {
            if output.shape() != desired.shape() {
                return Err(NeuraGraphError::dimension(
                    &format!("Solver pair ('{}', '{}')", output.name(), desired.name()),
                    &output.shape(),
                    &desired.shape(),
                ));
            }
        }
        let (outputs, desired) = pairs.into_iter().unzip();
        Ok(Solver {
            net,
            outputs,
            desired,
            learning_rate: 0.1,
            decay: StepDecay::default(),
            method: Method::Sgd,
            inertia: 0.9,
            loss: Loss::L2,
            momentum: BTreeMap::new(),
        })
    }

    /// Runs `cycles` training cycles and returns the loss measured during the
    /// last one, before its parameter update.
    ///
    /// # Errors
    /// The first error raised by the network (e.g. a cycle in its nodes) or
    /// by the loss aborts training and is returned unchanged.
    pub fn train(&mut self, cycles: usize) -> Result<f32, NeuraGraphError> {
        for _ in 0..cycles {
            self.learning_rate = self.decay.step(self.learning_rate);
            let lr = self.learning_rate;

            self.net.reset_gradient();
            let trainable = self.net.trainable_blocks();

            if self.method == Method::Nesterov {
                self.ensure_momentum(&trainable);
                for block in trainable.iter() {
                    if let Some(m) = self.momentum.get(block.name()) {
                        block.value_mut().scaled_add(-lr / 3.0, m)?;
                    }
                }
            }

            self.net.forward()?;

            let grads = self.loss.gradients(&self.outputs, &self.desired)?;
            for (output, grad) in self.outputs.iter().zip(grads.iter()) {
                output.set_gradient(grad)?;
            }

            self.net.backward()?;

            for block in trainable.iter() {
                let grad = block.gradient();
                block.value_mut().scaled_add(-lr, &grad)?;
            }

            if self.method == Method::Nesterov {
                for block in trainable.iter() {
                    if let Some(m) = self.momentum.get_mut(block.name()) {
                        m.scale(self.inertia);
                        m.scaled_add(1.0 - self.inertia, &block.gradient())?;
                    }
                }
            }
        }
        self.loss()
    }

    /// Loss of the current output values, without running the network.
    pub fn loss(&self) -> Result<f32, NeuraGraphError> {
        self.loss.value(&self.outputs, &self.desired)
    }

    /// Selects the update rule, `"sgd"` or `"nesterov"`.
    ///
    /// Selecting `"nesterov"` allocates a zero momentum volume for every
    /// trainable block that does not have one yet.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::UnknownOption` for any other name.
    pub fn set_method(&mut self, name: &str) -> Result<(), NeuraGraphError> {
        self.method = name.parse()?;
        if self.method == Method::Nesterov {
            let trainable = self.net.trainable_blocks();
            self.ensure_momentum(&trainable);
        }
        Ok(())
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Configures learning-rate decay: every `period` cycles the rate is
    /// multiplied by `multiplier`. A period of 0 disables decay.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Input` if `multiplier` is not a positive finite number.
    pub fn set_learning_rate_decay(&mut self, multiplier: f32, period: usize) -> Result<(), NeuraGraphError> {
        self.decay = StepDecay::new(multiplier, period)?;
        Ok(())
    }

    /// Sets the learning rate and restarts the decay count.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Input` if `lr` is not a positive finite number.
    pub fn set_learning_rate(&mut self, lr: f32) -> Result<(), NeuraGraphError> {
        if !(lr.is_finite() && lr > 0.0) {
            return Err(NeuraGraphError::Input(format!(
                "learning rate must be positive and finite, got {}",
                lr
            )));
        }
        self.learning_rate = lr;
        self.decay.reset();
        Ok(())
    }

    /// Current learning rate, decay included.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Sets the share of the previous momentum kept at every update.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Input` unless `0 <= inertia < 1`.
    pub fn set_inertia(&mut self, inertia: f32) -> Result<(), NeuraGraphError> {
        if !(0.0..1.0).contains(&inertia) {
            return Err(NeuraGraphError::Input(format!(
                "inertia must lie in [0, 1), got {}",
                inertia
            )));
        }
        self.inertia = inertia;
        Ok(())
    }

    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Selects the loss, `"l1"` or `"l2"`.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::UnknownOption` for any other name.
    pub fn set_loss(&mut self, name: &str) -> Result<(), NeuraGraphError> {
        self.loss = name.parse()?;
        Ok(())
    }

    /// Momentum of the trainable block `name`, if allocated.
    pub fn momentum(&self, name: &str) -> Option<&Volume> {
        self.momentum.get(name)
    }

    pub fn network(&self) -> &Rc<Network> {
        &self.net
    }

    fn ensure_momentum(&mut self, trainable: &[BlockRef]) {
        for block in trainable {
            if !self.momentum.contains_key(block.name()) {
                log::debug!("Solver: allocating momentum for '{}'", block.name());
                self.momentum
                    .insert(block.name().to_string(), Volume::zeros_like(&block.value()));
            }
        }
    }
}

#[cfg(test)]
#[path = "solver_test.rs"]
mod tests;
