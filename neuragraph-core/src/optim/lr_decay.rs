use crate::error::NeuraGraphError;

/// Step decay of the learning rate.
///
/// Every `period` steps since the last change, the learning rate is
/// multiplied by `factor`. A period of 0 disables decay.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDecay {
    factor: f32,
    period: usize,
    steps_since_change: usize,
}

impl Default for StepDecay {
    fn default() -> Self {
        StepDecay {
            factor: 0.1,
            period: 1000,
            steps_since_change: 0,
        }
    }
}

impl StepDecay {
    /// Creates a new `StepDecay`.
    ///
    /// # Arguments
    ///
    /// * `factor` - Multiplier applied at every decay, `new_lr = lr * factor`. Default: 0.1.
    /// * `period` - Number of steps between two decays. Default: 1000.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Input` if `factor` is not a positive finite number.
    pub fn new(factor: f32, period: usize) -> Result<Self, NeuraGraphError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(NeuraGraphError::Input(format!(
                "learning rate decay factor must be positive and finite, got {}",
                factor
            )));
        }
        Ok(StepDecay {
            factor,
            period,
            steps_since_change: 0,
        })
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Advances by one step and returns the learning rate to use for it.
    pub fn step(&mut self, lr: f32) -> f32 {
        let mut lr = lr;
        if self.period > 0 && self.steps_since_change >= self.period {
            lr *= self.factor;
            self.steps_since_change = 0;
            log::debug!("StepDecay: learning rate decayed to {}", lr);
        }
        self.steps_since_change += 1;
        lr
    }

    /// Restarts the count, e.g. after the learning rate was set by hand.
    pub fn reset(&mut self) {
        self.steps_since_change = 0;
    }
}

#[cfg(test)]
#[path = "lr_decay_test.rs"]
mod tests;
