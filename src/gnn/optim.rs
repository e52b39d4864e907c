//! First-order optimizers over [`Params`].
//!
//! L2 weight decay is folded into the gradient of weight tensors before
//! the update; biases are never decayed.

use ndarray::Zip;

use super::params::{ParamKind, Params};
use crate::config::{OptimizerConfig, OptimizerKind};

pub trait Optimizer {
    /// Applies one update using `grads`, which must share the layout of `params`.
    fn step(&mut self, params: &mut Params, grads: &Params);

    fn learning_rate(&self) -> f64;
}

/// Builds the optimizer selected in `config`.
pub fn from_config(config: &OptimizerConfig) -> Box<dyn Optimizer> {
    match config.kind {
        OptimizerKind::Sgd => Box::new(Sgd::new(config.learning_rate, config.weight_decay)),
        OptimizerKind::Adam => Box::new(Adam::new(config)),
    }
}

#[derive(Debug, Clone)]
pub struct Sgd {
    lr: f64,
    weight_decay: f64,
}

impl Sgd {
    pub fn new(lr: f64, weight_decay: f64) -> Self {
        Self { lr, weight_decay }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut Params, grads: &Params) {
        for ((kind, theta), (_, grad)) in params.tensors_mut().into_iter().zip(grads.tensors()) {
            let decay = decay_for(kind, self.weight_decay);
            Zip::from(theta).and(grad).for_each(|p, &g| {
                *p -= self.lr * (g + decay * *p);
            });
        }
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }
}

/// Adam with bias-corrected moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    weight_decay: f64,
    step: i32,
    moments: Option<(Params, Params)>,
}

impl Adam {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            lr: config.learning_rate,
            beta1: config.beta1,
            beta2: config.beta2,
            epsilon: config.epsilon,
            weight_decay: config.weight_decay,
            step: 0,
            moments: None,
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut Params, grads: &Params) {
        self.step = self.step.saturating_add(1);
        let (b1, b2) = (self.beta1, self.beta2);
        let correction1 = 1.0 - b1.powi(self.step);
        let correction2 = 1.0 - b2.powi(self.step);
        let (lr, eps, wd) = (self.lr, self.epsilon, self.weight_decay);

        let (m, v) = self
            .moments
            .get_or_insert_with(|| (params.zeros_like(), params.zeros_like()));

        let tensors = params
            .tensors_mut()
            .into_iter()
            .zip(grads.tensors())
            .zip(m.tensors_mut())
            .zip(v.tensors_mut());

        for ((((kind, theta), (_, grad)), (_, m)), (_, v)) in tensors {
            let decay = decay_for(kind, wd);
            Zip::from(theta)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    let g = g + decay * *p;
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *p -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }
}

#[inline]
fn decay_for(kind: ParamKind, weight_decay: f64) -> f64 {
    match kind {
        ParamKind::Weight => weight_decay,
        ParamKind::Bias => 0.0,
    }
}
