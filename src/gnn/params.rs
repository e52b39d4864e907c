//! Trainable tensors of the network.
//!
//! Every tensor is an `Array2<f64>`; biases are `1×d` rows so they
//! broadcast over node rows. [`Params::tensors`] and
//! [`Params::tensors_mut`] walk the tensors in a fixed order, which the
//! optimizers and the model file rely on.

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{Aggregator, GnnConfig};

/// Whether weight decay applies to a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Weight,
    Bias,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
}

impl Dense {
    fn zeros(fan_in: usize, fan_out: usize) -> Self {
        Self {
            weight: Array2::zeros((fan_in, fan_out)),
            bias: Array2::zeros((1, fan_out)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionParams {
    /// Projection `Z = H·W` shared by every neighbor.
    pub weight: Array2<f64>,
    pub a_self: Array2<f64>,
    pub a_neigh: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SageParams {
    pub w_self: Array2<f64>,
    pub w_neigh: Array2<f64>,
    pub bias: Array2<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<Dense>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention: Option<AttentionParams>,
}

impl SageParams {
    fn zeros(aggregator: Aggregator, fan_in: usize, fan_out: usize) -> Self {
        Self {
            w_self: Array2::zeros((fan_in, fan_out)),
            w_neigh: Array2::zeros((fan_in, fan_out)),
            bias: Array2::zeros((1, fan_out)),
            pool: (aggregator == Aggregator::Maxpool).then(|| Dense::zeros(fan_in, fan_in)),
            attention: (aggregator == Aggregator::Attention).then(|| AttentionParams {
                weight: Array2::zeros((fan_in, fan_in)),
                a_self: Array2::zeros((fan_in, 1)),
                a_neigh: Array2::zeros((fan_in, 1)),
            }),
        }
    }
}

/// Two-layer MLP from the graph embedding to a pKd.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressorParams {
    pub hidden: Dense,
    pub output: Dense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub layers: Vec<SageParams>,
    pub classifier: Dense,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regressor: Option<RegressorParams>,
}

impl Params {
    /// All-zero parameters with the layout implied by `gnn`.
    pub fn zeros(gnn: &GnnConfig, input_dim: usize, affinity: bool) -> Self {
        let layers = (0..gnn.depth)
            .map(|l| {
                let fan_in = if l == 0 { input_dim } else { gnn.hidden };
                SageParams::zeros(gnn.aggregator, fan_in, gnn.hidden)
            })
            .collect();

        Self {
            layers,
            classifier: Dense::zeros(gnn.hidden, 1),
            regressor: affinity.then(|| RegressorParams {
                hidden: Dense::zeros(gnn.hidden, gnn.regressor_hidden),
                output: Dense::zeros(gnn.regressor_hidden, 1),
            }),
        }
    }

    /// Glorot-uniform weights scaled by `scale`; biases stay zero.
    pub fn glorot<R: Rng>(
        gnn: &GnnConfig,
        input_dim: usize,
        affinity: bool,
        scale: f64,
        rng: &mut R,
    ) -> Self {
        let mut params = Self::zeros(gnn, input_dim, affinity);
        for (kind, tensor) in params.tensors_mut() {
            if kind == ParamKind::Weight {
                let (fan_in, fan_out) = tensor.dim();
                let limit = scale * (6.0 / (fan_in + fan_out) as f64).sqrt();
                tensor.mapv_inplace(|_| rng.gen_range(-limit..=limit));
            }
        }
        params
    }

    pub fn tensors(&self) -> Vec<(ParamKind, &Array2<f64>)> {
        use ParamKind::{Bias, Weight};

        let mut out = Vec::new();
        for layer in &self.layers {
            out.push((Weight, &layer.w_self));
            out.push((Weight, &layer.w_neigh));
            out.push((Bias, &layer.bias));
            if let Some(pool) = &layer.pool {
                out.push((Weight, &pool.weight));
                out.push((Bias, &pool.bias));
            }
            if let Some(att) = &layer.attention {
                out.push((Weight, &att.weight));
                out.push((Weight, &att.a_self));
                out.push((Weight, &att.a_neigh));
            }
        }
        out.push((Weight, &self.classifier.weight));
        out.push((Bias, &self.classifier.bias));
        if let Some(reg) = &self.regressor {
            out.push((Weight, &reg.hidden.weight));
            out.push((Bias, &reg.hidden.bias));
            out.push((Weight, &reg.output.weight));
            out.push((Bias, &reg.output.bias));
        }
        out
    }

    pub fn tensors_mut(&mut self) -> Vec<(ParamKind, &mut Array2<f64>)> {
        use ParamKind::{Bias, Weight};

        let mut out = Vec::new();
        for layer in &mut self.layers {
            out.push((Weight, &mut layer.w_self));
            out.push((Weight, &mut layer.w_neigh));
            out.push((Bias, &mut layer.bias));
            if let Some(pool) = &mut layer.pool {
                out.push((Weight, &mut pool.weight));
                out.push((Bias, &mut pool.bias));
            }
            if let Some(att) = &mut layer.attention {
                out.push((Weight, &mut att.weight));
                out.push((Weight, &mut att.a_self));
                out.push((Weight, &mut att.a_neigh));
            }
        }
        out.push((Weight, &mut self.classifier.weight));
        out.push((Bias, &mut self.classifier.bias));
        if let Some(reg) = &mut self.regressor {
            out.push((Weight, &mut reg.hidden.weight));
            out.push((Bias, &mut reg.hidden.bias));
            out.push((Weight, &mut reg.output.weight));
            out.push((Bias, &mut reg.output.bias));
        }
        out
    }

    pub fn zeros_like(&self) -> Self {
        let mut zeros = self.clone();
        for (_, tensor) in zeros.tensors_mut() {
            tensor.fill(0.0);
        }
        zeros
    }

    /// `self += scale · other`; both must share a layout.
    pub fn add_scaled(&mut self, other: &Params, scale: f64) {
        for ((_, dst), (_, src)) in self.tensors_mut().into_iter().zip(other.tensors()) {
            dst.scaled_add(scale, src);
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for (_, tensor) in self.tensors_mut() {
            tensor.mapv_inplace(|x| x * factor);
        }
    }

    pub fn shapes(&self) -> Vec<(usize, usize)> {
        self.tensors().into_iter().map(|(_, t)| t.dim()).collect()
    }

    pub fn count(&self) -> usize {
        self.tensors().iter().map(|(_, t)| t.len()).sum()
    }

    pub fn is_finite(&self) -> bool {
        self.tensors()
            .iter()
            .all(|(_, t)| t.iter().all(|x| x.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn config(aggregator: Aggregator) -> GnnConfig {
        GnnConfig {
            depth: 2,
            hidden: 4,
            aggregator,
            regressor_hidden: 3,
            ..GnnConfig::default()
        }
    }

    #[test]
    fn layout_depends_on_aggregator_and_task() {
        let mean = Params::zeros(&config(Aggregator::Mean), 5, false);
        assert_eq!(
            mean.shapes(),
            vec![(5, 4), (5, 4), (1, 4), (4, 4), (4, 4), (1, 4), (4, 1), (1, 1)]
        );

        let pool = Params::zeros(&config(Aggregator::Maxpool), 5, true);
        assert_eq!(pool.tensors().len(), 2 * 5 + 2 + 4);
        assert_eq!(pool.layers[0].pool.as_ref().map(|p| p.weight.dim()), Some((5, 5)));

        let att = Params::zeros(&config(Aggregator::Attention), 5, false);
        assert_eq!(att.tensors().len(), 2 * 6 + 2);
        assert_eq!(
            att.layers[1].attention.as_ref().map(|a| a.a_neigh.dim()),
            Some((4, 1))
        );
    }

    #[test]
    fn glorot_respects_limits_and_leaves_biases_zero() {
        let gnn = config(Aggregator::Mean);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let params = Params::glorot(&gnn, 5, true, 1.0, &mut rng);

        for (kind, tensor) in params.tensors() {
            let (fan_in, fan_out) = tensor.dim();
            match kind {
                ParamKind::Bias => assert!(tensor.iter().all(|&x| x == 0.0)),
                ParamKind::Weight => {
                    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
                    assert!(tensor.iter().all(|x| x.abs() <= limit));
                    assert!(tensor.iter().any(|&x| x != 0.0));
                }
            }
        }

        let mut again = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(Params::glorot(&gnn, 5, true, 1.0, &mut again), params);
    }

    #[test]
    fn add_scaled_and_zeros_like() {
        let gnn = config(Aggregator::Mean);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let params = Params::glorot(&gnn, 3, false, 1.0, &mut rng);

        let mut acc = params.zeros_like();
        assert!(acc.tensors().iter().all(|(_, t)| t.iter().all(|&x| x == 0.0)));
        acc.add_scaled(&params, 2.0);
        acc.scale(0.5);
        assert_eq!(acc, params);
        assert_eq!(acc.count(), 3 * 4 * 2 + 4 + 4 * 4 * 2 + 4 + 4 + 1);
    }
}
