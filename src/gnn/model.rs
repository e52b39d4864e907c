//! Full network: stacked SAGE layers, a per-pose classifier and an
//! optional graph-level pKd regressor.

use ndarray::{Array2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::activation::sigmoid;
use super::error::Error;
use super::params::{Dense, Params, RegressorParams};
use super::sage::{self, SageCache};
use crate::config::{GnnConfig, Readout};
use crate::graph::PoseGraph;

#[derive(Debug, Clone, PartialEq)]
pub struct DbxModel {
    pub gnn: GnnConfig,
    pub input_dim: usize,
    pub params: Params,
}

/// Result of a forward pass, with the intermediates the reverse pass needs.
pub struct Forward {
    /// Final node embeddings (`n × hidden`).
    pub embeddings: Array2<f64>,
    pub logits: Vec<f64>,
    pub probabilities: Vec<f64>,
    pub pkd: Option<f64>,
    layers: Vec<SageCache>,
    readout: ReadoutCache,
}

struct ReadoutCache {
    argmax: Option<Vec<usize>>,
    regressor: Option<RegressorCache>,
}

struct RegressorCache {
    pooled: Array2<f64>,
    pre: Array2<f64>,
    act: Array2<f64>,
}

/// Loss gradients with respect to the model outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Upstream {
    pub logits: Vec<f64>,
    pub pkd: f64,
}

impl DbxModel {
    /// Freshly initialized model, reproducible for a given `seed`.
    pub fn new(
        gnn: &GnnConfig,
        input_dim: usize,
        affinity: bool,
        init_scale: f64,
        seed: u64,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self {
            gnn: gnn.clone(),
            input_dim,
            params: Params::glorot(gnn, input_dim, affinity, init_scale, &mut rng),
        }
    }

    /// Wraps existing parameters after checking them against the layout
    /// implied by `gnn`.
    pub fn from_params(
        gnn: &GnnConfig,
        input_dim: usize,
        affinity: bool,
        params: Params,
    ) -> Result<Self, Error> {
        let expected = Params::zeros(gnn, input_dim, affinity).shapes();
        let found = params.shapes();
        if expected.len() != found.len() {
            return Err(Error::TensorCount {
                expected: expected.len(),
                found: found.len(),
            });
        }
        if let Some((index, (e, f))) = expected
            .iter()
            .zip(&found)
            .enumerate()
            .find(|(_, (e, f))| e != f)
        {
            return Err(Error::ShapeMismatch {
                index,
                expected: *e,
                found: *f,
            });
        }

        Ok(Self {
            gnn: gnn.clone(),
            input_dim,
            params,
        })
    }

    #[inline]
    pub fn predicts_affinity(&self) -> bool {
        self.params.regressor.is_some()
    }

    pub fn forward(&self, graph: &PoseGraph) -> Result<Forward, Error> {
        let n = graph.node_count();
        if n == 0 {
            return Err(Error::EmptyGraph(graph.id.clone()));
        }
        if graph.features.ncols() != self.input_dim {
            return Err(Error::InputWidth {
                expected: self.input_dim,
                found: graph.features.ncols(),
            });
        }
        if graph.neighbors.len() != n {
            return Err(Error::Adjacency {
                nodes: n,
                lists: graph.neighbors.len(),
            });
        }

        let mut layers: Vec<SageCache> = Vec::with_capacity(self.params.layers.len());
        for layer in &self.params.layers {
            let input = layers.last().map_or(&graph.features, |c| c.output());
            let cache = sage::forward(
                layer,
                self.gnn.activation,
                self.gnn.normalize,
                input,
                &graph.neighbors,
            );
            layers.push(cache);
        }
        let embeddings = layers
            .last()
            .map_or_else(|| graph.features.clone(), |c| c.output().clone());

        let cls = &self.params.classifier;
        let scores = &embeddings.dot(&cls.weight) + &cls.bias;
        let logits: Vec<f64> = scores.column(0).to_vec();
        let probabilities = logits.iter().map(|&s| sigmoid(s)).collect();

        let (pooled, argmax) = readout(self.gnn.readout, &embeddings);
        let (pkd, regressor) = match &self.params.regressor {
            Some(reg) => {
                let pre = &pooled.dot(&reg.hidden.weight) + &reg.hidden.bias;
                let act = self.gnn.activation.forward(&pre);
                let out = &act.dot(&reg.output.weight) + &reg.output.bias;
                (
                    Some(out[[0, 0]]),
                    Some(RegressorCache { pooled, pre, act }),
                )
            }
            None => (None, None),
        };

        Ok(Forward {
            embeddings,
            logits,
            probabilities,
            pkd,
            layers,
            readout: ReadoutCache { argmax, regressor },
        })
    }

    /// Reverse pass; returns gradients laid out like `self.params`.
    pub fn backward(&self, graph: &PoseGraph, forward: &Forward, upstream: &Upstream) -> Params {
        let emb = &forward.embeddings;
        let n = emb.nrows();
        let activation = self.gnn.activation;

        let d_scores = Array2::from_shape_fn((n, 1), |(i, _)| {
            upstream.logits.get(i).copied().unwrap_or(0.0)
        });
        let classifier = Dense {
            weight: emb.t().dot(&d_scores),
            bias: d_scores.sum_axis(Axis(0)).insert_axis(Axis(0)),
        };
        let mut d_emb = d_scores.dot(&self.params.classifier.weight.t());

        let regressor = match (&self.params.regressor, &forward.readout.regressor) {
            (Some(reg), Some(cache)) => {
                let d_out = Array2::from_elem((1, 1), upstream.pkd);
                let output = Dense {
                    weight: cache.act.t().dot(&d_out),
                    bias: d_out.clone(),
                };
                let d_act = d_out.dot(&reg.output.weight.t());
                let d_pre = activation.backward(&cache.pre, &cache.act, &d_act);
                let hidden = Dense {
                    weight: cache.pooled.t().dot(&d_pre),
                    bias: d_pre.clone(),
                };
                let d_pooled = d_pre.dot(&reg.hidden.weight.t());
                readout_backward(&d_pooled, forward.readout.argmax.as_deref(), &mut d_emb);
                Some(RegressorParams { hidden, output })
            }
            _ => None,
        };

        let mut layers = Vec::with_capacity(self.params.layers.len());
        let mut d_h = d_emb;
        for (layer, cache) in self.params.layers.iter().zip(&forward.layers).rev() {
            let (grad, d_input) = sage::backward(layer, activation, cache, &graph.neighbors, &d_h);
            layers.push(grad);
            d_h = d_input;
        }
        layers.reverse();

        Params {
            layers,
            classifier,
            regressor,
        }
    }
}

/// Pools node rows into a `1 × h` graph embedding.
fn readout(kind: Readout, emb: &Array2<f64>) -> (Array2<f64>, Option<Vec<usize>>) {
    match kind {
        Readout::Mean => {
            let pooled = emb.sum_axis(Axis(0)) / emb.nrows() as f64;
            (pooled.insert_axis(Axis(0)), None)
        }
        Readout::Max => {
            let mut pooled = Array2::<f64>::zeros((1, emb.ncols()));
            let mut argmax = Vec::with_capacity(emb.ncols());
            for (k, column) in emb.columns().into_iter().enumerate() {
                let mut best = 0;
                for (i, &value) in column.iter().enumerate() {
                    if value > column[best] {
                        best = i;
                    }
                }
                pooled[[0, k]] = column[best];
                argmax.push(best);
            }
            (pooled, Some(argmax))
        }
    }
}

fn readout_backward(d_pooled: &Array2<f64>, argmax: Option<&[usize]>, d_emb: &mut Array2<f64>) {
    match argmax {
        Some(argmax) => {
            for (k, &i) in argmax.iter().enumerate() {
                d_emb[[i, k]] += d_pooled[[0, k]];
            }
        }
        None => {
            let share = 1.0 / d_emb.nrows() as f64;
            for mut row in d_emb.rows_mut() {
                row.scaled_add(share, &d_pooled.row(0));
            }
        }
    }
}
