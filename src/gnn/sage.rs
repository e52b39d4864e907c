//! GraphSAGE layer: forward pass with cached intermediates and the
//! matching reverse pass.

use ndarray::{Array2, Axis};

use super::activation::{leaky_relu, leaky_relu_grad};
use super::params::{AttentionParams, Dense, SageParams};
use crate::config::Activation;

/// Negative slope of the attention score nonlinearity.
const ATTENTION_SLOPE: f64 = 0.2;
/// Rows with a smaller norm are left unnormalized.
const NORM_EPS: f64 = 1e-12;

pub(crate) struct SageCache {
    input: Array2<f64>,
    agg: Array2<f64>,
    pre: Array2<f64>,
    act: Array2<f64>,
    output: Array2<f64>,
    norms: Option<Vec<f64>>,
    aux: AggCache,
}

enum AggCache {
    Mean,
    Maxpool {
        pre: Array2<f64>,
        act: Array2<f64>,
        argmax: Array2<Option<usize>>,
    },
    Attention {
        z: Array2<f64>,
        members: Vec<Vec<usize>>,
        scores: Vec<Vec<f64>>,
        alpha: Vec<Vec<f64>>,
    },
}

pub(crate) fn forward(
    params: &SageParams,
    activation: Activation,
    normalize: bool,
    h: &Array2<f64>,
    neighbors: &[Vec<usize>],
) -> SageCache {
    let (agg, aux) = if let Some(pool) = &params.pool {
        maxpool_aggregate(pool, activation, h, neighbors)
    } else if let Some(att) = &params.attention {
        attention_aggregate(att, h, neighbors)
    } else {
        (mean_aggregate(h, neighbors), AggCache::Mean)
    };

    let pre = &(h.dot(&params.w_self) + agg.dot(&params.w_neigh)) + &params.bias;
    let act = activation.forward(&pre);

    let (output, norms) = if normalize {
        let mut output = act.clone();
        let mut norms = Vec::with_capacity(output.nrows());
        for mut row in output.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > NORM_EPS {
                row /= norm;
            }
            norms.push(norm);
        }
        (output, Some(norms))
    } else {
        (act.clone(), None)
    };

    SageCache {
        input: h.clone(),
        agg,
        pre,
        act,
        output,
        norms,
        aux,
    }
}

impl SageCache {
    #[inline]
    pub(crate) fn output(&self) -> &Array2<f64> {
        &self.output
    }
}

/// Returns parameter gradients and the gradient with respect to the layer input.
pub(crate) fn backward(
    params: &SageParams,
    activation: Activation,
    cache: &SageCache,
    neighbors: &[Vec<usize>],
    d_out: &Array2<f64>,
) -> (SageParams, Array2<f64>) {
    let d_act = match &cache.norms {
        Some(norms) => {
            let mut d_act = d_out.clone();
            for (i, &norm) in norms.iter().enumerate() {
                if norm > NORM_EPS {
                    let y = cache.output.row(i);
                    let dy = d_out.row(i);
                    let proj = y.dot(&dy);
                    let mut row = d_act.row_mut(i);
                    row.scaled_add(-proj, &y);
                    row /= norm;
                }
            }
            d_act
        }
        None => d_out.clone(),
    };
    let d_pre = activation.backward(&cache.pre, &cache.act, &d_act);

    let h = &cache.input;
    let mut grads = SageParams {
        w_self: h.t().dot(&d_pre),
        w_neigh: cache.agg.t().dot(&d_pre),
        bias: d_pre.sum_axis(Axis(0)).insert_axis(Axis(0)),
        pool: None,
        attention: None,
    };

    let mut d_h = d_pre.dot(&params.w_self.t());
    let d_agg = d_pre.dot(&params.w_neigh.t());

    match &cache.aux {
        AggCache::Mean => {
            for (i, nb) in neighbors.iter().enumerate() {
                if nb.is_empty() {
                    continue;
                }
                let share = 1.0 / nb.len() as f64;
                for &j in nb {
                    d_h.row_mut(j).scaled_add(share, &d_agg.row(i));
                }
            }
        }
        AggCache::Maxpool { pre, act, argmax } => {
            let mut d_pool = Array2::<f64>::zeros(act.raw_dim());
            for ((i, k), winner) in argmax.indexed_iter() {
                if let Some(j) = *winner {
                    d_pool[[j, k]] += d_agg[[i, k]];
                }
            }
            let d_pool_pre = activation.backward(pre, act, &d_pool);
            if let Some(pool) = &params.pool {
                d_h += &d_pool_pre.dot(&pool.weight.t());
            }
            grads.pool = Some(Dense {
                weight: h.t().dot(&d_pool_pre),
                bias: d_pool_pre.sum_axis(Axis(0)).insert_axis(Axis(0)),
            });
        }
        AggCache::Attention {
            z,
            members,
            scores,
            alpha,
        } => {
            if let Some(att) = &params.attention {
                let (grad, d_input) = attention_backward(att, h, z, members, scores, alpha, &d_agg);
                d_h += &d_input;
                grads.attention = Some(grad);
            }
        }
    }

    (grads, d_h)
}

fn mean_aggregate(h: &Array2<f64>, neighbors: &[Vec<usize>]) -> Array2<f64> {
    let mut agg = Array2::<f64>::zeros(h.raw_dim());
    for (i, nb) in neighbors.iter().enumerate() {
        if nb.is_empty() {
            continue;
        }
        let mut row = agg.row_mut(i);
        for &j in nb {
            row += &h.row(j);
        }
        row /= nb.len() as f64;
    }
    agg
}

fn maxpool_aggregate(
    pool: &Dense,
    activation: Activation,
    h: &Array2<f64>,
    neighbors: &[Vec<usize>],
) -> (Array2<f64>, AggCache) {
    let pre = &h.dot(&pool.weight) + &pool.bias;
    let act = activation.forward(&pre);

    let (n, d) = act.dim();
    let mut agg = Array2::<f64>::zeros((n, d));
    let mut argmax = Array2::<Option<usize>>::from_elem((n, d), None);

    for (i, nb) in neighbors.iter().enumerate() {
        for k in 0..d {
            let mut best: Option<(usize, f64)> = None;
            for &j in nb {
                let value = act[[j, k]];
                if best.is_none_or(|(_, b)| value > b) {
                    best = Some((j, value));
                }
            }
            if let Some((j, value)) = best {
                agg[[i, k]] = value;
                argmax[[i, k]] = Some(j);
            }
        }
    }

    (agg, AggCache::Maxpool { pre, act, argmax })
}

fn attention_aggregate(
    att: &AttentionParams,
    h: &Array2<f64>,
    neighbors: &[Vec<usize>],
) -> (Array2<f64>, AggCache) {
    let z = h.dot(&att.weight);
    let s_self = z.dot(&att.a_self);
    let s_neigh = z.dot(&att.a_neigh);

    let mut agg = Array2::<f64>::zeros(z.raw_dim());
    let mut members = Vec::with_capacity(neighbors.len());
    let mut scores = Vec::with_capacity(neighbors.len());
    let mut alphas = Vec::with_capacity(neighbors.len());

    for (i, nb) in neighbors.iter().enumerate() {
        let group: Vec<usize> = std::iter::once(i).chain(nb.iter().copied()).collect();
        let u: Vec<f64> = group
            .iter()
            .map(|&j| s_self[[i, 0]] + s_neigh[[j, 0]])
            .collect();

        let e: Vec<f64> = u.iter().map(|&x| leaky_relu(x, ATTENTION_SLOPE)).collect();
        let top = e.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = e.iter().map(|&x| (x - top).exp()).collect();
        let total: f64 = exp.iter().sum();
        let alpha: Vec<f64> = exp.iter().map(|&x| x / total).collect();

        let mut row = agg.row_mut(i);
        for (&j, &a) in group.iter().zip(&alpha) {
            row.scaled_add(a, &z.row(j));
        }

        members.push(group);
        scores.push(u);
        alphas.push(alpha);
    }

    (
        agg,
        AggCache::Attention {
            z,
            members,
            scores,
            alpha: alphas,
        },
    )
}

fn attention_backward(
    att: &AttentionParams,
    h: &Array2<f64>,
    z: &Array2<f64>,
    members: &[Vec<usize>],
    scores: &[Vec<f64>],
    alpha: &[Vec<f64>],
    d_agg: &Array2<f64>,
) -> (AttentionParams, Array2<f64>) {
    let n = z.nrows();
    let mut d_z = Array2::<f64>::zeros(z.raw_dim());
    let mut d_self = Array2::<f64>::zeros((n, 1));
    let mut d_neigh = Array2::<f64>::zeros((n, 1));

    for i in 0..n {
        let upstream = d_agg.row(i);
        let d_alpha: Vec<f64> = members[i].iter().map(|&j| upstream.dot(&z.row(j))).collect();
        let mean: f64 = alpha[i].iter().zip(&d_alpha).map(|(a, g)| a * g).sum();

        for (m, &j) in members[i].iter().enumerate() {
            d_z.row_mut(j).scaled_add(alpha[i][m], &upstream);

            let d_e = alpha[i][m] * (d_alpha[m] - mean);
            let d_u = d_e * leaky_relu_grad(scores[i][m], ATTENTION_SLOPE);
            d_self[[i, 0]] += d_u;
            d_neigh[[j, 0]] += d_u;
        }
    }

    let grad_a_self = z.t().dot(&d_self);
    let grad_a_neigh = z.t().dot(&d_neigh);
    d_z += &d_self.dot(&att.a_self.t());
    d_z += &d_neigh.dot(&att.a_neigh.t());

    let grad = AttentionParams {
        weight: h.t().dot(&d_z),
        a_self: grad_a_self,
        a_neigh: grad_a_neigh,
    };
    (grad, d_z.dot(&att.weight.t()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dense_params(d: usize, h: usize) -> SageParams {
        SageParams {
            w_self: Array2::eye(d).slice(ndarray::s![.., ..h]).to_owned(),
            w_neigh: Array2::zeros((d, h)),
            bias: Array2::zeros((1, h)),
            pool: None,
            attention: None,
        }
    }

    #[test]
    fn mean_aggregate_averages_neighbors_and_zeros_isolated_nodes() {
        let h = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let neighbors = vec![vec![1, 2], vec![0], vec![]];
        let agg = mean_aggregate(&h, &neighbors);
        assert_eq!(agg, array![[4.0, 5.0], [1.0, 2.0], [0.0, 0.0]]);
    }

    #[test]
    fn maxpool_takes_elementwise_max_of_pooled_neighbors() {
        let pool = Dense {
            weight: Array2::eye(2),
            bias: Array2::zeros((1, 2)),
        };
        let h = array![[1.0, 9.0], [3.0, 4.0], [5.0, 0.0]];
        let neighbors = vec![vec![1, 2], vec![0], vec![]];
        let (agg, _) = maxpool_aggregate(&pool, Activation::Linear, &h, &neighbors);
        assert_eq!(agg, array![[5.0, 4.0], [1.0, 9.0], [0.0, 0.0]]);
    }

    #[test]
    fn attention_weights_form_a_distribution_including_self() {
        let att = AttentionParams {
            weight: Array2::eye(2),
            a_self: array![[0.5], [-0.25]],
            a_neigh: array![[1.0], [0.5]],
        };
        let h = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let neighbors = vec![vec![1, 2], vec![0], vec![]];
        let (agg, cache) = attention_aggregate(&att, &h, &neighbors);

        let AggCache::Attention { members, alpha, .. } = cache else {
            panic!("expected attention cache");
        };
        assert_eq!(members, vec![vec![0, 1, 2], vec![1, 0], vec![2]]);
        for a in &alpha {
            assert!((a.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        assert_eq!(agg.row(2), h.row(2));
    }

    #[test]
    fn normalized_output_rows_have_unit_length() {
        let params = dense_params(2, 2);
        let h = array![[3.0, 4.0], [0.0, 0.0]];
        let neighbors = vec![vec![1], vec![0]];
        let cache = forward(&params, Activation::Linear, true, &h, &neighbors);
        assert_eq!(cache.output().row(0).to_vec(), vec![0.6, 0.8]);
        assert_eq!(cache.output().row(1).to_vec(), vec![0.0, 0.0]);
    }
}
