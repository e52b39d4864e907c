use crate::config::LossConfig;
use crate::gnn::{Forward, Upstream, sigmoid, softplus};
use crate::graph::PoseGraph;

/// Weighted loss of one graph and its gradient with respect to the outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphLoss {
    pub total: f64,
    pub classification: Option<f64>,
    pub regression: Option<f64>,
    pub upstream: Upstream,
}

/// Whether `graph` carries a target for any loss term enabled in `config`.
pub fn has_targets(graph: &PoseGraph, config: &LossConfig) -> bool {
    classification_enabled(config) && graph.labels.is_some()
        || regression_enabled(config) && graph.pkd.is_some()
}

fn classification_enabled(config: &LossConfig) -> bool {
    config.task.predicts_binding_mode() && config.classification_weight > 0.0
}

fn regression_enabled(config: &LossConfig) -> bool {
    config.task.predicts_affinity() && config.regression_weight > 0.0
}

/// `w_c·BCE + w_r·(ŷ − pKd)²`, with BCE averaged over nodes and correct poses
/// weighted by `pos_weight`. Returns `None` when no term applies.
pub fn graph_loss(
    forward: &Forward,
    graph: &PoseGraph,
    config: &LossConfig,
) -> Option<GraphLoss> {
    let n = forward.logits.len();
    let mut upstream = Upstream {
        logits: vec![0.0; n],
        pkd: 0.0,
    };
    let mut total = 0.0;

    let classification = match &graph.labels {
        Some(labels) if classification_enabled(config) && n > 0 => {
            let w = config.classification_weight;
            let pw = config.pos_weight;
            let scale = 1.0 / n as f64;
            let mut bce = 0.0;
            for ((&s, &y), d) in forward.logits.iter().zip(labels).zip(&mut upstream.logits) {
                if y {
                    bce += pw * softplus(-s);
                    *d = w * scale * pw * (sigmoid(s) - 1.0);
                } else {
                    bce += softplus(s);
                    *d = w * scale * sigmoid(s);
                }
            }
            bce *= scale;
            total += w * bce;
            Some(bce)
        }
        _ => None,
    };

    let regression = match (forward.pkd, graph.pkd) {
        (Some(predicted), Some(target)) if regression_enabled(config) => {
            let w = config.regression_weight;
            let diff = predicted - target;
            upstream.pkd = 2.0 * w * diff;
            total += w * diff * diff;
            Some(diff * diff)
        }
        _ => None,
    };

    if classification.is_none() && regression.is_none() {
        return None;
    }
    Some(GraphLoss {
        total,
        classification,
        regression,
        upstream,
    })
}
