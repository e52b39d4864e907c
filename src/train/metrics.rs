//! Ranking and regression metrics reported during training and prediction.

use serde::Serialize;

/// Area under the ROC curve from the rank-sum statistic, with tied scores
/// sharing their average rank. `None` when only one class is present.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let n = scores.len().min(labels.len());
    let positives = labels[..n].iter().filter(|&&l| l).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0;
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks start..end (1-based start+1..=end) share their mean
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        rank_sum += mean_rank * order[start..end].iter().filter(|&&i| labels[i]).count() as f64;
        start = end;
    }

    let p = positives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Index of the highest score, ties going to the lowest index.
pub fn top_index(scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &s) in scores.iter().enumerate() {
        if best.is_none_or(|b| s > scores[b]) {
            best = Some(i);
        }
    }
    best
}

/// Fraction of systems whose top-scored pose is correct, over the systems
/// that have at least one correct pose.
pub fn success_rate<'a, I>(systems: I) -> Option<f64>
where
    I: IntoIterator<Item = (&'a [f64], &'a [bool])>,
{
    let mut eligible = 0usize;
    let mut hits = 0usize;
    for (scores, labels) in systems {
        if !labels.iter().any(|&l| l) {
            continue;
        }
        eligible += 1;
        if top_index(scores).and_then(|i| labels.get(i).copied()) == Some(true) {
            hits += 1;
        }
    }
    (eligible > 0).then(|| hits as f64 / eligible as f64)
}

pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mx = x[..n].iter().sum::<f64>() / nf;
    let my = y[..n].iter().sum::<f64>() / nf;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

pub fn rmse(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n == 0 {
        return None;
    }
    let sse: f64 = x[..n].iter().zip(&y[..n]).map(|(a, b)| (a - b).powi(2)).sum();
    Some((sse / n as f64).sqrt())
}

/// Model outputs for one system alongside whatever ground truth it has.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub probabilities: Vec<f64>,
    pub labels: Option<Vec<bool>>,
    pub predicted_pkd: Option<f64>,
    pub pkd: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Metrics {
    pub auc: Option<f64>,
    pub success_rate: Option<f64>,
    pub pearson: Option<f64>,
    pub rmse: Option<f64>,
}

impl Metrics {
    /// Pools poses from every labeled system for the AUC; affinity metrics
    /// use systems with both a prediction and a reference pKd.
    pub fn compute(outcomes: &[Outcome]) -> Self {
        let mut scores = Vec::new();
        let mut labels = Vec::new();
        for outcome in outcomes {
            if let Some(l) = &outcome.labels {
                scores.extend_from_slice(&outcome.probabilities);
                labels.extend_from_slice(l);
            }
        }

        let ranked = outcomes.iter().filter_map(|o| {
            o.labels
                .as_deref()
                .map(|l| (o.probabilities.as_slice(), l))
        });

        let (predicted, reference): (Vec<f64>, Vec<f64>) = outcomes
            .iter()
            .filter_map(|o| o.predicted_pkd.zip(o.pkd))
            .unzip();

        Self {
            auc: roc_auc(&scores, &labels),
            success_rate: success_rate(ranked),
            pearson: pearson(&predicted, &reference),
            rmse: rmse(&predicted, &reference),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.auc.is_none()
            && self.success_rate.is_none()
            && self.pearson.is_none()
            && self.rmse.is_none()
    }
}
